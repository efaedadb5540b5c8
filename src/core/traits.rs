use crate::core::Result;
use async_trait::async_trait;
use futures::Stream;
use std::io;
use std::pin::Pin;

/// Transformed bytes delivered to async code, one chunk at a time.
pub type ChunkStream = Pin<Box<dyn Stream<Item = io::Result<Vec<u8>>> + Send>>;

/// Destination for the bytes coming out of a connected stream.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn write(&mut self, chunk: &[u8]) -> Result<()>;

    async fn write_batch(&mut self, chunks: Vec<Vec<u8>>) -> Result<()> {
        for chunk in chunks {
            self.write(&chunk).await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.flush().await
    }
}
