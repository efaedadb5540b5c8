use crate::channel::ChannelWriter;
use crate::connector::StreamConnector;
use crate::core::{PipelineError, Result, Sink};
use crate::stream::{DEFAULT_CHUNK_SIZE, into_chunk_stream};
use futures::StreamExt;
use std::io::Read;
use std::time::{Duration, Instant};
use tracing::debug;

/// Runs a source through a transformer into a [`Sink`], using a connector
/// so the transformed bytes never pile up in memory.
pub struct Pipeline<'a, S, F> {
    connector: &'a StreamConnector,
    source: S,
    transformer: F,
    sink: Box<dyn Sink>,
    chunk_size: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineReport<T> {
    /// Value returned by the transformer.
    pub output: T,
    pub bytes_written: u64,
    pub elapsed: Duration,
}

impl<'a, S, F> Pipeline<'a, S, F> {
    pub fn new<R, T>(
        connector: &'a StreamConnector,
        source: S,
        transformer: F,
        sink: Box<dyn Sink>,
    ) -> Self
    where
        S: FnOnce() -> Result<R> + Send + 'static,
        R: Read,
        F: FnOnce(R, &mut ChannelWriter) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        Self {
            connector,
            source,
            transformer,
            sink,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Drives the whole stream into the sink, then closes the sink and
    /// returns the transformer's value.
    ///
    /// If the sink fails, the stream is dropped and the transform aborts on
    /// its next write.
    pub async fn run<R, T>(self) -> Result<PipelineReport<T>>
    where
        S: FnOnce() -> Result<R> + Send + 'static,
        R: Read,
        F: FnOnce(R, &mut ChannelWriter) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let started = Instant::now();
        let Pipeline {
            connector,
            source,
            transformer,
            mut sink,
            chunk_size,
        } = self;

        let (reader, handle) = connector.connect(source, transformer)?;
        let mut stream = into_chunk_stream(reader, chunk_size);

        let mut bytes_written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(PipelineError::from_read_error)?;
            sink.write(&chunk).await?;
            bytes_written += chunk.len() as u64;
        }
        sink.close().await?;

        let output = handle.await?;
        let elapsed = started.elapsed();
        debug!(bytes = bytes_written, elapsed_ms = elapsed.as_millis() as u64, "pipeline finished");

        Ok(PipelineReport {
            output,
            bytes_written,
            elapsed,
        })
    }
}
