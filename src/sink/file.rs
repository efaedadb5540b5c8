use crate::core::{Result, Sink};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Writes every chunk to a file, truncating it on the first write.
pub struct FileSink {
    file_path: PathBuf,
    append: bool,
    writer: Option<BufWriter<tokio::fs::File>>,
    bytes_written: u64,
}

impl FileSink {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            append: false,
            writer: None,
            bytes_written: 0,
        }
    }

    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    async fn ensure_writer(&mut self) -> Result<()> {
        if self.writer.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .append(self.append)
                .truncate(!self.append)
                .open(&self.file_path)
                .await?;
            self.writer = Some(BufWriter::new(file));
        }
        Ok(())
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.ensure_writer().await?;

        if let Some(ref mut writer) = self.writer {
            writer.write_all(chunk).await?;
            self.bytes_written += chunk.len() as u64;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // An empty stream still produces an (empty) file.
        self.ensure_writer().await?;
        self.flush().await?;
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await?;
        }
        Ok(())
    }
}
