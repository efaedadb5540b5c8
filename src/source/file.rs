use crate::core::{PipelineError, Result};
use anyhow::Context;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

/// Supplier that opens `file_path` for buffered reading when invoked.
///
/// The file is opened on the worker thread that runs the transform, not when
/// this function is called.
pub fn file<P: AsRef<Path>>(file_path: P) -> impl FnOnce() -> Result<BufReader<File>> + Send + 'static {
    let file_path: PathBuf = file_path.as_ref().to_path_buf();
    move || {
        let file = File::open(&file_path)
            .with_context(|| format!("failed to open {}", file_path.display()))
            .map_err(PipelineError::Source)?;
        Ok(BufReader::new(file))
    }
}

/// Supplier that hands over a reader that is already open.
pub fn ready<R: Read + Send + 'static>(reader: R) -> impl FnOnce() -> Result<R> + Send + 'static {
    move || Ok(reader)
}

/// Supplier serving an in-memory buffer.
pub fn bytes<B: Into<Vec<u8>>>(data: B) -> impl FnOnce() -> Result<Cursor<Vec<u8>>> + Send + 'static {
    let data = data.into();
    move || Ok(Cursor::new(data))
}
