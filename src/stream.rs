//! Consuming a connected stream from async code.
//!
//! A [`ChannelReader`](crate::ChannelReader) blocks, so it must not be read on
//! an async executor thread. [`into_chunk_stream`] moves the reads onto the
//! blocking thread pool and forwards chunks through a bounded channel that
//! holds a single chunk, so memory stays bounded on this side too.

use crate::core::ChunkStream;
use std::io::Read;
use tokio_stream::wrappers::ReceiverStream;

/// Default size of the chunks yielded by [`into_chunk_stream`].
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Turns a blocking reader into a stream of chunks of at most `chunk_size`
/// bytes.
///
/// The stream ends after end of input, or after yielding the first read
/// error. Dropping the stream drops `reader` once the pending read returns,
/// which for a channel reader abandons the pipe.
///
/// # Panics
///
/// Requires a tokio runtime context.
pub fn into_chunk_stream<R>(mut reader: R, chunk_size: usize) -> ChunkStream
where
    R: Read + Send + 'static,
{
    let chunk_size = chunk_size.max(1);
    let (tx, rx) = tokio::sync::mpsc::channel(1);

    tokio::task::spawn_blocking(move || {
        let mut buf = vec![0u8; chunk_size];
        loop {
            let item = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => Ok(buf[..n].to_vec()),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };
            let failed = item.is_err();
            if tx.blocking_send(item).is_err() || failed {
                break; // receiver dropped, or error delivered
            }
        }
    });

    Box::pin(ReceiverStream::new(rx))
}
