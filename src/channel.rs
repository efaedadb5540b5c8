//! Bounded single-producer/single-consumer byte pipe.
//!
//! A pipe is a connected [`ChannelWriter`] and [`ChannelReader`].
//! The writer blocks while the buffer is full and the reader blocks while it
//! is empty, so memory stays bounded by the capacity no matter how many bytes
//! pass through. Closing either end wakes the other one:
//!
//! - once the write end is closed, reads drain whatever is buffered and then
//!   return end of stream, or the failure the writer was closed with;
//! - once the read end is closed, a writer blocked on a full buffer (and
//!   every later write) fails with [`StreamError::AbandonedPipe`].
//!
//! Dropping an end closes it. A write end dropped without an explicit close
//! is reported to the reader as an abandoned pipe.
//!
//! Channels are only created by the connector, and only its worker task may
//! close the write end. A transformer borrows the writer and can neither end
//! the stream early nor swap in another writer.

use crate::core::{PipeEnd, StreamError};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

struct State {
    buffer: VecDeque<u8>,
    write_closed: bool,
    read_closed: bool,
    failure: Option<StreamError>,
}

struct Shared {
    state: Mutex<State>,
    readable: Condvar,
    writable: Condvar,
    capacity: usize,
}

impl Shared {
    // Neither end panics while holding the lock, but a poisoned mutex must not
    // turn into a second panic on the other thread.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close_write(&self, failure: Option<StreamError>) {
        let mut state = self.lock();
        if state.write_closed {
            return;
        }
        state.write_closed = true;
        state.failure = failure;
        drop(state);
        self.readable.notify_all();
        self.writable.notify_all();
    }

    fn close_read(&self) {
        let mut state = self.lock();
        if state.read_closed {
            return;
        }
        state.read_closed = true;
        state.buffer = VecDeque::new();
        drop(state);
        self.writable.notify_all();
        self.readable.notify_all();
    }
}

/// Creates a bounded pipe holding at most `capacity` bytes.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub(crate) fn channel(capacity: usize) -> (ChannelWriter, ChannelReader) {
    assert!(capacity > 0, "channel capacity must be at least 1 byte");
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            buffer: VecDeque::with_capacity(capacity),
            write_closed: false,
            read_closed: false,
            failure: None,
        }),
        readable: Condvar::new(),
        writable: Condvar::new(),
        capacity,
    });
    (
        ChannelWriter {
            shared: shared.clone(),
            written: 0,
        },
        ChannelReader { shared },
    )
}

/// Write end of a connected stream.
///
/// Transformers only see `&mut ChannelWriter`; closing it is reserved to the
/// task that runs them, so the stream ends exactly when the transform does.
///
/// ```compile_fail
/// use streamlink::ChannelWriter;
///
/// fn end_early(output: &mut ChannelWriter) {
///     output.close(None);
/// }
/// ```
///
/// ```compile_fail
/// let (_writer, _reader) = streamlink::channel::channel(8);
/// ```
pub struct ChannelWriter {
    shared: Arc<Shared>,
    written: u64,
}

impl ChannelWriter {
    /// Closes the write end, recording `failure` for the reader.
    ///
    /// Only the first call has an effect.
    pub(crate) fn close(&mut self, failure: Option<StreamError>) {
        self.shared.close_write(failure);
    }

    /// Returns true once the reader has gone away.
    pub fn is_abandoned(&self) -> bool {
        self.shared.lock().read_closed
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Total bytes accepted by this writer so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let shared = &*self.shared;
        let mut state = shared.lock();
        loop {
            if state.read_closed {
                return Err(StreamError::AbandonedPipe(PipeEnd::Reader).to_io_error());
            }
            if state.write_closed {
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "write end already closed",
                ));
            }
            let free = shared.capacity - state.buffer.len();
            if free > 0 {
                let n = free.min(buf.len());
                state.buffer.extend(&buf[..n]);
                drop(state);
                shared.readable.notify_one();
                self.written += n as u64;
                return Ok(n);
            }
            state = shared
                .writable
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        self.shared
            .close_write(Some(StreamError::AbandonedPipe(PipeEnd::Writer)));
    }
}

/// Read end of a connected stream.
pub struct ChannelReader {
    shared: Arc<Shared>,
}

impl ChannelReader {
    /// Closes the read end, telling the writer its output is no longer wanted.
    ///
    /// Buffered bytes are discarded. Only the first call has an effect.
    pub fn close(&mut self) {
        self.shared.close_read();
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let shared = &*self.shared;
        let mut state = shared.lock();
        loop {
            if state.read_closed {
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "read end already closed",
                ));
            }
            if !state.buffer.is_empty() {
                let n = buf.len().min(state.buffer.len());
                for (dst, src) in buf.iter_mut().zip(state.buffer.drain(..n)) {
                    *dst = src;
                }
                drop(state);
                shared.writable.notify_one();
                return Ok(n);
            }
            if state.write_closed {
                return match &state.failure {
                    Some(failure) => Err(failure.to_io_error()),
                    None => Ok(0),
                };
            }
            state = shared
                .readable
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Drop for ChannelReader {
    fn drop(&mut self) {
        self.shared.close_read();
    }
}
