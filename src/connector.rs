//! Connects a byte source through a transformer to a readable stream.
//!
//! [`StreamConnector::connect`] schedules the transformer on a worker thread
//! and hands back the read end of a bounded byte channel right away. The
//! caller reads transformed bytes while the worker is still producing them,
//! much like `producer | consumer` in a shell.

use crate::channel::{ChannelReader, ChannelWriter, channel};
use crate::core::{ConnectorConfig, PipeEnd, PipelineError, Result, StreamError, StreamResult};
use crate::source;
use crate::worker::{WorkerPool, panic_message};
use std::future::Future;
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::{debug, warn};

pub struct StreamConnector {
    config: ConnectorConfig,
    pool: WorkerPool,
    next_stream: AtomicU64,
}

impl StreamConnector {
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.workers, &config.thread_name)?;
        Ok(Self {
            config,
            pool,
            next_stream: AtomicU64::new(0),
        })
    }

    /// A connector with one worker and the default channel capacity.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ConnectorConfig::default())
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Schedules `transformer` over the source produced by `source` and
    /// returns the transformed bytes as a stream, without waiting for the
    /// worker.
    ///
    /// On the worker, `source` is called first. If it fails the transformer
    /// never runs and the first read of the returned stream fails with
    /// [`StreamError::SourceAcquisition`]. Otherwise the transformer runs with
    /// the channel's write end; whatever it does, including panicking, the
    /// write end is closed exactly once afterwards and the outcome stored in
    /// the [`ResultHandle`].
    ///
    /// With a single worker, streams are produced one after another in the
    /// order they were connected. Reading a later stream before the earlier
    /// ones are drained or dropped blocks forever.
    pub fn connect<S, R, F, T>(
        &self,
        source: S,
        transformer: F,
    ) -> Result<(ChannelReader, ResultHandle<T>)>
    where
        S: FnOnce() -> Result<R> + Send + 'static,
        R: Read,
        F: FnOnce(R, &mut ChannelWriter) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let id = self.next_stream.fetch_add(1, Ordering::Relaxed);
        let (writer, reader) = channel(self.config.channel_capacity);
        let (sender, receiver) = oneshot::channel();

        debug!(
            stream = id,
            capacity = self.config.channel_capacity,
            "scheduling transform"
        );
        self.pool.execute(move || {
            let outcome = run_transform(id, source, transformer, writer);
            // The caller may not care about the result.
            let _ = sender.send(outcome);
        })?;

        Ok((reader, ResultHandle { receiver }))
    }

    /// Like [`connect`](Self::connect) for a source that is already open.
    pub fn connect_reader<R, F, T>(
        &self,
        input: R,
        transformer: F,
    ) -> Result<(ChannelReader, ResultHandle<T>)>
    where
        R: Read + Send + 'static,
        F: FnOnce(R, &mut ChannelWriter) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.connect(source::file::ready(input), transformer)
    }

    /// Waits for every scheduled transform to finish and stops the workers.
    ///
    /// Blocks until streams still held by the caller have been drained or
    /// dropped. Dropping the connector instead stops accepting work without
    /// waiting; already scheduled transforms still run to completion.
    pub fn shutdown(mut self) {
        self.pool.shutdown();
    }
}

fn run_transform<S, R, F, T>(
    id: u64,
    source: S,
    transformer: F,
    mut writer: ChannelWriter,
) -> StreamResult<T>
where
    S: FnOnce() -> Result<R>,
    R: Read,
    F: FnOnce(R, &mut ChannelWriter) -> Result<T>,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let input = source().map_err(|e| StreamError::SourceAcquisition(Arc::new(e)))?;
        transformer(input, &mut writer).map_err(StreamError::from_transform)
    }))
    .unwrap_or_else(|payload| {
        Err(StreamError::Transform(Arc::new(PipelineError::Transform(
            format!("transformer panicked: {}", panic_message(payload.as_ref())),
        ))))
    });

    match &outcome {
        Ok(_) => debug!(
            stream = id,
            bytes = writer.bytes_written(),
            "transform finished"
        ),
        Err(e) => warn!(
            stream = id,
            bytes = writer.bytes_written(),
            error = %e,
            "transform failed"
        ),
    }
    writer.close(outcome.as_ref().err().cloned());
    outcome
}

/// Eventual outcome of a connected transform.
///
/// The handle resolves once the worker has closed the stream's write end,
/// independently of how far the reader got. It can be consumed by blocking
/// ([`wait`](Self::wait)), by `.await`ing it, or polled with
/// [`try_take`](Self::try_take).
#[must_use = "dropping the handle discards the transform's result"]
pub struct ResultHandle<T> {
    receiver: oneshot::Receiver<StreamResult<T>>,
}

impl<T> ResultHandle<T> {
    /// Blocks the current thread until the transform has finished.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context;
    /// `.await` the handle there instead.
    pub fn wait(self) -> StreamResult<T> {
        self.receiver.blocking_recv().unwrap_or_else(|_| lost())
    }

    /// Returns the outcome if the transform has finished, or the handle back
    /// if it is still running.
    pub fn try_take(mut self) -> std::result::Result<StreamResult<T>, Self> {
        match self.receiver.try_recv() {
            Ok(outcome) => Ok(outcome),
            Err(oneshot::error::TryRecvError::Empty) => Err(self),
            Err(oneshot::error::TryRecvError::Closed) => Ok(lost()),
        }
    }
}

impl<T> Future for ResultHandle<T> {
    type Output = StreamResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| lost()))
    }
}

// The job carrying the sender was dropped without running.
fn lost<T>() -> StreamResult<T> {
    Err(StreamError::AbandonedPipe(PipeEnd::Writer))
}
