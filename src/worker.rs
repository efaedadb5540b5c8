//! Fixed-size pool of named OS threads fed from a FIFO job queue.

use crate::core::{PipelineError, Result};
use crossbeam_channel::{Receiver, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` threads named `{name}-{index}`.
    pub fn new(size: usize, name: &str) -> Result<Self> {
        if size == 0 {
            return Err(PipelineError::Config(
                "worker pool needs at least one thread".to_string(),
            ));
        }
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || work(index, receiver))
                .map_err(|e| PipelineError::WorkerPool(format!("failed to spawn worker: {e}")))?;
            workers.push(handle);
        }
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queues a job. Jobs start in submission order.
    pub fn execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| PipelineError::WorkerPool("worker pool is shut down".to_string()))?;
        sender
            .send(Box::new(job))
            .map_err(|_| PipelineError::WorkerPool("all workers have exited".to_string()))
    }

    /// Stops accepting jobs, lets the workers finish everything already
    /// queued, and joins them.
    ///
    /// Blocks for as long as a queued transform is blocked on a stream
    /// nobody reads.
    pub fn shutdown(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("worker thread panicked outside of a job");
            }
        }
    }
}

// Closing the queue is enough for the workers to run what is left and exit.
// Joining here would hang whenever the owner still holds an undrained stream.
impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender.take();
    }
}

fn work(index: usize, jobs: Receiver<Job>) {
    debug!(worker = index, "worker started");
    for job in jobs.iter() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            error!(
                worker = index,
                panic = panic_message(payload.as_ref()),
                "job panicked"
            );
        }
    }
    debug!(worker = index, "worker stopped");
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn zero_workers_is_a_config_error() {
        assert!(matches!(
            WorkerPool::new(0, "test"),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn single_worker_runs_jobs_in_submission_order() {
        let mut pool = WorkerPool::new(1, "fifo").unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            let order = order.clone();
            pool.execute(move || order.lock().unwrap().push(i)).unwrap();
        }
        pool.shutdown();
        assert_eq!(*order.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn panicking_job_does_not_kill_the_worker() {
        let pool = WorkerPool::new(1, "panics").unwrap();
        pool.execute(|| panic!("job blew up")).unwrap();

        let (tx, rx) = mpsc::channel();
        pool.execute(move || tx.send(42).unwrap()).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }

    #[test]
    fn threads_carry_the_configured_name() {
        let pool = WorkerPool::new(2, "named").unwrap();
        assert_eq!(pool.size(), 2);

        let (tx, rx) = mpsc::channel();
        pool.execute(move || {
            tx.send(thread::current().name().map(str::to_string)).unwrap();
        })
        .unwrap();
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert!(name.starts_with("named-"));
    }

    #[test]
    fn execute_after_shutdown_fails() {
        let mut pool = WorkerPool::new(1, "closed").unwrap();
        pool.shutdown();
        assert!(matches!(
            pool.execute(|| {}),
            Err(PipelineError::WorkerPool(_))
        ));
    }

    #[test]
    fn drop_does_not_wait_for_blocked_jobs() {
        let pool = WorkerPool::new(1, "detached").unwrap();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel();
        pool.execute(move || {
            release_rx.recv().unwrap();
        })
        .unwrap();
        pool.execute(move || done_tx.send("queued job ran").unwrap())
            .unwrap();

        drop(pool);
        release_tx.send(()).unwrap();
        assert_eq!(
            done_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            "queued job ran"
        );
    }

    #[test]
    fn panic_message_reads_both_payload_kinds() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
