//! Byte-count and elapsed-time tracking for transforms.
//!
//! An [`IoMonitor`] is purely observational: a transformer updates it while
//! it runs and anyone holding a clone may read it at the same time. Reads
//! are best-effort snapshots; the byte counter and the clock are not updated
//! atomically with respect to each other.

use serde::Serialize;
use std::io::{self, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Default)]
struct Clock {
    started: Option<Instant>,
    last_lap: Option<Instant>,
    finished: Option<Instant>,
}

#[derive(Default)]
struct Inner {
    bytes_read: AtomicU64,
    clock: Mutex<Clock>,
}

#[derive(Clone, Default)]
pub struct IoMonitor {
    inner: Arc<Inner>,
}

/// Point-in-time view of an [`IoMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IoSnapshot {
    pub bytes_read: u64,
    pub elapsed: Duration,
    pub finished: bool,
}

impl IoSnapshot {
    pub fn bytes_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes_read as f64 / secs
        } else {
            0.0
        }
    }
}

impl IoMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn clock(&self) -> MutexGuard<'_, Clock> {
        self.inner.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts the clock and resets the byte counter.
    pub fn start(&self) {
        let now = Instant::now();
        let mut clock = self.clock();
        self.inner.bytes_read.store(0, Ordering::Relaxed);
        clock.started = Some(now);
        clock.last_lap = Some(now);
        clock.finished = None;
    }

    /// Time since the previous lap, or since [`start`](Self::start) for the
    /// first one. Zero if the monitor was never started.
    pub fn interval(&self) -> Duration {
        let now = Instant::now();
        let mut clock = self.clock();
        match clock.last_lap.replace(now) {
            Some(previous) => now.duration_since(previous),
            None => {
                clock.last_lap = None;
                Duration::ZERO
            }
        }
    }

    pub fn set_read(&self, bytes: u64) {
        self.inner.bytes_read.store(bytes, Ordering::Relaxed);
    }

    pub fn add_read(&self, bytes: u64) {
        self.inner.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn bytes_read(&self) -> u64 {
        self.inner.bytes_read.load(Ordering::Relaxed)
    }

    /// Stops the clock and returns the total duration.
    pub fn finish(&self) -> Duration {
        let now = Instant::now();
        let mut clock = self.clock();
        if clock.finished.is_none() {
            clock.finished = Some(now);
        }
        elapsed(&clock, now)
    }

    /// Duration between start and finish, or elapsed so far while running.
    pub fn duration(&self) -> Duration {
        let clock = self.clock();
        elapsed(&clock, Instant::now())
    }

    pub fn is_finished(&self) -> bool {
        self.clock().finished.is_some()
    }

    pub fn snapshot(&self) -> IoSnapshot {
        let clock = self.clock();
        IoSnapshot {
            bytes_read: self.bytes_read(),
            elapsed: elapsed(&clock, Instant::now()),
            finished: clock.finished.is_some(),
        }
    }
}

fn elapsed(clock: &Clock, now: Instant) -> Duration {
    match (clock.started, clock.finished) {
        (Some(start), Some(end)) => end.duration_since(start),
        (Some(start), None) => now.duration_since(start),
        (None, _) => Duration::ZERO,
    }
}

/// Counts bytes read through it into an [`IoMonitor`].
pub struct MonitoredReader<R> {
    inner: R,
    monitor: IoMonitor,
}

impl<R: Read> MonitoredReader<R> {
    pub fn new(inner: R, monitor: IoMonitor) -> Self {
        Self { inner, monitor }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for MonitoredReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.monitor.add_read(n as u64);
        Ok(n)
    }
}
