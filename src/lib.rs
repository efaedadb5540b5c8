pub mod channel;
pub mod connector;
pub mod core;
pub mod monitor;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod stream;
pub mod transform;
mod worker;

pub use crate::channel::{ChannelReader, ChannelWriter};
pub use crate::connector::{ResultHandle, StreamConnector};
pub use crate::core::*;
pub use crate::monitor::{IoMonitor, IoSnapshot, MonitoredReader};
pub use crate::pipeline::{Pipeline, PipelineReport};
pub use crate::worker::WorkerPool;
