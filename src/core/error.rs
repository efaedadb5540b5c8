use std::fmt;
use std::io;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source error: {0}")]
    Source(#[from] anyhow::Error),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    /// Converts an error returned by a channel read, keeping the stream
    /// failure it carries when there is one.
    pub fn from_read_error(err: io::Error) -> Self {
        match StreamError::from_io(&err) {
            Some(stream) => PipelineError::Stream(stream.clone()),
            None => PipelineError::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// The end of a channel that went away while the other end still needed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeEnd {
    Reader,
    Writer,
}

impl fmt::Display for PipeEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipeEnd::Reader => f.write_str("read end closed before the writer finished"),
            PipeEnd::Writer => f.write_str("write end dropped before end of stream"),
        }
    }
}

/// Terminal status of a connected stream.
///
/// The same value is delivered to the reader of the channel (wrapped in an
/// [`io::Error`]) and to the [`ResultHandle`](crate::ResultHandle), so causes
/// are shared behind an [`Arc`].
#[derive(Error, Debug, Clone)]
pub enum StreamError {
    #[error("source acquisition failed: {0}")]
    SourceAcquisition(#[source] Arc<PipelineError>),

    #[error("transform failed: {0}")]
    Transform(#[source] Arc<PipelineError>),

    #[error("abandoned pipe: {0}")]
    AbandonedPipe(PipeEnd),
}

impl StreamError {
    /// Classifies an error returned by a transformer.
    ///
    /// A transformer that stopped because its writes hit a closed read end
    /// is reported as an abandoned pipe rather than a transform failure.
    pub fn from_transform(err: PipelineError) -> Self {
        if let PipelineError::Io(io_err) = &err {
            if let Some(StreamError::AbandonedPipe(end)) = StreamError::from_io(io_err) {
                return StreamError::AbandonedPipe(*end);
            }
        }
        StreamError::Transform(Arc::new(err))
    }

    /// Recovers the stream failure carried by an error returned from a
    /// channel read or write.
    pub fn from_io(err: &io::Error) -> Option<&StreamError> {
        err.get_ref()?.downcast_ref::<StreamError>()
    }

    pub fn to_io_error(&self) -> io::Error {
        let kind = match self {
            StreamError::AbandonedPipe(_) => io::ErrorKind::BrokenPipe,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, self.clone())
    }

    /// The underlying cause, for source and transform failures.
    pub fn cause(&self) -> Option<&PipelineError> {
        match self {
            StreamError::SourceAcquisition(cause) | StreamError::Transform(cause) => Some(cause),
            StreamError::AbandonedPipe(_) => None,
        }
    }

    pub fn is_abandoned(&self) -> bool {
        matches!(self, StreamError::AbandonedPipe(_))
    }
}

pub type StreamResult<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_error_survives_io_round_trip() {
        let err = StreamError::Transform(Arc::new(PipelineError::Transform("bad row".into())));
        let io_err = err.to_io_error();
        assert_eq!(io_err.kind(), io::ErrorKind::Other);

        let recovered = StreamError::from_io(&io_err).unwrap();
        assert!(matches!(recovered, StreamError::Transform(_)));
        assert_eq!(recovered.to_string(), "transform failed: Transform error: bad row");
    }

    #[test]
    fn abandoned_pipe_maps_to_broken_pipe() {
        let io_err = StreamError::AbandonedPipe(PipeEnd::Reader).to_io_error();
        assert_eq!(io_err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn transform_error_from_abandoned_write_is_reclassified() {
        let io_err = StreamError::AbandonedPipe(PipeEnd::Reader).to_io_error();
        let classified = StreamError::from_transform(PipelineError::Io(io_err));
        assert!(matches!(classified, StreamError::AbandonedPipe(PipeEnd::Reader)));
    }

    #[test]
    fn plain_io_error_is_a_transform_failure() {
        let err = PipelineError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated"));
        let classified = StreamError::from_transform(err);
        assert!(matches!(classified.cause(), Some(PipelineError::Io(_))));
    }

    #[test]
    fn read_error_keeps_stream_failure() {
        let io_err = StreamError::AbandonedPipe(PipeEnd::Writer).to_io_error();
        let err = PipelineError::from_read_error(io_err);
        assert!(matches!(err, PipelineError::Stream(StreamError::AbandonedPipe(PipeEnd::Writer))));
    }
}
