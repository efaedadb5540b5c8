use crate::core::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default capacity of the channel between a transform and its reader.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32 * 1024;

pub const DEFAULT_THREAD_NAME: &str = "streamlink-worker";

/// Settings for a [`StreamConnector`](crate::StreamConnector).
///
/// With a single worker, transforms scheduled on the same connector run one
/// at a time in submission order: the second stream makes no progress until
/// the first one has been drained or dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub workers: usize,
    pub channel_capacity: usize,
    pub thread_name: String,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl ConnectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    pub fn with_thread_name<S: Into<String>>(mut self, thread_name: S) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(PipelineError::Config(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(PipelineError::Config(
                "channel_capacity must be at least 1 byte".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            PipelineError::Config(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ConnectorConfig::default();
        assert_eq!(config.workers, 1);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_workers_rejected() {
        let err = ConnectorConfig::new().with_workers(0).validate().unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = ConnectorConfig::new()
            .with_channel_capacity(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = ConnectorConfig::from_json_str(r#"{"workers": 4}"#).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
    }

    #[test]
    fn invalid_json_values_rejected() {
        let err = ConnectorConfig::from_json_str(r#"{"channel_capacity": 0}"#).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));

        let err = ConnectorConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, PipelineError::Serialization(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connector.json");
        std::fs::write(&path, r#"{"workers": 2, "thread_name": "etl"}"#).unwrap();

        let config = ConnectorConfig::from_json_file(&path).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.thread_name, "etl");

        let missing = ConnectorConfig::from_json_file(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(PipelineError::Config(_))));
    }
}
