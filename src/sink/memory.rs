use crate::core::{Result, Sink};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

/// Collects every chunk into a shared buffer.
///
/// Clones share the same buffer, so a clone kept by the caller can inspect
/// what a pipeline delivered after the sink itself was consumed.
#[derive(Clone, Default)]
pub struct MemorySink {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.data.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(chunk);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_contents() {
        let observer = MemorySink::new();
        let mut sink = observer.clone();
        sink.write(b"ab").await.unwrap();
        sink.write(b"cd").await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(observer.contents(), b"abcd");
        assert_eq!(observer.len(), 4);
        assert!(!observer.is_empty());
    }
}
