use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use super::message::Message;
use super::message_queue::MessageQueue;
use crate::error::{QueueError, Result};

/// Maps queue names to their queues.
///
/// Queues are created on first reference and live as long as the registry.
/// Construct one at startup and share it behind an [`Arc`].
#[derive(Default)]
pub struct QueueRegistry {
    queues: DashMap<String, Arc<MessageQueue>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the queue registered under `name`, creating it if needed.
    ///
    /// Creation goes through the map's entry lock, so racing first calls for
    /// the same name all receive the same instance.
    pub fn get_or_create(&self, name: &str) -> Arc<MessageQueue> {
        if let Some(queue) = self.queues.get(name) {
            return queue.clone();
        }

        self.queues
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(queue = %name, "creating queue");
                Arc::new(MessageQueue::new())
            })
            .clone()
    }

    /// Looks up `name` without creating it.
    pub fn get(&self, name: &str) -> Option<Arc<MessageQueue>> {
        self.queues.get(name).map(|queue| queue.clone())
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    /// Pushes `payload` onto `name`, returning the queue's new length.
    pub fn enqueue(&self, name: &str, payload: String) -> Result<usize> {
        if payload.is_empty() {
            return Err(QueueError::InvalidInput("empty message".to_string()));
        }

        let queue = self.get_or_create(name);
        queue.enqueue(payload);
        Ok(queue.len())
    }

    /// Pops from `name`; see [`MessageQueue::dequeue`] for the timeout rules.
    pub async fn dequeue(
        &self,
        name: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Message> {
        let queue = self.get_or_create(name);
        queue.dequeue(timeout, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_does_not_create() {
        let registry = QueueRegistry::new();

        assert!(registry.get("missing").is_none());
        assert_eq!(registry.queue_count(), 0);
    }

    #[test]
    fn test_get_or_create_returns_same_instance() {
        let registry = QueueRegistry::new();

        let first = registry.get_or_create("emails");
        let second = registry.get_or_create("emails");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.queue_count(), 1);
    }

    #[test]
    fn test_enqueue_rejects_empty_payload() {
        let registry = QueueRegistry::new();

        let result = registry.enqueue("emails", String::new());

        assert!(matches!(result, Err(QueueError::InvalidInput(_))));
        assert_eq!(registry.queue_count(), 0);
    }
}
