use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam::queue::SegQueue;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::message::Message;
use crate::error::{QueueError, Result};

/// An unbounded FIFO of messages shared by any number of producers and
/// consumers.
///
/// Producers never wait. A consumer that finds the queue empty parks on a
/// [`Notify`] and is woken directly by the next enqueue, so nothing polls.
pub struct MessageQueue {
    items: SegQueue<Message>,
    notify: Notify,
    stats: QueueStats,
}

/// Counters kept per queue. Purely informational.
#[derive(Debug, Default)]
pub struct QueueStats {
    enqueued_total: AtomicU64,
    dequeued_total: AtomicU64,
    timed_out_total: AtomicU64,
    cancelled_total: AtomicU64,
}

impl QueueStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueued_total(&self) -> u64 {
        self.enqueued_total.load(Ordering::Relaxed)
    }

    pub fn dequeued_total(&self) -> u64 {
        self.dequeued_total.load(Ordering::Relaxed)
    }

    pub fn timed_out_total(&self) -> u64 {
        self.timed_out_total.load(Ordering::Relaxed)
    }

    pub fn cancelled_total(&self) -> u64 {
        self.cancelled_total.load(Ordering::Relaxed)
    }

    fn record(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl MessageQueue {
    pub fn new() -> Self {
        Self {
            items: SegQueue::new(),
            notify: Notify::new(),
            stats: QueueStats::new(),
        }
    }

    /// Appends `payload` to the tail and wakes one waiting consumer, if any.
    pub fn enqueue(&self, payload: String) -> Message {
        let message = Message::new(payload);
        self.items.push(message.clone());
        QueueStats::record(&self.stats.enqueued_total);
        // Stores a permit when nobody is parked, so a consumer that is about
        // to park still sees this message.
        self.notify.notify_one();
        message
    }

    /// Removes the head without waiting.
    pub fn try_dequeue(&self) -> Option<Message> {
        let message = self.items.pop()?;
        QueueStats::record(&self.stats.dequeued_total);
        Some(message)
    }

    /// Removes and returns the head, waiting up to `timeout` for one to
    /// arrive when the queue is empty.
    ///
    /// A zero `timeout` does NOT mean "wait forever": an empty queue yields
    /// [`QueueError::TimedOut`] straight away. Callers wanting an unbounded
    /// wait pass [`Duration::MAX`] and rely on `cancel`.
    ///
    /// Firing `cancel` yields [`QueueError::Cancelled`]. On either failure
    /// the queue is left exactly as it was.
    pub async fn dequeue(&self, timeout: Duration, cancel: &CancellationToken) -> Result<Message> {
        if let Some(message) = self.try_dequeue() {
            return Ok(message);
        }

        if timeout.is_zero() {
            QueueStats::record(&self.stats.timed_out_total);
            return Err(QueueError::TimedOut);
        }

        // The pop and the return happen in the same poll, so dropping this
        // future from the select below can never lose a removed message.
        let wait = async {
            loop {
                let notified = self.notify.notified();
                tokio::pin!(notified);
                // Register before re-checking so an enqueue landing in between
                // is not missed.
                notified.as_mut().enable();

                if let Some(message) = self.try_dequeue() {
                    return message;
                }

                notified.await;
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                QueueStats::record(&self.stats.cancelled_total);
                Err(QueueError::Cancelled)
            }
            result = tokio::time::timeout(timeout, wait) => match result {
                Ok(message) => Ok(message),
                Err(_) => {
                    QueueStats::record(&self.stats.timed_out_total);
                    Err(QueueError::TimedOut)
                }
            },
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;

    #[tokio::test]
    async fn test_enqueue_then_dequeue_without_waiting() {
        let queue = MessageQueue::new();
        let cancel = CancellationToken::new();

        queue.enqueue("a".to_string());
        let message = queue.dequeue(Duration::ZERO, &cancel).await.unwrap();

        assert_eq!(message.payload, "a");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_ready_message_wins_over_cancelled_token() {
        let queue = MessageQueue::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        queue.enqueue("ready".to_string());
        let message = queue.dequeue(Duration::from_secs(1), &cancel).await.unwrap();

        assert_eq!(message.payload, "ready");
    }

    #[tokio::test]
    async fn test_stats_track_every_outcome() {
        let queue = Arc::new(MessageQueue::new());
        let cancel = CancellationToken::new();

        queue.enqueue("x".to_string());
        queue.dequeue(Duration::ZERO, &cancel).await.unwrap();
        let _ = queue.dequeue(Duration::ZERO, &cancel).await;

        let cancelled = CancellationToken::new();
        cancelled.cancel();
        let _ = queue.dequeue(Duration::from_secs(1), &cancelled).await;

        assert_eq!(queue.stats().enqueued_total(), 1);
        assert_eq!(queue.stats().dequeued_total(), 1);
        assert_eq!(queue.stats().timed_out_total(), 1);
        assert_eq!(queue.stats().cancelled_total(), 1);
    }

    #[tokio::test]
    async fn test_permit_left_by_enqueue_is_not_lost() {
        let queue = Arc::new(MessageQueue::new());

        // Enqueue with nobody parked, drain it, then enqueue again while a
        // consumer waits: the waiter must get the second message.
        queue.enqueue("first".to_string());
        assert!(queue.try_dequeue().is_some());

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move {
                let cancel = CancellationToken::new();
                queue.dequeue(Duration::from_secs(2), &cancel).await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let start = Instant::now();
        queue.enqueue("second".to_string());
        let message = consumer.await.unwrap().unwrap();

        assert_eq!(message.payload, "second");
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
