use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A single queued payload.
///
/// The payload is opaque to the queue: it is stored and handed back
/// byte-for-byte, never parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub payload: String,
    /// Microseconds since the Unix epoch at the moment of enqueue.
    pub enqueued_at: u64,
}

impl Message {
    pub fn new(payload: String) -> Self {
        Self {
            payload,
            enqueued_at: now_micros(),
        }
    }

    /// Time spent in the queue so far.
    pub fn age(&self) -> Duration {
        Duration::from_micros(now_micros().saturating_sub(self.enqueued_at))
    }

    pub fn into_payload(self) -> String {
        self.payload
    }
}

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
