use thiserror::Error;

/// Outcomes of a queue operation other than success.
///
/// None of these is fatal; the transport decides how each one is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Rejected before touching any queue, e.g. an empty payload.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The queue stayed empty until the deadline.
    #[error("timed out waiting for a message")]
    TimedOut,

    /// The caller stopped waiting before a message arrived.
    #[error("dequeue cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, QueueError>;
