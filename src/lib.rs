// tubeq - in-memory named FIFO message queues
//
// The queue core lives in `queue`; `resp` is the network front end.
// Binary entry point is in src/main.rs

pub mod error;
pub mod queue;
pub mod resp;

pub use error::QueueError;
pub use queue::{Message, MessageQueue, QueueRegistry, QueueStats};
pub use resp::{RespConfig, RespServer};
