pub mod message;
pub mod message_queue;
pub mod registry;

pub use message::Message;
pub use message_queue::{MessageQueue, QueueStats};
pub use registry::QueueRegistry;
