//! Durable moderation queue and realtime event channel, both on Redis.

pub mod error;
pub mod events;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use events::{EventChannel, EVENTS_CHANNEL};
pub use job::{JobId, ModerationJob};
pub use queue::{ModerationQueue, QueueConfig};
