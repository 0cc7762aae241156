//! Moderation worker: consumes durable jobs, classifies videos, commits
//! the terminal status transition, and publishes the change event.

pub mod config;
pub mod error;
pub mod executor;
pub mod moderation;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use moderation::{Classifier, EventSink, ModerationContext, RandomClassifier, VideoStore};
