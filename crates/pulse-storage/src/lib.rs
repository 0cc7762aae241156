//! Object storage for uploaded video binaries.

pub mod client;
pub mod error;
pub mod retry;

pub use client::{video_object_key, ObjectStore, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use retry::{retry_async, RetryConfig};
