//! Shared data models for the PulseStream backend.
//!
//! This crate defines the domain types used across the API server, the
//! moderation worker, and the persistence layer: users and roles, video
//! records and their status pair, realtime event envelopes, and upload
//! validation rules.

pub mod event;
pub mod upload;
pub mod user;
pub mod video;

pub use event::Event;
pub use upload::{
    sanitize_title, validate_upload, UploadValidationError, DEFAULT_MAX_UPLOAD_BYTES,
    MAX_TITLE_LENGTH,
};
pub use user::{Role, RoleParseError, UserId, UserRecord};
pub use video::{
    ProcessingStatus, SensitivityStatus, StatusParseError, VideoId, VideoListItem, VideoRecord,
};
