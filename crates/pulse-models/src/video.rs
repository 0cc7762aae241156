//! Video metadata models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::user::UserId;

/// Error returned when parsing an unknown status string.
#[derive(Debug, Error)]
#[error("unknown status: {0}")]
pub struct StatusParseError(pub String);

/// Unique identifier for a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub Uuid);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for VideoId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Lifecycle stage of a video's moderation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Record created but not yet submitted for moderation
    #[default]
    Pending,
    /// Moderation job queued or running
    Processing,
    /// Moderation finished
    Completed,
    /// Moderation failed permanently
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Failed)
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProcessingStatus::Pending),
            "processing" => Ok(ProcessingStatus::Processing),
            "completed" => Ok(ProcessingStatus::Completed),
            "failed" => Ok(ProcessingStatus::Failed),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// Moderation outcome classification of a video's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityStatus {
    /// No outcome computed yet
    #[default]
    Pending,
    /// Content cleared for playback
    Safe,
    /// Content flagged by moderation
    Flagged,
}

impl SensitivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensitivityStatus::Pending => "pending",
            SensitivityStatus::Safe => "safe",
            SensitivityStatus::Flagged => "flagged",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SensitivityStatus::Safe | SensitivityStatus::Flagged)
    }
}

impl fmt::Display for SensitivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SensitivityStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SensitivityStatus::Pending),
            "safe" => Ok(SensitivityStatus::Safe),
            "flagged" => Ok(SensitivityStatus::Flagged),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// A persisted video record.
///
/// The status pair starts as `(processing, pending)` at upload time and is
/// mutated exactly once, atomically, to a terminal pair by the moderation
/// worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    /// Unique video ID
    pub id: VideoId,

    /// Display title (defaults to the original filename)
    pub title: String,

    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Object-storage key of the stored binary
    pub storage_key: String,

    /// Resolvable reference to the stored file
    pub file_url: String,

    /// Filename as supplied by the uploader
    pub original_filename: String,

    /// Declared MIME type
    pub content_type: String,

    /// Size in bytes
    pub size_bytes: i64,

    /// Duration in seconds, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,

    /// Owning user
    pub uploaded_by: UserId,

    /// Moderation pipeline stage
    pub processing_status: ProcessingStatus,

    /// Moderation outcome
    pub sensitivity_status: SensitivityStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Create a new record for a freshly uploaded video.
    ///
    /// Starts in `(processing, pending)` as the moderation job is enqueued
    /// in the same request.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
        storage_key: impl Into<String>,
        file_url: impl Into<String>,
        original_filename: impl Into<String>,
        content_type: impl Into<String>,
        size_bytes: i64,
        uploaded_by: UserId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: VideoId::new(),
            title: title.into(),
            description,
            storage_key: storage_key.into(),
            file_url: file_url.into(),
            original_filename: original_filename.into(),
            content_type: content_type.into(),
            size_bytes,
            duration_secs: None,
            uploaded_by,
            processing_status: ProcessingStatus::Processing,
            sensitivity_status: SensitivityStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// List projection: a video record with the denormalized owner username.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListItem {
    #[serde(flatten)]
    pub video: VideoRecord,

    /// Username of the owning user
    pub uploader_username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_starts_in_processing_pending() {
        let video = VideoRecord::new(
            "Demo",
            None,
            "videos/abc/clip.mp4",
            "https://cdn.example.com/videos/abc/clip.mp4",
            "clip.mp4",
            "video/mp4",
            2 * 1024 * 1024,
            UserId::new(),
        );
        assert_eq!(video.processing_status, ProcessingStatus::Processing);
        assert_eq!(video.sensitivity_status, SensitivityStatus::Pending);
        assert!(!video.processing_status.is_terminal());
    }

    #[test]
    fn statuses_round_trip_through_str() {
        for status in [
            ProcessingStatus::Pending,
            ProcessingStatus::Processing,
            ProcessingStatus::Completed,
            ProcessingStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<ProcessingStatus>().unwrap(), status);
        }
        for status in [
            SensitivityStatus::Pending,
            SensitivityStatus::Safe,
            SensitivityStatus::Flagged,
        ] {
            assert_eq!(status.as_str().parse::<SensitivityStatus>().unwrap(), status);
        }
    }

    #[test]
    fn serializes_camel_case_for_clients() {
        let video = VideoRecord::new(
            "Demo",
            Some("desc".to_string()),
            "videos/abc/clip.mp4",
            "https://cdn.example.com/videos/abc/clip.mp4",
            "clip.mp4",
            "video/mp4",
            1024,
            UserId::new(),
        );
        let json = serde_json::to_string(&video).unwrap();
        assert!(json.contains("\"processingStatus\":\"processing\""));
        assert!(json.contains("\"sensitivityStatus\":\"pending\""));
        assert!(json.contains("\"originalFilename\":\"clip.mp4\""));
    }
}
