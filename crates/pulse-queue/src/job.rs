//! Durable moderation work items.
//!
//! Every upload enqueues exactly one `ModerationJob` carrying the video id
//! and the time the outcome becomes due. Because the job lives in a Redis
//! stream rather than an in-process timer, a process restart cannot lose the
//! pending moderation.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pulse_models::VideoId;

/// Unique identifier for a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job to compute a video's moderation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Video to moderate
    pub video_id: VideoId,
    /// When the outcome becomes due
    pub due_at: DateTime<Utc>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl ModerationJob {
    /// Create a job due after the given delay.
    pub fn new(video_id: VideoId, delay: Duration) -> Self {
        let now = Utc::now();
        Self {
            job_id: JobId::new(),
            video_id,
            due_at: now + delay,
            created_at: now,
        }
    }

    /// How long until the job is due; zero when overdue.
    pub fn time_until_due(&self) -> std::time::Duration {
        (self.due_at - Utc::now()).to_std().unwrap_or_default()
    }

    /// Idempotency key for deduplication: one moderation per video.
    pub fn idempotency_key(&self) -> String {
        format!("moderate:{}", self.video_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_time_reflects_delay() {
        let job = ModerationJob::new(VideoId::new(), Duration::seconds(10));
        let until = job.time_until_due();
        assert!(until <= std::time::Duration::from_secs(10));
        assert!(until > std::time::Duration::from_secs(8));
    }

    #[test]
    fn overdue_job_has_zero_wait() {
        let job = ModerationJob::new(VideoId::new(), Duration::seconds(-5));
        assert_eq!(job.time_until_due(), std::time::Duration::ZERO);
    }

    #[test]
    fn idempotency_key_is_per_video() {
        let video_id = VideoId::new();
        let a = ModerationJob::new(video_id, Duration::seconds(10));
        let b = ModerationJob::new(video_id, Duration::seconds(10));
        assert_eq!(a.idempotency_key(), b.idempotency_key());
        assert_ne!(a.job_id, b.job_id);
    }

    #[test]
    fn job_round_trips_through_json() {
        let job = ModerationJob::new(VideoId::new(), Duration::seconds(10));
        let json = serde_json::to_string(&job).unwrap();
        let back: ModerationJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back.job_id, job.job_id);
        assert_eq!(back.video_id, job.video_id);
        assert_eq!(back.due_at, job.due_at);
    }
}
