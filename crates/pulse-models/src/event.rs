//! Realtime event envelopes.
//!
//! Events are published by the moderation worker and broadcast verbatim to
//! every connected WebSocket client. Delivery is best-effort; clients that
//! miss an event reconcile by re-fetching the video list.

use serde::{Deserialize, Serialize};

use crate::video::{ProcessingStatus, SensitivityStatus, VideoId};

/// Broadcast event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A video's moderation outcome was committed.
    VideoProcessed {
        #[serde(rename = "videoId")]
        video_id: VideoId,
        /// Terminal sensitivity status
        status: SensitivityStatus,
        #[serde(rename = "processingStatus")]
        processing_status: ProcessingStatus,
    },
}

impl Event {
    /// Create a `video_processed` event for a committed terminal transition.
    pub fn video_processed(
        video_id: VideoId,
        status: SensitivityStatus,
        processing_status: ProcessingStatus,
    ) -> Self {
        Event::VideoProcessed {
            video_id,
            status,
            processing_status,
        }
    }

    /// The video this event refers to.
    pub fn video_id(&self) -> VideoId {
        match self {
            Event::VideoProcessed { video_id, .. } => *video_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_processed_wire_shape() {
        let id = VideoId::new();
        let event = Event::video_processed(id, SensitivityStatus::Safe, ProcessingStatus::Completed);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"video_processed\""));
        assert!(json.contains(&format!("\"videoId\":\"{}\"", id)));
        assert!(json.contains("\"status\":\"safe\""));
        assert!(json.contains("\"processingStatus\":\"completed\""));
    }

    #[test]
    fn round_trips_through_json() {
        let event = Event::video_processed(
            VideoId::new(),
            SensitivityStatus::Flagged,
            ProcessingStatus::Completed,
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
