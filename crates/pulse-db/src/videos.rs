//! Video repository.
//!
//! The terminal moderation transition is a conditional UPDATE guarded on the
//! pending status pair, so a redelivered or concurrent moderation job can
//! never commit a second transition.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use pulse_models::{
    ProcessingStatus, SensitivityStatus, UserId, VideoId, VideoListItem, VideoRecord,
};

use crate::error::{DbError, DbResult};

const VIDEO_COLUMNS: &str = "id, title, description, storage_key, file_url, original_filename, \
     content_type, size_bytes, duration_secs, uploaded_by, processing_status, \
     sensitivity_status, created_at, updated_at";

/// Repository for video records.
#[derive(Clone)]
pub struct VideoRepository {
    pool: PgPool,
}

impl VideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new video record.
    pub async fn create(&self, video: &VideoRecord) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO videos (id, title, description, storage_key, file_url, \
             original_filename, content_type, size_bytes, duration_secs, uploaded_by, \
             processing_status, sensitivity_status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(video.id.as_uuid())
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.storage_key)
        .bind(&video.file_url)
        .bind(&video.original_filename)
        .bind(&video.content_type)
        .bind(video.size_bytes)
        .bind(video.duration_secs)
        .bind(video.uploaded_by.as_uuid())
        .bind(video.processing_status.as_str())
        .bind(video.sensitivity_status.as_str())
        .bind(video.created_at)
        .bind(video.updated_at)
        .execute(&self.pool)
        .await?;

        info!(video_id = %video.id, "Created video record");
        Ok(())
    }

    /// All videos with the owner username, newest first.
    pub async fn list(&self) -> DbResult<Vec<VideoListItem>> {
        let rows = sqlx::query(
            "SELECT v.id, v.title, v.description, v.storage_key, v.file_url, \
             v.original_filename, v.content_type, v.size_bytes, v.duration_secs, \
             v.uploaded_by, v.processing_status, v.sensitivity_status, v.created_at, \
             v.updated_at, u.username AS uploader_username
             FROM videos v
             JOIN users u ON u.id = v.uploaded_by
             ORDER BY v.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                Ok(VideoListItem {
                    video: video_from_row(r)?,
                    uploader_username: r.try_get("uploader_username")?,
                })
            })
            .collect()
    }

    /// A single video by ID.
    pub async fn get(&self, id: VideoId) -> DbResult<Option<VideoRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| video_from_row(&r)).transpose()
    }

    /// Commit the single terminal moderation transition.
    ///
    /// Only rows still in `(processing, pending)` are updated. Returns `true`
    /// when this call performed the transition; `false` means the video no
    /// longer exists or was already transitioned, and the caller must not
    /// publish an event.
    pub async fn complete_moderation(
        &self,
        id: VideoId,
        processing: ProcessingStatus,
        sensitivity: SensitivityStatus,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE videos
             SET processing_status = $2, sensitivity_status = $3, updated_at = now()
             WHERE id = $1
               AND processing_status = 'processing'
               AND sensitivity_status = 'pending'",
        )
        .bind(id.as_uuid())
        .bind(processing.as_str())
        .bind(sensitivity.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a video record. Returns `true` when a row was removed.
    pub async fn delete(&self, id: VideoId) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn video_from_row(row: &PgRow) -> DbResult<VideoRecord> {
    let id: Uuid = row.try_get("id")?;
    let uploaded_by: Uuid = row.try_get("uploaded_by")?;
    let processing: String = row.try_get("processing_status")?;
    let sensitivity: String = row.try_get("sensitivity_status")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(VideoRecord {
        id: VideoId::from(id),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        storage_key: row.try_get("storage_key")?,
        file_url: row.try_get("file_url")?,
        original_filename: row.try_get("original_filename")?,
        content_type: row.try_get("content_type")?,
        size_bytes: row.try_get("size_bytes")?,
        duration_secs: row.try_get("duration_secs")?,
        uploaded_by: UserId::from(uploaded_by),
        processing_status: processing
            .parse::<ProcessingStatus>()
            .map_err(|e| DbError::decode(e.to_string()))?,
        sensitivity_status: sensitivity
            .parse::<SensitivityStatus>()
            .map_err(|e| DbError::decode(e.to_string()))?,
        created_at,
        updated_at,
    })
}
