//! Video handlers: list, get, multipart upload intake, and deletion.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{error, info, warn};
use uuid::Uuid;

use pulse_models::{
    sanitize_title, validate_upload, UploadValidationError, VideoId, VideoListItem, VideoRecord,
};
use pulse_queue::ModerationJob;
use pulse_storage::video_object_key;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /videos — all videos with the owner username, newest first.
pub async fn list_videos(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> ApiResult<Json<Vec<VideoListItem>>> {
    let videos = state.videos.list().await?;
    Ok(Json(videos))
}

/// GET /videos/:id — a single video record.
pub async fn get_video(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(video_id): Path<Uuid>,
) -> ApiResult<Json<VideoRecord>> {
    let video = state
        .videos
        .get(VideoId::from(video_id))
        .await?
        .ok_or_else(|| ApiError::not_found("video not found"))?;

    Ok(Json(video))
}

/// Multipart fields collected from an upload request.
struct UploadForm {
    filename: String,
    content_type: String,
    data: Vec<u8>,
    title: Option<String>,
    description: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut title = None;
    let mut description = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("video") => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| ApiError::bad_request("video field is missing a filename"))?;
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field.bytes().await.map_err(|e| {
                    ApiError::bad_request(format!("failed to read video field: {}", e))
                })?;
                file = Some((filename, content_type, data.to_vec()));
            }
            Some("title") => {
                title = Some(field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("failed to read title field: {}", e))
                })?);
            }
            Some("description") => {
                description = Some(field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("failed to read description field: {}", e))
                })?);
            }
            _ => {}
        }
    }

    let (filename, content_type, data) =
        file.ok_or_else(|| ApiError::bad_request("missing 'video' file field"))?;

    Ok(UploadForm {
        filename,
        content_type,
        data,
        title,
        description,
    })
}

/// POST /videos/upload — editor/admin only.
///
/// Validation runs before any storage write. The status pair starts as
/// `(processing, pending)` and the durable moderation job is enqueued
/// before the 201 is returned; any failure after the storage write rolls
/// back so no orphaned object or record survives.
pub async fn upload_video(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<VideoRecord>)> {
    auth.require_role(pulse_models::Role::UPLOADERS)?;

    let form = read_upload_form(multipart).await?;

    validate_upload(
        &form.filename,
        &form.content_type,
        form.data.len(),
        state.config.max_upload_bytes,
    )
    .map_err(|e| match e {
        UploadValidationError::TooLarge { .. } => ApiError::PayloadTooLarge(e.to_string()),
        _ => ApiError::UnsupportedMediaType(e.to_string()),
    })?;

    let video_id = VideoId::new();
    let storage_key = video_object_key(&video_id.to_string(), &form.filename);
    let size_bytes = form.data.len() as i64;

    state
        .storage
        .upload_bytes(form.data, &storage_key, &form.content_type)
        .await?;

    let title = form
        .title
        .as_deref()
        .map(sanitize_title)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| form.filename.clone());

    let mut video = VideoRecord::new(
        title,
        form.description.filter(|d| !d.trim().is_empty()),
        storage_key.clone(),
        state.storage.object_url(&storage_key),
        form.filename,
        form.content_type,
        size_bytes,
        auth.id(),
    );
    video.id = video_id;

    if let Err(e) = state.videos.create(&video).await {
        warn!(video_id = %video.id, "Metadata write failed, removing stored object");
        if let Err(del) = state.storage.delete_object(&storage_key).await {
            error!(video_id = %video.id, "Orphan cleanup failed: {}", del);
        }
        return Err(ApiError::from(e));
    }

    let delay = chrono::Duration::from_std(state.config.moderation_delay)
        .unwrap_or_else(|_| chrono::Duration::seconds(10));
    let job = ModerationJob::new(video.id, delay);

    if let Err(e) = state.queue.enqueue(&job).await {
        warn!(video_id = %video.id, "Enqueue failed, rolling back upload");
        if let Err(del) = state.videos.delete(video.id).await {
            error!(video_id = %video.id, "Record rollback failed: {}", del);
        }
        if let Err(del) = state.storage.delete_object(&storage_key).await {
            error!(video_id = %video.id, "Orphan cleanup failed: {}", del);
        }
        return Err(ApiError::from(e));
    }

    info!(video_id = %video.id, user_id = %auth.id(), "Upload accepted");
    Ok((StatusCode::CREATED, Json(video)))
}

/// DELETE /videos/:id — owner or admin only.
///
/// Removes the storage object first (a missing object is tolerated), then
/// the record. Broadcasts no event.
pub async fn delete_video(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(video_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let id = VideoId::from(video_id);

    let video = state
        .videos
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("video not found"))?;

    if video.uploaded_by != auth.id() && !auth.is_admin() {
        return Err(ApiError::forbidden("only the owner or an admin may delete"));
    }

    if let Err(e) = state.storage.delete_object(&video.storage_key).await {
        warn!(video_id = %id, "Storage delete failed, removing record anyway: {}", e);
    }

    if !state.videos.delete(id).await? {
        return Err(ApiError::not_found("video not found"));
    }

    info!(video_id = %id, user_id = %auth.id(), "Video deleted");
    Ok(StatusCode::NO_CONTENT)
}
