//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    delete_video, get_video, health, list_videos, login, ready, register, upload_video,
};
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;
use crate::ws::ws_events;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/users", post(register))
        .route("/users/login", post(login));

    let video_routes = Router::new()
        .route("/videos", get(list_videos))
        .route("/videos/:video_id", get(get_video))
        .route("/videos/:video_id", delete(delete_video))
        .route("/videos/upload", post(upload_video));

    let ws_routes = Router::new().route("/ws/events", get(ws_events));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    Router::new()
        .merge(user_routes)
        .merge(video_routes)
        .merge(ws_routes)
        .merge(health_routes)
        // Belt on top of per-upload validation: cap the raw request body.
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
