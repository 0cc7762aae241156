//! Health and readiness handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
pub struct ReadyResponse {
    status: &'static str,
    database: &'static str,
    storage: &'static str,
    queue: &'static str,
}

/// Readiness probe with per-dependency checks.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let database = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => "ok",
        Err(_) => "error",
    };

    let storage = match state.storage.check_connectivity().await {
        Ok(_) => "ok",
        Err(_) => "error",
    };

    let queue = match state.queue.len().await {
        Ok(_) => "ok",
        Err(_) => "error",
    };

    let all_ok = [database, storage, queue].iter().all(|s| *s == "ok");

    let response = ReadyResponse {
        status: if all_ok { "ready" } else { "degraded" },
        database,
        storage,
        queue,
    };

    let code = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(response))
}
