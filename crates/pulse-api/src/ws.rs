//! WebSocket event fan-out.
//!
//! Browsers cannot set an Authorization header on the upgrade request, so
//! the bearer token travels as a `token` query parameter.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::auth::resolve_token;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct WsAuthParams {
    pub token: String,
}

/// An absent or malformed `token` query string is an auth failure, not a
/// bad request: the `Option` extractor swallows the Query rejection so we
/// can answer 401 instead of axum's default 400.
fn require_token(params: Option<Query<WsAuthParams>>) -> ApiResult<String> {
    params
        .map(|Query(p)| p.token)
        .ok_or_else(|| ApiError::unauthenticated("Missing token query parameter"))
}

/// GET /ws/events — upgrade and forward every broadcast event.
pub async fn ws_events(
    State(state): State<AppState>,
    params: Option<Query<WsAuthParams>>,
    ws: WebSocketUpgrade,
) -> ApiResult<impl IntoResponse> {
    let token = require_token(params)?;
    let auth = resolve_token(&state, &token).await?;
    let username = auth.user.username.clone();

    Ok(ws.on_upgrade(move |socket| async move {
        info!(user = %username, "WebSocket connected");
        handle_socket(socket, state).await;
        info!(user = %username, "WebSocket disconnected");
    }))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let mut rx = state.hub.subscribe();
    let (mut sender, mut receiver) = socket.split();
    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!("Failed to serialize event: {}", e);
                                continue;
                            }
                        };
                        if sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // Best-effort delivery: the client reconciles by
                        // re-fetching the video list.
                        debug!("WebSocket client lagged, skipped {} events", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    // Ignore pongs and any client-sent payloads.
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_is_unauthenticated() {
        let err = require_token(None).unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[test]
    fn present_token_is_extracted() {
        let params = Query(WsAuthParams {
            token: "header.payload.sig".to_string(),
        });
        assert_eq!(require_token(Some(params)).unwrap(), "header.payload.sig");
    }
}
