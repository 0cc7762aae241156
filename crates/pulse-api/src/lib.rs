//! Axum HTTP API server.
//!
//! This crate provides:
//! - User registration and login with Argon2id hashing and HS256 JWTs
//! - Role-gated multipart video upload with rollback on partial failure
//! - Video list/get/delete endpoints
//! - WebSocket fan-out of moderation events through an in-process hub

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use hub::EventHub;
pub use routes::create_router;
pub use state::AppState;
