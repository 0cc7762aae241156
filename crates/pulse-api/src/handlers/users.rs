//! User registration and login handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use pulse_models::{Role, UserRecord};

use crate::auth::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    /// Optional; defaults to viewer.
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response shape shared by register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub token: String,
}

impl AuthResponse {
    fn new(user: &UserRecord, token: String) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            token,
        }
    }
}

/// POST /users — register a new user; role defaults to viewer.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let password_hash = hash_password(&req.password)?;
    let user = UserRecord::new(
        req.username.trim(),
        req.email.trim().to_ascii_lowercase(),
        password_hash,
        req.role.unwrap_or_default(),
    );

    state.users.create(&user).await.map_err(|e| {
        if e.is_conflict() {
            ApiError::conflict("email or username already registered")
        } else {
            ApiError::from(e)
        }
    })?;

    let token = state.jwt.issue(&user)?;

    info!(user_id = %user.id, "Registered user");
    Ok((StatusCode::CREATED, Json(AuthResponse::new(&user, token))))
}

/// POST /users/login — authenticate with email and password.
///
/// Unknown email and failed verification both return the same 401 so the
/// response does not reveal which accounts exist.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let email = req.email.trim().to_ascii_lowercase();

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::unauthenticated("invalid email or password"))?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::unauthenticated("invalid email or password"));
    }

    let token = state.jwt.issue(&user)?;

    info!(user_id = %user.id, "User logged in");
    Ok(Json(AuthResponse::new(&user, token)))
}
