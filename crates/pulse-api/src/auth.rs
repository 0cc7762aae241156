//! JWT issuing/verification, password hashing, and the request auth guard.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pulse_models::{Role, UserId, UserRecord};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Default token lifetime: 24 hours.
const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// JWT claims. `sub` is the user id; `role` is informational only, the
/// access guard always resolves the live role from the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signing keys, loaded once at startup.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl JwtKeys {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    /// Load the signing secret from the environment. Startup fails when
    /// JWT_SECRET is unset.
    pub fn from_env() -> Result<Self, String> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| "JWT_SECRET not set".to_string())?;
        if secret.len() < 16 {
            return Err("JWT_SECRET must be at least 16 bytes".to_string());
        }
        let ttl_secs = std::env::var("JWT_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        Ok(Self::new(secret.as_bytes(), ttl_secs))
    }

    /// Issue a signed token for a user.
    pub fn issue(&self, user: &UserRecord) -> ApiResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role.as_str().to_string(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("failed to sign token: {}", e)))
    }

    /// Verify a token, with distinct failure reasons for expiry, bad
    /// signature, and malformed payloads.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => ApiError::unauthenticated("token expired"),
                    ErrorKind::InvalidSignature => {
                        ApiError::unauthenticated("invalid token signature")
                    }
                    _ => ApiError::unauthenticated("malformed token"),
                }
            })
    }
}

/// Hash a password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::internal(format!("failed to hash password: {}", e)))
}

/// Verify a password against a stored PHC-format hash.
pub fn verify_password(password: &str, hash: &str) -> ApiResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::internal(format!("stored password hash is invalid: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Authenticated request identity.
///
/// Extraction verifies the bearer token and resolves `sub` to a live user
/// row, so a deleted user's outstanding tokens stop working immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: UserRecord,
}

impl AuthUser {
    /// The single role check used by every gated route.
    pub fn require_role(&self, allowed: &[Role]) -> ApiResult<()> {
        if allowed.contains(&self.user.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "role '{}' is not permitted for this operation",
                self.user.role
            )))
        }
    }

    pub fn id(&self) -> UserId {
        self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthenticated("missing Authorization header"))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthenticated("expected Bearer token"))?;

        resolve_token(state, token).await
    }
}

/// Verify a token and resolve its subject to a live user. Shared between
/// the header extractor and the WebSocket query-param path.
pub async fn resolve_token(state: &AppState, token: &str) -> ApiResult<AuthUser> {
    let claims = state.jwt.verify(token)?;

    let user_id: Uuid = claims
        .sub
        .parse()
        .map_err(|_| ApiError::unauthenticated("malformed token subject"))?;

    let user = state
        .users
        .get(UserId::from(user_id))
        .await?
        .ok_or_else(|| ApiError::unauthenticated("user no longer exists"))?;

    Ok(AuthUser { user })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_models::Role;

    fn test_user(role: Role) -> UserRecord {
        UserRecord::new("alice", "alice@example.com", "$argon2id$...", role)
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let keys = JwtKeys::new(b"test-secret-at-least-16b", 3600);
        let user = test_user(Role::Editor);

        let token = keys.issue(&user).unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, "editor");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_rejected_with_expiry_reason() {
        let keys = JwtKeys::new(b"test-secret-at-least-16b", -3600);
        let token = keys.issue(&test_user(Role::Viewer)).unwrap();

        match keys.verify(&token) {
            Err(ApiError::Unauthenticated(msg)) => assert!(msg.contains("expired")),
            other => panic!("expected expiry rejection, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let keys = JwtKeys::new(b"test-secret-at-least-16b", 3600);
        let other = JwtKeys::new(b"another-secret-16-bytes!", 3600);
        let token = other.issue(&test_user(Role::Viewer)).unwrap();

        assert!(matches!(keys.verify(&token), Err(ApiError::Unauthenticated(_))));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let keys = JwtKeys::new(b"test-secret-at-least-16b", 3600);
        assert!(matches!(
            keys.verify("not.a.token"),
            Err(ApiError::Unauthenticated(_))
        ));
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter2-but-longer").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2-but-longer", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn role_check_is_closed_over_the_allow_list() {
        let viewer = AuthUser { user: test_user(Role::Viewer) };
        let editor = AuthUser { user: test_user(Role::Editor) };
        let admin = AuthUser { user: test_user(Role::Admin) };

        assert!(viewer.require_role(Role::UPLOADERS).is_err());
        assert!(editor.require_role(Role::UPLOADERS).is_ok());
        assert!(admin.require_role(Role::UPLOADERS).is_ok());
    }
}
