//! User repository.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use pulse_models::{Role, UserId, UserRecord};

use crate::error::{DbError, DbResult};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, created_at, updated_at";

/// Repository for user identities.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user. Fails with `Conflict` on duplicate email or
    /// username.
    pub async fn create(&self, user: &UserRecord) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, role, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from_sqlx(e, "user email or username already exists"))?;

        info!(user_id = %user.id, "Created user record");
        Ok(())
    }

    /// Look up a user by login email.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<UserRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| user_from_row(&r)).transpose()
    }

    /// Look up a user by ID.
    pub async fn get(&self, id: UserId) -> DbResult<Option<UserRecord>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| user_from_row(&r)).transpose()
    }
}

fn user_from_row(row: &PgRow) -> DbResult<UserRecord> {
    let id: Uuid = row.try_get("id")?;
    let role: String = row.try_get("role")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(UserRecord {
        id: UserId::from(id),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: role
            .parse::<Role>()
            .map_err(|e| DbError::decode(e.to_string()))?,
        created_at,
        updated_at,
    })
}
