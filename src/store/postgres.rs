/// Postgres-backed stores (sqlx)

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{RefreshToken, User};
use crate::error::AppError;
use crate::store::{RefreshTokenStore, UserStore};

const UNIQUE_VIOLATION: &str = "23505";

const USER_COLUMNS: &str = r#"
    id, email, password_hash, name, phone, avatar_url, oauth_provider, oauth_id,
    email_verified, verification_token, verification_token_expires_at,
    reset_token, reset_token_expires_at, created_at, updated_at
"#;

/// Map unique-constraint violations to `AlreadyExists`; everything else stays a database error
fn map_write_error(err: sqlx::Error, duplicate: &'static str) -> AppError {
    let is_duplicate = err
        .as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| code == UNIQUE_VIOLATION);

    if is_duplicate {
        AppError::AlreadyExists(duplicate)
    } else {
        AppError::from(err)
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, password_hash, name, phone, avatar_url, oauth_provider, oauth_id,
                email_verified, verification_token, verification_token_expires_at,
                reset_token, reset_token_expires_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.avatar_url)
        .bind(&user.oauth_provider)
        .bind(&user.oauth_id)
        .bind(user.email_verified)
        .bind(&user.verification_token)
        .bind(user.verification_token_expires_at)
        .bind(&user.reset_token)
        .bind(user.reset_token_expires_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "user with this email already exists"))?;

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.fetch_one_by("email", email).await
    }

    async fn get_by_oauth_id(
        &self,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<User>, AppError> {
        let query = format!(
            "SELECT {} FROM users WHERE oauth_provider = $1 AND oauth_id = $2",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(provider)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_by_verification_token(&self, token: &str) -> Result<Option<User>, AppError> {
        self.fetch_one_by("verification_token", token).await
    }

    async fn get_by_reset_token(&self, token: &str) -> Result<Option<User>, AppError> {
        self.fetch_one_by("reset_token", token).await
    }

    async fn consume_reset_token(&self, token: &str, password_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, reset_token = NULL, reset_token_expires_at = NULL,
                updated_at = $2
            WHERE reset_token = $3
            "#,
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update(&self, user: &User) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, name = $4, phone = $5, avatar_url = $6,
                oauth_provider = $7, oauth_id = $8, email_verified = $9,
                verification_token = $10, verification_token_expires_at = $11,
                reset_token = $12, reset_token_expires_at = $13, updated_at = $14
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.avatar_url)
        .bind(&user.oauth_provider)
        .bind(&user.oauth_id)
        .bind(user.email_verified)
        .bind(&user.verification_token)
        .bind(user.verification_token_expires_at)
        .bind(&user.reset_token)
        .bind(user.reset_token_expires_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "account already linked to another user"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("user"));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("user"));
        }
        Ok(())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError> {
        let query = format!(
            "SELECT {} FROM users ORDER BY created_at, id LIMIT $1 OFFSET $2",
            USER_COLUMNS
        );
        let users = sqlx::query_as::<_, User>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }
}

#[derive(Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn create(&self, token: &RefreshToken) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.created_at)
        .bind(token.revoked_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "refresh token already exists"))?;

        Ok(())
    }

    async fn get_by_token(&self, token_hash: &str) -> Result<Option<RefreshToken>, AppError> {
        let token = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, user_id, token_hash, expires_at, created_at, revoked_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }

    async fn list_valid_for_user(&self, user_id: Uuid) -> Result<Vec<RefreshToken>, AppError> {
        let tokens = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, user_id, token_hash, expires_at, created_at, revoked_at
            FROM refresh_tokens
            WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > $2
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await?;
        Ok(tokens)
    }

    async fn revoke(&self, token_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $1
            WHERE token_hash = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(token_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $1
            WHERE user_id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
