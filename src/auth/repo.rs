use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User, UserUpdate};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for user records.
///
/// Records are immutable values: every mutation goes through [`UserUpdate`]
/// and yields the stored result, or `None` when the command's precondition
/// no longer holds.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// The record holding `code`, preferring the one whose code expires last.
    async fn find_by_verification_code(&self, code: &str) -> Result<Option<User>, StoreError>;
    /// The record holding `token` with an expiry strictly after `now`.
    async fn find_by_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError>;
    async fn create(&self, new: NewUser) -> Result<User, StoreError>;
    async fn update(
        &self,
        id: Uuid,
        update: UserUpdate,
        at: OffsetDateTime,
    ) -> Result<Option<User>, StoreError>;
}

const USER_COLUMNS: &str = "id, email, password_hash, name, is_verified, \
     verification_token, verification_token_expire_at, \
     reset_password_token, reset_password_token_expire_at, \
     last_login_date, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_verification_code(&self, code: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE verification_token = $1
            ORDER BY verification_token_expire_at DESC NULLS LAST
            LIMIT 1
            "#
        ))
        .bind(code)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE reset_password_token = $1 AND reset_password_token_expire_at > $2
            "#
        ))
        .bind(token)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, name,
                               verification_token, verification_token_expire_at,
                               last_login_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.name)
        .bind(&new.verification_token)
        .bind(new.verification_token_expire_at)
        .bind(new.created_at)
        .fetch_one(&self.db)
        .await
        .map_err(map_insert_error)?;
        Ok(user)
    }

    async fn update(
        &self,
        id: Uuid,
        update: UserUpdate,
        at: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let user = match update {
            UserUpdate::RecordLogin { at: login_at } => {
                sqlx::query_as::<_, User>(&format!(
                    r#"
                    UPDATE users SET last_login_date = $2, updated_at = $3
                    WHERE id = $1
                    RETURNING {USER_COLUMNS}
                    "#
                ))
                .bind(id)
                .bind(login_at)
                .bind(at)
                .fetch_optional(&self.db)
                .await?
            }
            UserUpdate::MarkVerified { code } => {
                sqlx::query_as::<_, User>(&format!(
                    r#"
                    UPDATE users
                    SET is_verified = TRUE,
                        verification_token = NULL,
                        verification_token_expire_at = NULL,
                        updated_at = $3
                    WHERE id = $1 AND verification_token = $2
                    RETURNING {USER_COLUMNS}
                    "#
                ))
                .bind(id)
                .bind(code)
                .bind(at)
                .fetch_optional(&self.db)
                .await?
            }
            UserUpdate::BeginPasswordReset { token, expires_at } => {
                sqlx::query_as::<_, User>(&format!(
                    r#"
                    UPDATE users
                    SET reset_password_token = $2,
                        reset_password_token_expire_at = $3,
                        updated_at = $4
                    WHERE id = $1
                    RETURNING {USER_COLUMNS}
                    "#
                ))
                .bind(id)
                .bind(token)
                .bind(expires_at)
                .bind(at)
                .fetch_optional(&self.db)
                .await?
            }
            UserUpdate::CompletePasswordReset {
                token,
                password_hash,
                now,
            } => {
                sqlx::query_as::<_, User>(&format!(
                    r#"
                    UPDATE users
                    SET password_hash = $2,
                        reset_password_token = NULL,
                        reset_password_token_expire_at = NULL,
                        updated_at = $5
                    WHERE id = $1
                      AND reset_password_token = $3
                      AND reset_password_token_expire_at > $4
                    RETURNING {USER_COLUMNS}
                    "#
                ))
                .bind(id)
                .bind(password_hash)
                .bind(token)
                .bind(now)
                .bind(at)
                .fetch_optional(&self.db)
                .await?
            }
        };
        Ok(user)
    }
}
