use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, instrument};

use super::database::run_traced;
use crate::models::{AuthToken, NewUser, RepositoryError, RepositoryResult, User};
use crate::observability::{DatabaseTracingMiddleware, Metrics};

const USERS: &str = "users";
const TOKENS: &str = "auth_tokens";

/// Data access for user accounts and their API tokens
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;

    /// `ConstraintViolation` when the username is taken
    async fn create(&self, user: NewUser) -> RepositoryResult<User>;

    async fn find_token_for_user(&self, user_id: i64) -> RepositoryResult<Option<AuthToken>>;

    /// Store `key` for the user unless a token already exists, returning whichever is kept
    async fn get_or_create_token(&self, user_id: i64, key: &str) -> RepositoryResult<AuthToken>;

    /// Owner of the token with this key
    async fn find_user_by_token(&self, key: &str) -> RepositoryResult<Option<User>>;
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
    tracer: Option<DatabaseTracingMiddleware>,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, tracer: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.tracer = Some(DatabaseTracingMiddleware::new(metrics));
        self
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        run_traced(
            self.tracer.as_ref(),
            "select",
            USERS,
            sqlx::query_as::<_, User>(
                "SELECT id, username, password_hash, is_staff, created_at FROM users WHERE username = ?",
            )
            .bind(username)
            .fetch_optional(&self.pool),
        )
        .await
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create(&self, user: NewUser) -> RepositoryResult<User> {
        let created_at = Utc::now();
        let result = run_traced(
            self.tracer.as_ref(),
            "insert",
            USERS,
            sqlx::query(
                "INSERT INTO users (username, password_hash, is_staff, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.is_staff)
            .bind(created_at)
            .execute(&self.pool),
        )
        .await?;

        info!("User created");
        Ok(User {
            id: result.last_insert_rowid(),
            username: user.username,
            password_hash: user.password_hash,
            is_staff: user.is_staff,
            created_at,
        })
    }

    #[instrument(skip(self))]
    async fn find_token_for_user(&self, user_id: i64) -> RepositoryResult<Option<AuthToken>> {
        run_traced(
            self.tracer.as_ref(),
            "select",
            TOKENS,
            sqlx::query_as::<_, AuthToken>(
                "SELECT key, user_id, created_at FROM auth_tokens WHERE user_id = ?",
            )
            .bind(user_id)
            .fetch_optional(&self.pool),
        )
        .await
    }

    #[instrument(skip(self, key))]
    async fn get_or_create_token(&self, user_id: i64, key: &str) -> RepositoryResult<AuthToken> {
        // Concurrent first logins race on the user_id unique index; the loser keeps the winner's key
        let result = run_traced(
            self.tracer.as_ref(),
            "insert",
            TOKENS,
            sqlx::query(
                "INSERT INTO auth_tokens (key, user_id, created_at) VALUES (?, ?, ?) \
                 ON CONFLICT (user_id) DO NOTHING",
            )
            .bind(key)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() > 0 {
            info!("Token issued");
        }

        self.find_token_for_user(user_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self, key))]
    async fn find_user_by_token(&self, key: &str) -> RepositoryResult<Option<User>> {
        run_traced(
            self.tracer.as_ref(),
            "select",
            TOKENS,
            sqlx::query_as::<_, User>(
                "SELECT u.id, u.username, u.password_hash, u.is_staff, u.created_at \
                 FROM auth_tokens t JOIN users u ON u.id = t.user_id WHERE t.key = ?",
            )
            .bind(key)
            .fetch_optional(&self.pool),
        )
        .await
    }
}
