use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{NewUser, User, UserRow},
};

/// UserRepository Trait
///
/// The credential store contract. Handlers and the credential service only see this trait,
/// so the Postgres implementation can be swapped for the in-memory one in tests.
///
/// **Send + Sync + async_trait** make `Arc<dyn UserRepository>` shareable across Axum tasks.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Looks a user up by their unique username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Inserts a new user. Returns `StoreError::Duplicate` if the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn count_users(&self) -> Result<i64, StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share the credential store across the application state.
pub type RepositoryState = Arc<dyn UserRepository>;

const USER_COLUMNS: &str = "id, username, password_hash, role, created_at, updated_at";

/// PostgresRepository
///
/// `UserRepository` backed by PostgreSQL. Uniqueness of `username` is enforced by the
/// table's UNIQUE constraint, so concurrent registrations cannot both succeed.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// init_schema
    ///
    /// Creates the `users` table if it does not exist. Safe to call on every startup.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL CHECK (role IN ('admin', 'manager', 'user')),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn into_user(row: UserRow) -> Result<User, StoreError> {
    User::try_from(row).map_err(|e| StoreError::Backend(e.to_string()))
}

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("find_by_username error: {:?}", e);
            StoreError::from(e)
        })?;

        row.map(into_user).transpose()
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, username, password_hash, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, NOW(), NOW()) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from)?;

        into_user(row)
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// InMemoryRepository
///
/// A `UserRepository` kept in a map, used by the test-suite and for running the API without
/// a database. The check-and-insert in `create_user` happens under one write guard.
#[derive(Default)]
pub struct InMemoryRepository {
    users: RwLock<HashMap<String, User>>,
    /// When true, every operation returns a simulated backend failure.
    pub should_fail: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.should_fail {
            return Err(StoreError::Backend(
                "Mock Store Error: Simulation requested".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.check()?;
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.check()?;
        let mut users = self.users.write().await;
        if users.contains_key(&user.username) {
            return Err(StoreError::Duplicate);
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.username.clone(), created.clone());
        Ok(created)
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        self.check()?;
        Ok(self.users.read().await.len() as i64)
    }
}
