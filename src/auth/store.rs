use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::settings::Database;

/// Errors raised by an [`AccountStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The username is already taken.
    #[error("username already present")]
    Duplicate,
    /// No account exists for the username.
    #[error("no account for username")]
    Missing,
    /// The database failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// How many accounts carry a given username.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// No account.
    Absent,
    /// Exactly one account.
    Unique,
    /// More than one account. The table forbids this, so it signals a data
    /// integrity fault.
    Duplicated(i64),
}

impl From<i64> for Presence {
    fn from(count: i64) -> Self {
        match count {
            c if c <= 0 => Presence::Absent,
            1 => Presence::Unique,
            c => Presence::Duplicated(c),
        }
    }
}

/// Access to the `accounts(username, password)` table.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Number of accounts with this username.
    async fn count(&self, username: &str) -> Result<i64, StoreError>;

    /// The stored password hash. Callers check existence first.
    async fn password_hash(&self, username: &str) -> Result<String, StoreError>;

    /// Adds an account.
    async fn insert(&self, username: &str, password_hash: &str) -> Result<(), StoreError>;

    /// Classifies the username by how many accounts carry it.
    async fn exists(&self, username: &str) -> Result<Presence, StoreError> {
        self.count(username).await.map(Presence::from)
    }
}

/// Account store backed by the PostgreSQL `accounts` table.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Wraps an existing pool.
    pub fn new(pool: PgPool) -> Self {
        PgAccountStore { pool }
    }

    /// Opens a pool with the configured credentials and brings the schema up
    /// to date.
    pub async fn connect(database: &Database) -> Result<Self, sqlx::Error> {
        let options = PgConnectOptions::new()
            .host(&database.host)
            .port(u16::try_from(database.port).unwrap_or_default())
            .username(&database.username)
            .password(&database.password)
            .database(&database.databasename);
        let pool = PgPoolOptions::new()
            .max_connections(database.maxconnections)
            .connect_with(options)
            .await?;
        sqlx::migrate!("database/migrations").run(&pool).await?;
        Ok(PgAccountStore { pool })
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn count(&self, username: &str) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM accounts WHERE username = $1"#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn password_hash(&self, username: &str) -> Result<String, StoreError> {
        sqlx::query_scalar::<_, String>(r#"SELECT password FROM accounts WHERE username = $1"#)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::Missing)
    }

    async fn insert(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        sqlx::query(r#"INSERT INTO accounts (username, password) VALUES ( $1, $2 )"#)
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Duplicate,
                e => StoreError::Database(e),
            })?;
        Ok(())
    }
}

/// Account store kept in process memory, for tests and throwaway setups.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, String>>,
}

impl MemoryAccountStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn count(&self, username: &str) -> Result<i64, StoreError> {
        Ok(i64::from(self.accounts.read().await.contains_key(username)))
    }

    async fn password_hash(&self, username: &str) -> Result<String, StoreError> {
        self.accounts
            .read()
            .await
            .get(username)
            .cloned()
            .ok_or(StoreError::Missing)
    }

    async fn insert(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(username) {
            return Err(StoreError::Duplicate);
        }
        accounts.insert(username.to_string(), password_hash.to_string());
        Ok(())
    }
}
