//! Database module for persistent storage.
//!
//! Provides the [`UserStore`] abstraction with two backends:
//! - [`Database`]: async PostgreSQL access using SQLx (production)
//! - [`MemoryUserStore`]: process-local store (development and tests)

mod memory;
mod users;

pub use memory::MemoryUserStore;
pub use users::{User, UserRepository};

use crate::config::DatabaseConfig;
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),
    #[error("migration error: {0}")]
    Migration(sqlx::migrate::MigrateError),
    #[error("email already registered: {0}")]
    EmailExists(String),
    #[error("database unavailable after {attempts} attempts: {source}")]
    Unavailable {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },
}

/// Storage for registered users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with [`DbError::EmailExists`] on duplicates.
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, DbError>;

    /// Look up a user by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), DbError>;
}

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to Postgres, retrying while the server comes up, then run migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbError> {
        let url = config.connection_url();
        let attempts = config.connect_retries.max(1);
        let interval = Duration::from_secs(config.retry_interval_secs);

        let mut attempt = 0;
        let pool = loop {
            attempt += 1;
            match Self::pool_options(config).connect(&url).await {
                Ok(pool) => break pool,
                Err(e) if attempt < attempts => {
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Database not reachable yet, retrying"
                    );
                    tokio::time::sleep(interval).await;
                }
                Err(e) => {
                    return Err(DbError::Unavailable {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        };

        info!(url = %config.redacted_url(), "Database connected");

        Self::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_secs)))
            .test_before_acquire(true)
    }

    /// Run embedded migrations.
    async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(DbError::Migration)?;

        info!("Database migrations checked/applied");
        Ok(())
    }

    /// Get user repository.
    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.pool)
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl UserStore for Database {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, DbError> {
        self.users().create(name, email, hashed_password).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        self.users().find_by_email(email).await
    }

    async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        DbError::Sqlx(err)
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err)
    }
}
