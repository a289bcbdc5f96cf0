use std::sync::Mutex;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::Mutex as AsyncMutex;

use crate::config::Config;

/// Process-wide handle to the store.
///
/// The pool is created on the first `acquire()` and shared afterwards. When a statement fails
/// with a connection-level error the handle is dropped, so the next `acquire()` builds a fresh
/// pool.
pub struct PoolManager {
    database_url: String,
    max_connections: u32,
    connect_timeout: Duration,
    pool: Mutex<Option<PgPool>>,
    init: AsyncMutex<()>,
}

impl PoolManager {
    pub fn new(config: &Config) -> Self {
        Self {
            database_url: config.database_url.clone(),
            max_connections: config.db_max_connections,
            connect_timeout: Duration::from_secs(config.db_connect_timeout_secs),
            pool: Mutex::new(None),
            init: AsyncMutex::new(()),
        }
    }

    pub async fn acquire(&self) -> Result<PgPool, sqlx::Error> {
        if let Some(pool) = self.current() {
            return Ok(pool);
        }

        // Only one task builds the pool; the others wait and pick it up.
        let _guard = self.init.lock().await;
        if let Some(pool) = self.current() {
            return Ok(pool);
        }

        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.connect_timeout)
            .connect(&self.database_url)
            .await
            .inspect_err(|e| tracing::error!("Failed to create database connection pool: {e}"))?;
        tracing::info!("Database connection pool created");

        *self.slot() = Some(pool.clone());
        Ok(pool)
    }

    /// Pass a failed statement's error through, discarding the pool when the error means the
    /// connection itself is unusable.
    pub fn report(&self, err: sqlx::Error) -> sqlx::Error {
        if is_fatal(&err) {
            if let Some(pool) = self.slot().take() {
                tracing::warn!("Resetting database pool after fatal error: {err}");
                tokio::spawn(async move { pool.close().await });
            }
        }
        err
    }

    pub fn is_initialized(&self) -> bool {
        self.slot().is_some()
    }

    fn current(&self) -> Option<PgPool> {
        self.slot().clone()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<PgPool>> {
        self.pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn is_fatal(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

/// Run the migrations embedded from ./migrations/
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PoolManager {
        PoolManager {
            database_url: "postgres://localhost:1/none".into(),
            max_connections: 1,
            connect_timeout: Duration::from_secs(1),
            pool: Mutex::new(None),
            init: AsyncMutex::new(()),
        }
    }

    #[test]
    fn connection_level_errors_are_fatal() {
        assert!(is_fatal(&sqlx::Error::PoolClosed));
        assert!(is_fatal(&sqlx::Error::WorkerCrashed));
        assert!(is_fatal(&sqlx::Error::Protocol("bad frame".into())));
        assert!(is_fatal(&sqlx::Error::Io(std::io::Error::other("reset"))));
    }

    #[test]
    fn query_level_errors_keep_the_pool() {
        assert!(!is_fatal(&sqlx::Error::RowNotFound));
        assert!(!is_fatal(&sqlx::Error::PoolTimedOut));
        assert!(!is_fatal(&sqlx::Error::ColumnNotFound("x".into())));
    }

    #[tokio::test]
    async fn pool_is_created_lazily() {
        let manager = manager();
        assert!(!manager.is_initialized());
        // Reporting without a pool is a no-op.
        let err = manager.report(sqlx::Error::PoolClosed);
        assert!(matches!(err, sqlx::Error::PoolClosed));
        assert!(!manager.is_initialized());
    }

    #[tokio::test]
    async fn fatal_error_discards_the_pool() {
        let manager = manager();
        let lazy = PgPoolOptions::new()
            .connect_lazy("postgres://localhost:1/none")
            .unwrap();
        *manager.slot() = Some(lazy);
        assert!(manager.is_initialized());

        manager.report(sqlx::Error::RowNotFound);
        assert!(manager.is_initialized());

        manager.report(sqlx::Error::PoolClosed);
        assert!(!manager.is_initialized());
    }
}
