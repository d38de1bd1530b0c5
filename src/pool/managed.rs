//! PostgreSQL pool wrapper.
//!
//! # Responsibilities
//! - Build the sqlx pool from configuration, lazily
//! - Count callers waiting for a connection (sqlx does not expose this)
//! - Expose raw counters to the pool monitor
//! - Hand out connections only through the counted `acquire`
//!
//! # Design Decisions
//! - Lazy connect: the process starts and stays up while the database is
//!   down; readiness reports it instead of the process crashing
//! - Socket and connection lifecycle stay with sqlx

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres};

use crate::config::DatabaseConfig;
use crate::pool::monitor::PoolStats;
use crate::pool::snapshot::PoolCounters;

/// sqlx pool plus the counters the monitor needs.
#[derive(Debug)]
pub struct ManagedPool {
    pool: PgPool,
    waiting: AtomicU32,
}

impl ManagedPool {
    /// Build the pool without opening any connection yet.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let options: PgConnectOptions = config.url.parse()?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_millis(config.connection_timeout_ms))
            .idle_timeout(Duration::from_millis(config.idle_timeout_ms))
            .connect_lazy_with(options);

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            waiting: AtomicU32::new(0),
        }
    }

    /// Acquire a connection, counted as waiting until one is handed out.
    ///
    /// The inner `PgPool` is not exposed: acquiring from it directly would
    /// leave the caller out of `waiting_requests`.
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>, sqlx::Error> {
        let _waiting = WaitGuard::enter(&self.waiting);
        self.pool.acquire().await
    }

    /// Cheapest round trip that proves the database answers.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.acquire().await?;
        sqlx::query("SELECT 1").execute(&mut *conn).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl PoolStats for ManagedPool {
    fn counters(&self) -> PoolCounters {
        let options = self.pool.options();
        PoolCounters {
            total_connections: self.pool.size(),
            idle_connections: u32::try_from(self.pool.num_idle()).unwrap_or(u32::MAX),
            waiting_requests: self.waiting.load(Ordering::Relaxed),
            max_connections: options.get_max_connections(),
            min_connections: options.get_min_connections(),
        }
    }
}

/// A RAII guard that counts one waiting acquirer.
///
/// Dropped when the acquire completes or the caller is cancelled.
#[derive(Debug)]
struct WaitGuard<'a> {
    counter: &'a AtomicU32,
}

impl<'a> WaitGuard<'a> {
    fn enter(counter: &'a AtomicU32) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self { counter }
    }
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}
