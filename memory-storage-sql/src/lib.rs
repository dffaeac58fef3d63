//! # Memory Storage SQL
//!
//! libSQL (Turso-compatible, embedded-SQLite wire format) relational
//! storage backend for `memory-core`'s five repository traits
//! (`StrategicRepository`, `TopicRepository`, `SkillRepository`,
//! `ObservationalRepository`, `CoreMemoryRepository`), persisting the
//! logical schema described in [`schema`].
//!
//! A single [`SqlStorage`] connects to a libSQL database (local file or
//! remote Turso endpoint), applies the schema in [`schema`] idempotently,
//! and implements every repository trait directly — each trait's
//! `insert`/`get`/... methods compile to distinct symbols even though
//! several share a name (`insert`, `get`, `update`) across traits,
//! alongside its own inherent methods.

pub mod pool;
mod repo;
pub mod schema;

pub use pool::{ConnectionPool, PoolConfig, PoolStatistics};

use libsql::{Builder, Connection, Database};
use memory_core::{Error, Result};
use std::sync::Arc;

/// libSQL storage backend: owns the database handle and a bounded
/// connection pool.
pub struct SqlStorage {
    db: Arc<Database>,
    pool: Arc<ConnectionPool>,
}

impl SqlStorage {
    /// Opens a local on-disk (or `:memory:`) libSQL database.
    ///
    /// # Errors
    /// Returns [`Error::StoreFailure`] if the database cannot be opened
    /// or the connection pool fails its initial health check.
    pub async fn new_local(path: &str) -> Result<Self> {
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| Error::StoreFailure(format!("failed to open database: {e}")))?;
        Self::from_database(db).await
    }

    /// Connects to a remote Turso/libSQL endpoint.
    ///
    /// # Errors
    /// Returns [`Error::StoreFailure`] if the remote database cannot be
    /// reached or the connection pool fails its initial health check.
    pub async fn new_remote(url: &str, auth_token: &str) -> Result<Self> {
        let db = Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await
            .map_err(|e| Error::StoreFailure(format!("failed to connect to {url}: {e}")))?;
        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self> {
        let db = Arc::new(db);
        let pool = ConnectionPool::new(Arc::clone(&db), PoolConfig::default()).await?;
        Ok(Self {
            db,
            pool: Arc::new(pool),
        })
    }

    /// Applies every `CREATE TABLE IF NOT EXISTS` / `CREATE VIRTUAL
    /// TABLE IF NOT EXISTS` / `CREATE INDEX IF NOT EXISTS` statement in
    /// [`schema::ALL_STATEMENTS`]; idempotent, safe to call on every
    /// startup.
    ///
    /// # Errors
    /// Returns [`Error::StoreFailure`] if any statement fails.
    pub async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection().await?;
        for statement in schema::ALL_STATEMENTS {
            conn.execute(statement, ())
                .await
                .map_err(|e| Error::StoreFailure(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }

    /// Pool statistics, exposed for CLI `health`/`monitor` reporting.
    pub async fn pool_statistics(&self) -> PoolStatistics {
        self.pool.statistics().await
    }

    pub(crate) async fn connection(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| Error::StoreFailure(format!("failed to open connection: {e}")))
    }
}
