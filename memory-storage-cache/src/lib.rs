//! # Memory Storage Cache
//!
//! An embedded `redb` hot-read cache fronting [`memory_storage_sql`] — a
//! fast local cache for the hottest few hundred memories.
//! [`CacheStorage`] owns the redb database and an in-memory [`LRUCache`]
//! that tracks which keys are warm; [`sync::CachedStrategicRepository`]
//! wraps any [`memory_core::strategic::StrategicRepository`] (in practice
//! `memory_storage_sql::SqlStorage`) and serves `get`/`list_top_by_confidence`
//! from the cache first, falling through to the inner store on a miss and
//! invalidating the cached entry on every write.

mod cache;
mod skill_cache;
mod strategic_cache;
pub mod sync;
mod topic_cache;

pub use cache::{CacheConfig, CacheMetrics, LRUCache};
pub use sync::CachedStrategicRepository;

use memory_core::{Error, Result};
use redb::{Database, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub(crate) const STRATEGIC_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("strategic_memory");
pub(crate) const TOPIC_CENTROID_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("topic_centroids");
pub(crate) const SKILL_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("skills");
pub(crate) const HOT_LISTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("hot_lists");

const DB_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs a blocking redb operation on the blocking thread pool, bounded by
/// [`DB_OPERATION_TIMEOUT`] so a wedged cache never stalls the retrieval
/// layer's latency budget.
async fn with_db_timeout<T, F>(operation: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(DB_OPERATION_TIMEOUT, tokio::task::spawn_blocking(operation)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(Error::StoreFailure(format!("cache task join error: {join_err}"))),
        Err(_) => Err(Error::StoreFailure(format!(
            "cache operation timed out after {DB_OPERATION_TIMEOUT:?}"
        ))),
    }
}

/// redb-backed hot-read cache: strategic memories, topic centroids, and
/// skills keyed by id, plus a handful of fixed-key "hot list" slots
/// (`top_principles`, `recent_skills`) for list-shaped reads.
pub struct CacheStorage {
    pub(crate) db: Arc<Database>,
    pub(crate) tracker: LRUCache,
}

impl CacheStorage {
    /// Opens (creating if absent) a redb database at `path`.
    ///
    /// # Errors
    /// Returns [`Error::StoreFailure`] if the database cannot be opened.
    pub async fn new(path: &Path) -> Result<Self> {
        Self::with_cache_config(path, CacheConfig::default()).await
    }

    /// Opens a redb database with a custom [`CacheConfig`] for the
    /// in-memory tracker.
    ///
    /// # Errors
    /// Returns [`Error::StoreFailure`] if the database cannot be opened.
    pub async fn with_cache_config(path: &Path, cache_config: CacheConfig) -> Result<Self> {
        info!(path = %path.display(), "opening hot-read cache database");
        let path_buf = path.to_path_buf();
        let db = with_db_timeout(move || {
            Database::create(&path_buf).map_err(|e| Error::StoreFailure(format!("failed to open cache db: {e}")))
        })
        .await?;

        let storage = Self {
            db: Arc::new(db),
            tracker: LRUCache::new(cache_config),
        };
        storage.initialize_tables().await?;
        Ok(storage)
    }

    async fn initialize_tables(&self) -> Result<()> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let write_txn = db
                .begin_write()
                .map_err(|e| Error::StoreFailure(format!("failed to begin write transaction: {e}")))?;
            {
                write_txn
                    .open_table(STRATEGIC_TABLE)
                    .map_err(|e| Error::StoreFailure(format!("failed to open strategic_memory table: {e}")))?;
                write_txn
                    .open_table(TOPIC_CENTROID_TABLE)
                    .map_err(|e| Error::StoreFailure(format!("failed to open topic_centroids table: {e}")))?;
                write_txn
                    .open_table(SKILL_TABLE)
                    .map_err(|e| Error::StoreFailure(format!("failed to open skills table: {e}")))?;
                write_txn
                    .open_table(HOT_LISTS_TABLE)
                    .map_err(|e| Error::StoreFailure(format!("failed to open hot_lists table: {e}")))?;
            }
            write_txn
                .commit()
                .map_err(|e| Error::StoreFailure(format!("failed to commit schema transaction: {e}")))?;
            Ok::<(), Error>(())
        })
        .await
    }

    pub(crate) async fn put_bytes(&self, table: TableDefinition<&'static str, &'static [u8]>, key: String, bytes: Vec<u8>) -> Result<()> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let write_txn = db
                .begin_write()
                .map_err(|e| Error::StoreFailure(format!("failed to begin write transaction: {e}")))?;
            {
                let mut t = write_txn
                    .open_table(table)
                    .map_err(|e| Error::StoreFailure(format!("failed to open table: {e}")))?;
                t.insert(key.as_str(), bytes.as_slice())
                    .map_err(|e| Error::StoreFailure(format!("failed to insert cache entry: {e}")))?;
            }
            write_txn
                .commit()
                .map_err(|e| Error::StoreFailure(format!("failed to commit cache write: {e}")))?;
            Ok::<(), Error>(())
        })
        .await
    }

    pub(crate) async fn get_bytes(&self, table: TableDefinition<&'static str, &'static [u8]>, key: String) -> Result<Option<Vec<u8>>> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let read_txn = db
                .begin_read()
                .map_err(|e| Error::StoreFailure(format!("failed to begin read transaction: {e}")))?;
            let t = read_txn
                .open_table(table)
                .map_err(|e| Error::StoreFailure(format!("failed to open table: {e}")))?;
            match t.get(key.as_str()).map_err(|e| Error::StoreFailure(format!("failed to read cache entry: {e}")))? {
                Some(guard) => Ok(Some(guard.value().to_vec())),
                None => Ok(None),
            }
        })
        .await
    }

    pub(crate) async fn delete_bytes(&self, table: TableDefinition<&'static str, &'static [u8]>, key: String) -> Result<()> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let write_txn = db
                .begin_write()
                .map_err(|e| Error::StoreFailure(format!("failed to begin write transaction: {e}")))?;
            {
                let mut t = write_txn
                    .open_table(table)
                    .map_err(|e| Error::StoreFailure(format!("failed to open table: {e}")))?;
                t.remove(key.as_str())
                    .map_err(|e| Error::StoreFailure(format!("failed to remove cache entry: {e}")))?;
            }
            write_txn
                .commit()
                .map_err(|e| Error::StoreFailure(format!("failed to commit cache delete: {e}")))?;
            Ok::<(), Error>(())
        })
        .await
    }

    /// Current hot-set metrics, exposed for `memory-cli`'s `monitor`
    /// command.
    pub async fn metrics(&self) -> CacheMetrics {
        self.tracker.get_metrics().await
    }
}
