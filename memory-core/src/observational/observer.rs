//! Observer background agent.
//!
//! Wakes on a fixed interval and calls [`ObservationalStore::compress_now`]
//! for every `(thread_id, resource_id)` pair that has been registered via
//! [`Observer::track`]. A `tokio::spawn`ed ticker loop whose `JoinHandle`
//! is aborted on shutdown.

use super::ObservationalStore;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::warn;

/// Background agent that periodically compresses working-set messages
/// into observations. A single iteration's failure is logged
/// and never stops the loop.
pub struct Observer {
    store: Arc<ObservationalStore>,
    tracked: Arc<RwLock<HashSet<(String, String)>>>,
    task: Option<JoinHandle<()>>,
}

impl Observer {
    /// Default wake interval.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

    #[must_use]
    pub fn new(store: Arc<ObservationalStore>) -> Self {
        Self {
            store,
            tracked: Arc::new(RwLock::new(HashSet::new())),
            task: None,
        }
    }

    /// Registers a `(thread_id, resource_id)` pair for the background
    /// loop to check on each tick. Idempotent.
    pub async fn track(&self, thread_id: &str, resource_id: &str) {
        self.tracked
            .write()
            .await
            .insert((thread_id.to_string(), resource_id.to_string()));
    }

    /// Spawns the ticker loop on `interval`. Calling this twice leaks the
    /// previous task; callers should [`Observer::shutdown`] first.
    pub fn spawn(&mut self, interval_duration: Duration) {
        let store = Arc::clone(&self.store);
        let tracked = Arc::clone(&self.tracked);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(interval_duration);
            loop {
                ticker.tick().await;
                let keys: Vec<(String, String)> = tracked.read().await.iter().cloned().collect();
                for (thread_id, resource_id) in keys {
                    if let Err(err) = store.compress_now(&thread_id, &resource_id).await {
                        warn!(%thread_id, %resource_id, error = %err, "observer iteration failed, continuing");
                    }
                }
            }
        });
        self.task = Some(handle);
    }

    /// Aborts the background loop, if running, and waits for it to stop.
    pub async fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
