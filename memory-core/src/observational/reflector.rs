//! Reflector background agent.
//!
//! Wakes on its own fixed interval and calls
//! [`ObservationalStore::reflect_now`] for every `resource_id` registered
//! via [`Reflector::track`]. Same ticker/abort idiom as [`super::Observer`].

use super::ObservationalStore;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::warn;

/// Background agent that periodically distills observations into
/// reflections. A single iteration's failure is logged and
/// never stops the loop.
pub struct Reflector {
    store: Arc<ObservationalStore>,
    tracked: Arc<RwLock<HashSet<String>>>,
    task: Option<JoinHandle<()>>,
}

impl Reflector {
    /// Default wake interval.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

    #[must_use]
    pub fn new(store: Arc<ObservationalStore>) -> Self {
        Self {
            store,
            tracked: Arc::new(RwLock::new(HashSet::new())),
            task: None,
        }
    }

    /// Registers a `resource_id` for the background loop to check on
    /// each tick. Idempotent.
    pub async fn track(&self, resource_id: &str) {
        self.tracked.write().await.insert(resource_id.to_string());
    }

    /// Spawns the ticker loop on `interval`. Calling this twice leaks the
    /// previous task; callers should [`Reflector::shutdown`] first.
    pub fn spawn(&mut self, interval_duration: Duration) {
        let store = Arc::clone(&self.store);
        let tracked = Arc::clone(&self.tracked);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(interval_duration);
            loop {
                ticker.tick().await;
                let keys: Vec<String> = tracked.read().await.iter().cloned().collect();
                for resource_id in keys {
                    if let Err(err) = store.reflect_now(&resource_id).await {
                        warn!(%resource_id, error = %err, "reflector iteration failed, continuing");
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

impl Drop for Reflector {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ObservationalConfig;
    use crate::external::LlmProvider;
    use crate::observational::InMemoryObservationalRepository;
    use crate::Result;
    use async_trait::async_trait;

    struct StubLlm;

    #[async_trait]
    impl LlmProvider for StubLlm {
        async fn chat(&self, _messages: &[(String, String)], _system_prompt: &str) -> Result<String> {
            Ok("a workflow pattern emerged".into())
        }
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok("a workflow pattern emerged".into())
        }
    }

    #[tokio::test]
    async fn track_then_shutdown_without_spawning_is_a_noop() {
        let store = Arc::new(ObservationalStore::new(
            Arc::new(InMemoryObservationalRepository::new()),
            Some(Arc::new(StubLlm)),
            ObservationalConfig::default(),
        ));
        let mut reflector = Reflector::new(store);
        reflector.track("r1").await;
        reflector.shutdown().await;
    }
}
