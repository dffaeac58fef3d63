//! Storage-agnostic persistence contract for the strategic store.
//!
//! A trait implemented by the SQL/cache backend crates, plus an
//! in-memory reference implementation used by default and by tests.

use super::{ActivationLog, OutcomeAttribution, PromotionNarrative, StrategicMemory};
use crate::types::MemoryTier;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Persistence operations the strategic store needs from a backend.
#[async_trait]
pub trait StrategicRepository: Send + Sync {
    async fn insert(&self, mem: StrategicMemory) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<StrategicMemory>>;
    async fn update(&self, mem: StrategicMemory) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;

    async fn list(&self, limit: usize) -> Result<Vec<StrategicMemory>>;
    async fn list_by_category(&self, category: &str, limit: usize) -> Result<Vec<StrategicMemory>>;
    async fn list_by_tier(&self, tier: MemoryTier, limit: usize) -> Result<Vec<StrategicMemory>>;
    /// Loads the top `limit` memories ordered by confidence desc, used by
    /// `SearchSimilar` as its candidate pool.
    async fn list_top_by_confidence(&self, limit: usize) -> Result<Vec<StrategicMemory>>;
    /// Direct children (`parent_id == id`).
    async fn list_children(&self, parent_id: &str) -> Result<Vec<StrategicMemory>>;
    /// Full-text search over `principle`/`trigger_pattern`/`category`
    /// given an already-rewritten FTS query string.
    async fn search_fts(&self, fts_query: &str, limit: usize) -> Result<Vec<StrategicMemory>>;

    async fn insert_narrative(&self, narrative: PromotionNarrative) -> Result<()>;
    async fn insert_attribution(&self, attribution: OutcomeAttribution) -> Result<()>;
    async fn list_attributions(&self, memory_id: &str) -> Result<Vec<OutcomeAttribution>>;
    async fn insert_activation_log(&self, log: ActivationLog) -> Result<()>;
}

/// In-memory reference implementation, `Arc<RwLock<HashMap<..>>>`-backed.
#[derive(Default)]
pub struct InMemoryStrategicRepository {
    memories: Arc<RwLock<HashMap<String, StrategicMemory>>>,
    narratives: Arc<RwLock<Vec<PromotionNarrative>>>,
    attributions: Arc<RwLock<Vec<OutcomeAttribution>>>,
    activation_logs: Arc<RwLock<Vec<ActivationLog>>>,
}

impl InMemoryStrategicRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn naive_fts_match(mem: &StrategicMemory, fts_query: &str) -> bool {
        // `fts_query` is already lowercased `term*` tokens joined by OR;
        // approximate the same survivors as prefix matches against the
        // stored text. This mirrors the real FTS5 prefix-match contract
        // without requiring a storage engine in the in-memory path.
        let haystack = format!(
            "{} {} {}",
            mem.principle.to_lowercase(),
            mem.trigger_pattern.to_lowercase(),
            mem.category.to_lowercase()
        );
        fts_query
            .split(" OR ")
            .map(|t| t.trim_end_matches('*'))
            .any(|term| !term.is_empty() && haystack.contains(term))
    }
}

#[async_trait]
impl StrategicRepository for InMemoryStrategicRepository {
    async fn insert(&self, mem: StrategicMemory) -> Result<()> {
        self.memories.write().await.insert(mem.id.clone(), mem);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<StrategicMemory>> {
        Ok(self.memories.read().await.get(id).cloned())
    }

    async fn update(&self, mem: StrategicMemory) -> Result<()> {
        self.memories.write().await.insert(mem.id.clone(), mem);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.memories.write().await.remove(id);
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<StrategicMemory>> {
        let mut all: Vec<StrategicMemory> = self.memories.read().await.values().cloned().collect();
        sort_by_rate_then_confidence(&mut all);
        all.truncate(limit);
        Ok(all)
    }

    async fn list_by_category(&self, category: &str, limit: usize) -> Result<Vec<StrategicMemory>> {
        let mut matches: Vec<StrategicMemory> = self
            .memories
            .read()
            .await
            .values()
            .filter(|m| m.category == category)
            .cloned()
            .collect();
        sort_by_rate_then_confidence(&mut matches);
        matches.truncate(limit);
        Ok(matches)
    }

    async fn list_by_tier(&self, tier: MemoryTier, limit: usize) -> Result<Vec<StrategicMemory>> {
        let mut matches: Vec<StrategicMemory> = self
            .memories
            .read()
            .await
            .values()
            .filter(|m| m.tier == tier)
            .cloned()
            .collect();
        sort_by_rate_then_confidence(&mut matches);
        matches.truncate(limit);
        Ok(matches)
    }

    async fn list_top_by_confidence(&self, limit: usize) -> Result<Vec<StrategicMemory>> {
        let mut all: Vec<StrategicMemory> = self.memories.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
        all.truncate(limit);
        Ok(all)
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<StrategicMemory>> {
        let mut children: Vec<StrategicMemory> = self
            .memories
            .read()
            .await
            .values()
            .filter(|m| m.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(children)
    }

    async fn search_fts(&self, fts_query: &str, limit: usize) -> Result<Vec<StrategicMemory>> {
        let mut matches: Vec<StrategicMemory> = self
            .memories
            .read()
            .await
            .values()
            .filter(|m| Self::naive_fts_match(m, fts_query))
            .cloned()
            .collect();
        sort_by_rate_then_confidence(&mut matches);
        matches.truncate(limit);
        Ok(matches)
    }

    async fn insert_narrative(&self, narrative: PromotionNarrative) -> Result<()> {
        self.narratives.write().await.push(narrative);
        Ok(())
    }

    async fn insert_attribution(&self, attribution: OutcomeAttribution) -> Result<()> {
        self.attributions.write().await.push(attribution);
        Ok(())
    }

    async fn list_attributions(&self, memory_id: &str) -> Result<Vec<OutcomeAttribution>> {
        Ok(self
            .attributions
            .read()
            .await
            .iter()
            .filter(|a| a.memory_id == memory_id)
            .cloned()
            .collect())
    }

    async fn insert_activation_log(&self, log: ActivationLog) -> Result<()> {
        self.activation_logs.write().await.push(log);
        Ok(())
    }
}

/// Shared secondary ordering: success rate desc, then confidence desc.
fn sort_by_rate_then_confidence(memories: &mut [StrategicMemory]) {
    memories.sort_by(|a, b| {
        b.success_rate()
            .partial_cmp(&a.success_rate())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal))
    });
}
