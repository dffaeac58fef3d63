//! Public contract of the strategic principle store.

use super::repository::StrategicRepository;
use super::tier::{self, PromotionOutcome};
use super::{truncate_chars, ActivationLog, MemoryImpact, OutcomeAttribution, PromotionNarrative, StrategicMemory};
use crate::config::{PromotionThresholds, EMBED_FAST_TIMEOUT, MIN_EVIDENCE};
use crate::external::Embedder;
use crate::types::{new_id, Lane, MemoryTier, Outcome, RetrievalType};
use crate::vector::{cosine_similarity, top_k_heap, ScoredItem};
use crate::{Error, Result};
use chrono::Utc;
use std::sync::Arc;

/// Stop words dropped during FTS tokenization.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "to", "of", "in", "on",
    "for", "with", "this", "that", "it", "as", "at", "by", "be",
];

/// Strategic principle store: CRUD, outcome recording, tier calculation,
/// evolution, attribution.
pub struct StrategicStore {
    repo: Arc<dyn StrategicRepository>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl StrategicStore {
    #[must_use]
    pub fn new(repo: Arc<dyn StrategicRepository>, embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self { repo, embedder }
    }

    /// Creates a memory. `confidence` overrides the default of 0.5 when
    /// given; `None` lets a caller that has no opinion on the starting
    /// confidence omit it without being confused for an explicit 0.0.
    /// Fails with [`Error::InvalidInput`] if `principle` is empty;
    /// [`Error::EmbedFailure`] if an embedder is configured and returns
    /// an error.
    pub async fn create(&self, mut mem: StrategicMemory, confidence: Option<f32>) -> Result<StrategicMemory> {
        if mem.principle.trim().is_empty() {
            return Err(Error::InvalidInput("principle must not be empty".into()));
        }
        if mem.id.is_empty() {
            mem.id = new_id("strat");
        }
        if let Some(embedder) = &self.embedder {
            let text = format!("{} {}", mem.principle, mem.trigger_pattern);
            let embedding = embedder
                .embed(&text)
                .await
                .map_err(|e| Error::EmbedFailure(e.to_string()))?;
            mem.embedding = Some(embedding);
        }
        let now = Utc::now();
        mem.tier = MemoryTier::Tentative;
        mem.confidence = confidence.unwrap_or(0.5);
        mem.version = 1;
        mem.created_at = now;
        mem.updated_at = now;
        self.repo.insert(mem.clone()).await?;
        Ok(mem)
    }

    pub async fn get(&self, id: &str) -> Result<StrategicMemory> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Atomically increments `success_count`/`apply_count`, bumps
    /// `last_applied_at`/`updated_at`.
    pub async fn record_success(&self, id: &str) -> Result<StrategicMemory> {
        let mut mem = self.get(id).await?;
        mem.success_count += 1;
        mem.apply_count += 1;
        let now = Utc::now();
        mem.last_applied_at = Some(now);
        mem.updated_at = now;
        self.repo.update(mem.clone()).await?;
        Ok(mem)
    }

    /// Atomically increments `failure_count`/`apply_count`, bumps
    /// `last_applied_at`/`updated_at`.
    pub async fn record_failure(&self, id: &str) -> Result<StrategicMemory> {
        let mut mem = self.get(id).await?;
        mem.failure_count += 1;
        mem.apply_count += 1;
        let now = Utc::now();
        mem.last_applied_at = Some(now);
        mem.updated_at = now;
        self.repo.update(mem.clone()).await?;
        Ok(mem)
    }

    pub async fn update_confidence(&self, id: &str, confidence: f32) -> Result<StrategicMemory> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::InvalidInput(format!(
                "confidence {confidence} out of range [0,1]"
            )));
        }
        let mut mem = self.get(id).await?;
        mem.confidence = confidence;
        mem.updated_at = Utc::now();
        self.repo.update(mem.clone()).await?;
        Ok(mem)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.repo.delete(id).await
    }

    /// Memories with `apply_count >= MIN_EVIDENCE`, ordered by success
    /// rate desc then confidence desc.
    pub async fn get_top_principles(&self, limit: usize) -> Result<Vec<StrategicMemory>> {
        let all = self.repo.list(usize::MAX).await?;
        let mut eligible: Vec<StrategicMemory> = all
            .into_iter()
            .filter(|m| m.success_count + m.failure_count >= MIN_EVIDENCE)
            .collect();
        eligible.sort_by(|a, b| {
            b.success_rate()
                .partial_cmp(&a.success_rate())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal))
        });
        eligible.truncate(limit);
        Ok(eligible)
    }

    pub async fn get_by_category(&self, category: &str, limit: usize) -> Result<Vec<StrategicMemory>> {
        self.repo.list_by_category(category, limit).await
    }

    pub async fn get_by_tier(&self, tier: MemoryTier, limit: usize) -> Result<Vec<StrategicMemory>> {
        self.repo.list_by_tier(tier, limit).await
    }

    pub async fn list(&self, limit: usize) -> Result<Vec<StrategicMemory>> {
        self.repo.list(limit).await
    }

    /// Embeds `query` with a bounded 5s "fast" timeout; on embed failure
    /// falls back to [`Self::search_fts`]. Otherwise loads the top 100
    /// memories by confidence desc and returns the top `limit` by cosine
    /// similarity via a size-`limit` min-heap.
    pub async fn search_similar(
        &self,
        query: &str,
        limit: usize,
        session_id: &str,
    ) -> Result<Vec<StrategicMemory>> {
        let start = std::time::Instant::now();
        let Some(embedder) = &self.embedder else {
            return self.search_fts(query, limit, session_id).await;
        };

        let query_embedding = match embedder.embed_fast(query, EMBED_FAST_TIMEOUT).await {
            Ok(v) => v,
            Err(_) => return self.search_fts(query, limit, session_id).await,
        };

        let candidates = self.repo.list_top_by_confidence(100).await?;
        let scored: Vec<ScoredItem<StrategicMemory>> = candidates
            .into_iter()
            .filter_map(|mem| {
                let embedding = mem.embedding.as_ref()?;
                let score = cosine_similarity(&query_embedding, embedding);
                Some(ScoredItem { item: mem, score })
            })
            .collect();
        let top = top_k_heap(&scored, limit);
        let results: Vec<StrategicMemory> = top.into_iter().map(|s| s.item).collect();

        self.log_activation(
            query,
            &results,
            RetrievalType::Similarity,
            start.elapsed().as_millis() as u64,
            session_id,
        )
        .await?;
        Ok(results)
    }

    /// Tokenizes `query` by whitespace, lowercases, strips punctuation,
    /// discards stop words and tokens shorter than 3 chars, rewrites
    /// survivors as `term*`, joins with ` OR `. Falls back to the raw
    /// query when no survivors remain.
    pub async fn search_fts(&self, query: &str, limit: usize, session_id: &str) -> Result<Vec<StrategicMemory>> {
        let start = std::time::Instant::now();
        let fts_query = build_fts_query(query);
        let results = self.repo.search_fts(&fts_query, limit).await?;
        self.log_activation(
            query,
            &results,
            RetrievalType::Fts,
            start.elapsed().as_millis() as u64,
            session_id,
        )
        .await?;
        Ok(results)
    }

    async fn log_activation(
        &self,
        query: &str,
        results: &[StrategicMemory],
        retrieval_type: RetrievalType,
        latency_ms: u64,
        session_id: &str,
    ) -> Result<()> {
        let log = ActivationLog {
            query_id: new_id("act"),
            query_text: query.to_string(),
            returned_memory_ids: results.iter().map(|m| m.id.clone()).collect(),
            retrieval_type,
            latency_ms,
            tokens_used: (query.chars().count() as u32).div_ceil(4),
            lane: Lane::Smart,
            session_id: session_id.to_string(),
            created_at: Utc::now(),
        };
        self.repo.insert_activation_log(log).await
    }

    /// Creates a child evolution: fresh id, `version + 1`, chain =
    /// `parent.chain ++ [parent.id]`, `confidence = parent.confidence * 0.9`.
    pub async fn create_evolution(
        &self,
        parent_id: &str,
        new_principle: String,
        _reason: &str,
    ) -> Result<StrategicMemory> {
        let parent = self.get(parent_id).await?;
        let mut chain = parent.evolution_chain.clone();
        chain.push(parent.id.clone());
        let now = Utc::now();
        let child = StrategicMemory {
            id: new_id("strat"),
            principle: new_principle,
            category: parent.category.clone(),
            trigger_pattern: parent.trigger_pattern.clone(),
            tier: MemoryTier::Tentative,
            success_count: 0,
            failure_count: 0,
            apply_count: 0,
            confidence: parent.confidence * 0.9,
            source_sessions: Vec::new(),
            embedding: parent.embedding.clone(),
            created_at: now,
            updated_at: now,
            last_applied_at: None,
            version: parent.version + 1,
            parent_id: Some(parent.id.clone()),
            evolution_chain: chain,
        };
        self.repo.insert(child.clone()).await?;
        Ok(child)
    }

    /// Returns `[ancestors(oldest -> newest), self]`; missing ancestors
    /// (deleted) are silently skipped.
    pub async fn get_evolution_history(&self, id: &str) -> Result<Vec<StrategicMemory>> {
        let mem = self.get(id).await?;
        let mut history = Vec::with_capacity(mem.evolution_chain.len() + 1);
        for ancestor_id in &mem.evolution_chain {
            if let Ok(ancestor) = self.get(ancestor_id).await {
                history.push(ancestor);
            }
        }
        history.push(mem);
        Ok(history)
    }

    /// Direct children (`parent_id == id`), ordered by version desc.
    pub async fn get_descendants(&self, id: &str) -> Result<Vec<StrategicMemory>> {
        self.repo.list_children(id).await
    }

    /// Writes one attribution row per memory id with
    /// `contribution = 1 / mem_ids.len()`.
    pub async fn record_attributions(
        &self,
        query_id: &str,
        query_text: &str,
        mem_ids: &[String],
        outcome: Outcome,
        session_id: &str,
    ) -> Result<()> {
        if mem_ids.is_empty() {
            return Ok(());
        }
        let contribution = 1.0 / mem_ids.len() as f32;
        let now = Utc::now();
        for memory_id in mem_ids {
            let attribution = OutcomeAttribution {
                memory_id: memory_id.clone(),
                query_id: query_id.to_string(),
                query_text: truncate_chars(query_text, 200),
                outcome,
                contribution,
                session_id: session_id.to_string(),
                created_at: now,
            };
            self.repo.insert_attribution(attribution).await?;
        }
        Ok(())
    }

    /// Recomputes `success_count`/`failure_count`/`apply_count` from the
    /// attribution table for `id`.
    pub async fn sync_from_attributions(&self, id: &str) -> Result<StrategicMemory> {
        let attributions = self.repo.list_attributions(id).await?;
        let mut mem = self.get(id).await?;
        let successes = attributions.iter().filter(|a| a.outcome == Outcome::Success).count() as u32;
        let failures = attributions.iter().filter(|a| a.outcome == Outcome::Failure).count() as u32;
        mem.success_count = successes;
        mem.failure_count = failures;
        mem.apply_count = successes + failures;
        mem.updated_at = Utc::now();
        self.repo.update(mem.clone()).await?;
        Ok(mem)
    }

    pub async fn calculate_memory_impact(&self, id: &str) -> Result<MemoryImpact> {
        let attributions = self.repo.list_attributions(id).await?;
        let successes = attributions.iter().filter(|a| a.outcome == Outcome::Success).count() as u64;
        let failures = attributions.iter().filter(|a| a.outcome == Outcome::Failure).count() as u64;
        let total_uses = attributions.len() as u64;
        let success_rate = if total_uses == 0 {
            0.5
        } else {
            successes as f64 / total_uses as f64
        };
        Ok(MemoryImpact {
            total_uses,
            successes,
            failures,
            success_rate,
        })
    }

    /// Promotes `id` if eligible, without recording a narrative.
    pub async fn promote_if_eligible(
        &self,
        id: &str,
        thresholds: &PromotionThresholds,
    ) -> Result<PromotionOutcome> {
        let mut mem = self.get(id).await?;
        let outcome = tier::eligible_promotion(&mem, thresholds);
        if outcome.promoted {
            mem.tier = outcome.tier;
            mem.updated_at = Utc::now();
            self.repo.update(mem).await?;
        }
        Ok(outcome)
    }

    /// Same as [`Self::promote_if_eligible`], additionally appending a
    /// [`PromotionNarrative`] when a promotion occurs.
    pub async fn promote_if_eligible_with_narrative(
        &self,
        id: &str,
        thresholds: &PromotionThresholds,
    ) -> Result<PromotionOutcome> {
        let mut mem = self.get(id).await?;
        let outcome = tier::eligible_promotion(&mem, thresholds);
        if outcome.promoted {
            let from_tier = mem.tier;
            let reason = tier::promotion_reason(&mem, outcome.tier, thresholds);
            mem.tier = outcome.tier;
            mem.updated_at = Utc::now();
            self.repo.update(mem.clone()).await?;
            let narrative = PromotionNarrative {
                memory_id: mem.id.clone(),
                from_tier,
                to_tier: outcome.tier,
                reason,
                metric_snapshot: serde_json::json!({
                    "apply_count": mem.apply_count,
                    "success_count": mem.success_count,
                    "failure_count": mem.failure_count,
                    "success_rate": mem.success_rate(),
                    "confidence": mem.confidence,
                    "source_sessions": mem.source_sessions.len(),
                }),
                created_at: Utc::now(),
            };
            self.repo.insert_narrative(narrative).await?;
        }
        Ok(outcome)
    }
}

/// Rewrites a raw query string into an FTS prefix-match expression.
#[must_use]
pub fn build_fts_query(query: &str) -> String {
    let survivors: Vec<String> = query
        .split_whitespace()
        .map(|tok| {
            tok.to_lowercase()
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|tok| tok.len() >= 3 && !STOP_WORDS.contains(&tok.as_str()))
        .map(|tok| format!("{tok}*"))
        .collect();

    if survivors.is_empty() {
        query.to_string()
    } else {
        survivors.join(" OR ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategic::InMemoryStrategicRepository;

    fn new_memory(principle: &str) -> StrategicMemory {
        StrategicMemory {
            id: String::new(),
            principle: principle.to_string(),
            category: "testing".into(),
            trigger_pattern: "before committing".into(),
            tier: MemoryTier::Tentative,
            success_count: 0,
            failure_count: 0,
            apply_count: 0,
            confidence: 0.0,
            source_sessions: vec![],
            embedding: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_applied_at: None,
            version: 1,
            parent_id: None,
            evolution_chain: vec![],
        }
    }

    fn store() -> StrategicStore {
        StrategicStore::new(Arc::new(InMemoryStrategicRepository::new()), None)
    }

    #[tokio::test]
    async fn create_rejects_empty_principle() {
        let store = store();
        let err = store.create(new_memory(""), None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn create_defaults_tier_tentative_confidence_half() {
        let store = store();
        let mem = store.create(new_memory("write tests first"), None).await.unwrap();
        assert_eq!(mem.tier, MemoryTier::Tentative);
        assert!((mem.confidence - 0.5).abs() < f32::EPSILON);
        assert_eq!(mem.version, 1);
        assert!(mem.id.starts_with("strat_"));
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = store();
        let created = store.create(new_memory("principle A"), None).await.unwrap();
        let fetched = store.get(&created.id).await.unwrap();
        assert_eq!(created.id, fetched.id);
        assert_eq!(created.principle, fetched.principle);
    }

    #[tokio::test]
    async fn record_success_and_failure_maintain_apply_count_invariant() {
        let store = store();
        let mem = store.create(new_memory("p"), None).await.unwrap();
        store.record_success(&mem.id).await.unwrap();
        store.record_success(&mem.id).await.unwrap();
        let mem = store.record_failure(&mem.id).await.unwrap();
        assert_eq!(mem.apply_count, mem.success_count + mem.failure_count);
        assert_eq!(mem.success_count, 2);
        assert_eq!(mem.failure_count, 1);
    }

    #[tokio::test]
    async fn success_rate_defaults_to_half_with_no_evidence() {
        let store = store();
        let mem = store.create(new_memory("p"), None).await.unwrap();
        assert!((mem.success_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn update_confidence_rejects_out_of_range() {
        let store = store();
        let mem = store.create(new_memory("p"), None).await.unwrap();
        let err = store.update_confidence(&mem.id, 1.5).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = store.update_confidence(&mem.id, -0.1).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn get_top_principles_requires_min_evidence() {
        let store = store();
        let low = store.create(new_memory("low evidence"), None).await.unwrap();
        store.record_success(&low.id).await.unwrap();

        let high = store.create(new_memory("high evidence"), None).await.unwrap();
        store.record_success(&high.id).await.unwrap();
        store.record_success(&high.id).await.unwrap();
        store.record_success(&high.id).await.unwrap();

        let top = store.get_top_principles(10).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, high.id);
    }

    #[tokio::test]
    async fn evolution_lineage_scenario() {
        let store = store();
        let v1 = store.create(new_memory("rule A"), None).await.unwrap();

        let v2 = store
            .create_evolution(&v1.id, "rule A refined".to_string(), "improved wording")
            .await
            .unwrap();
        assert_eq!(v2.version, 2);
        assert_eq!(v2.parent_id.as_deref(), Some(v1.id.as_str()));
        assert_eq!(v2.evolution_chain, vec![v1.id.clone()]);
        assert!((v2.confidence - v1.confidence * 0.9).abs() < 1e-6);

        let v3 = store
            .create_evolution(&v2.id, "rule A v3".to_string(), "further refined")
            .await
            .unwrap();
        assert_eq!(v3.evolution_chain, vec![v1.id.clone(), v2.id.clone()]);

        let history = store.get_evolution_history(&v3.id).await.unwrap();
        let ids: Vec<&str> = history.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec![v1.id.as_str(), v2.id.as_str(), v3.id.as_str()]);
    }

    #[tokio::test]
    async fn evolution_history_skips_deleted_ancestors() {
        let store = store();
        let v1 = store.create(new_memory("rule A"), None).await.unwrap();
        let v2 = store
            .create_evolution(&v1.id, "rule A refined".to_string(), "r")
            .await
            .unwrap();
        store.delete(&v1.id).await.unwrap();
        let history = store.get_evolution_history(&v2.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, v2.id);
    }

    #[tokio::test]
    async fn record_attributions_splits_contribution_evenly() {
        let store = store();
        let m1 = store.create(new_memory("p1"), None).await.unwrap();
        let m2 = store.create(new_memory("p2"), None).await.unwrap();
        store
            .record_attributions(
                "q1",
                "some query text",
                &[m1.id.clone(), m2.id.clone()],
                Outcome::Success,
                "sess1",
            )
            .await
            .unwrap();
        let impact1 = store.calculate_memory_impact(&m1.id).await.unwrap();
        assert_eq!(impact1.total_uses, 1);
        assert_eq!(impact1.successes, 1);
    }

    #[tokio::test]
    async fn fts_search_finds_prefix_matches() {
        let store = store();
        store.create(new_memory("always validate user input before processing"), None).await.unwrap();
        let results = store.search_fts("validating inputs", 5, "sess").await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn fts_query_falls_back_to_raw_when_all_tokens_filtered() {
        let q = build_fts_query("to a in");
        assert_eq!(q, "to a in");
    }

    #[test]
    fn fts_query_rewrites_survivors_as_prefix_or() {
        let q = build_fts_query("Validate the Input!");
        assert_eq!(q, "validate* OR input*");
    }
}
