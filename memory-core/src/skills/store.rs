//! Public contract of the skill store.

use super::naming::generate_skill_name;
use super::repository::SkillRepository;
use super::{ExecutionTrace, StoredSkill};
use crate::config::SkillConfig;
use crate::external::Embedder;
use crate::types::{new_id, SkillSource};
use crate::vector::cosine_similarity;
use crate::Result;
use chrono::Utc;
use std::sync::Arc;

/// Skill library: learns patterns from execution traces (Voyager rule),
/// serves semantic-first relevance search, and tracks skill lineage.
pub struct SkillStore {
    repo: Arc<dyn SkillRepository>,
    embedder: Option<Arc<dyn Embedder>>,
    config: SkillConfig,
}

impl SkillStore {
    #[must_use]
    pub fn new(repo: Arc<dyn SkillRepository>, embedder: Option<Arc<dyn Embedder>>, config: SkillConfig) -> Self {
        Self {
            repo,
            embedder,
            config,
        }
    }

    /// Synthesizes a skill from `trace` when its confidence meets the
    /// Voyager threshold; `None` otherwise.
    pub async fn learn_from_execution(&self, trace: ExecutionTrace) -> Result<Option<StoredSkill>> {
        if trace.confidence < self.config.min_learn_confidence {
            return Ok(None);
        }

        let name = generate_skill_name(&trace.task_summary, &trace.user_input, &trace.detected_tags);
        let description = trace.task_summary.clone();

        let embedding = if let Some(embedder) = &self.embedder {
            let text = format!("{name} {description} {}", trace.detected_tags.join(" "));
            Some(embedder.embed(&text).await?)
        } else {
            None
        };

        let now = Utc::now();
        let skill = StoredSkill {
            id: new_id("skill"),
            name,
            description,
            pattern: trace.generated_code,
            input_schema: trace.input_schema,
            examples: vec![trace.user_input],
            tags: trace.detected_tags,
            embedding,
            success_count: 1,
            failure_count: 0,
            confidence: trace.confidence,
            source: SkillSource::Execution,
            session_id: trace.session_id,
            version: 1,
            parent_id: None,
            created_at: now,
            updated_at: now,
            last_accessed_at: None,
            access_count: 0,
        };
        self.repo.insert(skill.clone()).await?;
        Ok(Some(skill))
    }

    /// Prefers semantic search (cosine similarity ≥ `min_similarity` AND
    /// Bayesian success rate ≥ `min_success_rate`, sorted by similarity
    /// desc); falls back to a success-rate-gated text scan on embedder
    /// failure or zero semantic hits.
    pub async fn find_relevant_skills(&self, task: &str, limit: usize) -> Result<Vec<StoredSkill>> {
        if let Some(embedder) = &self.embedder {
            if let Ok(task_embedding) = embedder.embed(task).await {
                let candidates = self.repo.list_with_embeddings().await?;
                let mut scored: Vec<(StoredSkill, f32)> = candidates
                    .into_iter()
                    .filter_map(|skill| {
                        let embedding = skill.embedding.as_ref()?;
                        let similarity = cosine_similarity(&task_embedding, embedding);
                        if similarity >= self.config.min_similarity
                            && skill.bayesian_success_rate() >= self.config.min_success_rate
                        {
                            Some((skill, similarity))
                        } else {
                            None
                        }
                    })
                    .collect();
                if !scored.is_empty() {
                    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
                    scored.truncate(limit);
                    return Ok(scored.into_iter().map(|(skill, _)| skill).collect());
                }
            }
        }

        let mut matches: Vec<StoredSkill> = self
            .repo
            .search_text(task)
            .await?
            .into_iter()
            .filter(|s| s.bayesian_success_rate() >= self.config.min_success_rate)
            .collect();
        matches.truncate(limit);
        Ok(matches)
    }

    /// Increments the success/failure counter and bumps
    /// `updated_at`/`last_accessed_at`.
    pub async fn record_outcome(&self, id: &str, success: bool) -> Result<StoredSkill> {
        let mut skill = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| crate::Error::NotFound(id.to_string()))?;
        if success {
            skill.success_count += 1;
        } else {
            skill.failure_count += 1;
        }
        let now = Utc::now();
        skill.updated_at = now;
        skill.last_accessed_at = Some(now);
        skill.access_count += 1;
        self.repo.update(skill.clone()).await?;
        Ok(skill)
    }

    /// Creates a child skill at `version + 1` with reset counters and
    /// `confidence = parent.confidence * 0.9`.
    pub async fn evolve_skill(&self, parent_id: &str, new_pattern: String, _reason: &str) -> Result<StoredSkill> {
        let parent = self
            .repo
            .get(parent_id)
            .await?
            .ok_or_else(|| crate::Error::NotFound(parent_id.to_string()))?;
        let now = Utc::now();
        let child = StoredSkill {
            id: new_id("skill"),
            name: parent.name.clone(),
            description: parent.description.clone(),
            pattern: new_pattern,
            input_schema: parent.input_schema.clone(),
            examples: parent.examples.clone(),
            tags: parent.tags.clone(),
            embedding: parent.embedding.clone(),
            success_count: 0,
            failure_count: 0,
            confidence: parent.confidence * 0.9,
            source: SkillSource::Evolution,
            session_id: parent.session_id.clone(),
            version: parent.version + 1,
            parent_id: Some(parent.id.clone()),
            created_at: now,
            updated_at: now,
            last_accessed_at: None,
            access_count: 0,
        };
        self.repo.insert(child.clone()).await?;
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::InMemorySkillRepository;

    fn trace(confidence: f32) -> ExecutionTrace {
        ExecutionTrace {
            task_summary: "Always validate input before writing to the database".into(),
            generated_code: "fn validate() {}".into(),
            user_input: "please validate user input first".into(),
            detected_tags: vec!["validation".into(), "security".into()],
            confidence,
            session_id: Some("sess1".into()),
            input_schema: "{}".into(),
        }
    }

    fn store() -> SkillStore {
        SkillStore::new(Arc::new(InMemorySkillRepository::new()), None, SkillConfig::default())
    }

    #[tokio::test]
    async fn learn_from_execution_rejects_low_confidence() {
        let store = store();
        let result = store.learn_from_execution(trace(0.5)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn learn_from_execution_persists_with_initial_counts() {
        let store = store();
        let skill = store.learn_from_execution(trace(0.9)).await.unwrap().unwrap();
        assert_eq!(skill.success_count, 1);
        assert_eq!(skill.failure_count, 0);
        assert_eq!(skill.source, SkillSource::Execution);
        assert!(skill.id.starts_with("skill_"));
    }

    #[tokio::test]
    async fn record_outcome_increments_correct_counter() {
        let store = store();
        let skill = store.learn_from_execution(trace(0.9)).await.unwrap().unwrap();
        let updated = store.record_outcome(&skill.id, true).await.unwrap();
        assert_eq!(updated.success_count, 2);
        let updated = store.record_outcome(&skill.id, false).await.unwrap();
        assert_eq!(updated.failure_count, 1);
        assert!(updated.last_accessed_at.is_some());
    }

    #[tokio::test]
    async fn evolve_skill_resets_counts_and_discounts_confidence() {
        let store = store();
        let parent = store.learn_from_execution(trace(0.9)).await.unwrap().unwrap();
        let child = store
            .evolve_skill(&parent.id, "fn validate_v2() {}".into(), "improved validation")
            .await
            .unwrap();
        assert_eq!(child.version, 2);
        assert_eq!(child.success_count, 0);
        assert_eq!(child.failure_count, 0);
        assert!((child.confidence - parent.confidence * 0.9).abs() < 1e-6);
        assert_eq!(child.parent_id.as_deref(), Some(parent.id.as_str()));
    }

    #[tokio::test]
    async fn find_relevant_skills_falls_back_to_text_scan_without_embedder() {
        let store = store();
        let skill = store.learn_from_execution(trace(0.9)).await.unwrap().unwrap();
        store.record_outcome(&skill.id, true).await.unwrap();
        store.record_outcome(&skill.id, true).await.unwrap();

        let results = store.find_relevant_skills("validate", 5).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn find_relevant_skills_gates_on_success_rate() {
        let store = store();
        let skill = store.learn_from_execution(trace(0.9)).await.unwrap().unwrap();
        // Force the Bayesian rate below the 0.6 gate with heavy failures.
        for _ in 0..10 {
            store.record_outcome(&skill.id, false).await.unwrap();
        }
        let results = store.find_relevant_skills("validate", 5).await.unwrap();
        assert!(results.is_empty());
    }
}
