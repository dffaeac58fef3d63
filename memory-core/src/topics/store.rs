//! Public contract of the topic store.

use super::repository::TopicRepository;
use super::{Topic, TopicMember};
use crate::config::ClusteringConfig;
use crate::external::{Embedder, LlmProvider};
use crate::strategic::StrategicRepository;
use crate::types::new_id;
use crate::vector::{calculate_centroid, cosine_similarity};
use crate::Result;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Topic clustering over strategic-memory embeddings: runs DBSCAN, names
/// clusters via an LLM, and serves active-topic lookups.
pub struct TopicStore {
    repo: Arc<dyn TopicRepository>,
    strategic_repo: Arc<dyn StrategicRepository>,
    embedder: Option<Arc<dyn Embedder>>,
    llm: Option<Arc<dyn LlmProvider>>,
}

impl TopicStore {
    #[must_use]
    pub fn new(
        repo: Arc<dyn TopicRepository>,
        strategic_repo: Arc<dyn StrategicRepository>,
        embedder: Option<Arc<dyn Embedder>>,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        Self {
            repo,
            strategic_repo,
            embedder,
            llm,
        }
    }

    /// Loads embedded strategic memories from the lookback window, runs
    /// DBSCAN, and persists one [`Topic`] + membership rows per
    /// non-noise cluster. Returns an empty list (no error) when fewer
    /// than `min_pts` points exist.
    pub async fn run_clustering(&self, config: &ClusteringConfig) -> Result<Vec<Topic>> {
        let cutoff = Utc::now() - Duration::days(config.lookback_days);
        let all = self.strategic_repo.list(usize::MAX).await?;
        let candidates: Vec<_> = all
            .into_iter()
            .filter(|m| m.embedding.is_some() && m.created_at >= cutoff)
            .collect();

        if candidates.len() < config.min_pts {
            return Ok(Vec::new());
        }

        let embeddings: Vec<Vec<f32>> = candidates
            .iter()
            .map(|m| m.embedding.clone().unwrap_or_default())
            .collect();
        let clusters = super::dbscan::run(&embeddings, config.eps, config.min_pts);

        let mut topics = Vec::new();
        for (cluster_id, indices) in clusters {
            if cluster_id == super::NOISE_CLUSTER_ID {
                continue;
            }
            let member_embeddings: Vec<Vec<f32>> =
                indices.iter().map(|&i| embeddings[i].clone()).collect();
            let centroid = calculate_centroid(&member_embeddings);

            let sample_text: Vec<&str> = indices
                .iter()
                .take(5)
                .map(|&i| candidates[i].principle.as_str())
                .collect();
            let (name, description, keywords) = self.name_cluster(&sample_text).await;

            let now = Utc::now();
            let topic = Topic {
                id: new_id("topic"),
                name,
                description,
                keywords,
                centroid,
                member_count: indices.len(),
                is_active: true,
                created_at: now,
                last_active_at: now,
            };
            self.repo.insert(topic.clone()).await?;

            for &i in &indices {
                let relevance = cosine_similarity(&embeddings[i], &topic.centroid);
                self.repo
                    .insert_member(TopicMember {
                        topic_id: topic.id.clone(),
                        memory_id: candidates[i].id.clone(),
                        memory_type: "strategic".to_string(),
                        created_at: now,
                        relevance,
                    })
                    .await?;
            }
            topics.push(topic);
        }
        Ok(topics)
    }

    /// Asks the LLM to name a cluster via `NAME: .. / DESCRIPTION: .. /
    /// KEYWORDS: comma,list`; falls back to `Topic <short_id>` when no
    /// LLM is configured or it errors.
    async fn name_cluster(&self, sample_principles: &[&str]) -> (String, String, Vec<String>) {
        let fallback = || {
            let short_id = &new_id("")[1..9];
            (format!("Topic {short_id}"), String::new(), Vec::new())
        };

        let Some(llm) = &self.llm else {
            return fallback();
        };

        let prompt = format!(
            "Given these related principles, respond with exactly:\nNAME: <short name>\nDESCRIPTION: <one sentence>\nKEYWORDS: <comma,separated,list>\n\nPrinciples:\n{}",
            sample_principles.join("\n")
        );
        let Ok(response) = llm.complete(&prompt).await else {
            return fallback();
        };
        parse_naming_response(&response).unwrap_or_else(|| fallback())
    }

    /// Embeds `query` and returns the active topic with the highest
    /// centroid cosine similarity, plus its members.
    pub async fn get_active_topic(&self, query: &str) -> Result<Option<(Topic, Vec<TopicMember>)>> {
        let Some(embedder) = &self.embedder else {
            return Ok(None);
        };
        let query_embedding = embedder.embed(query).await?;
        let active = self.repo.list_active(usize::MAX).await?;

        let best = active
            .into_iter()
            .map(|t| {
                let score = cosine_similarity(&query_embedding, &t.centroid);
                (t, score)
            })
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        match best {
            Some((topic, _)) => {
                let members = self.repo.list_members(&topic.id).await?;
                Ok(Some((topic, members)))
            }
            None => Ok(None),
        }
    }

    pub async fn get_active_topics(&self, limit: usize) -> Result<Vec<Topic>> {
        self.repo.list_active(limit).await
    }

    pub async fn update_last_active(&self, id: &str) -> Result<()> {
        if let Some(mut topic) = self.repo.get(id).await? {
            topic.last_active_at = Utc::now();
            self.repo.update(topic).await?;
        }
        Ok(())
    }

    /// Flips `is_active = false` on active topics older than `days`;
    /// returns the affected count.
    pub async fn deactivate_stale_topics(&self, days: i64) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(days);
        let affected = self.repo.deactivate_stale(cutoff).await?;
        Ok(affected.len())
    }
}

/// Parses an LLM naming response of the form `NAME: .. / DESCRIPTION:
/// .. / KEYWORDS: a,b,c`. Returns `None` if the `NAME:` line is absent.
fn parse_naming_response(response: &str) -> Option<(String, String, Vec<String>)> {
    let mut name = None;
    let mut description = String::new();
    let mut keywords = Vec::new();

    for line in response.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("NAME:") {
            name = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("DESCRIPTION:") {
            description = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("KEYWORDS:") {
            keywords = rest
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
        }
    }

    let name = name?;
    if name.is_empty() {
        return None;
    }
    Some((name, description, keywords))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategic::{InMemoryStrategicRepository, StrategicMemory};
    use crate::topics::InMemoryTopicRepository;
    use crate::types::MemoryTier;

    fn memory(id: &str, embedding: Vec<f32>) -> StrategicMemory {
        StrategicMemory {
            id: id.to_string(),
            principle: format!("principle {id}"),
            category: "testing".into(),
            trigger_pattern: "trigger".into(),
            tier: MemoryTier::Tentative,
            success_count: 0,
            failure_count: 0,
            apply_count: 0,
            confidence: 0.5,
            source_sessions: vec![],
            embedding: Some(embedding),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_applied_at: None,
            version: 1,
            parent_id: None,
            evolution_chain: vec![],
        }
    }

    async fn seeded_strategic_repo() -> Arc<dyn StrategicRepository> {
        let repo = InMemoryStrategicRepository::new();
        let a = memory("a", crate::vector::normalize_vector(&[1.0, 0.0]));
        let b = memory("b", crate::vector::normalize_vector(&[0.99, 0.05]));
        let c = memory("c", crate::vector::normalize_vector(&[0.98, 0.02]));
        repo.insert(a).await.unwrap();
        repo.insert(b).await.unwrap();
        repo.insert(c).await.unwrap();
        Arc::new(repo)
    }

    #[tokio::test]
    async fn run_clustering_returns_empty_below_min_pts() {
        let strategic_repo = seeded_strategic_repo().await;
        let topic_repo: Arc<dyn TopicRepository> = Arc::new(InMemoryTopicRepository::new());
        let store = TopicStore::new(topic_repo, strategic_repo, None, None);
        let config = ClusteringConfig {
            eps: 0.05,
            min_pts: 10,
            lookback_days: 30,
        };
        let topics = store.run_clustering(&config).await.unwrap();
        assert!(topics.is_empty());
    }

    #[tokio::test]
    async fn run_clustering_persists_topic_and_members_without_llm() {
        let strategic_repo = seeded_strategic_repo().await;
        let topic_repo: Arc<dyn TopicRepository> = Arc::new(InMemoryTopicRepository::new());
        let store = TopicStore::new(topic_repo, strategic_repo, None, None);
        let config = ClusteringConfig {
            eps: 0.05,
            min_pts: 2,
            lookback_days: 30,
        };
        let topics = store.run_clustering(&config).await.unwrap();
        assert_eq!(topics.len(), 1);
        assert!(topics[0].name.starts_with("Topic "));
        assert_eq!(topics[0].member_count, 3);
        assert!(topics[0].is_active);
    }

    #[test]
    fn parses_well_formed_naming_response() {
        let response = "NAME: Testing Discipline\nDESCRIPTION: Principles about writing tests first\nKEYWORDS: tests, tdd, quality";
        let (name, description, keywords) = parse_naming_response(response).unwrap();
        assert_eq!(name, "Testing Discipline");
        assert_eq!(description, "Principles about writing tests first");
        assert_eq!(keywords, vec!["tests", "tdd", "quality"]);
    }

    #[test]
    fn missing_name_line_returns_none() {
        assert!(parse_naming_response("DESCRIPTION: no name here").is_none());
    }
}
