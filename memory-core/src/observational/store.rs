//! Public contract of the observational store, including the
//! `CompressNow`/`ReflectNow` core shared with the [`super::Observer`]/
//! [`super::Reflector`] background agents.

use super::repository::ObservationalRepository;
use super::{estimate_tokens, Message, Observation, Reflection};
use crate::config::ObservationalConfig;
use crate::external::LlmProvider;
use crate::types::{new_id, ObservationPriority, PatternTag};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

const OBSERVER_SYSTEM_PROMPT: &str = "You are compressing a working-set conversation into a single observation. Respond with:\npriority: <1-5>\ntask_state: <one line>\nsummary: <prose>\n";
const REFLECTOR_SYSTEM_PROMPT: &str = "You are distilling a run of observations into a single durable reflection. Respond with the reflection prose only.";

pub struct ObservationalStore {
    repo: Arc<dyn ObservationalRepository>,
    llm: Option<Arc<dyn LlmProvider>>,
    config: ObservationalConfig,
}

impl ObservationalStore {
    #[must_use]
    pub fn new(repo: Arc<dyn ObservationalRepository>, llm: Option<Arc<dyn LlmProvider>>, config: ObservationalConfig) -> Self {
        Self { repo, llm, config }
    }

    pub async fn store_message(&self, thread_id: &str, resource_id: &str, role: &str, content: &str) -> Result<Message> {
        let message = Message {
            id: new_id("msg"),
            thread_id: thread_id.to_string(),
            resource_id: resource_id.to_string(),
            role: role.to_string(),
            content: content.to_string(),
            token_count: estimate_tokens(content),
            compressed: false,
            obs_id: None,
            created_at: Utc::now(),
        };
        self.repo.insert_message(message.clone()).await?;
        Ok(message)
    }

    pub async fn get_messages(&self, thread_id: &str, resource_id: &str, limit: usize) -> Result<Vec<Message>> {
        self.repo.get_messages(thread_id, resource_id, limit).await
    }

    pub async fn get_message_token_count(&self, thread_id: &str, resource_id: &str) -> Result<u32> {
        self.repo.get_message_token_count(thread_id, resource_id).await
    }

    pub async fn get_observations(&self, resource_id: &str, limit: usize) -> Result<Vec<Observation>> {
        self.repo.get_observations(resource_id, limit).await
    }

    /// Fires only when uncompressed message tokens reach
    /// `message_token_threshold`. Selects the oldest messages whose
    /// cumulative tokens reach `tokens - threshold/2`, summarizes them
    /// via the LLM, persists one observation, then marks the consumed
    /// messages compressed.
    pub async fn compress_now(&self, thread_id: &str, resource_id: &str) -> Result<Option<Observation>> {
        let total_tokens = self.repo.get_message_token_count(thread_id, resource_id).await?;
        if total_tokens < self.config.message_token_threshold {
            return Ok(None);
        }

        let messages = self.repo.get_messages(thread_id, resource_id, usize::MAX).await?;
        let target = total_tokens.saturating_sub(self.config.message_token_threshold / 2);
        let mut consumed = Vec::new();
        let mut cumulative = 0u32;
        for message in &messages {
            if cumulative >= target {
                break;
            }
            cumulative += message.token_count;
            consumed.push(message.clone());
        }
        if consumed.is_empty() {
            return Ok(None);
        }

        let Some(llm) = &self.llm else {
            warn!("observer fired with no LLM provider configured, skipping iteration");
            return Ok(None);
        };

        let transcript: String = consumed
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!("{OBSERVER_SYSTEM_PROMPT}\n\n{transcript}");
        let response = llm.complete(&prompt).await?;
        let (priority, task_state) = parse_observer_response(&response);

        let consumed_ids: Vec<String> = consumed.iter().map(|m| m.id.clone()).collect();
        let observation = Observation {
            id: new_id("obs"),
            thread_id: thread_id.to_string(),
            resource_id: resource_id.to_string(),
            priority,
            task_state,
            consumed_message_ids: consumed_ids.clone(),
            token_count: cumulative,
            reflected: false,
            ref_id: None,
            created_at: Utc::now(),
        };
        self.repo.insert_observation(observation.clone()).await?;
        self.repo.mark_messages_compressed(&consumed_ids, &observation.id).await?;
        Ok(Some(observation))
    }

    /// Fires only when unreflected observation tokens reach
    /// `observation_token_threshold` AND at least
    /// `min_observations_to_reflect` observations exist. Consumes the
    /// top `max_observations_per_reflection` observations.
    pub async fn reflect_now(&self, resource_id: &str) -> Result<Option<Reflection>> {
        let total_tokens = self.repo.get_unreflected_observation_token_count(resource_id).await?;
        let count = self.repo.count_unreflected_observations(resource_id).await?;
        if total_tokens < self.config.observation_token_threshold || count < self.config.min_observations_to_reflect {
            return Ok(None);
        }

        let observations = self
            .repo
            .get_observations(resource_id, self.config.max_observations_per_reflection)
            .await?;
        if observations.is_empty() {
            return Ok(None);
        }

        let Some(llm) = &self.llm else {
            warn!("reflector fired with no LLM provider configured, skipping iteration");
            return Ok(None);
        };

        let digest: String = observations
            .iter()
            .map(|o| format!("[{}] {}", o.priority.0, o.task_state))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!("{REFLECTOR_SYSTEM_PROMPT}\n\n{digest}");
        let content = llm.complete(&prompt).await?;
        let pattern_tag = classify_pattern_tag(&content);

        let consumed_ids: Vec<String> = observations.iter().map(|o| o.id.clone()).collect();
        let reflection = Reflection {
            id: new_id("ref"),
            resource_id: resource_id.to_string(),
            pattern_tag,
            content,
            consumed_observation_ids: consumed_ids.clone(),
            created_at: Utc::now(),
        };
        self.repo.insert_reflection(reflection.clone()).await?;
        self.repo.mark_observations_reflected(&consumed_ids, &reflection.id).await?;
        Ok(Some(reflection))
    }
}

/// Loosely parses the Observer's YAML-like response via substring match
/// on a `priority: N` line; malformed output degrades to priority 3
/// without error.
fn parse_observer_response(response: &str) -> (ObservationPriority, String) {
    let mut priority = ObservationPriority::default();
    let mut task_state = String::new();

    for line in response.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("priority:") {
            if let Ok(value) = rest.trim().parse::<i64>() {
                priority = ObservationPriority::clamp_or_default(value);
            }
        } else if let Some(rest) = line.strip_prefix("task_state:") {
            task_state = rest.trim().to_string();
        }
    }
    (priority, task_state)
}

/// Classifies a reflection's pattern tag from its leading content;
/// defaults to `General`.
fn classify_pattern_tag(content: &str) -> PatternTag {
    let lower = content.to_lowercase();
    if lower.contains("workflow") {
        PatternTag::Workflow
    } else if lower.contains("prefer") {
        PatternTag::Preference
    } else if lower.contains("strategy") || lower.contains("strategic") {
        PatternTag::Strategy
    } else if lower.contains("error") || lower.contains("bug") || lower.contains("fail") {
        PatternTag::Error
    } else if lower.contains("learn") {
        PatternTag::Learning
    } else {
        PatternTag::General
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observational::InMemoryObservationalRepository;
    use async_trait::async_trait;

    struct StubLlm {
        response: String,
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        async fn chat(&self, _messages: &[(String, String)], _system_prompt: &str) -> Result<String> {
            Ok(self.response.clone())
        }
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.response.clone())
        }
    }

    fn store_with_llm(response: &str) -> ObservationalStore {
        ObservationalStore::new(
            Arc::new(InMemoryObservationalRepository::new()),
            Some(Arc::new(StubLlm {
                response: response.to_string(),
            })),
            ObservationalConfig {
                message_token_threshold: 30_000,
                observation_token_threshold: 40_000,
                min_observations_to_reflect: 3,
                observer_interval: std::time::Duration::from_secs(10),
                reflector_interval: std::time::Duration::from_secs(30),
                max_observations_per_reflection: 50,
            },
        )
    }

    async fn store_message_with_tokens(store: &ObservationalStore, thread: &str, resource: &str, tokens: u32) {
        let content: String = "a".repeat((tokens * 4) as usize);
        store.store_message(thread, resource, "user", &content).await.unwrap();
    }

    #[tokio::test]
    async fn observer_threshold_scenario() {
        let store = store_with_llm("priority: 4\ntask_state: debugging auth\n");
        store_message_with_tokens(&store, "t1", "r1", 29_999).await;
        let result = store.compress_now("t1", "r1").await.unwrap();
        assert!(result.is_none());

        store_message_with_tokens(&store, "t1", "r1", 2).await;
        let observation = store.compress_now("t1", "r1").await.unwrap().unwrap();
        assert_eq!(observation.priority.0, 4);

        let remaining = store.get_messages("t1", "r1", 100).await.unwrap();
        assert!(remaining.iter().all(|m| !m.compressed));
    }

    #[tokio::test]
    async fn malformed_priority_degrades_to_three() {
        let store = store_with_llm("no priority line here\ntask_state: unknown\n");
        store_message_with_tokens(&store, "t1", "r1", 30_000).await;
        let observation = store.compress_now("t1", "r1").await.unwrap().unwrap();
        assert_eq!(observation.priority.0, 3);
    }

    #[tokio::test]
    async fn reflect_now_requires_threshold_and_minimum_count() {
        let store = store_with_llm("a workflow pattern emerged");
        let result = store.reflect_now("r1").await.unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn classify_pattern_tag_matches_keywords() {
        assert_eq!(classify_pattern_tag("found a recurring workflow"), PatternTag::Workflow);
        assert_eq!(classify_pattern_tag("user prefers dark mode"), PatternTag::Preference);
        assert_eq!(classify_pattern_tag("hit an error in parsing"), PatternTag::Error);
        assert_eq!(classify_pattern_tag("nothing notable"), PatternTag::General);
    }
}
