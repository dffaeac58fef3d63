//! `WakeUp` context assembly and system preamble formatting.

use super::identity::IdentityStore;
use super::sessions::{read_filesystem_sessions, Session, SessionRepository};
use super::Identity;
use crate::strategic::StrategicStore;
use crate::topics::Topic;
use crate::topics::TopicStore;
use crate::Result;
use std::sync::Arc;

/// Assembled wake-up context. Every subordinate field
/// degrades to empty rather than failing the whole call.
#[derive(Debug, Clone)]
pub struct OrientationContext {
    pub identity: Identity,
    pub active_topics: Vec<Topic>,
    pub top_principles: Vec<(String, f64)>,
    pub recent_goals: Vec<String>,
    pub session_history: Vec<Session>,
}

/// Fans a `WakeUp()` query out across the strategic, topic, session and
/// identity stores, owning `Arc`s to the stores it composes rather than
/// re-deriving their state.
pub struct OrientationStore {
    identity: IdentityStore,
    strategic: Arc<StrategicStore>,
    topics: Arc<TopicStore>,
    sessions: Arc<dyn SessionRepository>,
}

const MAX_ACTIVE_TOPICS: usize = 5;
const MAX_TOP_PRINCIPLES: usize = 5;
const MAX_SESSION_HISTORY: usize = 10;

impl OrientationStore {
    #[must_use]
    pub fn new(
        identity: IdentityStore,
        strategic: Arc<StrategicStore>,
        topics: Arc<TopicStore>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self { identity, strategic, topics, sessions }
    }

    /// Assembles the wake-up context for `user_id`. Missing
    /// subordinate data degrades to an empty list rather than failing;
    /// only identity lookup failures propagate, since an identity is
    /// always get-or-create and therefore infallible in practice.
    pub async fn wake_up(&self, user_id: &str) -> Result<OrientationContext> {
        let mut identity = self.identity.get_or_create(user_id).await?;

        let active_topics = self.topics.get_active_topics(MAX_ACTIVE_TOPICS).await.unwrap_or_default();

        let top_principles = self
            .strategic
            .get_top_principles(MAX_TOP_PRINCIPLES)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|m| (m.principle, m.success_rate()))
            .collect();

        let mut session_history = self.sessions.list_recent(MAX_SESSION_HISTORY).await.unwrap_or_default();
        if session_history.is_empty() {
            session_history = read_filesystem_sessions(MAX_SESSION_HISTORY);
        }

        if identity.current_goal.is_none() || identity.current_goal.as_deref() == Some("") {
            identity.current_goal =
                session_history.iter().find(|s| s.in_progress).and_then(|s| s.goal.clone().or(Some(s.title.clone())));
        }

        let recent_goals = session_history.iter().filter_map(|s| s.goal.clone()).collect();

        Ok(OrientationContext {
            identity,
            active_topics,
            top_principles,
            recent_goals,
            session_history,
        })
    }
}

/// Formats `ctx` as a structured system-prompt preamble:
/// identity sentence, core-values bullets, current focus, active
/// topics, guiding principles with success percentages, recent
/// sessions.
#[must_use]
pub fn generate_system_preamble(ctx: &OrientationContext) -> String {
    let mut out = String::new();

    let name = ctx.identity.name.as_deref().unwrap_or("the assistant");
    let role = ctx.identity.role.as_deref().unwrap_or("a general-purpose agent");
    out.push_str(&format!("You are {name}, {role}.\n\n"));

    if !ctx.identity.core_values.is_empty() {
        out.push_str("Core values:\n");
        for value in &ctx.identity.core_values {
            out.push_str(&format!("- {value}\n"));
        }
        out.push('\n');
    }

    if let Some(goal) = &ctx.identity.current_goal {
        out.push_str(&format!("Current focus: {goal}\n\n"));
    }

    if !ctx.active_topics.is_empty() {
        out.push_str("Active topics:\n");
        for topic in &ctx.active_topics {
            out.push_str(&format!("- {}\n", topic.name));
        }
        out.push('\n');
    }

    if !ctx.top_principles.is_empty() {
        out.push_str("Guiding principles:\n");
        for (principle, rate) in &ctx.top_principles {
            out.push_str(&format!("- {principle} ({:.0}% success)\n", rate * 100.0));
        }
        out.push('\n');
    }

    if !ctx.session_history.is_empty() {
        out.push_str("Recent sessions:\n");
        for session in &ctx.session_history {
            out.push_str(&format!("- {}\n", session.title));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::identity::InMemoryIdentityRepository;
    use crate::orientation::sessions::InMemorySessionRepository;
    use crate::strategic::{InMemoryStrategicRepository, StrategicMemory};
    use crate::topics::InMemoryTopicRepository;
    use crate::types::MemoryTier;
    use chrono::Utc;

    fn strategic_memory(principle: &str, success: u32, failure: u32) -> StrategicMemory {
        StrategicMemory {
            id: crate::types::new_id("strat"),
            principle: principle.to_string(),
            category: "general".into(),
            trigger_pattern: String::new(),
            tier: MemoryTier::Proven,
            success_count: success,
            failure_count: failure,
            apply_count: success + failure,
            confidence: 0.8,
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

    #[tokio::test]
    async fn wake_up_degrades_gracefully_with_no_subordinate_data() {
        let identity = IdentityStore::new(Arc::new(InMemoryIdentityRepository::new()));
        let strategic_repo: Arc<dyn crate::strategic::StrategicRepository> =
            Arc::new(InMemoryStrategicRepository::new());
        let strategic = Arc::new(StrategicStore::new(strategic_repo.clone(), None));
        let topics = Arc::new(TopicStore::new(Arc::new(InMemoryTopicRepository::new()), strategic_repo, None, None));
        let sessions = Arc::new(InMemorySessionRepository::new());

        let store = OrientationStore::new(identity, strategic, topics, sessions);
        let ctx = store.wake_up("user_1").await.unwrap();

        assert!(ctx.active_topics.is_empty());
        assert!(ctx.top_principles.is_empty());
        assert!(ctx.session_history.is_empty());
        assert!(ctx.identity.current_goal.is_none());
    }

    #[tokio::test]
    async fn wake_up_derives_goal_from_in_progress_session() {
        let identity = IdentityStore::new(Arc::new(InMemoryIdentityRepository::new()));
        let strategic_repo: Arc<dyn crate::strategic::StrategicRepository> =
            Arc::new(InMemoryStrategicRepository::new());
        let strategic = Arc::new(StrategicStore::new(strategic_repo.clone(), None));
        let topics = Arc::new(TopicStore::new(Arc::new(InMemoryTopicRepository::new()), strategic_repo, None, None));
        let sessions = Arc::new(InMemorySessionRepository::new());
        sessions
            .insert(Session {
                id: "sess_1".into(),
                title: "migrate the retrieval layer".into(),
                goal: None,
                in_progress: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        let store = OrientationStore::new(identity, strategic, topics, sessions);
        let ctx = store.wake_up("user_1").await.unwrap();

        assert_eq!(ctx.identity.current_goal.as_deref(), Some("migrate the retrieval layer"));
    }

    #[tokio::test]
    async fn preamble_includes_principles_with_success_percentage() {
        let strategic_repo: Arc<dyn crate::strategic::StrategicRepository> =
            Arc::new(InMemoryStrategicRepository::new());
        let strategic = Arc::new(StrategicStore::new(strategic_repo.clone(), None));
        strategic.create(strategic_memory("always write tests first", 9, 1), Some(0.8)).await.unwrap();

        let identity = IdentityStore::new(Arc::new(InMemoryIdentityRepository::new()));
        let topics = Arc::new(TopicStore::new(Arc::new(InMemoryTopicRepository::new()), strategic_repo, None, None));
        let sessions = Arc::new(InMemorySessionRepository::new());
        let store = OrientationStore::new(identity, strategic, topics, sessions);

        let ctx = store.wake_up("user_1").await.unwrap();
        let preamble = generate_system_preamble(&ctx);
        assert!(preamble.contains("always write tests first (90% success)"));
    }
}
