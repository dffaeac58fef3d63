//! Dispatch table for the tool calls an LLM may invoke.
//!
//! Not an MCP protocol server — a plain async function table, each call
//! timed and wrapped uniformly, the way a CLI dispatches subcommands to
//! store methods.

use crate::core_memory::CoreMemoryStore;
use crate::external::{KnowledgeFabric, KnowledgeItem, KnowledgeScope, KnowledgeSearchQuery};
use crate::strategic::StrategicStore;
use crate::types::new_id;
use crate::Result;
use std::sync::Arc;
use std::time::Instant;

/// Uniform envelope every tool call returns.
#[derive(Debug, Clone)]
pub struct ToolCallResult<T> {
    pub tool_name: String,
    pub success: bool,
    pub result: Option<T>,
    pub error: Option<String>,
    pub latency_ms: u64,
}

impl<T> ToolCallResult<T> {
    fn ok(tool_name: &str, started: Instant, result: T) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            success: true,
            result: Some(result),
            error: None,
            latency_ms: elapsed_ms(started),
        }
    }

    fn err(tool_name: &str, started: Instant, error: impl ToString) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            success: false,
            result: None,
            error: Some(error.to_string()),
            latency_ms: elapsed_ms(started),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn scope_tag(scope: KnowledgeScope) -> &'static str {
    match scope {
        KnowledgeScope::Personal => "personal",
        KnowledgeScope::Team => "team",
        KnowledgeScope::Global => "global",
    }
}

/// Which core-memory profile a `core_memory_read` call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreMemorySection {
    User,
    Project,
}

/// Snapshot returned by `core_memory_read`.
#[derive(Debug, Clone)]
pub enum CoreMemorySnapshot {
    User(crate::core_memory::UserMemory),
    Project(crate::core_memory::ProjectMemory),
}

/// Delegates the six tool calls to the strategic, core-memory
/// and knowledge-fabric stores.
pub struct ToolSurface {
    strategic: Arc<StrategicStore>,
    core_memory: Arc<CoreMemoryStore>,
    fabric: Arc<dyn KnowledgeFabric>,
}

impl ToolSurface {
    #[must_use]
    pub fn new(strategic: Arc<StrategicStore>, core_memory: Arc<CoreMemoryStore>, fabric: Arc<dyn KnowledgeFabric>) -> Self {
        Self { strategic, core_memory, fabric }
    }

    /// `recall_memory_search(query, limit)` — delegates to
    /// [`StrategicStore::search_similar`].
    pub async fn recall_memory_search(
        &self,
        query: &str,
        limit: usize,
        session_id: &str,
    ) -> ToolCallResult<Vec<crate::strategic::StrategicMemory>> {
        let started = Instant::now();
        match self.strategic.search_similar(query, limit, session_id).await {
            Ok(memories) => ToolCallResult::ok("recall_memory_search", started, memories),
            Err(e) => ToolCallResult::err("recall_memory_search", started, e),
        }
    }

    /// `core_memory_read{section}` — reads the user or project profile.
    pub async fn core_memory_read(&self, section: CoreMemorySection, entity_id: &str) -> ToolCallResult<CoreMemorySnapshot> {
        let started = Instant::now();
        let result: Result<CoreMemorySnapshot> = match section {
            CoreMemorySection::User => self.core_memory.get_user(entity_id).await.map(CoreMemorySnapshot::User),
            CoreMemorySection::Project => {
                self.core_memory.get_project(entity_id).await.map(CoreMemorySnapshot::Project)
            }
        };
        match result {
            Ok(snapshot) => ToolCallResult::ok("core_memory_read", started, snapshot),
            Err(e) => ToolCallResult::err("core_memory_read", started, e),
        }
    }

    /// `core_memory_append{fact}` — delegates to
    /// [`CoreMemoryStore::append_fact`].
    pub async fn core_memory_append(&self, user_id: &str, fact: &str) -> ToolCallResult<crate::core_memory::UserMemory> {
        let started = Instant::now();
        match self.core_memory.append_fact(user_id, fact).await {
            Ok(user) => ToolCallResult::ok("core_memory_append", started, user),
            Err(e) => ToolCallResult::err("core_memory_append", started, e),
        }
    }

    /// `core_memory_update{field, value}` — delegates to
    /// [`CoreMemoryStore::update_user_field`]. The field set
    /// (`name, role, experience, os, shell, editor`) is the user-memory
    /// allowlist, never merged with orientation's identity allowlist.
    pub async fn core_memory_update(
        &self,
        user_id: &str,
        field: &str,
        value: &str,
    ) -> ToolCallResult<crate::core_memory::UserMemory> {
        let started = Instant::now();
        match self.core_memory.update_user_field(user_id, field, value, "tool_call").await {
            Ok(user) => ToolCallResult::ok("core_memory_update", started, user),
            Err(e) => ToolCallResult::err("core_memory_update", started, e),
        }
    }

    /// `archival_memory_search{query, scope?, limit?}` — delegates to
    /// [`KnowledgeFabric::search`].
    pub async fn archival_memory_search(
        &self,
        query: &str,
        scope: Option<KnowledgeScope>,
        limit: usize,
    ) -> ToolCallResult<Vec<KnowledgeItem>> {
        let started = Instant::now();
        let tiers = scope.map(|s| vec![scope_tag(s).to_string()]).unwrap_or_default();
        match self.fabric.search(query, KnowledgeSearchQuery { limit, min_trust: 0.0, tiers }).await {
            Ok(result) => ToolCallResult::ok("archival_memory_search", started, result.items),
            Err(e) => ToolCallResult::err("archival_memory_search", started, e),
        }
    }

    /// `archival_memory_insert{title, content, tags[]}` — delegates to
    /// [`KnowledgeFabric::create`].
    pub async fn archival_memory_insert(
        &self,
        title: &str,
        content: &str,
        tags: Vec<String>,
        scope: KnowledgeScope,
    ) -> ToolCallResult<String> {
        let started = Instant::now();
        let item = KnowledgeItem {
            id: new_id("ref"),
            title: title.to_string(),
            content: content.to_string(),
            scope,
            trust_score: 0.5,
            tags,
        };
        match self.fabric.create(item).await {
            Ok(id) => ToolCallResult::ok("archival_memory_insert", started, id),
            Err(e) => ToolCallResult::err("archival_memory_insert", started, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceLimits;
    use crate::core_memory::InMemoryCoreMemoryRepository;
    use crate::external::NullKnowledgeFabric;
    use crate::strategic::InMemoryStrategicRepository;

    fn surface() -> ToolSurface {
        let strategic = Arc::new(StrategicStore::new(Arc::new(InMemoryStrategicRepository::new()), None));
        let core_memory = Arc::new(CoreMemoryStore::new(
            Arc::new(InMemoryCoreMemoryRepository::new()),
            ResourceLimits { max_user_facts: 20, max_preferences: 15 },
        ));
        let fabric: Arc<dyn KnowledgeFabric> = Arc::new(NullKnowledgeFabric);
        ToolSurface::new(strategic, core_memory, fabric)
    }

    #[tokio::test]
    async fn recall_memory_search_reports_latency_and_success() {
        let surface = surface();
        let result = surface.recall_memory_search("anything", 5, "sess_1").await;
        assert_eq!(result.tool_name, "recall_memory_search");
        assert!(result.success);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn core_memory_append_then_read_roundtrips() {
        let surface = surface();
        let append = surface.core_memory_append("user_1", "prefers dark mode").await;
        assert!(append.success);

        let read = surface.core_memory_read(CoreMemorySection::User, "user_1").await;
        assert!(read.success);
        match read.result.unwrap() {
            CoreMemorySnapshot::User(user) => assert_eq!(user.custom_facts.len(), 1),
            CoreMemorySnapshot::Project(_) => panic!("expected user snapshot"),
        }
    }

    #[tokio::test]
    async fn core_memory_update_rejects_unknown_field() {
        let surface = surface();
        let result = surface.core_memory_update("user_1", "bogus", "x").await;
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn archival_memory_insert_then_search_round_trip() {
        let surface = surface();
        let insert = surface.archival_memory_insert("note", "body", vec!["tag".into()], KnowledgeScope::Personal).await;
        assert!(insert.success);

        let search = surface.archival_memory_search("note", None, 5).await;
        assert!(search.success);
    }
}
