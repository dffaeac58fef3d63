//! Wires the durable SQL store, the redb hot-read cache, and every
//! `memory-core` component into one [`App`] handle the command modules
//! share, built from the configured backends.

use crate::cli_config::CliConfig;
use async_trait::async_trait;
use memory_core::core_memory::CoreMemoryStore;
use memory_core::external::{KnowledgeFabric, NullKnowledgeFabric};
use memory_core::observational::ObservationalStore;
use memory_core::orientation::{IdentityStore, InMemoryIdentityRepository, InMemorySessionRepository, OrientationStore};
use memory_core::skills::SkillStore;
use memory_core::strategic::{
    ActivationLog, OutcomeAttribution, PromotionNarrative, StrategicMemory, StrategicRepository, StrategicStore,
};
use memory_core::tool_surface::ToolSurface;
use memory_core::topics::TopicStore;
use memory_core::types::MemoryTier;
use memory_core::Result;
use memory_storage_cache::{CacheStorage, CachedStrategicRepository};
use memory_storage_sql::SqlStorage;
use std::path::Path;
use std::sync::Arc;

/// Forwards [`StrategicRepository`] to a shared [`SqlStorage`] handle so
/// it can be cloned into [`CachedStrategicRepository`] (which owns its
/// inner repository by value) while the same `Arc<SqlStorage>` is kept
/// around for direct use by the other four stores and by `health`.
#[derive(Clone)]
struct SqlStrategicRepo(Arc<SqlStorage>);

#[async_trait]
impl StrategicRepository for SqlStrategicRepo {
    async fn insert(&self, mem: StrategicMemory) -> Result<()> {
        self.0.insert(mem).await
    }
    async fn get(&self, id: &str) -> Result<Option<StrategicMemory>> {
        self.0.get(id).await
    }
    async fn update(&self, mem: StrategicMemory) -> Result<()> {
        self.0.update(mem).await
    }
    async fn delete(&self, id: &str) -> Result<()> {
        self.0.delete(id).await
    }
    async fn list(&self, limit: usize) -> Result<Vec<StrategicMemory>> {
        self.0.list(limit).await
    }
    async fn list_by_category(&self, category: &str, limit: usize) -> Result<Vec<StrategicMemory>> {
        self.0.list_by_category(category, limit).await
    }
    async fn list_by_tier(&self, tier: MemoryTier, limit: usize) -> Result<Vec<StrategicMemory>> {
        self.0.list_by_tier(tier, limit).await
    }
    async fn list_top_by_confidence(&self, limit: usize) -> Result<Vec<StrategicMemory>> {
        self.0.list_top_by_confidence(limit).await
    }
    async fn list_children(&self, parent_id: &str) -> Result<Vec<StrategicMemory>> {
        self.0.list_children(parent_id).await
    }
    async fn search_fts(&self, fts_query: &str, limit: usize) -> Result<Vec<StrategicMemory>> {
        self.0.search_fts(fts_query, limit).await
    }
    async fn insert_narrative(&self, narrative: PromotionNarrative) -> Result<()> {
        self.0.insert_narrative(narrative).await
    }
    async fn insert_attribution(&self, attribution: OutcomeAttribution) -> Result<()> {
        self.0.insert_attribution(attribution).await
    }
    async fn list_attributions(&self, memory_id: &str) -> Result<Vec<OutcomeAttribution>> {
        self.0.list_attributions(memory_id).await
    }
    async fn insert_activation_log(&self, log: ActivationLog) -> Result<()> {
        self.0.insert_activation_log(log).await
    }
}

/// Every store the CLI dispatches to, plus the raw storage handles
/// `health` reports on.
pub struct App {
    pub strategic: Arc<StrategicStore>,
    pub topics: Arc<TopicStore>,
    pub skills: Arc<SkillStore>,
    pub observational: Arc<ObservationalStore>,
    pub core_memory: Arc<CoreMemoryStore>,
    pub orientation: Arc<OrientationStore>,
    pub identity: IdentityStore,
    pub tool_surface: Arc<ToolSurface>,
    pub sql: Arc<SqlStorage>,
    pub cache: Arc<CacheStorage>,
}

impl App {
    /// Opens (creating if absent) the SQL and cache databases named in
    /// `config`, applies the SQL schema, and wires every store. No
    /// embedder/LLM/knowledge-fabric is configured by default: semantic
    /// search falls back to FTS, cluster naming falls back to
    /// `Topic <id>`, and the observer/reflector iterations log-and-skip
    /// until one is wired in.
    pub async fn open(config: &CliConfig) -> anyhow::Result<Self> {
        let sql = Arc::new(SqlStorage::new_local(&config.database.sql_path).await?);
        sql.initialize_schema().await?;
        let cache = Arc::new(CacheStorage::new(Path::new(&config.database.cache_path)).await?);

        let memory_config = config.memory_config();
        let fabric: Arc<dyn KnowledgeFabric> = Arc::new(NullKnowledgeFabric);

        let strategic_repo: Arc<dyn StrategicRepository> = Arc::new(CachedStrategicRepository::new(
            SqlStrategicRepo(Arc::clone(&sql)),
            Arc::clone(&cache),
        ));
        let strategic = Arc::new(StrategicStore::new(strategic_repo, None));

        let topics = Arc::new(TopicStore::new(
            Arc::clone(&sql) as _,
            Arc::clone(&sql) as _,
            None,
            None,
        ));

        let skills = Arc::new(SkillStore::new(Arc::clone(&sql) as _, None, memory_config.skills));

        let observational = Arc::new(ObservationalStore::new(Arc::clone(&sql) as _, None, memory_config.observational));

        let core_memory = Arc::new(CoreMemoryStore::new(Arc::clone(&sql) as _, memory_config.resource_limits));

        let identity_repo: Arc<dyn memory_core::orientation::IdentityRepository> =
            Arc::new(InMemoryIdentityRepository::new());
        let identity = IdentityStore::new(Arc::clone(&identity_repo));
        let sessions = Arc::new(InMemorySessionRepository::new());
        let orientation = Arc::new(OrientationStore::new(
            IdentityStore::new(identity_repo),
            Arc::clone(&strategic),
            Arc::clone(&topics),
            sessions,
        ));

        let tool_surface = Arc::new(ToolSurface::new(Arc::clone(&strategic), Arc::clone(&core_memory), fabric));

        Ok(Self {
            strategic,
            topics,
            skills,
            observational,
            core_memory,
            orientation,
            identity,
            tool_surface,
            sql,
            cache,
        })
    }
}
