//! Logical schema for the memory engine.
//!
//! Plain `TEXT`/`INTEGER`/`REAL` tables plus a parallel FTS5 virtual
//! table per full-text-searchable store, in a const-SQL-string style.
//! Schema evolution tolerates missing columns via `COALESCE` on read
//! and idempotent `ALTER TABLE ... ADD COLUMN` on startup; this module
//! only carries the `CREATE` statements, applied once at startup by
//! [`crate::SqlStorage::initialize_schema`].

pub const CREATE_STRATEGIC_MEMORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS strategic_memory (
    id TEXT PRIMARY KEY NOT NULL,
    principle TEXT NOT NULL,
    category TEXT NOT NULL,
    trigger_pattern TEXT NOT NULL,
    tier TEXT NOT NULL,
    success_count INTEGER NOT NULL DEFAULT 0,
    failure_count INTEGER NOT NULL DEFAULT 0,
    apply_count INTEGER NOT NULL DEFAULT 0,
    confidence REAL NOT NULL DEFAULT 0.5,
    source_sessions TEXT NOT NULL DEFAULT '[]',
    embedding BLOB,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    last_applied_at INTEGER,
    version INTEGER NOT NULL DEFAULT 1,
    parent_id TEXT,
    evolution_chain TEXT NOT NULL DEFAULT '[]'
)
"#;

pub const CREATE_STRATEGIC_MEMORY_FTS: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS strategic_memory_fts USING fts5(
    id UNINDEXED, principle, trigger_pattern, category
)
"#;

pub const CREATE_STRATEGIC_MEMORY_PARENT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_strategic_memory_parent ON strategic_memory(parent_id)
"#;

pub const CREATE_STRATEGIC_MEMORY_TIER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_strategic_memory_tier ON strategic_memory(tier)
"#;

pub const CREATE_PROMOTION_NARRATIVES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS promotion_narratives (
    id TEXT PRIMARY KEY NOT NULL,
    memory_id TEXT NOT NULL,
    from_tier TEXT NOT NULL,
    to_tier TEXT NOT NULL,
    reason TEXT NOT NULL,
    metric_snapshot TEXT NOT NULL,
    created_at INTEGER NOT NULL
)
"#;

pub const CREATE_MEMORY_ATTRIBUTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS memory_attributions (
    id TEXT PRIMARY KEY NOT NULL,
    memory_id TEXT NOT NULL,
    query_id TEXT NOT NULL,
    query_text TEXT NOT NULL,
    outcome TEXT NOT NULL,
    contribution REAL NOT NULL,
    session_id TEXT NOT NULL,
    created_at INTEGER NOT NULL
)
"#;

pub const CREATE_MEMORY_ATTRIBUTIONS_MEMORY_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_memory_attributions_memory ON memory_attributions(memory_id)
"#;

pub const CREATE_ACTIVATION_LOGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS activation_logs (
    id TEXT PRIMARY KEY NOT NULL,
    query_id TEXT NOT NULL,
    query_text TEXT NOT NULL,
    memory_ids TEXT NOT NULL,
    retrieval_type TEXT NOT NULL,
    latency_ms INTEGER NOT NULL,
    tokens_used INTEGER NOT NULL,
    lane TEXT NOT NULL,
    session_id TEXT NOT NULL,
    created_at INTEGER NOT NULL
)
"#;

pub const CREATE_MEMORY_TOPICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS memory_topics (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    keywords TEXT NOT NULL DEFAULT '[]',
    centroid BLOB,
    member_count INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    last_active_at INTEGER NOT NULL
)
"#;

pub const CREATE_MEMORY_TOPIC_MEMBERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS memory_topic_members (
    topic_id TEXT NOT NULL,
    memory_id TEXT NOT NULL,
    memory_type TEXT NOT NULL DEFAULT 'strategic',
    created_at INTEGER NOT NULL,
    relevance REAL NOT NULL DEFAULT 0.0,
    PRIMARY KEY (topic_id, memory_id)
)
"#;

pub const CREATE_MEMORY_TOPIC_MEMBERS_TOPIC_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_memory_topic_members_topic ON memory_topic_members(topic_id)
"#;

pub const CREATE_SKILLS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS skills (
    id TEXT PRIMARY KEY NOT NULL,
    version INTEGER NOT NULL DEFAULT 1,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    pattern TEXT NOT NULL,
    input_schema TEXT NOT NULL DEFAULT '{}',
    examples TEXT NOT NULL DEFAULT '[]',
    tags TEXT NOT NULL DEFAULT '[]',
    source TEXT NOT NULL,
    session_id TEXT,
    parent_id TEXT,
    confidence REAL NOT NULL DEFAULT 0.5,
    success_count INTEGER NOT NULL DEFAULT 0,
    failure_count INTEGER NOT NULL DEFAULT 0,
    embedding BLOB,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    last_accessed_at INTEGER,
    access_count INTEGER NOT NULL DEFAULT 0
)
"#;

pub const CREATE_SKILLS_FTS: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS skills_fts USING fts5(
    id UNINDEXED, name, description, pattern
)
"#;

pub const CREATE_OM_MESSAGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS om_messages (
    id TEXT PRIMARY KEY NOT NULL,
    thread_id TEXT NOT NULL,
    resource_id TEXT NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    token_count INTEGER NOT NULL,
    compressed INTEGER NOT NULL DEFAULT 0,
    obs_id TEXT,
    created_at INTEGER NOT NULL
)
"#;

pub const CREATE_OM_MESSAGES_THREAD_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_om_messages_thread ON om_messages(thread_id, resource_id, created_at)
"#;

pub const CREATE_OM_OBSERVATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS om_observations (
    id TEXT PRIMARY KEY NOT NULL,
    thread_id TEXT NOT NULL,
    resource_id TEXT NOT NULL,
    priority INTEGER NOT NULL,
    task_state TEXT NOT NULL,
    consumed_message_ids TEXT NOT NULL DEFAULT '[]',
    token_count INTEGER NOT NULL,
    reflected INTEGER NOT NULL DEFAULT 0,
    ref_id TEXT,
    created_at INTEGER NOT NULL
)
"#;

pub const CREATE_OM_OBSERVATIONS_RESOURCE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_om_observations_resource ON om_observations(resource_id, created_at)
"#;

pub const CREATE_OM_REFLECTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS om_reflections (
    id TEXT PRIMARY KEY NOT NULL,
    resource_id TEXT NOT NULL,
    pattern_tag TEXT NOT NULL,
    content TEXT NOT NULL,
    consumed_observation_ids TEXT NOT NULL DEFAULT '[]',
    created_at INTEGER NOT NULL
)
"#;

pub const CREATE_USER_MEMORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_memory (
    user_id TEXT PRIMARY KEY NOT NULL,
    name TEXT,
    role TEXT,
    experience TEXT,
    os TEXT,
    shell TEXT,
    editor TEXT,
    preferences TEXT NOT NULL DEFAULT '[]',
    custom_facts TEXT NOT NULL DEFAULT '[]',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
)
"#;

pub const CREATE_USER_MEMORY_CHANGELOG_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_memory_changelog (
    id TEXT PRIMARY KEY NOT NULL,
    entity_kind TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    field TEXT NOT NULL,
    old_value TEXT NOT NULL,
    new_value TEXT NOT NULL,
    source TEXT NOT NULL,
    created_at INTEGER NOT NULL
)
"#;

pub const CREATE_USER_MEMORY_CHANGELOG_ENTITY_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_user_memory_changelog_entity ON user_memory_changelog(entity_id, created_at DESC)
"#;

pub const CREATE_PROJECT_MEMORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS project_memory (
    project_id TEXT PRIMARY KEY NOT NULL,
    name TEXT,
    description TEXT,
    tech_stack TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
)
"#;

/// Cross-store, id-only linkage. Not populated by
/// any store in this crate yet; reserved for future cross-referencing
/// (e.g. a skill citing the principle it was distilled from).
pub const CREATE_MEMORY_LINKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS memory_links (
    from_id TEXT NOT NULL,
    to_id TEXT NOT NULL,
    link_type TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (from_id, to_id, link_type)
)
"#;

pub const CREATE_IDENTITY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS identity (
    user_id TEXT PRIMARY KEY NOT NULL,
    name TEXT,
    role TEXT,
    core_values TEXT NOT NULL DEFAULT '[]',
    current_goal TEXT,
    mood TEXT,
    persona_prompt TEXT
)
"#;

pub const CREATE_SESSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    goal TEXT,
    in_progress INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
)
"#;

pub const CREATE_SESSIONS_UPDATED_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at DESC)
"#;

/// Every `CREATE TABLE`/`CREATE INDEX`/`CREATE VIRTUAL TABLE` statement,
/// applied in order at startup. `IF NOT EXISTS` makes re-application
/// idempotent.
pub const ALL_STATEMENTS: &[&str] = &[
    CREATE_STRATEGIC_MEMORY_TABLE,
    CREATE_STRATEGIC_MEMORY_FTS,
    CREATE_STRATEGIC_MEMORY_PARENT_INDEX,
    CREATE_STRATEGIC_MEMORY_TIER_INDEX,
    CREATE_PROMOTION_NARRATIVES_TABLE,
    CREATE_MEMORY_ATTRIBUTIONS_TABLE,
    CREATE_MEMORY_ATTRIBUTIONS_MEMORY_INDEX,
    CREATE_ACTIVATION_LOGS_TABLE,
    CREATE_MEMORY_TOPICS_TABLE,
    CREATE_MEMORY_TOPIC_MEMBERS_TABLE,
    CREATE_MEMORY_TOPIC_MEMBERS_TOPIC_INDEX,
    CREATE_SKILLS_TABLE,
    CREATE_SKILLS_FTS,
    CREATE_OM_MESSAGES_TABLE,
    CREATE_OM_MESSAGES_THREAD_INDEX,
    CREATE_OM_OBSERVATIONS_TABLE,
    CREATE_OM_OBSERVATIONS_RESOURCE_INDEX,
    CREATE_OM_REFLECTIONS_TABLE,
    CREATE_USER_MEMORY_TABLE,
    CREATE_USER_MEMORY_CHANGELOG_TABLE,
    CREATE_USER_MEMORY_CHANGELOG_ENTITY_INDEX,
    CREATE_PROJECT_MEMORY_TABLE,
    CREATE_MEMORY_LINKS_TABLE,
    CREATE_IDENTITY_TABLE,
    CREATE_SESSIONS_TABLE,
    CREATE_SESSIONS_UPDATED_INDEX,
];
