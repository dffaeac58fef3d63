//! Integration tests for the libSQL storage backend, exercised against
//! every repository trait `SqlStorage` implements.

use chrono::Utc;
use memory_core::core_memory::{CoreMemoryRepository, UserMemory};
use memory_core::observational::{Message, Observation, ObservationalRepository};
use memory_core::skills::{SkillRepository, StoredSkill};
use memory_core::strategic::{StrategicMemory, StrategicRepository};
use memory_core::topics::{Topic, TopicRepository};
use memory_core::types::{MemoryTier, ObservationPriority, SkillSource};
use memory_storage_sql::SqlStorage;
use tempfile::TempDir;

async fn test_storage() -> (SqlStorage, TempDir) {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");
    let storage = SqlStorage::new_local(db_path.to_str().unwrap()).await.unwrap();
    storage.initialize_schema().await.unwrap();
    (storage, dir)
}

fn sample_memory(id: &str) -> StrategicMemory {
    let now = Utc::now();
    StrategicMemory {
        id: id.to_string(),
        principle: "Prefer explicit error types over string errors".to_string(),
        category: "error-handling".to_string(),
        trigger_pattern: "writing a fallible function".to_string(),
        tier: MemoryTier::Tentative,
        success_count: 0,
        failure_count: 0,
        apply_count: 0,
        confidence: 0.5,
        source_sessions: vec!["sess-1".to_string()],
        embedding: Some(vec![0.1, 0.2, 0.3]),
        created_at: now,
        updated_at: now,
        last_applied_at: None,
        version: 1,
        parent_id: None,
        evolution_chain: Vec::new(),
    }
}

#[tokio::test]
async fn stores_and_retrieves_strategic_memory() {
    let (storage, _dir) = test_storage().await;
    let mem = sample_memory("strat_1");
    storage.insert(mem.clone()).await.unwrap();

    let fetched = storage.get("strat_1").await.unwrap().unwrap();
    assert_eq!(fetched.principle, mem.principle);
    assert_eq!(fetched.embedding, mem.embedding);
    assert_eq!(fetched.tier, MemoryTier::Tentative);
}

#[tokio::test]
async fn strategic_fts_search_finds_matching_principle() {
    let (storage, _dir) = test_storage().await;
    storage.insert(sample_memory("strat_1")).await.unwrap();

    let hits = storage.search_fts("explicit", 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "strat_1");

    let empty = storage.search_fts("", 10).await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn strategic_delete_removes_base_and_fts_rows() {
    let (storage, _dir) = test_storage().await;
    storage.insert(sample_memory("strat_1")).await.unwrap();

    storage.delete("strat_1").await.unwrap();

    assert!(storage.get("strat_1").await.unwrap().is_none());
    assert!(storage.search_fts("explicit", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn stores_and_searches_skills() {
    let (storage, _dir) = test_storage().await;
    let now = Utc::now();
    let skill = StoredSkill {
        id: "skill_1".to_string(),
        name: "retry-with-backoff".to_string(),
        description: "Retries a flaky network call with exponential backoff".to_string(),
        pattern: "wrap the call in a retry loop".to_string(),
        input_schema: "{}".to_string(),
        examples: vec!["example 1".to_string()],
        tags: vec!["networking".to_string()],
        embedding: None,
        success_count: 2,
        failure_count: 1,
        confidence: 0.6,
        source: SkillSource::Execution,
        session_id: Some("sess_1".to_string()),
        version: 1,
        parent_id: None,
        created_at: now,
        updated_at: now,
        last_accessed_at: None,
        access_count: 0,
    };
    storage.insert(skill.clone()).await.unwrap();

    let fetched = storage.get("skill_1").await.unwrap().unwrap();
    assert_eq!(fetched.name, skill.name);

    let matches = storage.search_text("backoff").await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "skill_1");
}

#[tokio::test]
async fn topic_lifecycle_tracks_membership_and_staleness() {
    let (storage, _dir) = test_storage().await;
    let now = Utc::now();
    let topic = Topic {
        id: "topic_1".to_string(),
        name: "error handling".to_string(),
        description: "principles about propagating failures".to_string(),
        keywords: vec!["error".to_string(), "result".to_string()],
        centroid: vec![0.1, 0.1, 0.1],
        member_count: 1,
        is_active: true,
        created_at: now,
        last_active_at: now,
    };
    storage.insert(topic).await.unwrap();

    let active = storage.list_active(10).await.unwrap();
    assert_eq!(active.len(), 1);

    let cutoff = now + chrono::Duration::seconds(1);
    let deactivated = storage.deactivate_stale(cutoff).await.unwrap();
    assert_eq!(deactivated, vec!["topic_1".to_string()]);
    assert!(storage.list_active(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn observational_pipeline_tracks_compression_and_reflection() {
    let (storage, _dir) = test_storage().await;
    let now = Utc::now();
    let message = Message {
        id: "msg_1".to_string(),
        thread_id: "thread_1".to_string(),
        resource_id: "resource_1".to_string(),
        role: "user".to_string(),
        content: "please refactor this module".to_string(),
        token_count: 5,
        compressed: false,
        obs_id: None,
        created_at: now,
    };
    storage.insert_message(message).await.unwrap();

    assert_eq!(storage.get_message_token_count("thread_1", "resource_1").await.unwrap(), 5);

    storage
        .mark_messages_compressed(&["msg_1".to_string()], "obs_1")
        .await
        .unwrap();
    assert_eq!(storage.get_message_token_count("thread_1", "resource_1").await.unwrap(), 0);

    let observation = Observation {
        id: "obs_1".to_string(),
        thread_id: "thread_1".to_string(),
        resource_id: "resource_1".to_string(),
        priority: ObservationPriority::clamp_or_default(4),
        task_state: "refactor in progress".to_string(),
        consumed_message_ids: vec!["msg_1".to_string()],
        token_count: 5,
        reflected: false,
        ref_id: None,
        created_at: now,
    };
    storage.insert_observation(observation).await.unwrap();
    assert_eq!(storage.count_unreflected_observations("resource_1").await.unwrap(), 1);

    storage
        .mark_observations_reflected(&["obs_1".to_string()], "ref_1")
        .await
        .unwrap();
    assert_eq!(storage.count_unreflected_observations("resource_1").await.unwrap(), 0);
}

#[tokio::test]
async fn core_memory_round_trips_user_profile() {
    let (storage, _dir) = test_storage().await;
    let mut user = UserMemory::new("user_1");
    user.name = Some("Ada".to_string());

    storage.put_user(user.clone()).await.unwrap();

    let fetched = storage.get_user("user_1").await.unwrap().unwrap();
    assert_eq!(fetched.name, Some("Ada".to_string()));
    assert!(storage.get_user("nobody").await.unwrap().is_none());
}
