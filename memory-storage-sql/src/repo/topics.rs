//! SQL-backed [`TopicRepository`].

use super::{from_json, from_unix, store_err, to_json, to_unix};
use crate::SqlStorage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Row};
use memory_core::topics::{Topic, TopicMember, TopicRepository};
use memory_core::Result;

const TOPIC_COLUMNS: &str =
    "id, name, description, keywords, centroid, member_count, is_active, created_at, last_active_at";

fn row_to_topic(row: &Row) -> Result<Topic> {
    let id: String = row.get(0).map_err(|e| store_err("read id", e))?;
    let name: String = row.get(1).map_err(|e| store_err("read name", e))?;
    let description: String = row.get(2).map_err(|e| store_err("read description", e))?;
    let keywords: String = row.get(3).map_err(|e| store_err("read keywords", e))?;
    let centroid: Option<Vec<u8>> = row.get(4).map_err(|e| store_err("read centroid", e))?;
    let member_count: i64 = row.get(5).map_err(|e| store_err("read member_count", e))?;
    let is_active: i64 = row.get(6).map_err(|e| store_err("read is_active", e))?;
    let created_at: i64 = row.get(7).map_err(|e| store_err("read created_at", e))?;
    let last_active_at: i64 = row.get(8).map_err(|e| store_err("read last_active_at", e))?;

    Ok(Topic {
        id,
        name,
        description,
        keywords: from_json(&keywords)?,
        centroid: memory_core::vector::bytes_to_float32_slice(centroid.as_deref()).unwrap_or_default(),
        member_count: member_count as usize,
        is_active: is_active != 0,
        created_at: from_unix(created_at),
        last_active_at: from_unix(last_active_at),
    })
}

impl SqlStorage {
    async fn upsert_topic(&self, topic: &Topic) -> Result<()> {
        let conn = self.connection().await?;
        const SQL: &str = r#"
            INSERT OR REPLACE INTO memory_topics (
                id, name, description, keywords, centroid, member_count, is_active, created_at, last_active_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#;
        conn.execute(
            SQL,
            params![
                topic.id.clone(),
                topic.name.clone(),
                topic.description.clone(),
                to_json(&topic.keywords)?,
                memory_core::vector::float32_slice_to_bytes(Some(&topic.centroid)),
                topic.member_count as i64,
                i64::from(topic.is_active),
                to_unix(topic.created_at),
                to_unix(topic.last_active_at),
            ],
        )
        .await
        .map_err(|e| store_err("upsert memory_topics", e))?;
        Ok(())
    }

    async fn query_topics(&self, sql: &str, params: libsql::params::Params) -> Result<Vec<Topic>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(sql, params)
            .await
            .map_err(|e| store_err("query memory_topics", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("fetch row", e))? {
            out.push(row_to_topic(&row)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl TopicRepository for SqlStorage {
    async fn insert(&self, topic: Topic) -> Result<()> {
        self.upsert_topic(&topic).await
    }

    async fn get(&self, id: &str) -> Result<Option<Topic>> {
        let topics = self
            .query_topics(
                &format!("SELECT {TOPIC_COLUMNS} FROM memory_topics WHERE id = ?1"),
                params![id.to_string()],
            )
            .await?;
        Ok(topics.into_iter().next())
    }

    async fn update(&self, topic: Topic) -> Result<()> {
        self.upsert_topic(&topic).await
    }

    async fn list_active(&self, limit: usize) -> Result<Vec<Topic>> {
        self.query_topics(
            &format!(
                "SELECT {TOPIC_COLUMNS} FROM memory_topics WHERE is_active = 1 ORDER BY last_active_at DESC LIMIT ?1"
            ),
            params![limit as i64],
        )
        .await
    }

    async fn deactivate_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let conn = self.connection().await?;
        let stale = self
            .query_topics(
                &format!("SELECT {TOPIC_COLUMNS} FROM memory_topics WHERE is_active = 1 AND last_active_at < ?1"),
                params![to_unix(cutoff)],
            )
            .await?;
        let ids: Vec<String> = stale.into_iter().map(|t| t.id).collect();
        if ids.is_empty() {
            return Ok(ids);
        }
        conn.execute(
            "UPDATE memory_topics SET is_active = 0 WHERE is_active = 1 AND last_active_at < ?1",
            params![to_unix(cutoff)],
        )
        .await
        .map_err(|e| store_err("deactivate stale topics", e))?;
        Ok(ids)
    }

    async fn insert_member(&self, member: TopicMember) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(
            "INSERT OR REPLACE INTO memory_topic_members (topic_id, memory_id, memory_type, created_at, relevance) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                member.topic_id.clone(),
                member.memory_id.clone(),
                member.memory_type.clone(),
                to_unix(member.created_at),
                f64::from(member.relevance),
            ],
        )
        .await
        .map_err(|e| store_err("insert memory_topic_members", e))?;
        Ok(())
    }

    async fn list_members(&self, topic_id: &str) -> Result<Vec<TopicMember>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(
                "SELECT topic_id, memory_id, memory_type, created_at, relevance FROM memory_topic_members WHERE topic_id = ?1",
                params![topic_id.to_string()],
            )
            .await
            .map_err(|e| store_err("query memory_topic_members", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("fetch row", e))? {
            let topic_id: String = row.get(0).map_err(|e| store_err("read topic_id", e))?;
            let memory_id: String = row.get(1).map_err(|e| store_err("read memory_id", e))?;
            let memory_type: String = row.get(2).map_err(|e| store_err("read memory_type", e))?;
            let created_at: i64 = row.get(3).map_err(|e| store_err("read created_at", e))?;
            let relevance: f64 = row.get(4).map_err(|e| store_err("read relevance", e))?;
            out.push(TopicMember {
                topic_id,
                memory_id,
                memory_type,
                created_at: from_unix(created_at),
                relevance: relevance as f32,
            });
        }
        Ok(out)
    }
}
