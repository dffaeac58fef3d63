//! SQL-backed [`ObservationalRepository`].

use super::{from_json, from_unix, store_err, to_json, to_unix};
use crate::SqlStorage;
use async_trait::async_trait;
use libsql::{params, Row};
use memory_core::observational::{Message, Observation, ObservationalRepository, Reflection};
use memory_core::types::{ObservationPriority, PatternTag};
use memory_core::Result;

fn pattern_tag_to_str(tag: PatternTag) -> &'static str {
    match tag {
        PatternTag::Workflow => "workflow",
        PatternTag::Preference => "preference",
        PatternTag::Strategy => "strategy",
        PatternTag::Error => "error",
        PatternTag::Learning => "learning",
        PatternTag::General => "general",
    }
}

fn row_to_message(row: &Row) -> Result<Message> {
    let id: String = row.get(0).map_err(|e| store_err("read id", e))?;
    let thread_id: String = row.get(1).map_err(|e| store_err("read thread_id", e))?;
    let resource_id: String = row.get(2).map_err(|e| store_err("read resource_id", e))?;
    let role: String = row.get(3).map_err(|e| store_err("read role", e))?;
    let content: String = row.get(4).map_err(|e| store_err("read content", e))?;
    let token_count: i64 = row.get(5).map_err(|e| store_err("read token_count", e))?;
    let compressed: i64 = row.get(6).map_err(|e| store_err("read compressed", e))?;
    let obs_id: Option<String> = row.get(7).map_err(|e| store_err("read obs_id", e))?;
    let created_at: i64 = row.get(8).map_err(|e| store_err("read created_at", e))?;

    Ok(Message {
        id,
        thread_id,
        resource_id,
        role,
        content,
        token_count: token_count as u32,
        compressed: compressed != 0,
        obs_id,
        created_at: from_unix(created_at),
    })
}

fn row_to_observation(row: &Row) -> Result<Observation> {
    let id: String = row.get(0).map_err(|e| store_err("read id", e))?;
    let thread_id: String = row.get(1).map_err(|e| store_err("read thread_id", e))?;
    let resource_id: String = row.get(2).map_err(|e| store_err("read resource_id", e))?;
    let priority: i64 = row.get(3).map_err(|e| store_err("read priority", e))?;
    let task_state: String = row.get(4).map_err(|e| store_err("read task_state", e))?;
    let consumed_message_ids: String = row.get(5).map_err(|e| store_err("read consumed_message_ids", e))?;
    let token_count: i64 = row.get(6).map_err(|e| store_err("read token_count", e))?;
    let reflected: i64 = row.get(7).map_err(|e| store_err("read reflected", e))?;
    let ref_id: Option<String> = row.get(8).map_err(|e| store_err("read ref_id", e))?;
    let created_at: i64 = row.get(9).map_err(|e| store_err("read created_at", e))?;

    Ok(Observation {
        id,
        thread_id,
        resource_id,
        priority: ObservationPriority::clamp_or_default(priority),
        task_state,
        consumed_message_ids: from_json(&consumed_message_ids)?,
        token_count: token_count as u32,
        reflected: reflected != 0,
        ref_id,
        created_at: from_unix(created_at),
    })
}

#[async_trait]
impl ObservationalRepository for SqlStorage {
    async fn insert_message(&self, message: Message) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(
            "INSERT OR REPLACE INTO om_messages (
                id, thread_id, resource_id, role, content, token_count, compressed, obs_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                message.id,
                message.thread_id,
                message.resource_id,
                message.role,
                message.content,
                i64::from(message.token_count),
                i64::from(message.compressed),
                message.obs_id,
                to_unix(message.created_at),
            ],
        )
        .await
        .map_err(|e| store_err("insert om_messages", e))?;
        Ok(())
    }

    async fn get_messages(&self, thread_id: &str, resource_id: &str, limit: usize) -> Result<Vec<Message>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(
                "SELECT id, thread_id, resource_id, role, content, token_count, compressed, obs_id, created_at \
                 FROM om_messages WHERE thread_id = ?1 AND resource_id = ?2 AND compressed = 0 \
                 ORDER BY created_at ASC LIMIT ?3",
                params![thread_id.to_string(), resource_id.to_string(), limit as i64],
            )
            .await
            .map_err(|e| store_err("query om_messages", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("fetch row", e))? {
            out.push(row_to_message(&row)?);
        }
        Ok(out)
    }

    async fn get_message_token_count(&self, thread_id: &str, resource_id: &str) -> Result<u32> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(
                "SELECT COALESCE(SUM(token_count), 0) FROM om_messages \
                 WHERE thread_id = ?1 AND resource_id = ?2 AND compressed = 0",
                params![thread_id.to_string(), resource_id.to_string()],
            )
            .await
            .map_err(|e| store_err("query om_messages token count", e))?;
        let total: i64 = match rows.next().await.map_err(|e| store_err("fetch row", e))? {
            Some(row) => row.get(0).map_err(|e| store_err("read sum", e))?,
            None => 0,
        };
        Ok(total as u32)
    }

    async fn mark_messages_compressed(&self, ids: &[String], obs_id: &str) -> Result<()> {
        let conn = self.connection().await?;
        for id in ids {
            conn.execute(
                "UPDATE om_messages SET compressed = 1, obs_id = ?2 WHERE id = ?1",
                params![id.clone(), obs_id.to_string()],
            )
            .await
            .map_err(|e| store_err("mark om_messages compressed", e))?;
        }
        Ok(())
    }

    async fn insert_observation(&self, observation: Observation) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(
            "INSERT OR REPLACE INTO om_observations (
                id, thread_id, resource_id, priority, task_state, consumed_message_ids,
                token_count, reflected, ref_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                observation.id,
                observation.thread_id,
                observation.resource_id,
                i64::from(observation.priority.0),
                observation.task_state,
                to_json(&observation.consumed_message_ids)?,
                i64::from(observation.token_count),
                i64::from(observation.reflected),
                observation.ref_id,
                to_unix(observation.created_at),
            ],
        )
        .await
        .map_err(|e| store_err("insert om_observations", e))?;
        Ok(())
    }

    async fn get_observations(&self, resource_id: &str, limit: usize) -> Result<Vec<Observation>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(
                "SELECT id, thread_id, resource_id, priority, task_state, consumed_message_ids, \
                 token_count, reflected, ref_id, created_at FROM om_observations \
                 WHERE resource_id = ?1 AND reflected = 0 \
                 ORDER BY priority DESC, created_at DESC LIMIT ?2",
                params![resource_id.to_string(), limit as i64],
            )
            .await
            .map_err(|e| store_err("query om_observations", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("fetch row", e))? {
            out.push(row_to_observation(&row)?);
        }
        Ok(out)
    }

    async fn get_unreflected_observation_token_count(&self, resource_id: &str) -> Result<u32> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(
                "SELECT COALESCE(SUM(token_count), 0) FROM om_observations WHERE resource_id = ?1 AND reflected = 0",
                params![resource_id.to_string()],
            )
            .await
            .map_err(|e| store_err("query om_observations token count", e))?;
        let total: i64 = match rows.next().await.map_err(|e| store_err("fetch row", e))? {
            Some(row) => row.get(0).map_err(|e| store_err("read sum", e))?,
            None => 0,
        };
        Ok(total as u32)
    }

    async fn count_unreflected_observations(&self, resource_id: &str) -> Result<usize> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM om_observations WHERE resource_id = ?1 AND reflected = 0",
                params![resource_id.to_string()],
            )
            .await
            .map_err(|e| store_err("query om_observations count", e))?;
        let total: i64 = match rows.next().await.map_err(|e| store_err("fetch row", e))? {
            Some(row) => row.get(0).map_err(|e| store_err("read count", e))?,
            None => 0,
        };
        Ok(total as usize)
    }

    async fn mark_observations_reflected(&self, ids: &[String], ref_id: &str) -> Result<()> {
        let conn = self.connection().await?;
        for id in ids {
            conn.execute(
                "UPDATE om_observations SET reflected = 1, ref_id = ?2 WHERE id = ?1",
                params![id.clone(), ref_id.to_string()],
            )
            .await
            .map_err(|e| store_err("mark om_observations reflected", e))?;
        }
        Ok(())
    }

    async fn insert_reflection(&self, reflection: Reflection) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(
            "INSERT OR REPLACE INTO om_reflections (
                id, resource_id, pattern_tag, content, consumed_observation_ids, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                reflection.id,
                reflection.resource_id,
                pattern_tag_to_str(reflection.pattern_tag),
                reflection.content,
                to_json(&reflection.consumed_observation_ids)?,
                to_unix(reflection.created_at),
            ],
        )
        .await
        .map_err(|e| store_err("insert om_reflections", e))?;
        Ok(())
    }
}
