//! SQL-backed [`StrategicRepository`].

use super::{from_json, from_unix, store_err, to_json, to_unix};
use crate::SqlStorage;
use async_trait::async_trait;
use libsql::{params, Row};
use memory_core::strategic::{ActivationLog, OutcomeAttribution, PromotionNarrative, StrategicMemory, StrategicRepository};
use memory_core::types::{Lane, MemoryTier, Outcome, RetrievalType};
use memory_core::{Error, Result};

const STRATEGIC_COLUMNS: &str = "id, principle, category, trigger_pattern, tier, success_count, \
    failure_count, apply_count, confidence, source_sessions, embedding, created_at, updated_at, \
    last_applied_at, version, parent_id, evolution_chain";

fn tier_to_str(tier: MemoryTier) -> &'static str {
    match tier {
        MemoryTier::Tentative => "tentative",
        MemoryTier::Candidate => "candidate",
        MemoryTier::Proven => "proven",
        MemoryTier::Identity => "identity",
    }
}

fn tier_from_str(raw: &str) -> Result<MemoryTier> {
    match raw {
        "tentative" => Ok(MemoryTier::Tentative),
        "candidate" => Ok(MemoryTier::Candidate),
        "proven" => Ok(MemoryTier::Proven),
        "identity" => Ok(MemoryTier::Identity),
        other => Err(Error::StoreFailure(format!("unknown tier: {other}"))),
    }
}

fn outcome_to_str(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Success => "success",
        Outcome::Failure => "failure",
        Outcome::Partial => "partial",
    }
}

fn outcome_from_str(raw: &str) -> Result<Outcome> {
    match raw {
        "success" => Ok(Outcome::Success),
        "failure" => Ok(Outcome::Failure),
        "partial" => Ok(Outcome::Partial),
        other => Err(Error::StoreFailure(format!("unknown outcome: {other}"))),
    }
}

fn retrieval_type_to_str(rt: RetrievalType) -> &'static str {
    match rt {
        RetrievalType::Similarity => "similarity",
        RetrievalType::Fts => "fts",
        RetrievalType::Category => "category",
        RetrievalType::Tier => "tier",
    }
}

fn retrieval_type_from_str(raw: &str) -> Result<RetrievalType> {
    match raw {
        "similarity" => Ok(RetrievalType::Similarity),
        "fts" => Ok(RetrievalType::Fts),
        "category" => Ok(RetrievalType::Category),
        "tier" => Ok(RetrievalType::Tier),
        other => Err(Error::StoreFailure(format!("unknown retrieval type: {other}"))),
    }
}

fn lane_to_str(lane: Lane) -> &'static str {
    match lane {
        Lane::Fast => "fast",
        Lane::Smart => "smart",
    }
}

fn lane_from_str(raw: &str) -> Result<Lane> {
    match raw {
        "fast" => Ok(Lane::Fast),
        "smart" => Ok(Lane::Smart),
        other => Err(Error::StoreFailure(format!("unknown lane: {other}"))),
    }
}

fn row_to_memory(row: &Row) -> Result<StrategicMemory> {
    let id: String = row.get(0).map_err(|e| store_err("read id", e))?;
    let principle: String = row.get(1).map_err(|e| store_err("read principle", e))?;
    let category: String = row.get(2).map_err(|e| store_err("read category", e))?;
    let trigger_pattern: String = row.get(3).map_err(|e| store_err("read trigger_pattern", e))?;
    let tier: String = row.get(4).map_err(|e| store_err("read tier", e))?;
    let success_count: i64 = row.get(5).map_err(|e| store_err("read success_count", e))?;
    let failure_count: i64 = row.get(6).map_err(|e| store_err("read failure_count", e))?;
    let apply_count: i64 = row.get(7).map_err(|e| store_err("read apply_count", e))?;
    let confidence: f64 = row.get(8).map_err(|e| store_err("read confidence", e))?;
    let source_sessions: String = row.get(9).map_err(|e| store_err("read source_sessions", e))?;
    let embedding: Option<Vec<u8>> = row.get(10).map_err(|e| store_err("read embedding", e))?;
    let created_at: i64 = row.get(11).map_err(|e| store_err("read created_at", e))?;
    let updated_at: i64 = row.get(12).map_err(|e| store_err("read updated_at", e))?;
    let last_applied_at: Option<i64> = row.get(13).map_err(|e| store_err("read last_applied_at", e))?;
    let version: i64 = row.get(14).map_err(|e| store_err("read version", e))?;
    let parent_id: Option<String> = row.get(15).map_err(|e| store_err("read parent_id", e))?;
    let evolution_chain: String = row.get(16).map_err(|e| store_err("read evolution_chain", e))?;

    Ok(StrategicMemory {
        id,
        principle,
        category,
        trigger_pattern,
        tier: tier_from_str(&tier)?,
        success_count: success_count as u32,
        failure_count: failure_count as u32,
        apply_count: apply_count as u32,
        confidence: confidence as f32,
        source_sessions: from_json(&source_sessions)?,
        embedding: memory_core::vector::bytes_to_float32_slice(embedding.as_deref()),
        created_at: from_unix(created_at),
        updated_at: from_unix(updated_at),
        last_applied_at: last_applied_at.map(from_unix),
        version: version as u32,
        parent_id,
        evolution_chain: from_json(&evolution_chain)?,
    })
}

impl SqlStorage {
    async fn upsert_strategic_fts(&self, mem: &StrategicMemory) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(
            "DELETE FROM strategic_memory_fts WHERE id = ?1",
            params![mem.id.clone()],
        )
        .await
        .map_err(|e| store_err("delete strategic fts row", e))?;
        conn.execute(
            "INSERT INTO strategic_memory_fts (id, principle, trigger_pattern, category) VALUES (?1, ?2, ?3, ?4)",
            params![mem.id.clone(), mem.principle.clone(), mem.trigger_pattern.clone(), mem.category.clone()],
        )
        .await
        .map_err(|e| store_err("insert strategic fts row", e))?;
        Ok(())
    }

    async fn upsert_strategic_memory(&self, mem: &StrategicMemory) -> Result<()> {
        let conn = self.connection().await?;
        const SQL: &str = r#"
            INSERT OR REPLACE INTO strategic_memory (
                id, principle, category, trigger_pattern, tier, success_count, failure_count,
                apply_count, confidence, source_sessions, embedding, created_at, updated_at,
                last_applied_at, version, parent_id, evolution_chain
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        "#;
        conn.execute(
            SQL,
            params![
                mem.id.clone(),
                mem.principle.clone(),
                mem.category.clone(),
                mem.trigger_pattern.clone(),
                tier_to_str(mem.tier),
                i64::from(mem.success_count),
                i64::from(mem.failure_count),
                i64::from(mem.apply_count),
                f64::from(mem.confidence),
                to_json(&mem.source_sessions)?,
                memory_core::vector::float32_slice_to_bytes(mem.embedding.as_deref()),
                to_unix(mem.created_at),
                to_unix(mem.updated_at),
                mem.last_applied_at.map(to_unix),
                i64::from(mem.version),
                mem.parent_id.clone(),
                to_json(&mem.evolution_chain)?,
            ],
        )
        .await
        .map_err(|e| store_err("upsert strategic_memory", e))?;
        self.upsert_strategic_fts(mem).await
    }

    async fn query_memories(&self, sql: &str, params: libsql::params::Params) -> Result<Vec<StrategicMemory>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(sql, params)
            .await
            .map_err(|e| store_err("query strategic_memory", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("fetch row", e))? {
            out.push(row_to_memory(&row)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl StrategicRepository for SqlStorage {
    async fn insert(&self, mem: StrategicMemory) -> Result<()> {
        self.upsert_strategic_memory(&mem).await
    }

    async fn get(&self, id: &str) -> Result<Option<StrategicMemory>> {
        let memories = self
            .query_memories(
                &format!("SELECT {STRATEGIC_COLUMNS} FROM strategic_memory WHERE id = ?1"),
                params![id.to_string()],
            )
            .await?;
        Ok(memories.into_iter().next())
    }

    async fn update(&self, mem: StrategicMemory) -> Result<()> {
        self.upsert_strategic_memory(&mem).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute("DELETE FROM strategic_memory WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(|e| store_err("delete strategic_memory", e))?;
        conn.execute(
            "DELETE FROM strategic_memory_fts WHERE id = ?1",
            params![id.to_string()],
        )
        .await
        .map_err(|e| store_err("delete strategic fts row", e))?;
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<StrategicMemory>> {
        self.query_memories(
            &format!(
                "SELECT {STRATEGIC_COLUMNS} FROM strategic_memory ORDER BY \
                 (CASE WHEN apply_count = 0 THEN 0.5 ELSE CAST(success_count AS REAL) / apply_count END) DESC, \
                 confidence DESC LIMIT ?1"
            ),
            params![limit as i64],
        )
        .await
    }

    async fn list_by_category(&self, category: &str, limit: usize) -> Result<Vec<StrategicMemory>> {
        self.query_memories(
            &format!(
                "SELECT {STRATEGIC_COLUMNS} FROM strategic_memory WHERE category = ?1 ORDER BY \
                 (CASE WHEN apply_count = 0 THEN 0.5 ELSE CAST(success_count AS REAL) / apply_count END) DESC, \
                 confidence DESC LIMIT ?2"
            ),
            params![category.to_string(), limit as i64],
        )
        .await
    }

    async fn list_by_tier(&self, tier: MemoryTier, limit: usize) -> Result<Vec<StrategicMemory>> {
        self.query_memories(
            &format!(
                "SELECT {STRATEGIC_COLUMNS} FROM strategic_memory WHERE tier = ?1 ORDER BY \
                 (CASE WHEN apply_count = 0 THEN 0.5 ELSE CAST(success_count AS REAL) / apply_count END) DESC, \
                 confidence DESC LIMIT ?2"
            ),
            params![tier_to_str(tier), limit as i64],
        )
        .await
    }

    async fn list_top_by_confidence(&self, limit: usize) -> Result<Vec<StrategicMemory>> {
        self.query_memories(
            &format!("SELECT {STRATEGIC_COLUMNS} FROM strategic_memory ORDER BY confidence DESC LIMIT ?1"),
            params![limit as i64],
        )
        .await
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<StrategicMemory>> {
        self.query_memories(
            &format!("SELECT {STRATEGIC_COLUMNS} FROM strategic_memory WHERE parent_id = ?1 ORDER BY version DESC"),
            params![parent_id.to_string()],
        )
        .await
    }

    async fn search_fts(&self, fts_query: &str, limit: usize) -> Result<Vec<StrategicMemory>> {
        if fts_query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {cols} FROM strategic_memory sm JOIN strategic_memory_fts fts ON fts.id = sm.id \
             WHERE strategic_memory_fts MATCH ?1 ORDER BY \
             (CASE WHEN sm.apply_count = 0 THEN 0.5 ELSE CAST(sm.success_count AS REAL) / sm.apply_count END) DESC, \
             sm.confidence DESC LIMIT ?2",
            cols = STRATEGIC_COLUMNS
                .split(", ")
                .map(|c| format!("sm.{c}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.query_memories(&sql, params![fts_query.to_string(), limit as i64])
            .await
    }

    async fn insert_narrative(&self, narrative: PromotionNarrative) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(
            "INSERT INTO promotion_narratives (id, memory_id, from_tier, to_tier, reason, metric_snapshot, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                memory_core::types::new_id("prom"),
                narrative.memory_id.clone(),
                tier_to_str(narrative.from_tier),
                tier_to_str(narrative.to_tier),
                narrative.reason.clone(),
                narrative.metric_snapshot.to_string(),
                to_unix(narrative.created_at),
            ],
        )
        .await
        .map_err(|e| store_err("insert promotion_narratives", e))?;
        Ok(())
    }

    async fn insert_attribution(&self, attribution: OutcomeAttribution) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(
            "INSERT INTO memory_attributions (id, memory_id, query_id, query_text, outcome, contribution, session_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                memory_core::types::new_id("act"),
                attribution.memory_id.clone(),
                attribution.query_id.clone(),
                attribution.query_text.clone(),
                outcome_to_str(attribution.outcome),
                f64::from(attribution.contribution),
                attribution.session_id.clone(),
                to_unix(attribution.created_at),
            ],
        )
        .await
        .map_err(|e| store_err("insert memory_attributions", e))?;
        Ok(())
    }

    async fn list_attributions(&self, memory_id: &str) -> Result<Vec<OutcomeAttribution>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(
                "SELECT memory_id, query_id, query_text, outcome, contribution, session_id, created_at \
                 FROM memory_attributions WHERE memory_id = ?1",
                params![memory_id.to_string()],
            )
            .await
            .map_err(|e| store_err("query memory_attributions", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("fetch row", e))? {
            let memory_id: String = row.get(0).map_err(|e| store_err("read memory_id", e))?;
            let query_id: String = row.get(1).map_err(|e| store_err("read query_id", e))?;
            let query_text: String = row.get(2).map_err(|e| store_err("read query_text", e))?;
            let outcome: String = row.get(3).map_err(|e| store_err("read outcome", e))?;
            let contribution: f64 = row.get(4).map_err(|e| store_err("read contribution", e))?;
            let session_id: String = row.get(5).map_err(|e| store_err("read session_id", e))?;
            let created_at: i64 = row.get(6).map_err(|e| store_err("read created_at", e))?;
            out.push(OutcomeAttribution {
                memory_id,
                query_id,
                query_text,
                outcome: outcome_from_str(&outcome)?,
                contribution: contribution as f32,
                session_id,
                created_at: from_unix(created_at),
            });
        }
        Ok(out)
    }

    async fn insert_activation_log(&self, log: ActivationLog) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(
            "INSERT INTO activation_logs (id, query_id, query_text, memory_ids, retrieval_type, latency_ms, \
             tokens_used, lane, session_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                memory_core::types::new_id("act"),
                log.query_id.clone(),
                log.query_text.clone(),
                to_json(&log.returned_memory_ids)?,
                retrieval_type_to_str(log.retrieval_type),
                log.latency_ms as i64,
                i64::from(log.tokens_used),
                lane_to_str(log.lane),
                log.session_id.clone(),
                to_unix(log.created_at),
            ],
        )
        .await
        .map_err(|e| store_err("insert activation_logs", e))?;
        Ok(())
    }
}
