//! SQL-backed [`SkillRepository`].

use super::{from_json, from_unix, store_err, to_json, to_unix};
use crate::SqlStorage;
use async_trait::async_trait;
use libsql::{params, Row};
use memory_core::skills::{SkillRepository, StoredSkill};
use memory_core::types::SkillSource;
use memory_core::{Error, Result};

const SKILL_COLUMNS: &str = "id, version, name, description, pattern, input_schema, examples, tags, source, \
    session_id, parent_id, confidence, success_count, failure_count, embedding, created_at, updated_at, \
    last_accessed_at, access_count";

fn source_to_str(source: SkillSource) -> &'static str {
    match source {
        SkillSource::Execution => "execution",
        SkillSource::Manual => "manual",
        SkillSource::Evolution => "evolution",
        SkillSource::Synthesis => "synthesis",
    }
}

fn source_from_str(raw: &str) -> Result<SkillSource> {
    match raw {
        "execution" => Ok(SkillSource::Execution),
        "manual" => Ok(SkillSource::Manual),
        "evolution" => Ok(SkillSource::Evolution),
        "synthesis" => Ok(SkillSource::Synthesis),
        other => Err(Error::StoreFailure(format!("unknown skill source: {other}"))),
    }
}

fn row_to_skill(row: &Row) -> Result<StoredSkill> {
    let id: String = row.get(0).map_err(|e| store_err("read id", e))?;
    let version: i64 = row.get(1).map_err(|e| store_err("read version", e))?;
    let name: String = row.get(2).map_err(|e| store_err("read name", e))?;
    let description: String = row.get(3).map_err(|e| store_err("read description", e))?;
    let pattern: String = row.get(4).map_err(|e| store_err("read pattern", e))?;
    let input_schema: String = row.get(5).map_err(|e| store_err("read input_schema", e))?;
    let examples: String = row.get(6).map_err(|e| store_err("read examples", e))?;
    let tags: String = row.get(7).map_err(|e| store_err("read tags", e))?;
    let source: String = row.get(8).map_err(|e| store_err("read source", e))?;
    let session_id: Option<String> = row.get(9).map_err(|e| store_err("read session_id", e))?;
    let parent_id: Option<String> = row.get(10).map_err(|e| store_err("read parent_id", e))?;
    let confidence: f64 = row.get(11).map_err(|e| store_err("read confidence", e))?;
    let success_count: i64 = row.get(12).map_err(|e| store_err("read success_count", e))?;
    let failure_count: i64 = row.get(13).map_err(|e| store_err("read failure_count", e))?;
    let embedding: Option<Vec<u8>> = row.get(14).map_err(|e| store_err("read embedding", e))?;
    let created_at: i64 = row.get(15).map_err(|e| store_err("read created_at", e))?;
    let updated_at: i64 = row.get(16).map_err(|e| store_err("read updated_at", e))?;
    let last_accessed_at: Option<i64> = row.get(17).map_err(|e| store_err("read last_accessed_at", e))?;
    let access_count: i64 = row.get(18).map_err(|e| store_err("read access_count", e))?;

    Ok(StoredSkill {
        id,
        name,
        description,
        pattern,
        input_schema,
        examples: from_json(&examples)?,
        tags: from_json(&tags)?,
        embedding: memory_core::vector::bytes_to_float32_slice(embedding.as_deref()),
        success_count: success_count as u32,
        failure_count: failure_count as u32,
        confidence: confidence as f32,
        source: source_from_str(&source)?,
        session_id,
        version: version as u32,
        parent_id,
        created_at: from_unix(created_at),
        updated_at: from_unix(updated_at),
        last_accessed_at: last_accessed_at.map(from_unix),
        access_count: access_count as u32,
    })
}

impl SqlStorage {
    async fn upsert_skill_fts(&self, skill: &StoredSkill) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute("DELETE FROM skills_fts WHERE id = ?1", params![skill.id.clone()])
            .await
            .map_err(|e| store_err("delete skills fts row", e))?;
        conn.execute(
            "INSERT INTO skills_fts (id, name, description, pattern) VALUES (?1, ?2, ?3, ?4)",
            params![skill.id.clone(), skill.name.clone(), skill.description.clone(), skill.pattern.clone()],
        )
        .await
        .map_err(|e| store_err("insert skills fts row", e))?;
        Ok(())
    }

    async fn upsert_skill(&self, skill: &StoredSkill) -> Result<()> {
        let conn = self.connection().await?;
        const SQL: &str = r#"
            INSERT OR REPLACE INTO skills (
                id, version, name, description, pattern, input_schema, examples, tags, source,
                session_id, parent_id, confidence, success_count, failure_count, embedding,
                created_at, updated_at, last_accessed_at, access_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
        "#;
        conn.execute(
            SQL,
            params![
                skill.id.clone(),
                i64::from(skill.version),
                skill.name.clone(),
                skill.description.clone(),
                skill.pattern.clone(),
                skill.input_schema.clone(),
                to_json(&skill.examples)?,
                to_json(&skill.tags)?,
                source_to_str(skill.source),
                skill.session_id.clone(),
                skill.parent_id.clone(),
                f64::from(skill.confidence),
                i64::from(skill.success_count),
                i64::from(skill.failure_count),
                memory_core::vector::float32_slice_to_bytes(skill.embedding.as_deref()),
                to_unix(skill.created_at),
                to_unix(skill.updated_at),
                skill.last_accessed_at.map(to_unix),
                i64::from(skill.access_count),
            ],
        )
        .await
        .map_err(|e| store_err("upsert skills", e))?;
        self.upsert_skill_fts(skill).await
    }

    async fn query_skills(&self, sql: &str, params: libsql::params::Params) -> Result<Vec<StoredSkill>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(sql, params)
            .await
            .map_err(|e| store_err("query skills", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("fetch row", e))? {
            out.push(row_to_skill(&row)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl SkillRepository for SqlStorage {
    async fn insert(&self, skill: StoredSkill) -> Result<()> {
        self.upsert_skill(&skill).await
    }

    async fn get(&self, id: &str) -> Result<Option<StoredSkill>> {
        let skills = self
            .query_skills(
                &format!("SELECT {SKILL_COLUMNS} FROM skills WHERE id = ?1"),
                params![id.to_string()],
            )
            .await?;
        Ok(skills.into_iter().next())
    }

    async fn update(&self, skill: StoredSkill) -> Result<()> {
        self.upsert_skill(&skill).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute("DELETE FROM skills WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(|e| store_err("delete skills", e))?;
        conn.execute("DELETE FROM skills_fts WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(|e| store_err("delete skills fts row", e))?;
        Ok(())
    }

    async fn list_with_embeddings(&self) -> Result<Vec<StoredSkill>> {
        self.query_skills(
            &format!("SELECT {SKILL_COLUMNS} FROM skills WHERE embedding IS NOT NULL"),
            params![],
        )
        .await
    }

    async fn search_text(&self, query: &str) -> Result<Vec<StoredSkill>> {
        let needle = format!("%{}%", query.to_lowercase());
        self.query_skills(
            &format!(
                "SELECT {SKILL_COLUMNS} FROM skills WHERE lower(name) LIKE ?1 OR lower(description) LIKE ?1 \
                 OR lower(tags) LIKE ?1"
            ),
            params![needle],
        )
        .await
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<StoredSkill>> {
        self.query_skills(
            &format!("SELECT {SKILL_COLUMNS} FROM skills WHERE parent_id = ?1 ORDER BY version DESC"),
            params![parent_id.to_string()],
        )
        .await
    }
}
