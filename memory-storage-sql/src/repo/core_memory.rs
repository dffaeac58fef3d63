//! SQL-backed [`CoreMemoryRepository`].

use super::{from_json, from_unix, store_err, to_json, to_unix};
use crate::SqlStorage;
use async_trait::async_trait;
use libsql::{params, Row};
use memory_core::core_memory::{ChangelogEntry, CoreMemoryRepository, ProjectMemory, UserMemory};
use memory_core::types::EntityKind;
use memory_core::{Error, Result};

fn entity_kind_to_str(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::User => "user",
        EntityKind::Project => "project",
    }
}

fn entity_kind_from_str(raw: &str) -> Result<EntityKind> {
    match raw {
        "user" => Ok(EntityKind::User),
        "project" => Ok(EntityKind::Project),
        other => Err(Error::StoreFailure(format!("unknown entity kind: {other}"))),
    }
}

fn row_to_user(row: &Row) -> Result<UserMemory> {
    let user_id: String = row.get(0).map_err(|e| store_err("read user_id", e))?;
    let name: Option<String> = row.get(1).map_err(|e| store_err("read name", e))?;
    let role: Option<String> = row.get(2).map_err(|e| store_err("read role", e))?;
    let experience: Option<String> = row.get(3).map_err(|e| store_err("read experience", e))?;
    let os: Option<String> = row.get(4).map_err(|e| store_err("read os", e))?;
    let shell: Option<String> = row.get(5).map_err(|e| store_err("read shell", e))?;
    let editor: Option<String> = row.get(6).map_err(|e| store_err("read editor", e))?;
    let preferences: String = row.get(7).map_err(|e| store_err("read preferences", e))?;
    let custom_facts: String = row.get(8).map_err(|e| store_err("read custom_facts", e))?;
    let created_at: i64 = row.get(9).map_err(|e| store_err("read created_at", e))?;
    let updated_at: i64 = row.get(10).map_err(|e| store_err("read updated_at", e))?;

    Ok(UserMemory {
        user_id,
        name,
        role,
        experience,
        os,
        shell,
        editor,
        preferences: from_json(&preferences)?,
        custom_facts: from_json(&custom_facts)?,
        created_at: from_unix(created_at),
        updated_at: from_unix(updated_at),
    })
}

fn row_to_project(row: &Row) -> Result<ProjectMemory> {
    let project_id: String = row.get(0).map_err(|e| store_err("read project_id", e))?;
    let name: Option<String> = row.get(1).map_err(|e| store_err("read name", e))?;
    let description: Option<String> = row.get(2).map_err(|e| store_err("read description", e))?;
    let tech_stack: Option<String> = row.get(3).map_err(|e| store_err("read tech_stack", e))?;
    let created_at: i64 = row.get(4).map_err(|e| store_err("read created_at", e))?;
    let updated_at: i64 = row.get(5).map_err(|e| store_err("read updated_at", e))?;

    Ok(ProjectMemory {
        project_id,
        name,
        description,
        tech_stack,
        created_at: from_unix(created_at),
        updated_at: from_unix(updated_at),
    })
}

fn row_to_changelog(row: &Row) -> Result<ChangelogEntry> {
    let id: String = row.get(0).map_err(|e| store_err("read id", e))?;
    let entity_kind: String = row.get(1).map_err(|e| store_err("read entity_kind", e))?;
    let entity_id: String = row.get(2).map_err(|e| store_err("read entity_id", e))?;
    let field: String = row.get(3).map_err(|e| store_err("read field", e))?;
    let old_value: String = row.get(4).map_err(|e| store_err("read old_value", e))?;
    let new_value: String = row.get(5).map_err(|e| store_err("read new_value", e))?;
    let source: String = row.get(6).map_err(|e| store_err("read source", e))?;
    let created_at: i64 = row.get(7).map_err(|e| store_err("read created_at", e))?;

    Ok(ChangelogEntry {
        id,
        entity_kind: entity_kind_from_str(&entity_kind)?,
        entity_id,
        field,
        old_value,
        new_value,
        source,
        created_at: from_unix(created_at),
    })
}

#[async_trait]
impl CoreMemoryRepository for SqlStorage {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserMemory>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(
                "SELECT user_id, name, role, experience, os, shell, editor, preferences, \
                 custom_facts, created_at, updated_at FROM user_memory WHERE user_id = ?1",
                params![user_id.to_string()],
            )
            .await
            .map_err(|e| store_err("query user_memory", e))?;
        match rows.next().await.map_err(|e| store_err("fetch row", e))? {
            Some(row) => Ok(Some(row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn put_user(&self, user: UserMemory) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(
            "INSERT OR REPLACE INTO user_memory (
                user_id, name, role, experience, os, shell, editor, preferences, custom_facts,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                user.user_id,
                user.name,
                user.role,
                user.experience,
                user.os,
                user.shell,
                user.editor,
                to_json(&user.preferences)?,
                to_json(&user.custom_facts)?,
                to_unix(user.created_at),
                to_unix(user.updated_at),
            ],
        )
        .await
        .map_err(|e| store_err("upsert user_memory", e))?;
        Ok(())
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<ProjectMemory>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(
                "SELECT project_id, name, description, tech_stack, created_at, updated_at \
                 FROM project_memory WHERE project_id = ?1",
                params![project_id.to_string()],
            )
            .await
            .map_err(|e| store_err("query project_memory", e))?;
        match rows.next().await.map_err(|e| store_err("fetch row", e))? {
            Some(row) => Ok(Some(row_to_project(&row)?)),
            None => Ok(None),
        }
    }

    async fn put_project(&self, project: ProjectMemory) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(
            "INSERT OR REPLACE INTO project_memory (
                project_id, name, description, tech_stack, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.project_id,
                project.name,
                project.description,
                project.tech_stack,
                to_unix(project.created_at),
                to_unix(project.updated_at),
            ],
        )
        .await
        .map_err(|e| store_err("upsert project_memory", e))?;
        Ok(())
    }

    async fn insert_changelog(&self, entry: ChangelogEntry) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(
            "INSERT INTO user_memory_changelog (
                id, entity_kind, entity_id, field, old_value, new_value, source, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.id,
                entity_kind_to_str(entry.entity_kind),
                entry.entity_id,
                entry.field,
                entry.old_value,
                entry.new_value,
                entry.source,
                to_unix(entry.created_at),
            ],
        )
        .await
        .map_err(|e| store_err("insert user_memory_changelog", e))?;
        Ok(())
    }

    async fn list_changelog(&self, entity_id: &str) -> Result<Vec<ChangelogEntry>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(
                "SELECT id, entity_kind, entity_id, field, old_value, new_value, source, created_at \
                 FROM user_memory_changelog WHERE entity_id = ?1 ORDER BY created_at DESC",
                params![entity_id.to_string()],
            )
            .await
            .map_err(|e| store_err("query user_memory_changelog", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_err("fetch row", e))? {
            out.push(row_to_changelog(&row)?);
        }
        Ok(out)
    }
}
