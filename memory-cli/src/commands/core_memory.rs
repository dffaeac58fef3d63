//! `memory-cli core ...` — user/project profiles and their append-only
//! changelog

use crate::app::App;
use crate::output::{Output, OutputFormat};
use clap::Subcommand;
use memory_core::core_memory::{ChangelogEntry, ProjectMemory, UserMemory};
use serde::Serialize;
use std::io::Write;

#[derive(Subcommand)]
pub enum CoreMemoryCommands {
    /// Fetch (or lazily create) a user's profile.
    GetUser { user_id: String },
    /// Write one allowlisted scalar field on a user's profile.
    UpdateUserField { user_id: String, field: String, value: String },
    /// Append a custom fact, evicting the oldest on overflow.
    AddFact { user_id: String, text: String },
    /// Add a preference, evicting the lowest-confidence entry on
    /// overflow.
    AddPreference { user_id: String, text: String, confidence: f32 },
    /// Fetch (or lazily create) a project's profile.
    GetProject { project_id: String },
    /// Write one allowlisted scalar field on a project's profile.
    UpdateProjectField { project_id: String, field: String, value: String },
    /// Append-only changelog for a user or project id.
    Changelog { entity_id: String },
}

#[derive(Serialize)]
struct UserView(UserMemory);

impl Output for UserView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(
            writer,
            "{} name={:?} role={:?} facts={} preferences={}",
            self.0.user_id,
            self.0.name,
            self.0.role,
            self.0.custom_facts.len(),
            self.0.preferences.len(),
        )?;
        Ok(())
    }
}

#[derive(Serialize)]
struct ProjectView(ProjectMemory);

impl Output for ProjectView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(
            writer,
            "{} name={:?} tech_stack={:?}",
            self.0.project_id, self.0.name, self.0.tech_stack
        )?;
        Ok(())
    }
}

#[derive(Serialize)]
struct ChangelogView(Vec<ChangelogEntry>);

impl Output for ChangelogView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for entry in &self.0 {
            writeln!(writer, "{} {} {:?} {:?} -> {:?}", entry.created_at, entry.field, entry.entity_kind, entry.old_value, entry.new_value)?;
        }
        Ok(())
    }
}

pub async fn execute(app: &App, command: CoreMemoryCommands, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        CoreMemoryCommands::GetUser { user_id } => format.print(&UserView(app.core_memory.get_user(&user_id).await?))?,
        CoreMemoryCommands::UpdateUserField { user_id, field, value } => {
            let user = app.core_memory.update_user_field(&user_id, &field, &value, "cli").await?;
            format.print(&UserView(user))?;
        }
        CoreMemoryCommands::AddFact { user_id, text } => {
            format.print(&UserView(app.core_memory.append_fact(&user_id, &text).await?))?;
        }
        CoreMemoryCommands::AddPreference { user_id, text, confidence } => {
            format.print(&UserView(app.core_memory.add_preference(&user_id, &text, confidence).await?))?;
        }
        CoreMemoryCommands::GetProject { project_id } => {
            format.print(&ProjectView(app.core_memory.get_project(&project_id).await?))?;
        }
        CoreMemoryCommands::UpdateProjectField { project_id, field, value } => {
            let project = app.core_memory.update_project_field(&project_id, &field, &value, "cli").await?;
            format.print(&ProjectView(project))?;
        }
        CoreMemoryCommands::Changelog { entity_id } => {
            format.print(&ChangelogView(app.core_memory.get_changelog(&entity_id).await?))?;
        }
    }
    Ok(())
}
