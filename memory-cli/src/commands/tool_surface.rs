//! `memory-cli tool ...` — direct invocations of the six LLM-callable
//! tool functions, useful for scripting and for manually
//! exercising the surface an agent would call at runtime.

use crate::app::App;
use crate::output::{Line, Output, OutputFormat};
use clap::{Subcommand, ValueEnum};
use memory_core::external::KnowledgeScope;
use memory_core::tool_surface::CoreMemorySection;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SectionArg {
    User,
    Project,
}

impl From<SectionArg> for CoreMemorySection {
    fn from(arg: SectionArg) -> Self {
        match arg {
            SectionArg::User => CoreMemorySection::User,
            SectionArg::Project => CoreMemorySection::Project,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScopeArg {
    Personal,
    Team,
    Global,
}

impl From<ScopeArg> for KnowledgeScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Personal => KnowledgeScope::Personal,
            ScopeArg::Team => KnowledgeScope::Team,
            ScopeArg::Global => KnowledgeScope::Global,
        }
    }
}

#[derive(Subcommand)]
pub enum ToolCommands {
    /// `recall_memory_search` — semantic/FTS search over the strategic
    /// store.
    RecallMemorySearch {
        query: String,
        #[arg(short, long, default_value = "10")]
        limit: usize,
        #[arg(long, default_value = "cli")]
        session_id: String,
    },
    /// `core_memory_read` — fetch a user or project profile.
    CoreMemoryRead {
        #[arg(value_enum)]
        section: SectionArg,
        entity_id: String,
    },
    /// `core_memory_append` — append a custom fact to a user's profile.
    CoreMemoryAppend { user_id: String, fact: String },
    /// `core_memory_update` — write one allowlisted user field.
    CoreMemoryUpdate { user_id: String, field: String, value: String },
    /// `archival_memory_search` — query the external knowledge fabric.
    ArchivalMemorySearch {
        query: String,
        #[arg(value_enum)]
        scope: Option<ScopeArg>,
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// `archival_memory_insert` — insert an item into the external
    /// knowledge fabric.
    ArchivalMemoryInsert {
        title: String,
        content: String,
        #[arg(value_enum)]
        scope: ScopeArg,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
}

#[derive(Serialize)]
struct CallSummary {
    tool_name: String,
    success: bool,
    error: Option<String>,
    latency_ms: u64,
}

impl Output for CallSummary {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "{} success={} latency_ms={}", self.tool_name, self.success, self.latency_ms)?;
        if let Some(error) = &self.error {
            writeln!(writer, "  error: {error}")?;
        }
        Ok(())
    }
}

pub async fn execute(app: &App, command: ToolCommands, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        ToolCommands::RecallMemorySearch { query, limit, session_id } => {
            let result = app.tool_surface.recall_memory_search(&query, limit, &session_id).await;
            let count = result.result.as_ref().map(Vec::len).unwrap_or_default();
            format.print(&Line(format!("recall_memory_search: {count} matches")))?;
            format.print(&CallSummary {
                tool_name: result.tool_name,
                success: result.success,
                error: result.error,
                latency_ms: result.latency_ms,
            })?;
        }
        ToolCommands::CoreMemoryRead { section, entity_id } => {
            let result = app.tool_surface.core_memory_read(section.into(), &entity_id).await;
            format.print(&CallSummary {
                tool_name: result.tool_name,
                success: result.success,
                error: result.error,
                latency_ms: result.latency_ms,
            })?;
        }
        ToolCommands::CoreMemoryAppend { user_id, fact } => {
            let result = app.tool_surface.core_memory_append(&user_id, &fact).await;
            format.print(&CallSummary {
                tool_name: result.tool_name,
                success: result.success,
                error: result.error,
                latency_ms: result.latency_ms,
            })?;
        }
        ToolCommands::CoreMemoryUpdate { user_id, field, value } => {
            let result = app.tool_surface.core_memory_update(&user_id, &field, &value).await;
            format.print(&CallSummary {
                tool_name: result.tool_name,
                success: result.success,
                error: result.error,
                latency_ms: result.latency_ms,
            })?;
        }
        ToolCommands::ArchivalMemorySearch { query, scope, limit } => {
            let result = app.tool_surface.archival_memory_search(&query, scope.map(Into::into), limit).await;
            format.print(&CallSummary {
                tool_name: result.tool_name,
                success: result.success,
                error: result.error,
                latency_ms: result.latency_ms,
            })?;
        }
        ToolCommands::ArchivalMemoryInsert { title, content, scope, tags } => {
            let result = app.tool_surface.archival_memory_insert(&title, &content, tags, scope.into()).await;
            format.print(&CallSummary {
                tool_name: result.tool_name,
                success: result.success,
                error: result.error,
                latency_ms: result.latency_ms,
            })?;
        }
    }
    Ok(())
}
