//! `memory-cli strategic ...` — CRUD, retrieval, promotion, evolution and
//! attribution over the strategic principle store

use crate::app::App;
use crate::output::{Line, Output, OutputFormat};
use clap::{Subcommand, ValueEnum};
use memory_core::config::PromotionThresholds;
use memory_core::strategic::StrategicMemory;
use memory_core::types::{MemoryTier, Outcome};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TierArg {
    Tentative,
    Candidate,
    Proven,
    Identity,
}

impl From<TierArg> for MemoryTier {
    fn from(arg: TierArg) -> Self {
        match arg {
            TierArg::Tentative => MemoryTier::Tentative,
            TierArg::Candidate => MemoryTier::Candidate,
            TierArg::Proven => MemoryTier::Proven,
            TierArg::Identity => MemoryTier::Identity,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutcomeArg {
    Success,
    Failure,
    Partial,
}

impl From<OutcomeArg> for Outcome {
    fn from(arg: OutcomeArg) -> Self {
        match arg {
            OutcomeArg::Success => Outcome::Success,
            OutcomeArg::Failure => Outcome::Failure,
            OutcomeArg::Partial => Outcome::Partial,
        }
    }
}

#[derive(Subcommand)]
pub enum StrategicCommands {
    /// Create a new strategic memory (starts Tentative, confidence 0.5
    /// unless overridden).
    Create {
        principle: String,
        #[arg(short, long, default_value = "general")]
        category: String,
        #[arg(short, long, default_value = "")]
        trigger: String,
        /// Starting confidence in [0, 1]; defaults to 0.5 when omitted.
        #[arg(long)]
        confidence: Option<f32>,
    },
    /// Fetch a memory by id.
    Get { id: String },
    /// Record a successful application.
    RecordSuccess { id: String },
    /// Record a failed application.
    RecordFailure { id: String },
    /// Overwrite the confidence score (must be in [0, 1]).
    UpdateConfidence { id: String, confidence: f32 },
    /// Delete a memory.
    Delete { id: String },
    /// List memories, newest-first.
    List {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// List memories in a category.
    ByCategory {
        category: String,
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// List memories at a tier.
    ByTier {
        #[arg(value_enum)]
        tier: TierArg,
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Memories with enough evidence, ranked by success rate then
    /// confidence.
    Top {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Semantic search, falling back to full-text search without an
    /// embedder configured.
    Search {
        query: String,
        #[arg(short, long, default_value = "10")]
        limit: usize,
        #[arg(long, default_value = "cli")]
        session_id: String,
    },
    /// Full-text search directly (skips the embedder entirely).
    SearchFts {
        query: String,
        #[arg(short, long, default_value = "10")]
        limit: usize,
        #[arg(long, default_value = "cli")]
        session_id: String,
    },
    /// Promote a memory if it now meets a higher tier's thresholds,
    /// recording a narrative on success.
    Promote { id: String },
    /// Create a child evolution of a memory.
    Evolve { parent_id: String, new_principle: String, reason: String },
    /// Ancestors (oldest first) then the memory itself.
    History { id: String },
    /// Direct children, newest version first.
    Descendants { id: String },
    /// Record an outcome attribution across one or more memories.
    Attribute {
        query_id: String,
        query_text: String,
        #[arg(value_enum)]
        outcome: OutcomeArg,
        #[arg(long)]
        memory_id: Vec<String>,
        #[arg(long, default_value = "cli")]
        session_id: String,
    },
    /// Usage/success-rate snapshot derived from recorded attributions.
    Impact { id: String },
}

#[derive(Serialize)]
struct MemoryView {
    #[serde(flatten)]
    mem: StrategicMemory,
    success_rate: f64,
}

impl From<StrategicMemory> for MemoryView {
    fn from(mem: StrategicMemory) -> Self {
        let success_rate = mem.success_rate();
        Self { mem, success_rate }
    }
}

impl Output for MemoryView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(
            writer,
            "{} [{}] {} (category={}, confidence={:.2}, success_rate={:.0}%, applied={})",
            self.mem.id,
            self.mem.tier,
            self.mem.principle,
            self.mem.category,
            self.mem.confidence,
            self.success_rate * 100.0,
            self.mem.apply_count,
        )?;
        Ok(())
    }
}

#[derive(Serialize)]
struct MemoryListView(Vec<MemoryView>);

impl Output for MemoryListView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for view in &self.0 {
            view.write_human(&mut writer)?;
        }
        Ok(())
    }
}

pub async fn execute(app: &App, command: StrategicCommands, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        StrategicCommands::Create { principle, category, trigger, confidence } => {
            let mem = StrategicMemory {
                id: String::new(),
                principle,
                category,
                trigger_pattern: trigger,
                tier: MemoryTier::Tentative,
                success_count: 0,
                failure_count: 0,
                apply_count: 0,
                confidence: 0.0,
                source_sessions: Vec::new(),
                embedding: None,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
                last_applied_at: None,
                version: 1,
                parent_id: None,
                evolution_chain: Vec::new(),
            };
            format.print(&MemoryView::from(app.strategic.create(mem, confidence).await?))?;
        }
        StrategicCommands::Get { id } => format.print(&MemoryView::from(app.strategic.get(&id).await?))?,
        StrategicCommands::RecordSuccess { id } => {
            format.print(&MemoryView::from(app.strategic.record_success(&id).await?))?;
        }
        StrategicCommands::RecordFailure { id } => {
            format.print(&MemoryView::from(app.strategic.record_failure(&id).await?))?;
        }
        StrategicCommands::UpdateConfidence { id, confidence } => {
            format.print(&MemoryView::from(app.strategic.update_confidence(&id, confidence).await?))?;
        }
        StrategicCommands::Delete { id } => {
            app.strategic.delete(&id).await?;
            format.print(&Line(format!("deleted {id}")))?;
        }
        StrategicCommands::List { limit } => {
            let memories = app.strategic.list(limit).await?;
            format.print(&MemoryListView(memories.into_iter().map(MemoryView::from).collect()))?;
        }
        StrategicCommands::ByCategory { category, limit } => {
            let memories = app.strategic.get_by_category(&category, limit).await?;
            format.print(&MemoryListView(memories.into_iter().map(MemoryView::from).collect()))?;
        }
        StrategicCommands::ByTier { tier, limit } => {
            let memories = app.strategic.get_by_tier(tier.into(), limit).await?;
            format.print(&MemoryListView(memories.into_iter().map(MemoryView::from).collect()))?;
        }
        StrategicCommands::Top { limit } => {
            let memories = app.strategic.get_top_principles(limit).await?;
            format.print(&MemoryListView(memories.into_iter().map(MemoryView::from).collect()))?;
        }
        StrategicCommands::Search { query, limit, session_id } => {
            let memories = app.strategic.search_similar(&query, limit, &session_id).await?;
            format.print(&MemoryListView(memories.into_iter().map(MemoryView::from).collect()))?;
        }
        StrategicCommands::SearchFts { query, limit, session_id } => {
            let memories = app.strategic.search_fts(&query, limit, &session_id).await?;
            format.print(&MemoryListView(memories.into_iter().map(MemoryView::from).collect()))?;
        }
        StrategicCommands::Promote { id } => {
            let thresholds = PromotionThresholds::default();
            let outcome = app.strategic.promote_if_eligible_with_narrative(&id, &thresholds).await?;
            format.print(&Line(format!("promoted={} tier={}", outcome.promoted, outcome.tier)))?;
        }
        StrategicCommands::Evolve { parent_id, new_principle, reason } => {
            format.print(&MemoryView::from(app.strategic.create_evolution(&parent_id, new_principle, &reason).await?))?;
        }
        StrategicCommands::History { id } => {
            let history = app.strategic.get_evolution_history(&id).await?;
            format.print(&MemoryListView(history.into_iter().map(MemoryView::from).collect()))?;
        }
        StrategicCommands::Descendants { id } => {
            let children = app.strategic.get_descendants(&id).await?;
            format.print(&MemoryListView(children.into_iter().map(MemoryView::from).collect()))?;
        }
        StrategicCommands::Attribute { query_id, query_text, outcome, memory_id, session_id } => {
            app.strategic.record_attributions(&query_id, &query_text, &memory_id, outcome.into(), &session_id).await?;
            format.print(&Line(format!("recorded attribution across {} memories", memory_id.len())))?;
        }
        StrategicCommands::Impact { id } => {
            let impact = app.strategic.calculate_memory_impact(&id).await?;
            format.print(&Line(format!(
                "uses={} successes={} failures={} success_rate={:.0}%",
                impact.total_uses,
                impact.successes,
                impact.failures,
                impact.success_rate * 100.0
            )))?;
        }
    }
    Ok(())
}
