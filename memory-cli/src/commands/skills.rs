//! `memory-cli skills ...` — the Voyager-style skill library

use crate::app::App;
use crate::output::{Line, Output, OutputFormat};
use clap::Subcommand;
use memory_core::skills::{ExecutionTrace, StoredSkill};
use serde::Serialize;
use std::io::Write;

#[derive(Subcommand)]
pub enum SkillCommands {
    /// Learn a skill from a completed execution trace (only stored when
    /// `confidence` meets the Voyager threshold).
    Learn {
        task_summary: String,
        generated_code: String,
        user_input: String,
        confidence: f32,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long)]
        session_id: Option<String>,
        #[arg(long, default_value = "{}")]
        input_schema: String,
    },
    /// Semantic-first relevance search (falls back to a success-rate
    /// gated text scan without an embedder).
    Find {
        task: String,
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Record a skill invocation outcome.
    RecordOutcome { id: String, success: bool },
    /// Create a child evolution of a skill with a new pattern.
    Evolve { parent_id: String, new_pattern: String, reason: String },
}

#[derive(Serialize)]
struct SkillView(StoredSkill);

impl Output for SkillView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(
            writer,
            "{} \"{}\" v{} success_rate={:.0}% source={:?}",
            self.0.id,
            self.0.name,
            self.0.version,
            self.0.bayesian_success_rate() * 100.0,
            self.0.source,
        )?;
        Ok(())
    }
}

#[derive(Serialize)]
struct SkillListView(Vec<StoredSkill>);

impl Output for SkillListView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for skill in &self.0 {
            SkillView(skill.clone()).write_human(&mut writer)?;
        }
        Ok(())
    }
}

pub async fn execute(app: &App, command: SkillCommands, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        SkillCommands::Learn {
            task_summary,
            generated_code,
            user_input,
            confidence,
            tags,
            session_id,
            input_schema,
        } => {
            let trace = ExecutionTrace {
                task_summary,
                generated_code,
                user_input,
                detected_tags: tags,
                confidence,
                session_id,
                input_schema,
            };
            match app.skills.learn_from_execution(trace).await? {
                Some(skill) => format.print(&SkillView(skill))?,
                None => format.print(&Line("confidence below the learning threshold, skill not stored".to_string()))?,
            }
        }
        SkillCommands::Find { task, limit } => {
            let skills = app.skills.find_relevant_skills(&task, limit).await?;
            format.print(&SkillListView(skills))?;
        }
        SkillCommands::RecordOutcome { id, success } => {
            format.print(&SkillView(app.skills.record_outcome(&id, success).await?))?;
        }
        SkillCommands::Evolve { parent_id, new_pattern, reason } => {
            format.print(&SkillView(app.skills.evolve_skill(&parent_id, new_pattern, &reason).await?))?;
        }
    }
    Ok(())
}
