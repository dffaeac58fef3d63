//! `memory-cli orientation ...` — `WakeUp()` context assembly, system
//! preamble rendering, and the assistant identity profile

use crate::app::App;
use crate::output::{Line, Output, OutputFormat};
use clap::Subcommand;
use memory_core::orientation::generate_system_preamble;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

#[derive(Subcommand)]
pub enum OrientationCommands {
    /// Assemble and print the wake-up context as a rendered preamble.
    WakeUp { user_id: String },
    /// Same as `wake-up`, but prints the raw preamble text only.
    Preamble { user_id: String },
    /// Update one or more allowlisted identity fields
    /// (`name,role,core_values,current_goal,mood,persona_prompt`).
    /// `core_values` takes a JSON array of strings.
    UpdateIdentity {
        user_id: String,
        #[arg(long, value_parser = parse_field)]
        field: Vec<(String, String)>,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| "expected key=value".to_string())
}

#[derive(Serialize)]
struct WakeUpView {
    identity_name: Option<String>,
    current_goal: Option<String>,
    active_topics: Vec<String>,
    top_principles: Vec<(String, f64)>,
    recent_goals: Vec<String>,
}

impl Output for WakeUpView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "identity: {:?}", self.identity_name)?;
        writeln!(writer, "current goal: {:?}", self.current_goal)?;
        writeln!(writer, "active topics: {}", self.active_topics.join(", "))?;
        for (principle, rate) in &self.top_principles {
            writeln!(writer, "principle: {principle} ({:.0}%)", rate * 100.0)?;
        }
        Ok(())
    }
}

pub async fn execute(app: &App, command: OrientationCommands, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        OrientationCommands::WakeUp { user_id } => {
            let ctx = app.orientation.wake_up(&user_id).await?;
            let view = WakeUpView {
                identity_name: ctx.identity.name.clone(),
                current_goal: ctx.identity.current_goal.clone(),
                active_topics: ctx.active_topics.iter().map(|t| t.name.clone()).collect(),
                top_principles: ctx.top_principles.clone(),
                recent_goals: ctx.recent_goals.clone(),
            };
            format.print(&view)?;
        }
        OrientationCommands::Preamble { user_id } => {
            let ctx = app.orientation.wake_up(&user_id).await?;
            format.print(&Line(generate_system_preamble(&ctx)))?;
        }
        OrientationCommands::UpdateIdentity { user_id, field } => {
            let mut fields = HashMap::new();
            for (key, value) in field {
                fields.insert(key, value);
            }
            let identity = app.identity.update_identity(&user_id, &fields).await?;
            format.print(&Line(format!("updated identity for {}", identity.user_id)))?;
        }
    }
    Ok(())
}
