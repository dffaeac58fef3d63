//! `memory-cli topics ...` — DBSCAN clustering over strategic-memory
//! embeddings and active-topic lookups

use crate::app::App;
use crate::output::{Line, Output, OutputFormat};
use clap::Subcommand;
use memory_core::config::ClusteringConfig;
use memory_core::topics::Topic;
use serde::Serialize;
use std::io::Write;

#[derive(Subcommand)]
pub enum TopicCommands {
    /// Re-cluster embedded strategic memories within the lookback window.
    Cluster {
        #[arg(long, default_value = "0.3")]
        eps: f32,
        #[arg(long, default_value = "3")]
        min_pts: usize,
        #[arg(long, default_value = "30")]
        lookback_days: i64,
    },
    /// List active topics, most recently active first.
    Active {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Best-matching active topic for a query (requires an embedder).
    GetActive { query: String },
    /// Deactivate topics untouched for more than `days`.
    DeactivateStale {
        #[arg(short, long, default_value = "30")]
        days: i64,
    },
    /// Bump a topic's `last_active_at` to now.
    Touch { id: String },
}

#[derive(Serialize)]
struct TopicView(Topic);

impl Output for TopicView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(
            writer,
            "{} \"{}\" members={} active={}",
            self.0.id, self.0.name, self.0.member_count, self.0.is_active
        )?;
        Ok(())
    }
}

#[derive(Serialize)]
struct TopicListView(Vec<Topic>);

impl Output for TopicListView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for topic in &self.0 {
            TopicView(topic.clone()).write_human(&mut writer)?;
        }
        Ok(())
    }
}

pub async fn execute(app: &App, command: TopicCommands, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        TopicCommands::Cluster { eps, min_pts, lookback_days } => {
            let config = ClusteringConfig { eps, min_pts, lookback_days };
            let topics = app.topics.run_clustering(&config).await?;
            format.print(&TopicListView(topics))?;
        }
        TopicCommands::Active { limit } => {
            let topics = app.topics.get_active_topics(limit).await?;
            format.print(&TopicListView(topics))?;
        }
        TopicCommands::GetActive { query } => match app.topics.get_active_topic(&query).await? {
            Some((topic, members)) => {
                format.print(&Line(format!("{} (members: {})", topic.name, members.len())))?;
            }
            None => format.print(&Line("no active topic matched".to_string()))?,
        },
        TopicCommands::DeactivateStale { days } => {
            let count = app.topics.deactivate_stale_topics(days).await?;
            format.print(&Line(format!("deactivated {count} topics")))?;
        }
        TopicCommands::Touch { id } => {
            app.topics.update_last_active(&id).await?;
            format.print(&Line(format!("touched {id}")))?;
        }
    }
    Ok(())
}
