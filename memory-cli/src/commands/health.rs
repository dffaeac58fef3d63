//! `memory-cli health` — storage connectivity diagnostics.

use crate::app::App;
use crate::output::{Line, Output, OutputFormat};
use clap::Subcommand;
use serde::Serialize;
use std::io::Write;

#[derive(Subcommand)]
pub enum HealthCommands {
    /// Print connection pool statistics for the durable SQL store.
    Sql,
    /// Print hot-read cache hit/miss counters.
    Cache,
}

#[derive(Serialize)]
struct SqlHealthView {
    active_connections: usize,
    total_created: usize,
    total_checkouts: usize,
    avg_wait_time_ms: u64,
}

impl Output for SqlHealthView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(
            writer,
            "active={} created={} checkouts={} avg_wait_ms={}",
            self.active_connections, self.total_created, self.total_checkouts, self.avg_wait_time_ms
        )?;
        Ok(())
    }
}

pub async fn execute(app: &App, command: HealthCommands, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        HealthCommands::Sql => {
            let stats = app.sql.pool_statistics().await;
            format.print(&SqlHealthView {
                active_connections: stats.active_connections,
                total_created: stats.total_created,
                total_checkouts: stats.total_checkouts,
                avg_wait_time_ms: stats.avg_wait_time_ms,
            })?;
        }
        HealthCommands::Cache => {
            let metrics = app.cache.metrics().await;
            format.print(&Line(format!(
                "hits={} misses={} hit_rate={:.2} evictions={} item_count={}",
                metrics.hits, metrics.misses, metrics.hit_rate, metrics.evictions, metrics.item_count
            )))?;
        }
    }
    Ok(())
}
