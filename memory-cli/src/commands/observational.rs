//! `memory-cli obs ...` — the three-tier observational pipeline: raw
//! messages, compressed observations, distilled reflections

use crate::app::App;
use crate::output::{Line, Output, OutputFormat};
use clap::Subcommand;
use memory_core::observational::{Message, Observation};
use serde::Serialize;
use std::io::Write;

#[derive(Subcommand)]
pub enum ObservationalCommands {
    /// Append a message to the working set.
    StoreMessage { thread_id: String, resource_id: String, role: String, content: String },
    /// List messages in a thread, oldest-first.
    Messages {
        thread_id: String,
        resource_id: String,
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    /// Uncompressed token count for a thread.
    TokenCount { thread_id: String, resource_id: String },
    /// List observations for a resource.
    Observations {
        resource_id: String,
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    /// Trigger the Observer: compresses the working set into one
    /// observation if the message-token threshold is met.
    CompressNow { thread_id: String, resource_id: String },
    /// Trigger the Reflector: distills accumulated observations into one
    /// reflection if its thresholds are met.
    ReflectNow { resource_id: String },
}

#[derive(Serialize)]
struct MessageListView(Vec<Message>);

impl Output for MessageListView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for message in &self.0 {
            writeln!(writer, "[{}] {}: {}", message.id, message.role, message.content)?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ObservationView(Observation);

impl Output for ObservationView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "{} priority={} {}", self.0.id, self.0.priority.0, self.0.task_state)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct ObservationListView(Vec<Observation>);

impl Output for ObservationListView {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for observation in &self.0 {
            ObservationView(observation.clone()).write_human(&mut writer)?;
        }
        Ok(())
    }
}

pub async fn execute(app: &App, command: ObservationalCommands, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        ObservationalCommands::StoreMessage { thread_id, resource_id, role, content } => {
            let message = app.observational.store_message(&thread_id, &resource_id, &role, &content).await?;
            format.print(&Line(format!("stored {}", message.id)))?;
        }
        ObservationalCommands::Messages { thread_id, resource_id, limit } => {
            let messages = app.observational.get_messages(&thread_id, &resource_id, limit).await?;
            format.print(&MessageListView(messages))?;
        }
        ObservationalCommands::TokenCount { thread_id, resource_id } => {
            let count = app.observational.get_message_token_count(&thread_id, &resource_id).await?;
            format.print(&Line(count.to_string()))?;
        }
        ObservationalCommands::Observations { resource_id, limit } => {
            let observations = app.observational.get_observations(&resource_id, limit).await?;
            format.print(&ObservationListView(observations))?;
        }
        ObservationalCommands::CompressNow { thread_id, resource_id } => match app
            .observational
            .compress_now(&thread_id, &resource_id)
            .await?
        {
            Some(observation) => format.print(&ObservationView(observation))?,
            None => format.print(&Line("threshold not met, no observation produced".to_string()))?,
        },
        ObservationalCommands::ReflectNow { resource_id } => match app.observational.reflect_now(&resource_id).await? {
            Some(reflection) => {
                format.print(&Line(format!("{} [{:?}] {}", reflection.id, reflection.pattern_tag, reflection.content)))?;
            }
            None => format.print(&Line("threshold not met, no reflection produced".to_string()))?,
        },
    }
    Ok(())
}
