use clap::{CommandFactory, Parser, Subcommand};
use memory_cli::app::App;
use memory_cli::cli_config::CliConfig;
use memory_cli::commands::{core_memory, health, observational, orientation, skills, strategic, tool_surface, topics};
use memory_cli::output::OutputFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "memory-cli")]
#[command(about = "Command-line interface for the agentic long-term memory engine")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Strategic principle store
    #[command(alias = "st")]
    Strategic {
        #[command(subcommand)]
        command: strategic::StrategicCommands,
    },
    /// Skill library
    #[command(alias = "sk")]
    Skills {
        #[command(subcommand)]
        command: skills::SkillCommands,
    },
    /// Topic clustering
    #[command(alias = "tp")]
    Topics {
        #[command(subcommand)]
        command: topics::TopicCommands,
    },
    /// Three-tier observational pipeline
    #[command(alias = "ob")]
    Observational {
        #[command(subcommand)]
        command: observational::ObservationalCommands,
    },
    /// User/project core memory
    #[command(alias = "cm")]
    CoreMemory {
        #[command(subcommand)]
        command: core_memory::CoreMemoryCommands,
    },
    /// Orientation/wake-up context assembly
    #[command(alias = "or")]
    Orientation {
        #[command(subcommand)]
        command: orientation::OrientationCommands,
    },
    /// LLM tool-call surface
    #[command(alias = "tool")]
    ToolSurface {
        #[command(subcommand)]
        command: tool_surface::ToolCommands,
    },
    /// Storage health and diagnostics
    #[command(alias = "hp")]
    Health {
        #[command(subcommand)]
        command: health::HealthCommands,
    },
    /// Generate shell completion scripts
    #[command(alias = "comp")]
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();
    } else {
        tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
    }

    if let Commands::Completion { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "memory-cli", &mut std::io::stdout());
        return Ok(());
    }

    let config = CliConfig::load(cli.config.as_deref())?;
    let app = App::open(&config).await?;

    match cli.command {
        Commands::Strategic { command } => strategic::execute(&app, command, cli.format).await,
        Commands::Skills { command } => skills::execute(&app, command, cli.format).await,
        Commands::Topics { command } => topics::execute(&app, command, cli.format).await,
        Commands::Observational { command } => observational::execute(&app, command, cli.format).await,
        Commands::CoreMemory { command } => core_memory::execute(&app, command, cli.format).await,
        Commands::Orientation { command } => orientation::execute(&app, command, cli.format).await,
        Commands::ToolSurface { command } => tool_surface::execute(&app, command, cli.format).await,
        Commands::Health { command } => health::execute(&app, command, cli.format).await,
        Commands::Completion { .. } => unreachable!("handled above"),
    }
}
