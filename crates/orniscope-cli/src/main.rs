use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

#[derive(Parser)]
#[command(name = "orniscope")]
#[command(about = "Orniscope CLI - replay entity populations through a dashboard session", long_about = None)]
struct Cli {
    /// Settings file (defaults to ~/.config/orniscope/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a population and an event log through one session
    Replay(commands::replay::ReplayArgs),
    /// List the entity types of a population
    Types {
        /// Population fixture (JSON)
        population: PathBuf,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "orniscope=info,orniscope_core=info,orniscope_application=info,orniscope_infrastructure=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout carries the diffs.
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let settings = commands::load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Replay(args) => commands::replay::run(args, settings).await?,
        Commands::Types { population } => commands::types::run(&population, settings).await?,
    }

    Ok(())
}
