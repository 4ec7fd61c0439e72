use super::{Replay, load_population};
use anyhow::{Context, Result};
use clap::Args;
use orniscope_application::Listener;
use orniscope_core::{DiffEvent, EngineSettings};
use orniscope_infrastructure::fixtures;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

const SESSION_ID: &str = "cli-replay";

#[derive(Args)]
pub struct ReplayArgs {
    /// Population fixture (JSON)
    pub population: PathBuf,

    /// Filter applied to the session (JSON)
    #[arg(long)]
    pub filter: Option<PathBuf>,

    /// Canonical diffs to publish, one JSON object per line
    #[arg(long)]
    pub events: Option<PathBuf>,

    /// Summary threshold for this session
    #[arg(long)]
    pub summary_limit: Option<i64>,

    /// Pretty-print each diff
    #[arg(long)]
    pub pretty: bool,
}

pub async fn run(args: ReplayArgs, settings: EngineSettings) -> Result<()> {
    let filter = match &args.filter {
        Some(path) => Some(
            fixtures::load_filter(path)
                .with_context(|| format!("Failed to read filter {}", path.display()))?,
        ),
        None => None,
    };
    let events = match &args.events {
        Some(path) => fixtures::load_event_log(path)
            .with_context(|| format!("Failed to read event log {}", path.display()))?,
        None => Vec::new(),
    };

    let listener_capacity = settings.listener_capacity;
    let replay = Replay::from_fixture(load_population(&args.population)?, settings);
    let session = replay.manager.attach(SESSION_ID).await;

    if let Some(limit) = args.summary_limit {
        session.set_summary_view_limit(limit).await?;
    }

    let snapshot = session.get_all(filter).await?;
    print_diff(&snapshot, args.pretty)?;

    let (listener, received) = Listener::channel(listener_capacity);
    session.subscribe(listener).await?;
    let printer = tokio::spawn(print_broadcasts(received, args.pretty));

    tracing::info!(events = events.len(), "[Replay] publishing event log");
    for event in events {
        replay.registry.publish(event.added, event.removed).await;
    }

    // Closing the stream lets the session handle every published diff
    // before it is torn down.
    replay.registry.close();
    replay.manager.detach_when_drained(SESSION_ID).await;

    let printed = printer.await.context("Printer task failed")??;
    tracing::info!(broadcasts = printed, "[Replay] finished");
    Ok(())
}

async fn print_broadcasts(mut received: mpsc::Receiver<Arc<DiffEvent>>, pretty: bool) -> Result<usize> {
    let mut printed = 0;
    while let Some(diff) = received.recv().await {
        print_diff(&diff, pretty)?;
        printed += 1;
    }
    Ok(printed)
}

fn print_diff(diff: &DiffEvent, pretty: bool) -> Result<()> {
    let line = if pretty {
        serde_json::to_string_pretty(diff)?
    } else {
        serde_json::to_string(diff)?
    };
    println!("{}", line);
    Ok(())
}
