//! xcmon server
//!
//! Reconstructs cross-chain message journeys from watcher events. Events are
//! read as NDJSON from stdin, notifications are written as NDJSON to stdout,
//! and logs go to stderr.

mod admin;
mod config;
mod ingest;
mod output;
mod shutdown;
mod state;

use admin::{PendingCommand, TasksCommand};
use clap::{Parser, Subcommand};
use config::ConfigLoader;
use config::runtime::SharedConfig;
use output::NotificationWriter;
use shutdown::{shutdown_signal, spawn_config_reload_handler};
use state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use xcmon_core::events::{notification_channel, xcm_event_channel};
use xcmon_core::processors::MatchingEngine;

/// xcmon - cross-chain message journey matcher
#[derive(Parser, Debug)]
#[command(name = "xcmon-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "XCMON_CONFIG", default_value = "./xcmon-config.toml")]
    config: PathBuf,

    /// Override the store directory
    #[arg(short, long, env = "XCMON_STORE_PATH")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match events from stdin until EOF or a shutdown signal (default)
    Run,
    /// Inspect or delete pending entries (daemon must be stopped)
    Pending {
        #[command(subcommand)]
        action: PendingCommand,
    },
    /// Inspect or delete scheduled tasks (daemon must be stopped)
    Tasks {
        #[command(subcommand)]
        action: TasksCommand,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.store));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;
    tracing::debug!(path = %config_loader.config_path().display(), "Configuration loaded");
    let shared_config = loaded_config.into_shared();

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(shared_config, config_loader).await,
        Command::Pending { action } => admin::pending(shared_config, action).await,
        Command::Tasks { action } => admin::tasks(shared_config, action).await,
    }
}

async fn run(config: SharedConfig, config_loader: Arc<ConfigLoader>) -> anyhow::Result<()> {
    tracing::info!("Starting xcmon-server v{}", env!("CARGO_PKG_VERSION"));

    // Notification output
    let buffer = config.matching.get().notification_buffer;
    let (notification_tx, notification_rx) = notification_channel(buffer);
    let writer_handle = tokio::spawn(NotificationWriter::new(tokio::io::stdout()).run(notification_rx));

    // Store, scheduler, janitor and engine
    tracing::info!(path = %config.store.path.display(), "Opening store");
    let (engine, scheduler) = MatchingEngine::build(&config, Arc::new(notification_tx))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to open store");
            e
        })?;
    let state = AppState::new(config, engine, scheduler);
    state.scheduler.start().await?;

    // Spawn config reload handler (listens for SIGHUP)
    let reload_notify = spawn_config_reload_handler(state.config.clone(), config_loader)?;

    // Ingest -> engine
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (event_tx, event_rx) = xcm_event_channel();
    let engine = Arc::clone(&state.engine);
    let engine_rx = shutdown_rx.clone();
    let engine_handle = tokio::spawn(async move { engine.run(engine_rx, event_rx).await });
    let mut ingest_handle = tokio::spawn(ingest::run(
        BufReader::new(tokio::io::stdin()),
        event_tx,
        shutdown_rx,
    ));

    let finished = tokio::select! {
        result = &mut ingest_handle => Some(result),
        signal = shutdown_signal() => {
            signal?;
            None
        }
    };
    let ingest_result = match finished {
        Some(result) => result,
        None => {
            let _ = shutdown_tx.send(true);
            ingest_handle.await
        }
    };
    match ingest_result {
        Ok(Ok(stats)) => tracing::info!(
            accepted = stats.accepted,
            malformed = stats.malformed,
            "Ingest finished"
        ),
        Ok(Err(e)) => tracing::error!(error = %e, "Failed to read input"),
        Err(e) => tracing::error!(error = %e, "Ingest task ended abnormally"),
    }

    // On EOF the engine drains the queue first; on a signal it stops right away.
    if let Err(e) = engine_handle.await {
        tracing::error!(error = %e, "Matching engine task ended abnormally");
    }
    state.scheduler.stop().await;
    reload_notify.notify_one();

    // Dropping the engine closes the notification channel.
    drop(state);
    let written = writer_handle.await?;
    tracing::info!(written, "Server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
///
/// Logs go to stderr; stdout carries notifications.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sled=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
