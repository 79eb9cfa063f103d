//! Signal handling for graceful shutdown and config reload.

use crate::config::ConfigLoader;
use crate::config::runtime::SharedConfig;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::Notify;

/// Completes when a shutdown signal is received.
///
/// Listens for SIGTERM and SIGINT (Ctrl+C).
pub async fn shutdown_signal() -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
    Ok(())
}

/// Spawns a task that listens for SIGHUP and reloads the configuration.
///
/// Scheduler frequency and janitor expiry apply on their next use. The store
/// path and the notification buffer are fixed for the life of the process.
///
/// Returns a Notify that stops the handler.
pub fn spawn_config_reload_handler(
    config: SharedConfig,
    config_loader: Arc<ConfigLoader>,
) -> std::io::Result<Arc<Notify>> {
    let mut sighup = signal(SignalKind::hangup())?;
    let shutdown_notify = Arc::new(Notify::new());
    let shutdown_notify_clone = shutdown_notify.clone();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sighup.recv() => {
                    tracing::info!("Received SIGHUP, reloading configuration");
                    match config_loader.reload() {
                        Ok(loaded) => {
                            if loaded.store != config.store {
                                tracing::warn!(
                                    path = %loaded.store.path.display(),
                                    "Store location changed, restart to apply"
                                );
                            }
                            config.scheduler.update(loaded.scheduler);
                            config.janitor.update(loaded.janitor);
                            config.matching.update(loaded.matching);
                            tracing::info!("Configuration reloaded successfully");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload configuration");
                        }
                    }
                }
                _ = shutdown_notify_clone.notified() => {
                    tracing::debug!("Config reload handler shutting down");
                    break;
                }
            }
        }
    });

    Ok(shutdown_notify)
}
