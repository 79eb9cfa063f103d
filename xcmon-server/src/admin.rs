//! Offline administrative commands.
//!
//! These open the store directly, so they must run while no daemon holds it.
//! Results are printed to stdout as JSON lines.

use crate::config::runtime::SharedConfig;
use anyhow::Context;
use clap::Subcommand;
use kanau::processor::Processor;
use serde::Serialize;
use std::sync::Arc;
use xcmon_core::entities::PendingNamespace;
use xcmon_core::entities::pending::{DeletePendingEntry, ListPendingEntries};
use xcmon_core::entities::scheduled_task::{DeleteScheduledTask, ListScheduledTasks};
use xcmon_core::events::notification_channel;
use xcmon_core::framework::StoreProcessor;
use xcmon_core::processors::MatchingEngine;
use xcmon_core::store::Store;
use xcmon_sdk::objects::admin::DEFAULT_LIMIT;

#[derive(Subcommand, Debug)]
pub enum PendingCommand {
    /// List entries of a pending namespace
    List {
        /// awaiting-destination, awaiting-origin or relayed
        namespace: PendingNamespace,
        /// Only entries of this subscription
        #[arg(short, long)]
        subscription: Option<String>,
        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
    /// Delete one entry and its expiry task
    Delete {
        namespace: PendingNamespace,
        key: String,
    },
    /// Delete every entry of a subscription
    Clear { subscription: String },
}

#[derive(Subcommand, Debug)]
pub enum TasksCommand {
    /// List scheduled tasks in due order
    List {
        /// Start after this task key
        #[arg(short, long)]
        after: Option<String>,
        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
    /// Remove one scheduled task
    Remove { key: String },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn open_processor(config: &SharedConfig) -> anyhow::Result<StoreProcessor> {
    let store = Store::open(&config.store)
        .with_context(|| format!("failed to open store at {}", config.store.path.display()))?;
    Ok(StoreProcessor::new(store))
}

pub async fn pending(config: SharedConfig, command: PendingCommand) -> anyhow::Result<()> {
    match command {
        PendingCommand::List {
            namespace,
            subscription,
            limit,
        } => {
            let processor = open_processor(&config)?;
            let entries = processor
                .process(ListPendingEntries {
                    namespace,
                    subscription_id: subscription,
                    limit,
                })
                .await?;
            for entry in &entries {
                print_json(entry)?;
            }
        }
        PendingCommand::Delete { namespace, key } => {
            let processor = open_processor(&config)?;
            let deleted = processor
                .process(DeletePendingEntry {
                    namespace,
                    key: key.clone(),
                })
                .await?;
            processor.store.flush().await?;
            print_json(&serde_json::json!({ "key": key, "deleted": deleted }))?;
        }
        PendingCommand::Clear { subscription } => {
            // Notifications are never produced by a clear.
            let (tx, _rx) = notification_channel(1);
            let (engine, _scheduler) = MatchingEngine::build(&config, Arc::new(tx))
                .await
                .context("failed to open store")?;
            let removed = engine.clear_pending_states(&subscription).await?;
            engine.stop().await?;
            print_json(&serde_json::json!({ "subscriptionId": subscription, "removed": removed }))?;
        }
    }
    Ok(())
}

pub async fn tasks(config: SharedConfig, command: TasksCommand) -> anyhow::Result<()> {
    let processor = open_processor(&config)?;
    match command {
        TasksCommand::List { after, limit } => {
            let tasks = processor
                .process(ListScheduledTasks { after, limit })
                .await?;
            for task in &tasks {
                print_json(task)?;
            }
        }
        TasksCommand::Remove { key } => {
            let removed = processor
                .process(DeleteScheduledTask { key: key.clone() })
                .await?;
            processor.store.flush().await?;
            print_json(&serde_json::json!({ "key": key, "removed": removed }))?;
        }
    }
    Ok(())
}
