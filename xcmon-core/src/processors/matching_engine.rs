//! MatchingEngine processor.
//!
//! The MatchingEngine is responsible for:
//! - Receiving `XcmSent`, `XcmReceived` and `XcmRelayed` from the watchers,
//!   in any order and concurrently
//! - Pairing each side with its counterpart under a per-key lock, so every
//!   leg resolves exactly once
//! - Persisting unmatched sides with a janitor expiry task
//! - Emitting one `XcmNotification` per resolved leg through the sink
//!
//! Keys are `{subscriptionId}:{correlationKey}`; outbound legs are keyed by
//! the leg's destination, inbound and relay observations by the chain they
//! were seen on (or heading to), so both sides land on the same key.

use crate::config::SharedConfig;
use crate::entities::{PendingNamespace, PendingRecord};
use crate::events::XcmEventReceiver;
use crate::matching::{
    KeyedLock, NotificationSink, PendingStore, correlation_key, is_valid_subscription_id,
    pending_key,
};
use crate::processors::janitor::{Janitor, JanitorTask};
use crate::processors::scheduler::{Scheduler, SchedulerError};
use crate::store::{Store, StoreError};
use kanau::processor::Processor;
use serde::Serialize;
use serde::de::DeserializeOwned;
use smallvec::SmallVec;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{RwLock, watch};
use tracing::{debug, error, info, warn};
use xcmon_sdk::objects::{
    NotificationKind, XcmEvent, XcmNotification, XcmReceived, XcmRelayed, XcmSent,
};

#[derive(Debug, Error)]
pub enum MatchingError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("invalid subscription id: {0:?}")]
    InvalidSubscription(String),
    #[error("matching engine is stopped")]
    Stopped,
}

/// Why an event was dropped without touching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Neither `messageId` nor `messageHash` is set.
    MissingIdentity,
    /// Empty or containing `:`.
    InvalidSubscription,
    /// `legIndex` points past `legs`.
    InvalidLeg,
    Stopped,
}

/// What an `on*` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The counterpart was pending; a notification was emitted.
    Matched,
    /// Nothing to match yet; the event is now pending.
    Pending,
    /// A relay observation met its outbound leg.
    Relayed,
    Rejected(RejectReason),
}

type Notifications = SmallVec<[XcmNotification; 2]>;

/// Correlates outbound and inbound events into journeys.
pub struct MatchingEngine {
    store: Store,
    pending: PendingStore,
    janitor: Janitor,
    locks: KeyedLock,
    sink: Arc<dyn NotificationSink>,
    /// Readers are in-flight calls; `stop` takes the write side.
    stopped: RwLock<bool>,
}

impl MatchingEngine {
    pub fn new(
        store: Store,
        janitor: Janitor,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            pending: PendingStore::open(&store)?,
            store,
            janitor,
            locks: KeyedLock::new(),
            sink,
            stopped: RwLock::new(false),
        })
    }

    /// Wires store, scheduler, janitor and engine together from `config`.
    ///
    /// The scheduler is returned unstarted.
    pub async fn build(
        config: &SharedConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<(Self, Scheduler), StoreError> {
        let store = Store::open(&config.store)?;
        let scheduler = Scheduler::new(&store, config.scheduler.clone())?;
        let janitor = Janitor::new(store.clone(), scheduler.clone(), config.janitor.clone()).await;
        let engine = Self::new(store, janitor, sink)?;
        Ok((engine, scheduler))
    }

    pub fn pending(&self) -> &PendingStore {
        &self.pending
    }

    pub fn janitor(&self) -> &Janitor {
        &self.janitor
    }

    /// An outbound leg left its chain.
    pub async fn on_outbound_message(&self, msg: XcmSent) -> Result<MatchOutcome, MatchingError> {
        let stopped = self.stopped.read().await;
        if *stopped {
            return Ok(self.reject(RejectReason::Stopped, "xcm.sent", &msg.message_hash));
        }
        let Some(identity) = msg.identity() else {
            return Ok(self.reject(RejectReason::MissingIdentity, "xcm.sent", &msg.message_hash));
        };
        if !is_valid_subscription_id(&msg.subscription_id) {
            return Ok(self.reject(
                RejectReason::InvalidSubscription,
                "xcm.sent",
                &msg.message_hash,
            ));
        }
        let Some(leg) = msg.current_leg() else {
            return Ok(self.reject(RejectReason::InvalidLeg, "xcm.sent", &msg.message_hash));
        };
        let key = pending_key(&msg.subscription_id, &correlation_key(identity, &leg.to));

        let mut notifications = Notifications::new();
        let outcome = {
            let _guard = self.locks.lock(&key).await;

            // Both counterparts are read and decoded before anything is removed.
            let inbound = self
                .pending
                .peek::<XcmReceived>(PendingNamespace::AwaitingOrigin, &key)?;
            let relayed = self
                .pending
                .peek::<XcmRelayed>(PendingNamespace::Relayed, &key)?;

            if let Some(relayed) = &relayed {
                notifications.push(XcmNotification::from_sent(
                    NotificationKind::Relayed,
                    &msg,
                    relayed.message.waypoint(),
                    None,
                ));
            }

            let outcome = match inbound {
                Some(inbound) => {
                    self.pending.delete_both(
                        PendingNamespace::AwaitingOrigin,
                        PendingNamespace::Relayed,
                        &key,
                    )?;
                    self.cancel_expiry(&inbound.expiry_task).await;
                    notifications.push(XcmNotification::from_sent(
                        leg_kind(&msg),
                        &msg,
                        inbound.message.waypoint(),
                        inbound.message.assets_trapped.clone(),
                    ));
                    MatchOutcome::Matched
                }
                None => {
                    self.persist(PendingNamespace::AwaitingDestination, &key, msg)
                        .await?;
                    if relayed.is_some() {
                        self.pending
                            .sublevel(PendingNamespace::Relayed)
                            .delete(&key)?;
                    }
                    MatchOutcome::Pending
                }
            };
            if let Some(relayed) = &relayed {
                self.cancel_expiry(&relayed.expiry_task).await;
            }
            outcome
        };

        debug!(%key, ?outcome, "Outbound message handled");
        self.emit(notifications).await;
        Ok(outcome)
    }

    /// A message was executed on `msg.chain_id`.
    pub async fn on_inbound_message(
        &self,
        msg: XcmReceived,
    ) -> Result<MatchOutcome, MatchingError> {
        let stopped = self.stopped.read().await;
        if *stopped {
            return Ok(self.reject(RejectReason::Stopped, "xcm.received", &msg.message_hash));
        }
        let Some(identity) = msg.identity() else {
            return Ok(self.reject(
                RejectReason::MissingIdentity,
                "xcm.received",
                &msg.message_hash,
            ));
        };
        if !is_valid_subscription_id(&msg.subscription_id) {
            return Ok(self.reject(
                RejectReason::InvalidSubscription,
                "xcm.received",
                &msg.message_hash,
            ));
        }
        let key = pending_key(&msg.subscription_id, &correlation_key(identity, &msg.chain_id));

        let mut notifications = Notifications::new();
        let outcome = {
            let _guard = self.locks.lock(&key).await;

            match self
                .pending
                .take::<XcmSent>(PendingNamespace::AwaitingDestination, &key)?
            {
                Some(outbound) => {
                    self.cancel_expiry(&outbound.expiry_task).await;
                    notifications.push(XcmNotification::from_sent(
                        leg_kind(&outbound.message),
                        &outbound.message,
                        msg.waypoint(),
                        msg.assets_trapped.clone(),
                    ));
                    MatchOutcome::Matched
                }
                None => {
                    self.persist(PendingNamespace::AwaitingOrigin, &key, msg)
                        .await?;
                    MatchOutcome::Pending
                }
            }
        };

        debug!(%key, ?outcome, "Inbound message handled");
        self.emit(notifications).await;
        Ok(outcome)
    }

    /// A message passed through the relay chain of a relayed leg.
    ///
    /// Never resolves the leg; the outbound entry stays pending until its
    /// inbound counterpart arrives.
    pub async fn on_relayed_message(
        &self,
        msg: XcmRelayed,
    ) -> Result<MatchOutcome, MatchingError> {
        let stopped = self.stopped.read().await;
        if *stopped {
            return Ok(self.reject(RejectReason::Stopped, "xcm.relayed", &msg.message_hash));
        }
        let Some(identity) = msg.identity() else {
            return Ok(self.reject(
                RejectReason::MissingIdentity,
                "xcm.relayed",
                &msg.message_hash,
            ));
        };
        if !is_valid_subscription_id(&msg.subscription_id) {
            return Ok(self.reject(
                RejectReason::InvalidSubscription,
                "xcm.relayed",
                &msg.message_hash,
            ));
        }
        let key = pending_key(&msg.subscription_id, &correlation_key(identity, &msg.recipient));

        let mut notifications = Notifications::new();
        let outcome = {
            let _guard = self.locks.lock(&key).await;

            match self
                .pending
                .peek::<XcmSent>(PendingNamespace::AwaitingDestination, &key)?
            {
                Some(outbound) => {
                    notifications.push(XcmNotification::from_sent(
                        NotificationKind::Relayed,
                        &outbound.message,
                        msg.waypoint(),
                        None,
                    ));
                    MatchOutcome::Relayed
                }
                None => {
                    self.persist(PendingNamespace::Relayed, &key, msg).await?;
                    MatchOutcome::Pending
                }
            }
        };

        debug!(%key, ?outcome, "Relayed message handled");
        self.emit(notifications).await;
        Ok(outcome)
    }

    /// Deletes every pending entry of a subscription and cancels their
    /// expiry tasks. Returns how many entries were removed.
    pub async fn clear_pending_states(&self, subscription_id: &str) -> Result<usize, MatchingError> {
        let stopped = self.stopped.read().await;
        if *stopped {
            return Err(MatchingError::Stopped);
        }
        if !is_valid_subscription_id(subscription_id) {
            return Err(MatchingError::InvalidSubscription(
                subscription_id.to_owned(),
            ));
        }

        let mut removed = 0;
        for (namespace, key) in self.pending.subscription_keys(subscription_id)? {
            let record = {
                let _guard = self.locks.lock(&key).await;
                self.pending
                    .take::<serde_json::Value>(namespace, &key)?
            };
            if let Some(record) = record {
                self.cancel_expiry(&record.expiry_task).await;
                removed += 1;
            }
        }

        info!(%subscription_id, removed, "Cleared pending states");
        Ok(removed)
    }

    /// Waits for in-flight calls, refuses new ones and flushes the store.
    pub async fn stop(&self) -> Result<(), MatchingError> {
        {
            let mut stopped = self.stopped.write().await;
            if *stopped {
                return Ok(());
            }
            *stopped = true;
        }
        let flushed = self.store.flush().await?;
        info!(flushed, "Matching engine stopped");
        Ok(())
    }

    /// Feeds events from `event_rx` into the engine until shutdown, then
    /// stops the engine.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>, mut event_rx: XcmEventReceiver) {
        info!("MatchingEngine started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("MatchingEngine received shutdown signal");
                        break;
                    }
                }

                Some(event) = event_rx.recv() => {
                    let subscription_id = event.subscription_id().to_owned();
                    let message_hash = event.message_hash().to_owned();
                    if let Err(e) = self.process(event).await {
                        error!(
                            %subscription_id,
                            %message_hash,
                            error = %e,
                            "Failed to process XCM event"
                        );
                    }
                }

                else => {
                    info!("XCM event channel closed");
                    break;
                }
            }
        }

        if let Err(e) = self.stop().await {
            error!(error = %e, "Failed to stop matching engine cleanly");
        }
        info!("MatchingEngine shutdown complete");
    }

    // -- Private helpers ----------------------------------------------------

    /// Stores `message` under `key` with a fresh expiry task.
    ///
    /// An entry already under `key` is replaced and its task cancelled, so
    /// each entry keeps exactly one expiry task.
    async fn persist<T: Serialize + DeserializeOwned>(
        &self,
        namespace: PendingNamespace,
        key: &str,
        message: T,
    ) -> Result<(), MatchingError> {
        let task_keys = self
            .janitor
            .schedule(vec![JanitorTask::new(namespace.as_str(), key)])
            .await?;
        let task_key = task_keys.into_iter().next().unwrap_or_default();

        let record = PendingRecord::new(message, task_key.clone());
        match self.pending.put(namespace, key, &record) {
            Ok(Some(previous)) => {
                warn!(%namespace, %key, "Pending entry replaced by a redelivered event");
                self.cancel_expiry(&previous.expiry_task).await;
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                self.cancel_expiry(&task_key).await;
                Err(e.into())
            }
        }
    }

    async fn cancel_expiry(&self, task_key: &str) {
        match self.janitor.cancel(task_key).await {
            Ok(true) => {}
            Ok(false) => debug!(%task_key, "Expiry task already gone"),
            Err(e) => warn!(%task_key, error = %e, "Failed to cancel expiry task"),
        }
    }

    async fn emit(&self, notifications: Notifications) {
        for notification in notifications {
            let kind = notification.kind;
            let message_hash = notification.message_hash.clone();
            if let Err(e) = self.sink.notify(notification).await {
                error!(%kind, %message_hash, error = %e, "Failed to emit notification");
            }
        }
    }

    fn reject(&self, reason: RejectReason, event: &str, message_hash: &str) -> MatchOutcome {
        warn!(?reason, %event, %message_hash, "Rejected XCM event");
        MatchOutcome::Rejected(reason)
    }
}

/// `Received` for the final leg, `Hop` for the ones before it.
fn leg_kind(sent: &XcmSent) -> NotificationKind {
    if sent.is_last_leg() {
        NotificationKind::Received
    } else {
        NotificationKind::Hop
    }
}

// ---------------------------------------------------------------------------
// Processor trait implementation
// ---------------------------------------------------------------------------

impl Processor<XcmEvent> for MatchingEngine {
    type Output = MatchOutcome;
    type Error = MatchingError;

    async fn process(&self, event: XcmEvent) -> Result<MatchOutcome, MatchingError> {
        match event {
            XcmEvent::Sent(msg) => self.on_outbound_message(msg).await,
            XcmEvent::Received(msg) => self.on_inbound_message(msg).await,
            XcmEvent::Relayed(msg) => self.on_relayed_message(msg).await,
        }
    }
}
