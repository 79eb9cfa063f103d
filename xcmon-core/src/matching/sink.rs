//! Where completed matches go.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use xcmon_sdk::objects::XcmNotification;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("notification receiver closed")]
    Closed,
}

/// Receives one notification per resolved leg.
///
/// The engine holds exactly one sink; fan-out, if any, belongs behind it.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: XcmNotification) -> Result<(), SinkError>;
}

#[async_trait]
impl NotificationSink for mpsc::Sender<XcmNotification> {
    async fn notify(&self, notification: XcmNotification) -> Result<(), SinkError> {
        self.send(notification).await.map_err(|_| SinkError::Closed)
    }
}
