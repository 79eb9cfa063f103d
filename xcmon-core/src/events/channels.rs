//! Event channel factories and handles.

use tokio::sync::mpsc;
use xcmon_sdk::objects::{XcmEvent, XcmNotification};

/// Default buffer size for event channels.
///
/// Enough to absorb bursts from the watchers while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for watcher events.
pub type XcmEventSender = mpsc::Sender<XcmEvent>;
/// Receiver handle for watcher events.
pub type XcmEventReceiver = mpsc::Receiver<XcmEvent>;

/// Sender handle for notifications; this is what the engine holds as its sink.
pub type NotificationSender = mpsc::Sender<XcmNotification>;
/// Receiver handle for notifications.
pub type NotificationReceiver = mpsc::Receiver<XcmNotification>;

/// Create a new watcher event channel.
///
/// Every watched chain gets a clone of the sender; the matching engine owns
/// the receiver.
pub fn xcm_event_channel() -> (XcmEventSender, XcmEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create a new notification channel with the given capacity.
///
/// A zero capacity falls back to [`DEFAULT_CHANNEL_BUFFER`].
pub fn notification_channel(buffer: usize) -> (NotificationSender, NotificationReceiver) {
    let buffer = if buffer == 0 {
        DEFAULT_CHANNEL_BUFFER
    } else {
        buffer
    };
    mpsc::channel(buffer)
}
