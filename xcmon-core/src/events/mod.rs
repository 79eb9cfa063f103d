//! Channels between the ingestion side, the matching engine and the
//! notification writer.
//!
//! # Event Flow
//!
//! 1. Watchers send `XcmEvent` -> `MatchingEngine`
//! 2. `MatchingEngine` sends `XcmNotification` -> notification writer
//! 3. `MatchingEngine` schedules expiry tasks -> `Scheduler` -> `Janitor`

pub mod channels;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, NotificationReceiver, NotificationSender, XcmEventReceiver,
    XcmEventSender, notification_channel, xcm_event_channel,
};
