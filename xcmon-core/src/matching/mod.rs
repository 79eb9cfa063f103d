//! Building blocks of the matching engine: correlation keys, per-key
//! locking, the pending keyspaces and the notification sink.
//!
//! The engine itself is [`crate::processors::MatchingEngine`].

pub mod correlation;
pub mod keyed_lock;
pub mod pending_store;
pub mod sink;

pub use correlation::{correlation_key, is_valid_subscription_id, pending_key};
pub use keyed_lock::KeyedLock;
pub use pending_store::PendingStore;
pub use sink::{NotificationSink, SinkError};
