pub mod admin;
pub mod chain;
pub mod journey;
pub mod messages;
pub mod notification;

pub use chain::{ChainId, Outcome};
pub use journey::{Destination, Leg, LegType, Legs, Waypoint};
pub use messages::{XcmEvent, XcmReceived, XcmRelayed, XcmSent, message_identity};
pub use notification::{NotificationKind, XcmNotification};
