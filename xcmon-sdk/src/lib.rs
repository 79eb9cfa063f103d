//! Wire objects shared between xcmon and the systems around it.
//!
//! Chain watchers produce [`objects::XcmEvent`]s, the matching engine
//! produces [`objects::XcmNotification`]s, and operators read the
//! [`objects::admin`] views. Nothing in this crate performs I/O.

pub mod objects;
