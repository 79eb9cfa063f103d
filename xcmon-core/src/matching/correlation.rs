//! Correlation keys.
//!
//! The same message identity can fan out to several destinations, so the key
//! pairs the identity with the chain the message is next expected on.

use xcmon_sdk::objects::ChainId;

/// `base64(sha256(identity)):{chain}`, base64 being RFC 4648 without padding.
pub fn correlation_key(identity: &str, next_hop: &ChainId) -> String {
    let digest = ring::digest::digest(&ring::digest::SHA256, identity.as_bytes());
    format!(
        "{}:{}",
        fast32::base64::RFC4648_NOPAD.encode(digest.as_ref()),
        next_hop
    )
}

/// Store key of a pending entry: `{subscription}:{correlation}`.
pub fn pending_key(subscription_id: &str, correlation_key: &str) -> String {
    format!("{subscription_id}:{correlation_key}")
}

/// Prefix shared by every pending key of one subscription.
pub fn subscription_prefix(subscription_id: &str) -> String {
    format!("{subscription_id}:")
}

/// Subscription ids are used as key prefixes, so they must be non-empty and
/// free of the separator.
pub fn is_valid_subscription_id(subscription_id: &str) -> bool {
    !subscription_id.is_empty() && !subscription_id.contains(':')
}
