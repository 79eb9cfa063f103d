//! Events produced by the chain watchers.
//!
//! A watcher emits [`XcmSent`] when a message leaves a chain, [`XcmReceived`]
//! when it is executed on a chain, and [`XcmRelayed`] when it is seen passing
//! through a relay chain on its way. The three arrive independently and in
//! any order; matching them up is the engine's job.

use serde::{Deserialize, Serialize};

use super::chain::{ChainId, Outcome};
use super::journey::{Destination, Leg, Legs, Waypoint};

/// Picks the identity used for correlation: the topic id when present,
/// otherwise the message hash. Empty strings count as absent.
pub fn message_identity<'a>(message_id: Option<&'a str>, message_hash: &'a str) -> Option<&'a str> {
    message_id
        .filter(|id| !id.is_empty())
        .or_else(|| Some(message_hash).filter(|hash| !hash.is_empty()))
}

/// Outbound event: a message left `waypoint.chain_id` heading for the
/// current leg's `to` chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XcmSent {
    pub subscription_id: String,
    pub message_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub legs: Legs,
    pub leg_index: usize,
    #[serde(default)]
    pub sender: serde_json::Value,
    /// Where the journey started.
    pub origin: Waypoint,
    /// Where this leg started.
    pub waypoint: Waypoint,
    pub destination: Destination,
}

impl XcmSent {
    pub fn identity(&self) -> Option<&str> {
        message_identity(self.message_id.as_deref(), &self.message_hash)
    }

    /// The leg this event is about, if `leg_index` is in range.
    pub fn current_leg(&self) -> Option<&Leg> {
        self.legs.get(self.leg_index)
    }

    pub fn is_last_leg(&self) -> bool {
        self.leg_index + 1 >= self.legs.len()
    }
}

/// Inbound event: a message was executed on `chain_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XcmReceived {
    pub subscription_id: String,
    pub message_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub chain_id: ChainId,
    pub block_hash: String,
    pub block_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_trapped: Option<serde_json::Value>,
    #[serde(default)]
    pub event: serde_json::Value,
}

impl XcmReceived {
    pub fn identity(&self) -> Option<&str> {
        message_identity(self.message_id.as_deref(), &self.message_hash)
    }

    pub fn waypoint(&self) -> Waypoint {
        Waypoint {
            chain_id: self.chain_id.clone(),
            block_hash: self.block_hash.clone(),
            block_number: self.block_number,
            timestamp: self.timestamp,
            outcome: self.outcome,
            error: self.error.clone(),
            event: self.event.clone(),
        }
    }
}

/// A message observed on the relay chain of a relayed leg.
///
/// Marks progress only; the journey still waits for its [`XcmReceived`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XcmRelayed {
    pub subscription_id: String,
    pub message_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// The relay chain the message was seen on.
    pub chain_id: ChainId,
    /// The chain the relayed leg is heading to.
    pub recipient: ChainId,
    pub leg_index: usize,
    pub block_hash: String,
    pub block_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub event: serde_json::Value,
}

impl XcmRelayed {
    pub fn identity(&self) -> Option<&str> {
        message_identity(self.message_id.as_deref(), &self.message_hash)
    }

    pub fn waypoint(&self) -> Waypoint {
        Waypoint {
            chain_id: self.chain_id.clone(),
            block_hash: self.block_hash.clone(),
            block_number: self.block_number,
            timestamp: self.timestamp,
            outcome: self.outcome,
            error: self.error.clone(),
            event: self.event.clone(),
        }
    }
}

/// Envelope used to feed watcher output into the matcher as one stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum XcmEvent {
    #[serde(rename = "xcm.sent")]
    Sent(XcmSent),
    #[serde(rename = "xcm.received")]
    Received(XcmReceived),
    #[serde(rename = "xcm.relayed")]
    Relayed(XcmRelayed),
}

impl XcmEvent {
    pub fn subscription_id(&self) -> &str {
        match self {
            XcmEvent::Sent(msg) => &msg.subscription_id,
            XcmEvent::Received(msg) => &msg.subscription_id,
            XcmEvent::Relayed(msg) => &msg.subscription_id,
        }
    }

    pub fn message_hash(&self) -> &str {
        match self {
            XcmEvent::Sent(msg) => &msg.message_hash,
            XcmEvent::Received(msg) => &msg.message_hash,
            XcmEvent::Relayed(msg) => &msg.message_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_prefers_message_id() {
        assert_eq!(message_identity(Some("0xid"), "0xhash"), Some("0xid"));
        assert_eq!(message_identity(None, "0xhash"), Some("0xhash"));
        assert_eq!(message_identity(Some(""), "0xhash"), Some("0xhash"));
        assert_eq!(message_identity(Some(""), ""), None);
        assert_eq!(message_identity(None, ""), None);
    }

    #[test]
    fn test_tagged_event_parsing() {
        let line = r#"{
            "type": "xcm.received",
            "subscriptionId": "sub-1",
            "messageHash": "0xhash",
            "chainId": "urn:ocn:polkadot:2034",
            "blockHash": "0xblock",
            "blockNumber": 42,
            "outcome": "Success"
        }"#;
        let event: XcmEvent = serde_json::from_str(line).unwrap();
        let XcmEvent::Received(received) = event else {
            panic!("expected a received event");
        };
        assert_eq!(received.identity(), Some("0xhash"));
        assert_eq!(received.waypoint().block_number, 42);
        assert!(received.assets_trapped.is_none());
    }

    #[test]
    fn test_leg_position() {
        let sent_json = r#"{
            "subscriptionId": "sub-1",
            "messageHash": "0xhash",
            "messageId": "0xtopic",
            "legs": [
                {"from": "urn:ocn:polkadot:1000", "to": "urn:ocn:polkadot:0", "type": "vmp"},
                {"from": "urn:ocn:polkadot:0", "to": "urn:ocn:polkadot:2034", "type": "vmp"}
            ],
            "legIndex": 0,
            "origin": {"chainId": "urn:ocn:polkadot:1000", "blockHash": "0x01", "blockNumber": 1, "outcome": "Success"},
            "waypoint": {"chainId": "urn:ocn:polkadot:1000", "blockHash": "0x01", "blockNumber": 1, "outcome": "Success"},
            "destination": {"chainId": "urn:ocn:polkadot:2034"}
        }"#;
        let mut sent: XcmSent = serde_json::from_str(sent_json).unwrap();
        assert_eq!(sent.identity(), Some("0xtopic"));
        assert_eq!(sent.current_leg().map(|l| l.to.as_str()), Some("urn:ocn:polkadot:0"));
        assert!(!sent.is_last_leg());

        sent.leg_index = 1;
        assert!(sent.is_last_leg());

        sent.leg_index = 2;
        assert!(sent.current_leg().is_none());
    }
}
