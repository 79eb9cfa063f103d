//! Notification payloads pushed when a leg or journey resolves.

use serde::{Deserialize, Serialize};

use super::journey::{Destination, Legs, Waypoint};
use super::messages::XcmSent;

/// What kind of progress a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// An intermediate leg resolved; more legs follow.
    #[serde(rename = "xcm.hop")]
    Hop,
    /// The final leg resolved; the journey is complete.
    #[serde(rename = "xcm.received")]
    Received,
    /// An outbound leg was seen on its relay chain.
    #[serde(rename = "xcm.relayed")]
    Relayed,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Hop => write!(f, "xcm.hop"),
            NotificationKind::Received => write!(f, "xcm.received"),
            NotificationKind::Relayed => write!(f, "xcm.relayed"),
        }
    }
}

/// A merged outbound + counterpart observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XcmNotification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub subscription_id: String,
    pub message_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub sender: serde_json::Value,
    pub legs: Legs,
    pub leg_index: usize,
    pub origin: Waypoint,
    pub destination: Destination,
    /// The observation that completed the match.
    pub waypoint: Waypoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_trapped: Option<serde_json::Value>,
}

impl XcmNotification {
    /// Builds a notification from the outbound side and the observation that
    /// resolved it.
    pub fn from_sent(
        kind: NotificationKind,
        sent: &XcmSent,
        waypoint: Waypoint,
        assets_trapped: Option<serde_json::Value>,
    ) -> Self {
        Self {
            kind,
            subscription_id: sent.subscription_id.clone(),
            message_hash: sent.message_hash.clone(),
            message_id: sent.message_id.clone(),
            sender: sent.sender.clone(),
            legs: sent.legs.clone(),
            leg_index: sent.leg_index,
            origin: sent.origin.clone(),
            destination: sent.destination.clone(),
            waypoint,
            assets_trapped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::chain::{ChainId, Outcome};
    use crate::objects::journey::{Leg, LegType};
    use smallvec::smallvec;

    fn waypoint(chain: &str, block: u64) -> Waypoint {
        Waypoint {
            chain_id: ChainId::from(chain),
            block_hash: format!("0x{block:02x}"),
            block_number: block,
            timestamp: None,
            outcome: Outcome::Success,
            error: None,
            event: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_notification_carries_journey_context() {
        let sent = XcmSent {
            subscription_id: "sub-1".into(),
            message_hash: "0xhash".into(),
            message_id: None,
            legs: smallvec![Leg {
                from: ChainId::from("urn:ocn:polkadot:1000"),
                to: ChainId::from("urn:ocn:polkadot:2034"),
                leg_type: LegType::Hrmp,
                relay: None,
            }],
            leg_index: 0,
            sender: serde_json::json!({"signer": "alice"}),
            origin: waypoint("urn:ocn:polkadot:1000", 1),
            waypoint: waypoint("urn:ocn:polkadot:1000", 1),
            destination: Destination {
                chain_id: ChainId::from("urn:ocn:polkadot:2034"),
            },
        };
        let notification = XcmNotification::from_sent(
            NotificationKind::Received,
            &sent,
            waypoint("urn:ocn:polkadot:2034", 9),
            None,
        );
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["type"], "xcm.received");
        assert_eq!(json["subscriptionId"], "sub-1");
        assert_eq!(json["waypoint"]["blockNumber"], 9);
        assert_eq!(json["origin"]["blockNumber"], 1);
        assert!(json.get("messageId").is_none());
        assert!(json.get("assetsTrapped").is_none());
    }
}
