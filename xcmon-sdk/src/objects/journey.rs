//! Journey building blocks: where a message was seen and which hops it takes.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::chain::{ChainId, Outcome};

/// A point where a message was observed on a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub chain_id: ChainId,
    pub block_hash: String,
    pub block_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The raw chain event, opaque to the matcher.
    #[serde(default)]
    pub event: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Transport used by a single hop.
pub enum LegType {
    /// Horizontal message between two parachains.
    Hrmp,
    /// Vertical message between a relay chain and one of its parachains.
    Vmp,
    /// Horizontal message routed through the relay chain.
    Relay,
}

/// One hop of a planned journey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub from: ChainId,
    pub to: ChainId,
    #[serde(rename = "type")]
    pub leg_type: LegType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay: Option<ChainId>,
}

/// Most journeys have one or two legs.
pub type Legs = SmallVec<[Leg; 4]>;

/// The chain a journey is ultimately heading to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub chain_id: ChainId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leg_wire_format() {
        let json = r#"{"from":"urn:ocn:polkadot:1000","to":"urn:ocn:polkadot:2034","type":"relay","relay":"urn:ocn:polkadot:0"}"#;
        let leg: Leg = serde_json::from_str(json).unwrap();
        assert_eq!(leg.leg_type, LegType::Relay);
        assert_eq!(leg.relay, Some(ChainId::from("urn:ocn:polkadot:0")));
        assert_eq!(serde_json::to_string(&leg).unwrap(), json);
    }

    #[test]
    fn test_waypoint_optional_fields_default() {
        let json = r#"{"chainId":"urn:ocn:polkadot:0","blockHash":"0xab","blockNumber":7,"outcome":"Fail"}"#;
        let waypoint: Waypoint = serde_json::from_str(json).unwrap();
        assert_eq!(waypoint.outcome, Outcome::Fail);
        assert!(waypoint.timestamp.is_none());
        assert!(waypoint.error.is_none());
        assert!(waypoint.event.is_null());
    }
}
