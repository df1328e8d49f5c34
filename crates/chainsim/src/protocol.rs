//! Wire Protocol
//!
//! The single request type exchanged between relay nodes. The response
//! body is the raw payload bytes on success; failure is signaled by a
//! non-success HTTP status and carries no well-formed payload.

use serde::{Deserialize, Serialize};

/// One hop's view of a chain request.
///
/// Each relay consumes the head of `remaining_hops` and forwards the
/// strict tail, so the list shrinks by exactly one per hop; an empty
/// list marks the receiving node as the terminus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainRequest {
    /// Remaining hop URLs, head first.
    pub remaining_hops: Vec<String>,
    /// Size in bytes of the payload the terminus must synthesize.
    pub payload_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names_are_stable() {
        let req = ChainRequest {
            remaining_hops: vec!["http://10.0.0.2:3365/".to_string()],
            payload_size: 64,
        };

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["remaining_hops"][0], "http://10.0.0.2:3365/");
        assert_eq!(json["payload_size"], 64);
    }

    #[test]
    fn test_round_trip_preserves_hop_order() {
        let req = ChainRequest {
            remaining_hops: vec!["b".into(), "c".into(), "d".into()],
            payload_size: 16,
        };

        let parsed: ChainRequest =
            serde_json::from_str(&serde_json::to_string(&req).unwrap()).unwrap();
        assert_eq!(parsed.remaining_hops, vec!["b", "c", "d"]);
        assert_eq!(parsed.payload_size, 16);
    }
}
