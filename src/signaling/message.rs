use serde::{Deserialize, Serialize};

/// Frames carried over the signaling WebSocket, both directions.
///
/// `sdp`, `candidate` and telemetry `frame` payloads are opaque to the
/// server: they are forwarded verbatim, never inspected. Telemetry frames
/// carry whatever the analysis process emits (face count, eye moves, alert
/// text, mood, lip-sync and liveness flags) straight to the interviewer's
/// presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SignalMessage {
    /// Client binds its connection to a room it already joined over REST.
    JoinRoom {
        room_id: String,
        identity_id: String,
    },

    /// Sent to a client right after its socket is accepted, so peers can
    /// address it.
    ConnectionReady { connection_id: String },

    /// Broadcast to existing room members when a connection binds.
    UserJoined {
        identity_id: String,
        connection_id: String,
    },

    /// Broadcast on disconnect, only when the relay is configured for it.
    PeerLeft { identity_id: String },

    Offer {
        target: String,
        sdp: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<String>,
    },

    Answer {
        target: String,
        sdp: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<String>,
    },

    IceCandidate {
        target: String,
        candidate: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<String>,
    },

    /// Analysis-process frame, routed to the room's interviewer connection.
    Telemetry { frame: serde_json::Value },

    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_tags_are_kebab_case() {
        let msg = SignalMessage::JoinRoom {
            room_id: "482913".into(),
            identity_id: "u1".into(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "join-room");
        assert_eq!(value["roomId"], "482913");
        assert_eq!(value["identityId"], "u1");
    }

    #[test]
    fn test_inbound_offer_parses_without_from() {
        let raw = r#"{"type":"offer","target":"conn-abc","sdp":"v=0..."}"#;
        let msg: SignalMessage = serde_json::from_str(raw).unwrap();
        match msg {
            SignalMessage::Offer { target, sdp, from } => {
                assert_eq!(target, "conn-abc");
                assert_eq!(sdp, "v=0...");
                assert!(from.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_candidate_payload_survives_verbatim() {
        let candidate = json!({
            "candidate": "candidate:1 1 UDP 2122252543 192.0.2.1 54321 typ host",
            "sdpMid": "0",
            "sdpMLineIndex": 0
        });
        let msg = SignalMessage::IceCandidate {
            target: "conn-abc".into(),
            candidate: candidate.clone(),
            from: Some("conn-def".into()),
        };

        let rendered = serde_json::to_string(&msg).unwrap();
        let parsed: SignalMessage = serde_json::from_str(&rendered).unwrap();
        match parsed {
            SignalMessage::IceCandidate {
                candidate: parsed_candidate,
                ..
            } => assert_eq!(parsed_candidate, candidate),
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
