//! Wire protocol types
//!
//! One JSON object per WebSocket text frame, discriminated by a `type` field.
//! The broker broadcasts `join`/`quit`/`move` and answers `get-cursors` with
//! a full snapshot; `message` carries an opaque application payload.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Sentinel coordinates for a peer that has joined but not yet moved.
pub const UNKNOWN_POSITION: (f64, f64) = (-1.0, -1.0);

/// A remote participant's last-known state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerSession {
    pub id: String,
    /// Normalized x in [0,1], or -1.0 when unknown.
    pub x: f64,
    /// Normalized y in [0,1], or -1.0 when unknown.
    pub y: f64,
}

impl PeerSession {
    /// A freshly joined peer with no position yet.
    pub fn joined(id: impl Into<String>) -> Self {
        let (x, y) = UNKNOWN_POSITION;
        Self { id: id.into(), x, y }
    }

    /// True once the peer has reported at least one real position.
    pub fn has_position(&self) -> bool {
        (self.x, self.y) != UNKNOWN_POSITION
    }
}

/// Messages exchanged with the broker.
///
/// `GetCursors` is client-originated; `GetCursorsResponse`, `Join` and `Quit`
/// are broker-originated; `Move` and `Message` flow both ways. `Unknown` is
/// never serialized — it is produced by [`decode`] for forward compatibility
/// with message kinds this client does not understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WireMessage {
    GetCursors,
    GetCursorsResponse { sessions: Vec<PeerSession> },
    Join { id: String },
    Quit { id: String },
    Move { id: String, x: f64, y: f64 },
    /// Free-form payload, not interpreted by the sync core.
    Message { data: String },
    #[serde(skip)]
    Unknown { kind: String },
}

impl WireMessage {
    /// The wire-level `type` discriminant, for logging and observability.
    pub fn kind(&self) -> &str {
        match self {
            WireMessage::GetCursors => "get-cursors",
            WireMessage::GetCursorsResponse { .. } => "get-cursors-response",
            WireMessage::Join { .. } => "join",
            WireMessage::Quit { .. } => "quit",
            WireMessage::Move { .. } => "move",
            WireMessage::Message { .. } => "message",
            WireMessage::Unknown { kind } => kind,
        }
    }
}

const KNOWN_KINDS: &[&str] = &[
    "get-cursors",
    "get-cursors-response",
    "join",
    "quit",
    "move",
    "message",
];

/// Encode an outbound message as a JSON text frame.
pub fn encode(msg: &WireMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(ProtocolError::Malformed)
}

/// Decode an inbound text frame.
///
/// Frames that are not a JSON object with a string `type`, or that name a
/// known kind with an invalid body, fail with [`ProtocolError::Malformed`].
/// A well-formed object with an unrecognized kind decodes to
/// [`WireMessage::Unknown`] so newer broker messages degrade to a no-op
/// instead of an error.
pub fn decode(text: &str) -> Result<WireMessage, ProtocolError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| ProtocolError::MissingType(text.to_string()))?;
    if KNOWN_KINDS.contains(&kind) {
        serde_json::from_value(value).map_err(ProtocolError::Malformed)
    } else {
        Ok(WireMessage::Unknown { kind: kind.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_cursors_serde() {
        let json = encode(&WireMessage::GetCursors).unwrap();
        assert_eq!(json, r#"{"type":"get-cursors"}"#);
        assert_eq!(decode(&json).unwrap(), WireMessage::GetCursors);
    }

    #[test]
    fn move_serde() {
        let msg = WireMessage::Move {
            id: "A".to_string(),
            x: 0.5,
            y: 0.25,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "move");
        assert_eq!(json["id"], "A");
        assert_eq!(json["x"], 0.5);
        assert_eq!(json["y"], 0.25);
        let rt = decode(&json.to_string()).unwrap();
        assert_eq!(rt, msg);
    }

    #[test]
    fn snapshot_serde() {
        let text = r#"{"type":"get-cursors-response","sessions":[{"id":"B","x":0.1,"y":0.2}]}"#;
        match decode(text).unwrap() {
            WireMessage::GetCursorsResponse { sessions } => {
                assert_eq!(sessions.len(), 1);
                assert_eq!(sessions[0].id, "B");
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn join_quit_message_serde() {
        assert_eq!(
            decode(r#"{"type":"join","id":"B"}"#).unwrap(),
            WireMessage::Join { id: "B".into() }
        );
        assert_eq!(
            decode(r#"{"type":"quit","id":"B"}"#).unwrap(),
            WireMessage::Quit { id: "B".into() }
        );
        assert_eq!(
            decode(r#"{"type":"message","data":"Ping"}"#).unwrap(),
            WireMessage::Message { data: "Ping".into() }
        );
    }

    #[test]
    fn unknown_kind_decodes_as_unknown() {
        match decode(r#"{"type":"presence-v2","payload":{}}"#).unwrap() {
            WireMessage::Unknown { kind } => assert_eq!(kind, "presence-v2"),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(
            decode("not json"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn missing_type_is_malformed() {
        assert!(matches!(
            decode(r#"{"id":"B"}"#),
            Err(ProtocolError::MissingType(_))
        ));
        // `type` must be a string, not any JSON value
        assert!(decode(r#"{"type":42}"#).is_err());
    }

    #[test]
    fn known_kind_with_bad_body_is_malformed() {
        // `move` without coordinates names a known kind but not a known shape
        assert!(matches!(
            decode(r#"{"type":"move","id":"B"}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn joined_session_has_sentinel_position() {
        let session = PeerSession::joined("C");
        assert!(!session.has_position());
        assert_eq!((session.x, session.y), UNKNOWN_POSITION);
    }
}
