// relay-protocol: wire types for the agent relay.
//
// Two wire shapes share the "type" field name but mean different things:
//   - control frames (`register`, `message`, `ping`, ...) use `type` as a
//     discriminator tag;
//   - a delivered envelope's own `type` field (`publish`, `announce`, ...) is
//     application data, not a protocol discriminator.
// Because of that collision a delivered envelope is sent as its own JSON
// object (optionally carrying a sibling `fromName` field) rather than being
// wrapped inside the `ClientFrame`/`ServerFrame` enums below. See
// `EnvelopeDelivery`.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The atomic signed, content-addressed message unit routed by the relay.
///
/// `id` is the SHA-256 hex digest of the canonical byte string (see
/// `relay::codec::canonical_bytes`); `signature` is an Ed25519 signature
/// over the same bytes. Both are immutable once computed -- any field
/// mutation invalidates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// 64-character lowercase hex SHA-256 of the canonical bytes.
    pub id: String,
    /// Short ASCII tag, e.g. "announce", "publish", "discover", or an
    /// agent-defined tag. Application data, not a protocol discriminator.
    #[serde(rename = "type")]
    pub envelope_type: String,
    /// Hex Ed25519 public key of the signer.
    pub sender: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub payload: serde_json::Value,
    #[serde(rename = "inReplyTo", default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    /// Hex Ed25519 signature over the canonical bytes.
    pub signature: String,
}

/// An envelope as delivered to a recipient, with the out-of-band `fromName`
/// hint the router attaches when the sender has a registered display name.
///
/// Serializes as the envelope's own fields plus `fromName` -- the envelope
/// itself *is* the wire frame, per the relay's delivery contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeDelivery {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub from_name: Option<String>,
}

// ---------------------------------------------------------------------------
// WebSocket control frames
// ---------------------------------------------------------------------------

/// A peer's presence summary, as carried in `peer_list`/`peer_online`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerInfo {
    #[serde(rename = "publicKey")]
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Control frames a client may send.
///
/// Any frame whose `type` is not one of these (e.g. a discovery-layer
/// extension) is deliberately left undecoded here -- the session handler
/// peeks the raw `type` string first and only attempts this decode for
/// the four frozen kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Register {
        #[serde(rename = "publicKey")]
        public_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
    Message {
        to: String,
        envelope: Envelope,
    },
    Ping,
    Pong,
}

/// Control frames the server may send (excluding delivered envelopes -- see
/// `EnvelopeDelivery`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Registered {
        #[serde(rename = "publicKey")]
        public_key: String,
    },
    PeerList {
        peers: Vec<PeerInfo>,
    },
    PeerOnline(PeerInfo),
    PeerOffline {
        #[serde(rename = "publicKey")]
        public_key: String,
    },
    Error {
        message: String,
    },
    Ping,
    Pong,
}

/// Frozen wire-visible error codes.
pub mod error_codes {
    pub const NOT_REGISTERED: &str = "not_registered";
    pub const SENDER_MISMATCH: &str = "sender_mismatch";
    pub const INVALID_ENVELOPE: &str = "invalid_envelope";
    pub const RECIPIENT_NOT_CONNECTED: &str = "recipient_not_connected";
    pub const QUEUE_FULL: &str = "queue_full";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const BAD_REQUEST: &str = "bad_request";
}

// ---------------------------------------------------------------------------
// REST request/response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RestRegisterRequest {
    #[serde(rename = "publicKey")]
    pub public_key: String,
    #[serde(rename = "privateKey")]
    pub private_key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestRegisterResponse {
    pub token: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<PeerInfo>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestSendRequest {
    pub to: String,
    #[serde(rename = "type")]
    pub envelope_type: String,
    pub payload: serde_json::Value,
    #[serde(rename = "inReplyTo", default)]
    pub in_reply_to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestSendResponse {
    pub ok: bool,
    #[serde(rename = "messageId")]
    pub message_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestPeersResponse {
    pub peers: Vec<PeerInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestMessagesResponse {
    pub messages: Vec<Envelope>,
}

/// Frozen HTTP error envelope used by all non-2xx REST responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpErrorEnvelope {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frame_register_round_trips_camel_case_public_key() {
        let json = r#"{"type":"register","publicKey":"abcd","name":"A"}"#;
        let frame: ClientFrame = serde_json::from_str(json).unwrap();
        match frame {
            ClientFrame::Register {
                public_key, name, ..
            } => {
                assert_eq!(public_key, "abcd");
                assert_eq!(name.as_deref(), Some("A"));
            }
            other => panic!("expected Register, got {other:?}"),
        }
    }

    #[test]
    fn server_frame_peer_offline_tags_as_snake_case() {
        let frame = ServerFrame::PeerOffline {
            public_key: "pk1".to_owned(),
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"type":"peer_offline","publicKey":"pk1"}"#);
    }

    #[test]
    fn envelope_delivery_flattens_envelope_fields_alongside_from_name() {
        let envelope = Envelope {
            id: "id1".to_owned(),
            envelope_type: "publish".to_owned(),
            sender: "pk1".to_owned(),
            timestamp: 1,
            payload: serde_json::json!({"text": "hi"}),
            in_reply_to: None,
            signature: "sig1".to_owned(),
        };
        let delivery = EnvelopeDelivery {
            envelope,
            from_name: Some("Alice".to_owned()),
        };
        let value: serde_json::Value = serde_json::to_value(&delivery).unwrap();
        assert_eq!(value["id"], "id1");
        assert_eq!(value["type"], "publish");
        assert_eq!(value["fromName"], "Alice");
        assert!(value.get("inReplyTo").is_none());
    }
}
