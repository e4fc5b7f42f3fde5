// Envelope codec: canonical byte construction, content-addressed id,
// signing and verification.
//
// Canonicalization is frozen to the delimited form
// `type \0 sender \0 timestamp \0 payload_json [\0 inReplyTo]`, with
// `payload_json` relying on serde_json's default `Map` (BTreeMap-backed, so
// object keys sort lexicographically) -- the `preserve_order` feature must
// never be enabled on serde_json in this workspace, or canonical bytes would
// silently diverge between senders and verifiers built against different
// feature sets.

use std::time::{SystemTime, UNIX_EPOCH};

use relay_protocol::Envelope;
use sha2::{Digest, Sha256};

use crate::error::RelayError;
use crate::identity;

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn canonical_bytes(
    envelope_type: &str,
    sender: &str,
    timestamp: u64,
    payload: &serde_json::Value,
    in_reply_to: Option<&str>,
) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(envelope_type.as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(sender.as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(timestamp.to_string().as_bytes());
    bytes.push(0);
    // serde_json::Value::Object is backed by a BTreeMap without the
    // preserve_order feature, so this serialization is key-sorted for free.
    bytes.extend_from_slice(
        serde_json::to_string(payload)
            .unwrap_or_else(|_| "null".to_owned())
            .as_bytes(),
    );
    if let Some(reply_to) = in_reply_to {
        bytes.push(0);
        bytes.extend_from_slice(reply_to.as_bytes());
    }
    bytes
}

fn content_id(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Produces a fully signed envelope. `timestamp` defaults to current
/// wall-clock milliseconds when `None`.
pub fn create(
    envelope_type: &str,
    sender_pub: &str,
    sender_priv: &str,
    payload: serde_json::Value,
    timestamp: Option<u64>,
    in_reply_to: Option<String>,
) -> Result<Envelope, RelayError> {
    let timestamp = timestamp.unwrap_or_else(now_millis);
    let bytes = canonical_bytes(
        envelope_type,
        sender_pub,
        timestamp,
        &payload,
        in_reply_to.as_deref(),
    );
    let id = content_id(&bytes);
    let signature = identity::sign(&bytes, sender_priv)?;
    Ok(Envelope {
        id,
        envelope_type: envelope_type.to_owned(),
        sender: sender_pub.to_owned(),
        timestamp,
        payload,
        in_reply_to,
        signature,
    })
}

/// Verifies an envelope's content-addressed id and signature.
///
/// Returns `Err(reason)` with `reason` one of `"id_mismatch"` or
/// `"signature_invalid"` -- matching the two failure modes named in the
/// codec's verify contract.
pub fn verify(envelope: &Envelope) -> Result<(), &'static str> {
    let bytes = canonical_bytes(
        &envelope.envelope_type,
        &envelope.sender,
        envelope.timestamp,
        &envelope.payload,
        envelope.in_reply_to.as_deref(),
    );
    if content_id(&bytes) != envelope.id {
        return Err("id_mismatch");
    }
    if !identity::verify(&bytes, &envelope.signature, &envelope.sender) {
        return Err("signature_invalid");
    }
    Ok(())
}
