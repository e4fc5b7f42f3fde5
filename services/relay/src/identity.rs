// Ed25519 identity: generate/encode key pairs, sign and verify arbitrary
// byte strings. The signature algorithm is fixed -- canonical bytes are the
// only compatibility surface (see codec.rs).

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand_core::OsRng;

use crate::error::RelayError;

/// Generates a fresh key pair, returned as lowercase hex: `(public, private)`.
pub fn generate_keypair() -> (String, String) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let public = hex::encode(signing_key.verifying_key().to_bytes());
    let private = hex::encode(signing_key.to_bytes());
    (public, private)
}

fn decode_seed(priv_hex: &str) -> Result<[u8; 32], RelayError> {
    let bytes = hex::decode(priv_hex).map_err(|e| RelayError::Signing(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| RelayError::Signing("private key must be 32 bytes".to_owned()))
}

fn decode_public(pub_hex: &str) -> Option<[u8; 32]> {
    hex::decode(pub_hex).ok()?.try_into().ok()
}

/// Signs `message` with the private key encoded as lowercase hex, returning
/// a lowercase hex signature.
pub fn sign(message: &[u8], priv_hex: &str) -> Result<String, RelayError> {
    let seed = decode_seed(priv_hex)?;
    let signing_key = SigningKey::from_bytes(&seed);
    Ok(hex::encode(signing_key.sign(message).to_bytes()))
}

/// Verifies `signature_hex` against `message` for the public key encoded as
/// lowercase hex. Returns `false` on any malformed input rather than erroring
/// -- callers treat any failure uniformly as an invalid envelope.
pub fn verify(message: &[u8], signature_hex: &str, pub_hex: &str) -> bool {
    let Some(public_bytes) = decode_public(pub_hex) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_bytes) else {
        return false;
    };
    let Ok(signature_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(signature_bytes): Result<[u8; 64], _> = signature_bytes.try_into() else {
        return false;
    };
    let signature = Signature::from_bytes(&signature_bytes);
    verifying_key.verify_strict(message, &signature).is_ok()
}

/// Verifies that `pub_hex`/`priv_hex` form a matching pair by signing and
/// verifying a fixed test string, as used by `POST /v1/register`.
pub fn keys_match(pub_hex: &str, priv_hex: &str) -> bool {
    const PROBE: &[u8] = b"relay-identity-probe";
    match sign(PROBE, priv_hex) {
        Ok(sig) => verify(PROBE, &sig, pub_hex),
        Err(_) => false,
    }
}
