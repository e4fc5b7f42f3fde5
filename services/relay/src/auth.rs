//! REST bearer tokens: opaque random hex, carrying (by index) the
//! `publicKey` that owns the session.
//!
//! Tokens are looked up through a side index (`token -> publicKey`) kept in
//! `AppState` rather than embedded as claims, since the registry already
//! holds the authoritative `RestTransport` per public key -- a token is
//! just a capability to reach it.

use rand::RngCore;

pub const TOKEN_BYTES: usize = 32;

/// Generates a fresh bearer token as lowercase hex: 32 random bytes, i.e.
/// 64 hex characters.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn extract_bearer(authorization: &str) -> Option<&str> {
    authorization.strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique_lowercase_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[test]
    fn extract_bearer_requires_exact_prefix() {
        assert_eq!(extract_bearer("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer("Basic abc"), None);
        assert_eq!(extract_bearer(""), None);
    }
}
