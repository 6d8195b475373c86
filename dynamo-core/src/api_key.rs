//! Pure API-key format/hash helpers.
//!
//! Kept free of any storage dependency so the format invariants are directly
//! testable: `is_valid_key_format(generate_raw_key())` always holds, and distinct
//! calls always produce distinct keys.

use once_cell::sync::Lazy;
use rand::RngCore;
use regex::Regex;
use sha2::{Digest, Sha256};

pub const API_KEY_PREFIX: &str = "dynamo-sk-";

static KEY_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^dynamo-sk-[0-9a-f]{48}$").unwrap());

/// `dynamo-sk-` + 48 lowercase hex characters (24 cryptographically random bytes).
pub fn generate_raw_key() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    format!("{API_KEY_PREFIX}{}", hex::encode(bytes))
}

pub fn is_valid_key_format(key: &str) -> bool {
    KEY_FORMAT.is_match(key)
}

/// Secure 256-bit hash of the raw key, 64 hex chars. Stored in place of the raw key.
pub fn hash_key(raw_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// First 12 chars of the raw key, stored for display/audit.
pub fn key_prefix(raw_key: &str) -> String {
    raw_key.chars().take(12).collect()
}

/// `localpart(email)`, used as the derived `userId` on key creation.
pub fn derive_user_id(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_valid_format() {
        for _ in 0..50 {
            let key = generate_raw_key();
            assert!(is_valid_key_format(&key), "invalid key: {key}");
        }
    }

    #[test]
    fn distinct_calls_produce_distinct_keys() {
        let a = generate_raw_key();
        let b = generate_raw_key();
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_deterministic() {
        let key = generate_raw_key();
        assert_eq!(hash_key(&key), hash_key(&key));
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(!is_valid_key_format("dynamo-sk-tooshort"));
        assert!(!is_valid_key_format("wrong-prefix-aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"));
        assert!(!is_valid_key_format(&generate_raw_key().to_uppercase()));
    }

    #[test]
    fn prefix_is_first_twelve_chars() {
        let key = generate_raw_key();
        assert_eq!(key_prefix(&key), key.chars().take(12).collect::<String>());
        assert_eq!(key_prefix(&key).len(), 12);
    }

    #[test]
    fn derives_user_id_from_localpart() {
        assert_eq!(derive_user_id("jane.doe@dynamo.works"), "jane.doe");
    }
}
