//! HMAC-based cache key derivation

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::domain::cache::KeyDeriver;
use crate::domain::DomainError;

type HmacSha256 = Hmac<Sha256>;

/// Derives cache keys as hex-encoded HMAC-SHA256 of the input
///
/// Keys are 64 hex characters. Rotating the HMAC key invalidates every
/// derived key, which is how cached API key lookups get flushed.
#[derive(Clone)]
pub struct HmacKeyDeriver {
    mac: HmacSha256,
}

impl fmt::Debug for HmacKeyDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacKeyDeriver")
            .field("mac", &"<redacted>")
            .finish()
    }
}

impl HmacKeyDeriver {
    /// Length of every derived key
    pub const KEY_LENGTH: usize = 64;

    /// Creates a deriver keyed by the given secret
    pub fn new(hmac_key: &[u8]) -> Result<Self, DomainError> {
        if hmac_key.is_empty() {
            return Err(DomainError::configuration("Key deriver HMAC key must not be empty"));
        }

        let mac = HmacSha256::new_from_slice(hmac_key)
            .map_err(|e| DomainError::configuration(format!("Invalid HMAC key: {}", e)))?;

        Ok(Self { mac })
    }
}

impl KeyDeriver for HmacKeyDeriver {
    fn derive(&self, input: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(input.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn deriver() -> HmacKeyDeriver {
        HmacKeyDeriver::new(b"test-hmac-key").unwrap()
    }

    #[test]
    fn test_derive_is_deterministic() {
        let deriver = deriver();

        assert_eq!(deriver.derive("api-key-123"), deriver.derive("api-key-123"));
        assert_eq!(
            deriver.derive("api-key-123"),
            HmacKeyDeriver::new(b"test-hmac-key").unwrap().derive("api-key-123")
        );
    }

    #[test]
    fn test_derive_has_fixed_length() {
        let deriver = deriver();

        assert_eq!(deriver.derive("").len(), HmacKeyDeriver::KEY_LENGTH);
        assert_eq!(deriver.derive(&"x".repeat(4096)).len(), HmacKeyDeriver::KEY_LENGTH);
    }

    #[test]
    fn test_derive_known_vector() {
        // RFC 4231 test case 2
        let deriver = HmacKeyDeriver::new(b"Jefe").unwrap();

        assert_eq!(
            deriver.derive("what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_derive_does_not_embed_input() {
        let deriver = deriver();
        let secret = "abcdef0123456789";

        assert!(!deriver.derive(secret).contains(secret));
    }

    #[test]
    fn test_distinct_inputs_yield_distinct_keys() {
        let deriver = deriver();
        let keys: HashSet<String> = (0..10_000)
            .map(|i| deriver.derive(&format!("api-key-{}", i)))
            .collect();

        assert_eq!(keys.len(), 10_000);
    }

    #[test]
    fn test_different_hmac_keys_yield_different_keys() {
        let other = HmacKeyDeriver::new(b"other-hmac-key").unwrap();

        assert_ne!(deriver().derive("api-key"), other.derive("api-key"));
    }

    #[test]
    fn test_rejects_empty_hmac_key() {
        assert!(matches!(
            HmacKeyDeriver::new(b""),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", deriver());
        assert!(!debug.contains("test-hmac-key"));
    }
}
