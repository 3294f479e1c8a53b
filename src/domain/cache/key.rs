//! Cache key derivation

use std::fmt::Debug;

/// Derives stable, opaque cache keys from secret inputs
///
/// Implementations must be deterministic for a given configuration and must
/// never embed the raw input in the derived key.
pub trait KeyDeriver: Send + Sync + Debug {
    /// Derives a fixed-length key from the given input
    fn derive(&self, input: &str) -> String;

    /// Derives a key with a namespace prefix
    fn derive_with_namespace(&self, namespace: &str, input: &str) -> String {
        format!("{}:{}", namespace, self.derive(input))
    }
}
