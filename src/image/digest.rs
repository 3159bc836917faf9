//! SHA256 content digests
//!
//! Registries address manifests and blobs by the digest of their exact bytes.
//! Everything here hashes the bytes it is given and never a re-serialized copy.

use crate::error::{RegistryError, Result};
use sha2::Digest;

/// Utilities for working with `sha256:` content digests
pub struct DigestUtils;

impl DigestUtils {
    /// Compute the lowercase hex SHA256 of the data
    pub fn compute_sha256(data: &[u8]) -> String {
        let mut hasher = sha2::Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    /// Compute the full `sha256:<hex>` digest of the data
    pub fn compute_docker_digest(data: &[u8]) -> String {
        format!("sha256:{}", Self::compute_sha256(data))
    }

    /// Validate SHA256 hex string (64 characters, all hex)
    pub fn is_valid_sha256_hex(digest: &str) -> bool {
        digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// Validate full Docker digest format (sha256:xxxxx)
    pub fn is_valid_docker_digest(digest: &str) -> bool {
        digest
            .strip_prefix("sha256:")
            .is_some_and(Self::is_valid_sha256_hex)
    }

    /// Check a digest string echoed by a registry against the one computed locally
    pub fn verify_echoed(expected: &str, actual: &str) -> Result<()> {
        if expected != actual {
            return Err(RegistryError::DigestMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }
}
