//! hash locks over revealed secrets
//!
//! one sha-256 digest of the secret serves three roles: the hash-lock
//! comparison value, the merkle leaf, and the nullifier

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 32-byte digest
pub type Hash32 = [u8; 32];

/// hash a secret's bytes
pub fn hash_secret(secret: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hasher.finalize().into()
}

/// commitment to a single secret
///
/// plain digest comparison, no side effects. runs before the merkle
/// check on every withdrawal path
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashLock(pub Hash32);

impl HashLock {
    /// commit to a secret
    pub fn of_secret(secret: &[u8]) -> Self {
        Self(hash_secret(secret))
    }

    /// recompute the digest of `secret` and compare byte-for-byte
    pub fn verify(&self, secret: &[u8]) -> bool {
        hash_secret(secret) == self.0
    }

    pub fn to_bytes(&self) -> Hash32 {
        self.0
    }

    pub fn from_bytes(bytes: Hash32) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for HashLock {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
