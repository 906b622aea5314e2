//! nullifier registry for replay prevention
//!
//! a revealed secret's hash is its nullifier; the first reveal anywhere
//! in the registry permanently consumes it. entries are never removed
//! and are global across every escrow sharing the registry, with no
//! escrow-id binding

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::hashlock::{hash_secret, Hash32};

/// unique identifier for a spent secret
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Nullifier(pub Hash32);

impl Nullifier {
    /// derive the nullifier for a secret
    pub fn of_secret(secret: &[u8]) -> Self {
        Self(hash_secret(secret))
    }

    pub fn to_bytes(&self) -> Hash32 {
        self.0
    }

    pub fn from_bytes(bytes: Hash32) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Nullifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// global set of spent nullifiers shared by all escrows of one engine
///
/// the mutex is a concurrency-safe stand-in for per-entry exclusion;
/// the host's transaction boundary supplies the real serialization
pub struct NullifierRegistry {
    used: Mutex<HashSet<Nullifier>>,
    escrow_count: AtomicU64,
}

impl NullifierRegistry {
    pub fn new() -> Self {
        Self {
            used: Mutex::new(HashSet::new()),
            escrow_count: AtomicU64::new(0),
        }
    }

    /// atomic insert-if-absent. false means the nullifier was already
    /// spent and the caller must reject the reveal
    pub fn try_claim(&self, nullifier: Nullifier) -> bool {
        self.used
            .lock()
            .expect("nullifier set lock poisoned")
            .insert(nullifier)
    }

    /// both-or-neither claim for range withdrawals: if either nullifier
    /// is already spent, neither is recorded
    pub fn try_claim_pair(&self, a: Nullifier, b: Nullifier) -> bool {
        let mut used = self.used.lock().expect("nullifier set lock poisoned");
        if used.contains(&a) || used.contains(&b) {
            return false;
        }
        used.insert(a);
        used.insert(b);
        true
    }

    /// pure read: has this nullifier been spent
    pub fn is_claimed(&self, nullifier: &Nullifier) -> bool {
        self.used
            .lock()
            .expect("nullifier set lock poisoned")
            .contains(nullifier)
    }

    /// number of spent nullifiers
    pub fn len(&self) -> usize {
        self.used.lock().expect("nullifier set lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// escrows created through this registry
    pub fn escrow_count(&self) -> u64 {
        self.escrow_count.load(Ordering::Relaxed)
    }

    /// increment the creation counter, returning the new count
    pub(crate) fn record_escrow(&self) -> u64 {
        self.escrow_count.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for NullifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_once() {
        let registry = NullifierRegistry::new();
        let nf = Nullifier::of_secret(b"reveal-me");

        assert!(!registry.is_claimed(&nf));
        assert!(registry.try_claim(nf));
        assert!(registry.is_claimed(&nf));
        // double-spend rejected
        assert!(!registry.try_claim(nf));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_claim_pair_both_or_neither() {
        let registry = NullifierRegistry::new();
        let a = Nullifier::of_secret(b"a");
        let b = Nullifier::of_secret(b"b");
        let c = Nullifier::of_secret(b"c");

        assert!(registry.try_claim(b));
        // b already spent: a must stay unclaimed
        assert!(!registry.try_claim_pair(a, b));
        assert!(!registry.is_claimed(&a));

        assert!(registry.try_claim_pair(a, c));
        assert!(registry.is_claimed(&a));
        assert!(registry.is_claimed(&c));
    }

    #[test]
    fn test_claim_pair_same_nullifier() {
        let registry = NullifierRegistry::new();
        let a = Nullifier::of_secret(b"same");

        assert!(registry.try_claim_pair(a, a));
        assert_eq!(registry.len(), 1);
        assert!(!registry.try_claim_pair(a, a));
    }

    #[test]
    fn test_escrow_counter() {
        let registry = NullifierRegistry::new();
        assert_eq!(registry.escrow_count(), 0);
        assert_eq!(registry.record_escrow(), 1);
        assert_eq!(registry.record_escrow(), 2);
        assert_eq!(registry.escrow_count(), 2);
    }
}
