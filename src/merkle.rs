//! merkle membership proofs over the committed secret set
//!
//! pairwise sha-256 with parity-of-index selecting concatenation order.
//! this must match the fixed merkle tree used by the counterpart
//! contract on the other chain; any deviation breaks proof portability

use sha2::{Digest, Sha256};

use crate::hashlock::Hash32;

pub const ZERO_HASH: Hash32 = [0u8; 32];

/// hash a sibling pair, left-to-right
pub fn hash_siblings(left: &Hash32, right: &Hash32) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// verify `leaf` against `root` with sibling path `proof`
///
/// `leaf_index` is 0-based; an even index hashes the running value on
/// the left, an odd index on the right, then the index halves. an empty
/// proof is valid iff the leaf is the root (depth-0 tree)
pub fn verify_proof(root: &Hash32, leaf: &Hash32, proof: &[Hash32], leaf_index: u64) -> bool {
    let mut computed = *leaf;
    let mut index = leaf_index;

    for sibling in proof {
        computed = if index % 2 == 0 {
            hash_siblings(&computed, sibling)
        } else {
            hash_siblings(sibling, &computed)
        };
        index /= 2;
    }

    computed == *root
}

/// fixed merkle tree over the committed secret set
///
/// used by makers to commit the n+1 secret hashes at creation and by
/// tests to generate authentic proofs. odd-length levels are padded
/// with the zero hash
pub struct MerkleTree {
    layers: Vec<Vec<Hash32>>,
}

impl MerkleTree {
    /// build the full tree bottom-up from leaf hashes
    pub fn from_leaves(leaves: Vec<Hash32>) -> Self {
        let mut layers = Vec::new();
        let mut level = leaves;

        loop {
            if level.len() > 1 && level.len() % 2 == 1 {
                level.push(ZERO_HASH);
            }
            layers.push(level.clone());
            if level.len() <= 1 {
                break;
            }
            level = level
                .chunks(2)
                .map(|pair| hash_siblings(&pair[0], &pair[1]))
                .collect();
        }

        Self { layers }
    }

    pub fn root(&self) -> Hash32 {
        self.layers
            .last()
            .and_then(|layer| layer.first())
            .copied()
            .unwrap_or(ZERO_HASH)
    }

    pub fn depth(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }

    /// number of leaves, excluding padding
    pub fn len(&self) -> usize {
        self.layers.first().map_or(0, |layer| layer.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// sibling path for the leaf at `leaf_index` (0-based), bottom-up
    pub fn prove(&self, leaf_index: u64) -> Vec<Hash32> {
        let mut proof = Vec::with_capacity(self.depth());
        let mut index = leaf_index as usize;

        for layer in &self.layers[..self.depth()] {
            let sibling = if index % 2 == 0 { index + 1 } else { index - 1 };
            proof.push(layer.get(sibling).copied().unwrap_or(ZERO_HASH));
            index /= 2;
        }

        proof
    }
}
