//! merklock: hash-time-locked escrow with merkle-secret partial fills
//!
//! a maker locks funds behind a hash lock and a merkle root committing to
//! n+1 secrets. revealing a secret unlocks an increasing cumulative
//! fraction of the total; the final "completion" secret unlocks
//! everything. reveals are bounded by three sequential time windows and
//! replay-protected by a global nullifier registry shared across every
//! escrow created through one engine.
//!
//! # architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      EscrowEngine                         │
//! │  ├─ record store (EscrowId -> Escrow)                    │
//! │  └─ NullifierRegistry (global spent-secret set)          │
//! │                                                           │
//! │  one operation = one atomic transaction:                 │
//! │  window check -> hash lock -> merkle proof -> nullifier  │
//! │  -> fill arithmetic -> balance split -> payout           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! time is injected per call (`now` in milliseconds); the crate never
//! samples a wall clock. the host runtime serializes operations per
//! escrow and supplies the transaction boundary.

pub mod error;
pub mod escrow;
pub mod fill;
pub mod hashlock;
pub mod merkle;
pub mod nullifier;
pub mod value;
pub mod window;

pub use error::{Error, Result};
pub use escrow::{Escrow, EscrowEngine, EscrowId, EscrowParams, EscrowSnapshot, Refund, Withdrawal};
pub use fill::FillSchedule;
pub use hashlock::{hash_secret, Hash32, HashLock};
pub use merkle::{verify_proof, MerkleTree};
pub use nullifier::{Nullifier, NullifierRegistry};
pub use value::{Address, Amount, Balance, Payment};
pub use window::{Window, WindowSchedule};

/// minimum number of equal parts an escrow may be split into
pub const MIN_PARTS: u64 = 1;
/// maximum number of equal parts an escrow may be split into
pub const MAX_PARTS: u64 = 20;
