//! error types for escrow operations
//!
//! every failure is local, synchronous and fail-fast: a failed call
//! leaves balances, fill state and the nullifier set untouched

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("escrow already resolved")]
    AlreadyResolved,

    #[error("secret does not match hash lock")]
    InvalidHash,

    #[error("invalid amount")]
    InvalidAmount,

    #[error("merkle proof verification failed")]
    InvalidMerkleProof,

    #[error("nullifier already used")]
    NullifierAlreadyUsed,

    #[error("fill amount not available at this index")]
    InvalidFillAmount,

    #[error("withdrawal window has passed")]
    WindowExpired,

    #[error("operation not permitted in the current window")]
    WindowNotActive,

    #[error("window timestamps must be strictly increasing and in the future")]
    InvalidWindowOrdering,

    #[error("deadline has already passed")]
    DeadlineExpired,

    #[error("number of parts must be between 1 and 20, got {0}")]
    InvalidNumParts(u64),

    #[error("secret index out of range")]
    InvalidSecretIndex,

    #[error("no escrow under this id")]
    EscrowNotFound,
}
