//! escrow records and the engine that executes fills against them
//!
//! one engine is a factory: it owns the record store and the nullifier
//! registry shared by every escrow it creates. each public operation is
//! one atomic transaction: all checks run before the first mutation,
//! so a failed call leaves balances, fill state and the nullifier set
//! exactly as they were

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::fill::FillSchedule;
use crate::hashlock::{hash_secret, Hash32, HashLock};
use crate::merkle::verify_proof;
use crate::nullifier::{Nullifier, NullifierRegistry};
use crate::value::{Address, Amount, Balance, Payment};
use crate::window::{Window, WindowSchedule};

/// escrow record identifier, derived from creation parameters and the
/// registry's creation counter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EscrowId(pub Hash32);

impl EscrowId {
    fn derive(maker: &Address, merkle_root: &Hash32, created_at: u64, sequence: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"merklock.escrow.v1");
        hasher.update(maker);
        hasher.update(merkle_root);
        hasher.update(created_at.to_le_bytes());
        hasher.update(sequence.to_le_bytes());
        Self(hasher.finalize().into())
    }

    pub fn to_bytes(&self) -> Hash32 {
        self.0
    }
}

impl fmt::Display for EscrowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// creation parameters supplied by the maker alongside the deposits
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EscrowParams {
    pub maker: Address,
    pub hash_lock: HashLock,
    pub merkle_root: Hash32,
    /// t1: end of the (nominally taker-exclusive) withdrawal window
    pub withdrawal_end: u64,
    /// t2: end of the public withdrawal window
    pub public_withdrawal_end: u64,
    /// t3: end of the cancellation window
    pub cancellation_end: u64,
    pub num_parts: u64,
    pub deadline: u64,
}

/// serializable read-only view of an escrow record
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EscrowSnapshot {
    pub id: EscrowId,
    pub maker: Address,
    pub hash_lock: HashLock,
    pub merkle_root: Hash32,
    pub windows: WindowSchedule,
    pub total_amount: Amount,
    pub balance: Amount,
    pub reward_balance: Amount,
    pub filled_amount: Amount,
    pub num_parts: u64,
    pub part_size: Amount,
    pub created_at: u64,
    pub deadline: u64,
    pub is_resolved: bool,
}

/// one locked order
#[derive(Debug)]
pub struct Escrow {
    id: EscrowId,
    balance: Balance,
    reward_balance: Balance,
    hash_lock: HashLock,
    merkle_root: Hash32,
    maker: Address,
    windows: WindowSchedule,
    fill: FillSchedule,
    created_at: u64,
    filled_amount: Amount,
    deadline: u64,
    is_resolved: bool,
}

impl Escrow {
    pub fn id(&self) -> EscrowId {
        self.id
    }

    pub fn maker(&self) -> Address {
        self.maker
    }

    pub fn hash_lock(&self) -> HashLock {
        self.hash_lock
    }

    pub fn merkle_root(&self) -> Hash32 {
        self.merkle_root
    }

    pub fn balance_amount(&self) -> Amount {
        self.balance.amount()
    }

    pub fn reward_amount(&self) -> Amount {
        self.reward_balance.amount()
    }

    pub fn total_amount(&self) -> Amount {
        self.fill.total_amount()
    }

    pub fn filled_amount(&self) -> Amount {
        self.filled_amount
    }

    pub fn num_parts(&self) -> u64 {
        self.fill.num_parts()
    }

    pub fn part_size(&self) -> Amount {
        self.fill.part_size()
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// stored metadata only: validated at creation, never re-checked on
    /// withdrawal paths
    pub fn deadline(&self) -> u64 {
        self.deadline
    }

    pub fn is_resolved(&self) -> bool {
        self.is_resolved
    }

    pub fn schedule(&self) -> &WindowSchedule {
        &self.windows
    }

    pub fn fill_schedule(&self) -> &FillSchedule {
        &self.fill
    }

    /// window containing `now`
    pub fn window(&self, now: u64) -> Window {
        self.windows.resolve(now)
    }

    pub fn max_cumulative_fill(&self, secret_index: u64) -> Result<Amount> {
        self.fill.max_cumulative_fill(secret_index)
    }

    pub fn range_fill_amount(&self, start_index: u64, end_index: u64) -> Result<Amount> {
        self.fill.range_fill_amount(start_index, end_index)
    }

    /// filled percentage of the total, rounded down
    pub fn fill_percent(&self) -> u64 {
        let total = self.fill.total_amount().0;
        if total == 0 {
            return 0;
        }
        (self.filled_amount.0 as u128 * 100 / total as u128) as u64
    }

    pub fn snapshot(&self) -> EscrowSnapshot {
        EscrowSnapshot {
            id: self.id,
            maker: self.maker,
            hash_lock: self.hash_lock,
            merkle_root: self.merkle_root,
            windows: self.windows,
            total_amount: self.fill.total_amount(),
            balance: self.balance.amount(),
            reward_balance: self.reward_balance.amount(),
            filled_amount: self.filled_amount,
            num_parts: self.fill.num_parts(),
            part_size: self.fill.part_size(),
            created_at: self.created_at,
            deadline: self.deadline,
            is_resolved: self.is_resolved,
        }
    }

    /// validate one revealed secret: index range, hash lock, merkle
    /// membership, nullifier freshness. read-only
    fn verify_reveal(
        &self,
        secret_index: u64,
        secret: &[u8],
        proof: &[Hash32],
        registry: &NullifierRegistry,
    ) -> Result<Nullifier> {
        if !self.fill.index_in_range(secret_index) {
            return Err(Error::InvalidSecretIndex);
        }
        if !self.hash_lock.verify(secret) {
            return Err(Error::InvalidHash);
        }
        let leaf = hash_secret(secret);
        if !verify_proof(&self.merkle_root, &leaf, proof, secret_index - 1) {
            return Err(Error::InvalidMerkleProof);
        }
        let nullifier = Nullifier(leaf);
        if registry.is_claimed(&nullifier) {
            return Err(Error::NullifierAlreadyUsed);
        }
        Ok(nullifier)
    }

    /// clamp a fill request against the cumulative cap. read-only
    fn clamp_fill(&self, cap: Amount, desired: Amount) -> Result<Amount> {
        if cap <= self.filled_amount {
            return Err(Error::InvalidFillAmount);
        }
        let available = cap.saturating_sub(self.filled_amount);
        let actual = desired.min(available);
        if actual.is_zero() {
            return Err(Error::InvalidFillAmount);
        }
        if self.balance.amount() < actual {
            return Err(Error::InvalidAmount);
        }
        Ok(actual)
    }

    /// record a committed fill; flips the resolution flag when the
    /// cumulative total is reached
    fn commit_fill(&mut self, actual: Amount) {
        self.filled_amount = self.filled_amount.saturating_add(actual);
        if self.filled_amount >= self.fill.total_amount() {
            self.is_resolved = true;
        }
    }

    /// split the filled amount out of the balance and route payouts:
    /// the caller always receives the main payout; the reward pool goes
    /// to the caller only during the public window
    fn pay_out(&mut self, actual: Amount, window: Window, caller: Address) -> Result<Withdrawal> {
        let value = self.balance.split(actual)?;
        let reward = match window {
            Window::PublicWithdrawal => {
                Some(Payment::new(caller, self.reward_balance.take_all()))
            }
            _ => None,
        };
        Ok(Withdrawal {
            payout: Payment::new(caller, value),
            reward,
        })
    }

    /// terminal release of the record: both pools must already be
    /// drained; empty pools are explicitly discarded
    fn destroy(self) -> Result<()> {
        self.balance.destroy_zero()?;
        self.reward_balance.destroy_zero()
    }
}

/// outcome of a withdrawal: the main payout, plus the reward payout
/// when one is due
#[derive(Debug, PartialEq, Eq)]
pub struct Withdrawal {
    pub payout: Payment,
    pub reward: Option<Payment>,
}

/// outcome of a refund: principal and reward pool returned to the maker
#[derive(Debug, PartialEq, Eq)]
pub struct Refund {
    pub principal: Payment,
    pub reward: Payment,
}

/// creates escrows and executes fills against them
///
/// the host serializes operations per escrow and per registry entry;
/// the engine enforces every invariant inside one operation
pub struct EscrowEngine {
    escrows: HashMap<EscrowId, Escrow>,
    registry: NullifierRegistry,
}

impl EscrowEngine {
    pub fn new() -> Self {
        Self {
            escrows: HashMap::new(),
            registry: NullifierRegistry::new(),
        }
    }

    /// the shared nullifier registry
    pub fn registry(&self) -> &NullifierRegistry {
        &self.registry
    }

    /// live escrow record, if not yet destroyed
    pub fn escrow(&self, id: &EscrowId) -> Option<&Escrow> {
        self.escrows.get(id)
    }

    pub fn is_nullifier_used(&self, nullifier: &Nullifier) -> bool {
        self.registry.is_claimed(nullifier)
    }

    /// number of live (not yet destroyed) escrows
    pub fn len(&self) -> usize {
        self.escrows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.escrows.is_empty()
    }

    /// lock `deposit` under the given parameters. the deposit becomes
    /// the withdrawable total; `reward` seeds the public-window
    /// incentive pool
    pub fn create(
        &mut self,
        deposit: Balance,
        reward: Balance,
        params: EscrowParams,
        now: u64,
    ) -> Result<EscrowId> {
        let windows = WindowSchedule::new(
            params.withdrawal_end,
            params.public_withdrawal_end,
            params.cancellation_end,
            now,
        )?;
        if params.deadline <= now {
            return Err(Error::DeadlineExpired);
        }
        let fill = FillSchedule::new(deposit.amount(), params.num_parts)?;

        let sequence = self.registry.record_escrow();
        let id = EscrowId::derive(&params.maker, &params.merkle_root, now, sequence);

        info!(
            escrow = %id,
            total = %fill.total_amount(),
            reward = %reward.amount(),
            num_parts = fill.num_parts(),
            "escrow created"
        );

        self.escrows.insert(
            id,
            Escrow {
                id,
                balance: deposit,
                reward_balance: reward,
                hash_lock: params.hash_lock,
                merkle_root: params.merkle_root,
                maker: params.maker,
                windows,
                fill,
                created_at: now,
                filled_amount: Amount::ZERO,
                deadline: params.deadline,
                is_resolved: false,
            },
        );
        Ok(id)
    }

    /// reveal one secret and withdraw up to the cumulative amount its
    /// index authorizes
    #[allow(clippy::too_many_arguments)]
    pub fn withdraw_partial(
        &mut self,
        id: &EscrowId,
        secret_index: u64,
        secret: &[u8],
        proof: &[Hash32],
        desired_amount: Amount,
        caller: Address,
        now: u64,
    ) -> Result<Withdrawal> {
        let escrow = self.escrows.get_mut(id).ok_or(Error::EscrowNotFound)?;
        if escrow.is_resolved {
            return Err(Error::AlreadyResolved);
        }
        let window = escrow.windows.resolve(now);
        if !window.allows_withdrawal() {
            return Err(Error::WindowExpired);
        }
        let nullifier = escrow.verify_reveal(secret_index, secret, proof, &self.registry)?;
        let cap = escrow.fill.max_cumulative_fill(secret_index)?;
        let actual = escrow.clamp_fill(cap, desired_amount)?;

        // commit point: every check has passed
        if !self.registry.try_claim(nullifier) {
            return Err(Error::NullifierAlreadyUsed);
        }
        escrow.commit_fill(actual);
        let withdrawal = escrow.pay_out(actual, window, caller)?;

        debug!(
            escrow = %id,
            secret_index,
            amount = %actual,
            filled = %escrow.filled_amount,
            resolved = escrow.is_resolved,
            ?window,
            "partial withdrawal"
        );
        Ok(withdrawal)
    }

    /// reveal the two boundary secrets of an inclusive index range and
    /// withdraw up to the capacity the range authorizes. only the
    /// boundary secrets are nullified; interior indices stay unclaimed
    #[allow(clippy::too_many_arguments)]
    pub fn withdraw_partial_range(
        &mut self,
        id: &EscrowId,
        start_index: u64,
        end_index: u64,
        start_secret: &[u8],
        end_secret: &[u8],
        start_proof: &[Hash32],
        end_proof: &[Hash32],
        desired_amount: Amount,
        caller: Address,
        now: u64,
    ) -> Result<Withdrawal> {
        let escrow = self.escrows.get_mut(id).ok_or(Error::EscrowNotFound)?;
        if escrow.is_resolved {
            return Err(Error::AlreadyResolved);
        }
        let window = escrow.windows.resolve(now);
        if !window.allows_withdrawal() {
            return Err(Error::WindowExpired);
        }
        if end_index < start_index {
            return Err(Error::InvalidSecretIndex);
        }
        let start_nullifier =
            escrow.verify_reveal(start_index, start_secret, start_proof, &self.registry)?;
        let end_nullifier =
            escrow.verify_reveal(end_index, end_secret, end_proof, &self.registry)?;
        let cap = escrow.fill.range_fill_amount(start_index, end_index)?;
        let actual = escrow.clamp_fill(cap, desired_amount)?;

        // commit point: both nullifiers recorded together or not at all
        if !self.registry.try_claim_pair(start_nullifier, end_nullifier) {
            return Err(Error::NullifierAlreadyUsed);
        }
        escrow.commit_fill(actual);
        let withdrawal = escrow.pay_out(actual, window, caller)?;

        debug!(
            escrow = %id,
            start_index,
            end_index,
            amount = %actual,
            filled = %escrow.filled_amount,
            resolved = escrow.is_resolved,
            ?window,
            "range withdrawal"
        );
        Ok(withdrawal)
    }

    /// reveal a secret authorizing full payout and drain the escrow.
    /// terminal: the record is destroyed. legal while the cumulative
    /// fill is still below the total
    pub fn withdraw_full(
        &mut self,
        id: &EscrowId,
        completion_index: u64,
        completion_secret: &[u8],
        completion_proof: &[Hash32],
        caller: Address,
        now: u64,
    ) -> Result<Withdrawal> {
        let escrow = self.escrows.get(id).ok_or(Error::EscrowNotFound)?;
        if escrow.is_resolved {
            return Err(Error::AlreadyResolved);
        }
        let window = escrow.windows.resolve(now);
        if !window.allows_withdrawal() {
            return Err(Error::WindowExpired);
        }
        let nullifier =
            escrow.verify_reveal(completion_index, completion_secret, completion_proof, &self.registry)?;
        let cap = escrow.fill.max_cumulative_fill(completion_index)?;
        if cap < escrow.fill.total_amount() {
            return Err(Error::InvalidFillAmount);
        }

        // commit point
        if !self.registry.try_claim(nullifier) {
            return Err(Error::NullifierAlreadyUsed);
        }
        let mut escrow = self.escrows.remove(id).ok_or(Error::EscrowNotFound)?;
        let principal = escrow.balance.take_all();
        let reward_value = escrow.reward_balance.take_all();
        let maker = escrow.maker;
        escrow.destroy()?;

        let withdrawal = match window {
            Window::PublicWithdrawal => Withdrawal {
                payout: Payment::new(caller, principal),
                reward: Some(Payment::new(caller, reward_value)),
            },
            // outside the public window the reward pool cannot go to the
            // caller; it follows the principal's origin back to the maker
            _ => Withdrawal {
                payout: Payment::new(caller, principal),
                reward: Some(Payment::new(maker, reward_value)),
            },
        };

        info!(
            escrow = %id,
            completion_index,
            amount = %withdrawal.payout.amount(),
            ?window,
            "full withdrawal, escrow destroyed"
        );
        Ok(withdrawal)
    }

    /// return all remaining value to the maker. permitted for any
    /// caller, but only during the cancellation window. terminal
    pub fn refund_to_maker(&mut self, id: &EscrowId, now: u64) -> Result<Refund> {
        let escrow = self.escrows.get(id).ok_or(Error::EscrowNotFound)?;
        if escrow.windows.resolve(now) != Window::Cancellation {
            return Err(Error::WindowNotActive);
        }
        if escrow.is_resolved {
            return Err(Error::AlreadyResolved);
        }

        let mut escrow = self.escrows.remove(id).ok_or(Error::EscrowNotFound)?;
        let maker = escrow.maker;
        let principal = escrow.balance.take_all();
        let reward_value = escrow.reward_balance.take_all();
        escrow.destroy()?;

        info!(
            escrow = %id,
            principal = %principal.amount(),
            reward = %reward_value.amount(),
            "refunded to maker, escrow destroyed"
        );
        Ok(Refund {
            principal: Payment::new(maker, principal),
            reward: Payment::new(maker, reward_value),
        })
    }
}

impl Default for EscrowEngine {
    fn default() -> Self {
        Self::new()
    }
}
