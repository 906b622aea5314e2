//! value custody primitives
//!
//! models the host ledger's coin/balance type as a linear value: a
//! `Balance` is neither `Copy` nor `Clone`, so value deposited into an
//! escrow can only move through `split`, `join` or an explicit payout.
//! the engine never mints value

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// amount of value, in the ledger's smallest unit
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Amount(pub u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(amount: u64) -> Self {
        Self(amount)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Amount {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl From<Amount> for u64 {
    fn from(v: Amount) -> Self {
        v.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// party address on the host ledger
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// linear value holder
///
/// value enters through `deposit` at the host boundary and leaves only
/// through `split`, `take_all` or `destroy_zero`
#[derive(Debug, PartialEq, Eq)]
pub struct Balance(Amount);

impl Balance {
    /// empty balance
    pub fn zero() -> Self {
        Self(Amount::ZERO)
    }

    /// host-boundary constructor: wraps value deposited by a caller
    pub fn deposit(amount: Amount) -> Self {
        Self(amount)
    }

    pub fn amount(&self) -> Amount {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// split `amount` out of this balance
    pub fn split(&mut self, amount: Amount) -> Result<Balance> {
        let remaining = self.0.checked_sub(amount).ok_or(Error::InvalidAmount)?;
        self.0 = remaining;
        Ok(Balance(amount))
    }

    /// drain the entire balance, leaving zero behind
    pub fn take_all(&mut self) -> Balance {
        let drained = Balance(self.0);
        self.0 = Amount::ZERO;
        drained
    }

    /// absorb another balance into this one
    pub fn join(&mut self, other: Balance) {
        self.0 = self.0.saturating_add(other.0);
    }

    /// explicitly discard an empty balance. non-zero balances must be
    /// paid out, never dropped
    pub fn destroy_zero(self) -> Result<()> {
        if !self.is_zero() {
            return Err(Error::InvalidAmount);
        }
        Ok(())
    }
}

/// a payout owed to an address, produced by an engine operation and
/// disposed of by the surrounding transaction context
#[derive(Debug, PartialEq, Eq)]
pub struct Payment {
    pub to: Address,
    pub value: Balance,
}

impl Payment {
    pub fn new(to: Address, value: Balance) -> Self {
        Self { to, value }
    }

    pub fn amount(&self) -> Amount {
        self.value.amount()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_join() {
        let mut balance = Balance::deposit(Amount::new(1000));

        let part = balance.split(Amount::new(300)).unwrap();
        assert_eq!(part.amount(), Amount::new(300));
        assert_eq!(balance.amount(), Amount::new(700));

        balance.join(part);
        assert_eq!(balance.amount(), Amount::new(1000));
    }

    #[test]
    fn test_split_insufficient() {
        let mut balance = Balance::deposit(Amount::new(100));
        assert_eq!(
            balance.split(Amount::new(101)),
            Err(Error::InvalidAmount)
        );
        // failed split leaves the balance untouched
        assert_eq!(balance.amount(), Amount::new(100));
    }

    #[test]
    fn test_take_all() {
        let mut balance = Balance::deposit(Amount::new(500));
        let drained = balance.take_all();
        assert_eq!(drained.amount(), Amount::new(500));
        assert!(balance.is_zero());
        balance.destroy_zero().unwrap();
    }

    #[test]
    fn test_destroy_nonzero_rejected() {
        let balance = Balance::deposit(Amount::new(1));
        assert_eq!(balance.destroy_zero(), Err(Error::InvalidAmount));
    }
}
