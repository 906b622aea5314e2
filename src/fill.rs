//! cumulative fill arithmetic
//!
//! secrets are numbered 1..=n+1. each of the first n unlocks one
//! additional equal-sized part; the completion index n+1 unlocks the
//! remainder of the total

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::Amount;
use crate::{MAX_PARTS, MIN_PARTS};

/// per-escrow fill parameters, fixed at creation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillSchedule {
    total_amount: Amount,
    num_parts: u64,
    part_size: Amount,
}

impl FillSchedule {
    /// `part_size` is `total / num_parts` with integer division and must
    /// come out non-zero
    pub fn new(total_amount: Amount, num_parts: u64) -> Result<Self> {
        if !(MIN_PARTS..=MAX_PARTS).contains(&num_parts) {
            return Err(Error::InvalidNumParts(num_parts));
        }
        if total_amount.is_zero() {
            return Err(Error::InvalidAmount);
        }
        let part_size = Amount::new(total_amount.0 / num_parts);
        if part_size.is_zero() {
            return Err(Error::InvalidAmount);
        }
        Ok(Self {
            total_amount,
            num_parts,
            part_size,
        })
    }

    pub fn total_amount(&self) -> Amount {
        self.total_amount
    }

    pub fn num_parts(&self) -> u64 {
        self.num_parts
    }

    pub fn part_size(&self) -> Amount {
        self.part_size
    }

    /// index of the completion secret
    pub fn completion_index(&self) -> u64 {
        self.num_parts + 1
    }

    /// true iff `secret_index` is within 1..=n+1
    pub fn index_in_range(&self, secret_index: u64) -> bool {
        secret_index >= 1 && secret_index <= self.completion_index()
    }

    /// maximum cumulative amount `secret_index` authorizes
    pub fn max_cumulative_fill(&self, secret_index: u64) -> Result<Amount> {
        if !self.index_in_range(secret_index) {
            return Err(Error::InvalidFillAmount);
        }
        if secret_index == self.completion_index() {
            return Ok(self.total_amount);
        }
        // secret_index <= num_parts, so this stays within the total
        Ok(Amount::new(secret_index * self.part_size.0))
    }

    /// capacity unlocked by the inclusive index range, clamped to the
    /// total: a range spanning k consecutive indices unlocks k parts
    pub fn range_fill_amount(&self, start_index: u64, end_index: u64) -> Result<Amount> {
        if start_index < 1 || end_index < start_index || end_index > self.completion_index() {
            return Err(Error::InvalidSecretIndex);
        }
        let start_max = self.max_cumulative_fill(start_index)?;
        let end_max = self.max_cumulative_fill(end_index)?;
        let capacity = (end_max.0 - start_max.0).saturating_add(self.part_size.0);
        Ok(Amount::new(capacity.min(self.total_amount.0)))
    }
}
