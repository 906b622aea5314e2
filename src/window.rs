//! time-window authorization
//!
//! three strictly increasing deadlines partition time into four states.
//! windows are evaluated lazily against an injected timestamp; there are
//! no background timers

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// authorization state derived from the current time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Window {
    /// up to and including t1. documented as taker-exclusive, but no
    /// caller restriction is enforced
    Withdrawal,
    /// (t1, t2]: any caller may withdraw and claims the reward balance
    PublicWithdrawal,
    /// (t2, t3]: any caller may trigger a refund to the maker
    Cancellation,
    /// past t3: no withdrawal or cancellation succeeds
    Expired,
}

impl Window {
    pub fn allows_withdrawal(&self) -> bool {
        matches!(self, Window::Withdrawal | Window::PublicWithdrawal)
    }
}

/// the three deadlines bounding an escrow's windows, in milliseconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSchedule {
    t1: u64,
    t2: u64,
    t3: u64,
}

impl WindowSchedule {
    /// all three deadlines must lie strictly in the future and strictly
    /// increase
    pub fn new(t1: u64, t2: u64, t3: u64, now: u64) -> Result<Self> {
        if t1 <= now || t2 <= t1 || t3 <= t2 {
            return Err(Error::InvalidWindowOrdering);
        }
        Ok(Self { t1, t2, t3 })
    }

    /// window containing `now`. each window is closed on its upper end
    pub fn resolve(&self, now: u64) -> Window {
        if now <= self.t1 {
            Window::Withdrawal
        } else if now <= self.t2 {
            Window::PublicWithdrawal
        } else if now <= self.t3 {
            Window::Cancellation
        } else {
            Window::Expired
        }
    }

    pub fn withdrawal_end(&self) -> u64 {
        self.t1
    }

    pub fn public_withdrawal_end(&self) -> u64 {
        self.t2
    }

    pub fn cancellation_end(&self) -> u64 {
        self.t3
    }
}
