//! Core traits at the seams of the ledger
//!
//! - [`Clock`] supplies "today" to the parser and validator, so tests can pin
//!   the date.
//! - [`CommitObserver`] is notified of every locally committed transaction
//!   version while the account is still locked, which is what keeps the sync
//!   push order equal to the commit order.

use crate::types::{AccountId, Transaction};
use chrono::{Days, NaiveDate};
use std::sync::Mutex;

/// Source of the current date
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    today: Mutex<NaiveDate>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        ManualClock {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        *self.today.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = today;
    }

    pub fn advance_days(&self, days: u64) {
        let mut today = self.today.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(next) = today.checked_add_days(Days::new(days)) {
            *today = next;
        }
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Receives every transaction version committed by the ledger
///
/// Called with the account lock held: implementations must not block and
/// must not call back into the registry for the same account.
pub trait CommitObserver: Send + Sync {
    /// A transaction was committed or reversed locally
    fn on_commit(&self, account: AccountId, transaction: &Transaction);
}

/// Observer that discards notifications
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl CommitObserver for NoopObserver {
    fn on_commit(&self, _account: AccountId, _transaction: &Transaction) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());

        clock.advance_days(1);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());

        clock.set(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }
}
