//! Thread-safe ledger registry
//!
//! This module provides the `LedgerRegistry`, which owns one [`Ledger`] per
//! account using concurrent data structures.
//!
//! # Design
//!
//! The registry uses `DashMap` (a concurrent HashMap) to provide fine-grained
//! locking: all mutations for one account go through that account's entry
//! lock, while different accounts proceed independently. Ledgers are created
//! on first access from the configured [`AccountTemplate`].
//!
//! # Commit Order
//!
//! `apply` and `undo` notify the [`CommitObserver`] while the entry lock is
//! still held, so observers see an account's transactions in commit order.

use super::ledger::{AccountTemplate, ApplyOutcome, Ledger, RemoteOutcome, UndoOutcome};
use super::traits::CommitObserver;
use super::validator::{PrecisionPolicy, ValidationContext};
use crate::types::{
    AccountId, Category, LedgerError, LedgerSnapshot, RemoteChange, SyncCursor, Transaction,
    TransactionRef,
};
use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::warn;

/// Concurrent map of account ledgers
#[derive(Debug)]
pub struct LedgerRegistry {
    /// Ledgers keyed by account
    ///
    /// DashMap's sharded locks serialize access per account.
    ledgers: DashMap<AccountId, Ledger>,

    /// Settings new ledgers start from
    template: AccountTemplate,
}

impl LedgerRegistry {
    pub fn new(template: AccountTemplate) -> Self {
        Self {
            ledgers: DashMap::new(),
            template,
        }
    }

    pub fn template(&self) -> &AccountTemplate {
        &self.template
    }

    /// Run a read-only closure against an account's ledger
    ///
    /// The ledger is created if the account has not been seen yet.
    pub fn read<F, R>(&self, account: AccountId, f: F) -> R
    where
        F: FnOnce(&Ledger) -> R,
    {
        if let Some(ledger) = self.ledgers.get(&account) {
            return f(ledger.value());
        }
        let entry = self
            .ledgers
            .entry(account)
            .or_insert_with(|| Ledger::new(account, &self.template));
        f(entry.value())
    }

    /// Update a ledger using a closure
    ///
    /// The closure runs while holding the account's entry lock, so no other
    /// task can observe a partially-updated ledger.
    ///
    /// # Arguments
    ///
    /// * `account` - The account whose ledger is updated
    /// * `f` - Closure receiving the ledger mutably
    ///
    /// # Returns
    ///
    /// Whatever the closure returns.
    pub fn update<F, R>(&self, account: AccountId, f: F) -> R
    where
        F: FnOnce(&mut Ledger) -> R,
    {
        let mut entry = self
            .ledgers
            .entry(account)
            .or_insert_with(|| Ledger::new(account, &self.template));
        f(entry.value_mut())
    }

    /// Apply a transaction and notify the observer under the same lock
    pub fn apply(
        &self,
        account: AccountId,
        transaction: Transaction,
        observer: &dyn CommitObserver,
    ) -> Result<ApplyOutcome, LedgerError> {
        self.update(account, |ledger| {
            let outcome = ledger.apply(transaction)?;
            observer.on_commit(account, &outcome.transaction);
            Ok(outcome)
        })
    }

    /// Undo a transaction; only an actual reversal notifies the observer
    pub fn undo(
        &self,
        account: AccountId,
        target: &TransactionRef,
        observer: &dyn CommitObserver,
    ) -> Result<UndoOutcome, LedgerError> {
        self.update(account, |ledger| {
            let outcome = ledger.undo(target)?;
            if let UndoOutcome::Reversed { transaction, .. } = &outcome {
                observer.on_commit(account, transaction);
            }
            Ok(outcome)
        })
    }

    pub fn query_balance(&self, account: AccountId) -> Decimal {
        self.read(account, Ledger::query_balance)
    }

    pub fn query_category(&self, account: AccountId, name: &str) -> Result<Category, LedgerError> {
        self.read(account, |ledger| ledger.query_category(name))
    }

    pub fn categories(&self, account: AccountId) -> Vec<Category> {
        self.read(account, Ledger::categories)
    }

    pub fn list_recent(&self, account: AccountId, count: usize) -> Vec<Transaction> {
        self.read(account, |ledger| ledger.list_recent(count))
    }

    pub fn set_budget(
        &self,
        account: AccountId,
        name: &str,
        limit: Option<Decimal>,
    ) -> Result<Category, LedgerError> {
        self.update(account, |ledger| ledger.set_budget(name, limit))
    }

    pub fn snapshot(&self, account: AccountId) -> LedgerSnapshot {
        self.read(account, Ledger::snapshot)
    }

    pub fn validation_context(
        &self,
        account: AccountId,
        today: NaiveDate,
        precision: PrecisionPolicy,
    ) -> ValidationContext {
        self.read(account, |ledger| ledger.validation_context(today, precision))
    }

    pub fn is_hydrated(&self, account: AccountId) -> bool {
        self.ledgers
            .get(&account)
            .is_some_and(|ledger| ledger.is_hydrated())
    }

    pub fn last_sync_cursor(&self, account: AccountId) -> SyncCursor {
        self.read(account, Ledger::last_sync_cursor)
    }

    /// Merge remote changes into an account and mark it hydrated
    ///
    /// Changes the ledger refuses are logged and skipped.
    ///
    /// # Returns
    ///
    /// The number of changes that altered the ledger.
    pub fn ingest_remote(&self, account: AccountId, changes: Vec<RemoteChange>) -> usize {
        self.update(account, |ledger| {
            let mut changed = 0;
            for change in changes {
                let id = change.transaction.id;
                match ledger.ingest_remote(change) {
                    Ok(RemoteOutcome::Unchanged) => {}
                    Ok(_) => changed += 1,
                    Err(e) => warn!(account, id = %id, error = %e, "Skipping remote change"),
                }
            }
            ledger.mark_hydrated();
            changed
        })
    }

    pub fn confirm_sync(&self, account: AccountId, cursor: SyncCursor) {
        self.update(account, |ledger| ledger.confirm_sync(cursor));
    }

    /// Accounts with a ledger, in no particular order
    pub fn accounts(&self) -> Vec<AccountId> {
        self.ledgers.iter().map(|entry| *entry.key()).collect()
    }
}
