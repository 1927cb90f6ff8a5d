//! In-memory spreadsheet store
//!
//! Behaves like the real sheet (append-only rows, cursor = row count) and can
//! be switched offline or told to fail a number of pushes, which is how the
//! retry and degraded-mode paths are exercised.

use super::{Ack, SpreadsheetStore};
use crate::types::{AccountId, RemoteChange, SyncCursor, SyncError, Transaction};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct MemorySheet {
    /// Rows per account, in append order
    rows: DashMap<AccountId, Vec<Transaction>>,
    offline: AtomicBool,
    /// Pushes still to fail before succeeding again
    failures_left: AtomicUsize,
    /// Push attempts, successful or not
    attempts: AtomicUsize,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `Unreachable` until switched back
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the next `count` pushes
    pub fn fail_next_pushes(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn push_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Stored rows of an account
    pub fn rows(&self, account: AccountId) -> Vec<Transaction> {
        self.rows
            .get(&account)
            .map(|rows| rows.value().clone())
            .unwrap_or_default()
    }

    fn check_reachable(&self) -> Result<(), SyncError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::unreachable("sheet offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl SpreadsheetStore for MemorySheet {
    async fn push(&self, account: AccountId, transaction: &Transaction) -> Result<Ack, SyncError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SyncError::unreachable("injected push failure"));
        }

        let mut rows = self.rows.entry(account).or_default();
        rows.push(transaction.clone());
        Ok(Ack {
            cursor: SyncCursor::new(rows.len() as u64),
        })
    }

    async fn pull_since(
        &self,
        account: AccountId,
        cursor: SyncCursor,
    ) -> Result<Vec<RemoteChange>, SyncError> {
        self.check_reachable()?;

        let Some(rows) = self.rows.get(&account) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .enumerate()
            .skip(cursor.position() as usize)
            .map(|(index, transaction)| RemoteChange {
                cursor: SyncCursor::new(index as u64 + 1),
                transaction: transaction.clone(),
            })
            .collect())
    }
}
