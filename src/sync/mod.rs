//! Sync adapter
//!
//! Keeps the external spreadsheet in step with the ledgers. The ledger is
//! authoritative and updated immediately; the store is eventually consistent:
//!
//! ```text
//!            commit (under account lock)
//! Ledger ───────────────────────────────▶ PushQueue ──push──▶ SpreadsheetStore
//!   ▲                                        │ retry/backoff       │
//!   │ confirm_sync(cursor) ◀─────────────────┘                     │
//!   └──────────── hydrate: pull_since(cursor) ◀────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`SpreadsheetStore`] - the store interface (`push`, `pull_since`)
//! - [`MemorySheet`] - in-memory store with failure injection
//! - [`PushQueue`] - per-account FIFO write-behind workers
//! - [`hydrate`] - read-through load of an account's remote history

pub mod memory;
pub mod push_queue;

pub use memory::MemorySheet;
pub use push_queue::{PushQueue, RetryPolicy};

use crate::core::LedgerRegistry;
use crate::types::{AccountId, RemoteChange, SyncCursor, SyncError, Transaction};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Shared store handle
pub type StoreRef = Arc<dyn SpreadsheetStore>;

/// Acknowledgement of a stored transaction version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// Store position of the written row
    pub cursor: SyncCursor,
}

/// External spreadsheet holding one row per transaction version
///
/// Rows are append-only; for a given id the last row wins.
#[async_trait]
pub trait SpreadsheetStore: Send + Sync {
    /// Append one transaction version
    async fn push(&self, account: AccountId, transaction: &Transaction) -> Result<Ack, SyncError>;

    /// Every version stored after `cursor`, in store order
    async fn pull_since(
        &self,
        account: AccountId,
        cursor: SyncCursor,
    ) -> Result<Vec<RemoteChange>, SyncError>;
}

/// Pull an account's remote history into its ledger
///
/// An account that was never hydrated pulls its whole history: push acks may
/// already have moved its cursor past rows it has not read. Known ids merge
/// idempotently. A hydrated account pulls from its last confirmed cursor.
/// On success the account is marked hydrated; on failure the ledger is left
/// as it was so the next access tries again.
///
/// # Returns
///
/// The number of remote changes that altered the ledger.
pub async fn hydrate(
    registry: &LedgerRegistry,
    store: &dyn SpreadsheetStore,
    account: AccountId,
) -> Result<usize, SyncError> {
    let since = if registry.is_hydrated(account) {
        registry.last_sync_cursor(account)
    } else {
        SyncCursor::START
    };
    let changes = store.pull_since(account, since).await?;
    let pulled = changes.len();
    let changed = registry.ingest_remote(account, changes);

    info!(account, pulled, changed, since = %since, "Account hydrated");
    Ok(changed)
}
