//! Core business logic module
//!
//! This module contains the ledger-consistency core:
//! - `traits` - Seams for the clock and commit notifications
//! - `validator` - Domain rules an entry must pass before the ledger sees it
//! - `ledger` - One account's transactions, balance and category totals
//! - `transaction_store` - Commit-ordered transaction storage and id references
//! - `registry` - Concurrent map of ledgers with a serialized path per account

pub mod ledger;
pub mod registry;
pub mod traits;
pub mod transaction_store;
pub mod validator;

pub use ledger::{AccountTemplate, ApplyOutcome, Ledger, RemoteOutcome, UndoOutcome};
pub use registry::LedgerRegistry;
pub use traits::{Clock, CommitObserver, ManualClock, NoopObserver, SystemClock};
pub use transaction_store::TransactionStore;
pub use validator::{
    revalidate, validate, validate_budget_limit, ConfirmationReason, PendingEntry,
    PrecisionPolicy, Validation, ValidationContext,
};
