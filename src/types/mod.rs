//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: account identifiers, currency and the ledger snapshot
//! - `category`: categories, budget status and category name matching
//! - `transaction`: transactions, their kinds, statuses and identifiers
//! - `intent`: the typed interpretation of a chat message
//! - `error`: error types for parsing, validation, ledger and sync

pub mod account;
pub mod category;
pub mod error;
pub mod intent;
pub mod transaction;

pub use account::{AccountId, ConversationId, Currency, LedgerSnapshot, RemoteChange, SyncCursor};
pub use category::{category_key, BudgetStatus, Category, CategoryIndex, CategoryMatch, OTHER_CATEGORY};
pub use error::{LedgerError, ParseError, SyncError, ValidationError};
pub use intent::{CategoryChoice, Command, Confidence, EntryDraft, Intent, IntentKind, TransactionRef};
pub use transaction::{PaymentMethod, Transaction, TransactionId, TransactionKind, TransactionStatus};
