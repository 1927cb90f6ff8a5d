//! Rust Finance Bot Library
//! # Overview
//!
//! A chat-driven personal finance ledger: free-form Portuguese messages such
//! as `gasto 45,90 transporte` are parsed into intents, validated, applied to
//! an authoritative in-memory ledger per account and mirrored to an external
//! spreadsheet in the background.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Transaction, Category, Intent, errors)
//! - [`parser`] - Message Parser: raw text to typed [`types::Intent`]
//! - [`core`] - Business logic components:
//!   - [`core::validator`] - Domain rules and the confirmation gate
//!   - [`core::ledger`] - One account's balance, categories and history
//!   - [`core::registry`] - Concurrent ledgers with a serialized path per account
//! - [`sync`] - Sync Adapter: store interface, write-behind push queue, hydration
//! - [`io`] - CSV spreadsheet store
//! - [`dispatch`] - Command Dispatcher: message in, reply out
//! - [`settings`] - Configuration file and environment
//! - [`cli`] - CLI arguments and the stdin/stdout transport
//!
//! # Commands
//!
//! - **gasto / receita**: record an expense or an income
//! - **saldo**: current balance
//! - **categoria [nome]**: totals per category
//! - **extrato [n]**: latest entries
//! - **desfazer [id]**: reverse the latest or a given entry (idempotent)
//! - **orçamento <categoria> <valor|off>**: set or remove a budget limit
//! - **sim / não**: answer a confirmation prompt
//!
//! # Invariant
//!
//! For every account, after every operation:
//! `balance == opening_balance + Σ signed amounts of committed transactions`,
//! and each category total is the same sum restricted to that category.

// Module declarations
pub mod cli;
pub mod core;
pub mod dispatch;
pub mod io;
pub mod parser;
pub mod settings;
pub mod sync;
pub mod types;

pub use core::{Ledger, LedgerRegistry};
pub use dispatch::{Dispatcher, Response};
pub use types::{
    Category, Command, Intent, LedgerError, ParseError, SyncError, Transaction, TransactionId,
    TransactionKind, TransactionStatus, ValidationError,
};
