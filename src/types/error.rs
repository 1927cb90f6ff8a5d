//! Error types
//!
//! This module defines the error taxonomy of the assistant. Parser, validator
//! and ledger errors are shown to the chat user, so their messages are written
//! for the user (in Portuguese). Sync errors stay internal and are only logged.
//!
//! # Error Categories
//!
//! - **ParseError**: the message could not be read; always recoverable
//! - **ValidationError**: a domain rule was violated by the entry
//! - **LedgerError**: a referenced transaction/category is absent, or an
//!   internal fault (overflow, invalid state) aborted the request
//! - **SyncError**: the external store is unreachable or rejected a write

use super::account::Currency;
use super::transaction::{TransactionId, TransactionStatus};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// The message could not be turned into an intent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// First word is neither a known command nor an amount
    #[error("Não entendi o comando '{verb}'.")]
    UnrecognizedVerb {
        /// The word as typed (empty for an empty message)
        verb: String,
    },

    /// An entry or budget command without a readable amount
    #[error("Informe um valor válido para '{verb}'.")]
    MissingAmount {
        /// The command verb as typed
        verb: String,
    },

    /// A word matches several categories by prefix
    #[error("A categoria '{token}' é ambígua: {}.", candidates.join(", "))]
    AmbiguousCategory {
        /// The word as typed
        token: String,
        /// Display names of the matching categories
        candidates: Vec<String>,
    },
}

/// A domain rule was violated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Zero or negative amount
    #[error("Valor inválido: {}. O valor deve ser maior que zero.", decimal_comma(amount))]
    InvalidAmount { amount: Decimal },

    /// More decimal places than the account currency allows
    #[error(
        "O valor {} tem mais de {} casas decimais.",
        decimal_comma(amount),
        max_decimals
    )]
    ExcessivePrecision { amount: Decimal, max_decimals: u32 },

    /// Date before the account was opened or after tomorrow
    #[error(
        "A data {} está fora do intervalo permitido ({} a {}).",
        date.format("%d/%m/%Y"),
        earliest.format("%d/%m/%Y"),
        latest.format("%d/%m/%Y")
    )]
    DateOutOfRange {
        date: NaiveDate,
        earliest: NaiveDate,
        latest: NaiveDate,
    },

    /// The intent does not describe an entry
    #[error("O comando '{kind}' não registra lançamentos.")]
    UnsupportedIntent { kind: String },
}

/// Amount as typed in chat, with a decimal comma
fn decimal_comma(amount: &Decimal) -> String {
    amount.to_string().replace('.', ",")
}

/// Ledger operation failure
///
/// Not-found and reference errors are shown to the user directly. Faults
/// (`DuplicateTransaction`, `InvalidState`, `CurrencyMismatch`,
/// `ArithmeticOverflow`) are logged and reported as a generic failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Transação '{reference}' não encontrada.")]
    TransactionNotFound { reference: String },

    /// An id prefix matched more than one transaction
    #[error("O id '{reference}' corresponde a {matches} transações; use mais caracteres.")]
    AmbiguousReference { reference: String, matches: usize },

    #[error("Categoria '{name}' não encontrada.")]
    CategoryNotFound { name: String },

    #[error("Transaction {id} already exists")]
    DuplicateTransaction { id: TransactionId },

    /// The transaction is not in a state that allows the operation
    #[error("Transaction {id} is {status}, cannot {operation}")]
    InvalidState {
        id: TransactionId,
        status: TransactionStatus,
        operation: String,
    },

    #[error("Currency mismatch: account uses {expected}, got {actual}")]
    CurrencyMismatch { expected: Currency, actual: Currency },

    /// A balance or category total would overflow
    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow { operation: String },
}

/// External store failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The store could not be contacted
    #[error("Store unreachable: {message}")]
    Unreachable { message: String },

    /// The store refused the write
    #[error("Store rejected the change: {message}")]
    Rejected { message: String },

    /// A stored row could not be read back
    #[error("Malformed store row{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    MalformedRow {
        /// Line number of the row (if available)
        line: Option<u64>,
        message: String,
    },
}

impl From<std::io::Error> for SyncError {
    fn from(error: std::io::Error) -> Self {
        SyncError::Unreachable {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for SyncError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        SyncError::MalformedRow {
            line,
            message: error.to_string(),
        }
    }
}

impl From<csv_async::Error> for SyncError {
    fn from(error: csv_async::Error) -> Self {
        SyncError::MalformedRow {
            line: None,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl ParseError {
    pub fn unrecognized_verb(verb: &str) -> Self {
        ParseError::UnrecognizedVerb {
            verb: verb.to_string(),
        }
    }

    pub fn missing_amount(verb: &str) -> Self {
        ParseError::MissingAmount {
            verb: verb.to_string(),
        }
    }

    pub fn ambiguous_category(token: &str, candidates: Vec<String>) -> Self {
        ParseError::AmbiguousCategory {
            token: token.to_string(),
            candidates,
        }
    }
}

impl LedgerError {
    pub fn transaction_not_found(reference: &str) -> Self {
        LedgerError::TransactionNotFound {
            reference: reference.to_string(),
        }
    }

    pub fn category_not_found(name: &str) -> Self {
        LedgerError::CategoryNotFound {
            name: name.to_string(),
        }
    }

    pub fn invalid_state(id: TransactionId, status: TransactionStatus, operation: &str) -> Self {
        LedgerError::InvalidState {
            id,
            status,
            operation: operation.to_string(),
        }
    }

    pub fn arithmetic_overflow(operation: &str) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
        }
    }

    /// Whether the error names something the user referenced
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            LedgerError::TransactionNotFound { .. }
                | LedgerError::AmbiguousReference { .. }
                | LedgerError::CategoryNotFound { .. }
        )
    }
}

impl SyncError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        SyncError::Unreachable {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        SyncError::Rejected {
            message: message.into(),
        }
    }

    pub fn malformed_row(line: Option<u64>, message: impl Into<String>) -> Self {
        SyncError::MalformedRow {
            line,
            message: message.into(),
        }
    }
}
