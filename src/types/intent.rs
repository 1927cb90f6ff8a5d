//! Intent types
//!
//! An [`Intent`] is the parser's typed reading of one chat message. It is
//! never persisted: entries go through the validator to become transactions,
//! everything else is routed directly by the dispatcher.

use super::transaction::{PaymentMethod, TransactionKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// How sure the parser is about an entry
///
/// Ordered so that `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Confidence {
    /// No command verb: the message started with an amount
    Low,
    /// Verb and amount recognized, category missing or unknown
    Medium,
    /// Verb, amount and a known category
    High,
}

/// Category reading of an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryChoice {
    /// Display name of a known category
    Known(String),
    /// A free word that may name a new category
    Hint(String),
    /// Nothing category-like in the message
    Fallback,
}

/// Expense or income as read from the message
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub kind: TransactionKind,
    /// Raw parsed amount; may be zero or negative, the validator decides
    pub amount: Decimal,
    pub category: CategoryChoice,
    pub date: Option<NaiveDate>,
    pub note: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    /// False when the message started with an amount
    pub explicit_verb: bool,
}

/// Reference to a transaction in an undo command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionRef {
    /// Most recently applied transaction, reversed or not
    Latest,
    /// Full id or id prefix, as typed
    Id(String),
}

/// What a message asks for
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddEntry(EntryDraft),
    QueryBalance,
    /// One category when named, all of them otherwise
    ListCategory { name: Option<String> },
    Undo { target: TransactionRef },
    /// `None` limit removes the budget
    SetBudget { category: String, limit: Option<Decimal> },
    /// `None` uses the configured default
    ListRecent { count: Option<usize> },
    Confirm,
    Cancel,
    Help,
}

/// Flat discriminant of [`Command`], used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentKind {
    AddExpense,
    AddIncome,
    QueryBalance,
    ListCategory,
    Undo,
    SetBudget,
    ListRecent,
    Confirm,
    Cancel,
    Help,
}

/// Typed interpretation of a chat message
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub command: Command,
    pub raw_text: String,
    pub confidence: Confidence,
}

impl Intent {
    pub fn new(command: Command, raw_text: impl Into<String>, confidence: Confidence) -> Self {
        Intent {
            command,
            raw_text: raw_text.into(),
            confidence,
        }
    }

    pub fn kind(&self) -> IntentKind {
        match &self.command {
            Command::AddEntry(draft) => match draft.kind {
                TransactionKind::Expense => IntentKind::AddExpense,
                TransactionKind::Income => IntentKind::AddIncome,
            },
            Command::QueryBalance => IntentKind::QueryBalance,
            Command::ListCategory { .. } => IntentKind::ListCategory,
            Command::Undo { .. } => IntentKind::Undo,
            Command::SetBudget { .. } => IntentKind::SetBudget,
            Command::ListRecent { .. } => IntentKind::ListRecent,
            Command::Confirm => IntentKind::Confirm,
            Command::Cancel => IntentKind::Cancel,
            Command::Help => IntentKind::Help,
        }
    }

    /// The entry draft, for add-expense and add-income intents
    pub fn entry(&self) -> Option<&EntryDraft> {
        match &self.command {
            Command::AddEntry(draft) => Some(draft),
            _ => None,
        }
    }
}
