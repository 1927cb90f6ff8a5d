//! Transaction-related types
//!
//! This module defines transaction kinds, statuses, identifiers and the
//! transaction record itself.

use super::account::Currency;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Number of hex characters shown to users as a short id
const SHORT_ID_LEN: usize = 8;

/// Opaque unique transaction identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        TransactionId(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        TransactionId(uuid)
    }

    /// First characters of the simple (unhyphenated) form, used in chat replies
    pub fn short(&self) -> String {
        let simple = self.0.simple().to_string();
        simple[..SHORT_ID_LEN].to_string()
    }

    /// Whether `prefix` (hyphens ignored, case-insensitive) starts this id
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        let wanted: String = prefix
            .chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        !wanted.is_empty() && self.0.simple().to_string().starts_with(&wanted)
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(TransactionId)
    }
}

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money leaving the account; contributes a negative signed amount
    Expense,

    /// Money entering the account; contributes a positive signed amount
    Income,
}

impl TransactionKind {
    /// Apply this kind's sign to a positive amount
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            TransactionKind::Expense => -amount,
            TransactionKind::Income => amount,
        }
    }

    /// Verb that creates this kind in chat
    pub const fn verb(self) -> &'static str {
        match self {
            TransactionKind::Expense => "gasto",
            TransactionKind::Income => "receita",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Expense => "expense",
            TransactionKind::Income => "income",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "expense" => Ok(TransactionKind::Expense),
            "income" => Ok(TransactionKind::Income),
            other => Err(format!("invalid transaction kind '{other}'")),
        }
    }
}

/// Lifecycle state of a transaction
///
/// `Pending -> Committed -> Reversed` and `Pending -> Rejected`. Both
/// `Reversed` and `Rejected` are terminal. Only committed transactions
/// contribute to balances and category totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Committed,
    Reversed,
    Rejected,
}

impl TransactionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Committed => "committed",
            TransactionStatus::Reversed => "reversed",
            TransactionStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, TransactionStatus::Reversed | TransactionStatus::Rejected)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "committed" => Ok(TransactionStatus::Committed),
            "reversed" => Ok(TransactionStatus::Reversed),
            "rejected" => Ok(TransactionStatus::Rejected),
            other => Err(format!("invalid transaction status '{other}'")),
        }
    }
}

/// How a transaction was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Credit,
    Debit,
    Cash,
    Pix,
    Transfer,
    Boleto,
}

impl PaymentMethod {
    /// Recognize a folded chat word (see [`category_key`](super::category_key))
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "cartao" | "card" => Some(PaymentMethod::Card),
            "credito" | "credit" => Some(PaymentMethod::Credit),
            "debito" | "debit" => Some(PaymentMethod::Debit),
            "dinheiro" | "cash" | "especie" => Some(PaymentMethod::Cash),
            "pix" => Some(PaymentMethod::Pix),
            "transferencia" | "ted" | "doc" | "transfer" => Some(PaymentMethod::Transfer),
            "boleto" => Some(PaymentMethod::Boleto),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Debit => "debit",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Boleto => "boleto",
        }
    }

    /// Label shown in chat replies
    pub const fn label(self) -> &'static str {
        match self {
            PaymentMethod::Card => "Cartão",
            PaymentMethod::Credit => "Crédito",
            PaymentMethod::Debit => "Débito",
            PaymentMethod::Cash => "Dinheiro",
            PaymentMethod::Pix => "Pix",
            PaymentMethod::Transfer => "Transferência",
            PaymentMethod::Boleto => "Boleto",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" => Ok(PaymentMethod::Card),
            "credit" => Ok(PaymentMethod::Credit),
            "debit" => Ok(PaymentMethod::Debit),
            "cash" => Ok(PaymentMethod::Cash),
            "pix" => Ok(PaymentMethod::Pix),
            "transfer" => Ok(PaymentMethod::Transfer),
            "boleto" => Ok(PaymentMethod::Boleto),
            other => Err(format!("invalid payment method '{other}'")),
        }
    }
}

/// A financial transaction
///
/// `amount` is always positive; the sign comes from `kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency: Currency,
    /// Display name of the category
    pub category: String,
    pub date: NaiveDate,
    pub note: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub status: TransactionStatus,
}

impl Transaction {
    /// Amount with the kind's sign applied
    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(self.amount)
    }

    pub fn is_committed(&self) -> bool {
        self.status == TransactionStatus::Committed
    }

    /// Chat command that recreates this transaction, e.g. `gasto 45,90 transporte 03/05/2025`
    pub fn command_text(&self) -> String {
        let amount = self.amount.normalize().to_string().replace('.', ",");
        format!(
            "{} {} {} {}",
            self.kind.verb(),
            amount,
            self.category,
            self.date.format("%d/%m/%Y")
        )
    }
}
