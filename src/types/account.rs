//! Account-related types
//!
//! This module defines the per-account ledger snapshot, the account currency
//! and the opaque cursor used to track how far the external store has been
//! synchronized.

use super::category::{category_key, Category, CategoryIndex};
use super::transaction::Transaction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Conversation identifier as delivered by the chat transport
pub type ConversationId = i64;

/// Account identifier
///
/// Every conversation owns exactly one account, so the two share a type.
pub type AccountId = ConversationId;

/// Currency of an account
///
/// An account has a single currency fixed at creation time. Every transaction
/// applied to it must carry the same currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Brl,
    Usd,
    Eur,
}

impl Currency {
    /// ISO 4217 code
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Brl => "BRL",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    /// Number of fraction digits an amount may carry
    pub const fn minor_units(self) -> u32 {
        match self {
            Currency::Brl | Currency::Usd | Currency::Eur => 2,
        }
    }

    /// Symbol used when rendering amounts for the user
    pub const fn symbol(self) -> &'static str {
        match self {
            Currency::Brl => "R$",
            Currency::Usd => "US$",
            Currency::Eur => "€",
        }
    }

    const fn decimal_separator(self) -> char {
        match self {
            Currency::Brl | Currency::Eur => ',',
            Currency::Usd => '.',
        }
    }

    /// Render an amount for chat output, e.g. `R$ 45,90` or `-R$ 3,00`
    pub fn format(self, amount: Decimal) -> String {
        let sign = if amount.is_sign_negative() && !amount.is_zero() {
            "-"
        } else {
            ""
        };
        let digits = format!(
            "{:.prec$}",
            amount.abs().round_dp(self.minor_units()),
            prec = self.minor_units() as usize
        );
        let digits = if self.decimal_separator() == '.' {
            digits
        } else {
            digits.replace('.', &self.decimal_separator().to_string())
        };
        format!("{sign}{} {digits}", self.symbol())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BRL" => Ok(Currency::Brl),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(format!("unsupported currency '{other}'")),
        }
    }
}

/// Position in the external store's change log
///
/// Cursors are opaque to the ledger: it only stores the highest one it has
/// seen and hands it back when pulling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SyncCursor(u64);

impl SyncCursor {
    /// Cursor before the first change
    pub const START: SyncCursor = SyncCursor(0);

    pub const fn new(position: u64) -> Self {
        SyncCursor(position)
    }

    pub const fn position(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SyncCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One transaction version read back from the external store
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteChange {
    /// Store position of this version
    pub cursor: SyncCursor,
    pub transaction: Transaction,
}

/// Derived state of one account
///
/// The snapshot is owned by the ledger and only ever changes through
/// [`Ledger`](crate::core::Ledger) operations. Callers receive clones.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    /// Balance configured at account creation, before any transaction
    pub opening_balance: Decimal,

    /// Opening balance plus the signed amounts of all committed transactions
    pub balance: Decimal,

    /// Categories keyed by their folded name (see [`category_key`])
    pub categories: BTreeMap<String, Category>,

    /// Highest store cursor confirmed for this account
    pub last_sync_cursor: SyncCursor,
}

impl LedgerSnapshot {
    /// Create a snapshot with the given opening balance and seed categories
    ///
    /// Seed categories start with a zero running total; duplicates (by folded
    /// name) keep the first occurrence.
    pub fn new(opening_balance: Decimal, categories: impl IntoIterator<Item = Category>) -> Self {
        let mut map = BTreeMap::new();
        for category in categories {
            map.entry(category_key(&category.name))
                .or_insert(Category {
                    running_total: Decimal::ZERO,
                    ..category
                });
        }

        LedgerSnapshot {
            opening_balance,
            balance: opening_balance,
            categories: map,
            last_sync_cursor: SyncCursor::START,
        }
    }

    /// Look up a category by display name, ignoring case and accents
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.get(&category_key(name))
    }

    /// Build the matching index used by the parser and validator
    pub fn category_index(&self) -> CategoryIndex {
        CategoryIndex::new(self.categories.values().map(|c| c.name.as_str()))
    }
}
