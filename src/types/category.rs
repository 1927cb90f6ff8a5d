//! Category types and category name matching
//!
//! Category names are compared through a folded key: Unicode compatibility
//! decomposition with combining marks dropped, lowercased, with runs of
//! non-alphanumeric characters collapsed into one space. `Alimentação`,
//! `alimentacao` and `ALIMENTAÇÃO` are the same category.

use rust_decimal::Decimal;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Bucket used when a message names no category at all
pub const OTHER_CATEGORY: &str = "outros";

/// Shortest token that may match a category by prefix
const MIN_PREFIX_LEN: usize = 3;

/// Fold a name into its comparison key
///
/// Returns an empty string when the input has no alphanumeric characters.
pub fn category_key(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;
    for ch in input.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Spending category with its derived running total
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// Display name, as first configured or typed
    pub name: String,

    /// Sum of the signed amounts of committed transactions in this category
    pub running_total: Decimal,

    /// Optional spending limit, always positive
    pub budget_limit: Option<Decimal>,
}

impl Category {
    /// Create a category with a zero total and no budget
    pub fn new(name: impl Into<String>) -> Self {
        Category {
            name: name.into(),
            running_total: Decimal::ZERO,
            budget_limit: None,
        }
    }

    pub fn with_budget(mut self, limit: Option<Decimal>) -> Self {
        self.budget_limit = limit;
        self
    }

    /// Net spending: the negated total when it is negative, zero otherwise
    pub fn spent(&self) -> Decimal {
        if self.running_total.is_sign_negative() {
            -self.running_total
        } else {
            Decimal::ZERO
        }
    }

    /// Budget consumption, if a limit is set
    pub fn budget_status(&self) -> Option<BudgetStatus> {
        self.budget_limit.map(|limit| {
            let spent = self.spent();
            BudgetStatus {
                limit,
                spent,
                remaining: limit - spent,
                exceeded: spent > limit,
            }
        })
    }
}

/// Consumption of a category budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetStatus {
    pub limit: Decimal,
    pub spent: Decimal,
    /// Negative once the budget is exceeded
    pub remaining: Decimal,
    pub exceeded: bool,
}

/// Result of matching a phrase against the known categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryMatch {
    /// Folded key equals a category key
    Exact(String),
    /// Folded key is a prefix of exactly one category key
    Prefix(String),
    /// Folded key is a prefix of several category keys
    Ambiguous(Vec<String>),
    None,
}

/// Read-only index of category names used for matching chat words
///
/// Built from a snapshot, so matching never needs the ledger lock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryIndex {
    /// (folded key, display name), sorted by key
    entries: Vec<(String, String)>,
}

impl CategoryIndex {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut entries: Vec<(String, String)> = names
            .into_iter()
            .map(|name| (category_key(name), name.to_string()))
            .filter(|(key, _)| !key.is_empty())
            .collect();
        entries.sort();
        entries.dedup_by(|a, b| a.0 == b.0);
        CategoryIndex { entries }
    }

    pub fn contains(&self, name: &str) -> bool {
        let key = category_key(name);
        self.entries.binary_search_by(|(k, _)| k.as_str().cmp(&key)).is_ok()
    }

    /// Display name of the category whose key equals the folded `name`
    pub fn display_name(&self, name: &str) -> Option<&str> {
        let key = category_key(name);
        self.entries
            .binary_search_by(|(k, _)| k.as_str().cmp(&key))
            .ok()
            .map(|i| self.entries[i].1.as_str())
    }

    /// Match a word or phrase: exact key first, then unique prefix
    pub fn resolve(&self, phrase: &str) -> CategoryMatch {
        let key = category_key(phrase);
        if key.is_empty() {
            return CategoryMatch::None;
        }
        if let Some(name) = self.display_name(&key) {
            return CategoryMatch::Exact(name.to_string());
        }
        if key.chars().count() < MIN_PREFIX_LEN {
            return CategoryMatch::None;
        }

        let mut candidates: Vec<String> = self
            .entries
            .iter()
            .filter(|(k, _)| k.starts_with(&key))
            .map(|(_, name)| name.clone())
            .collect();
        match candidates.len() {
            0 => CategoryMatch::None,
            1 => CategoryMatch::Prefix(candidates.remove(0)),
            _ => CategoryMatch::Ambiguous(candidates),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, name)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
