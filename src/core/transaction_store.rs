//! Transaction storage for one account
//!
//! This module provides the TransactionStore component that keeps every
//! transaction the ledger has seen, in commit order, and resolves the
//! references users type when undoing (`latest`, full id or id prefix).
//!
//! # Duplicate Handling
//!
//! Ids are unique: inserting an id that is already present is an error and
//! leaves the store unchanged.

use crate::types::{LedgerError, Transaction, TransactionId, TransactionRef};
use std::collections::HashMap;

/// Shortest id prefix accepted as a reference
pub const MIN_ID_PREFIX: usize = 4;

/// Transaction store in commit order
#[derive(Debug, Clone, Default)]
pub struct TransactionStore {
    /// Ids in the order they were inserted
    order: Vec<TransactionId>,

    /// Map of transaction ID to transaction
    transactions: HashMap<TransactionId, Transaction>,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: TransactionId) -> bool {
        self.transactions.contains_key(&id)
    }

    pub fn get(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions.get(&id)
    }

    /// Get a mutable reference to a stored transaction
    ///
    /// Used for status transitions; the id itself must not be changed.
    pub fn get_mut(&mut self, id: TransactionId) -> Option<&mut Transaction> {
        self.transactions.get_mut(&id)
    }

    /// Store a transaction at the end of the commit order
    ///
    /// # Errors
    ///
    /// `DuplicateTransaction` if the id is already stored.
    pub fn insert(&mut self, transaction: Transaction) -> Result<(), LedgerError> {
        let id = transaction.id;
        if self.transactions.contains_key(&id) {
            return Err(LedgerError::DuplicateTransaction { id });
        }
        self.order.push(id);
        self.transactions.insert(id, transaction);
        Ok(())
    }

    /// Resolve a user reference to a stored id
    ///
    /// # Arguments
    ///
    /// * `reference` - `Latest` for the most recently stored transaction,
    ///   whatever its status, or a full id or a prefix of at least
    ///   [`MIN_ID_PREFIX`] hex characters. A repeated `Latest` undo therefore
    ///   lands on the same transaction; older ones are undone by id.
    ///
    /// # Errors
    ///
    /// * `TransactionNotFound` if nothing matches (or the prefix is too short)
    /// * `AmbiguousReference` if a prefix matches several transactions
    pub fn resolve(&self, reference: &TransactionRef) -> Result<TransactionId, LedgerError> {
        match reference {
            TransactionRef::Latest => self
                .order
                .last()
                .copied()
                .ok_or_else(|| LedgerError::transaction_not_found("último")),
            TransactionRef::Id(text) => {
                if let Ok(id) = text.parse::<TransactionId>() {
                    return if self.contains(id) {
                        Ok(id)
                    } else {
                        Err(LedgerError::transaction_not_found(text))
                    };
                }

                let hex_len = text.chars().filter(|c| *c != '-').count();
                if hex_len < MIN_ID_PREFIX {
                    return Err(LedgerError::transaction_not_found(text));
                }

                let matches: Vec<TransactionId> = self
                    .order
                    .iter()
                    .copied()
                    .filter(|id| id.matches_prefix(text))
                    .collect();
                match matches.as_slice() {
                    [] => Err(LedgerError::transaction_not_found(text)),
                    [id] => Ok(*id),
                    _ => Err(LedgerError::AmbiguousReference {
                        reference: text.clone(),
                        matches: matches.len(),
                    }),
                }
            }
        }
    }

    /// Up to `count` committed transactions, most recent first
    pub fn recent_committed(&self, count: usize) -> Vec<Transaction> {
        self.order
            .iter()
            .rev()
            .filter_map(|id| self.transactions.get(id))
            .filter(|tx| tx.is_committed())
            .take(count)
            .cloned()
            .collect()
    }

    /// All transactions in commit order
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.order.iter().filter_map(|id| self.transactions.get(id))
    }
}
