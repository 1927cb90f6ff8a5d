//! Ledger engine
//!
//! This module provides the [`Ledger`]: the authoritative in-memory record of
//! one account's transactions and the totals derived from them.
//!
//! The ledger enforces:
//! - only `Pending` transactions in the account currency can be applied
//! - transaction ids are unique
//! - `balance == opening_balance + Σ committed signed amounts`, and likewise per
//!   category, after every operation
//! - undo is idempotent: reversing twice reports `AlreadyReversed`
//!
//! Every mutation computes all new values with checked arithmetic first and
//! only then writes them, so a failed operation leaves no partial state.

use super::transaction_store::TransactionStore;
use super::validator::{PrecisionPolicy, ValidationContext};
use crate::types::{
    category_key, AccountId, BudgetStatus, Category, CategoryIndex, Currency, LedgerError,
    LedgerSnapshot, RemoteChange, SyncCursor, Transaction, TransactionRef, TransactionStatus,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

/// Settings every new account starts from
#[derive(Debug, Clone, PartialEq)]
pub struct AccountTemplate {
    pub currency: Currency,
    pub opening_balance: Decimal,
    pub opened_on: NaiveDate,
    /// Seed categories (with optional budget limits)
    pub categories: Vec<Category>,
}

/// Result of a successful apply
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    /// The transaction as committed
    pub transaction: Transaction,
    pub new_balance: Decimal,
    /// Running total of the transaction's category after the apply
    pub category_total: Decimal,
    pub budget: Option<BudgetStatus>,
}

/// Result of an undo
#[derive(Debug, Clone, PartialEq)]
pub enum UndoOutcome {
    /// The transaction was committed and is now reversed
    Reversed {
        transaction: Transaction,
        new_balance: Decimal,
        category_total: Decimal,
    },
    /// The transaction had already been reversed; nothing changed
    AlreadyReversed {
        transaction: Transaction,
        balance: Decimal,
    },
}

/// What ingesting a remote change did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// A transaction unknown locally was committed
    Applied,
    /// A locally committed transaction was reversed remotely
    Reversed,
    /// A transaction unknown locally was recorded without effect on totals
    Recorded,
    /// Already known in this or a later state
    Unchanged,
}

/// Ledger of one account
#[derive(Debug, Clone)]
pub struct Ledger {
    account: AccountId,
    currency: Currency,
    opened_on: NaiveDate,
    snapshot: LedgerSnapshot,
    transactions: TransactionStore,
    /// Whether the remote history has been pulled in
    hydrated: bool,
}

impl Ledger {
    /// Create an empty ledger for an account
    ///
    /// # Arguments
    ///
    /// * `account` - The account this ledger belongs to
    /// * `template` - Currency, opening balance, opening date and seed categories
    pub fn new(account: AccountId, template: &AccountTemplate) -> Self {
        Ledger {
            account,
            currency: template.currency,
            opened_on: template.opened_on,
            snapshot: LedgerSnapshot::new(template.opening_balance, template.categories.clone()),
            transactions: TransactionStore::new(),
            hydrated: false,
        }
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn opened_on(&self) -> NaiveDate {
        self.opened_on
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub fn mark_hydrated(&mut self) {
        self.hydrated = true;
    }

    /// Apply a validated transaction
    ///
    /// Commits the transaction, moving the balance and its category total
    /// together. A category that does not exist yet is created.
    ///
    /// # Arguments
    ///
    /// * `transaction` - A `Pending` transaction, usually from the validator
    ///
    /// # Returns
    ///
    /// * `Ok(ApplyOutcome)` with the committed transaction and new totals
    /// * `Err(LedgerError)` if the transaction was refused; nothing changed
    ///
    /// # Errors
    ///
    /// * `InvalidState` if the transaction is not `Pending`
    /// * `CurrencyMismatch` if it is not in the account currency
    /// * `DuplicateTransaction` if its id was already applied
    /// * `ArithmeticOverflow` if a total would overflow
    pub fn apply(&mut self, transaction: Transaction) -> Result<ApplyOutcome, LedgerError> {
        if transaction.status != TransactionStatus::Pending {
            return Err(LedgerError::invalid_state(
                transaction.id,
                transaction.status,
                "apply",
            ));
        }
        let outcome = self.commit(transaction)?;

        info!(
            account = self.account,
            id = %outcome.transaction.id,
            kind = outcome.transaction.kind.as_str(),
            amount = %outcome.transaction.amount,
            category = %outcome.transaction.category,
            balance = %outcome.new_balance,
            "Transaction committed"
        );
        Ok(outcome)
    }

    fn commit(&mut self, mut transaction: Transaction) -> Result<ApplyOutcome, LedgerError> {
        if transaction.currency != self.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: self.currency,
                actual: transaction.currency,
            });
        }
        if self.transactions.contains(transaction.id) {
            return Err(LedgerError::DuplicateTransaction { id: transaction.id });
        }

        let key = category_key(&transaction.category);
        let mut category = self
            .snapshot
            .categories
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Category::new(transaction.category.trim()));

        // Compute everything first
        let signed = transaction.signed_amount();
        let new_balance = self
            .snapshot
            .balance
            .checked_add(signed)
            .ok_or_else(|| LedgerError::arithmetic_overflow("balance"))?;
        let new_total = category
            .running_total
            .checked_add(signed)
            .ok_or_else(|| LedgerError::arithmetic_overflow("category total"))?;

        // Then commit together
        category.running_total = new_total;
        transaction.category = category.name.clone();
        transaction.status = TransactionStatus::Committed;
        self.transactions.insert(transaction.clone())?;
        self.snapshot.balance = new_balance;
        let budget = category.budget_status();
        self.snapshot.categories.insert(key, category);

        Ok(ApplyOutcome {
            transaction,
            new_balance,
            category_total: new_total,
            budget,
        })
    }

    /// Reverse a committed transaction
    ///
    /// # Arguments
    ///
    /// * `target` - Latest applied transaction, full id or id prefix
    ///
    /// # Returns
    ///
    /// * `Ok(UndoOutcome::Reversed)` with the new totals
    /// * `Ok(UndoOutcome::AlreadyReversed)` if a previous undo got there first
    ///
    /// # Errors
    ///
    /// * `TransactionNotFound` or `AmbiguousReference` for bad references
    /// * `InvalidState` if the transaction is neither committed nor reversed
    /// * `ArithmeticOverflow` if a total would overflow
    pub fn undo(&mut self, target: &TransactionRef) -> Result<UndoOutcome, LedgerError> {
        let id = self.transactions.resolve(target)?;
        let transaction = self
            .transactions
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::transaction_not_found(&id.to_string()))?;

        match transaction.status {
            TransactionStatus::Reversed => {
                debug!(account = self.account, id = %id, "Transaction already reversed");
                return Ok(UndoOutcome::AlreadyReversed {
                    transaction,
                    balance: self.snapshot.balance,
                });
            }
            TransactionStatus::Committed => {}
            status => return Err(LedgerError::invalid_state(id, status, "undo")),
        }

        let (transaction, new_balance, category_total) = self.reverse(transaction)?;
        info!(
            account = self.account,
            id = %id,
            balance = %new_balance,
            "Transaction reversed"
        );
        Ok(UndoOutcome::Reversed {
            transaction,
            new_balance,
            category_total,
        })
    }

    fn reverse(
        &mut self,
        mut transaction: Transaction,
    ) -> Result<(Transaction, Decimal, Decimal), LedgerError> {
        let key = category_key(&transaction.category);
        let current_total = self
            .snapshot
            .categories
            .get(&key)
            .map(|c| c.running_total)
            .ok_or_else(|| LedgerError::category_not_found(&transaction.category))?;

        let signed = transaction.signed_amount();
        let new_balance = self
            .snapshot
            .balance
            .checked_sub(signed)
            .ok_or_else(|| LedgerError::arithmetic_overflow("balance"))?;
        let new_total = current_total
            .checked_sub(signed)
            .ok_or_else(|| LedgerError::arithmetic_overflow("category total"))?;

        let stored = self
            .transactions
            .get_mut(transaction.id)
            .ok_or_else(|| LedgerError::transaction_not_found(&transaction.id.to_string()))?;
        stored.status = TransactionStatus::Reversed;
        transaction.status = TransactionStatus::Reversed;
        self.snapshot.balance = new_balance;
        if let Some(category) = self.snapshot.categories.get_mut(&key) {
            category.running_total = new_total;
        }

        Ok((transaction, new_balance, new_total))
    }

    pub fn query_balance(&self) -> Decimal {
        self.snapshot.balance
    }

    /// Look up one category, ignoring case and accents
    pub fn query_category(&self, name: &str) -> Result<Category, LedgerError> {
        self.snapshot
            .category(name)
            .cloned()
            .ok_or_else(|| LedgerError::category_not_found(name))
    }

    /// All categories, sorted by folded name
    pub fn categories(&self) -> Vec<Category> {
        self.snapshot.categories.values().cloned().collect()
    }

    /// Up to `count` committed transactions, most recent commit first
    pub fn list_recent(&self, count: usize) -> Vec<Transaction> {
        self.transactions.recent_committed(count)
    }

    pub fn transaction(&self, reference: &TransactionRef) -> Result<&Transaction, LedgerError> {
        let id = self.transactions.resolve(reference)?;
        self.transactions
            .get(id)
            .ok_or_else(|| LedgerError::transaction_not_found(&id.to_string()))
    }

    /// Set or clear the budget limit of an existing category
    pub fn set_budget(&mut self, name: &str, limit: Option<Decimal>) -> Result<Category, LedgerError> {
        let category = self
            .snapshot
            .categories
            .get_mut(&category_key(name))
            .ok_or_else(|| LedgerError::category_not_found(name))?;
        category.budget_limit = limit;

        info!(account = self.account, category = %category.name, limit = ?limit, "Budget updated");
        Ok(category.clone())
    }

    /// Consistent copy of the derived state
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.snapshot.clone()
    }

    pub fn category_index(&self) -> CategoryIndex {
        self.snapshot.category_index()
    }

    /// Context for validating entries against this account
    pub fn validation_context(&self, today: NaiveDate, precision: PrecisionPolicy) -> ValidationContext {
        ValidationContext {
            currency: self.currency,
            opened_on: self.opened_on,
            today,
            precision,
            categories: self.category_index(),
        }
    }

    /// Merge one transaction version read from the external store
    ///
    /// Local state wins, except that a remote reversal of a locally committed
    /// transaction is honoured. The sync cursor advances in every case.
    ///
    /// # Errors
    ///
    /// `CurrencyMismatch` or `ArithmeticOverflow`; the cursor is not advanced.
    pub fn ingest_remote(&mut self, change: RemoteChange) -> Result<RemoteOutcome, LedgerError> {
        let RemoteChange {
            cursor,
            mut transaction,
        } = change;

        let outcome = match self.transactions.get(transaction.id).map(|tx| tx.status) {
            None => match transaction.status {
                TransactionStatus::Committed => {
                    transaction.status = TransactionStatus::Pending;
                    self.commit(transaction)?;
                    RemoteOutcome::Applied
                }
                TransactionStatus::Reversed => {
                    if transaction.currency != self.currency {
                        return Err(LedgerError::CurrencyMismatch {
                            expected: self.currency,
                            actual: transaction.currency,
                        });
                    }
                    self.transactions.insert(transaction)?;
                    RemoteOutcome::Recorded
                }
                TransactionStatus::Pending | TransactionStatus::Rejected => RemoteOutcome::Unchanged,
            },
            Some(TransactionStatus::Committed)
                if transaction.status == TransactionStatus::Reversed =>
            {
                let local = self
                    .transactions
                    .get(transaction.id)
                    .cloned()
                    .ok_or_else(|| LedgerError::transaction_not_found(&transaction.id.to_string()))?;
                self.reverse(local)?;
                RemoteOutcome::Reversed
            }
            Some(_) => RemoteOutcome::Unchanged,
        };

        self.confirm_sync(cursor);
        Ok(outcome)
    }

    /// Record that the store holds everything up to `cursor`
    pub fn confirm_sync(&mut self, cursor: SyncCursor) {
        if cursor > self.snapshot.last_sync_cursor {
            self.snapshot.last_sync_cursor = cursor;
        }
    }

    pub fn last_sync_cursor(&self) -> SyncCursor {
        self.snapshot.last_sync_cursor
    }
}
