//! Command dispatcher
//!
//! Turns one chat message into one reply:
//!
//! ```text
//! raw text → parse → Intent ─┬─ entry ─→ validate ─┬─ Ready ──────────→ registry.apply ─→ reply
//!                            │                     └─ NeedsConfirmation → PendingStore ─→ prompt
//!                            ├─ sim/não ─→ PendingStore → revalidate → registry.apply
//!                            └─ queries, undo, budgets ─→ registry
//! ```
//!
//! The first message of an account hydrates its ledger from the store. Every
//! commit is handed to the [`PushQueue`] under the account lock; replies never
//! wait for the store.

pub mod format;
pub mod pending;

pub use pending::{PendingStore, Taken};

use crate::core::{
    revalidate, validate, validate_budget_limit, Clock, LedgerRegistry, PendingEntry,
    PrecisionPolicy, Validation, ValidationContext,
};
use crate::parser::parse;
use crate::sync::{hydrate, PushQueue, StoreRef};
use crate::types::{
    AccountId, Command, ConversationId, Intent, LedgerError, ParseError, TransactionRef,
    ValidationError,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Reply to a chat message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    pub text: String,
    /// Quick replies offered to the user
    pub buttons: Vec<String>,
}

impl Response {
    pub fn text(text: impl Into<String>) -> Self {
        Response {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    fn with_buttons(mut self, buttons: &[&str]) -> Self {
        self.buttons = buttons.iter().map(|b| b.to_string()).collect();
        self
    }
}

/// Dispatcher tunables
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub precision: PrecisionPolicy,
    pub confirmation_expiry: Duration,
    /// Entries listed by `extrato` without a count
    pub recent_default: usize,
    /// Unpushed transactions above which replies carry a warning
    pub degraded_depth: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        DispatchOptions {
            precision: PrecisionPolicy::Reject,
            confirmation_expiry: Duration::from_secs(300),
            recent_default: 5,
            degraded_depth: 20,
        }
    }
}

/// Everything that can stop a request
#[derive(Debug, Error)]
enum Failure {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub struct Dispatcher {
    registry: Arc<LedgerRegistry>,
    store: StoreRef,
    queue: Arc<PushQueue>,
    clock: Arc<dyn Clock>,
    pending: PendingStore,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<LedgerRegistry>,
        store: StoreRef,
        queue: Arc<PushQueue>,
        clock: Arc<dyn Clock>,
        options: DispatchOptions,
    ) -> Self {
        Dispatcher {
            pending: PendingStore::new(options.confirmation_expiry),
            registry,
            store,
            queue,
            clock,
            options,
        }
    }

    pub fn registry(&self) -> &Arc<LedgerRegistry> {
        &self.registry
    }

    pub fn pending(&self) -> &PendingStore {
        &self.pending
    }

    /// Handle one chat message
    ///
    /// Never fails: errors become reply texts. Ledger faults are logged and
    /// answered with a generic message.
    ///
    /// # Arguments
    ///
    /// * `conversation` - Chat the message came from; each chat has its own account
    /// * `raw_text` - The message as typed
    pub async fn handle(&self, conversation: ConversationId, raw_text: &str) -> Response {
        let account: AccountId = conversation;
        self.ensure_hydrated(account).await;

        let mut response = match self.route(conversation, account, raw_text) {
            Ok(response) => response,
            Err(Failure::Parse(e)) => {
                debug!(conversation, error = %e, "Message not understood");
                Response::text(format!("{e}\n{}", format::HELP_HINT))
            }
            Err(Failure::Validation(e)) => Response::text(e.to_string()),
            Err(Failure::Ledger(e)) if e.is_user_facing() => Response::text(e.to_string()),
            Err(Failure::Ledger(e)) => {
                error!(conversation, error = %e, "Ledger fault");
                Response::text(format::GENERIC_FAILURE)
            }
        };

        let backlog = self.queue.pending(account);
        if backlog > self.options.degraded_depth {
            warn!(account, backlog, "Sync degraded");
            response.text.push_str("\n\n");
            response.text.push_str(format::DEGRADED_WARNING);
        }
        response
    }

    async fn ensure_hydrated(&self, account: AccountId) {
        if self.registry.is_hydrated(account) {
            return;
        }
        if let Err(e) = hydrate(&self.registry, self.store.as_ref(), account).await {
            warn!(account, error = %e, "Hydration failed, serving local state");
        }
    }

    fn context(&self, account: AccountId) -> ValidationContext {
        self.registry
            .validation_context(account, self.clock.today(), self.options.precision)
    }

    fn route(
        &self,
        conversation: ConversationId,
        account: AccountId,
        raw_text: &str,
    ) -> Result<Response, Failure> {
        let ctx = self.context(account);
        let intent = parse(raw_text, &ctx.categories, ctx.today)?;

        match &intent.command {
            Command::AddEntry(_) => self.add_entry(conversation, account, &intent, &ctx),
            Command::Confirm => self.confirm(conversation, account, &ctx),
            Command::Cancel => Ok(Response::text(if self.pending.discard(conversation) {
                format::CANCELLED
            } else {
                format::NOTHING_TO_CANCEL
            })),
            Command::QueryBalance => Ok(Response::text(format::balance(
                self.registry.query_balance(account),
                ctx.currency,
            ))),
            Command::ListCategory { name: None } => Ok(Response::text(format::category_list(
                &self.registry.categories(account),
                ctx.currency,
            ))),
            Command::ListCategory { name: Some(name) } => {
                let category = self.registry.query_category(account, name)?;
                Ok(Response::text(format::category(&category, ctx.currency)))
            }
            Command::Undo { target } => self.undo(account, target),
            Command::SetBudget { category, limit } => {
                self.set_budget(account, category, *limit, &ctx)
            }
            Command::ListRecent { count } => {
                let count = count.unwrap_or(self.options.recent_default);
                Ok(Response::text(format::recent(
                    &self.registry.list_recent(account, count),
                )))
            }
            Command::Help => Ok(Response::text(format::HELP_TEXT)),
        }
    }

    fn add_entry(
        &self,
        conversation: ConversationId,
        account: AccountId,
        intent: &Intent,
        ctx: &ValidationContext,
    ) -> Result<Response, Failure> {
        match validate(intent, ctx)? {
            Validation::Ready(transaction) => {
                let outcome = self
                    .registry
                    .apply(account, transaction, self.queue.as_ref())?;
                Ok(Response::text(format::applied(&outcome)))
            }
            Validation::NeedsConfirmation(entry) => {
                let prompt = format::confirmation_prompt(&entry, self.pending.expiry());
                info!(conversation, reason = ?entry.reason, "Entry awaiting confirmation");
                self.pending.insert(conversation, entry);
                Ok(Response::text(prompt).with_buttons(&format::CONFIRM_BUTTONS))
            }
        }
    }

    fn confirm(
        &self,
        conversation: ConversationId,
        account: AccountId,
        ctx: &ValidationContext,
    ) -> Result<Response, Failure> {
        let entry: PendingEntry = match self.pending.take(conversation) {
            Taken::Fresh(entry) => entry,
            Taken::Expired => {
                debug!(conversation, "Late confirmation");
                return Ok(Response::text(format::CONFIRMATION_EXPIRED));
            }
            Taken::Missing => return Ok(Response::text(format::NOTHING_TO_CONFIRM)),
        };

        let transaction = revalidate(&entry, ctx)?;
        let outcome = self
            .registry
            .apply(account, transaction, self.queue.as_ref())?;
        Ok(Response::text(format::applied(&outcome)))
    }

    fn undo(&self, account: AccountId, target: &TransactionRef) -> Result<Response, Failure> {
        let outcome = self.registry.undo(account, target, self.queue.as_ref())?;
        Ok(Response::text(format::undone(&outcome)))
    }

    fn set_budget(
        &self,
        account: AccountId,
        category: &str,
        limit: Option<Decimal>,
        ctx: &ValidationContext,
    ) -> Result<Response, Failure> {
        let limit = limit
            .map(|limit| validate_budget_limit(limit, ctx))
            .transpose()?;
        let category = self.registry.set_budget(account, category, limit)?;
        Ok(Response::text(format::budget_set(&category, ctx.currency)))
    }
}
