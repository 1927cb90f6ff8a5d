//! Write-behind push queue with per-account workers
//!
//! This module provides the `PushQueue`, which pushes committed transaction
//! versions to the [`SpreadsheetStore`] without ever blocking the chat reply.
//!
//! # Design
//!
//! Each account gets one worker task fed by an unbounded channel. The channel
//! is written from [`CommitObserver::on_commit`], i.e. inside the ledger's
//! account lock, so a worker receives its account's transactions in commit
//! order and pushes them strictly FIFO.
//!
//! A failed push is retried with exponential backoff up to
//! `max_attempts`. If it still fails, the transaction stays at the head of the
//! worker's backlog, and the backlog is replayed on the next message for that
//! account or after `replay_interval`, whichever comes first.
//!
//! A worker with an empty backlog that hears nothing for `idle_timeout`
//! removes itself from the map and ends; the next commit spawns a new one.
//!
//! # Architecture
//!
//! ```text
//! PushQueue
//!     ├── StoreRef                     (external sheet)
//!     ├── Arc<LedgerRegistry>          (confirm_sync after each ack)
//!     ├── DashMap<AccountId, Worker>   (sender + pending depth)
//!     └── CancellationToken/TaskTracker (shutdown)
//! ```

use super::{Ack, SpreadsheetStore, StoreRef};
use crate::core::{CommitObserver, LedgerRegistry};
use crate::types::{AccountId, SyncError, Transaction};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Retry, replay and idle timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Push attempts per replay round, at least 1
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry
    pub base_delay: Duration,
    /// Upper bound for a single retry delay
    pub max_delay: Duration,
    /// How long a failed backlog waits before it is replayed on its own
    pub replay_interval: Duration,
    /// How long a worker with nothing to push stays alive
    pub idle_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            replay_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based): `base * 2^(attempt-1)`, capped
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Handle to one account's worker
#[derive(Debug)]
struct Worker {
    sender: mpsc::UnboundedSender<Transaction>,
    /// Committed versions not yet acknowledged by the store
    depth: Arc<AtomicUsize>,
}

/// Per-account FIFO write-behind queue
pub struct PushQueue {
    store: StoreRef,
    registry: Arc<LedgerRegistry>,
    policy: RetryPolicy,
    workers: Arc<DashMap<AccountId, Worker>>,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl PushQueue {
    /// Create a queue; workers are spawned lazily on the current tokio runtime
    pub fn new(store: StoreRef, registry: Arc<LedgerRegistry>, policy: RetryPolicy) -> Self {
        Self {
            store,
            registry,
            policy,
            workers: Arc::new(DashMap::new()),
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Transactions of an account still waiting for the store
    pub fn pending(&self, account: AccountId) -> usize {
        self.workers
            .get(&account)
            .map_or(0, |worker| worker.depth.load(Ordering::SeqCst))
    }

    /// Accounts with a live push worker
    pub fn active_workers(&self) -> usize {
        self.workers.len()
    }

    /// Transactions of all accounts still waiting for the store
    pub fn total_pending(&self) -> usize {
        self.workers
            .iter()
            .map(|worker| worker.depth.load(Ordering::SeqCst))
            .sum()
    }

    /// Enqueue a transaction version for its account's worker
    pub fn enqueue(&self, account: AccountId, transaction: Transaction) {
        let worker = self
            .workers
            .entry(account)
            .or_insert_with(|| self.spawn_worker(account));

        worker.depth.fetch_add(1, Ordering::SeqCst);
        if worker.sender.send(transaction).is_err() {
            worker.depth.fetch_sub(1, Ordering::SeqCst);
            warn!(account, "Push worker is gone, transaction not queued");
        }
    }

    fn spawn_worker(&self, account: AccountId) -> Worker {
        let (sender, receiver) = mpsc::unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));

        let task = WorkerTask {
            account,
            receiver,
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            policy: self.policy,
            depth: Arc::clone(&depth),
            workers: Arc::clone(&self.workers),
            token: self.token.clone(),
        };
        self.tracker.spawn(task.run());
        debug!(account, "Push worker started");

        Worker { sender, depth }
    }

    /// Stop accepting work, let workers drain, then wait for them
    ///
    /// Workers that have not drained within `grace` are cancelled; whatever
    /// they still hold is reported and dropped.
    pub async fn shutdown(&self, grace: Duration) {
        // Dropping the senders ends each worker once its channel is empty
        self.workers.clear();
        self.tracker.close();

        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            warn!(
                pending = self.total_pending(),
                "Push workers did not drain in time, cancelling"
            );
            self.token.cancel();
            self.tracker.wait().await;
        }
        info!("Push queue stopped");
    }
}

impl CommitObserver for PushQueue {
    fn on_commit(&self, account: AccountId, transaction: &Transaction) {
        self.enqueue(account, transaction.clone());
    }
}

/// State owned by one worker task
struct WorkerTask {
    account: AccountId,
    receiver: mpsc::UnboundedReceiver<Transaction>,
    store: StoreRef,
    registry: Arc<LedgerRegistry>,
    policy: RetryPolicy,
    depth: Arc<AtomicUsize>,
    workers: Arc<DashMap<AccountId, Worker>>,
    token: CancellationToken,
}

impl WorkerTask {
    async fn run(mut self) {
        let mut backlog: VecDeque<Transaction> = VecDeque::new();

        loop {
            while let Ok(transaction) = self.receiver.try_recv() {
                backlog.push_back(transaction);
            }
            self.drain(&mut backlog).await;

            if self.token.is_cancelled() {
                break;
            }

            tokio::select! {
                _ = self.token.cancelled() => break,
                received = self.receiver.recv() => match received {
                    Some(transaction) => backlog.push_back(transaction),
                    None if backlog.is_empty() => break,
                    None => {
                        // Shutting down: one last round, then give up
                        self.drain(&mut backlog).await;
                        break;
                    }
                },
                _ = tokio::time::sleep(self.policy.replay_interval), if !backlog.is_empty() => {
                    debug!(account = self.account, backlog = backlog.len(), "Replaying push backlog");
                }
                _ = tokio::time::sleep(self.policy.idle_timeout), if backlog.is_empty() => {
                    if self.retire() {
                        debug!(account = self.account, "Push worker idle, stopping");
                        break;
                    }
                }
            }
        }

        if !backlog.is_empty() {
            warn!(
                account = self.account,
                unpushed = backlog.len(),
                "Push worker stopped with unpushed transactions"
            );
        }
    }

    /// Drop this worker's map entry if nothing is queued for it
    ///
    /// `enqueue` bumps the depth while holding the entry, so a zero depth under
    /// the map lock means no transaction is in the channel or can reach it.
    fn retire(&self) -> bool {
        self.workers
            .remove_if(&self.account, |_, worker| {
                Arc::ptr_eq(&worker.depth, &self.depth) && worker.depth.load(Ordering::SeqCst) == 0
            })
            .is_some()
    }

    /// Push the backlog head-first until it is empty or a push gives up
    async fn drain(&self, backlog: &mut VecDeque<Transaction>) {
        while let Some(transaction) = backlog.front() {
            match self.push_with_retry(transaction).await {
                Ok(ack) => {
                    debug!(account = self.account, id = %transaction.id, cursor = %ack.cursor, "Transaction pushed");
                    self.registry.confirm_sync(self.account, ack.cursor);
                    backlog.pop_front();
                    self.depth.fetch_sub(1, Ordering::SeqCst);
                }
                Err(e) => {
                    warn!(
                        account = self.account,
                        id = %transaction.id,
                        backlog = backlog.len(),
                        error = %e,
                        "Push failed, keeping transaction queued"
                    );
                    return;
                }
            }
        }
    }

    async fn push_with_retry(&self, transaction: &Transaction) -> Result<Ack, SyncError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.store.push(self.account, transaction).await {
                Ok(ack) => return Ok(ack),
                Err(e) => e,
            };
            if attempt >= self.policy.max_attempts.max(1) {
                return Err(error);
            }

            let delay = self.policy.backoff(attempt);
            debug!(account = self.account, attempt, delay_ms = delay.as_millis() as u64, error = %error, "Retrying push");
            tokio::select! {
                _ = self.token.cancelled() => return Err(error),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
