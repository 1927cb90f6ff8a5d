//! Entries waiting for confirmation
//!
//! At most one per conversation; a newer entry replaces the older one.
//! Deadlines use `tokio::time::Instant` so paused-time tests can move past
//! them.

use crate::core::PendingEntry;
use crate::types::ConversationId;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// What `take` found for a conversation
#[derive(Debug, Clone, PartialEq)]
pub enum Taken {
    Fresh(PendingEntry),
    Expired,
    Missing,
}

#[derive(Debug)]
struct Waiting {
    entry: PendingEntry,
    deadline: Instant,
}

#[derive(Debug)]
pub struct PendingStore {
    entries: DashMap<ConversationId, Waiting>,
    expiry: Duration,
}

impl PendingStore {
    pub fn new(expiry: Duration) -> Self {
        PendingStore {
            entries: DashMap::new(),
            expiry,
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Park an entry, replacing any earlier one of the conversation
    pub fn insert(&self, conversation: ConversationId, entry: PendingEntry) {
        self.entries.insert(
            conversation,
            Waiting {
                entry,
                deadline: Instant::now() + self.expiry,
            },
        );
    }

    /// Remove and return the conversation's entry
    pub fn take(&self, conversation: ConversationId) -> Taken {
        match self.entries.remove(&conversation) {
            Some((_, waiting)) if Instant::now() < waiting.deadline => Taken::Fresh(waiting.entry),
            Some(_) => Taken::Expired,
            None => Taken::Missing,
        }
    }

    /// Drop the conversation's entry; true if a live one was discarded
    pub fn discard(&self, conversation: ConversationId) -> bool {
        matches!(self.take(conversation), Taken::Fresh(_))
    }

    /// Drop every expired entry
    ///
    /// # Returns
    ///
    /// The number of entries removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, waiting| now < waiting.deadline);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
