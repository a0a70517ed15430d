//! Conversation reference store: user id -> last seen conversation reference.
//!
//! Written by the inbound activity handler on every turn, read by proactive notify
//! triggers. Sharded map so unrelated users never contend on one lock; a later
//! upsert for the same user replaces the previous reference.

use crate::activity::ConversationReference;
use dashmap::DashMap;

/// In-memory registry of conversation references keyed by user id. Process lifetime only.
pub struct ConversationReferenceStore {
    inner: DashMap<String, ConversationReference>,
}

impl Default for ConversationReferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationReferenceStore {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Insert or replace the reference for `user_id`. Returns true if the user was not known before.
    pub fn upsert(&self, user_id: impl Into<String>, reference: ConversationReference) -> bool {
        self.inner.insert(user_id.into(), reference).is_none()
    }

    /// Clone of the current reference for `user_id`, if any. The shard lock is released on return.
    pub fn lookup(&self, user_id: &str) -> Option<ConversationReference> {
        self.inner.get(user_id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Snapshot of known user ids (unordered).
    pub fn user_ids(&self) -> Vec<String> {
        self.inner.iter().map(|e| e.key().clone()).collect()
    }
}
