// Per-dataset chat history for the assistant panel.
// Each dataset's conversation is persisted under its own key with ISO-8601 timestamps.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::{Storage, load_json, remove_entry, save_json};

/// Default prefix for chat history keys.
pub const CHAT_KEY_PREFIX: &str = "chat_history_";

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// A single message in a dataset's conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message stamped with the current time.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: next_message_id(now),
            role,
            content: content.into(),
            timestamp: now,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// Message ids: creation time plus a process-wide sequence number.
fn next_message_id(now: DateTime<Utc>) -> String {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}-{:04x}", now.timestamp_millis(), seq)
}

/// Chat histories keyed by dataset id.
#[derive(Debug, Clone)]
pub struct ChatHistory<S: Storage> {
    storage: S,
    prefix: String,
}

impl<S: Storage> ChatHistory<S> {
    pub fn new(storage: S) -> Self {
        Self::with_prefix(storage, CHAT_KEY_PREFIX)
    }

    pub fn with_prefix(storage: S, prefix: impl Into<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
        }
    }

    /// Storage key for a dataset's history.
    pub fn key_for(&self, dataset_id: &str) -> String {
        format!("{}{}", self.prefix, dataset_id)
    }

    /// Load a dataset's messages, oldest first. Unreadable history loads empty.
    pub fn load(&self, dataset_id: &str) -> Vec<ChatMessage> {
        load_json(&self.storage, &self.key_for(dataset_id)).unwrap_or_default()
    }

    /// Append a message and persist the history. Returns the updated history.
    ///
    /// A message whose id is already taken (another instance may have used
    /// it) gets a fresh one. A failed save is logged; the returned history
    /// still includes the message.
    pub fn append(&self, dataset_id: &str, mut message: ChatMessage) -> Vec<ChatMessage> {
        let mut messages = self.load(dataset_id);
        while messages.iter().any(|existing| existing.id == message.id) {
            message.id = next_message_id(message.timestamp);
        }
        messages.push(message);

        let key = self.key_for(dataset_id);
        if let Err(err) = save_json(&self.storage, &key, &messages) {
            warn!(key = %key, error = %err, "failed to persist chat history");
        }
        messages
    }

    /// Drop a dataset's history.
    pub fn clear(&self, dataset_id: &str) {
        remove_entry(&self.storage, &self.key_for(dataset_id));
    }
}
