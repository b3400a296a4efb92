// Durable key-value storage for persisted session values.
// Backends store one JSON string per key and report changes made by other tabs.

pub mod file;
pub mod json;
pub mod memory;
pub mod paths;
pub mod watch;

pub use file::FileStorage;
pub use json::{load_json, remove_entry, save_json};
pub use memory::{MemoryFeed, MemoryOrigin, MemoryStorage};
pub use watch::FileWatcher;

use crate::error::Result;

/// A per-origin durable string store.
///
/// Every store instance sharing a backend sees the same entries; which
/// instances count as "other tabs" is up to the paired [`ChangeFeed`].
pub trait Storage {
    /// Read the value stored under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// The form `key` takes in this backend's change events.
    ///
    /// Two keys address the same entry exactly when their normalized forms
    /// are equal.
    fn normalize_key(&self, key: &str) -> String {
        key.to_string()
    }
}

/// A change to a durable entry made by another tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Key that changed.
    pub key: String,
    /// New serialized value, or `None` when the entry was removed.
    pub new_value: Option<String>,
}

impl StorageEvent {
    pub fn updated(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            new_value: Some(value.into()),
        }
    }

    pub fn removed(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            new_value: None,
        }
    }
}

/// Source of storage events written by other tabs.
pub trait ChangeFeed {
    /// Take every event received since the last poll, oldest first.
    fn poll(&mut self) -> Vec<StorageEvent>;
}
