// JSON helpers shared by every persisted value.
// Parse on load, stringify on save, and degrade unreadable entries to "absent".

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::error::Result;

use super::Storage;

/// Load and parse the entry under `key`.
///
/// Read failures and malformed JSON are logged and reported as `None`, the
/// same as a missing entry.
pub fn load_json<T: DeserializeOwned>(storage: &impl Storage, key: &str) -> Option<T> {
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!(key = %key, error = %err, "failed to read persisted entry");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => {
            debug!(key = %key, "loaded persisted entry");
            Some(value)
        }
        Err(err) => {
            warn!(key = %key, error = %err, "ignoring malformed persisted entry");
            None
        }
    }
}

/// Serialize `value` and store it under `key`.
pub fn save_json<T: Serialize + ?Sized>(storage: &impl Storage, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    storage.set_item(key, &json)
}

/// Remove the entry under `key`, logging instead of failing.
pub fn remove_entry(storage: &impl Storage, key: &str) -> bool {
    match storage.remove_item(key) {
        Ok(()) => true,
        Err(err) => {
            warn!(key = %key, error = %err, "failed to remove persisted entry");
            false
        }
    }
}
