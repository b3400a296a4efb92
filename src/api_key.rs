// Persisted API key for the assistant backend.

use tracing::{debug, warn};

use crate::error::{Result, SessionError};
use crate::storage::{Storage, load_json, remove_entry, save_json};

/// Default storage key for the API key.
pub const API_KEY_KEY: &str = "api_key";

/// Holder for a single persisted API key.
#[derive(Debug, Clone)]
pub struct ApiKeyStore<S: Storage> {
    storage: S,
    key: String,
}

impl<S: Storage> ApiKeyStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, API_KEY_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// The stored key, if any.
    pub fn get(&self) -> Option<String> {
        load_json(&self.storage, &self.key)
    }

    /// Store a new key. Surrounding whitespace is trimmed; blank keys are rejected.
    pub fn set(&self, api_key: &str) -> Result<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(SessionError::InvalidApiKey);
        }
        save_json(&self.storage, &self.key, api_key).inspect_err(|err| {
            warn!(key = %self.key, error = %err, "failed to persist API key");
        })?;
        debug!(api_key = %mask(api_key), "stored API key");
        Ok(())
    }

    pub fn clear(&self) {
        remove_entry(&self.storage, &self.key);
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }
}

/// Masked form safe for logs: last four characters only.
pub fn mask(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}
