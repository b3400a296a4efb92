// Error types for the session store.
// Covers storage backend failures, JSON parsing, and watcher setup.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage quota exceeded writing {key} (limit {limit} bytes)")]
    QuotaExceeded { key: String, limit: usize },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Could not determine a storage directory for this user")]
    NoStorageDir,

    #[error("API key must not be empty")]
    InvalidApiKey,

    #[error("Storage watcher error: {0}")]
    Watch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
