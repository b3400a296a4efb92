// Store configuration.
// Resolves the storage directory and key names, with an environment override.

use std::path::PathBuf;

use tracing::debug;

use crate::api_key::{API_KEY_KEY, ApiKeyStore};
use crate::chat::{CHAT_KEY_PREFIX, ChatHistory};
use crate::error::{Result, SessionError};
use crate::storage::paths::data_dir;
use crate::storage::{FileStorage, FileWatcher};
use crate::store::{SESSION_KEY, SessionStore};

/// Environment variable overriding the storage directory.
pub const STORAGE_DIR_ENV: &str = "PIPELINE_SESSION_DIR";

/// Where and under which keys persisted values live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub storage_dir: PathBuf,
    pub session_key: String,
    pub chat_key_prefix: String,
    pub api_key_key: String,
}

impl StoreConfig {
    /// Configuration rooted at `storage_dir` with the default keys.
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            session_key: SESSION_KEY.to_string(),
            chat_key_prefix: CHAT_KEY_PREFIX.to_string(),
            api_key_key: API_KEY_KEY.to_string(),
        }
    }

    /// Configuration for the current user's data directory.
    pub fn for_user() -> Result<Self> {
        data_dir().map(Self::new).ok_or(SessionError::NoStorageDir)
    }

    /// Like [`for_user`](Self::for_user), but `PIPELINE_SESSION_DIR` wins when set.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(STORAGE_DIR_ENV) {
            Some(dir) if !dir.is_empty() => {
                debug!(dir = ?dir, "storage directory from environment");
                Ok(Self::new(dir))
            }
            _ => Self::for_user(),
        }
    }

    pub fn open_file_storage(&self) -> Result<FileStorage> {
        FileStorage::open(&self.storage_dir)
    }

    /// Open the session store over file storage, watching for other instances' writes.
    pub fn open_session_store(&self) -> Result<SessionStore<FileStorage>> {
        let storage = self.open_file_storage()?;
        let watcher = FileWatcher::new(&storage)?;
        Ok(SessionStore::with_key(storage, self.session_key.clone()).with_feed(watcher))
    }

    pub fn open_chat_history(&self) -> Result<ChatHistory<FileStorage>> {
        Ok(ChatHistory::with_prefix(
            self.open_file_storage()?,
            self.chat_key_prefix.clone(),
        ))
    }

    pub fn open_api_key_store(&self) -> Result<ApiKeyStore<FileStorage>> {
        Ok(ApiKeyStore::with_key(
            self.open_file_storage()?,
            self.api_key_key.clone(),
        ))
    }
}
