// Persisted session state for the data-quality pipeline dashboard.
// One store per tab, mirrored to durable storage and kept in sync with other tabs.

pub mod api_key;
pub mod chat;
pub mod config;
pub mod error;
pub mod state;
pub mod storage;
pub mod store;

pub use api_key::ApiKeyStore;
pub use chat::{ChatHistory, ChatMessage, ChatRole};
pub use config::StoreConfig;
pub use error::{Result, SessionError};
pub use state::{
    BusinessRule, DashboardTab, DatasetRef, PipelineData, PipelineStage, PipelineStatus,
    SessionState, SessionUpdate, Severity, StageResult,
};
pub use storage::{
    ChangeFeed, FileStorage, FileWatcher, MemoryFeed, MemoryOrigin, MemoryStorage, Storage,
    StorageEvent,
};
pub use store::{ListenerId, SESSION_KEY, SessionStore};
