// In-memory durable storage shared between simulated tabs.
// Writes through one tab handle are queued as storage events for every other tab.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{Result, SessionError};

use super::{ChangeFeed, Storage, StorageEvent};

type EventQueue = Arc<Mutex<VecDeque<StorageEvent>>>;

#[derive(Debug, Default)]
struct OriginInner {
    items: Mutex<HashMap<String, String>>,
    tabs: Mutex<Vec<(u64, Weak<Mutex<VecDeque<StorageEvent>>>)>>,
    next_tab: AtomicU64,
    quota: Option<usize>,
    disabled: AtomicBool,
}

/// A storage origin: the entries every tab of one site shares.
#[derive(Debug, Clone, Default)]
pub struct MemoryOrigin {
    inner: Arc<OriginInner>,
}

impl MemoryOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Origin whose total stored bytes (keys plus values) may not exceed `limit`.
    pub fn with_quota(limit: usize) -> Self {
        Self {
            inner: Arc::new(OriginInner {
                quota: Some(limit),
                ..OriginInner::default()
            }),
        }
    }

    /// Simulate storage being switched off; every call then fails.
    pub fn set_disabled(&self, disabled: bool) {
        self.inner.disabled.store(disabled, Ordering::SeqCst);
    }

    /// Open a new tab: a storage handle plus the feed of other tabs' writes.
    pub fn open_tab(&self) -> (MemoryStorage, MemoryFeed) {
        let id = self.inner.next_tab.fetch_add(1, Ordering::SeqCst);
        let queue: EventQueue = Arc::default();
        self.inner.tabs.lock().push((id, Arc::downgrade(&queue)));

        let storage = MemoryStorage {
            origin: self.clone(),
            tab_id: id,
        };
        (storage, MemoryFeed { queue })
    }

    /// Raw entry lookup, bypassing tabs and the disabled flag.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.inner.items.lock().get(key).cloned()
    }

    /// Write an entry directly, as a foreign writer outside any tab would.
    pub fn poke(&self, key: &str, value: &str) {
        self.inner
            .items
            .lock()
            .insert(key.to_string(), value.to_string());
    }

    fn check_enabled(&self) -> Result<()> {
        if self.inner.disabled.load(Ordering::SeqCst) {
            return Err(SessionError::Unavailable(
                "storage is disabled for this origin".to_string(),
            ));
        }
        Ok(())
    }

    fn broadcast(&self, from_tab: u64, event: StorageEvent) {
        let mut tabs = self.inner.tabs.lock();
        tabs.retain(|(_, queue)| queue.strong_count() > 0);
        for (id, queue) in tabs.iter() {
            if *id == from_tab {
                continue;
            }
            if let Some(queue) = queue.upgrade() {
                queue.lock().push_back(event.clone());
            }
        }
    }
}

/// One tab's handle onto a [`MemoryOrigin`].
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    origin: MemoryOrigin,
    tab_id: u64,
}

impl MemoryStorage {
    /// A standalone storage with its own private origin.
    pub fn new() -> Self {
        MemoryOrigin::new().open_tab().0
    }

    pub fn origin(&self) -> &MemoryOrigin {
        &self.origin
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.origin.check_enabled()?;
        Ok(self.origin.inner.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.origin.check_enabled()?;
        {
            let mut items = self.origin.inner.items.lock();
            if let Some(limit) = self.origin.inner.quota {
                let used: usize = items
                    .iter()
                    .filter(|(k, _)| k.as_str() != key)
                    .map(|(k, v)| k.len() + v.len())
                    .sum();
                if used + key.len() + value.len() > limit {
                    return Err(SessionError::QuotaExceeded {
                        key: key.to_string(),
                        limit,
                    });
                }
            }
            if items.get(key).map(String::as_str) == Some(value) {
                // Browsers don't fire change events for identical writes
                return Ok(());
            }
            items.insert(key.to_string(), value.to_string());
        }
        self.origin
            .broadcast(self.tab_id, StorageEvent::updated(key, value));
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.origin.check_enabled()?;
        let removed = self.origin.inner.items.lock().remove(key).is_some();
        if removed {
            self.origin.broadcast(self.tab_id, StorageEvent::removed(key));
        }
        Ok(())
    }
}

/// Events written by other tabs of the same origin.
#[derive(Debug)]
pub struct MemoryFeed {
    queue: EventQueue,
}

impl MemoryFeed {
    /// Number of events waiting to be polled.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

impl ChangeFeed for MemoryFeed {
    fn poll(&mut self) -> Vec<StorageEvent> {
        self.queue.lock().drain(..).collect()
    }
}
