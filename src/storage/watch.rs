// Filesystem watcher for file-backed storage.
// Turns changes to entry files into storage events for other store instances.

use std::fs;
use std::io::ErrorKind;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::error::Result;

use super::paths::key_from_path;
use super::{ChangeFeed, FileStorage, StorageEvent};

/// Change feed over a [`FileStorage`] directory.
///
/// Writes made through the watched handle (or its clones) are dropped, so
/// only other instances' changes come through. Keys come back in their
/// sanitized form.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<StorageEvent>,
}

impl FileWatcher {
    /// Start watching the storage root.
    pub fn new(storage: &FileStorage) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let journal = storage.journal();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    for storage_event in translate(&event) {
                        if journal.is_echo(&storage_event.key, storage_event.new_value.as_deref()) {
                            continue;
                        }
                        // Receiver gone means the watcher is being dropped
                        let _ = tx.send(storage_event);
                    }
                }
                Err(err) => warn!(error = %err, "storage watcher error"),
            }
        })?;
        watcher.watch(storage.root(), RecursiveMode::NonRecursive)?;
        debug!(root = %storage.root().display(), "watching storage directory");

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Block up to `timeout` for the next event.
    pub fn wait(&self, timeout: Duration) -> Option<StorageEvent> {
        self.rx.recv_timeout(timeout).ok()
    }
}

impl ChangeFeed for FileWatcher {
    fn poll(&mut self) -> Vec<StorageEvent> {
        self.rx.try_iter().collect()
    }
}

/// Map a raw filesystem event onto storage events.
fn translate(event: &Event) -> Vec<StorageEvent> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => event
            .paths
            .iter()
            .filter_map(|path| {
                let key = key_from_path(path)?;
                match fs::read_to_string(path) {
                    Ok(contents) => Some(StorageEvent::updated(key, contents)),
                    // Renamed away or deleted before we got to it
                    Err(err) if err.kind() == ErrorKind::NotFound => {
                        Some(StorageEvent::removed(key))
                    }
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "failed to read changed entry");
                        None
                    }
                }
            })
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .iter()
            .filter_map(|path| key_from_path(path).map(StorageEvent::removed))
            .collect(),
        _ => Vec::new(),
    }
}
