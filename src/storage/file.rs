// File-backed durable storage.
// Stores each key as a JSON file, writes atomically, and remembers its own writes.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Result;

use super::Storage;
use super::paths::{entry_path, sanitize_name};

/// Own writes remembered per key until the watcher has seen them.
const JOURNAL_DEPTH: usize = 32;

/// Values this storage handle wrote, oldest first, keyed by sanitized key.
///
/// `None` records a removal. The watcher consults the journal to tell this
/// handle's own writes apart from other instances'.
#[derive(Debug, Default)]
pub(crate) struct WriteJournal {
    pending: Mutex<HashMap<String, VecDeque<Option<String>>>>,
}

impl WriteJournal {
    fn record(&self, key: &str, value: Option<&str>) {
        let mut pending = self.pending.lock();
        let entries = pending.entry(sanitize_name(key)).or_default();
        entries.push_back(value.map(str::to_string));
        if entries.len() > JOURNAL_DEPTH {
            entries.pop_front();
        }
    }

    fn forget_last(&self, key: &str) {
        if let Some(entries) = self.pending.lock().get_mut(&sanitize_name(key)) {
            entries.pop_back();
        }
    }

    /// Whether `value` observed on disk for `key` is one of our own writes.
    ///
    /// Must be called in the order the entry was read. A match drops the
    /// older entries, which can no longer be observed. A foreign value
    /// clears the key: our earlier writes have all been overwritten.
    pub(crate) fn is_echo(&self, key: &str, value: Option<&str>) -> bool {
        let mut pending = self.pending.lock();
        let Some(entries) = pending.get_mut(key) else {
            return false;
        };
        match entries.iter().position(|entry| entry.as_deref() == value) {
            Some(index) => {
                entries.drain(..index);
                true
            }
            None => {
                pending.remove(key);
                false
            }
        }
    }
}

/// Storage backed by one file per key under a root directory.
///
/// Clones share the write journal and count as the same tab; open the
/// directory again for an independent instance.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    journal: Arc<WriteJournal>,
}

impl FileStorage {
    /// Open storage rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            journal: Arc::default(),
        })
    }

    /// Root directory holding the entry files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        entry_path(&self.root, key)
    }

    pub(crate) fn journal(&self) -> Arc<WriteJournal> {
        Arc::clone(&self.journal)
    }

    fn write_entry(&self, path: &Path, value: &str) -> Result<()> {
        // Write atomically via a uniquely named temp file in the same directory
        let mut file = NamedTempFile::new_in(&self.root)?;
        file.write_all(value.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|err| err.error)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        // Recorded first so the watcher can't observe the write before it
        self.journal.record(key, Some(value));
        if let Err(err) = self.write_entry(&self.path_for(key), value) {
            self.journal.forget_last(key);
            return Err(err);
        }

        debug!(key = %key, bytes = value.len(), "wrote storage entry");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.journal.record(key, None);
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => {
                debug!(key = %key, "removed storage entry");
                Ok(())
            }
            Err(err) => {
                self.journal.forget_last(key);
                if err.kind() == ErrorKind::NotFound {
                    Ok(())
                } else {
                    Err(err.into())
                }
            }
        }
    }

    fn normalize_key(&self, key: &str) -> String {
        sanitize_name(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_and_read_item() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        storage.set_item("pipeline_session", r#"{"a":1}"#).unwrap();

        let read = storage.get_item("pipeline_session").unwrap();
        assert_eq!(read.as_deref(), Some(r#"{"a":1}"#));
        // No temp files left behind
        assert_eq!(entries(temp_dir.path()), vec!["pipeline_session.json"]);
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        storage.set_item("api_key", "\"first\"").unwrap();
        storage.set_item("api_key", "\"second\"").unwrap();

        assert_eq!(
            storage.get_item("api_key").unwrap().as_deref(),
            Some("\"second\"")
        );
    }

    #[test]
    fn test_two_instances_write_same_key() {
        let temp_dir = TempDir::new().unwrap();
        let first = FileStorage::open(temp_dir.path()).unwrap();
        let second = FileStorage::open(temp_dir.path()).unwrap();

        let writers: Vec<_> = [first, second]
            .into_iter()
            .enumerate()
            .map(|(i, storage)| {
                std::thread::spawn(move || {
                    for n in 0..50 {
                        storage
                            .set_item("pipeline_session", &format!("{{\"writer\":{i},\"n\":{n}}}"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let storage = FileStorage::open(temp_dir.path()).unwrap();
        let last = storage.get_item("pipeline_session").unwrap().unwrap();
        assert!(last.ends_with("\"n\":49}"));
        assert_eq!(entries(temp_dir.path()), vec!["pipeline_session.json"]);
    }

    #[test]
    fn test_read_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        assert!(storage.get_item("missing").unwrap().is_none());
    }

    #[test]
    fn test_remove_item() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        storage.set_item("pipeline_session", "{}").unwrap();
        storage.remove_item("pipeline_session").unwrap();
        assert!(storage.get_item("pipeline_session").unwrap().is_none());

        // Removing again is fine
        storage.remove_item("pipeline_session").unwrap();
    }

    #[test]
    fn test_open_creates_nested_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("a").join("b");
        let storage = FileStorage::open(&root).unwrap();

        storage.set_item("k", "v").unwrap();
        assert!(root.join("k.json").exists());
    }

    #[test]
    fn test_normalize_key_matches_file_stem() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        assert_eq!(storage.normalize_key("tenant.a"), "tenant_a");
        assert!(storage.path_for("tenant.a").ends_with("tenant_a.json"));
    }

    #[test]
    fn test_journal_recognizes_own_writes_in_read_order() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();
        let journal = storage.journal();

        storage.set_item("s", "x").unwrap();
        storage.set_item("s", "y").unwrap();

        // Repeated reads of the same write are all echoes
        assert!(journal.is_echo("s", Some("x")));
        assert!(journal.is_echo("s", Some("x")));
        assert!(journal.is_echo("s", Some("y")));
        // Once "y" was seen on disk, "x" can only come from someone else
        assert!(!journal.is_echo("s", Some("x")));
        // ...and that foreign value clears what we remembered
        assert!(!journal.is_echo("s", Some("y")));
    }

    #[test]
    fn test_journal_records_removals() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();
        let journal = storage.journal();

        storage.set_item("s", "x").unwrap();
        storage.remove_item("s").unwrap();

        assert!(journal.is_echo("s", None));
        assert!(!journal.is_echo("other", None));
    }

    #[test]
    fn test_journal_is_per_instance() {
        let temp_dir = TempDir::new().unwrap();
        let first = FileStorage::open(temp_dir.path()).unwrap();
        let second = FileStorage::open(temp_dir.path()).unwrap();

        first.set_item("s", "x").unwrap();

        assert!(first.clone().journal().is_echo("s", Some("x")));
        assert!(!second.journal().is_echo("s", Some("x")));
    }
}
