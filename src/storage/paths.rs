// Storage path utilities.
// Maps storage keys to files under the per-user data directory.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// Extension used for persisted entries.
pub const ENTRY_EXTENSION: &str = "json";

/// Get the base data directory (~/.local/share/pipeline-session on Linux).
pub fn data_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "pipeline-session").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Path to the file holding a storage key.
pub fn entry_path(root: &Path, key: &str) -> PathBuf {
    root.join(format!("{}.{}", sanitize_name(key), ENTRY_EXTENSION))
}

/// Recover the storage key from an entry file path.
///
/// Returns `None` for temp files and anything that isn't an entry. Keys that
/// needed sanitizing come back in their sanitized form.
pub fn key_from_path(path: &Path) -> Option<String> {
    if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
        return None;
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}

/// Sanitize a key for use in filesystem paths.
/// Replaces problematic characters with underscores.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '.' => '_',
            _ => c,
        })
        .collect()
}
