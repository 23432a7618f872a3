//! Content-hash store for incremental runs.
//!
//! Re-running the upscaler and resize on every icon is what makes a full run
//! slow. The hash store lets a batch run skip any asset whose bytes have not
//! changed since the previous run.
//!
//! # Design
//!
//! The store maps a **canonical filename** (always `<base>.png`, or one of the
//! derived `_radius.png` / `_round.png` names) to the SHA-256 of that file's
//! contents. The hash recorded for a canonical asset is the hash of the
//! *processed* file, because the processed file replaces the source in place:
//! on the next run the scanner hashes that same file and finds a match.
//!
//! Hashes are content-based rather than mtime-based so they survive
//! `git checkout`, which resets modification times.
//!
//! ## Storage
//!
//! One hidden JSON file per source directory, `<source>/.last_hash.json`:
//!
//! ```json
//! {
//!   "logo.png": "9f86d08...",
//!   "logo_radius.png": "60303ae...",
//!   "logo_round.png": "fd61a03..."
//! }
//! ```
//!
//! A missing or corrupt file loads as an empty store, which degrades to
//! "everything changed" rather than aborting the run. Single-file runs
//! never read or write the store.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the hash store file within the source directory.
pub const STORE_FILENAME: &str = ".last_hash.json";

/// Persisted mapping of canonical filename → content hash.
///
/// Backed by a `BTreeMap` so the file is written in a stable key order and
/// diffs cleanly under version control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashStore {
    entries: BTreeMap<String, String>,
}

impl HashStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from the source directory. Returns an empty store if the file
    /// doesn't exist or can't be parsed.
    pub fn load(source_dir: &Path) -> Self {
        let path = store_path(source_dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str(&content) {
            Ok(entries) => Self { entries },
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "hash store unreadable, treating every asset as changed"
                );
                Self::empty()
            }
        }
    }

    /// Save to the source directory.
    ///
    /// Writes a sibling temp file first and renames it over the store, so a
    /// crash leaves either the old or the new file in place.
    pub fn save(&self, source_dir: &Path) -> io::Result<()> {
        let path = store_path(source_dir);
        let tmp = source_dir.join(format!("{STORE_FILENAME}.tmp"));
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)
    }

    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.entries.get(file_name).map(String::as_str)
    }

    pub fn insert(&mut self, file_name: impl Into<String>, hash: impl Into<String>) {
        self.entries.insert(file_name.into(), hash.into());
    }

    /// An asset is changed when it has no prior record or the record differs.
    pub fn is_changed(&self, file_name: &str, hash: &str) -> bool {
        self.get(file_name) != Some(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Resolve the hash store path for a source directory.
pub fn store_path(source_dir: &Path) -> PathBuf {
    source_dir.join(STORE_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // Lookup
    // =========================================================================

    #[test]
    fn empty_store_treats_everything_as_changed() {
        let store = HashStore::empty();
        assert!(store.is_empty());
        assert!(store.is_changed("logo.png", "abc"));
    }

    #[test]
    fn matching_hash_is_unchanged() {
        let mut store = HashStore::empty();
        store.insert("logo.png", "abc");
        assert!(!store.is_changed("logo.png", "abc"));
        assert!(store.is_changed("logo.png", "def"));
        assert!(store.is_changed("other.png", "abc"));
    }

    // =========================================================================
    // Save / Load roundtrip
    // =========================================================================

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let mut store = HashStore::empty();
        store.insert("logo.png", "h1");
        store.insert("logo_radius.png", "h2");
        store.insert("logo_round.png", "h3");

        store.save(tmp.path()).unwrap();
        let loaded = HashStore::load(tmp.path());

        assert_eq!(loaded, store);
        assert!(!loaded.is_changed("logo_round.png", "h3"));
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let mut store = HashStore::empty();
        store.insert("a.png", "h");
        store.save(tmp.path()).unwrap();

        assert!(store_path(tmp.path()).exists());
        assert!(!tmp.path().join(".last_hash.json.tmp").exists());
    }

    #[test]
    fn saved_file_is_plain_object() {
        let tmp = TempDir::new().unwrap();
        let mut store = HashStore::empty();
        store.insert("b.png", "2");
        store.insert("a.png", "1");
        store.save(tmp.path()).unwrap();

        let raw = fs::read_to_string(store_path(tmp.path())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["a.png"], "1");
        assert_eq!(value["b.png"], "2");
        // Sorted keys
        assert!(raw.find("a.png").unwrap() < raw.find("b.png").unwrap());
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(HashStore::load(tmp.path()).is_empty());
    }

    #[test]
    fn load_corrupt_json_returns_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(store_path(tmp.path()), "not json").unwrap();
        assert!(HashStore::load(tmp.path()).is_empty());
    }

    #[test]
    fn load_wrong_shape_returns_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(store_path(tmp.path()), r#"{"a.png": 42}"#).unwrap();
        assert!(HashStore::load(tmp.path()).is_empty());
    }

    // =========================================================================
    // hash_file
    // =========================================================================

    #[test]
    fn hash_file_deterministic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.bin");
        fs::write(&path, b"hello world").unwrap();

        let h1 = hash_file(&path).unwrap();
        let h2 = hash_file(&path).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn hash_file_changes_with_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.bin");

        fs::write(&path, b"version 1").unwrap();
        let h1 = hash_file(&path).unwrap();
        fs::write(&path, b"version 2").unwrap();
        let h2 = hash_file(&path).unwrap();

        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_file_missing_errors() {
        let tmp = TempDir::new().unwrap();
        assert!(hash_file(&tmp.path().join("nope.png")).is_err());
    }
}
