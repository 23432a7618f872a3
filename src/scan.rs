//! Source directory scanning.
//!
//! The source directory is flat: every image file directly inside it is one
//! logical asset, identified by its base name. The scan skips:
//!
//! - hidden files (the hash store, temp files from an interrupted run, which
//!   [`sweep_leftovers`] deletes before a batch run);
//! - derived `_radius.png` / `_round.png` variants, which the pipeline owns;
//! - files whose extension has no compiled-in decoder;
//! - subdirectories.
//!
//! Each remaining file is hashed so [`HashStore`] can decide whether it
//! changed since the last run.

use crate::hash_store::{HashStore, hash_file};
use crate::imaging::supported_input_extensions;
use crate::naming;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Source directory not found: {0}")]
    NotFound(PathBuf),
    #[error("Source path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Cannot read source directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Cannot hash {path}: {source}")]
    Hash {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One source image found by the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAsset {
    /// Extension-independent identity: `logo` for `logo.jpg`.
    pub base: String,
    pub path: PathBuf,
    /// Lowercase extension without the dot.
    pub extension: String,
    /// SHA-256 of the source bytes as found.
    pub hash: String,
    /// `<base>.png`, the name the processed file will have.
    pub canonical_name: String,
}

impl SourceAsset {
    pub fn is_png(&self) -> bool {
        self.extension == naming::PNG_EXTENSION
    }

    /// Whether this asset must go through the transform pipeline.
    pub fn needs_processing(&self, store: &HashStore) -> bool {
        store.is_changed(&self.canonical_name, &self.hash)
    }
}

fn ensure_dir(dir: &Path) -> Result<(), ScanError> {
    if !dir.exists() {
        return Err(ScanError::NotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }
    Ok(())
}

/// Non-hidden regular files directly inside `dir`, sorted by name.
fn top_level_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, ScanError> {
    ensure_dir(dir)?;
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        files.push((name, entry.into_path()));
    }
    Ok(files)
}

/// Scan `dir` for source images.
///
/// When two sources share a base name (`logo.jpg` next to `logo.png`), the
/// non-png one wins: pngs are what earlier runs left behind, so another
/// format is the newer upload.
pub fn scan_sources(dir: &Path) -> Result<Vec<SourceAsset>, ScanError> {
    let supported = supported_input_extensions();
    let mut by_canonical: BTreeMap<String, SourceAsset> = BTreeMap::new();

    for (name, path) in top_level_files(dir)? {
        if naming::is_derived_variant(&name) {
            continue;
        }
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !supported.contains(&extension.as_str()) {
            tracing::debug!(file = %name, "skipping unsupported file");
            continue;
        }

        let hash = hash_file(&path).map_err(|source| ScanError::Hash {
            path: path.clone(),
            source,
        })?;
        let asset = SourceAsset {
            base: naming::base_name(&name).to_string(),
            canonical_name: naming::canonical_png_name(&name),
            path,
            extension,
            hash,
        };

        match by_canonical.get(&asset.canonical_name) {
            Some(existing) if !existing.is_png() || asset.is_png() => {
                tracing::warn!(
                    kept = %existing.path.display(),
                    ignored = %asset.path.display(),
                    "two sources share a base name"
                );
            }
            Some(existing) => {
                tracing::warn!(
                    kept = %asset.path.display(),
                    ignored = %existing.path.display(),
                    "two sources share a base name"
                );
                by_canonical.insert(asset.canonical_name.clone(), asset);
            }
            None => {
                by_canonical.insert(asset.canonical_name.clone(), asset);
            }
        }
    }

    Ok(by_canonical.into_values().collect())
}

/// Delete intermediate files an interrupted run left in `dir`.
///
/// They are hidden, so the scan ignores them, but `git add` of the source
/// directory would not. Returns how many were removed; a file that cannot be
/// removed is logged and left in place.
pub fn sweep_leftovers(dir: &Path) -> Result<usize, ScanError> {
    ensure_dir(dir)?;
    let mut removed = 0;
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy();
        if !entry.file_type().is_file() || !naming::is_leftover_temp(&name) {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                tracing::info!(file = %entry.path().display(), "removed leftover temp file");
                removed += 1;
            }
            Err(e) => {
                tracing::warn!(
                    file = %entry.path().display(),
                    error = %e,
                    "cannot remove leftover temp file"
                );
            }
        }
    }
    Ok(removed)
}

/// Every non-hidden png filename directly inside `dir`, variants included.
///
/// This is the on-disk view the manifest is built from.
pub fn list_png_files(dir: &Path) -> Result<Vec<String>, ScanError> {
    Ok(top_level_files(dir)?
        .into_iter()
        .map(|(name, _)| name)
        .filter(|name| naming::parse_asset_file_name(name).is_some())
        .collect())
}
