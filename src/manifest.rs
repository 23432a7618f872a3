//! Published manifest generation.
//!
//! The manifest (`tubiao.json` by default) is what consumers download to
//! discover icons. It is rebuilt from scratch on every batch run from every
//! png on disk, not from what the current run touched, so rebuilding it
//! with no intervening changes gives the same `icons` array.
//!
//! ## Selection policy
//!
//! Files are grouped by base name into original / radius / round slots.
//! For each group:
//!
//! | On disk | Published |
//! |---|---|
//! | transparent original | `base` → original |
//! | radius (+ round) | `base` → radius, `base_round` → round |
//! | round only | `base_round` → round |
//! | original only, opaque | `base` → original (fallback) |
//!
//! The radius variant deliberately takes over the base name: it is the
//! public face of an opaque asset.
//!
//! ## Output
//!
//! ```json
//! {
//!   "name": "Upscaled icon library",
//!   "description": "…",
//!   "updateTime": "2024-05-01T10:00:00.000Z",
//!   "totalIcons": 2,
//!   "icons": [
//!     { "name": "logo", "url": "https://raw.githubusercontent.com/…/pic/logo_radius.png",
//!       "uploader": { "userName": "alice", "userId": 1, "uploadTime": "…" } },
//!     { "name": "logo_round", "url": "https://raw.githubusercontent.com/…/pic/logo_round.png" }
//!   ]
//! }
//! ```
//!
//! When the rebuilt manifest differs from the previous one only in
//! `updateTime`, the previous timestamp is kept so the file on disk does not
//! change and publishing finds nothing to commit.

use crate::config::{ManifestConfig, RepositoryConfig};
use crate::imaging::ImageBackend;
use crate::naming::{self, VariantKind};
use crate::scan::{ScanError, list_png_files};
use crate::transparency::is_transparent;
use crate::uploaders::{UploaderRecord, UploaderStore};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
}

/// Why an entry was published. Kept in memory for reporting only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntryKind {
    Transparent,
    Radius,
    Round,
    #[default]
    Original,
}

impl EntryKind {
    pub fn label(self) -> &'static str {
        match self {
            EntryKind::Transparent => "transparent",
            EntryKind::Radius => "radius",
            EntryKind::Round => "round",
            EntryKind::Original => "original",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader: Option<UploaderRecord>,
    #[serde(skip)]
    pub kind: EntryKind,
}

impl ManifestEntry {
    /// Equality of the published fields.
    fn same_published(&self, other: &ManifestEntry) -> bool {
        self.name == other.name && self.url == other.url && self.uploader == other.uploader
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,
    pub description: String,
    pub update_time: String,
    pub total_icons: usize,
    pub icons: Vec<ManifestEntry>,
}

impl Manifest {
    /// Same published content, ignoring `updateTime`.
    pub fn same_content(&self, other: &Manifest) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.total_icons == other.total_icons
            && self.icons.len() == other.icons.len()
            && self
                .icons
                .iter()
                .zip(&other.icons)
                .all(|(a, b)| a.same_published(b))
    }

    /// Count of entries per kind, for the run summary.
    pub fn kind_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.icons {
            *counts.entry(entry.kind.label()).or_default() += 1;
        }
        counts
    }
}

/// Files present for one base name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantGroup {
    pub original: Option<String>,
    pub radius: Option<String>,
    pub round: Option<String>,
}

/// Bucket png filenames by base name.
pub fn group_files<'a>(files: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, VariantGroup> {
    let mut groups: BTreeMap<String, VariantGroup> = BTreeMap::new();
    for file in files {
        let Some(parsed) = naming::parse_asset_file_name(file) else {
            continue;
        };
        let group = groups.entry(parsed.base).or_default();
        let slot = match parsed.kind {
            VariantKind::Original => &mut group.original,
            VariantKind::Radius => &mut group.radius,
            VariantKind::Round => &mut group.round,
        };
        *slot = Some(file.to_string());
    }
    groups
}

/// Apply the selection policy to one group.
///
/// Returns `(publish name, file name, kind)` triples; empty when the group
/// has nothing publishable.
pub fn select_entries(
    base: &str,
    group: &VariantGroup,
    original_transparent: bool,
) -> Vec<(String, String, EntryKind)> {
    let mut selected = Vec::new();
    if let (Some(original), true) = (&group.original, original_transparent) {
        selected.push((base.to_string(), original.clone(), EntryKind::Transparent));
        return selected;
    }
    if let Some(radius) = &group.radius {
        selected.push((base.to_string(), radius.clone(), EntryKind::Radius));
    }
    if let Some(round) = &group.round {
        selected.push((format!("{base}_round"), round.clone(), EntryKind::Round));
    }
    if selected.is_empty()
        && let Some(original) = &group.original
    {
        selected.push((base.to_string(), original.clone(), EntryKind::Original));
    }
    selected
}

/// Inputs that shape the manifest besides the files on disk.
pub struct ManifestInputs<'a> {
    pub manifest: &'a ManifestConfig,
    pub repository: &'a RepositoryConfig,
    /// Source directory as a repository-relative path with `/` separators.
    pub directory: &'a str,
    pub uploaders: &'a UploaderStore,
    pub update_time: String,
}

/// Build the manifest for every png currently in `dir`.
pub fn build_manifest(
    backend: &impl ImageBackend,
    dir: &Path,
    inputs: &ManifestInputs<'_>,
) -> Result<Manifest, ManifestError> {
    let files = list_png_files(dir)?;
    let groups = group_files(files.iter().map(String::as_str));

    let mut icons = Vec::new();
    for (base, group) in &groups {
        let transparent = group
            .original
            .as_ref()
            .is_some_and(|original| is_transparent(backend, &dir.join(original)));

        for (name, file, kind) in select_entries(base, group, transparent) {
            tracing::debug!(name = %name, file = %file, kind = kind.label(), "manifest entry");
            let rel = format!("{}/{}", inputs.directory.trim_end_matches('/'), file);
            icons.push(ManifestEntry {
                name,
                url: inputs.repository.raw_url(rel.trim_start_matches('/')),
                uploader: inputs.uploaders.get(base).cloned(),
                kind,
            });
        }
    }
    icons.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.url.cmp(&b.url)));

    Ok(Manifest {
        name: inputs.manifest.title.clone(),
        description: inputs.manifest.description.clone(),
        update_time: inputs.update_time.clone(),
        total_icons: icons.len(),
        icons,
    })
}

/// Current time in the manifest's timestamp format (UTC, millisecond ISO 8601).
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Load a previously written manifest, if any.
pub fn load_manifest(path: &Path) -> Option<Manifest> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "previous manifest unreadable");
            None
        }
    }
}

/// Keep the previous `updateTime` when nothing else changed.
///
/// Returns true when the timestamp was carried over.
pub fn carry_update_time(manifest: &mut Manifest, previous: Option<&Manifest>) -> bool {
    match previous {
        Some(prev) if manifest.same_content(prev) => {
            manifest.update_time = prev.update_time.clone();
            true
        }
        _ => false,
    }
}

/// Write the manifest as pretty-printed JSON.
pub fn write_manifest(path: &Path, manifest: &Manifest) -> Result<(), ManifestError> {
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(path, json)?;
    Ok(())
}
