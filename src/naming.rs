//! Centralized filename conventions for canonical assets and their variants.
//!
//! Every logical asset is identified by its base name. All files the pipeline
//! owns are derived from that base name with fixed suffixes:
//!
//! ```text
//! logo.png          original (canonical, 512×512)
//! logo_radius.png   rounded-corner variant
//! logo_round.png    circular variant
//! ```
//!
//! Sources may arrive with any extension (`logo.jpg`, `logo.webp`); they are
//! normalized to `<base>.png`, so the base name is extension independent.

use std::path::{Path, PathBuf};

/// Suffix appended to the base name for the rounded-corner variant.
pub const RADIUS_SUFFIX: &str = "_radius.png";

/// Suffix appended to the base name for the circular variant.
pub const ROUND_SUFFIX: &str = "_round.png";

/// Extension of every canonical file.
pub const PNG_EXTENSION: &str = "png";

/// Which presentational form of an asset a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantKind {
    Original,
    Radius,
    Round,
}

impl VariantKind {
    /// Canonical filename of this variant for `base`.
    pub fn file_name(self, base: &str) -> String {
        match self {
            VariantKind::Original => format!("{base}.{PNG_EXTENSION}"),
            VariantKind::Radius => format!("{base}{RADIUS_SUFFIX}"),
            VariantKind::Round => format!("{base}{ROUND_SUFFIX}"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VariantKind::Original => "original",
            VariantKind::Radius => "radius",
            VariantKind::Round => "round",
        }
    }
}

/// Result of classifying a png filename found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAssetName {
    pub base: String,
    pub kind: VariantKind,
}

/// Classify a `.png` filename into its base name and variant slot.
///
/// Returns `None` for files that are not pngs or that have an empty base name
/// (e.g. a file literally called `_round.png`).
///
/// - `"logo.png"` → base `logo`, Original
/// - `"logo_radius.png"` → base `logo`, Radius
/// - `"logo_round.png"` → base `logo`, Round
/// - `"logo.jpg"` → None
pub fn parse_asset_file_name(file_name: &str) -> Option<ParsedAssetName> {
    let (base, kind) = if let Some(base) = file_name.strip_suffix(RADIUS_SUFFIX) {
        (base, VariantKind::Radius)
    } else if let Some(base) = file_name.strip_suffix(ROUND_SUFFIX) {
        (base, VariantKind::Round)
    } else {
        let base = strip_extension_ci(file_name, PNG_EXTENSION)?;
        (base, VariantKind::Original)
    };
    if base.is_empty() {
        return None;
    }
    Some(ParsedAssetName {
        base: base.to_string(),
        kind,
    })
}

/// Whether a filename is a derived variant the pipeline generated itself.
///
/// Derived variants are never treated as sources by the directory scan.
pub fn is_derived_variant(file_name: &str) -> bool {
    file_name.ends_with(RADIUS_SUFFIX) || file_name.ends_with(ROUND_SUFFIX)
}

/// Canonical png filename for a source file: `logo.JPG` → `logo.png`.
pub fn canonical_png_name(file_name: &str) -> String {
    format!("{}.{PNG_EXTENSION}", base_name(file_name))
}

/// Base name of a source file: everything before the last dot.
///
/// Files without an extension are their own base name.
pub fn base_name(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(dot) => &file_name[..dot],
    }
}

/// Single-file mode is signalled by the name of the directory being processed.
///
/// Upload handlers drop one file into an ephemeral directory named
/// `temp_*` or `*processing*`; such runs bypass change detection, the
/// manifest and publishing.
pub fn is_single_file_dir(dir: &str) -> bool {
    dir.contains("temp_") || dir.contains("processing")
}

/// Hidden png sibling for intermediate output: `pic/logo.png` → `pic/.logo.<tag>.png`.
///
/// The leading dot keeps it out of both the directory scan and the manifest.
/// The `.png` extension is kept because the upscaler picks its output format
/// from it.
pub fn temp_sibling(path: &Path, tag: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{stem}.{tag}.{PNG_EXTENSION}"))
}

/// Tags passed to [`temp_sibling`] by the transform steps.
pub const TEMP_TAGS: [&str; 4] = ["normalize", "upscaled", "resize", "mask"];

/// Intermediate file left behind by an interrupted run.
///
/// Matches [`temp_sibling`] output for every tag in [`TEMP_TAGS`] and hidden
/// `*.tmp` files written before an atomic rename.
pub fn is_leftover_temp(file_name: &str) -> bool {
    let Some(rest) = file_name.strip_prefix('.') else {
        return false;
    };
    if rest.ends_with(".tmp") {
        return true;
    }
    let Some(stem) = strip_extension_ci(rest, PNG_EXTENSION) else {
        return false;
    };
    TEMP_TAGS.iter().any(|tag| {
        stem.strip_suffix(tag)
            .and_then(|s| s.strip_suffix('.'))
            .is_some_and(|base| !base.is_empty())
    })
}

fn strip_extension_ci<'a>(file_name: &'a str, ext: &str) -> Option<&'a str> {
    let dot = file_name.rfind('.')?;
    let (stem, tail) = file_name.split_at(dot);
    tail[1..].eq_ignore_ascii_case(ext).then_some(stem)
}
