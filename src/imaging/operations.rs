//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.
//! Every write goes to a hidden sibling first and is renamed into place, so
//! a failed step never leaves a half-written canonical file behind.

use super::backend::{BackendError, ImageBackend};
use super::params::{Background, Mask, MaskParams, ResizeParams};
use crate::naming::{self, VariantKind};
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok(dims.as_tuple())
}

/// Canonical geometry shared by the resize and both masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalConfig {
    pub size: u32,
    pub corner_radius: u32,
}

impl Default for CanonicalConfig {
    fn default() -> Self {
        Self {
            size: 512,
            corner_radius: 92,
        }
    }
}

/// Bring a source file to `<base>.png` in the same directory.
///
/// - a lowercase `.png` is returned as is;
/// - any other png spelling (`.PNG`) is renamed, or copied when `keep_source`;
/// - every other format is re-encoded with alpha preserved. The original is
///   deleted afterwards unless `keep_source` is set.
///
/// Returns the canonical path.
pub fn normalize_to_png(
    backend: &impl ImageBackend,
    source: &Path,
    keep_source: bool,
) -> Result<PathBuf> {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let canonical = source.with_file_name(naming::canonical_png_name(&file_name));
    if canonical == source {
        return Ok(canonical);
    }

    let is_png = source
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(naming::PNG_EXTENSION));

    if is_png {
        if keep_source {
            std::fs::copy(source, &canonical)?;
        } else {
            std::fs::rename(source, &canonical)?;
        }
        return Ok(canonical);
    }

    let tmp = naming::temp_sibling(&canonical, "normalize");
    if let Err(e) = backend.convert_to_png(source, &tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, &canonical)?;
    if !keep_source {
        std::fs::remove_file(source)?;
    }
    Ok(canonical)
}

/// Plan the canonical resize without executing it.
pub fn plan_resize(
    source: &Path,
    output: &Path,
    config: &CanonicalConfig,
    transparent: bool,
) -> ResizeParams {
    ResizeParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        size: config.size,
        background: Background::for_transparency(transparent),
    }
}

/// Contain-fit `path` to `size × size` in place.
///
/// Transparent assets get a transparent letterbox, everything else white.
pub fn resize_canonical(
    backend: &impl ImageBackend,
    path: &Path,
    config: &CanonicalConfig,
    transparent: bool,
) -> Result<()> {
    let tmp = naming::temp_sibling(path, "resize");
    let params = plan_resize(path, &tmp, config, transparent);
    if let Err(e) = backend.resize(&params) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Paths of the two masked variants written for an opaque asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantPaths {
    pub radius: PathBuf,
    pub round: PathBuf,
}

/// Plan both variant masks for a canonical file without executing them.
pub fn plan_variants(canonical: &Path, base: &str, config: &CanonicalConfig) -> [MaskParams; 2] {
    let dir = canonical.parent().unwrap_or(Path::new(""));
    [
        MaskParams {
            source: canonical.to_path_buf(),
            output: dir.join(VariantKind::Radius.file_name(base)),
            size: config.size,
            mask: Mask::RoundedRect {
                radius: config.corner_radius,
            },
        },
        MaskParams {
            source: canonical.to_path_buf(),
            output: dir.join(VariantKind::Round.file_name(base)),
            size: config.size,
            mask: Mask::Circle,
        },
    ]
}

/// Write `<base>_radius.png` and `<base>_round.png` next to the canonical file.
pub fn create_variants(
    backend: &impl ImageBackend,
    canonical: &Path,
    base: &str,
    config: &CanonicalConfig,
) -> Result<VariantPaths> {
    let [radius, round] = plan_variants(canonical, base, config);
    for params in [&radius, &round] {
        let final_path = params.output.clone();
        let tmp = naming::temp_sibling(&final_path, "mask");
        let staged = MaskParams {
            output: tmp.clone(),
            ..params.clone()
        };
        if let Err(e) = backend.mask(&staged) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        std::fs::rename(&tmp, &final_path)?;
    }
    Ok(VariantPaths {
        radius: radius.output,
        round: round.output,
    })
}

/// Delete leftover variants of `base` in `dir`.
///
/// Used when an asset that used to be opaque comes back transparent.
/// Returns the filenames actually removed.
pub fn remove_variants(dir: &Path, base: &str) -> Result<Vec<String>> {
    let mut removed = Vec::new();
    for kind in [VariantKind::Radius, VariantKind::Round] {
        let name = kind.file_name(base);
        match std::fs::remove_file(dir.join(&name)) {
            Ok(()) => removed.push(name),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(removed)
}
