//! Per-asset transform and variant generation.
//!
//! Takes the assets found by [`scan`](crate::scan) and brings every changed
//! one to its canonical form:
//!
//! ```text
//! source ──normalize──▶ <base>.png ──classify──▶ transparent?
//!                            │
//!                            ├──upscale (if an edge < target × scale)
//!                            ├──contain resize to target × target
//!                            │     background: transparent │ white
//!                            └──opaque only: <base>_radius.png, <base>_round.png
//! ```
//!
//! Assets are transformed in parallel on the ambient rayon pool. Progress is
//! reported as [`ProcessEvent`]s over an optional channel so the binary can
//! print lines while work continues. A failing asset is reported and left
//! out of the result; it never aborts the others.
//!
//! ## Hash records
//!
//! [`record_hashes`] builds the hash store for the next run from scratch:
//! the canonical hash of every asset that is still present, plus the hash of
//! each of its variants that exists on disk. Failed assets get no record so
//! they are retried next time. Records of deleted sources disappear.

use crate::exec::CommandRunner;
use crate::hash_store::{HashStore, hash_file};
use crate::imaging::{
    BackendError, CanonicalConfig, ImageBackend, create_variants, normalize_to_png,
    remove_variants, resize_canonical,
};
use crate::naming::VariantKind;
use crate::scan::SourceAsset;
use crate::transparency::is_transparent;
use crate::upscale::{UpscaleOutcome, Upscaler};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What happened to the masked variants of one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantOutcome {
    /// Opaque asset: both variants written.
    Created { radius: String, round: String },
    /// Transparent asset: no variants. Lists stale ones deleted.
    Skipped { removed: Vec<String> },
}

/// Progress events emitted while processing.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    /// Hash unchanged since the last run.
    AssetSkipped { name: String },
    AssetProcessed {
        name: String,
        transparent: bool,
        upscale: UpscaleOutcome,
        variants: VariantOutcome,
    },
    AssetFailed { name: String, error: String },
}

/// One asset after a successful transform.
#[derive(Debug, Clone)]
pub struct ProcessedAsset {
    pub base: String,
    pub canonical_name: String,
    pub path: PathBuf,
    pub transparent: bool,
    /// SHA-256 of the canonical file after processing.
    pub hash: String,
    pub upscale: UpscaleOutcome,
    pub variants: VariantOutcome,
}

/// Outcome of a whole processing pass.
#[derive(Debug, Default)]
pub struct ProcessResult {
    pub processed: Vec<ProcessedAsset>,
    /// Canonical names left alone because their hash matched.
    pub skipped: Vec<String>,
    /// Canonical name and error for each asset that failed.
    pub failed: Vec<(String, String)>,
}

impl ProcessResult {
    pub fn is_failed(&self, canonical_name: &str) -> bool {
        self.failed.iter().any(|(name, _)| name == canonical_name)
    }

    pub fn processed(&self, canonical_name: &str) -> Option<&ProcessedAsset> {
        self.processed
            .iter()
            .find(|p| p.canonical_name == canonical_name)
    }
}

/// Collaborators and settings shared by every asset in a pass.
pub struct ProcessContext<'a, B: ImageBackend, R: CommandRunner> {
    pub backend: &'a B,
    pub runner: &'a R,
    pub upscaler: &'a Upscaler,
    pub canonical: CanonicalConfig,
    /// Single-file mode: never delete the original source.
    pub keep_source: bool,
}

/// Run the full transform on one asset.
pub fn process_asset<B: ImageBackend, R: CommandRunner>(
    ctx: &ProcessContext<'_, B, R>,
    asset: &SourceAsset,
) -> Result<ProcessedAsset, ProcessError> {
    let path = normalize_to_png(ctx.backend, &asset.path, ctx.keep_source)?;
    tracing::debug!(asset = %asset.canonical_name, "normalized");

    let transparent = is_transparent(ctx.backend, &path);
    let upscale = ctx
        .upscaler
        .upscale_if_needed(ctx.runner, ctx.backend, &path);

    resize_canonical(ctx.backend, &path, &ctx.canonical, transparent)?;
    tracing::debug!(asset = %asset.canonical_name, transparent, "resized");

    let dir = path.parent().unwrap_or(Path::new(""));
    let variants = if transparent {
        let removed = remove_variants(dir, &asset.base)?;
        if !removed.is_empty() {
            tracing::info!(asset = %asset.canonical_name, ?removed, "removed stale variants");
        }
        VariantOutcome::Skipped { removed }
    } else {
        let paths = create_variants(ctx.backend, &path, &asset.base, &ctx.canonical)?;
        VariantOutcome::Created {
            radius: file_name(&paths.radius),
            round: file_name(&paths.round),
        }
    };

    let hash = hash_file(&path)?;
    Ok(ProcessedAsset {
        base: asset.base.clone(),
        canonical_name: asset.canonical_name.clone(),
        path,
        transparent,
        hash,
        upscale,
        variants,
    })
}

/// Process every asset that needs it.
///
/// With `store = None` (single-file mode) every asset is processed.
pub fn process_assets<B: ImageBackend, R: CommandRunner>(
    ctx: &ProcessContext<'_, B, R>,
    assets: &[SourceAsset],
    store: Option<&HashStore>,
    progress: Option<Sender<ProcessEvent>>,
) -> ProcessResult {
    let emit = |event: ProcessEvent| {
        if let Some(tx) = &progress {
            let _ = tx.send(event);
        }
    };

    let outcomes: Vec<(String, Option<Result<ProcessedAsset, String>>)> = assets
        .par_iter()
        .map(|asset| {
            let name = asset.canonical_name.clone();
            if let Some(store) = store
                && !asset.needs_processing(store)
            {
                emit(ProcessEvent::AssetSkipped { name: name.clone() });
                return (name, None);
            }
            match process_asset(ctx, asset) {
                Ok(processed) => {
                    emit(ProcessEvent::AssetProcessed {
                        name: name.clone(),
                        transparent: processed.transparent,
                        upscale: processed.upscale.clone(),
                        variants: processed.variants.clone(),
                    });
                    (name, Some(Ok(processed)))
                }
                Err(e) => {
                    tracing::error!(asset = %name, error = %e, "processing failed");
                    emit(ProcessEvent::AssetFailed {
                        name: name.clone(),
                        error: e.to_string(),
                    });
                    (name, Some(Err(e.to_string())))
                }
            }
        })
        .collect();

    let mut result = ProcessResult::default();
    for (name, outcome) in outcomes {
        match outcome {
            None => result.skipped.push(name),
            Some(Ok(processed)) => result.processed.push(processed),
            Some(Err(error)) => result.failed.push((name, error)),
        }
    }
    result
}

/// Build the hash store to persist after a batch run.
pub fn record_hashes(
    dir: &Path,
    assets: &[SourceAsset],
    result: &ProcessResult,
) -> std::io::Result<HashStore> {
    let mut store = HashStore::empty();
    for asset in assets {
        if result.is_failed(&asset.canonical_name) {
            continue;
        }
        let hash = match result.processed(&asset.canonical_name) {
            Some(processed) => processed.hash.clone(),
            None => asset.hash.clone(),
        };
        store.insert(asset.canonical_name.clone(), hash);

        for kind in [VariantKind::Radius, VariantKind::Round] {
            let name = kind.file_name(&asset.base);
            let path = dir.join(&name);
            if path.is_file() {
                store.insert(name, hash_file(&path)?);
            }
        }
    }
    Ok(store)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
