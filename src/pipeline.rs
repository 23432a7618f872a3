//! One end-to-end run.
//!
//! ```text
//! batch:  lock → sweep → scan → hash store → process → manifest → hash store → publish
//! single:                scan → process (source kept)
//! ```
//!
//! The mode comes from the source directory name: upload handlers put a
//! single file into a `temp_*` or `*processing*` directory and want it
//! transformed with nothing else touched. See [`naming::is_single_file_dir`].
//!
//! External collaborators are passed in through [`Collaborators`] so the
//! whole run can be exercised with fakes.

use crate::config::{ConfigError, PipelineConfig};
use crate::exec::CommandRunner;
use crate::hash_store::HashStore;
use crate::imaging::{CanonicalConfig, ImageBackend};
use crate::lock::{LockError, RunLock};
use crate::manifest::{self, ManifestError, ManifestInputs};
use crate::naming;
use crate::notify::Notifier;
use crate::process::{self, ProcessContext, ProcessEvent, ProcessResult};
use crate::publish::{self, PublishReport, PublishRequest};
use crate::scan::{self, ScanError};
use crate::uploaders::UploaderStore;
use crate::upscale::Upscaler;
use crate::vcs::VersionControl;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("Cannot write hash store: {0}")]
    HashStore(std::io::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Batch,
    SingleFile,
}

impl RunMode {
    pub fn detect(source_dir: &Path) -> Self {
        if naming::is_single_file_dir(&source_dir.to_string_lossy()) {
            RunMode::SingleFile
        } else {
            RunMode::Batch
        }
    }
}

/// Where to run and with which model.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Root of the git working tree; config, manifest and uploader store
    /// paths are relative to it.
    pub work_dir: PathBuf,
    /// Source directory as given on the command line.
    pub source_dir: PathBuf,
    /// Super-resolution model identifier.
    pub model: String,
}

impl RunOptions {
    pub fn mode(&self) -> RunMode {
        RunMode::detect(&self.source_dir)
    }

    pub fn source_path(&self) -> PathBuf {
        self.work_dir.join(&self.source_dir)
    }

    /// Source directory relative to the working tree, `/`-separated.
    pub fn source_label(&self) -> String {
        repo_relative(&self.work_dir, &self.source_dir)
    }
}

/// Path relative to `work_dir` with `/` separators, for URLs and git.
pub fn repo_relative(work_dir: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(work_dir).unwrap_or(path);
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .filter(|c| c != ".")
        .collect();
    parts.join("/")
}

/// External collaborators of a run.
pub struct Collaborators<'a, B: ImageBackend, R: CommandRunner, V: VersionControl> {
    pub backend: &'a B,
    /// Runs the upscaler.
    pub runner: &'a R,
    pub vcs: &'a V,
    pub notifier: &'a dyn Notifier,
}

/// What the manifest step produced.
#[derive(Debug, Clone)]
pub struct ManifestSummary {
    pub path: PathBuf,
    pub total_icons: usize,
    /// Entry count per selection kind.
    pub kinds: BTreeMap<&'static str, usize>,
    /// False when only the timestamp would have changed.
    pub changed: bool,
}

#[derive(Debug)]
pub struct RunSummary {
    pub mode: RunMode,
    /// Source files found by the scan.
    pub scanned: usize,
    pub process: ProcessResult,
    /// Records written to the hash store. Batch mode only.
    pub hash_records: Option<usize>,
    pub manifest: Option<ManifestSummary>,
    pub publish: Option<PublishReport>,
}

/// Run the pipeline once.
pub fn run<B: ImageBackend, R: CommandRunner, V: VersionControl>(
    config: &PipelineConfig,
    options: &RunOptions,
    deps: &Collaborators<'_, B, R, V>,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<RunSummary, PipelineError> {
    let mode = options.mode();
    let source = options.source_path();
    tracing::info!(
        source = %source.display(),
        mode = ?mode,
        model = %options.model,
        "starting run"
    );

    let upscaler = Upscaler::from_config(&config.upscaler, &config.images, &options.model);
    let ctx = ProcessContext {
        backend: deps.backend,
        runner: deps.runner,
        upscaler: &upscaler,
        canonical: CanonicalConfig {
            size: config.images.target_size,
            corner_radius: config.images.corner_radius(),
        },
        keep_source: mode == RunMode::SingleFile,
    };

    if mode == RunMode::SingleFile {
        let assets = scan::scan_sources(&source)?;
        let result = process::process_assets(&ctx, &assets, None, progress);
        return Ok(RunSummary {
            mode,
            scanned: assets.len(),
            process: result,
            hash_records: None,
            manifest: None,
            publish: None,
        });
    }

    let _lock = RunLock::acquire(&options.work_dir)?;
    scan::sweep_leftovers(&source)?;

    let assets = scan::scan_sources(&source)?;
    let previous = HashStore::load(&source);
    let result = process::process_assets(&ctx, &assets, Some(&previous), progress);
    tracing::info!(
        processed = result.processed.len(),
        skipped = result.skipped.len(),
        failed = result.failed.len(),
        "processing finished"
    );

    let manifest_summary = write_manifest(config, options, deps.backend, &source)?;

    let store =
        process::record_hashes(&source, &assets, &result).map_err(PipelineError::HashStore)?;
    store.save(&source).map_err(PipelineError::HashStore)?;

    let request = PublishRequest {
        paths: publish_paths(config, options),
        repository: &config.repository,
        manifest_rel: repo_relative(&options.work_dir, &config.manifest.path),
    };
    let report = publish::publish(deps.vcs, deps.notifier, &request);

    Ok(RunSummary {
        mode,
        scanned: assets.len(),
        process: result,
        hash_records: Some(store.len()),
        manifest: Some(manifest_summary),
        publish: Some(report),
    })
}

fn write_manifest(
    config: &PipelineConfig,
    options: &RunOptions,
    backend: &impl ImageBackend,
    source: &Path,
) -> Result<ManifestSummary, PipelineError> {
    let path = options.work_dir.join(&config.manifest.path);
    let uploaders = UploaderStore::load(&options.work_dir.join(&config.manifest.uploaders_path));
    let directory = options.source_label();
    let inputs = ManifestInputs {
        manifest: &config.manifest,
        repository: &config.repository,
        directory: &directory,
        uploaders: &uploaders,
        update_time: manifest::now_timestamp(),
    };

    let mut built = manifest::build_manifest(backend, source, &inputs)?;
    let previous = manifest::load_manifest(&path);
    let changed = !manifest::carry_update_time(&mut built, previous.as_ref());
    manifest::write_manifest(&path, &built)?;
    tracing::info!(path = %path.display(), icons = built.total_icons, changed, "manifest written");

    Ok(ManifestSummary {
        path,
        total_icons: built.total_icons,
        kinds: built.kind_counts(),
        changed,
    })
}

/// Manifest, source directory and uploader store, skipping any that do not
/// exist so `git add` does not reject the whole batch.
fn publish_paths(config: &PipelineConfig, options: &RunOptions) -> Vec<PathBuf> {
    [
        config.manifest.path.clone(),
        PathBuf::from(options.source_label()),
        config.manifest.uploaders_path.clone(),
    ]
    .into_iter()
    .filter(|rel| options.work_dir.join(rel).exists())
    .collect()
}
