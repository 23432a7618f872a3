//! Conditional super-resolution through an external binary.
//!
//! Small sources are enlarged by `realesrgan-ncnn-vulkan` (or a compatible
//! binary) before the canonical resize so the downscale has real detail to
//! work with. The binary runs out of process:
//!
//! ```text
//! <binary> -i <input> -o <output> -n <model> -s <scale>
//! ```
//!
//! Every failure mode is soft. A non-zero exit, a timeout, a binary that
//! cannot be started, or a run that exits 0 without writing its output all
//! leave the working image exactly as it was, and processing continues.

use crate::config::{ImagesConfig, UpscalerConfig};
use crate::exec::{CommandRunner, CommandSpec, ExecError};
use crate::imaging::{ImageBackend, get_dimensions, needs_upscale};
use crate::naming;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What happened to one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpscaleOutcome {
    /// Both edges already reach the threshold.
    Skipped { width: u32, height: u32 },
    /// The working image was replaced by the upscaled output.
    Upscaled,
    /// Spawn error or non-zero exit.
    Failed { reason: String },
    /// Killed after the configured timeout.
    TimedOut { after: Duration },
    /// Exit 0 but no output file.
    MissingOutput,
}

impl UpscaleOutcome {
    /// True when the pipeline continues with the pre-upscale image because
    /// the upscaler misbehaved.
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            UpscaleOutcome::Failed { .. }
                | UpscaleOutcome::TimedOut { .. }
                | UpscaleOutcome::MissingOutput
        )
    }
}

/// Invocation settings for the external upscaler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upscaler {
    pub binary: PathBuf,
    pub model: String,
    pub scale: u32,
    pub timeout: Duration,
    /// Minimum edge length below which an image is upscaled.
    pub threshold: u32,
}

impl Upscaler {
    pub fn from_config(upscaler: &UpscalerConfig, images: &ImagesConfig, model: &str) -> Self {
        Self {
            binary: upscaler.binary.clone(),
            model: model.to_string(),
            scale: images.scale_factor,
            timeout: upscaler.timeout(),
            threshold: images.upscale_threshold(),
        }
    }

    pub fn command(&self, input: &Path, output: &Path) -> CommandSpec {
        CommandSpec::new(&self.binary)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .arg("-n")
            .arg(&self.model)
            .arg("-s")
            .arg(self.scale.to_string())
            .timeout(self.timeout)
    }

    /// Upscale `path` in place when either edge is below the threshold.
    pub fn upscale_if_needed(
        &self,
        runner: &impl CommandRunner,
        backend: &impl ImageBackend,
        path: &Path,
    ) -> UpscaleOutcome {
        let (width, height) = match get_dimensions(backend, path) {
            Ok(dims) => dims,
            Err(e) => {
                let outcome = UpscaleOutcome::Failed {
                    reason: format!("cannot read dimensions: {e}"),
                };
                log_fallback(path, &outcome);
                return outcome;
            }
        };
        if !needs_upscale((width, height), self.threshold) {
            tracing::debug!(path = %path.display(), width, height, "no upscale needed");
            return UpscaleOutcome::Skipped { width, height };
        }

        let outcome = self.upscale(runner, path);
        if outcome.is_fallback() {
            log_fallback(path, &outcome);
        } else {
            tracing::info!(path = %path.display(), model = %self.model, "upscaled");
        }
        outcome
    }

    /// Run the binary unconditionally and swap its output into place.
    pub fn upscale(&self, runner: &impl CommandRunner, path: &Path) -> UpscaleOutcome {
        let output = naming::temp_sibling(path, "upscaled");
        let spec = self.command(path, &output);

        let outcome = match runner.run(&spec) {
            Err(ExecError::TimedOut { after, .. }) => UpscaleOutcome::TimedOut { after },
            Err(e) => UpscaleOutcome::Failed {
                reason: e.to_string(),
            },
            Ok(result) if !result.success() => UpscaleOutcome::Failed {
                reason: result.failure_reason(),
            },
            Ok(_) if !output.exists() => UpscaleOutcome::MissingOutput,
            Ok(_) => match std::fs::rename(&output, path) {
                Ok(()) => UpscaleOutcome::Upscaled,
                Err(e) => UpscaleOutcome::Failed {
                    reason: format!("cannot replace working image: {e}"),
                },
            },
        };

        if outcome != UpscaleOutcome::Upscaled {
            let _ = std::fs::remove_file(&output);
        }
        outcome
    }
}

fn log_fallback(path: &Path, outcome: &UpscaleOutcome) {
    tracing::warn!(
        path = %path.display(),
        outcome = ?outcome,
        "upscale failed, continuing with original image"
    );
}
