//! CLI output formatting for a run.
//!
//! Every function here is pure: it turns a result type into display lines
//! and leaves printing to the binary. Diagnostics go through `tracing` to
//! stderr; these lines go to stdout.
//!
//! # Output Format
//!
//! ## Per asset (streamed while processing)
//!
//! ```text
//! logo.png
//!     transparent: no
//!     upscale: upscaled
//!     variants: logo_radius.png, logo_round.png
//! ghost.png: unchanged
//! broken.png: failed: Image processing failed: ...
//! ```
//!
//! ## Summary
//!
//! ```text
//! Processed 1, unchanged 1, failed 1 (3 sources)
//! Hash store: 4 records
//! Manifest: tubiao.json (3 icons: 1 radius, 1 round, 1 transparent)
//! Publish: pushed 0123abcd
//! ```

use crate::pipeline::{ManifestSummary, RunMode, RunSummary};
use crate::process::{ProcessEvent, ProcessResult, VariantOutcome};
use crate::publish::{PublishOutcome, PublishReport};
use crate::upscale::UpscaleOutcome;

// ============================================================================
// Helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn short_commit(sha: &str) -> &str {
    sha.get(..8).unwrap_or(sha)
}

fn upscale_status(outcome: &UpscaleOutcome) -> String {
    match outcome {
        UpscaleOutcome::Skipped { width, height } => format!("not needed ({width}x{height})"),
        UpscaleOutcome::Upscaled => "upscaled".into(),
        UpscaleOutcome::Failed { reason } => format!("failed, kept original ({reason})"),
        UpscaleOutcome::TimedOut { after } => {
            format!("timed out after {}s, kept original", after.as_secs())
        }
        UpscaleOutcome::MissingOutput => "no output, kept original".into(),
    }
}

fn variant_status(outcome: &VariantOutcome) -> String {
    match outcome {
        VariantOutcome::Created { radius, round } => format!("{radius}, {round}"),
        VariantOutcome::Skipped { removed } if removed.is_empty() => "none".into(),
        VariantOutcome::Skipped { removed } => format!("none (removed {})", removed.join(", ")),
    }
}

// ============================================================================
// Run header
// ============================================================================

pub fn format_run_header(source: &str, mode: RunMode) -> String {
    let mode = match mode {
        RunMode::Batch => "batch",
        RunMode::SingleFile => "single file",
    };
    format!("==> Syncing {source} ({mode})")
}

// ============================================================================
// Processing
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::AssetSkipped { name } => vec![format!("{name}: unchanged")],
        ProcessEvent::AssetFailed { name, error } => vec![format!("{name}: failed: {error}")],
        ProcessEvent::AssetProcessed {
            name,
            transparent,
            upscale,
            variants,
        } => vec![
            name.clone(),
            format!("{}transparent: {}", indent(1), yes_no(*transparent)),
            format!("{}upscale: {}", indent(1), upscale_status(upscale)),
            format!("{}variants: {}", indent(1), variant_status(variants)),
        ],
    }
}

pub fn format_process_summary(result: &ProcessResult, scanned: usize) -> String {
    format!(
        "Processed {}, unchanged {}, failed {} ({} sources)",
        result.processed.len(),
        result.skipped.len(),
        result.failed.len(),
        scanned
    )
}

// ============================================================================
// Manifest and publish
// ============================================================================

pub fn format_manifest_summary(summary: &ManifestSummary) -> String {
    let kinds: Vec<String> = summary
        .kinds
        .iter()
        .map(|(kind, n)| format!("{n} {kind}"))
        .collect();
    let detail = if kinds.is_empty() {
        String::new()
    } else {
        format!(": {}", kinds.join(", "))
    };
    let unchanged = if summary.changed { "" } else { ", unchanged" };
    format!(
        "Manifest: {} ({} icons{detail}){unchanged}",
        summary.path.display(),
        summary.total_icons
    )
}

pub fn format_publish_report(report: &PublishReport) -> Vec<String> {
    match &report.outcome {
        PublishOutcome::NoChanges => vec!["Publish: no changes".into()],
        PublishOutcome::Published { commit, retried } => {
            let mut line = "Publish: pushed".to_string();
            if let Some(sha) = commit {
                line.push(' ');
                line.push_str(short_commit(sha));
            }
            if *retried {
                line.push_str(" (after retry)");
            }
            vec![line]
        }
        PublishOutcome::Failed { error, retry_error } => {
            let mut lines = vec![format!("Publish: FAILED: {error}")];
            if let Some(retry) = retry_error {
                lines.push(format!("{}retry: {retry}", indent(1)));
            }
            lines
        }
    }
}

// ============================================================================
// Whole run
// ============================================================================

pub fn format_run_summary(summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![format_process_summary(&summary.process, summary.scanned)];
    if let Some(n) = summary.hash_records {
        lines.push(format!("Hash store: {n} records"));
    }
    if let Some(manifest) = &summary.manifest {
        lines.push(format_manifest_summary(manifest));
    }
    if let Some(report) = &summary.publish {
        lines.extend(format_publish_report(report));
    }
    lines
}

/// Print the run summary to stdout.
pub fn print_run_summary(summary: &RunSummary) {
    for line in format_run_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
