//! # iconsync
//!
//! An incremental icon pipeline. A flat directory of uploaded images is
//! brought to a canonical square PNG form, masked into rounded and circular
//! variants, described by a published JSON manifest, and pushed to a git
//! remote. A drop file tells the upload bot how the push went.
//!
//! # Architecture
//!
//! ```text
//! pic/ ──scan──▶ changed assets ──process──▶ <base>.png (+ _radius, _round)
//!                    ▲                              │
//!          .last_hash.json ◀──record────────────────┤
//!                                                   ▼
//!                                   manifest ──▶ tubiao.json
//!                                                   │
//!                                   publish ──▶ git commit + push ──▶ notify
//! ```
//!
//! Each stage is a plain function over explicit inputs. External processes
//! (the upscaler, git) and the pixel work sit behind traits so the stages can
//! be tested with fakes and synthetic images.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Finds source images, hashes them, resolves base-name clashes |
//! | [`hash_store`] | Per-directory `.last_hash.json` change detection |
//! | [`transparency`] | Does an image carry meaningful alpha |
//! | [`upscale`] | Conditional super-resolution through an external binary |
//! | [`process`] | Normalize, upscale, canonical resize, variants, in parallel |
//! | [`imaging`] | Backend trait, pure geometry, resize and mask operations |
//! | [`manifest`] | Variant grouping, selection policy, `tubiao.json` |
//! | [`uploaders`] | Read-only uploader records carried into the manifest |
//! | [`publish`] | Stage/commit/push state machine with one retry |
//! | [`vcs`] | `VersionControl` trait and the `git` CLI implementation |
//! | [`notify`] | Success/error drop files for the consumer |
//! | [`pipeline`] | One end-to-end run, batch or single file |
//! | [`config`] | Layered `iconsync.toml` loading and validation |
//! | [`exec`] | External command capability with timeout |
//! | [`lock`] | Single-writer lock for batch runs |
//! | [`naming`] | Filename conventions for sources, variants and temp files |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! # Design Decisions
//!
//! ## Transparency Decides Everything Downstream
//!
//! An asset with any pixel below full alpha keeps a transparent background,
//! gets no masked variants, and is published as the original. An opaque
//! asset gets a white background and is published as its rounded variant
//! plus a circular one. The classification runs once per processed asset and
//! again, on the canonical file, when the manifest is built, so the manifest
//! never depends on what the current run happened to touch.
//!
//! ## Soft Failures Stay Soft
//!
//! A misbehaving upscaler, an unreadable alpha channel, or a missing bot
//! directory never stops a run. They are logged and the pipeline continues
//! with the best available input. Only a missing source directory, bad
//! config, or an unwritable manifest or hash store is fatal.

pub mod config;
pub mod exec;
pub mod hash_store;
pub mod imaging;
pub mod lock;
pub mod logging;
pub mod manifest;
pub mod naming;
pub mod notify;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod publish;
pub mod scan;
pub mod transparency;
pub mod uploaders;
pub mod upscale;
pub mod vcs;

#[cfg(test)]
pub(crate) mod test_helpers;
