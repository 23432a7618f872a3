//! Drop-file notifications for the consumer process.
//!
//! The chat bot that accepts uploads watches a directory for two files:
//!
//! - `notify_success.json` after a successful publish
//! - `notify_error.json` after a failed publish and failed retry
//!
//! Delivery is best effort. A missing directory or a failed write is logged
//! by the caller and never changes the outcome of a run.

use crate::config::{NotifyConfig, RepositoryConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const SUCCESS_FILENAME: &str = "notify_success.json";
pub const ERROR_FILENAME: &str = "notify_error.json";

const SUCCESS_MESSAGE: &str = "Icon library sync succeeded";
const ERROR_MESSAGE: &str = "Icon library sync failed";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification directory does not exist: {0}")]
    DirectoryMissing(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Notification {
    Success {
        message: String,
        timestamp: String,
        /// Browsable manifest URL.
        url: String,
        /// Raw manifest URL.
        #[serde(rename = "rawUrl")]
        raw_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        commit: Option<String>,
    },
    Error {
        message: String,
        error: String,
        timestamp: String,
    },
}

impl Notification {
    pub fn success(
        repository: &RepositoryConfig,
        manifest_rel: &str,
        commit: Option<String>,
        timestamp: String,
    ) -> Self {
        Notification::Success {
            message: SUCCESS_MESSAGE.into(),
            timestamp,
            url: repository.blob_url(manifest_rel),
            raw_url: repository.raw_url(manifest_rel),
            commit,
        }
    }

    pub fn error(error: impl Into<String>, timestamp: String) -> Self {
        Notification::Error {
            message: ERROR_MESSAGE.into(),
            error: error.into(),
            timestamp,
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Notification::Success { .. } => SUCCESS_FILENAME,
            Notification::Error { .. } => ERROR_FILENAME,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Notification::Success { .. })
    }
}

/// Where publish outcomes are reported.
pub trait Notifier {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes each notification as a JSON file into a watched directory.
#[derive(Debug, Clone)]
pub struct DropFileNotifier {
    dir: PathBuf,
}

impl DropFileNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Notifier for DropFileNotifier {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if !self.dir.is_dir() {
            return Err(NotifyError::DirectoryMissing(self.dir.clone()));
        }
        let name = notification.file_name();
        let json = serde_json::to_string_pretty(notification)?;

        // The consumer reacts to the final name, so it must never see a
        // half-written file.
        let tmp = self.dir.join(format!(".{name}.tmp"));
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, self.dir.join(name))?;

        tracing::info!(file = %self.dir.join(name).display(), "notification written");
        Ok(())
    }
}

/// Used when `[notify] enabled = false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

impl Notifier for DisabledNotifier {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::debug!(file = notification.file_name(), "notifications disabled");
        Ok(())
    }
}

/// Build the notifier selected by config.
pub fn from_config(config: &NotifyConfig) -> Box<dyn Notifier> {
    if config.enabled {
        Box::new(DropFileNotifier::new(&config.dir))
    } else {
        Box::new(DisabledNotifier)
    }
}
