//! Publishing with a single escalating retry.
//!
//! Publishing is a small state machine. Every transition is appended to a
//! trace so callers and tests can see exactly which path was taken:
//!
//! ```text
//! Clean → Staged → NoChanges
//!                → Committed → Pushed → NotifySuccess
//!                ↘ Failed → [RetryReset] → RetryCommit → RetryPush → NotifySuccess
//!                                                                  ↘ NotifyError
//! ```
//!
//! A commit or push failure triggers exactly one recovery cycle: undo this
//! run's commit (if it made one), stage the whole tree, commit again, and
//! push with `--force-with-lease`. If that fails too, the error notification
//! carries the first failure, which is the one worth diagnosing.
//!
//! A staging failure skips the retry and goes straight to `NotifyError`.

use crate::config::RepositoryConfig;
use crate::notify::{Notification, Notifier};
use crate::vcs::{VcsError, VersionControl};
use chrono::Local;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Clean,
    Staged,
    NoChanges,
    Committed,
    Pushed,
    Failed,
    RetryReset,
    RetryCommit,
    RetryPush,
    NotifySuccess,
    NotifyError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Nothing staged; no commit and no notification.
    NoChanges,
    Published {
        commit: Option<String>,
        retried: bool,
    },
    Failed {
        /// The first failure; this is what the error notification carries.
        error: String,
        /// Why the recovery cycle failed, when one ran.
        retry_error: Option<String>,
    },
}

impl PublishOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, PublishOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub outcome: PublishOutcome,
    pub trace: Vec<PublishState>,
}

impl PublishReport {
    /// Number of recovery cycles run. Never more than one.
    pub fn retries(&self) -> usize {
        self.trace
            .iter()
            .filter(|s| **s == PublishState::RetryCommit)
            .count()
    }
}

/// What to publish and where.
#[derive(Debug, Clone)]
pub struct PublishRequest<'a> {
    /// Paths to stage, relative to the working tree.
    pub paths: Vec<PathBuf>,
    pub repository: &'a RepositoryConfig,
    /// Manifest path relative to the repository root, for notification URLs.
    pub manifest_rel: String,
}

/// `Auto sync: updated at <local time>`
pub fn commit_message() -> String {
    format!("Auto sync: updated at {}", local_time())
}

/// `Resync: <local time>`
pub fn retry_commit_message() -> String {
    format!("Resync: {}", local_time())
}

fn local_time() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Drives one publish attempt and reports it through `notifier`.
pub struct Publisher<'a, V: VersionControl> {
    vcs: &'a V,
    notifier: &'a dyn Notifier,
    trace: Vec<PublishState>,
}

impl<'a, V: VersionControl> Publisher<'a, V> {
    pub fn new(vcs: &'a V, notifier: &'a dyn Notifier) -> Self {
        Self {
            vcs,
            notifier,
            trace: Vec::new(),
        }
    }

    fn enter(&mut self, state: PublishState) {
        tracing::debug!(state = ?state, "publish");
        self.trace.push(state);
    }

    pub fn publish(mut self, request: &PublishRequest<'_>) -> PublishReport {
        self.enter(PublishState::Clean);

        let staged = self
            .vcs
            .stage(&request.paths)
            .and_then(|()| self.vcs.has_staged_changes());
        let has_changes = match staged {
            Ok(has_changes) => has_changes,
            Err(e) => {
                tracing::error!(error = %e, "staging failed");
                self.enter(PublishState::Failed);
                return self.fail(e.to_string(), None);
            }
        };
        self.enter(PublishState::Staged);

        if !has_changes {
            tracing::info!("no changes to publish");
            self.enter(PublishState::NoChanges);
            return self.finish(PublishOutcome::NoChanges);
        }

        let mut committed = false;
        let first = match self.vcs.commit(&commit_message()) {
            Ok(()) => {
                committed = true;
                self.enter(PublishState::Committed);
                let r = request.repository;
                self.vcs.push(&r.remote, &r.branch)
            }
            Err(e) => Err(e),
        };

        match first {
            Ok(()) => {
                self.enter(PublishState::Pushed);
                self.succeed(request, false)
            }
            Err(e) => {
                tracing::error!(error = %e, "publish failed, retrying once");
                self.enter(PublishState::Failed);
                match self.retry(request, committed) {
                    Ok(()) => self.succeed(request, true),
                    Err(retry) => {
                        tracing::error!(error = %retry, "retry failed");
                        self.fail(e.to_string(), Some(retry.to_string()))
                    }
                }
            }
        }
    }

    fn retry(&mut self, request: &PublishRequest<'_>, committed: bool) -> Result<(), VcsError> {
        if committed {
            self.enter(PublishState::RetryReset);
            self.vcs.reset_soft_last_commit()?;
        }
        self.vcs.stage_all()?;
        self.enter(PublishState::RetryCommit);
        self.vcs.commit(&retry_commit_message())?;
        self.enter(PublishState::RetryPush);
        let r = request.repository;
        self.vcs.force_push_with_lease(&r.remote, &r.branch)
    }

    fn succeed(mut self, request: &PublishRequest<'_>, retried: bool) -> PublishReport {
        let commit = match self.vcs.head_commit() {
            Ok(sha) => Some(sha),
            Err(e) => {
                tracing::warn!(error = %e, "cannot read head commit");
                None
            }
        };
        tracing::info!(commit = ?commit, retried, "published");

        self.enter(PublishState::NotifySuccess);
        self.deliver(&Notification::success(
            request.repository,
            &request.manifest_rel,
            commit.clone(),
            crate::manifest::now_timestamp(),
        ));
        self.finish(PublishOutcome::Published { commit, retried })
    }

    fn fail(mut self, error: String, retry_error: Option<String>) -> PublishReport {
        self.enter(PublishState::NotifyError);
        self.deliver(&Notification::error(
            error.clone(),
            crate::manifest::now_timestamp(),
        ));
        self.finish(PublishOutcome::Failed { error, retry_error })
    }

    fn deliver(&self, notification: &Notification) {
        if let Err(e) = self.notifier.send(notification) {
            tracing::warn!(
                error = %e,
                file = notification.file_name(),
                "notification not delivered"
            );
        }
    }

    fn finish(self, outcome: PublishOutcome) -> PublishReport {
        PublishReport {
            outcome,
            trace: self.trace,
        }
    }
}

/// Publish `request` through `vcs`, reporting to `notifier`.
pub fn publish(
    vcs: &impl VersionControl,
    notifier: &dyn Notifier,
    request: &PublishRequest<'_>,
) -> PublishReport {
    Publisher::new(vcs, notifier).publish(request)
}
