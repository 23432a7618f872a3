//! Version control operations used by publishing.
//!
//! [`VersionControl`] is the narrow surface the publish state machine needs.
//! [`GitCli`] implements it by running `git` in the working tree through a
//! [`CommandRunner`]. Git runs without a timeout: pushes of large batches
//! can legitimately take a while, and a hung push is visible to the operator.

use crate::exec::{CommandOutput, CommandRunner, CommandSpec, ExecError, in_dir};
use crate::lock::LOCK_FILENAME;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VcsError {
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("git {operation} failed: {reason}")]
    Failed { operation: String, reason: String },
}

/// Operations on the working tree and its remote.
pub trait VersionControl {
    fn stage(&self, paths: &[PathBuf]) -> Result<(), VcsError>;
    /// Stage every change in the working tree except the run lock.
    fn stage_all(&self) -> Result<(), VcsError>;
    fn has_staged_changes(&self) -> Result<bool, VcsError>;
    fn commit(&self, message: &str) -> Result<(), VcsError>;
    fn push(&self, remote: &str, branch: &str) -> Result<(), VcsError>;
    fn force_push_with_lease(&self, remote: &str, branch: &str) -> Result<(), VcsError>;
    /// Undo the last commit, keeping its changes staged.
    fn reset_soft_last_commit(&self) -> Result<(), VcsError>;
    fn head_commit(&self) -> Result<String, VcsError>;
}

/// `git` subprocess in a fixed working tree.
pub struct GitCli<'a, R: CommandRunner> {
    runner: &'a R,
    work_dir: PathBuf,
    program: PathBuf,
}

impl<'a, R: CommandRunner> GitCli<'a, R> {
    pub fn new(runner: &'a R, work_dir: &Path) -> Self {
        Self {
            runner,
            work_dir: work_dir.to_path_buf(),
            program: PathBuf::from("git"),
        }
    }

    fn git(&self) -> CommandSpec {
        in_dir(&self.program, &self.work_dir)
    }

    /// Run and require exit code 0.
    fn run_checked(&self, operation: &str, spec: CommandSpec) -> Result<CommandOutput, VcsError> {
        let output = self.runner.run(&spec)?;
        if output.success() {
            Ok(output)
        } else {
            Err(VcsError::Failed {
                operation: operation.to_string(),
                reason: output.failure_reason(),
            })
        }
    }
}

impl<R: CommandRunner> VersionControl for GitCli<'_, R> {
    fn stage(&self, paths: &[PathBuf]) -> Result<(), VcsError> {
        let spec = self.git().arg("add").arg("--").args(paths.iter().map(|p| p.as_os_str()));
        self.run_checked("add", spec).map(|_| ())
    }

    fn stage_all(&self) -> Result<(), VcsError> {
        let exclude_lock = format!(":(exclude){LOCK_FILENAME}");
        let spec = self.git().args(["add", "--", "."]).arg(exclude_lock);
        self.run_checked("add", spec).map(|_| ())
    }

    fn has_staged_changes(&self) -> Result<bool, VcsError> {
        let output = self
            .runner
            .run(&self.git().args(["diff", "--cached", "--quiet"]))?;
        match output.code {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(VcsError::Failed {
                operation: "diff".into(),
                reason: output.failure_reason(),
            }),
        }
    }

    fn commit(&self, message: &str) -> Result<(), VcsError> {
        self.run_checked("commit", self.git().args(["commit", "-m", message]))
            .map(|_| ())
    }

    fn push(&self, remote: &str, branch: &str) -> Result<(), VcsError> {
        self.run_checked("push", self.git().args(["push", remote, branch]))
            .map(|_| ())
    }

    fn force_push_with_lease(&self, remote: &str, branch: &str) -> Result<(), VcsError> {
        self.run_checked(
            "push",
            self.git()
                .args(["push", remote, branch, "--force-with-lease"]),
        )
        .map(|_| ())
    }

    fn reset_soft_last_commit(&self) -> Result<(), VcsError> {
        self.run_checked("reset", self.git().args(["reset", "--soft", "HEAD~1"]))
            .map(|_| ())
    }

    fn head_commit(&self) -> Result<String, VcsError> {
        let output = self.run_checked("rev-parse", self.git().args(["rev-parse", "HEAD"]))?;
        Ok(output.stdout.trim().to_string())
    }
}
