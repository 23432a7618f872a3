//! External command capability.
//!
//! The upscaler binary and `git` are both out-of-process collaborators. They
//! are reached through the [`CommandRunner`] trait so the fallback logic in
//! [`upscale`](crate::upscale) and the retry logic in
//! [`publish`](crate::publish) can be tested with a scripted fake instead of
//! a real subprocess.
//!
//! [`SystemRunner`] is the production implementation. A command with a
//! timeout is polled with `try_wait` and killed when the deadline passes;
//! its stdout/stderr are drained on helper threads so a chatty child cannot
//! block on a full pipe while we wait.

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How often a child with a deadline is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} timed out after {}s", .after.as_secs())]
    TimedOut { program: String, after: Duration },
    #[error("IO error while running {program}: {source}")]
    Io {
        program: String,
        source: std::io::Error,
    },
}

/// A command to run: program, arguments, working directory, optional deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Program name for log and error messages.
    pub fn display_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Arguments as lossy strings, for matching in tests and logs.
    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Exit status and captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Exit code 0 with empty output, for fakes.
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            ..Self::default()
        }
    }

    /// Non-zero exit with a stderr message, for fakes.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Short human-readable reason for a non-zero exit.
    pub fn failure_reason(&self) -> String {
        let detail = self.stderr.trim();
        let detail = if detail.is_empty() {
            self.stdout.trim()
        } else {
            detail
        };
        let status = match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        };
        if detail.is_empty() {
            status
        } else {
            format!("{status}: {detail}")
        }
    }
}

/// Capability to run an external command and capture its exit status.
///
/// `Sync` so a single runner can be shared across rayon workers.
pub trait CommandRunner: Sync {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError>;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
        let program = spec.display_name();
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        tracing::debug!(program = %program, args = ?spec.arg_strings(), "running command");

        let child = command.spawn().map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })?;

        match spec.timeout {
            None => {
                let output = child.wait_with_output().map_err(|source| ExecError::Io {
                    program: program.clone(),
                    source,
                })?;
                Ok(CommandOutput {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
            Some(timeout) => wait_with_deadline(child, &program, timeout),
        }
    }
}

fn wait_with_deadline(
    mut child: Child,
    program: &str,
    timeout: Duration,
) -> Result<CommandOutput, ExecError> {
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);
    let deadline = Instant::now() + timeout;

    let io_err = |source| ExecError::Io {
        program: program.to_string(),
        source,
    };

    let status = loop {
        if let Some(status) = child.try_wait().map_err(io_err)? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExecError::TimedOut {
                program: program.to_string(),
                after: timeout,
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    Ok(CommandOutput {
        code: status.code(),
        stdout: stdout.map(join_drain).unwrap_or_default(),
        stderr: stderr.map(join_drain).unwrap_or_default(),
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_drain(handle: std::thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

/// Convenience for building a spec rooted in `dir`.
pub fn in_dir(program: impl Into<PathBuf>, dir: &Path) -> CommandSpec {
    CommandSpec::new(program).current_dir(dir)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    type Responder = Box<dyn Fn(&CommandSpec) -> Result<CommandOutput, ExecError> + Send + Sync>;

    /// Scripted runner that records every command without spawning anything.
    pub struct FakeRunner {
        pub calls: Mutex<Vec<CommandSpec>>,
        respond: Responder,
    }

    impl FakeRunner {
        pub fn new(
            respond: impl Fn(&CommandSpec) -> Result<CommandOutput, ExecError>
            + Send
            + Sync
            + 'static,
        ) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                respond: Box::new(respond),
            }
        }

        /// Runner where every command succeeds.
        pub fn succeeding() -> Self {
            Self::new(|_| Ok(CommandOutput::ok()))
        }

        pub fn get_calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
            self.calls.lock().unwrap().push(spec.clone());
            (self.respond)(spec)
        }
    }

    #[test]
    fn spec_builder_collects_args() {
        let spec = CommandSpec::new("/usr/bin/git")
            .arg("add")
            .args(["a", "b"])
            .timeout(Duration::from_secs(3));
        assert_eq!(spec.display_name(), "git");
        assert_eq!(spec.arg_strings(), vec!["add", "a", "b"]);
        assert_eq!(spec.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn failure_reason_prefers_stderr() {
        let out = CommandOutput {
            code: Some(1),
            stdout: "out".into(),
            stderr: "rejected\n".into(),
        };
        assert_eq!(out.failure_reason(), "exit code 1: rejected");
    }

    #[test]
    fn failure_reason_falls_back_to_stdout_then_status() {
        let out = CommandOutput {
            code: Some(2),
            stdout: "nothing to commit".into(),
            stderr: String::new(),
        };
        assert_eq!(out.failure_reason(), "exit code 2: nothing to commit");

        let killed = CommandOutput::default();
        assert_eq!(killed.failure_reason(), "terminated by signal");
    }

    #[test]
    fn fake_runner_records_calls() {
        let runner = FakeRunner::succeeding();
        runner.run(&CommandSpec::new("git").arg("status")).unwrap();
        let calls = runner.get_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].arg_strings(), vec!["status"]);
    }

    #[test]
    fn system_runner_missing_program_is_spawn_error() {
        let result = SystemRunner::new().run(&CommandSpec::new(
            "/nonexistent/definitely-not-a-binary",
        ));
        assert!(matches!(result, Err(ExecError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_captures_exit_code_and_output() {
        let out = SystemRunner::new()
            .run(&CommandSpec::new("sh").args(["-c", "echo hi; echo oops >&2; exit 3"]))
            .unwrap();
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "hi");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_with_deadline_completes() {
        let out = SystemRunner::new()
            .run(
                &CommandSpec::new("sh")
                    .args(["-c", "echo done"])
                    .timeout(Duration::from_secs(10)),
            )
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "done");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_kills_on_timeout() {
        let start = Instant::now();
        let result = SystemRunner::new().run(
            &CommandSpec::new("sleep")
                .arg("5")
                .timeout(Duration::from_millis(200)),
        );
        assert!(matches!(result, Err(ExecError::TimedOut { .. })));
        assert!(start.elapsed() < Duration::from_secs(4));
    }
}
