//! Runs the worker as a child process and adjudicates what it prints.
//!
//! One request is one child: stdout is read to the end on the calling task,
//! stderr is drained on a background task, and a single deadline covers both
//! the read and the exit wait. When the deadline passes the child is killed
//! and the run is a timeout, whatever it printed so far.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::Instant;

use super::drain::{self, DrainOutcome};
use super::{Worker, parse};
use crate::config::WorkerConfig;
use crate::consts::{DEFAULT_INTERPRETER, STDOUT_PREVIEW_CHARS, VENV_INTERPRETER, preview};
use crate::request::PromptRequest;
use crate::result::{WorkerFailure, WorkerResult};

/// How long stderr may stay open after the worker is done with.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// A fully resolved, not yet started worker run.
#[derive(Debug, Clone)]
pub struct WorkerInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

impl WorkerInvocation {
    /// Spawn the child and see it through to a result or a failure.
    /// The child never outlives this call.
    pub async fn execute(self) -> Result<WorkerResult, WorkerFailure> {
        if !self.working_dir.is_dir() {
            return Err(WorkerFailure::MissingWorkerDir(self.working_dir));
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| WorkerFailure::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let deadline = Instant::now() + self.timeout;
        let pid = child.id();
        tracing::debug!(?pid, program = %self.program.display(), "worker spawned");

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerFailure::Unknown("worker stdout was not captured".to_string()))?;
        let drain = child.stderr.take().map(drain::spawn);

        // stdout must hit EOF before the exit wait starts, so nothing printed
        // just before exit is lost.
        let run = async {
            let mut captured = Vec::new();
            stdout.read_to_end(&mut captured).await?;
            let status = child.wait().await?;
            Ok::<_, io::Error>((captured, status))
        };
        let outcome = tokio::time::timeout_at(deadline, run).await;

        if outcome.is_err() {
            tracing::warn!(
                ?pid,
                timeout_secs = self.timeout.as_secs(),
                "worker exceeded deadline, killing"
            );
            if let Err(e) = child.kill().await {
                tracing::warn!(?pid, error = %e, "failed to kill worker");
            }
        }
        if let Some(drain) = drain {
            match drain::settle(drain, DRAIN_GRACE).await {
                DrainOutcome::Finished(lines) => {
                    tracing::debug!(?pid, lines, "worker stderr drained");
                }
                DrainOutcome::Aborted => {
                    tracing::debug!(?pid, "worker stderr still open, drain aborted");
                }
            }
        }

        let (captured, status) = match outcome {
            Ok(finished) => finished?,
            Err(_) => return Err(WorkerFailure::Timeout(self.timeout)),
        };

        if !status.success() {
            tracing::warn!(?pid, code = ?status.code(), "worker exited unsuccessfully");
        }

        let text = String::from_utf8_lossy(&captured);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(WorkerFailure::EmptyOutput);
        }
        tracing::info!(stdout = %preview(trimmed, STDOUT_PREVIEW_CHARS), "worker output");

        let result = parse::parse_output(trimmed)?;
        if !result.ok {
            tracing::warn!(error = ?result.error, "worker reported failure");
        }
        Ok(result)
    }
}

/// Runs each prompt through a fresh worker process.
pub struct ProcessInvoker {
    config: WorkerConfig,
}

impl ProcessInvoker {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Explicit interpreter, else an executable venv interpreter inside the
    /// worker dir, else `python3` from `PATH`.
    pub fn resolve_interpreter(&self) -> PathBuf {
        if let Some(explicit) = &self.config.interpreter {
            return explicit.clone();
        }
        let venv = self.config.worker_dir.join(VENV_INTERPRETER);
        if is_executable(&venv) {
            return std::path::absolute(&venv).unwrap_or(venv);
        }
        PathBuf::from(DEFAULT_INTERPRETER)
    }

    pub fn prepare(&self, request: &PromptRequest) -> WorkerInvocation {
        WorkerInvocation {
            program: self.resolve_interpreter(),
            args: vec![
                self.config.script.clone().into_os_string(),
                OsString::from("--prompt"),
                OsString::from(request.prompt()),
            ],
            working_dir: self.config.worker_dir.clone(),
            timeout: self.config.timeout,
        }
    }

    /// Run the worker, keeping the failure kind.
    pub async fn invoke(&self, request: &PromptRequest) -> Result<WorkerResult, WorkerFailure> {
        self.prepare(request).execute().await
    }
}

#[async_trait]
impl Worker for ProcessInvoker {
    async fn run(&self, request: &PromptRequest) -> WorkerResult {
        match self.invoke(request).await {
            Ok(result) => result,
            Err(failure) => {
                tracing::error!(kind = failure.kind(), error = %failure, "worker run failed");
                WorkerResult::from(failure)
            }
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::DEFAULT_TIMEOUT;

    fn config_in(dir: &Path) -> WorkerConfig {
        WorkerConfig::new(dir)
    }

    #[test]
    fn falls_back_to_path_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = ProcessInvoker::new(config_in(dir.path()));
        assert_eq!(invoker.resolve_interpreter(), PathBuf::from("python3"));
    }

    #[test]
    fn explicit_interpreter_wins() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = ProcessInvoker::new(WorkerConfig {
            interpreter: Some(PathBuf::from("/opt/python/bin/python3.12")),
            ..config_in(dir.path())
        });
        assert_eq!(
            invoker.resolve_interpreter(),
            PathBuf::from("/opt/python/bin/python3.12")
        );
    }

    #[cfg(unix)]
    #[test]
    fn prefers_executable_venv_interpreter() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let venv = dir.path().join(VENV_INTERPRETER);
        std::fs::create_dir_all(venv.parent().unwrap()).unwrap();
        std::fs::write(&venv, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&venv, std::fs::Permissions::from_mode(0o755)).unwrap();

        let invoker = ProcessInvoker::new(config_in(dir.path()));
        assert_eq!(invoker.resolve_interpreter(), venv);
    }

    #[cfg(unix)]
    #[test]
    fn ignores_non_executable_venv_interpreter() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let venv = dir.path().join(VENV_INTERPRETER);
        std::fs::create_dir_all(venv.parent().unwrap()).unwrap();
        std::fs::write(&venv, "not a program").unwrap();
        std::fs::set_permissions(&venv, std::fs::Permissions::from_mode(0o644)).unwrap();

        let invoker = ProcessInvoker::new(config_in(dir.path()));
        assert_eq!(invoker.resolve_interpreter(), PathBuf::from("python3"));
    }

    #[test]
    fn venv_directory_is_not_an_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(VENV_INTERPRETER)).unwrap();

        let invoker = ProcessInvoker::new(config_in(dir.path()));
        assert_eq!(invoker.resolve_interpreter(), PathBuf::from("python3"));
    }

    #[test]
    fn prepare_passes_prompt_as_one_argument() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = ProcessInvoker::new(config_in(dir.path()));
        let request = PromptRequest::new("net income; rm -rf / && echo \"$HOME\"").unwrap();

        let invocation = invoker.prepare(&request);
        assert_eq!(
            invocation.args,
            vec![
                OsString::from("app/run_query.py"),
                OsString::from("--prompt"),
                OsString::from("net income; rm -rf / && echo \"$HOME\""),
            ]
        );
        assert_eq!(invocation.working_dir, dir.path());
        assert_eq!(invocation.timeout, DEFAULT_TIMEOUT);
    }
}
