//! Worker location and launch settings.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::consts::{DEFAULT_SCRIPT, DEFAULT_TIMEOUT, WORKER_DIR_NAME};

/// Where the worker lives and how to run it.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Working directory of the child; also where the venv is looked up.
    pub worker_dir: PathBuf,
    /// Explicit interpreter. Skips venv and `PATH` resolution when set.
    pub interpreter: Option<PathBuf>,
    /// Script path, relative to `worker_dir` unless absolute.
    pub script: PathBuf,
    pub timeout: Duration,
}

impl WorkerConfig {
    pub fn new(worker_dir: impl Into<PathBuf>) -> Self {
        Self {
            worker_dir: worker_dir.into(),
            interpreter: None,
            script: PathBuf::from(DEFAULT_SCRIPT),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// The `worker_py` directory next to the current one.
    pub fn from_current_dir() -> io::Result<Self> {
        let cwd = std::env::current_dir()?;
        let parent = cwd.parent().unwrap_or(&cwd);
        Ok(Self::new(parent.join(WORKER_DIR_NAME)))
    }
}
