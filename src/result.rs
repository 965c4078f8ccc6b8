//! The single result shape returned for every worker run, and the mapping
//! that folds every failure into it.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of one worker run. Failure is carried in `ok`/`error`, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerResult {
    /// Missing `ok` reads as `false`.
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerResult {
    pub fn success(answer: Option<String>, citations: Option<Vec<String>>) -> Self {
        Self {
            ok: true,
            answer,
            citations,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Drop fields that carry no meaning for the given `ok` state.
    pub fn normalized(mut self) -> Self {
        if self.ok {
            self.error = None;
        } else {
            self.answer = None;
            self.citations = None;
        }
        self
    }
}

/// The worker's stdout could not be read as a result.
#[derive(Error, Debug)]
pub enum MalformedOutput {
    #[error("output does not start with JSON (starts with: {0})")]
    UnexpectedLeadingChar(char),

    #[error("invalid worker JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Every way a worker run can fail before producing a result.
#[derive(Error, Debug)]
pub enum WorkerFailure {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("worker directory not found: {}", .0.display())]
    MissingWorkerDir(PathBuf),

    #[error("worker timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("worker returned empty output")]
    EmptyOutput,

    #[error(transparent)]
    Malformed(#[from] MalformedOutput),

    #[error("worker I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Unknown(String),
}

impl WorkerFailure {
    /// Short tag for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Spawn { .. } | Self::MissingWorkerDir(_) => "spawn",
            Self::Timeout(_) => "timeout",
            Self::EmptyOutput => "empty_output",
            Self::Malformed(_) => "malformed_output",
            Self::Io(_) | Self::Unknown(_) => "unknown",
        }
    }
}

impl From<WorkerFailure> for WorkerResult {
    fn from(failure: WorkerFailure) -> Self {
        let message = match &failure {
            WorkerFailure::Timeout(_) => "Worker timed out".to_string(),
            WorkerFailure::EmptyOutput => "Worker returned empty output".to_string(),
            WorkerFailure::Malformed(MalformedOutput::UnexpectedLeadingChar(c)) => {
                format!("Worker did not return JSON (starts with: {c})")
            }
            other => format!("Worker failed: {other}"),
        };
        WorkerResult::failure(message)
    }
}
