//! Project-wide constants.

use std::time::Duration;

/// Wall-clock budget for one worker run, spawn to exit.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6 * 60);

/// Prompt length bounds, counted in UTF-16 units.
pub const PROMPT_MIN_CHARS: usize = 2;
pub const PROMPT_MAX_CHARS: usize = 500;

/// Interpreter looked up on `PATH` when no venv interpreter exists.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Interpreter inside the worker's own virtual environment.
#[cfg(not(windows))]
pub const VENV_INTERPRETER: &str = ".venv/bin/python";
#[cfg(windows)]
pub const VENV_INTERPRETER: &str = ".venv/Scripts/python.exe";

/// Worker entry point, relative to the worker directory.
pub const DEFAULT_SCRIPT: &str = "app/run_query.py";

/// Name of the worker directory, a sibling of the current directory.
pub const WORKER_DIR_NAME: &str = "worker_py";

/// How much of the worker's stdout gets logged.
pub const STDOUT_PREVIEW_CHARS: usize = 400;

/// Truncate `text` to at most `max_chars` chars, appending `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
