//! Entry point for callers: validates a raw prompt and hands it to a worker.

use std::sync::Arc;

use crate::consts::preview;
use crate::request::{PromptRequest, RequestError};
use crate::result::WorkerResult;
use crate::worker::Worker;

/// Prompt chars shown in the receipt log line.
const PROMPT_LOG_CHARS: usize = 80;

pub struct QueryService {
    worker: Arc<dyn Worker>,
}

impl QueryService {
    pub fn new(worker: Arc<dyn Worker>) -> Self {
        Self { worker }
    }

    /// Validate `prompt` and run it through the worker exactly once.
    ///
    /// An invalid prompt is the caller's mistake and comes back as `Err`.
    /// Anything that goes wrong past validation is inside the `WorkerResult`.
    pub async fn submit(&self, prompt: &str) -> Result<WorkerResult, RequestError> {
        let request = match PromptRequest::new(prompt) {
            Ok(request) => request,
            Err(e) => {
                tracing::info!(error = %e, "rejected prompt");
                return Err(e);
            }
        };
        tracing::info!(prompt = %preview(request.prompt(), PROMPT_LOG_CHARS), "received prompt");
        Ok(self.worker.run(&request).await)
    }

    pub fn health(&self) -> &'static str {
        "OK"
    }
}
