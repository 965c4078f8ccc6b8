use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::Worker;
use crate::request::PromptRequest;
use crate::result::WorkerResult;

/// A scripted worker for tests. Returns pre-defined results in order and
/// records every prompt it was given.
pub struct MockWorker {
    results: Vec<WorkerResult>,
    index: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockWorker {
    pub fn new(results: Vec<WorkerResult>) -> Self {
        Self {
            results,
            index: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Worker for MockWorker {
    async fn run(&self, request: &PromptRequest) -> WorkerResult {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt().to_string());
        }
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        self.results.get(i).cloned().unwrap_or_else(|| {
            WorkerResult::failure(format!("MockWorker: no more results (called {} times)", i + 1))
        })
    }
}
