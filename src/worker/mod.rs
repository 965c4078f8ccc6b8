pub mod drain;
pub mod mock;
pub mod parse;
pub mod process;

use async_trait::async_trait;

use crate::request::PromptRequest;
use crate::result::WorkerResult;

/// Something that answers a prompt. Never fails: errors come back as
/// `WorkerResult { ok: false, .. }`.
#[async_trait]
pub trait Worker: Send + Sync {
    async fn run(&self, request: &PromptRequest) -> WorkerResult;
}
