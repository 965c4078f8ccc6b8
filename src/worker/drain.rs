//! Background draining of the worker's diagnostic stream.
//!
//! The worker writes its logs to stderr. If nobody reads them the pipe fills
//! and the worker blocks, so stderr is consumed on its own task and forwarded
//! to tracing. Lines are decoded lossily and read errors end the logging, but
//! the pipe keeps being read until EOF so the worker never sees it close.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

/// How a drain task ended once the invocation was done with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Stream reached EOF; carries the number of lines logged.
    Finished(usize),
    /// Stream was still open after the grace period and the task was aborted.
    Aborted,
}

/// Read `reader` line by line into `sink` until EOF.
/// Returns the number of lines delivered.
pub async fn drain_lines<R, F>(reader: R, mut sink: F) -> usize
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut count = 0;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                sink(line.trim_end_matches(['\n', '\r']));
                count += 1;
            }
            Err(e) => {
                tracing::debug!(error = %e, "stopped logging worker stderr");
                // Keep the read end open and emptied; closing it would kill
                // or stall the worker on its next write.
                let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
                break;
            }
        }
    }
    count
}

/// Drain `reader` on a background task, logging each line.
pub fn spawn<R>(reader: R) -> JoinHandle<usize>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(drain_lines(reader, |line| {
        tracing::info!(target: "secapp::worker::stderr", "{line}");
    }))
}

/// Wait up to `grace` for a drain task to reach EOF, aborting it otherwise.
///
/// Stderr can outlive the worker when a grandchild inherits it; the drain
/// still must not outlive the invocation.
pub async fn settle(mut handle: JoinHandle<usize>, grace: Duration) -> DrainOutcome {
    match tokio::time::timeout(grace, &mut handle).await {
        Ok(Ok(lines)) => DrainOutcome::Finished(lines),
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "stderr drain task failed");
            DrainOutcome::Aborted
        }
        Err(_) => {
            handle.abort();
            DrainOutcome::Aborted
        }
    }
}
