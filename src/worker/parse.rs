//! Interpret the worker's captured stdout as a [`WorkerResult`].

use serde_json::Value;

use crate::result::{MalformedOutput, WorkerResult};

/// Parse trimmed, non-empty worker output.
///
/// An object is decoded strictly into a [`WorkerResult`]. An array is the
/// legacy format: its string elements become citations and everything else
/// is dropped. Any other leading character is rejected without echoing the
/// payload.
pub fn parse_output(trimmed: &str) -> Result<WorkerResult, MalformedOutput> {
    match trimmed.chars().next() {
        Some('{') => {
            let result: WorkerResult = serde_json::from_str(trimmed)?;
            Ok(result.normalized())
        }
        Some('[') => {
            let items: Vec<Value> = serde_json::from_str(trimmed)?;
            let citations: Vec<String> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect();
            let citations = (!citations.is_empty()).then_some(citations);
            Ok(WorkerResult::success(None, citations))
        }
        Some(other) => Err(MalformedOutput::UnexpectedLeadingChar(other)),
        // Callers filter empty output; treat it like any other non-JSON.
        None => Err(MalformedOutput::UnexpectedLeadingChar(' ')),
    }
}
