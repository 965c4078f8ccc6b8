//! Inbound prompt and its validation.

use thiserror::Error;

use crate::consts::{PROMPT_MAX_CHARS, PROMPT_MIN_CHARS};

/// Why a prompt was refused before reaching the worker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("prompt must not be blank")]
    Blank,

    #[error("prompt is too short ({len} characters, minimum {min})")]
    TooShort { len: usize, min: usize },

    #[error("prompt is too long ({len} characters, maximum {max})")]
    TooLong { len: usize, max: usize },
}

/// A validated prompt. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    prompt: String,
}

impl PromptRequest {
    /// Validate and wrap a prompt. The text is kept as given, not trimmed.
    pub fn new(prompt: impl Into<String>) -> Result<Self, RequestError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(RequestError::Blank);
        }
        // UTF-16 units, so a char outside the BMP counts twice.
        let len = prompt.encode_utf16().count();
        if len < PROMPT_MIN_CHARS {
            return Err(RequestError::TooShort {
                len,
                min: PROMPT_MIN_CHARS,
            });
        }
        if len > PROMPT_MAX_CHARS {
            return Err(RequestError::TooLong {
                len,
                max: PROMPT_MAX_CHARS,
            });
        }
        Ok(Self { prompt })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_normal_prompt() {
        let req = PromptRequest::new("What was Apple's net income in FY2022?").unwrap();
        assert_eq!(req.prompt(), "What was Apple's net income in FY2022?");
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert_eq!(PromptRequest::new(""), Err(RequestError::Blank));
        assert_eq!(PromptRequest::new("   \n\t"), Err(RequestError::Blank));
    }

    #[test]
    fn rejects_single_char() {
        assert_eq!(
            PromptRequest::new("a"),
            Err(RequestError::TooShort { len: 1, min: 2 })
        );
    }

    #[test]
    fn accepts_bounds() {
        assert!(PromptRequest::new("ab").is_ok());
        assert!(PromptRequest::new("x".repeat(500)).is_ok());
    }

    #[test]
    fn rejects_over_max() {
        assert_eq!(
            PromptRequest::new("x".repeat(501)),
            Err(RequestError::TooLong { len: 501, max: 500 })
        );
    }

    #[test]
    fn astral_chars_count_twice() {
        // 250 emoji are 500 UTF-16 units; one more tips it over.
        assert!(PromptRequest::new("😀".repeat(250)).is_ok());
        assert_eq!(
            PromptRequest::new("😀".repeat(251)),
            Err(RequestError::TooLong { len: 502, max: 500 })
        );
    }

    #[test]
    fn counts_chars_not_bytes() {
        // 500 two-byte chars is 1000 bytes but still within bounds.
        assert!(PromptRequest::new("é".repeat(500)).is_ok());
    }

    #[test]
    fn keeps_surrounding_whitespace() {
        let req = PromptRequest::new("  hi  ").unwrap();
        assert_eq!(req.prompt(), "  hi  ");
    }
}
