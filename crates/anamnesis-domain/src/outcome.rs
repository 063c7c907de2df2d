//! Requests issued per slot and the outcomes they produce

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Maximum number of characters kept in an error excerpt
pub const EXCERPT_LIMIT: usize = 200;

/// Truncate text to at most [`EXCERPT_LIMIT`] characters
///
/// Truncation counts characters, never splitting a UTF-8 sequence.
///
/// # Examples
///
/// ```
/// use anamnesis_domain::{truncate_excerpt, EXCERPT_LIMIT};
///
/// let long = "x".repeat(500);
/// assert_eq!(truncate_excerpt(&long).chars().count(), EXCERPT_LIMIT);
/// assert_eq!(truncate_excerpt("short"), "short");
/// ```
pub fn truncate_excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_LIMIT).collect()
}

/// Category of a slot-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The backend answered with a non-200 status
    HttpStatus,
    /// Connection failure, timeout, unreadable body or cancellation
    NetworkException,
    /// Structured output could not be parsed, even after repair
    ParseFailure,
}

impl ErrorKind {
    /// Stable snake_case name used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::HttpStatus => "http_status",
            ErrorKind::NetworkException => "network_exception",
            ErrorKind::ParseFailure => "parse_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A self-contained description of why a slot failed
///
/// Carries enough context for diagnosis without retrying: the kind, a
/// human-readable message and, where available, a truncated excerpt of the
/// offending payload.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ErrorDescriptor {
    /// Failure category
    pub kind: ErrorKind,

    /// Human-readable description
    pub message: String,

    /// Up to [`EXCERPT_LIMIT`] characters of the raw payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

impl ErrorDescriptor {
    /// Create a descriptor without an excerpt
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            excerpt: None,
        }
    }

    /// Backend returned a non-200 status; `body` is truncated
    pub fn http_status(status: u16, body: &str) -> Self {
        Self::new(ErrorKind::HttpStatus, format!("backend returned HTTP {}", status))
            .with_excerpt(body.trim())
    }

    /// Transport-level failure
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkException, message)
    }

    /// Structured decode failed; `text` is the (repaired) payload
    pub fn parse_failure(message: impl Into<String>, text: &str) -> Self {
        Self::new(ErrorKind::ParseFailure, message).with_excerpt(text)
    }

    /// Attach an excerpt, truncated to [`EXCERPT_LIMIT`] characters
    pub fn with_excerpt(mut self, text: &str) -> Self {
        self.excerpt = Some(truncate_excerpt(text));
        self
    }
}

/// The request issued for one slot in one run
///
/// Owned exclusively by the task that issues it and dropped once the
/// response has been obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// Slot the request belongs to
    pub slot_id: String,

    /// Fully composed prompt
    pub prompt: String,

    /// Output length budget
    pub max_output_tokens: u32,
}

/// What a slot produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SlotValue {
    /// Free-text answer (slot has no shape template)
    Text(String),
    /// Parsed JSON answer
    Structured(Value),
    /// The slot failed; the run still counts it as completed
    Failed(ErrorDescriptor),
}

impl SlotValue {
    /// Whether this value is a failure
    pub fn is_error(&self) -> bool {
        matches!(self, SlotValue::Failed(_))
    }

    /// The error descriptor, if the slot failed
    pub fn error(&self) -> Option<&ErrorDescriptor> {
        match self {
            SlotValue::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Result<SlotValue, ErrorDescriptor>> for SlotValue {
    fn from(result: Result<SlotValue, ErrorDescriptor>) -> Self {
        result.unwrap_or_else(SlotValue::Failed)
    }
}

/// The single outcome of one slot in one run
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    /// Slot that produced this result
    pub slot_id: String,

    /// Answer or error
    pub value: SlotValue,

    /// Time from first attempt to final return, back-off included
    pub elapsed: Duration,
}

impl ExtractionResult {
    /// Create a new result
    pub fn new(slot_id: impl Into<String>, value: SlotValue, elapsed: Duration) -> Self {
        Self {
            slot_id: slot_id.into(),
            value,
            elapsed,
        }
    }

    /// Elapsed time in seconds, rounded to two decimals
    pub fn elapsed_seconds(&self) -> f64 {
        (self.elapsed.as_secs_f64() * 100.0).round() / 100.0
    }

    /// Whether the slot failed
    pub fn is_error(&self) -> bool {
        self.value.is_error()
    }
}
