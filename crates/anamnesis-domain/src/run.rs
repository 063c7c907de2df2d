//! Run identity and summary

use std::fmt;
use std::time::Duration;

/// Unique identifier for one pipeline run, based on UUIDv7
///
/// UUIDv7 sorts chronologically, so log sessions order naturally by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(u128);

impl RunId {
    /// Generate a new UUIDv7-based RunId
    ///
    /// # Examples
    ///
    /// ```
    /// use anamnesis_domain::RunId;
    ///
    /// let a = RunId::new();
    /// let b = RunId::new();
    /// assert_ne!(a, b);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Totals reported once a run has been fully drained
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Run the summary belongs to
    pub run_id: RunId,

    /// Slots that produced a result (successful or not)
    pub completed: usize,

    /// Slots whose result is an error
    pub failed: usize,

    /// Wall-clock time of the whole run
    pub elapsed: Duration,
}

impl RunSummary {
    /// Slots that produced a usable value
    pub fn succeeded(&self) -> usize {
        self.completed - self.failed
    }

    /// Total elapsed time in seconds, rounded to two decimals
    pub fn elapsed_seconds(&self) -> f64 {
        (self.elapsed.as_secs_f64() * 100.0).round() / 100.0
    }
}
