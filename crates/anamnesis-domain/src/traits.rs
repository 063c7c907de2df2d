//! Trait definitions for external interactions
//!
//! Presentation and logging collaborators implement these; the pipeline only
//! forwards results to them.

use crate::{ExtractionResult, RunId, RunSummary};

/// Receives extraction results in completion order
///
/// Implemented by the presentation layer (anamnesis-cli). A sink performs no
/// retry or validation logic; its errors never abort a run.
pub trait ResultSink {
    /// Error type for sink operations
    type Error;

    /// Called once before the first result of a run
    fn begin(&mut self, _run_id: RunId, _narrative: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called once per slot, as soon as that slot completes
    fn accept(&mut self, result: &ExtractionResult) -> Result<(), Self::Error>;

    /// Called once after the last result of a run
    fn finish(&mut self, _summary: &RunSummary) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    type Error = S::Error;

    fn begin(&mut self, run_id: RunId, narrative: &str) -> Result<(), Self::Error> {
        (**self).begin(run_id, narrative)
    }

    fn accept(&mut self, result: &ExtractionResult) -> Result<(), Self::Error> {
        (**self).accept(result)
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<(), Self::Error> {
        (**self).finish(summary)
    }
}

/// Sink that keeps every result in memory
impl ResultSink for Vec<ExtractionResult> {
    type Error = std::convert::Infallible;

    fn accept(&mut self, result: &ExtractionResult) -> Result<(), Self::Error> {
        self.push(result.clone());
        Ok(())
    }
}
