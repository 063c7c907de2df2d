//! One extraction session: narrative in, report out.

use crate::config::Config;
use crate::error::Result;
use crate::logfile::LogFileSink;
use crate::output::{ConsoleSink, Formatter};
use anamnesis_domain::{ExtractionResult, ResultSink, RunId, RunSummary};
use anamnesis_extractor::{Extractor, SlotCatalog};
use std::io::{self, Write};
use tracing::warn;

/// Console report, mirrored to the session log when one is open
pub struct Report<W> {
    console: ConsoleSink<W>,
    log: Option<LogFileSink>,
}

impl<W: Write> Report<W> {
    /// Create a report over a console sink and an optional log
    pub fn new(console: ConsoleSink<W>, log: Option<LogFileSink>) -> Self {
        Self { console, log }
    }

    /// Build the report a configuration asks for
    ///
    /// A log file that cannot be opened is skipped with a warning.
    pub fn from_config(config: &Config, out: W) -> Self {
        let formatter = Formatter::new(config.settings.color);
        let log = if config.settings.log_enabled {
            match LogFileSink::open(&config.settings.log_file) {
                Ok(log) => Some(log),
                Err(e) => {
                    warn!(
                        "Session log {} unavailable: {}",
                        config.settings.log_file.display(),
                        e
                    );
                    None
                }
            }
        } else {
            None
        };
        Self::new(ConsoleSink::new(out, formatter), log)
    }

    /// Whether results are also being logged
    pub fn is_logging(&self) -> bool {
        self.log.is_some()
    }

    /// Split the report back into its parts
    pub fn into_parts(self) -> (ConsoleSink<W>, Option<LogFileSink>) {
        (self.console, self.log)
    }
}

impl<W: Write> ResultSink for Report<W> {
    type Error = io::Error;

    // The log is written even when the console fails, and vice versa.

    fn begin(&mut self, run_id: RunId, narrative: &str) -> io::Result<()> {
        let console = self.console.begin(run_id, narrative);
        if let Some(log) = &mut self.log {
            log.begin(run_id, narrative)?;
        }
        console
    }

    fn accept(&mut self, result: &ExtractionResult) -> io::Result<()> {
        let console = self.console.accept(result);
        if let Some(log) = &mut self.log {
            log.accept(result)?;
        }
        console
    }

    fn finish(&mut self, summary: &RunSummary) -> io::Result<()> {
        let console = self.console.finish(summary);
        if let Some(log) = &mut self.log {
            log.finish(summary)?;
        }
        console
    }
}

/// Run every catalog slot over `narrative` against the configured endpoint
pub async fn run_session<W: Write>(
    config: &Config,
    catalog: &SlotCatalog,
    narrative: &str,
    out: W,
) -> Result<RunSummary> {
    let extractor = Extractor::new(config.extractor.clone())?;
    let report = Report::from_config(config, out);
    Ok(extractor.extract(narrative, catalog, report).await?)
}
