//! Append-only session log.
//!
//! Every entry is prefixed with a local `[YYYY-MM-DD HH:MM:SS]` timestamp.

use crate::output::render_result;
use anamnesis_domain::{ExtractionResult, ResultSink, RunId, RunSummary};
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Opening marker of every session
pub const SESSION_MARKER: &str = "=== NEW SESSION START ===";

/// Appends one session per run to a log file
pub struct LogFileSink {
    file: File,
    path: PathBuf,
}

impl LogFileSink {
    /// Open `path` for appending, creating it if needed
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { file, path })
    }

    /// Location of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_entry(&mut self, text: &str) -> io::Result<()> {
        let timestamp = Local::now().format("[%Y-%m-%d %H:%M:%S]");
        writeln!(self.file, "{} {}", timestamp, text)
    }
}

impl ResultSink for LogFileSink {
    type Error = io::Error;

    fn begin(&mut self, run_id: RunId, narrative: &str) -> io::Result<()> {
        self.write_entry(&format!("{} run {}", SESSION_MARKER, run_id))?;
        self.write_entry(&format!("INPUT:\n{}\n", narrative))
    }

    fn accept(&mut self, result: &ExtractionResult) -> io::Result<()> {
        self.write_entry(&render_result(result))
    }

    fn finish(&mut self, summary: &RunSummary) -> io::Result<()> {
        self.write_entry(&format!("\n✅ Total Time: {:.2}s\n", summary.elapsed_seconds()))?;
        self.file.flush()
    }
}
