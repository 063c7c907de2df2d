//! Command-line argument parsing.

use crate::config::Config;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Anamnesis - Extract a structured clinical history from a free-text narrative.
///
/// Reads the narrative from standard input (finish with an empty line) and
/// prints every field as soon as the model has answered it.
#[derive(Debug, Parser)]
#[command(name = "anamnesis")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ANAMNESIS_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Session log file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Do not write the session log
    #[arg(long, conflicts_with = "log_file")]
    pub no_log: bool,

    /// Diagnostic verbosity on stderr (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Let command-line flags override the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if self.no_color {
            config.settings.color = false;
        }
        if let Some(path) = &self.log_file {
            config.settings.log_file = path.clone();
            config.settings.log_enabled = true;
        }
        if self.no_log {
            config.settings.log_enabled = false;
        }
    }

    /// Default `tracing` filter for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
