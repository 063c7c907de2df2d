//! Anamnesis CLI library.
//!
//! Everything behind the `anamnesis` binary: argument parsing, configuration,
//! narrative input, and the console and log-file reports a run feeds.

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod logfile;
pub mod output;
pub mod session;

pub use cli::Cli;
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
pub use session::{run_session, Report};
