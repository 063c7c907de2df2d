//! Error types for the Extractor
//!
//! These cover setup only. Once a run has started, every failure is reported
//! per slot as an `ErrorDescriptor`.

use anamnesis_llm::LlmError;
use thiserror::Error;

/// Errors that can occur before a run starts
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Slot catalog error
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// LLM provider could not be set up
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Catalog or configuration file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid slot catalog
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    /// Two slots share an id
    #[error("Duplicate slot id '{0}'")]
    DuplicateSlot(String),

    /// A slot has an empty id
    #[error("Slot at position {0} has an empty id")]
    EmptyId(usize),

    /// TOML document could not be parsed
    #[error("Failed to parse catalog: {0}")]
    Parse(String),
}
