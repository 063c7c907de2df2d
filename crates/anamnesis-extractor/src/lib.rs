//! Anamnesis Extractor
//!
//! Fans one clinical narrative out to a catalog of slots, one LLM request per
//! slot, and yields the decoded answers as they complete.
//!
//! # Architecture
//!
//! ```text
//! Narrative → Extractor → [slot × N: prompt → InferenceClient → decode] → ExtractionRun → ResultSink
//! ```
//!
//! # Key Features
//!
//! - **Staggered fan-out**: slot *i* starts `i × stagger` after the run begins
//! - **Bounded concurrency**: at most `max_in_flight` requests hit the backend
//! - **Retry and deadlines**: per attempt, handled by the inference client
//! - **Bracket repair**: truncated JSON answers get one repair pass
//! - **Completion order**: results stream out as soon as each slot is done
//! - **Cancellation**: pending slots finish as `network_exception` failures
//!
//! # Example Usage
//!
//! ```
//! use anamnesis_extractor::{Extractor, ExtractorConfig, SlotCatalog};
//! use anamnesis_llm::MockProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = Extractor::new(ExtractorConfig::default())?;
//! let catalog = SlotCatalog::clinical();
//! let llm = MockProvider::new("Not mentioned.");
//!
//! let mut results = Vec::new();
//! let summary = extractor
//!     .run_catalog(llm, "Patient reports headache for 3 days.", &catalog)
//!     .drain(&mut results)
//!     .await;
//!
//! assert_eq!(summary.completed, catalog.len());
//! assert_eq!(results.len(), catalog.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod catalog;
mod config;
pub mod decoder;
mod error;
mod extractor;
mod prompt;


pub use catalog::SlotCatalog;
pub use config::{ExtractorConfig, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_STAGGER_MS};
pub use decoder::{decode, repair_json};
pub use error::{CatalogError, ExtractorError};
pub use extractor::{ExtractionRun, Extractor};
pub use prompt::{build_prompt, PromptBuilder};
