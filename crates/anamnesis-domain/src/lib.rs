//! Anamnesis Domain Layer
//!
//! Core data model for multi-slot clinical extraction. Every other crate in
//! the workspace depends on the types defined here.
//!
//! ## Key Concepts
//!
//! - **Slot**: one named field to extract from a narrative (`SlotSpec`)
//! - **Request**: the prompt issued for one slot in one run (`ExtractionRequest`)
//! - **Result**: the single outcome a slot produces per run (`ExtractionResult`)
//! - **Error descriptor**: a tagged, self-contained failure report (`ErrorDescriptor`)
//! - **Run**: one pass of the pipeline over one narrative (`RunId`)
//!
//! ## Architecture
//!
//! - Pure data and trait definitions only
//! - No I/O, no async runtime
//! - Infrastructure implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod outcome;
pub mod run;
pub mod slot;
pub mod traits;

// Re-exports for convenience
pub use outcome::{
    truncate_excerpt, ErrorDescriptor, ErrorKind, ExtractionRequest, ExtractionResult, SlotValue,
    EXCERPT_LIMIT,
};
pub use run::{RunId, RunSummary};
pub use slot::SlotSpec;
pub use traits::ResultSink;
