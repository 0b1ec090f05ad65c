//! Core pipeline orchestration for scripturekit.
//!
//! This crate ties together discovery, fetching, parsing, and document
//! assembly into end-to-end workflows (e.g., [`pipeline::Pipeline::run_batch`]).

pub mod assembler;
pub mod pipeline;
pub mod toc;

pub use assembler::{Assembly, AssemblyWarning, WarningKind, assemble};
pub use pipeline::{
    DocumentSink, Job, Pipeline, ProgressReporter, PublicationOutcome, PublicationReport,
    PublicationStatus, SilentProgress,
};
