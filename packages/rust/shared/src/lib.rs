//! Shared types, error model, and configuration for scripturekit.
//!
//! This crate is the foundation depended on by all other scripturekit crates.
//! It provides:
//! - [`ScripturekitError`] and [`FetchError`], the unified error types
//! - Output document types ([`Document`], [`StructureNode`], [`ContentRecord`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)
//! - Supported [`Language`] codes

pub mod config;
pub mod error;
pub mod language;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_BASE_URL, DefaultsConfig, FetchConfig, HttpConfig, PipelineConfig,
    PublicationConfig, RetryConfig, SCRIPTURES_PATH, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{FetchError, Result, ScripturekitError};
pub use language::{Language, SUPPORTED_LANGUAGES};
pub use types::{ContentBody, ContentKind, ContentRecord, Document, StructureNode, Verse};
