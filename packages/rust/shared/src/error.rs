//! Error types for scripturekit.
//!
//! Library crates use [`ScripturekitError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all scripturekit operations.
#[derive(Debug, thiserror::Error)]
pub enum ScripturekitError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The publication's navigation could not be fetched or understood.
    /// Fatal for the publication.
    #[error("discovery error for {uri}: {message}")]
    Discovery { uri: String, message: String },

    /// A page could not be retrieved.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Page markup does not match any known shape.
    #[error("parse error for {uri}: {message}")]
    Parse { uri: String, message: String },

    /// Too many pages failed, or there is nothing to assemble.
    #[error("assembly error: {message}")]
    Assembly { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON encoding/decoding error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScripturekitError>;

impl ScripturekitError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a discovery error for the given navigation uri.
    pub fn discovery(uri: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Discovery {
            uri: uri.into(),
            message: msg.into(),
        }
    }

    /// Create a parse error for the given content uri.
    pub fn parse(uri: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Parse {
            uri: uri.into(),
            message: msg.into(),
        }
    }

    /// Create an assembly error from any displayable message.
    pub fn assembly(msg: impl Into<String>) -> Self {
        Self::Assembly {
            message: msg.into(),
        }
    }

    /// Whether the operation that produced this error may succeed if run again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch(e) if e.is_transient())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Transport-level failure for a single request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The origin answered with a non-success status.
    #[error("{url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// The request timed out.
    #[error("{url}: timed out")]
    Timeout { url: String },

    /// Connection could not be established or was reset.
    #[error("{url}: connection failed: {message}")]
    Connect { url: String, message: String },

    /// The response body could not be read.
    #[error("{url}: body read failed: {message}")]
    Body { url: String, message: String },

    /// The request could not be built or sent for a non-network reason.
    #[error("{url}: {message}")]
    Request { url: String, message: String },

    /// The origin answered with a page shell that carries no embedded state.
    #[error("{url}: page has no embedded state")]
    MissingState { url: String },
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => {
                *status >= 500 || *status == 429 || *status == 408
            }
            Self::Timeout { .. }
            | Self::Connect { .. }
            | Self::Body { .. }
            | Self::MissingState { .. } => true,
            Self::Request { .. } => false,
        }
    }

    /// HTTP status code, if the origin answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
