//! Error types for LeadScout.
//!
//! Library crates use [`LeadScoutError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all LeadScout operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadScoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to a collaborator service.
    #[error("network error: {0}")]
    Network(String),

    /// Response or file parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// A data source failed to produce candidates.
    #[error("source {kind} failed: {message}")]
    Source { kind: String, message: String },

    /// The scoring capability failed for a candidate.
    #[error("scoring error: {0}")]
    Scoring(String),

    /// The summarization capability failed.
    #[error("summarization error: {0}")]
    Summarization(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (empty source list, bad format name, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A source kind was requested that has no registered implementation.
    #[error("unknown source: {0}")]
    UnknownSource(String),

    /// A task or lead id that does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A second execution was submitted for a task id already claimed.
    #[error("task {0} already has an execution")]
    DuplicateExecution(String),

    /// Lead export serialization error.
    #[error("export error: {0}")]
    Export(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadScoutError>;

impl LeadScoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a source failure for the given source tag.
    pub fn source_failure(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Source {
            kind: kind.into(),
            message: msg.into(),
        }
    }

    /// Not-found error for a lead id.
    pub fn lead_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "lead",
            id: id.to_string(),
        }
    }

    /// Not-found error for a search task id.
    pub fn task_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "search task",
            id: id.to_string(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this is a [`LeadScoutError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
