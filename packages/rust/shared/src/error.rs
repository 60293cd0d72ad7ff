//! Error types for texquiz.
//!
//! Library crates use [`TexquizError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all texquiz operations.
#[derive(Debug, thiserror::Error)]
pub enum TexquizError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Unusable user input: a bad source document path or an empty question name.
    #[error("input error: {message}")]
    Input { message: String },

    /// Malformed question markup. Extraction aborts without a partial set.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The searchable region is non-empty but holds no question block.
    #[error("no question blocks found, check the document format")]
    NoQuestions,

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error, such as a correct index out of range.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The background render worker died before reporting.
    #[error("render worker error: {0}")]
    Worker(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TexquizError>;

impl TexquizError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an input error from any displayable message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input {
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

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
