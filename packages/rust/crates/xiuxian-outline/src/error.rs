//! Error types for outline graph access.
//!
//! Parser and render functions are total and never produce these; only
//! directory access, persistence and configuration loading do.

use thiserror::Error;

/// Errors surfaced by directory access, stores and configuration.
#[derive(Debug, Error)]
pub enum OutlineError {
    /// A file or directory entry does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An entry name was rejected before touching the filesystem.
    #[error("Invalid entry name: {0}")]
    InvalidName(String),

    /// Low-level I/O error from `std::io`.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata store failure (persistence, lock, decode).
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration file could not be parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON encode/decode failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OutlineError {
    /// Whether this error means "absent" rather than "broken".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
