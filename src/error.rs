//! Error types for the ingestion pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for table and batch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure is terminal for the request that hit it; nothing is retried.
#[derive(Error, Debug)]
pub enum Error {
    #[error("table store unavailable at {}: {source}", .path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed table at line {line}: {reason}")]
    MalformedTable { line: usize, reason: String },

    #[error("malformed batch at offset {offset}: {reason}")]
    MalformedBatch { offset: usize, reason: String },

    #[error("failed to rewrite table {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn table(line: usize, reason: impl Into<String>) -> Self {
        Error::MalformedTable { line, reason: reason.into() }
    }

    pub(crate) fn batch(offset: usize, reason: impl Into<String>) -> Self {
        Error::MalformedBatch { offset, reason: reason.into() }
    }

    /// Stable numeric code, logged alongside the message.
    pub fn code(&self) -> u32 {
        match self {
            Error::StoreUnavailable { .. } => 10,
            Error::MalformedTable { .. } => 11,
            Error::MalformedBatch { .. } => 20,
            Error::WriteFailure { .. } => 30,
        }
    }

    /// True when the caller sent bad input, false when the server side failed.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::MalformedBatch { .. })
    }
}
