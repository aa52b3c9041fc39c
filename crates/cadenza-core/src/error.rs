//! Error types for the analysis pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum Error {
    // Resolution errors
    #[error("Unresolvable source: {0}")]
    UnresolvableSource(String),

    // Download errors
    #[error("Failed to download: {url}")]
    Download { url: String, source: reqwest::Error },

    #[error("Download rejected: {url}: {reason}")]
    DownloadRejected { url: String, reason: String },

    // Extraction errors
    #[error("Audio extraction failed for {url}: {diagnostic}")]
    Extraction { url: String, diagnostic: String },

    // Decode errors
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },

    // Dispatch errors
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
}

impl Error {
    /// Create a decode error for a path
    pub fn decode(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-parameter error
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if a retry may succeed (connection failure or timeout,
    /// never HTTP status errors or extraction failures)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Download { source, .. } if source.is_timeout() || source.is_connect()
        )
    }

    /// Returns the error kind name surfaced to tool callers
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnresolvableSource(_) => "UnresolvableSourceError",
            Error::Download { .. } => "DownloadError",
            Error::DownloadRejected { .. } => "DownloadError",
            Error::Extraction { .. } => "ExtractionError",
            Error::Decode { .. } => "DecodeError",
            Error::UnknownOperation(_) => "UnknownOperationError",
            Error::InvalidParameter { .. } => "InvalidParameterError",
        }
    }
}
