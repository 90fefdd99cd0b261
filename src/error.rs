//! Error types for this crate.
//!
//! All fallible operations return [`Result<T>`] which uses [`ProbeError`] as the error type.

use thiserror::Error;

/// A [`Result`](std::result::Result) alias using [`ProbeError`] as the error type.
pub type Result<T> = std::result::Result<T, ProbeError>;

/// The unified error type for all crate errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProbeError {
    /// Network or download failure. Retry may help.
    #[error("{0}")]
    Download(String),

    /// Tokenization failure. Check input text.
    #[error("{0}")]
    Tokenization(String),

    /// Malformed dataset, vocabulary, or pattern input.
    #[error("{0}")]
    InvalidInput(String),

    /// Device initialization failure. Fall back to CPU.
    #[error("{0}")]
    Device(String),

    /// Report serialization or filesystem failure.
    #[error("{0}")]
    Report(String),

    /// Internal error. Report if seen.
    #[error("{0}")]
    Unexpected(String),
}

impl From<hf_hub::api::sync::ApiError> for ProbeError {
    fn from(value: hf_hub::api::sync::ApiError) -> Self {
        ProbeError::Download(format!("HuggingFace API error: {value}"))
    }
}

impl From<candle_core::Error> for ProbeError {
    fn from(value: candle_core::Error) -> Self {
        ProbeError::Unexpected(value.to_string())
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(value: std::io::Error) -> Self {
        ProbeError::Report(value.to_string())
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(value: serde_json::Error) -> Self {
        ProbeError::Report(value.to_string())
    }
}
