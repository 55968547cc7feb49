//! Unified error types for the pipeline core.
//!
//! Mirrors the two-tier strategy of the rest of this crate's ambient stack:
//! internal helpers use `anyhow::Result` for ergonomic `?` propagation, and
//! `NeuravoxError` is the typed boundary returned from every
//! [`crate::orchestrator::Orchestrator`]-facing operation.

use std::path::PathBuf;

pub use crate::provider::ProviderError;

/// Top-level error type for pipeline-core operations.
#[derive(Debug, thiserror::Error)]
pub enum NeuravoxError {
    /// Input or configuration failed pre-flight validation. Never mutates state.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Container/codec the decoder adapter does not understand.
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Decoded stream contained zero samples.
    #[error("audio file decoded to zero samples: {0}")]
    EmptyAudio(PathBuf),

    /// Corrupt or truncated stream, with the byte offset where decoding stopped.
    #[error("decode error at byte offset {offset} in {path}: {message}")]
    Decode {
        path: PathBuf,
        offset: u64,
        message: String,
    },

    /// FLAC chunk encoding failed.
    #[error("chunk encode error: {0}")]
    Encode(String),

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A backend call failed in a way that is retryable; surfaced only once
    /// all retries in the scheduler are exhausted.
    #[error("backend transient error: {0}")]
    BackendTransient(#[from] ProviderError),

    /// A backend call failed in a way that is not retryable. Other chunks continue.
    #[error("backend fatal error: {0}")]
    BackendFatal(String),

    /// Clean, caller-requested abort. State is coherent and resumable.
    #[error("operation cancelled")]
    Cancelled,

    /// Durable state-store failure.
    #[error("state store error: {0}")]
    State(String),

    /// Configuration load or merge failure.
    #[error("configuration error: {0}")]
    Config(String),
}

impl NeuravoxError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error represents a transient backend failure that the
    /// scheduler should retry rather than surface to the orchestrator.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendTransient(_))
    }
}

/// Convenience result type using [`NeuravoxError`].
pub type Result<T> = std::result::Result<T, NeuravoxError>;

// Internal helpers propagate anyhow::Error; convert at the component boundary.
impl From<anyhow::Error> for NeuravoxError {
    fn from(err: anyhow::Error) -> Self {
        NeuravoxError::State(err.to_string())
    }
}

impl From<rusqlite::Error> for NeuravoxError {
    fn from(err: rusqlite::Error) -> Self {
        NeuravoxError::State(err.to_string())
    }
}
