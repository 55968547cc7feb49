//! Transcription-backend error types and HTTP-failure classification.
//!
//! Ported from the teacher's `provider/error.rs`, trimmed to the three
//! concrete backends this crate registers and the transient/fatal split
//! spec.md §4.5/§7 requires.

/// Errors that occur while talking to a transcription backend.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("credential missing for {backend}")]
    MissingCredential { backend: String },

    #[error("invalid credential for {backend}: {reason}")]
    InvalidCredential { backend: String, reason: String },

    #[error("rate limited by {backend}")]
    RateLimited { backend: String },

    #[error("{backend} temporarily unavailable: {message}")]
    ServiceUnavailable { backend: String, message: String },

    #[error("network error talking to {backend}: {message}")]
    Network { backend: String, message: String },

    #[error("request to {backend} timed out")]
    Timeout { backend: String },

    #[error("request rejected by {backend}: {message}")]
    BadRequest { backend: String, message: String },

    #[error("file too large for {backend}")]
    FileTooLarge { backend: String },

    #[error("invalid response from {backend}: {message}")]
    InvalidResponse { backend: String, message: String },

    #[error("failed to load local model: {0}")]
    ModelLoadFailed(String),

    #[error("local inference ran out of memory")]
    InferenceOom,

    #[error("local inference runtime is not available: {0}")]
    RuntimeMissing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Whether the scheduler should retry this failure (spec.md §4.5/§7).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::ServiceUnavailable { .. }
                | Self::Network { .. }
                | Self::Timeout { .. }
        )
    }
}

impl ProviderError {
    pub fn from_reqwest(backend: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                backend: backend.to_string(),
            }
        } else if err.is_connect() {
            Self::Network {
                backend: backend.to_string(),
                message: err.to_string(),
            }
        } else {
            Self::Network {
                backend: backend.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub fn from_status(backend: &str, status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 | 403 => Self::InvalidCredential {
                backend: backend.to_string(),
                reason: body.to_string(),
            },
            408 => Self::Timeout {
                backend: backend.to_string(),
            },
            413 => Self::FileTooLarge {
                backend: backend.to_string(),
            },
            429 => Self::RateLimited {
                backend: backend.to_string(),
            },
            500 | 502 | 503 | 504 => Self::ServiceUnavailable {
                backend: backend.to_string(),
                message: body.to_string(),
            },
            _ => Self::BadRequest {
                backend: backend.to_string(),
                message: body.to_string(),
            },
        }
    }
}
