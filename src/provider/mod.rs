//! Transcription backend interface + three concrete providers (C5).
//!
//! # Architecture
//!
//! ```text
//! Provider System
//!   ├── Registry   - backend lookup by id
//!   ├── retry       - shared exponential-backoff-with-jitter policy (C6 uses this)
//!   └── Providers
//!       ├── cloud_a      - remote HTTP backend, raw-body upload
//!       ├── cloud_b      - remote HTTP backend, multipart upload
//!       └── local_neural - in-process inference, model loaded once per process
//! ```

mod cloud_a;
mod cloud_b;
pub mod error;
mod local_neural;
pub mod retry;

pub use error::ProviderError;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Default per-attempt backend call timeout (spec.md §5).
pub const DEFAULT_TIMEOUT_SECS: u64 = crate::config::defaults::DEFAULT_BACKEND_TIMEOUT_SECS;

/// Options carried into a `transcribe` call (spec.md §4.5).
#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    pub language: Option<String>,
    pub temperature: Option<f32>,
    pub include_timestamps: bool,
}

/// A backend-reported segment- or word-level timestamp span.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TimedSpan {
    pub start_s: f64,
    pub end_s: f64,
    pub text: String,
}

/// Result of transcribing one chunk.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub segments: Option<Vec<TimedSpan>>,
    pub words: Option<Vec<TimedSpan>>,
    pub tokens_used: Option<u32>,
}

/// The three backend identities this crate registers, per spec.md §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendId {
    CloudA,
    CloudB,
    LocalNeural,
}

impl BackendId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CloudA => "cloud-a",
            Self::CloudB => "cloud-b",
            Self::LocalNeural => "local-neural",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cloud-a" => Some(Self::CloudA),
            "cloud-b" => Some(Self::CloudB),
            "local-neural" => Some(Self::LocalNeural),
            _ => None,
        }
    }

    pub fn is_local(self) -> bool {
        matches!(self, Self::LocalNeural)
    }

    /// Environment variable the core reads for this backend's credential, if
    /// it requires one (spec.md §6).
    pub fn credential_env_var(self) -> Option<&'static str> {
        match self {
            Self::CloudA => Some("GOOGLE_API_KEY"),
            Self::CloudB => Some("OPENAI_API_KEY"),
            Self::LocalNeural => None,
        }
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability interface implemented by each concrete backend (spec.md §4.5).
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Stable identifier, e.g. `"cloud-a"`.
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    /// Model identifier reported in `transcription_metadata.json`'s
    /// `backend_model_id` field (spec.md §4.7/§6).
    fn model_id(&self) -> String;

    /// Name of the credential this backend needs resolved from config/env,
    /// or `None` if it runs without one.
    fn requires_credential(&self) -> Option<&'static str>;

    fn supports_timestamps(&self) -> bool;

    /// Transcribe the chunk at `audio_path`. May suspend at a network
    /// round-trip or, for the local backend, at an inference call run via
    /// `spawn_blocking`.
    async fn transcribe(
        &self,
        client: &reqwest::Client,
        credential: Option<&str>,
        audio_path: &Path,
        options: &TranscribeOptions,
    ) -> Result<TranscriptionResult, ProviderError>;
}

/// Registry of all built-in transcription backends, keyed by [`BackendId::as_str`].
pub struct ProviderRegistry {
    backends: HashMap<&'static str, Arc<dyn TranscriptionBackend>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        let mut backends: HashMap<&'static str, Arc<dyn TranscriptionBackend>> = HashMap::new();
        backends.insert("cloud-a", Arc::new(cloud_a::CloudABackend));
        backends.insert("cloud-b", Arc::new(cloud_b::CloudBBackend));
        backends.insert(
            "local-neural",
            Arc::new(local_neural::LocalNeuralBackend::default()),
        );
        Self { backends }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn TranscriptionBackend>> {
        self.backends.get(id).cloned()
    }

    pub fn get_by_kind(&self, id: BackendId) -> Arc<dyn TranscriptionBackend> {
        self.get(id.as_str())
            .expect("every BackendId variant has a registered backend")
    }

    pub fn list(&self) -> Vec<&'static str> {
        self.backends.keys().copied().collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global provider registry, built once and shared by every scheduler run.
pub fn registry() -> &'static ProviderRegistry {
    static REGISTRY: OnceLock<ProviderRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ProviderRegistry::new)
}
