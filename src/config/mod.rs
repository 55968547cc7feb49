//! Configuration + validation (C10).
//!
//! Layered merge, highest precedence first: environment variables, then the
//! user's `<workspace>/config.yaml`-shaped file, then hard-coded defaults.
//! Validation errors are collected rather than short-circuited on the first
//! failure, per spec.md §4.10.

pub mod defaults;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// `processing` section: everything C1/C2/C3 need to decode, segment, and
/// encode a recording.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProcessingConfig {
    pub silence_threshold: f64,
    pub min_silence_duration: f64,
    pub min_chunk_duration: f64,
    pub sample_rate: u32,
    pub output_format: String,
    pub normalize: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            silence_threshold: defaults::DEFAULT_SILENCE_THRESHOLD,
            min_silence_duration: defaults::DEFAULT_MIN_SILENCE_DURATION_S,
            min_chunk_duration: defaults::DEFAULT_MIN_CHUNK_DURATION_S,
            sample_rate: defaults::DEFAULT_SAMPLE_RATE,
            output_format: defaults::DEFAULT_OUTPUT_FORMAT.to_string(),
            normalize: defaults::DEFAULT_NORMALIZE,
        }
    }
}

/// `transcription` section: C5/C6 scheduling and backend selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub default_backend: String,
    pub max_concurrent: usize,
    pub include_timestamps: bool,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            default_backend: defaults::DEFAULT_BACKEND.to_string(),
            max_concurrent: defaults::DEFAULT_MAX_CONCURRENT,
            include_timestamps: defaults::DEFAULT_INCLUDE_TIMESTAMPS,
        }
    }
}

/// Root configuration object, matching the shape in spec.md §4.10's table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub workspace_base_path: PathBuf,
    pub processing: ProcessingConfig,
    pub transcription: TranscriptionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_base_path: crate::workspace::Workspace::default_root(),
            processing: ProcessingConfig::default(),
            transcription: TranscriptionConfig::default(),
        }
    }
}

/// A single validation failure, collected rather than raised immediately.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ConfigError {
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result of loading + validating configuration: the merged object plus
/// whatever errors were collected (empty if valid).
#[derive(Debug)]
pub struct ConfigSummary {
    pub config: Config,
    pub errors: Vec<ConfigError>,
}

impl ConfigSummary {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Config {
    /// Load and merge: env vars > `<workspace>/config.yaml` > defaults.
    ///
    /// `config_path` overrides the default `<workspace>/config.yaml` lookup
    /// (mirrors `NEURAVOX_CONFIG`). `workspace_override` mirrors
    /// `NEURAVOX_WORKSPACE` read by the caller before this is invoked, so the
    /// config file can be found in the right place.
    pub fn load(config_path: Option<&Path>) -> ConfigSummary {
        let mut config = Config::default();

        if let Ok(ws) = std::env::var("NEURAVOX_WORKSPACE") {
            config.workspace_base_path = PathBuf::from(ws);
        }

        let resolved_path = config_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("NEURAVOX_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| config.workspace_base_path.join("config.yaml"));

        if let Ok(contents) = std::fs::read_to_string(&resolved_path) {
            match serde_yaml::from_str::<FileConfig>(&contents) {
                Ok(file_config) => file_config.merge_into(&mut config),
                Err(e) => {
                    tracing::warn!(path = %resolved_path.display(), error = %e, "failed to parse config file, using defaults");
                }
            }
        }

        // Environment variables take highest precedence, re-applied after the file layer.
        if let Ok(ws) = std::env::var("NEURAVOX_WORKSPACE") {
            config.workspace_base_path = PathBuf::from(ws);
        }

        config.warn_if_default_backend_credential_missing();

        let errors = config.validate();
        ConfigSummary { config, errors }
    }

    /// Non-fatal: logs a warning if the *configured default* backend's
    /// credential isn't set. This is deliberately not a `ConfigError` — the
    /// caller may still select a different backend per run. The fatal
    /// check for whichever backend is actually selected lives in
    /// `Orchestrator::validate` (spec.md §4.10).
    fn warn_if_default_backend_credential_missing(&self) {
        let Some(backend_id) = crate::provider::BackendId::parse(&self.transcription.default_backend)
        else {
            return;
        };
        if let Some(env_var) = backend_id.credential_env_var()
            && std::env::var(env_var).is_err()
        {
            tracing::warn!(
                backend = %backend_id,
                credential = env_var,
                "configured default backend has no credential set; this is fatal only if the backend is actually selected for a run"
            );
        }
    }

    /// Validate against spec.md §4.10's ranges. Errors are collected, not
    /// fail-fast, so a caller sees every problem in one pass.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let p = &self.processing;

        if !(0.001..=1.0).contains(&p.silence_threshold) {
            errors.push(ConfigError::new(
                "processing.silence_threshold",
                format!("{} out of range 0.001-1.0", p.silence_threshold),
            ));
        }
        if !(0.1..=300.0).contains(&p.min_silence_duration) {
            errors.push(ConfigError::new(
                "processing.min_silence_duration",
                format!("{} out of range 0.1-300", p.min_silence_duration),
            ));
        }
        if p.min_chunk_duration < 0.0 {
            errors.push(ConfigError::new(
                "processing.min_chunk_duration",
                format!("{} must be >= 0", p.min_chunk_duration),
            ));
        }
        if !matches!(p.sample_rate, 8_000 | 16_000 | 22_050 | 44_100 | 48_000) {
            errors.push(ConfigError::new(
                "processing.sample_rate",
                format!("{} not one of 8000/16000/22050/44100/48000", p.sample_rate),
            ));
        }
        if !matches!(p.output_format.as_str(), "flac" | "wav" | "mp3") {
            errors.push(ConfigError::new(
                "processing.output_format",
                format!("{} not one of flac/wav/mp3", p.output_format),
            ));
        }

        let t = &self.transcription;
        if !(1..=10).contains(&t.max_concurrent) {
            errors.push(ConfigError::new(
                "transcription.max_concurrent",
                format!("{} out of range 1-10", t.max_concurrent),
            ));
        }
        if crate::provider::BackendId::parse(&t.default_backend).is_none() {
            errors.push(ConfigError::new(
                "transcription.default_backend",
                format!("unknown backend id '{}'", t.default_backend),
            ));
        }

        errors
    }

    pub fn workspace(&self) -> crate::workspace::Workspace {
        crate::workspace::Workspace::new(self.workspace_base_path.clone())
    }
}

/// Partial, all-optional mirror of [`Config`] for deserializing the YAML
/// file layer without forcing every key to be present.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    workspace: Option<FileWorkspace>,
    processing: Option<FileProcessing>,
    transcription: Option<FileTranscription>,
}

#[derive(Debug, Default, Deserialize)]
struct FileWorkspace {
    base_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct FileProcessing {
    silence_threshold: Option<f64>,
    min_silence_duration: Option<f64>,
    min_chunk_duration: Option<f64>,
    sample_rate: Option<u32>,
    output_format: Option<String>,
    normalize: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct FileTranscription {
    default_backend: Option<String>,
    max_concurrent: Option<usize>,
    include_timestamps: Option<bool>,
}

impl FileConfig {
    fn merge_into(self, config: &mut Config) {
        if let Some(ws) = self.workspace
            && let Some(base_path) = ws.base_path
        {
            config.workspace_base_path = base_path;
        }
        if let Some(p) = self.processing {
            if let Some(v) = p.silence_threshold {
                config.processing.silence_threshold = v;
            }
            if let Some(v) = p.min_silence_duration {
                config.processing.min_silence_duration = v;
            }
            if let Some(v) = p.min_chunk_duration {
                config.processing.min_chunk_duration = v;
            }
            if let Some(v) = p.sample_rate {
                config.processing.sample_rate = v;
            }
            if let Some(v) = p.output_format {
                config.processing.output_format = v;
            }
            if let Some(v) = p.normalize {
                config.processing.normalize = v;
            }
        }
        if let Some(t) = self.transcription {
            if let Some(v) = t.default_backend {
                config.transcription.default_backend = v;
            }
            if let Some(v) = t.max_concurrent {
                config.transcription.max_concurrent = v;
            }
            if let Some(v) = t.include_timestamps {
                config.transcription.include_timestamps = v;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_clean() {
        let config = Config::default();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn out_of_range_values_are_all_collected() {
        let mut config = Config::default();
        config.processing.silence_threshold = 5.0;
        config.processing.sample_rate = 12_345;
        config.transcription.max_concurrent = 0;

        let errors = config.validate();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn unknown_backend_id_is_rejected() {
        let mut config = Config::default();
        config.transcription.default_backend = "not-a-backend".to_string();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "transcription.default_backend"));
    }

    #[test]
    fn file_layer_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        std::fs::write(
            &config_path,
            "processing:\n  silence_threshold: 0.05\ntranscription:\n  max_concurrent: 5\n",
        )
        .unwrap();

        let summary = Config::load(Some(&config_path));
        assert!(summary.is_valid());
        assert_eq!(summary.config.processing.silence_threshold, 0.05);
        assert_eq!(summary.config.transcription.max_concurrent, 5);
    }
}
