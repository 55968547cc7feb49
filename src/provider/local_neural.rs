//! Local-neural transcription backend: loads a pre-trained acoustic model
//! once per process and runs inference in-process (spec.md §4.5).
//!
//! Grounded in the teacher's `provider/local_whisper.rs`: a cached engine
//! shared by every scheduler worker that transcribes through one backend
//! instance, a stderr-suppression RAII guard around model load/inference
//! (the native whisper.cpp binding writes GGML diagnostics straight to
//! `stderr`, bypassing any logging callback), and `spawn_blocking` so
//! CPU-bound inference never blocks the async runtime. Unlike the teacher's
//! process-wide `OnceLock`, the cache here lives on [`LocalNeuralBackend`]
//! itself: its lifetime is tied to the backend instance the provider
//! registry owns, not to the process (spec.md §9, "no hidden singletons").

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{ProviderError, TranscribeOptions, TranscriptionBackend, TranscriptionResult};

mod stderr_suppression {
    #[cfg(unix)]
    pub struct StderrGuard {
        saved_fd: i32,
        stderr_fd: i32,
    }

    #[cfg(unix)]
    impl Drop for StderrGuard {
        fn drop(&mut self) {
            unsafe {
                libc::dup2(self.saved_fd, self.stderr_fd);
                libc::close(self.saved_fd);
            }
        }
    }

    #[cfg(unix)]
    pub fn suppress() -> Option<StderrGuard> {
        use std::os::unix::io::AsRawFd;

        let stderr_fd = std::io::stderr().as_raw_fd();
        let saved_fd = unsafe { libc::dup(stderr_fd) };
        if saved_fd == -1 {
            return None;
        }

        let devnull = std::fs::File::open("/dev/null").ok()?;
        let result = unsafe { libc::dup2(devnull.as_raw_fd(), stderr_fd) };
        if result == -1 {
            unsafe { libc::close(saved_fd) };
            return None;
        }

        Some(StderrGuard { saved_fd, stderr_fd })
    }

    #[cfg(not(unix))]
    pub struct StderrGuard;

    #[cfg(not(unix))]
    pub fn suppress() -> Option<StderrGuard> {
        None
    }
}

struct CachedEngine {
    engine: transcribe_rs::engines::whisper::WhisperEngine,
    model_path: String,
}

/// Resolves the whisper.cpp model path for the local-neural backend. Not
/// named in spec.md's option table; this crate reads it from
/// `NEURAVOX_WHISPER_MODEL_PATH` since a working local backend needs a
/// concrete path from somewhere and the spec is silent on model management.
fn model_path() -> Result<String, ProviderError> {
    std::env::var("NEURAVOX_WHISPER_MODEL_PATH").map_err(|_| {
        ProviderError::RuntimeMissing(
            "NEURAVOX_WHISPER_MODEL_PATH is not set".to_string(),
        )
    })
}

fn get_or_load_engine(
    cache: &Mutex<Option<CachedEngine>>,
    model_path: &str,
) -> Result<(), ProviderError> {
    let mut guard = cache.lock().expect("engine cache mutex poisoned");

    if let Some(cached) = guard.as_ref()
        && cached.model_path == model_path
    {
        return Ok(());
    }

    if !Path::new(model_path).exists() {
        return Err(ProviderError::ModelLoadFailed(format!(
            "model not found at {model_path}"
        )));
    }

    tracing::info!(model_path, "loading local whisper model");

    use transcribe_rs::TranscriptionEngine;
    let mut engine = transcribe_rs::engines::whisper::WhisperEngine::new();

    let _stderr_guard = stderr_suppression::suppress();
    engine
        .load_model(Path::new(model_path))
        .map_err(|e| ProviderError::ModelLoadFailed(e.to_string()))?;
    drop(_stderr_guard);

    *guard = Some(CachedEngine {
        engine,
        model_path: model_path.to_string(),
    });
    Ok(())
}

fn transcribe_samples(
    cache: &Mutex<Option<CachedEngine>>,
    model_path: &str,
    samples: Vec<f32>,
    language: Option<&str>,
) -> Result<String, ProviderError> {
    use transcribe_rs::TranscriptionEngine;
    use transcribe_rs::engines::whisper::WhisperInferenceParams;

    get_or_load_engine(cache, model_path)?;

    let mut guard = cache.lock().expect("engine cache mutex poisoned");
    let cached = guard
        .as_mut()
        .expect("engine was just loaded or already cached");

    let params = WhisperInferenceParams {
        language: language.map(str::to_string),
        translate: false,
        print_special: false,
        print_progress: false,
        print_realtime: false,
        print_timestamps: false,
        suppress_blank: true,
        suppress_non_speech_tokens: true,
        no_speech_thold: 0.2,
        initial_prompt: None,
    };

    let _stderr_guard = stderr_suppression::suppress();
    let result = cached
        .engine
        .transcribe_samples(samples, Some(params))
        .map_err(|e| ProviderError::RuntimeMissing(e.to_string()))?;
    drop(_stderr_guard);

    Ok(result.text.trim().to_string())
}

/// One-shot model resource whose lifecycle is bound to this backend
/// instance rather than the process (spec.md §9, "no hidden singletons").
/// The registry constructs exactly one [`LocalNeuralBackend`] and shares it
/// via `Arc` across every scheduler worker that uses it, so the `Mutex`
/// still serializes access to the underlying (non-concurrent-safe)
/// inference engine.
#[derive(Default)]
pub struct LocalNeuralBackend {
    cache: Arc<Mutex<Option<CachedEngine>>>,
}

#[async_trait]
impl TranscriptionBackend for LocalNeuralBackend {
    fn id(&self) -> &'static str {
        "local-neural"
    }

    fn display_name(&self) -> &'static str {
        "Local Neural"
    }

    fn model_id(&self) -> String {
        model_path().unwrap_or_else(|_| "unknown".to_string())
    }

    fn requires_credential(&self) -> Option<&'static str> {
        None
    }

    fn supports_timestamps(&self) -> bool {
        false
    }

    async fn transcribe(
        &self,
        _client: &reqwest::Client,
        _credential: Option<&str>,
        audio_path: &Path,
        options: &TranscribeOptions,
    ) -> Result<TranscriptionResult, ProviderError> {
        let model_path = model_path()?;
        let audio_path = audio_path.to_path_buf();
        let language = options.language.clone();
        let cache = self.cache.clone();

        let text = tokio::task::spawn_blocking(move || -> Result<String, ProviderError> {
            // Inference always targets 16 kHz regardless of the configured
            // pipeline sample rate (whisper.cpp requires it); if
            // `processing.sample_rate` differs, this decode does resample.
            let decoded = crate::audio::decode::decode_to_mono_f32(
                &audio_path,
                crate::config::defaults::DEFAULT_SAMPLE_RATE,
                true,
            )
            .map_err(|e| ProviderError::RuntimeMissing(e.to_string()))?;

            transcribe_samples(&cache, &model_path, decoded.samples, language.as_deref())
        })
        .await
        .map_err(|e| ProviderError::RuntimeMissing(format!("worker task panicked: {e}")))??;

        Ok(TranscriptionResult {
            text,
            segments: None,
            words: None,
            tokens_used: None,
        })
    }
}
