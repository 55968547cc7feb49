//! Chunk scheduler (C6): drive transcription of every chunk in a
//! ProcessingMetadata with at most `max_concurrent` workers in flight,
//! reordering results back into `chunk_index` order (spec.md §4.6).
//!
//! The spawn-all-tasks-immediately-and-let-them-wait-on-a-semaphore pattern
//! is ported from the teacher's `transcribe.rs::parallel_transcribe`: every
//! chunk gets a task up front, and each task acquires its own semaphore
//! permit before doing any work, rather than a fixed pool of worker loops
//! pulling off a shared queue. Retry/backoff (absent from the teacher's
//! scheduler, which never wires its own `RetryConfig` in) is added here per
//! spec.md §4.5, using `provider::retry::RetryConfig`'s full-jitter policy.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::provider::retry::RetryConfig;
use crate::provider::{ProviderError, TranscribeOptions, TranscriptionBackend, TranscriptionResult};

/// One chunk's work item: where to read it from and its timing, carried
/// through so the combiner never needs backend-reported timestamps.
#[derive(Debug, Clone)]
pub struct ChunkJob {
    pub chunk_index: usize,
    pub audio_path: PathBuf,
    pub start_s: f64,
    pub end_s: f64,
}

/// A chunk that transcribed successfully.
#[derive(Debug, Clone)]
pub struct ChunkTranscription {
    pub chunk_index: usize,
    pub start_s: f64,
    pub end_s: f64,
    pub result: TranscriptionResult,
    pub elapsed_s: f64,
}

/// A chunk whose backend call exhausted its retries or failed fatally.
#[derive(Debug, Clone)]
pub struct ChunkFailure {
    pub chunk_index: usize,
    pub start_s: f64,
    pub end_s: f64,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub enum ChunkOutcome {
    Success(ChunkTranscription),
    Failure(ChunkFailure),
}

impl ChunkOutcome {
    pub fn chunk_index(&self) -> usize {
        match self {
            Self::Success(c) => c.chunk_index,
            Self::Failure(c) => c.chunk_index,
        }
    }
}

/// Run `jobs` through `backend` with at most `max_concurrent` in flight.
/// Cancellable: cancelling `cancel` stops pending jobs from starting and
/// asks in-flight jobs to stop; the subset that completed beforehand is
/// returned for state persistence (spec.md §4.6/§5).
pub async fn run(
    backend: Arc<dyn TranscriptionBackend>,
    credential: Option<String>,
    jobs: Vec<ChunkJob>,
    max_concurrent: usize,
    options: TranscribeOptions,
    cancel: CancellationToken,
) -> Vec<ChunkOutcome> {
    let client = crate::http::client();
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let retry_config = Arc::new(RetryConfig::default());

    let mut handles = Vec::with_capacity(jobs.len());
    for job in jobs {
        let backend = backend.clone();
        let credential = credential.clone();
        let options = options.clone();
        let semaphore = semaphore.clone();
        let retry_config = retry_config.clone();
        let cancel = cancel.clone();
        let client = client.clone();

        let handle = tokio::spawn(async move {
            let _permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                permit = semaphore.acquire_owned() => permit.ok()?,
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                outcome = transcribe_with_retry(&*backend, client, credential.as_deref(), &job, &options, &retry_config) => Some(outcome),
            }
        });
        handles.push(handle);
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        if let Ok(Some(outcome)) = handle.await {
            outcomes.push(outcome);
        }
        // A task that panicked, was cancelled, or never acquired a permit
        // before cancellation contributes no outcome: its chunk is simply
        // not yet transcribed, and a subsequent resume() will retry it.
    }

    outcomes.sort_by_key(ChunkOutcome::chunk_index);
    outcomes
}

async fn transcribe_with_retry(
    backend: &dyn TranscriptionBackend,
    client: &reqwest::Client,
    credential: Option<&str>,
    job: &ChunkJob,
    options: &TranscribeOptions,
    retry_config: &RetryConfig,
) -> ChunkOutcome {
    let started = tokio::time::Instant::now();
    let timeout = Duration::from_secs(crate::provider::DEFAULT_TIMEOUT_SECS);

    let mut last_error: Option<ProviderError> = None;

    for attempt in 0..=retry_config.max_retries {
        let attempt_result = tokio::time::timeout(
            timeout,
            backend.transcribe(client, credential, &job.audio_path, options),
        )
        .await;

        let error = match attempt_result {
            Ok(Ok(result)) => {
                return ChunkOutcome::Success(ChunkTranscription {
                    chunk_index: job.chunk_index,
                    start_s: job.start_s,
                    end_s: job.end_s,
                    result,
                    elapsed_s: started.elapsed().as_secs_f64(),
                });
            }
            Ok(Err(e)) => e,
            Err(_elapsed) => ProviderError::Timeout {
                backend: backend.id().to_string(),
            },
        };

        let retryable = error.is_retryable();
        tracing::warn!(
            chunk_index = job.chunk_index,
            backend = backend.id(),
            attempt,
            retryable,
            error = %error,
            "chunk transcription attempt failed"
        );

        last_error = Some(error);
        if !retryable || attempt == retry_config.max_retries {
            break;
        }
        tokio::time::sleep(retry_config.delay_for_attempt(attempt)).await;
    }

    ChunkOutcome::Failure(ChunkFailure {
        chunk_index: job.chunk_index,
        start_s: job.start_s,
        end_s: job.end_s,
        reason: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TranscriptionResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::path::Path;

    struct FlakyBackend {
        fail_first_n: AtomicUsize,
    }

    #[async_trait]
    impl TranscriptionBackend for FlakyBackend {
        fn id(&self) -> &'static str {
            "test-backend"
        }
        fn display_name(&self) -> &'static str {
            "Test Backend"
        }
        fn model_id(&self) -> String {
            "test-model".to_string()
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
            _options: &TranscribeOptions,
        ) -> Result<TranscriptionResult, ProviderError> {
            if self.fail_first_n.fetch_sub(1, Ordering::SeqCst) > 0 {
                return Err(ProviderError::ServiceUnavailable {
                    backend: "test-backend".to_string(),
                    message: "retry me".to_string(),
                });
            }
            Ok(TranscriptionResult {
                text: format!("text for {}", audio_path.display()),
                segments: None,
                words: None,
                tokens_used: None,
            })
        }
    }

    struct AlwaysFailsBackend;

    #[async_trait]
    impl TranscriptionBackend for AlwaysFailsBackend {
        fn id(&self) -> &'static str {
            "always-fails"
        }
        fn display_name(&self) -> &'static str {
            "Always Fails"
        }
        fn model_id(&self) -> String {
            "test-model".to_string()
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
            _audio_path: &Path,
            _options: &TranscribeOptions,
        ) -> Result<TranscriptionResult, ProviderError> {
            Err(ProviderError::BadRequest {
                backend: "always-fails".to_string(),
                message: "nope".to_string(),
            })
        }
    }

    fn jobs(n: usize) -> Vec<ChunkJob> {
        (0..n)
            .map(|i| ChunkJob {
                chunk_index: i,
                audio_path: PathBuf::from(format!("chunk_{i:03}.flac")),
                start_s: i as f64 * 10.0,
                end_s: (i + 1) as f64 * 10.0,
            })
            .collect()
    }

    #[tokio::test]
    async fn results_are_reordered_by_chunk_index() {
        let backend: Arc<dyn TranscriptionBackend> = Arc::new(FlakyBackend {
            fail_first_n: AtomicUsize::new(0),
        });
        let outcomes = run(
            backend,
            None,
            jobs(5),
            3,
            TranscribeOptions::default(),
            CancellationToken::new(),
        )
        .await;

        let indices: Vec<usize> = outcomes.iter().map(ChunkOutcome::chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_until_success() {
        let backend: Arc<dyn TranscriptionBackend> = Arc::new(FlakyBackend {
            fail_first_n: AtomicUsize::new(2),
        });
        let outcomes = run(
            backend,
            None,
            jobs(1),
            1,
            TranscribeOptions::default(),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], ChunkOutcome::Success(_)));
    }

    #[tokio::test]
    async fn fatal_failure_is_not_retried_and_marks_chunk_failed() {
        let backend: Arc<dyn TranscriptionBackend> = Arc::new(AlwaysFailsBackend);
        let outcomes = run(
            backend,
            None,
            jobs(3),
            2,
            TranscribeOptions::default(),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| matches!(o, ChunkOutcome::Failure(_))));
    }

    #[tokio::test]
    async fn partial_failure_preserves_successes_and_failure_in_order() {
        struct SelectiveBackend;
        #[async_trait]
        impl TranscriptionBackend for SelectiveBackend {
            fn id(&self) -> &'static str {
                "selective"
            }
            fn display_name(&self) -> &'static str {
                "Selective"
            }
        fn model_id(&self) -> String {
            "test-model".to_string()
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
                _options: &TranscribeOptions,
            ) -> Result<TranscriptionResult, ProviderError> {
                if audio_path.to_string_lossy().contains("002") {
                    return Err(ProviderError::BadRequest {
                        backend: "selective".to_string(),
                        message: "bad chunk".to_string(),
                    });
                }
                Ok(TranscriptionResult {
                    text: "ok".to_string(),
                    segments: None,
                    words: None,
                    tokens_used: None,
                })
            }
        }

        let backend: Arc<dyn TranscriptionBackend> = Arc::new(SelectiveBackend);
        let outcomes = run(
            backend,
            None,
            jobs(5),
            3,
            TranscribeOptions::default(),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcomes.len(), 5);
        for (i, outcome) in outcomes.iter().enumerate() {
            match (i, outcome) {
                (2, ChunkOutcome::Failure(f)) => assert_eq!(f.chunk_index, 2),
                (_, ChunkOutcome::Success(c)) => assert_eq!(c.chunk_index, i),
                _ => panic!("unexpected outcome at index {i}: {outcome:?}"),
            }
        }
    }
}
