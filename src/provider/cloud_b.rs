//! Cloud-B transcription backend: multipart upload, bearer-token credential.
//!
//! The teacher's `provider/openai.rs` is a thin wrapper around a shared
//! `openai_compatible_transcribe_*` helper that was not retrieved into this
//! pack (only its callers survived). This backend is reconstructed from the
//! general multipart-upload shape those callers imply (file part + model +
//! language + response_format) rather than copied from that missing file;
//! noted in DESIGN.md as an inference, not a direct port.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::{
    DEFAULT_TIMEOUT_SECS, ProviderError, TimedSpan, TranscribeOptions, TranscriptionBackend,
    TranscriptionResult,
};

const API_URL: &str = "https://api.cloud-b.example.com/v1/audio/transcriptions";
const MODEL: &str = "whisper-1";

/// Test hook: `wiremock` tests point this at a local mock server instead of
/// the real endpoint. Unset in production.
fn api_url() -> String {
    std::env::var("NEURAVOX_CLOUD_B_BASE_URL").unwrap_or_else(|_| API_URL.to_string())
}

#[derive(Deserialize)]
struct PlainResponse {
    text: String,
}

#[derive(Deserialize)]
struct VerboseResponse {
    text: String,
    segments: Option<Vec<VerboseSegment>>,
}

#[derive(Deserialize)]
struct VerboseSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Default, Clone)]
pub struct CloudBBackend;

#[async_trait]
impl TranscriptionBackend for CloudBBackend {
    fn id(&self) -> &'static str {
        "cloud-b"
    }

    fn display_name(&self) -> &'static str {
        "Cloud B"
    }

    fn model_id(&self) -> String {
        MODEL.to_string()
    }

    fn requires_credential(&self) -> Option<&'static str> {
        Some("OPENAI_API_KEY")
    }

    fn supports_timestamps(&self) -> bool {
        true
    }

    async fn transcribe(
        &self,
        client: &reqwest::Client,
        credential: Option<&str>,
        audio_path: &Path,
        options: &TranscribeOptions,
    ) -> Result<TranscriptionResult, ProviderError> {
        let credential = credential.ok_or_else(|| ProviderError::MissingCredential {
            backend: self.id().to_string(),
        })?;

        let bytes = tokio::fs::read(audio_path).await?;
        let filename = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("chunk.flac")
            .to_string();

        let response_format = if options.include_timestamps {
            "verbose_json"
        } else {
            "json"
        };

        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str("audio/flac")
            .map_err(|e| ProviderError::BadRequest {
                backend: self.id().to_string(),
                message: e.to_string(),
            })?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", MODEL)
            .text("response_format", response_format);

        if let Some(lang) = &options.language {
            form = form.text("language", lang.clone());
        }
        if let Some(temp) = options.temperature {
            form = form.text("temperature", temp.to_string());
        }

        let response = client
            .post(api_url())
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .bearer_auth(credential)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.id(), e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(self.id(), status, &text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.id(), e))?;

        if options.include_timestamps {
            let parsed: VerboseResponse =
                serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse {
                    backend: self.id().to_string(),
                    message: e.to_string(),
                })?;
            Ok(TranscriptionResult {
                text: parsed.text,
                segments: parsed.segments.map(|segs| {
                    segs.into_iter()
                        .map(|s| TimedSpan {
                            start_s: s.start,
                            end_s: s.end,
                            text: s.text,
                        })
                        .collect()
                }),
                words: None,
                tokens_used: None,
            })
        } else {
            let parsed: PlainResponse =
                serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse {
                    backend: self.id().to_string(),
                    message: e.to_string(),
                })?;
            Ok(TranscriptionResult {
                text: parsed.text,
                segments: None,
                words: None,
                tokens_used: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // NEURAVOX_CLOUD_B_BASE_URL is process-wide; serialize tests that set it.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    async fn with_mock_server(body: &str, status: u16) -> (MockServer, tempfile::NamedTempFile) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"fake flac bytes").unwrap();
        (server, file)
    }

    #[tokio::test]
    async fn plain_response_extracts_text() {
        let _guard = ENV_LOCK.lock().unwrap();
        let (server, file) = with_mock_server(r#"{"text":"hello world"}"#, 200).await;
        unsafe {
            std::env::set_var(
                "NEURAVOX_CLOUD_B_BASE_URL",
                format!("{}/v1/audio/transcriptions", server.uri()),
            );
        }

        let backend = CloudBBackend;
        let client = reqwest::Client::new();
        let result = backend
            .transcribe(&client, Some("token"), file.path(), &TranscribeOptions::default())
            .await;

        unsafe {
            std::env::remove_var("NEURAVOX_CLOUD_B_BASE_URL");
        }
        assert_eq!(result.unwrap().text, "hello world");
    }

    #[tokio::test]
    async fn verbose_response_extracts_segments_when_timestamps_requested() {
        let _guard = ENV_LOCK.lock().unwrap();
        let (server, file) = with_mock_server(
            r#"{"text":"hello world","segments":[{"start":0.0,"end":1.5,"text":"hello world"}]}"#,
            200,
        )
        .await;
        unsafe {
            std::env::set_var(
                "NEURAVOX_CLOUD_B_BASE_URL",
                format!("{}/v1/audio/transcriptions", server.uri()),
            );
        }

        let backend = CloudBBackend;
        let client = reqwest::Client::new();
        let options = TranscribeOptions {
            include_timestamps: true,
            ..Default::default()
        };
        let result = backend
            .transcribe(&client, Some("token"), file.path(), &options)
            .await;

        unsafe {
            std::env::remove_var("NEURAVOX_CLOUD_B_BASE_URL");
        }
        let result = result.unwrap();
        assert_eq!(result.segments.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_credential_short_circuits_without_a_request() {
        let backend = CloudBBackend;
        let client = reqwest::Client::new();
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = backend
            .transcribe(&client, None, file.path(), &TranscribeOptions::default())
            .await;
        assert!(matches!(result, Err(ProviderError::MissingCredential { .. })));
    }
}
