//! Cloud-A transcription backend: raw-body upload, query-string options,
//! bearer-token-style credential.
//!
//! Grounded in the teacher's `provider/deepgram.rs`: POST the chunk body
//! directly (no multipart), pass the model and language as query
//! parameters, authenticate with a token header.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::{DEFAULT_TIMEOUT_SECS, ProviderError, TranscribeOptions, TranscriptionBackend, TranscriptionResult};

const API_URL: &str = "https://api.cloud-a.example.com/v1/listen";
const MODEL: &str = "nova-2";

/// Test hook: `wiremock` tests point this at a local mock server instead of
/// the real endpoint. Unset in production.
fn api_url() -> String {
    std::env::var("NEURAVOX_CLOUD_A_BASE_URL").unwrap_or_else(|_| API_URL.to_string())
}

#[derive(Deserialize)]
struct Response {
    results: Results,
}

#[derive(Deserialize)]
struct Results {
    channels: Vec<Channel>,
}

#[derive(Deserialize)]
struct Channel {
    alternatives: Vec<Alternative>,
}

#[derive(Deserialize)]
struct Alternative {
    transcript: String,
}

#[derive(Debug, Default, Clone)]
pub struct CloudABackend;

#[async_trait]
impl TranscriptionBackend for CloudABackend {
    fn id(&self) -> &'static str {
        "cloud-a"
    }

    fn display_name(&self) -> &'static str {
        "Cloud A"
    }

    fn model_id(&self) -> String {
        MODEL.to_string()
    }

    fn requires_credential(&self) -> Option<&'static str> {
        Some("GOOGLE_API_KEY")
    }

    fn supports_timestamps(&self) -> bool {
        false
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

        let body = tokio::fs::read(audio_path).await?;

        let mut url = reqwest::Url::parse(&api_url()).map_err(|e| ProviderError::BadRequest {
            backend: self.id().to_string(),
            message: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("model", MODEL)
            .append_pair("smart_format", "true");
        if let Some(lang) = &options.language {
            url.query_pairs_mut().append_pair("language", lang);
        }

        let response = client
            .post(url)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .header("Authorization", format!("Token {credential}"))
            .header("Content-Type", "audio/flac")
            .body(body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.id(), e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(self.id(), status, &text));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.id(), e))?;
        let parsed: Response = serde_json::from_str(&text).map_err(|e| ProviderError::InvalidResponse {
            backend: self.id().to_string(),
            message: e.to_string(),
        })?;

        let transcript = parsed
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.clone())
            .ok_or_else(|| ProviderError::InvalidResponse {
                backend: self.id().to_string(),
                message: "no transcript in response".to_string(),
            })?;

        Ok(TranscriptionResult {
            text: transcript,
            segments: None,
            words: None,
            tokens_used: None,
        })
    }
}
