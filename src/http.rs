//! Global HTTP client singleton.
//!
//! Ported from the teacher's `http.rs`: a process-wide `reqwest::Client`
//! avoids repeating the TLS handshake and root-store population that comes
//! with building a fresh client per request. The teacher's mobile-tls branch
//! (bundled webpki-roots for Android's platform verifier) is dropped — this
//! crate has no mobile target.

use crate::error::{NeuravoxError, Result};
use std::sync::OnceLock;
use std::time::Duration;

static HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get the global HTTP client, creating it on first call.
pub fn client() -> &'static reqwest::Client {
    HTTP_CLIENT.get_or_init(|| {
        create_client().expect("default reqwest client configuration is always valid")
    })
}

/// Build the client eagerly and report any construction error, rather than
/// panicking on first use. Callers that want to surface a clean startup
/// error (as opposed to `client()`'s infallible lazy path) should call this
/// once during orchestrator setup.
pub fn warmup() -> Result<()> {
    if HTTP_CLIENT.get().is_some() {
        return Ok(());
    }
    let built = create_client()?;
    let _ = HTTP_CLIENT.get_or_init(|| built);
    Ok(())
}

fn create_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| NeuravoxError::Config(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_is_reused_across_calls() {
        let a = client() as *const reqwest::Client;
        let b = client() as *const reqwest::Client;
        assert_eq!(a, b);
    }
}
