//! Shared `reqwest` plumbing for the provider clients

use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;
use reqwest::Response;

use crate::errors::PulseRagError;
use crate::errors::Result;

/// Longest upstream error body kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// Hosted or local model provider, shared by embeddings and generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Google Generative Language API
    Gemini,
    /// `OpenAI` (or any API-compatible endpoint)
    OpenAI,
    /// Ollama local models
    Ollama,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAI => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl FromStr for Provider {
    type Err = PulseRagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            other => Err(PulseRagError::Config(format!(
                "Unknown provider '{other}' (expected gemini, openai or ollama)"
            ))),
        }
    }
}

pub(crate) fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| PulseRagError::Http(e.to_string()))
}

/// Map a transport failure from `send()`
pub(crate) fn transport(service: &str, err: &reqwest::Error) -> PulseRagError {
    PulseRagError::Http(format!("{service}: {err}"))
}

/// Pass successful responses through; turn anything else into
/// [`PulseRagError::Api`] carrying the status and a trimmed body
pub(crate) async fn ensure_success(service: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message: String = body.chars().take(MAX_ERROR_BODY).collect();
    Err(PulseRagError::api(service, status.as_u16(), message))
}
