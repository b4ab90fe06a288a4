//! Embedding API clients for various providers

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::EmbeddingBackend;
use crate::errors::PulseRagError;
use crate::errors::Result;
use crate::http;
use crate::http::Provider;

/// Supported embedding providers
pub type EmbeddingProvider = Provider;

/// Client for generating embeddings from various providers
pub struct EmbeddingClient {
    provider: EmbeddingProvider,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl EmbeddingClient {
    /// Create a new embedding client
    pub fn new(
        provider: EmbeddingProvider,
        model: String,
        endpoint: String,
        api_key: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            provider,
            model,
            endpoint,
            api_key,
            client: http::build_client(120)?,
        })
    }

    pub fn provider(&self) -> EmbeddingProvider {
        self.provider
    }

    fn require_key(&self) -> Result<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| {
            PulseRagError::Config(format!("{} embeddings require an API key", self.provider.name()))
        })
    }

    /// Generate embedding using the Gemini `embedContent` endpoint
    async fn generate_gemini(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = self.require_key()?;

        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }

        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }

        #[derive(Serialize)]
        struct GeminiRequest<'a> {
            model: String,
            content: Content<'a>,
        }

        #[derive(Deserialize)]
        struct GeminiResponse {
            embedding: Values,
        }

        #[derive(Deserialize)]
        struct Values {
            values: Vec<f32>,
        }

        let url = format!(
            "{}/v1beta/models/{}:embedContent",
            self.endpoint, self.model
        );
        debug!("Calling Gemini embeddings API: {}", url);

        let request = GeminiRequest {
            model: format!("models/{}", self.model),
            content: Content {
                parts: vec![Part { text }],
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| http::transport("gemini", &e))?;
        let response = http::ensure_success("gemini", response).await?;

        let result: GeminiResponse = response
            .json()
            .await
            .map_err(|e| PulseRagError::Parse(format!("Failed to parse Gemini embedding: {e}")))?;

        Ok(result.embedding.values)
    }

    /// Generate embedding using `OpenAI` API
    async fn generate_openai(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = self.require_key()?;

        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            input: &'a str,
            model: &'a str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
        }

        let url = format!("{}/embeddings", self.endpoint);
        debug!("Calling OpenAI embeddings API: {}", url);

        let request = OpenAIRequest {
            input: text,
            model: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&request)
            .send()
            .await
            .map_err(|e| http::transport("openai", &e))?;
        let response = http::ensure_success("openai", response).await?;

        let result: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| PulseRagError::Parse(format!("Failed to parse OpenAI embedding: {e}")))?;

        result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| PulseRagError::Parse("No embedding in OpenAI response".to_string()))
    }

    /// Generate embedding using Ollama API
    async fn generate_ollama(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.endpoint);
        debug!("Calling Ollama embeddings API: {}", url);

        let request = OllamaRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| http::transport("ollama", &e))?;
        let response = http::ensure_success("ollama", response).await?;

        let result: OllamaResponse = response
            .json()
            .await
            .map_err(|e| PulseRagError::Parse(format!("Failed to parse Ollama embedding: {e}")))?;

        Ok(result.embedding)
    }
}

#[async_trait]
impl EmbeddingBackend for EmbeddingClient {
    async fn embed_raw(&self, text: &str) -> Result<Vec<f32>> {
        match self.provider {
            EmbeddingProvider::Gemini => self.generate_gemini(text).await,
            EmbeddingProvider::OpenAI => self.generate_openai(text).await,
            EmbeddingProvider::Ollama => self.generate_ollama(text).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_client_error() {
        let client = EmbeddingClient::new(
            EmbeddingProvider::Gemini,
            "text-embedding-004".to_string(),
            "http://127.0.0.1:9".to_string(),
            None,
        )
        .unwrap();

        let err = client.embed_raw("hello").await.unwrap_err();
        assert!(matches!(err, PulseRagError::Config(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    #[ignore = "Requires API key"]
    async fn test_gemini_embedding() {
        let client = EmbeddingClient::new(
            EmbeddingProvider::Gemini,
            "text-embedding-004".to_string(),
            "https://generativelanguage.googleapis.com".to_string(),
            std::env::var("GEMINI_API_KEY").ok(),
        )
        .unwrap();

        let embedding = client.embed_raw("Hello, world!").await.unwrap();
        assert_eq!(embedding.len(), 768);
    }
}
