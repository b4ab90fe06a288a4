//! Embeddings generation module
//!
//! This module provides functionality for generating text embeddings using various providers:
//! - Google Gemini (`text-embedding-004`, the default)
//! - OpenAI (`text-embedding-3-small`, etc.)
//! - Ollama (local models)
//!
//! Provider calls sit behind [`EmbeddingBackend`]; [`EmbeddingService`] adds the
//! empty-input, truncation, retry and dimension rules every caller relies on.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pulserag::embeddings::EmbeddingService;
//! use pulserag::config::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = EmbeddingService::new(&config)?;
//!
//!     let embedding = service.generate("Battery life is great").await?;
//!     println!("Generated embedding with {} dimensions", embedding.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod generator;
pub mod retry;
pub mod text_preprocessing;

use async_trait::async_trait;
pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
pub use generator::EmbeddingService;
pub use retry::RetryPolicy;
pub use retry::RetryState;
pub use text_preprocessing::enhanced_preprocess;
pub use text_preprocessing::truncate_to_byte_boundary;

use crate::errors::Result;

/// A single raw embedding call against some provider
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed_raw(&self, text: &str) -> Result<Vec<f32>>;
}

/// Configuration for embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimension: usize,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_input_bytes: usize,
    pub retry: RetryPolicy,
}

impl EmbeddingConfig {
    pub fn from_app_config(config: &crate::config::AppConfig) -> Result<Self> {
        let embeddings = &config.embeddings;
        Ok(Self {
            provider: embeddings.provider.parse()?,
            model: embeddings.model.clone(),
            dimension: embeddings.dimension,
            endpoint: embeddings.endpoint.trim_end_matches('/').to_string(),
            api_key: embeddings.api_key.clone(),
            max_input_bytes: embeddings.max_input_bytes,
            retry: RetryPolicy::from_config(&config.retry),
        })
    }
}
