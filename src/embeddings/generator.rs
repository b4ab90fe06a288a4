//! Embedding generation service: zero-vector fallback, truncation, retry and
//! dimension checks on top of a raw backend

use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::client::EmbeddingClient;
use super::text_preprocessing::truncate_to_byte_boundary;
use super::EmbeddingBackend;
use super::EmbeddingConfig;
use super::RetryPolicy;
use crate::errors::PulseRagError;
use crate::errors::Result;

/// Service for generating embeddings of a fixed dimension
#[derive(Clone)]
pub struct EmbeddingService {
    backend: Arc<dyn EmbeddingBackend>,
    dimension: usize,
    max_input_bytes: usize,
    retry: RetryPolicy,
}

impl EmbeddingService {
    /// Create a new embedding service talking to the configured provider
    pub fn new(config: &crate::config::AppConfig) -> Result<Self> {
        Self::from_config(EmbeddingConfig::from_app_config(config)?)
    }

    /// Create from custom config
    pub fn from_config(config: EmbeddingConfig) -> Result<Self> {
        let client = EmbeddingClient::new(
            config.provider,
            config.model.clone(),
            config.endpoint.clone(),
            config.api_key.clone(),
        )?;

        Ok(Self::with_backend(
            Arc::new(client),
            config.dimension,
            config.max_input_bytes,
            config.retry,
        ))
    }

    /// Wrap an arbitrary backend (tests, alternative providers)
    pub fn with_backend(
        backend: Arc<dyn EmbeddingBackend>,
        dimension: usize,
        max_input_bytes: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            dimension,
            max_input_bytes,
            retry,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed one text.
    ///
    /// Blank input yields a zero vector without calling the backend. Longer
    /// inputs are cut to the byte limit. Transient failures are retried; a
    /// vector of the wrong length is a [`PulseRagError::DimensionMismatch`].
    pub async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            warn!("Empty text provided for embedding, returning zero vector");
            return Ok(vec![0.0; self.dimension]);
        }

        let input = truncate_to_byte_boundary(text, self.max_input_bytes);
        if input.len() < text.len() {
            debug!("Text truncated from {} to {} bytes", text.len(), input.len());
        }

        let backend = self.backend.clone();
        let vector = self
            .retry
            .run("embedding", || {
                let backend = backend.clone();
                async move { backend.embed_raw(input).await }
            })
            .await?;

        if vector.len() != self.dimension {
            return Err(PulseRagError::DimensionMismatch {
                left: vector.len(),
                right: self.dimension,
            });
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Backend that fails `failures` times with `error_status`, then returns
    /// a vector of `dimension` ones
    struct FlakyBackend {
        failures: u32,
        error_status: u16,
        dimension: usize,
        calls: AtomicU32,
        seen: Mutex<Vec<String>>,
    }

    impl FlakyBackend {
        fn new(failures: u32, error_status: u16, dimension: usize) -> Arc<Self> {
            Arc::new(Self {
                failures,
                error_status,
                dimension,
                calls: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl EmbeddingBackend for FlakyBackend {
        async fn embed_raw(&self, text: &str) -> Result<Vec<f32>> {
            self.seen.lock().unwrap().push(text.to_string());
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(PulseRagError::api("fake", self.error_status, "nope"));
            }
            Ok(vec![1.0; self.dimension])
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    #[tokio::test]
    async fn test_empty_text_returns_zero_vector_without_call() {
        let backend = FlakyBackend::new(0, 500, 4);
        let service = EmbeddingService::with_backend(backend.clone(), 4, 100, fast_retry());

        assert_eq!(service.generate("").await.unwrap(), vec![0.0; 4]);
        assert_eq!(service.generate("  \n\t").await.unwrap(), vec![0.0; 4]);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_long_text_is_truncated() {
        let backend = FlakyBackend::new(0, 500, 4);
        let service = EmbeddingService::with_backend(backend.clone(), 4, 10, fast_retry());

        service.generate(&"x".repeat(50)).await.unwrap();
        assert_eq!(backend.seen.lock().unwrap()[0].len(), 10);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let backend = FlakyBackend::new(2, 503, 4);
        let service = EmbeddingService::with_backend(backend.clone(), 4, 100, fast_retry());

        assert_eq!(service.generate("battery").await.unwrap().len(), 4);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_errors_fail_fast() {
        let backend = FlakyBackend::new(5, 400, 4);
        let service = EmbeddingService::with_backend(backend.clone(), 4, 100, fast_retry());

        let err = service.generate("battery").await.unwrap_err();
        assert!(matches!(err, PulseRagError::Api { status: 400, .. }));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries() {
        let backend = FlakyBackend::new(5, 500, 4);
        let service = EmbeddingService::with_backend(backend.clone(), 4, 100, fast_retry());

        let err = service.generate("battery").await.unwrap_err();
        assert!(matches!(err, PulseRagError::RetriesExhausted { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_rejected() {
        let backend = FlakyBackend::new(0, 500, 3);
        let service = EmbeddingService::with_backend(backend, 4, 100, fast_retry());

        let err = service.generate("battery").await.unwrap_err();
        assert!(matches!(
            err,
            PulseRagError::DimensionMismatch { left: 3, right: 4 }
        ));
    }
}
