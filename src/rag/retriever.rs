//! Filtered vector search with on-demand embedding backfill

use std::sync::Arc;

use futures::stream;
use futures::StreamExt;
use tracing::debug;
use tracing::warn;

use crate::config::AppConfig;
use crate::embeddings::EmbeddingService;
use crate::errors::ErrorClass;
use crate::errors::Result;
use crate::models::Candidate;
use crate::models::PointId;
use crate::vector_store::SearchHit;
use crate::vector_store::SearchRequest;
use crate::vector_store::VectorStore;

/// Leading comments folded into backfilled embedding text
const BACKFILL_COMMENTS: usize = 5;

/// Turns store hits into [`Candidate`]s that all carry an embedding of the
/// query's dimension
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embeddings: EmbeddingService,
    filter_field: String,
    embed_concurrency: usize,
}

impl Retriever {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embeddings: EmbeddingService,
        filter_field: impl Into<String>,
        embed_concurrency: usize,
    ) -> Self {
        Self {
            store,
            embeddings,
            filter_field: filter_field.into(),
            embed_concurrency: embed_concurrency.max(1),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn VectorStore>,
        embeddings: EmbeddingService,
    ) -> Self {
        Self::new(
            store,
            embeddings,
            config.vector_store.filter_field.clone(),
            config.retrieval.embed_concurrency,
        )
    }

    pub fn embeddings(&self) -> &EmbeddingService {
        &self.embeddings
    }

    /// Up to `limit` candidates for `product_name`, in the store's relevance
    /// order.
    ///
    /// A store failure yields an empty list. Hits whose embedding cannot be
    /// backfilled after retries are dropped; a client-class embedding
    /// failure is returned as an error.
    pub async fn retrieve(
        &self,
        embedding: &[f32],
        product_name: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        let request = SearchRequest::new(embedding.to_vec(), limit)
            .filter_eq(self.filter_field.as_str(), product_name);

        let hits = match self.store.search(request).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Vector search failed for {}: {}", product_name, e);
                return Ok(Vec::new());
            }
        };
        let total = hits.len();

        let dimension = embedding.len();
        let converted: Vec<Result<Option<Candidate>>> = stream::iter(hits)
            .map(|hit| self.build_candidate(hit, dimension))
            .buffered(self.embed_concurrency)
            .collect()
            .await;

        let mut candidates = Vec::with_capacity(total);
        for outcome in converted {
            if let Some(candidate) = outcome? {
                candidates.push(candidate);
            }
        }

        debug!(
            "Retrieved {} candidates ({} hits) for {}",
            candidates.len(),
            total,
            product_name
        );
        Ok(candidates)
    }

    async fn build_candidate(&self, hit: SearchHit, dimension: usize) -> Result<Option<Candidate>> {
        let SearchHit {
            id,
            score,
            payload,
            vector,
        } = hit;

        let embedding = match vector.filter(|v| v.len() == dimension) {
            Some(stored) => stored,
            None => {
                let text = payload.embedding_text(BACKFILL_COMMENTS);
                if text.trim().is_empty() {
                    debug!("Dropping hit {} with no text to embed", id);
                    return Ok(None);
                }
                match self.embeddings.generate(&text).await {
                    Ok(vector) => vector,
                    Err(e) if e.class() == ErrorClass::Client => return Err(e),
                    Err(e) => {
                        warn!("Dropping hit {}: backfill embedding failed: {}", id, e);
                        return Ok(None);
                    }
                }
            }
        };

        Ok(Some(Candidate {
            id: Some(id).filter(|id: &PointId| !id.is_empty()),
            text: payload.summary_text(),
            payload,
            score: Some(score),
            embedding,
        }))
    }
}
