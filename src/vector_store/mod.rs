//! Nearest-neighbour storage for post vectors
//!
//! [`VectorStore`] is the seam the retriever and the ingestion pipeline talk
//! to. [`QdrantStore`] speaks Qdrant gRPC via `qdrant-client`; [`MemoryVectorStore`]
//! is a brute-force in-process index for tests and offline runs.

pub mod memory;
pub mod qdrant;

use async_trait::async_trait;
pub use memory::MemoryVectorStore;
pub use qdrant::QdrantStore;

use crate::errors::Result;
use crate::models::IndexedPost;
use crate::models::PointId;
use crate::models::PostPayload;

/// Equality filter on a single payload field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    pub key: String,
    pub value: String,
}

/// Filtered similarity search
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub vector: Vec<f32>,
    pub limit: usize,
    pub filter: Option<FieldMatch>,
    pub with_vector: bool,
}

impl SearchRequest {
    pub fn new(vector: Vec<f32>, limit: usize) -> Self {
        Self {
            vector,
            limit,
            filter: None,
            with_vector: true,
        }
    }

    #[must_use]
    pub fn filter_eq(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter = Some(FieldMatch {
            key: key.into(),
            value: value.into(),
        });
        self
    }
}

/// One ranked result, best first
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: PointId,
    pub score: f32,
    pub payload: PostPayload,
    /// Present only when the store returned the stored vector
    pub vector: Option<Vec<f32>>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection with the given dimension if it does not exist
    async fn ensure_collection(&self, dimension: usize) -> Result<()>;

    /// Hits ordered by descending similarity
    async fn search(&self, request: SearchRequest) -> Result<Vec<SearchHit>>;

    /// Insert or replace points by id
    async fn upsert(&self, points: Vec<IndexedPost>) -> Result<()>;
}
