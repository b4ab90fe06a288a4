//! Brute-force in-memory vector store

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::SearchHit;
use super::SearchRequest;
use super::VectorStore;
use crate::errors::Result;
use crate::models::IndexedPost;
use crate::models::PostPayload;
use crate::rag::similarity::cosine_similarity;

/// Exact cosine search over every stored point. Points whose vector length
/// differs from the query are skipped.
#[derive(Default)]
pub struct MemoryVectorStore {
    points: RwLock<Vec<IndexedPost>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }

    /// Snapshot of every stored point in insertion order
    pub async fn points(&self) -> Vec<IndexedPost> {
        self.points.read().await.clone()
    }
}

fn payload_field<'a>(payload: &'a PostPayload, key: &str) -> Option<&'a str> {
    match key {
        "name" => Some(payload.name.as_str()),
        "title" => Some(payload.title.as_str()),
        "url" => Some(payload.url.as_str()),
        "author" => Some(payload.author.as_str()),
        "subreddit" => Some(payload.subreddit.as_str()),
        other => payload.extra.get(other).and_then(|v| v.as_str()),
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn ensure_collection(&self, _dimension: usize) -> Result<()> {
        Ok(())
    }

    async fn search(&self, request: SearchRequest) -> Result<Vec<SearchHit>> {
        let points = self.points.read().await;

        let mut hits = Vec::new();
        for point in points.iter() {
            if let Some(filter) = &request.filter {
                if payload_field(&point.payload, &filter.key) != Some(filter.value.as_str()) {
                    continue;
                }
            }
            if point.vector.len() != request.vector.len() {
                continue;
            }
            let score = cosine_similarity(&request.vector, &point.vector)?;
            hits.push(SearchHit {
                id: point.id.clone(),
                score,
                payload: point.payload.clone(),
                vector: request.with_vector.then(|| point.vector.clone()),
            });
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(request.limit);
        Ok(hits)
    }

    async fn upsert(&self, new_points: Vec<IndexedPost>) -> Result<()> {
        let mut points = self.points.write().await;
        for point in new_points {
            match points.iter_mut().find(|p| p.id == point.id) {
                Some(existing) => *existing = point,
                None => points.push(point),
            }
        }
        Ok(())
    }
}
