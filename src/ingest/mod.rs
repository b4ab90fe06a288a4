//! Ingestion: fetch discussion about a product, filter, embed and upsert
//! into the vector store

pub mod reddit;

use std::collections::BTreeSet;
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future;
use futures::stream;
use futures::StreamExt;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use tracing::debug;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

pub use reddit::RedditSource;

use crate::config::AppConfig;
use crate::embeddings::enhanced_preprocess;
use crate::embeddings::EmbeddingService;
use crate::errors::Result;
use crate::llm::TextGenerator;
use crate::models::Comment;
use crate::models::IndexedPost;
use crate::models::PointId;
use crate::models::PostPayload;
use crate::models::Product;
use crate::rag::expand_keywords;
use crate::vector_store::VectorStore;

/// A post as returned by a social content source, before embedding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPost {
    pub title: String,
    pub selftext: String,
    /// Site-relative path, e.g. `/r/headphones/comments/...`
    pub permalink: String,
    /// Absolute post URL; the dedup key
    pub url: String,
    pub author: String,
    pub subreddit: String,
    pub upvotes: i64,
}

/// Social content fetcher
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn search_posts(&self, query: &str, limit: usize) -> Result<Vec<RawPost>>;

    /// Up to `limit` top-level comments for `post`
    async fn top_comments(&self, post: &RawPost, limit: usize) -> Result<Vec<Comment>>;
}

/// Counts from one ingestion pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Posts returned across all variant queries, duplicates included
    pub fetched: usize,
    pub duplicates: usize,
    /// Posts whose title matched no keyword
    pub filtered_out: usize,
    pub embed_failures: usize,
    pub upserted: usize,
}

/// Search queries issued per product
pub fn variant_queries(product_name: &str) -> Vec<String> {
    vec![
        product_name.to_string(),
        format!("{product_name} review"),
        format!("{product_name} issues"),
        format!("{product_name} features"),
    ]
}

/// Stable point id: UUID built from the first 16 bytes of SHA-256(url)
pub fn point_id_for_url(url: &str) -> PointId {
    let digest = Sha256::digest(url.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    PointId::from(Uuid::from_bytes(bytes))
}

/// True when the lowercased title contains any keyword
pub fn title_matches(title: &str, keywords: &BTreeSet<String>) -> bool {
    let title = title.to_lowercase();
    keywords.iter().any(|k| title.contains(k.as_str()))
}

/// Text embedded for a post: title, body and comments
pub fn raw_post_text(post: &RawPost, comments: &[Comment]) -> String {
    let comment_text: Vec<&str> = comments.iter().map(|c| c.text.as_str()).collect();
    format!(
        "{} {} \n The top comments to this post are: \n{}",
        post.title,
        post.selftext,
        comment_text.join("\n")
    )
}

pub struct IngestService {
    source: Arc<dyn PostSource>,
    llm: Arc<dyn TextGenerator>,
    embeddings: EmbeddingService,
    store: Arc<dyn VectorStore>,
    search_limit: usize,
    comments_per_post: usize,
    preprocess_max_bytes: usize,
    concurrency: usize,
}

impl IngestService {
    pub fn new(
        config: &AppConfig,
        source: Arc<dyn PostSource>,
        llm: Arc<dyn TextGenerator>,
        embeddings: EmbeddingService,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            source,
            llm,
            embeddings,
            store,
            search_limit: config.reddit.search_limit,
            comments_per_post: config.reddit.comments_per_post,
            preprocess_max_bytes: config.reddit.preprocess_max_bytes,
            concurrency: config.retrieval.embed_concurrency.max(1),
        }
    }

    /// Fetch, filter, embed and upsert posts about `product`.
    ///
    /// Posts are tagged with the exact product name so query-time search can
    /// filter on it. A failed search aborts the pass; posts that fail to
    /// embed are skipped and counted.
    pub async fn ingest_product(&self, product: &Product) -> Result<IngestReport> {
        info!("Ingesting discussion for {}", product.name);
        let mut report = IngestReport::default();

        let keywords = expand_keywords(
            self.llm.as_ref(),
            &product.name,
            &product.category,
            &product.description,
        )
        .await;
        debug!("Keywords for {}: {:?}", product.name, keywords);

        let mut seen_urls = HashSet::new();
        let mut kept = Vec::new();
        for query in variant_queries(&product.name) {
            let posts = self.source.search_posts(&query, self.search_limit).await?;
            debug!("Query {:?} returned {} posts", query, posts.len());
            report.fetched += posts.len();

            for post in posts {
                if !seen_urls.insert(post.url.clone()) {
                    report.duplicates += 1;
                    continue;
                }
                if !title_matches(&post.title, &keywords) {
                    report.filtered_out += 1;
                    continue;
                }
                kept.push(post);
            }
        }

        let embedded: Vec<Option<IndexedPost>> = stream::iter(kept)
            .map(|post| self.index_post(post, &product.name))
            .buffered(self.concurrency)
            .collect()
            .await;

        let total = embedded.len();
        let points: Vec<IndexedPost> = embedded.into_iter().flatten().collect();
        report.embed_failures = total - points.len();

        self.store
            .ensure_collection(self.embeddings.dimension())
            .await?;
        report.upserted = points.len();
        self.store.upsert(points).await?;

        info!(
            "Ingestion for {} done: {} fetched, {} duplicates, {} filtered, {} failed, {} upserted",
            product.name,
            report.fetched,
            report.duplicates,
            report.filtered_out,
            report.embed_failures,
            report.upserted
        );
        Ok(report)
    }

    /// Search a single query and embed every distinct result. No keyword
    /// filter and nothing is written to the store.
    pub async fn collect_posts(&self, query: &str, limit: usize, tag: &str) -> Result<Vec<IndexedPost>> {
        let mut seen_urls = HashSet::new();
        let posts: Vec<RawPost> = self
            .source
            .search_posts(query, limit)
            .await?
            .into_iter()
            .filter(|post| seen_urls.insert(post.url.clone()))
            .collect();

        let indexed: Vec<IndexedPost> = stream::iter(posts)
            .map(|post| self.index_post(post, tag))
            .buffered(self.concurrency)
            .filter_map(future::ready)
            .collect()
            .await;
        Ok(indexed)
    }

    async fn index_post(&self, post: RawPost, product_name: &str) -> Option<IndexedPost> {
        let comments = match self.source.top_comments(&post, self.comments_per_post).await {
            Ok(comments) => comments,
            Err(e) => {
                warn!("No comments for {}: {}", post.url, e);
                Vec::new()
            }
        };

        let cleaned = enhanced_preprocess(&raw_post_text(&post, &comments), self.preprocess_max_bytes);
        let vector = match self.embeddings.generate(&cleaned).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("Failed to embed post {:?}: {}", post.title, e);
                return None;
            }
        };

        Some(IndexedPost {
            id: point_id_for_url(&post.url),
            vector,
            payload: PostPayload {
                name: product_name.to_string(),
                title: post.title,
                url: post.url,
                permalink: Some(post.permalink),
                selftext: post.selftext,
                author: post.author,
                subreddit: post.subreddit,
                upvotes: post.upvotes,
                comments,
                ..Default::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_queries() {
        assert_eq!(
            variant_queries("Acme Buds"),
            vec!["Acme Buds", "Acme Buds review", "Acme Buds issues", "Acme Buds features"]
        );
    }

    #[test]
    fn test_point_id_is_stable_uuid() {
        let a = point_id_for_url("https://www.reddit.com/r/x/1");
        let b = point_id_for_url("https://www.reddit.com/r/x/1");
        let c = point_id_for_url("https://www.reddit.com/r/x/2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        let PointId::Str(text) = a else {
            panic!("expected a string id");
        };
        assert!(Uuid::parse_str(&text).is_ok());
    }

    #[test]
    fn test_title_matches() {
        let keywords: BTreeSet<String> = ["acme", "earbuds"].iter().map(|s| (*s).to_string()).collect();
        assert!(title_matches("ACME battery test", &keywords));
        assert!(title_matches("Best earbuds 2024", &keywords));
        assert!(!title_matches("Toaster review", &keywords));
    }

    #[test]
    fn test_raw_post_text() {
        let post = RawPost {
            title: "Title".to_string(),
            selftext: "Body".to_string(),
            ..Default::default()
        };
        let comments = vec![
            Comment { text: "one".to_string(), upvotes: 1 },
            Comment { text: "two".to_string(), upvotes: 2 },
        ];
        assert_eq!(
            raw_post_text(&post, &comments),
            "Title Body \n The top comments to this post are: \none\ntwo"
        );
    }
}
