use std::collections::HashMap;
use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Lifecycle of a tracked product. Questions are only answered once the
/// ingestion pass has populated the vector store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Pending,
    Ready,
}

/// Product record as read from the document store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category: category.into(),
            description: description.into(),
            status: ProductStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn mark_ready(mut self) -> Self {
        self.status = ProductStatus::Ready;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.status == ProductStatus::Ready
    }
}

/// Vector store point identifier: an unsigned integer or a UUID string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Str(String),
}

impl PointId {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Num(_) => false,
            Self::Str(s) => s.is_empty(),
        }
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<Uuid> for PointId {
    fn from(id: Uuid) -> Self {
        Self::Str(id.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub upvotes: i64,
}

/// Payload stored alongside each post vector.
///
/// Every field is optional on the wire; unknown fields are kept in `extra`
/// so a round trip through the store does not lose them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PointId>,
    /// Exact product name, used as the search filter
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl PostPayload {
    /// Title, body and up to `max_comments` leading comments, one per line.
    /// Empty parts are skipped.
    pub fn embedding_text(&self, max_comments: usize) -> String {
        std::iter::once(self.title.as_str())
            .chain(std::iter::once(self.selftext.as_str()))
            .chain(
                self.comments
                    .iter()
                    .take(max_comments)
                    .map(|c| c.text.as_str()),
            )
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Title and body, used as the candidate's display text
    pub fn summary_text(&self) -> String {
        format!("{}\n{}", self.title, self.selftext).trim().to_string()
    }

    /// Canonical source link: url, then permalink
    pub fn source_url(&self) -> Option<&str> {
        if !self.url.is_empty() {
            return Some(self.url.as_str());
        }
        self.permalink.as_deref().filter(|p| !p.is_empty())
    }
}

/// A retrieved unit of content carrying an embedding of the query's dimension
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: Option<PointId>,
    pub text: String,
    pub payload: PostPayload,
    pub score: Option<f32>,
    pub embedding: Vec<f32>,
}

/// Per-sub-query working set, discarded once its diversified list is fused
#[derive(Debug, Clone)]
pub struct Bucket {
    pub sub_query: String,
    pub hypothetical_answer: String,
    pub embedding: Vec<f32>,
    pub candidates: Vec<Candidate>,
}

/// Output of query transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub standalone_query: String,
    pub sub_queries: Vec<String>,
    pub hypothetical_answers: Vec<String>,
}

/// A point as written to (or read in bulk from) the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedPost {
    pub id: PointId,
    pub vector: Vec<f32>,
    pub payload: PostPayload,
}

/// Marketplace listing details used to seed competitor analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrandInfo {
    pub brand: String,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub reviews: Option<u32>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> PostPayload {
        PostPayload {
            name: "Acme Buds".to_string(),
            title: "Battery report".to_string(),
            selftext: "Lasts two days".to_string(),
            comments: (1..=7)
                .map(|i| Comment {
                    text: format!("comment {i}"),
                    upvotes: i,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_embedding_text_caps_comments() {
        let text = payload().embedding_text(5);
        assert_eq!(
            text,
            "Battery report\nLasts two days\ncomment 1\ncomment 2\ncomment 3\ncomment 4\ncomment 5"
        );
    }

    #[test]
    fn test_embedding_text_skips_empty_parts() {
        let p = PostPayload {
            selftext: "only body".to_string(),
            ..Default::default()
        };
        assert_eq!(p.embedding_text(5), "only body");
        assert!(PostPayload::default().embedding_text(5).is_empty());
    }

    #[test]
    fn test_source_url_fallback() {
        let mut p = PostPayload {
            permalink: Some("https://reddit.com/r/x/1".to_string()),
            ..Default::default()
        };
        assert_eq!(p.source_url(), Some("https://reddit.com/r/x/1"));

        p.url = "https://example.com/post".to_string();
        assert_eq!(p.source_url(), Some("https://example.com/post"));

        assert_eq!(PostPayload::default().source_url(), None);
    }

    #[test]
    fn test_payload_keeps_unknown_fields() {
        let json = serde_json::json!({
            "name": "Acme Buds",
            "title": "t",
            "upvotes": 12,
            "flair": "Review",
            "comments": [{"text": "nice"}]
        });
        let p: PostPayload = serde_json::from_value(json).unwrap();
        assert_eq!(p.upvotes, 12);
        assert_eq!(p.comments[0].upvotes, 0);
        assert_eq!(p.extra.get("flair"), Some(&serde_json::json!("Review")));
    }

    #[test]
    fn test_point_id_untagged() {
        let n: PointId = serde_json::from_str("42").unwrap();
        let s: PointId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(n, PointId::Num(42));
        assert_eq!(s.to_string(), "abc");
        assert!(PointId::Str(String::new()).is_empty());
    }

    #[test]
    fn test_product_lifecycle() {
        let product = Product::new("Acme Buds", "earbuds", "");
        assert!(!product.is_ready());
        assert!(product.mark_ready().is_ready());
    }
}
