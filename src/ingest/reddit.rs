//! Reddit client: OAuth client-credentials search with comment fetch

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::warn;

use super::PostSource;
use super::RawPost;
use crate::config::RedditConfig;
use crate::errors::PulseRagError;
use crate::errors::Result;
use crate::http;
use crate::models::Comment;

const SERVICE: &str = "reddit";
const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_BASE: &str = "https://oauth.reddit.com";
const PUBLIC_BASE: &str = "https://www.reddit.com";
const REQUEST_TIMEOUT_SECS: u64 = 50;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PostData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    ups: i64,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    #[serde(default)]
    body: String,
    #[serde(default)]
    ups: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Posts from a search listing. Entries without a permalink are skipped.
fn parse_search_listing(listing: Listing) -> Vec<RawPost> {
    listing
        .data
        .children
        .into_iter()
        .filter(|thing| thing.kind == "t3")
        .filter_map(|thing| serde_json::from_value::<PostData>(thing.data).ok())
        .filter(|post| !post.permalink.is_empty())
        .map(|post| RawPost {
            url: format!("{PUBLIC_BASE}{}", post.permalink),
            title: post.title,
            selftext: post.selftext,
            permalink: post.permalink,
            author: post.author,
            subreddit: post.subreddit,
            upvotes: post.ups,
        })
        .collect()
}

/// Top-level comments from a post page (`[post listing, comment listing]`)
fn parse_comment_page(listings: Vec<Listing>, limit: usize) -> Vec<Comment> {
    listings
        .into_iter()
        .nth(1)
        .map(|listing| {
            listing
                .data
                .children
                .into_iter()
                .filter(|thing| thing.kind == "t1")
                .filter_map(|thing| serde_json::from_value::<CommentData>(thing.data).ok())
                .take(limit)
                .map(|c| Comment {
                    text: c.body,
                    upvotes: c.ups,
                })
                .collect()
        })
        .unwrap_or_default()
}

pub struct RedditSource {
    client_id: String,
    client_secret: String,
    user_agent: String,
    client: Client,
    token: Mutex<Option<String>>,
}

impl RedditSource {
    pub fn new(config: &RedditConfig) -> Result<Self> {
        let client_id = config
            .client_id
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PulseRagError::Config("reddit.client_id is required".to_string()))?;
        let client_secret = config
            .client_secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PulseRagError::Config("reddit.client_secret is required".to_string()))?;

        Ok(Self {
            client_id,
            client_secret,
            user_agent: config.user_agent.clone(),
            client: http::build_client(REQUEST_TIMEOUT_SECS)?,
            token: Mutex::new(None),
        })
    }

    /// Cached application-only OAuth token
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        debug!("Requesting Reddit access token");
        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header("User-Agent", &self.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| http::transport(SERVICE, &e))?;
        let response = http::ensure_success(SERVICE, response).await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PulseRagError::Source(format!("Invalid token response: {e}")))?;

        *cached = Some(token.access_token.clone());
        Ok(token.access_token)
    }

    async fn fetch_comments(
        &self,
        url: &str,
        bearer: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Comment>> {
        let mut request = self
            .client
            .get(url)
            .query(&[("limit", limit)])
            .header("User-Agent", &self.user_agent);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| http::transport(SERVICE, &e))?;
        let response = http::ensure_success(SERVICE, response).await?;
        let listings: Vec<Listing> = response
            .json()
            .await
            .map_err(|e| PulseRagError::Source(format!("Invalid comment page: {e}")))?;
        Ok(parse_comment_page(listings, limit))
    }
}

#[async_trait]
impl PostSource for RedditSource {
    async fn search_posts(&self, query: &str, limit: usize) -> Result<Vec<RawPost>> {
        let token = self.access_token().await?;
        let limit_text = limit.to_string();

        let response = self
            .client
            .get(format!("{OAUTH_BASE}/search"))
            .query(&[("q", query), ("limit", limit_text.as_str()), ("sort", "relevance")])
            .bearer_auth(&token)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| http::transport(SERVICE, &e))?;
        let response = http::ensure_success(SERVICE, response).await?;
        let listing: Listing = response
            .json()
            .await
            .map_err(|e| PulseRagError::Source(format!("Invalid search listing: {e}")))?;

        let posts = parse_search_listing(listing);
        debug!("Reddit search {:?} returned {} posts", query, posts.len());
        Ok(posts)
    }

    async fn top_comments(&self, post: &RawPost, limit: usize) -> Result<Vec<Comment>> {
        let token = self.access_token().await?;
        let oauth_url = format!("{OAUTH_BASE}{}.json", post.permalink);
        match self.fetch_comments(&oauth_url, Some(&token), limit).await {
            Ok(comments) => Ok(comments),
            Err(e) => {
                warn!("OAuth comment fetch failed for {}, trying public endpoint: {}", post.url, e);
                let public_url = format!("{}.json", post.url);
                self.fetch_comments(&public_url, None, limit).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_listing() {
        let raw = r#"{"kind": "Listing", "data": {"children": [
            {"kind": "t3", "data": {"title": "Acme Buds battery", "permalink": "/r/headphones/comments/abc/acme/", "author": "u1", "subreddit": "headphones", "selftext": "Two days", "ups": 42}},
            {"kind": "t3", "data": {"title": "No link"}},
            {"kind": "t5", "data": {"display_name": "headphones"}}
        ]}}"#;
        let posts = parse_search_listing(serde_json::from_str(raw).unwrap());

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].url, "https://www.reddit.com/r/headphones/comments/abc/acme/");
        assert_eq!(posts[0].upvotes, 42);
        assert_eq!(posts[0].subreddit, "headphones");
    }

    #[test]
    fn test_parse_comment_page_takes_top_level_comments() {
        let raw = r#"[
            {"kind": "Listing", "data": {"children": [{"kind": "t3", "data": {"title": "post"}}]}},
            {"kind": "Listing", "data": {"children": [
                {"kind": "t1", "data": {"body": "first", "ups": 10}},
                {"kind": "more", "data": {"count": 4}},
                {"kind": "t1", "data": {"body": "second", "ups": 3}},
                {"kind": "t1", "data": {"body": "third", "ups": 1}}
            ]}}
        ]"#;
        let comments = parse_comment_page(serde_json::from_str(raw).unwrap(), 2);

        assert_eq!(
            comments,
            vec![
                Comment { text: "first".to_string(), upvotes: 10 },
                Comment { text: "second".to_string(), upvotes: 3 },
            ]
        );
        assert!(parse_comment_page(Vec::new(), 3).is_empty());
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let err = RedditSource::new(&RedditConfig::default()).err().unwrap();
        assert!(matches!(err, PulseRagError::Config(_)));
    }
}
