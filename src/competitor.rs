//! Competitor analysis: rank a brand's posts against fixed "good" and "bad"
//! anchor queries and ask the model for a structured profile

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::embeddings::EmbeddingService;
use crate::errors::Result;
use crate::llm::strip_code_fences;
use crate::llm::PulsePrompts;
use crate::llm::TextGenerator;
use crate::models::BrandInfo;
use crate::models::IndexedPost;
use crate::rag::cosine_similarity;

const GOOD_ANCHOR: &str = "good points about the product";
const BAD_ANCHOR: &str = "bad points about the product";

/// Posts kept per anchor
const TOP_POSTS: usize = 10;

/// Structured competitor summary returned by the model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub good_points: Vec<String>,
    #[serde(default)]
    pub bad_points: Vec<String>,
}

/// Parse a model response into a profile; `None` when it is not the
/// expected JSON object
pub fn parse_profile(response: &str) -> Option<CompetitorProfile> {
    match serde_json::from_str::<CompetitorProfile>(strip_code_fences(response)) {
        Ok(profile) => Some(profile),
        Err(e) => {
            warn!("Malformed competitor profile: {}", e);
            None
        }
    }
}

/// The `top` posts most similar to `anchor`, best first. Posts whose vector
/// does not match the anchor's dimension are ignored.
pub fn rank_posts<'a>(posts: &'a [IndexedPost], anchor: &[f32], top: usize) -> Vec<&'a IndexedPost> {
    let mut scored: Vec<(f32, &IndexedPost)> = posts
        .iter()
        .filter_map(|post| {
            cosine_similarity(&post.vector, anchor)
                .ok()
                .map(|sim| (sim, post))
        })
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(top).map(|(_, post)| post).collect()
}

fn numbered_posts(posts: &[&IndexedPost]) -> String {
    posts
        .iter()
        .enumerate()
        .map(|(i, post)| format!("{}. {}\n{}", i + 1, post.payload.title, post.payload.selftext))
        .collect::<Vec<_>>()
        .join("\n---\n")
}

fn display_or_unknown<T: ToString>(value: Option<&T>) -> String {
    value.map_or_else(|| "unknown".to_string(), ToString::to_string)
}

/// Prompt for one brand given its best "good" and "bad" posts
pub fn build_competitor_prompt(
    brand: &BrandInfo,
    good: &[&IndexedPost],
    bad: &[&IndexedPost],
) -> String {
    let rating = display_or_unknown(brand.rating.as_ref());
    let reviews = display_or_unknown(brand.reviews.as_ref());
    let price = display_or_unknown(brand.price.as_ref());
    let snippet = display_or_unknown(brand.snippet.as_ref());
    let good_posts = numbered_posts(good);
    let bad_posts = numbered_posts(bad);

    PulsePrompts::competitor_profile().render_with(&[
        ("brand", brand.brand.as_str()),
        ("rating", rating.as_str()),
        ("reviews", reviews.as_str()),
        ("price", price.as_str()),
        ("snippet", snippet.as_str()),
        ("good_posts", good_posts.as_str()),
        ("bad_posts", bad_posts.as_str()),
    ])
}

pub struct CompetitorAnalyzer {
    llm: Arc<dyn TextGenerator>,
    embeddings: EmbeddingService,
}

impl CompetitorAnalyzer {
    pub fn new(llm: Arc<dyn TextGenerator>, embeddings: EmbeddingService) -> Self {
        Self { llm, embeddings }
    }

    /// Profile `brand` from `posts`.
    ///
    /// Embedding and generation failures are errors; a response that does
    /// not parse as a profile gives `Ok(None)`.
    pub async fn analyze(
        &self,
        brand: &BrandInfo,
        posts: &[IndexedPost],
    ) -> Result<Option<CompetitorProfile>> {
        info!("Analyzing competitor {} from {} posts", brand.brand, posts.len());

        let (good_anchor, bad_anchor) = futures::try_join!(
            self.embeddings.generate(GOOD_ANCHOR),
            self.embeddings.generate(BAD_ANCHOR)
        )?;

        let good = rank_posts(posts, &good_anchor, TOP_POSTS);
        let bad = rank_posts(posts, &bad_anchor, TOP_POSTS);
        debug!("Selected {} good and {} bad posts", good.len(), bad.len());

        let prompt = build_competitor_prompt(brand, &good, &bad);
        let response = self.llm.generate_json(&prompt).await?;
        Ok(parse_profile(&response))
    }
}
