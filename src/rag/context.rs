//! Context assembly from fused candidates

use serde::Deserialize;
use serde::Serialize;

use crate::models::Candidate;

/// Comments shown per chunk
const MAX_COMMENTS_PER_CHUNK: usize = 5;

/// Where one context chunk came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSource {
    /// 1-based position in the context (the fusion rank)
    pub rank: usize,
    pub title: String,
    pub url: Option<String>,
    pub subreddit: String,
    pub score: Option<f64>,
}

/// Renders candidates as numbered `Chunk` blocks
pub struct ContextAssembler {
    max_comments: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(MAX_COMMENTS_PER_CHUNK)
    }
}

impl ContextAssembler {
    #[must_use]
    pub const fn new(max_comments: usize) -> Self {
        Self { max_comments }
    }

    /// One chunk, numbered from 1
    #[must_use]
    pub fn format_chunk(&self, index: usize, candidate: &Candidate) -> String {
        let payload = &candidate.payload;
        let mut chunk = format!(
            "Chunk {}:\nTitle: {}\nBody: {}\nTop comments:\n",
            index + 1,
            payload.title,
            payload.selftext
        );
        for (i, comment) in payload.comments.iter().take(self.max_comments).enumerate() {
            chunk.push_str(&format!("{}. {}\n", i + 1, comment.text));
        }
        chunk.push_str(&format!(
            "Source: {}\n\n",
            payload.source_url().unwrap_or("unknown")
        ));
        chunk
    }

    /// Concatenated chunks in the given order
    #[must_use]
    pub fn assemble(&self, candidates: &[Candidate]) -> String {
        candidates
            .iter()
            .enumerate()
            .map(|(i, c)| self.format_chunk(i, c))
            .collect()
    }

    /// Context plus one [`ChunkSource`] per chunk. `scores` lines up with
    /// `candidates` when fusion scores are available.
    #[must_use]
    pub fn assemble_with_sources(
        &self,
        candidates: &[Candidate],
        scores: Option<&[f64]>,
    ) -> (String, Vec<ChunkSource>) {
        let sources = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| ChunkSource {
                rank: i + 1,
                title: c.payload.title.clone(),
                url: c.payload.source_url().map(str::to_string),
                subreddit: c.payload.subreddit.clone(),
                score: scores.and_then(|s| s.get(i).copied()),
            })
            .collect();
        (self.assemble(candidates), sources)
    }
}
