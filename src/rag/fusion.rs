//! Reciprocal Rank Fusion across per-sub-query result lists

use std::collections::HashMap;

use sha2::Digest;
use sha2::Sha256;

use crate::errors::PulseRagError;
use crate::errors::Result;
use crate::models::Candidate;

/// Characters of candidate text hashed when nothing better identifies it
const TEXT_KEY_CHARS: usize = 64;

/// A fused result with its accumulated RRF score
#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub key: String,
    pub score: f64,
    pub candidate: Candidate,
}

/// Identity used to join the same document across lists.
///
/// First non-empty of: candidate id, payload id, url, permalink, title,
/// then a short hash of the leading text. Two posts sharing the same
/// leading text and lacking every other field collapse into one.
pub fn document_key(candidate: &Candidate) -> String {
    if let Some(id) = candidate.id.as_ref().filter(|id| !id.is_empty()) {
        return id.to_string();
    }
    let payload = &candidate.payload;
    if let Some(id) = payload.id.as_ref().filter(|id| !id.is_empty()) {
        return id.to_string();
    }
    if !payload.url.is_empty() {
        return payload.url.clone();
    }
    if let Some(permalink) = payload.permalink.as_ref().filter(|p| !p.is_empty()) {
        return permalink.clone();
    }
    if !payload.title.is_empty() {
        return payload.title.clone();
    }

    let prefix: String = candidate.text.chars().take(TEXT_KEY_CHARS).collect();
    let digest = hex::encode(Sha256::digest(prefix.as_bytes()));
    format!("text:{}", &digest[..16])
}

/// Merge ranked lists by summing `1 / (k + rank)` per document, rank 1-based.
///
/// Output is sorted by descending score; equal scores keep first-seen order.
/// The candidate kept for a key is the first one seen.
pub fn reciprocal_rank_fusion(lists: &[Vec<Candidate>], k: f64) -> Result<Vec<FusedCandidate>> {
    if !(k > 0.0 && k.is_finite()) {
        return Err(PulseRagError::InvalidArgument(format!(
            "RRF constant must be positive, got {k}"
        )));
    }

    let mut fused: Vec<FusedCandidate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for list in lists {
        for (position, candidate) in list.iter().enumerate() {
            let contribution = 1.0 / (k + (position + 1) as f64);
            let key = document_key(candidate);
            match index.get(&key) {
                Some(&slot) => fused[slot].score += contribution,
                None => {
                    index.insert(key.clone(), fused.len());
                    fused.push(FusedCandidate {
                        key,
                        score: contribution,
                        candidate: candidate.clone(),
                    });
                }
            }
        }
    }

    // sort_by is stable, ties stay in first-seen order
    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(fused)
}
