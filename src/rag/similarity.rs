//! Vector math shared by diversification, competitor ranking and the
//! in-memory store

use crate::errors::PulseRagError;
use crate::errors::Result;

/// Cosine similarity of two equal-length vectors.
///
/// Returns 0 when either vector has zero norm. Vectors of different
/// lengths are a contract violation and fail with
/// [`PulseRagError::DimensionMismatch`].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(PulseRagError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    // Rounding can push |sim| a hair past 1
    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32)
}
