//! Maximal Marginal Relevance re-ranking

use tracing::debug;

use super::similarity::cosine_similarity;
use crate::errors::PulseRagError;
use crate::errors::Result;
use crate::models::Candidate;

/// Pick up to `k` candidates trading relevance to `query` against
/// redundancy with what is already picked.
///
/// Each round scores every unpicked candidate as
/// `lambda * sim(c, query) - (1 - lambda) * max(sim(c, s) for s in picked)`
/// and takes the best one. The max term is recomputed against the current
/// picked set every round, so a round costs O(picked) similarity evaluations
/// per candidate. Ties go to the candidate that comes first in descending
/// relevance order. The first pick is always the most relevant candidate.
pub fn select_diverse(
    candidates: &[Candidate],
    query: &[f32],
    k: usize,
    lambda: f32,
) -> Result<Vec<Candidate>> {
    if !(0.0..=1.0).contains(&lambda) {
        return Err(PulseRagError::InvalidArgument(format!(
            "MMR lambda must be within [0, 1], got {lambda}"
        )));
    }
    if k == 0 || candidates.is_empty() {
        return Ok(Vec::new());
    }

    let sims = candidates
        .iter()
        .map(|c| cosine_similarity(&c.embedding, query))
        .collect::<Result<Vec<_>>>()?;

    // Stable sort keeps input order among equal relevance
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&i, &j| sims[j].total_cmp(&sims[i]));

    let target = k.min(candidates.len());
    let mut picked: Vec<usize> = Vec::with_capacity(target);
    let mut taken = vec![false; candidates.len()];

    picked.push(order[0]);
    taken[order[0]] = true;

    while picked.len() < target {
        let mut best: Option<(usize, f32)> = None;

        for &i in &order {
            if taken[i] {
                continue;
            }
            let mut max_to_picked = f32::NEG_INFINITY;
            for &s in &picked {
                let sim = cosine_similarity(&candidates[i].embedding, &candidates[s].embedding)?;
                if sim > max_to_picked {
                    max_to_picked = sim;
                }
            }
            let score = lambda * sims[i] - (1.0 - lambda) * max_to_picked;
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((i, score));
            }
        }

        let Some((i, _)) = best else {
            break;
        };
        picked.push(i);
        taken[i] = true;
    }

    debug!(
        "MMR kept {} of {} candidates (k={}, lambda={})",
        picked.len(),
        candidates.len(),
        k,
        lambda
    );

    Ok(picked.into_iter().map(|i| candidates[i].clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PointId;
    use crate::models::PostPayload;

    fn candidate(id: u64, embedding: Vec<f32>) -> Candidate {
        Candidate {
            id: Some(PointId::Num(id)),
            text: format!("post {id}"),
            payload: PostPayload::default(),
            score: None,
            embedding,
        }
    }

    fn ids(list: &[Candidate]) -> Vec<u64> {
        list.iter()
            .map(|c| match c.id {
                Some(PointId::Num(n)) => n,
                _ => unreachable!(),
            })
            .collect()
    }

    /// Unit vector at `angle` degrees from the x axis
    fn at(angle: f32) -> Vec<f32> {
        let r = angle.to_radians();
        vec![r.cos(), r.sin()]
    }

    #[test]
    fn test_lambda_one_is_relevance_order() {
        // sims to [1, 0]: 0.1, 0.5, 0.9, 0.5
        let cands = vec![
            candidate(1, vec![0.1, (1.0f32 - 0.01).sqrt()]),
            candidate(2, vec![0.5, (1.0f32 - 0.25).sqrt()]),
            candidate(3, vec![0.9, (1.0f32 - 0.81).sqrt()]),
            candidate(4, vec![0.5, -(1.0f32 - 0.25).sqrt()]),
        ];
        let out = select_diverse(&cands, &[1.0, 0.0], 4, 1.0).unwrap();
        // 2 and 4 tie on relevance; input order decides
        assert_eq!(ids(&out), vec![3, 2, 4, 1]);
    }

    #[test]
    fn test_lambda_zero_picks_least_similar() {
        let cands = vec![
            candidate(1, at(0.0)),
            candidate(2, at(10.0)),
            candidate(3, at(90.0)),
            candidate(4, at(45.0)),
        ];
        let out = select_diverse(&cands, &at(0.0), 3, 0.0).unwrap();
        // Best first, then the one furthest from it, then furthest from both
        assert_eq!(ids(&out), vec![1, 3, 4]);
    }

    #[test]
    fn test_never_exceeds_k_or_repeats() {
        let cands: Vec<_> = (0..10).map(|i| candidate(i, at(i as f32 * 9.0))).collect();
        for k in [1, 3, 10, 25] {
            let out = select_diverse(&cands, &at(0.0), k, 0.7).unwrap();
            assert_eq!(out.len(), k.min(cands.len()));
            let mut seen = ids(&out);
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), out.len());
        }
    }

    #[test]
    fn test_first_pick_is_most_relevant() {
        let cands = vec![
            candidate(1, at(60.0)),
            candidate(2, at(5.0)),
            candidate(3, at(30.0)),
        ];
        let out = select_diverse(&cands, &at(0.0), 2, 0.3).unwrap();
        assert_eq!(ids(&out)[0], 2);
    }

    #[test]
    fn test_redundant_duplicate_is_demoted() {
        // 2 duplicates 1 exactly; 3 is less relevant but distinct
        let cands = vec![
            candidate(1, at(0.0)),
            candidate(2, at(0.0)),
            candidate(3, at(40.0)),
        ];
        let out = select_diverse(&cands, &at(0.0), 2, 0.3).unwrap();
        assert_eq!(ids(&out), vec![1, 3]);
    }

    #[test]
    fn test_redundancy_uses_every_picked_candidate() {
        // 3 is close to 2 but not to 1, so it only loses once 2 is picked
        let cands = vec![
            candidate(1, vec![0.8, 0.6, 0.0]),
            candidate(2, vec![0.6, -0.8, 0.0]),
            candidate(3, vec![0.6, -0.64, 0.48]),
            candidate(4, vec![0.0, 0.0, 1.0]),
        ];
        let out = select_diverse(&cands, &[1.0, 0.0, 0.0], 3, 0.5).unwrap();
        assert_eq!(ids(&out), vec![1, 2, 4]);
    }

    #[test]
    fn test_empty_and_zero_k() {
        assert!(select_diverse(&[], &[1.0, 0.0], 5, 0.7).unwrap().is_empty());
        let cands = vec![candidate(1, at(0.0))];
        assert!(select_diverse(&cands, &at(0.0), 0, 0.7).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_lambda() {
        let cands = vec![candidate(1, at(0.0))];
        assert!(select_diverse(&cands, &at(0.0), 1, 1.2).is_err());
        assert!(select_diverse(&cands, &at(0.0), 1, -0.1).is_err());
    }

    #[test]
    fn test_dimension_mismatch_propagates() {
        let cands = vec![candidate(1, vec![1.0, 0.0, 0.0])];
        let err = select_diverse(&cands, &[1.0, 0.0], 1, 0.7).unwrap_err();
        assert!(matches!(err, PulseRagError::DimensionMismatch { .. }));
    }
}
