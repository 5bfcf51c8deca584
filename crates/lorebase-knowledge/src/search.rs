//! Cosine similarity and the threshold/fallback ranking policy.

use serde::Serialize;

use crate::record::{ChunkRecord, ContentTag};

/// Fewer survivors than this and the quality threshold is abandoned,
/// provided at least this many candidates existed before filtering.
const FALLBACK_FLOOR: usize = 3;

/// Cosine similarity between two vectors, in [-1, 1].
///
/// Mismatched lengths and zero vectors score 0.0 instead of erroring;
/// the store never persists either, but stale files might contain them.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Order scored candidates and apply the quality threshold.
///
/// Sorting is stable, so equal scores keep their insertion order. When the
/// threshold leaves fewer than three survivors but at least three candidates
/// existed, the filter is discarded entirely and the unfiltered top-`k` is
/// returned instead — a small corpus or a lexically distant query should
/// still produce context, even low-relevance context.
pub fn rank<T>(mut scored: Vec<(T, f32)>, k: usize, threshold: f32) -> Vec<(T, f32)> {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let surviving = scored
        .iter()
        .take_while(|(_, score)| *score >= threshold)
        .count();

    if surviving < FALLBACK_FLOOR && scored.len() >= FALLBACK_FLOOR {
        scored.truncate(k);
    } else {
        scored.truncate(surviving.min(k));
    }
    scored
}

/// One ranked retrieval result: chunk content, citation metadata, score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub content: String,
    pub source: String,
    pub kind: String,
    pub sector_id: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub score: f32,
    pub page: Option<u32>,
    pub heading: Option<String>,
    pub content_tag: Option<ContentTag>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

impl SearchHit {
    pub(crate) fn from_record(record: &ChunkRecord, score: f32) -> Self {
        Self {
            content: record.content.clone(),
            source: record.source.clone(),
            kind: record.kind.clone(),
            sector_id: record.sector_id.clone(),
            chunk_index: record.chunk_index,
            total_chunks: record.total_chunks,
            score,
            page: record.page,
            heading: record.heading.clone(),
            content_tag: record.content_tag,
            start_time: record.start_time,
            end_time: record.end_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_self_similarity_is_one() {
        let v = vec![0.3, -0.7, 1.2, 0.05];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_is_symmetric() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-0.5, 0.25, 4.0];
        assert!((cosine_similarity(&a, &b) - cosine_similarity(&b, &a)).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_rank_sorts_descending() {
        let ranked = rank(vec![("a", 0.2), ("b", 0.9), ("c", 0.6)], 10, 0.0);
        let order: Vec<&str> = ranked.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_rank_ties_keep_insertion_order() {
        let ranked = rank(
            vec![("first", 0.5), ("second", 0.5), ("third", 0.5)],
            10,
            0.0,
        );
        let order: Vec<&str> = ranked.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_rank_threshold_filters_weak_candidates() {
        let ranked = rank(
            vec![("good", 0.8), ("ok", 0.6), ("strong", 0.9), ("weak", 0.1)],
            10,
            0.5,
        );
        let order: Vec<&str> = ranked.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec!["strong", "good", "ok"]);
    }

    #[test]
    fn test_fallback_fires_with_three_weak_candidates() {
        // All below threshold, but 3 candidates exist: the filter is dropped.
        let ranked = rank(vec![("a", 0.1), ("b", 0.3), ("c", 0.2)], 10, 0.5);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].0, "b");
    }

    #[test]
    fn test_fallback_does_not_fire_below_floor() {
        // Only 2 candidates: the filtered (empty) result stands.
        let ranked = rank(vec![("a", 0.1), ("b", 0.3)], 10, 0.5);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_rank_truncates_to_k() {
        let scored: Vec<(usize, f32)> =
            (0..10).map(|i| (i, 1.0 - i as f32 * 0.05)).collect();
        let ranked = rank(scored, 4, 0.0);
        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[0].0, 0);
    }
}
