
use serde::Serialize;
use tracing::{debug, warn};

use crate::embeddings::{Embedding, StoredEmbedding};

/// A stored knowledge record as seen by the ranker
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeCandidate {
    pub id: i64,
    pub content: String,
    /// Serialized vector; `None` for records that were never embedded
    pub embedding: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult {
    pub id: i64,
    pub content: String,
    pub score: f32,
}

/// Cosine of the angle between `a` and `b`
///
/// Returns 0 for vectors of different lengths, empty vectors and
/// zero-magnitude vectors. The result is clamped to [-1, 1].
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(dot, norm_a, norm_b), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (x.mul_add(y, dot), x.mul_add(x, norm_a), y.mul_add(y, norm_b))
        },
    );

    let magnitude = norm_a.sqrt() * norm_b.sqrt();
    if magnitude == 0.0 {
        return 0.0;
    }

    let similarity = dot / magnitude;
    if !similarity.is_finite() {
        return 0.0;
    }

    similarity.clamp(-1.0, 1.0) as f32
}

/// Score one candidate against the query vector
///
/// Missing or unreadable stored vectors score 0, as do vectors produced by a
/// different backend than the query.
#[inline]
pub fn score_candidate(query: &Embedding, candidate: &KnowledgeCandidate) -> f32 {
    let Some(raw) = candidate.embedding.as_deref() else {
        debug!("Knowledge record {} has no embedding", candidate.id);
        return 0.0;
    };

    let stored = match StoredEmbedding::parse(raw) {
        Ok(stored) => stored,
        Err(e) => {
            warn!(id = candidate.id, error = %e, "Failed to parse stored embedding");
            return 0.0;
        }
    };

    if stored.source.is_some_and(|source| source != query.source) {
        debug!(
            "Knowledge record {} was embedded by the {} backend, query by {}",
            candidate.id,
            stored.source.map_or_else(String::new, |s| s.to_string()),
            query.source
        );
        return 0.0;
    }

    cosine_similarity(&query.vector, &stored.vector)
}

/// Score every candidate, sort descending (ties keep input order), keep scores
/// strictly above `min_score` and return at most `top_k`
#[inline]
pub fn rank(
    query: &Embedding,
    candidates: &[KnowledgeCandidate],
    top_k: usize,
    min_score: f32,
) -> Vec<SimilarityResult> {
    let mut scored: Vec<(f32, &KnowledgeCandidate)> = candidates
        .iter()
        .map(|candidate| (score_candidate(query, candidate), candidate))
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    scored
        .into_iter()
        .filter(|(score, _)| *score > min_score)
        .take(top_k)
        .map(|(score, candidate)| SimilarityResult {
            id: candidate.id,
            content: candidate.content.clone(),
            score,
        })
        .collect()
}
