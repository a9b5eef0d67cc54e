
use itertools::Itertools;

use crate::search::SimilarityResult;

/// Separates passages in the retrieval context
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Format ranked passages as numbered blocks with their relevance percentage
///
/// Returns an empty string when there are no results.
#[inline]
pub fn build_context(results: &[SimilarityResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            format!(
                "[Dokumen {} - Relevansi: {}%]\n{}",
                i + 1,
                relevance_percent(result.score),
                result.content
            )
        })
        .join(CONTEXT_SEPARATOR)
}

fn relevance_percent(score: f32) -> i64 {
    (f64::from(score) * 100.0).round() as i64
}
