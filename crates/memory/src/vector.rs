//! Vector similarity utilities.

use intellicore_core::knowledge::{Document, ScoredDocument};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the lengths differ or either vector is empty or zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Whether a vector has (numerically) zero length.
pub fn is_zero(v: &[f32]) -> bool {
    v.iter().all(|x| x.abs() < f32::EPSILON)
}

/// Rank documents by cosine similarity to `query`, best first.
///
/// Documents without an embedding, or with a zero embedding, are skipped.
/// Ties keep insertion order.
pub fn rank_by_similarity(documents: &[Document], query: &[f32], k: usize) -> Vec<ScoredDocument> {
    if k == 0 || is_zero(query) {
        return Vec::new();
    }

    let mut scored: Vec<ScoredDocument> = documents
        .iter()
        .filter_map(|doc| {
            let emb = doc.embedding.as_ref()?;
            if is_zero(emb) {
                return None;
            }
            Some(ScoredDocument {
                score: cosine_similarity(emb, query),
                document: doc.clone(),
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}
