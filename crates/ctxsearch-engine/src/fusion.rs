//! Weighted-sum fusion of the KNN and keyword signals.
//!
//! `fused(d) = semantic * knn(d) + keyword * lexical(d)`, where a signal that
//! did not match `d` contributes 0. The inputs are on unrelated scales
//! (similarity in (0, 1], unbounded BM25) and are not normalized first, so
//! the weights are a ranking knob, not a calibrated blend.

use std::collections::{HashMap, HashSet};

use ctxsearch_core::types::FusionWeights;
use ctxsearch_text::TextHit;
use ctxsearch_vector::VectorHit;

/// Fuse two ranked lists into at most `size` `(id, score)` pairs, best
/// first. Equal scores keep candidate order: KNN hits in their order, then
/// keyword-only hits in theirs.
pub fn fuse(knn: &[VectorHit], keyword: &[TextHit], weights: FusionWeights, size: usize) -> Vec<(String, f32)> {
    let lexical: HashMap<&str, f32> = keyword.iter().map(|h| (h.id.as_str(), h.score)).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(knn.len() + keyword.len());
    let mut fused = Vec::with_capacity(knn.len() + keyword.len());

    for h in knn {
        if seen.insert(h.id.as_str()) {
            let kw = lexical.get(h.id.as_str()).copied().unwrap_or(0.0);
            fused.push((h.id.clone(), weights.semantic * h.score + weights.keyword * kw));
        }
    }
    for h in keyword {
        if seen.insert(h.id.as_str()) {
            fused.push((h.id.clone(), weights.keyword * h.score));
        }
    }
    // stable: ties stay in candidate order
    fused.sort_by(|a, b| b.1.total_cmp(&a.1));
    fused.truncate(size);
    fused
}
