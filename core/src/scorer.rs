use crate::shingle::ShingleSet;

/// Containment of `query` in `target`: `|query ∩ target| / |target|`.
///
/// Not symmetric. An empty target scores 0.
pub fn score(query: &ShingleSet, target: &ShingleSet) -> f64 {
    let total = target.len();
    if total == 0 {
        return 0.0;
    }
    let contained = query.intersection_len(target);
    let diff = total - contained;
    (total - diff) as f64 / total as f64
}
