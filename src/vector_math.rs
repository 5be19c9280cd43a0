use std::cmp::Ordering;

/// Cosine similarity. Zero-norm, empty or mismatched vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON || !denom.is_finite() {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scales `v` to unit length in place; zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Orders by score descending, then by key ascending.
pub fn compare_scored<K: Ord>(a: (&K, f64), b: (&K, f64)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(b.0))
}

/// Ranks `(key, vector)` candidates against `query`, best first, ties by key.
pub fn rank_by_cosine<'a, K, I>(query: &[f32], candidates: I) -> Vec<(K, f32)>
where
    K: Ord + Copy + 'a,
    I: IntoIterator<Item = (K, &'a [f32])>,
{
    let mut scores: Vec<(K, f32)> = candidates
        .into_iter()
        .map(|(key, vector)| (key, cosine_similarity(query, vector)))
        .collect();

    scores.sort_by(|left, right| {
        compare_scored((&left.0, left.1 as f64), (&right.0, right.1 as f64))
    });
    scores
}
