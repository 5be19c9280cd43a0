//! Offline quality metrics.
//!
//! Text metrics work on lower-cased word tokens. Ranking metrics use binary
//! relevance: a result either is one of the relevant ids or it is not.

use std::collections::HashMap;

use crate::embedding::tokenize;

const BLEU_MAX_ORDER: usize = 4;
/// Numerator used for an n-gram order with no matches.
const BLEU_EPSILON: f64 = 0.1;

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for gram in tokens.windows(n) {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

/// Sentence BLEU with uniform weights up to 4-grams, brevity penalty and
/// epsilon smoothing. Returns a value in `[0, 1]`.
pub fn bleu(candidate: &str, reference: &str) -> f64 {
    let cand = tokenize(candidate);
    let refs = tokenize(reference);
    if cand.is_empty() || refs.is_empty() {
        return 0.0;
    }

    let max_order = BLEU_MAX_ORDER.min(cand.len());
    let mut log_precision_sum = 0.0;

    for n in 1..=max_order {
        let cand_grams = ngram_counts(&cand, n);
        let ref_grams = ngram_counts(&refs, n);
        let total: usize = cand_grams.values().sum();
        let clipped: usize = cand_grams
            .iter()
            .map(|(gram, count)| (*count).min(ref_grams.get(gram).copied().unwrap_or(0)))
            .sum();

        let precision = if clipped == 0 {
            BLEU_EPSILON / total as f64
        } else {
            clipped as f64 / total as f64
        };
        log_precision_sum += precision.ln();
    }

    let geometric_mean = (log_precision_sum / max_order as f64).exp();
    let (c, r) = (cand.len() as f64, refs.len() as f64);
    let brevity_penalty = if c > r { 1.0 } else { (1.0 - r / c).exp() };

    (brevity_penalty * geometric_mean).clamp(0.0, 1.0)
}

fn lcs_length(a: &[String], b: &[String]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            current[j + 1] = if x == y {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// ROUGE-L F1 over the longest common token subsequence.
pub fn rouge_l(candidate: &str, reference: &str) -> f64 {
    let cand = tokenize(candidate);
    let refs = tokenize(reference);
    if cand.is_empty() || refs.is_empty() {
        return 0.0;
    }

    let lcs = lcs_length(&cand, &refs) as f64;
    if lcs == 0.0 {
        return 0.0;
    }
    let precision = lcs / cand.len() as f64;
    let recall = lcs / refs.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

/// NDCG@k with binary gains.
pub fn ndcg_at_k(ranked: &[i64], relevant: &[i64], k: usize) -> f64 {
    if k == 0 || relevant.is_empty() {
        return 0.0;
    }
    let discount = |position: usize| 1.0 / ((position + 2) as f64).log2();

    let dcg: f64 = ranked
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, id)| relevant.contains(*id))
        .map(|(position, _)| discount(position))
        .sum();
    let ideal: f64 = (0..relevant.len().min(k)).map(discount).sum();

    dcg / ideal
}

/// 1.0 when any relevant id appears in the first `k` results.
pub fn hit_at_k(ranked: &[i64], relevant: &[i64], k: usize) -> f64 {
    if ranked.iter().take(k).any(|id| relevant.contains(id)) {
        1.0
    } else {
        0.0
    }
}

/// 1 / rank of the first relevant result, 0 when none is found.
pub fn reciprocal_rank(ranked: &[i64], relevant: &[i64]) -> f64 {
    ranked
        .iter()
        .position(|id| relevant.contains(id))
        .map(|position| 1.0 / (position + 1) as f64)
        .unwrap_or(0.0)
}

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_scores_one() {
        let text = "the quarterback throws the ball downfield";
        assert!((bleu(text, text) - 1.0).abs() < 1e-9);
        assert!((rouge_l(text, text) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unrelated_text_scores_near_zero() {
        assert!(bleu("alpha beta gamma delta", "one two three four") < 0.05);
        assert_eq!(rouge_l("alpha beta", "one two"), 0.0);
        assert_eq!(bleu("", "reference"), 0.0);
    }

    #[test]
    fn short_candidates_are_penalized() {
        let reference = "a touchdown is worth six points in american football";
        let partial = bleu("a touchdown is worth six points", reference);
        assert!(partial > 0.0 && partial < 1.0);
    }

    #[test]
    fn rouge_l_uses_subsequence() {
        // LCS("a b c d", "a c d e") = "a c d" → P = R = 3/4.
        assert!((rouge_l("a b c d", "a c d e") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn ndcg_rewards_early_hits() {
        assert!((ndcg_at_k(&[7, 1, 2], &[7], 3) - 1.0).abs() < 1e-9);
        let second = ndcg_at_k(&[1, 7, 2], &[7], 3);
        assert!((second - 1.0 / 3f64.log2()).abs() < 1e-9);
        assert_eq!(ndcg_at_k(&[1, 2, 7], &[7], 2), 0.0);
        assert_eq!(ndcg_at_k(&[], &[7], 10), 0.0);
    }

    #[test]
    fn hit_rate_and_mrr() {
        assert_eq!(hit_at_k(&[3, 4], &[4], 2), 1.0);
        assert_eq!(hit_at_k(&[3, 4], &[4], 1), 0.0);
        assert_eq!(reciprocal_rank(&[3, 4, 5], &[5]), 1.0 / 3.0);
        assert_eq!(reciprocal_rank(&[3], &[9]), 0.0);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 0.0]), 0.5);
    }
}
