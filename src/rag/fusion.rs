use std::collections::BTreeMap;

use crate::vector_math::compare_scored;

/// Combined score for one document after reciprocal-rank fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedScore {
    pub document_id: i64,
    pub score: f64,
    pub semantic_rank: Option<usize>,
    pub lexical_rank: Option<usize>,
}

/// Merges two ranked id lists (best first, 1-based ranks).
///
/// score = 1/r_sem + 1/r_lex, with a missing list contributing 0. Output is
/// ordered by score descending, then by document id ascending.
pub fn reciprocal_rank_fusion(semantic: &[i64], lexical: &[i64]) -> Vec<FusedScore> {
    let mut fused: BTreeMap<i64, FusedScore> = BTreeMap::new();

    for (index, id) in semantic.iter().enumerate() {
        let rank = index + 1;
        let entry = fused.entry(*id).or_insert_with(|| empty_score(*id));
        if entry.semantic_rank.is_none() {
            entry.semantic_rank = Some(rank);
            entry.score += 1.0 / rank as f64;
        }
    }

    for (index, id) in lexical.iter().enumerate() {
        let rank = index + 1;
        let entry = fused.entry(*id).or_insert_with(|| empty_score(*id));
        if entry.lexical_rank.is_none() {
            entry.lexical_rank = Some(rank);
            entry.score += 1.0 / rank as f64;
        }
    }

    let mut merged: Vec<FusedScore> = fused.into_values().collect();
    merged.sort_by(|a, b| compare_scored((&a.document_id, a.score), (&b.document_id, b.score)));
    merged
}

fn empty_score(document_id: i64) -> FusedScore {
    FusedScore {
        document_id,
        score: 0.0,
        semantic_rank: None,
        lexical_rank: None,
    }
}
