//! Synthetic evaluation data drawn from the corpus.

use std::collections::BTreeSet;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::embedding::tokenize;
use crate::storage::Document;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSample {
    pub question: String,
    pub reference_answer: String,
}

/// Keyword query whose relevant result is the document it was drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalQuery {
    pub query: String,
    pub relevant_document_id: i64,
}

fn sentences(content: &str) -> Vec<&str> {
    content
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Up to `n` question/reference pairs. The question is one sentence of a
/// document and the reference is a different sentence of the same document.
pub fn sample_answer_pairs<R: Rng>(
    documents: &[Document],
    n: usize,
    rng: &mut R,
) -> Vec<EvaluationSample> {
    let candidates: Vec<Vec<&str>> = documents
        .iter()
        .map(|doc| sentences(&doc.content))
        .filter(|parts| parts.len() >= 2)
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut samples = Vec::with_capacity(n);
    for _ in 0..n {
        let Some(parts) = candidates.choose(rng) else {
            break;
        };
        let picked: Vec<&&str> = parts.choose_multiple(rng, 2).collect();
        if let [question, reference] = picked.as_slice() {
            samples.push(EvaluationSample {
                question: format!("{question}?"),
                reference_answer: reference.to_string(),
            });
        }
    }
    samples
}

/// Up to `n` queries of 3 to 6 distinct words taken from one document.
pub fn sample_keyword_queries<R: Rng>(
    documents: &[Document],
    n: usize,
    rng: &mut R,
) -> Vec<RetrievalQuery> {
    let candidates: Vec<(i64, Vec<String>)> = documents
        .iter()
        .map(|doc| {
            let words: BTreeSet<String> = tokenize(&doc.content).into_iter().collect();
            (doc.id, words.into_iter().collect::<Vec<_>>())
        })
        .filter(|(_, words)| words.len() >= 3)
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut queries = Vec::with_capacity(n);
    for _ in 0..n {
        let Some((id, words)) = candidates.choose(rng) else {
            break;
        };
        let length = rng.random_range(3..=words.len().min(6));
        let query = words
            .choose_multiple(rng, length)
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");
        queries.push(RetrievalQuery {
            query,
            relevant_document_id: *id,
        });
    }
    queries
}
