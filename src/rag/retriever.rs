//! Hybrid retrieval: keyword match + embedding similarity, merged by
//! reciprocal-rank fusion.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::fusion::reciprocal_rank_fusion;
use crate::core::errors::RagError;
use crate::embedding::{tokenize, EmbeddingProvider};
use crate::storage::{Document, DocumentStore};
use crate::vector_math::rank_by_cosine;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub document_id: i64,
    pub content: String,
    pub score: f64,
}

#[derive(Clone)]
pub struct HybridRetriever {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl HybridRetriever {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Returns at most `k` results, best first.
    ///
    /// Results come from a single live read of the store, so every id refers
    /// to a document present when the call ran.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>, RagError> {
        let terms = query_terms(query);
        if k == 0 || terms.is_empty() {
            return Ok(Vec::new());
        }

        let documents = self.store.all().await?;
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let lexical = lexical_ranking(&documents, &terms, k);
        let query_embedding = self.embedder.encode(query).await?;
        let semantic = semantic_ranking(&query_embedding, &documents, k);

        let by_id: HashMap<i64, &Document> = documents.iter().map(|doc| (doc.id, doc)).collect();
        let results: Vec<RetrievalResult> = reciprocal_rank_fusion(&semantic, &lexical)
            .into_iter()
            .filter_map(|fused| {
                by_id.get(&fused.document_id).map(|doc| RetrievalResult {
                    document_id: doc.id,
                    content: doc.content.clone(),
                    score: fused.score,
                })
            })
            .take(k)
            .collect();

        tracing::debug!(
            lexical = lexical.len(),
            semantic = semantic.len(),
            returned = results.len(),
            "hybrid search completed"
        );
        Ok(results)
    }
}

/// Distinct lower-cased query words.
fn query_terms(query: &str) -> BTreeSet<String> {
    tokenize(query).into_iter().collect()
}

/// Documents containing at least one query word, ranked by how many distinct
/// query words they contain.
fn lexical_ranking(documents: &[Document], terms: &BTreeSet<String>, k: usize) -> Vec<i64> {
    let mut matches: Vec<(i64, usize)> = documents
        .iter()
        .filter_map(|doc| {
            let words: HashSet<String> = tokenize(&doc.content).into_iter().collect();
            let hits = terms.iter().filter(|term| words.contains(*term)).count();
            (hits > 0).then_some((doc.id, hits))
        })
        .collect();

    matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    matches.into_iter().take(k).map(|(id, _)| id).collect()
}

/// Top-`k` embedded documents by cosine similarity to the query.
fn semantic_ranking(query_embedding: &[f32], documents: &[Document], k: usize) -> Vec<i64> {
    let candidates = documents
        .iter()
        .filter_map(|doc| doc.embedding.as_deref().map(|vector| (doc.id, vector)));

    rank_by_cosine(query_embedding, candidates)
        .into_iter()
        .take(k)
        .map(|(id, _)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingError, HashingEmbedder};
    use crate::storage::{test_pool, SqliteDocumentStore};
    use async_trait::async_trait;

    async fn retriever_with(corpus: &[&str]) -> HybridRetriever {
        let embedder = Arc::new(HashingEmbedder::new(384));
        let store = Arc::new(SqliteDocumentStore::new(test_pool().await));
        for text in corpus {
            store
                .add(text, Some(embedder.embed_sync(text)))
                .await
                .unwrap();
        }
        HybridRetriever::new(store, embedder)
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn name(&self) -> &str {
            "failing"
        }

        fn dimensions(&self) -> usize {
            3
        }

        async fn encode(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Request("encoder offline".to_string()))
        }
    }

    #[tokio::test]
    async fn quick_fox_ranks_the_fox_sentence_first() {
        let retriever = retriever_with(&[
            "The quick brown fox jumps over the lazy dog",
            "A journey of a thousand miles begins with a single step",
        ])
        .await;

        let results = retriever.search("quick fox", 2).await.unwrap();
        assert!(results.len() <= 2);
        assert!(results[0].content.contains("quick brown fox"));
    }

    #[tokio::test]
    async fn empty_corpus_returns_empty() {
        let retriever = retriever_with(&[]).await;
        assert!(retriever.search("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_query_or_zero_k_returns_empty() {
        let retriever = retriever_with(&["some content"]).await;
        assert!(retriever.search("", 3).await.unwrap().is_empty());
        assert!(retriever.search("   ", 3).await.unwrap().is_empty());
        assert!(retriever.search("content", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn results_are_bounded_by_k_and_reference_live_documents() {
        let corpus = [
            "touchdown scoring rules",
            "field goal scoring",
            "safety scoring and kickoff",
            "holding penalty",
            "pass interference penalty",
        ];
        let retriever = retriever_with(&corpus).await;

        for k in 0..7 {
            let results = retriever.search("scoring penalty", k).await.unwrap();
            assert!(results.len() <= k);
            for result in &results {
                let doc = retriever.store().get(result.document_id).await.unwrap();
                assert_eq!(doc.content, result.content);
            }
        }
    }

    #[tokio::test]
    async fn scores_follow_reciprocal_rank_fusion() {
        let retriever = retriever_with(&["alpha beta", "gamma delta"]).await;
        let results = retriever.search("alpha", 2).await.unwrap();

        // "alpha beta" is first in both lists.
        assert_eq!(results[0].content, "alpha beta");
        assert!((results[0].score - 2.0).abs() < 1e-9);
        // "gamma delta" only appears in the semantic list, at rank 2.
        assert_eq!(results[1].content, "gamma delta");
        assert!((results[1].score - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn documents_without_embeddings_still_match_lexically() {
        let embedder = Arc::new(HashingEmbedder::new(64));
        let store = Arc::new(SqliteDocumentStore::new(test_pool().await));
        store.add("kickoff after a safety", None).await.unwrap();
        let retriever = HybridRetriever::new(store, embedder);

        let results = retriever.search("safety", 3).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn equal_scores_are_ordered_by_id() {
        let embedder = Arc::new(HashingEmbedder::new(64));
        let store = Arc::new(SqliteDocumentStore::new(test_pool().await));
        let first = store.add("same words here", None).await.unwrap();
        let second = store.add("same words here", None).await.unwrap();
        let retriever = HybridRetriever::new(store, embedder);

        let results = retriever.search("same words", 2).await.unwrap();
        let ids: Vec<i64> = results.iter().map(|r| r.document_id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn embedding_failure_propagates() {
        let store = Arc::new(SqliteDocumentStore::new(test_pool().await));
        store.add("content", None).await.unwrap();
        let retriever = HybridRetriever::new(store, Arc::new(FailingEmbedder));

        let err = retriever.search("content", 1).await.unwrap_err();
        assert_eq!(err.code(), "embedding_error");
    }
}
