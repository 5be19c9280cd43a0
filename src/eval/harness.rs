use futures_util::stream::{self, StreamExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use super::metrics::{bleu, hit_at_k, mean, ndcg_at_k, reciprocal_rank, rouge_l};
use super::sampler::{sample_answer_pairs, sample_keyword_queries, EvaluationSample, RetrievalQuery};
use crate::core::config::EvaluationSettings;
use crate::core::errors::RagError;
use crate::pipeline::RagPipeline;

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnswerReport {
    pub samples: usize,
    pub failures: usize,
    pub bleu: f64,
    pub rouge_l: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalReport {
    pub queries: usize,
    pub failures: usize,
    pub k: usize,
    pub ndcg: f64,
    pub hit_rate: f64,
    pub mrr: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub answers: AnswerReport,
    pub retrieval: RetrievalReport,
}

/// Runs sampled questions through the pipeline and scores the results.
///
/// Never writes: the pipeline's query log is detached on construction.
pub struct EvaluationHarness {
    pipeline: RagPipeline,
    concurrency: usize,
}

impl EvaluationHarness {
    pub fn new(pipeline: &RagPipeline, concurrency: usize) -> Self {
        Self {
            pipeline: pipeline.without_query_log(),
            concurrency: concurrency.max(1),
        }
    }

    /// Samples from the current corpus with a seeded RNG and evaluates both
    /// answer quality and retrieval quality.
    pub async fn run(&self, settings: &EvaluationSettings) -> Result<EvaluationReport, RagError> {
        let documents = self.pipeline.retriever().store().all().await?;
        let mut rng = StdRng::seed_from_u64(settings.seed);

        let samples = sample_answer_pairs(&documents, settings.answer_samples, &mut rng);
        let queries = sample_keyword_queries(&documents, settings.retrieval_queries, &mut rng);
        tracing::info!(
            documents = documents.len(),
            samples = samples.len(),
            queries = queries.len(),
            "evaluation started"
        );

        let retrieval = self.evaluate_retrieval(&queries, settings.k).await;
        let answers = self.evaluate_answers(&samples).await;
        Ok(EvaluationReport { answers, retrieval })
    }

    pub async fn evaluate_answers(&self, samples: &[EvaluationSample]) -> AnswerReport {
        let outcomes: Vec<Option<(f64, f64)>> = stream::iter(samples)
            .map(|sample| async move {
                match self.pipeline.query(&sample.question).await {
                    Ok(answer) => Some((
                        bleu(&answer, &sample.reference_answer),
                        rouge_l(&answer, &sample.reference_answer),
                    )),
                    Err(err) => {
                        tracing::warn!("Evaluation query failed: {}", err);
                        None
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let scored: Vec<(f64, f64)> = outcomes.iter().flatten().copied().collect();
        let bleu_scores: Vec<f64> = scored.iter().map(|(b, _)| *b).collect();
        let rouge_scores: Vec<f64> = scored.iter().map(|(_, r)| *r).collect();

        AnswerReport {
            samples: samples.len(),
            failures: outcomes.len() - scored.len(),
            bleu: mean(&bleu_scores),
            rouge_l: mean(&rouge_scores),
        }
    }

    pub async fn evaluate_retrieval(&self, queries: &[RetrievalQuery], k: usize) -> RetrievalReport {
        let retriever = self.pipeline.retriever();
        let outcomes: Vec<Option<(f64, f64, f64)>> = stream::iter(queries)
            .map(|query| async move {
                match retriever.search(&query.query, k).await {
                    Ok(results) => {
                        let ranked: Vec<i64> = results.iter().map(|r| r.document_id).collect();
                        let relevant = [query.relevant_document_id];
                        Some((
                            ndcg_at_k(&ranked, &relevant, k),
                            hit_at_k(&ranked, &relevant, k),
                            reciprocal_rank(&ranked, &relevant),
                        ))
                    }
                    Err(err) => {
                        tracing::warn!("Evaluation search failed: {}", err);
                        None
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let scored: Vec<(f64, f64, f64)> = outcomes.iter().flatten().copied().collect();
        let column = |pick: fn(&(f64, f64, f64)) -> f64| -> Vec<f64> { scored.iter().map(pick).collect() };

        RetrievalReport {
            queries: queries.len(),
            failures: outcomes.len() - scored.len(),
            k,
            ndcg: mean(&column(|s| s.0)),
            hit_rate: mean(&column(|s| s.1)),
            mrr: mean(&column(|s| s.2)),
        }
    }
}
