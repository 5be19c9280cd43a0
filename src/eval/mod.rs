//! Offline evaluation: synthetic samples, metrics and the harness that
//! runs them through the pipeline.

mod harness;
pub mod metrics;
mod sampler;

pub use harness::{AnswerReport, EvaluationHarness, EvaluationReport, RetrievalReport};
pub use sampler::{sample_answer_pairs, sample_keyword_queries, EvaluationSample, RetrievalQuery};
