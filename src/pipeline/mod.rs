//! Query orchestration: retrieve → assemble → generate.

use std::time::Duration;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::config::Settings;
use crate::core::errors::{PipelineStage, RagError};
use crate::feedback::FeedbackStore;
use crate::llm::{GenerationClient, GenerationOptions};
use crate::rag::{HybridRetriever, PromptAssembler, RetrievalResult};

/// A successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub request_id: Uuid,
    pub answer: String,
    pub sources: Vec<RetrievalResult>,
}

/// Stage bookkeeping for one execution. Never shared between calls.
struct Execution {
    stage: PipelineStage,
}

impl Execution {
    fn start() -> Self {
        Self {
            stage: PipelineStage::Idle,
        }
    }

    fn advance(&mut self, next: PipelineStage) {
        tracing::debug!(from = %self.stage, to = %next, "pipeline stage");
        self.stage = next;
    }

    /// Marks the execution failed and tags `err` with the stage it came from.
    fn fail(&mut self, err: RagError) -> RagError {
        let failed_at = self.stage;
        self.stage = PipelineStage::Failed;
        tracing::error!(stage = %failed_at, code = err.code(), "pipeline failed: {}", err);
        RagError::at_stage(failed_at, err)
    }
}

#[derive(Clone)]
pub struct RagPipeline {
    retriever: HybridRetriever,
    assembler: PromptAssembler,
    generator: GenerationClient,
    options: GenerationOptions,
    top_k: usize,
    query_log: Option<FeedbackStore>,
}

impl RagPipeline {
    pub fn new(
        retriever: HybridRetriever,
        assembler: PromptAssembler,
        generator: GenerationClient,
        options: GenerationOptions,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            assembler,
            generator,
            options,
            top_k,
            query_log: None,
        }
    }

    pub fn from_settings(
        settings: &Settings,
        retriever: HybridRetriever,
        generator: GenerationClient,
    ) -> Self {
        Self::new(
            retriever,
            PromptAssembler::from_settings(&settings.prompt),
            generator,
            GenerationOptions::from_settings(&settings.generation),
            settings.retrieval.top_k,
        )
    }

    /// Appends every answered query to `store`'s usage log.
    pub fn with_query_log(mut self, store: FeedbackStore) -> Self {
        self.query_log = Some(store);
        self
    }

    /// Same pipeline without usage logging, for read-only callers.
    pub fn without_query_log(&self) -> Self {
        Self {
            query_log: None,
            ..self.clone()
        }
    }

    pub fn retriever(&self) -> &HybridRetriever {
        &self.retriever
    }

    pub async fn query(&self, text: &str) -> Result<String, RagError> {
        self.execute(text, None).await.map(|outcome| outcome.answer)
    }

    /// Runs the full pipeline. `timeout` bounds the generation stage and
    /// overrides the configured default when set.
    pub async fn execute(
        &self,
        text: &str,
        timeout: Option<Duration>,
    ) -> Result<QueryOutcome, RagError> {
        let question = text.trim();
        if question.is_empty() {
            return Err(RagError::Validation("query text cannot be empty".to_string()));
        }

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("rag_query", %request_id);
        self.run(request_id, question, timeout).instrument(span).await
    }

    async fn run(
        &self,
        request_id: Uuid,
        question: &str,
        timeout: Option<Duration>,
    ) -> Result<QueryOutcome, RagError> {
        let mut execution = Execution::start();

        execution.advance(PipelineStage::Retrieving);
        let sources = match self.retriever.search(question, self.top_k).await {
            Ok(results) => results,
            Err(err) => return Err(execution.fail(err)),
        };

        execution.advance(PipelineStage::Assembling);
        let prompt = self.assembler.build(question, &sources);

        execution.advance(PipelineStage::Generating);
        let options = match timeout {
            Some(limit) => self.options.clone().with_timeout(Some(limit)),
            None => self.options.clone(),
        };
        let answer = match self.generator.generate(&prompt, &options).await {
            Ok(answer) => answer,
            Err(err) => return Err(execution.fail(err.into())),
        };

        execution.advance(PipelineStage::Done);
        tracing::info!(sources = sources.len(), "query answered");

        if let Some(log) = &self.query_log {
            if let Err(err) = log.log_query(question, &answer).await {
                tracing::warn!("Failed to append query log: {}", err);
            }
        }

        Ok(QueryOutcome {
            request_id,
            answer,
            sources,
        })
    }
}
