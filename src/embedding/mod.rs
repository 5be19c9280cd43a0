//! Text → vector encoders.
//!
//! Exactly one provider is chosen at startup from `embedding.provider`:
//! - `HashingEmbedder`: local keyword-frequency vectorizer
//! - `OpenAiEmbedder`: OpenAI-compatible `/v1/embeddings` endpoint

mod hashing;
mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::config::{EmbeddingBackend, EmbeddingSettings};
use crate::core::errors::RagError;

pub use hashing::{tokenize, HashingEmbedder};
pub use openai::OpenAiEmbedder;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(String),
    #[error("embedding endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed embedding response: {0}")]
    Malformed(String),
}

impl From<EmbeddingError> for RagError {
    fn from(err: EmbeddingError) -> Self {
        RagError::Embedding(err.to_string())
    }
}

/// Deterministic for identical input within a process lifetime.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    fn dimensions(&self) -> usize;

    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

pub fn build_embedder(
    settings: &EmbeddingSettings,
    api_key: Option<&str>,
) -> Arc<dyn EmbeddingProvider> {
    match settings.provider {
        EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(settings.dimensions)),
        EmbeddingBackend::OpenAi => Arc::new(OpenAiEmbedder::new(
            settings.base_url.clone(),
            settings.model.clone(),
            settings.dimensions,
            api_key.map(str::to_string),
        )
        .with_timeout(Duration::from_secs(settings.timeout_secs.max(1)))),
    }
}
