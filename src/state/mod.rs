use std::sync::Arc;

use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::embedding::build_embedder;
use crate::feedback::{FeedbackStore, RatingRange};
use crate::llm::{GenerationClient, GenerationProvider};
use crate::pipeline::RagPipeline;
use crate::rag::{HybridRetriever, Ingestor};
use crate::storage::{open_pool, DocumentStore, SqliteDocumentStore};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes and the CLI tools.
///
/// Everything a request needs is reachable from here; there is no
/// process-wide mutable configuration.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn DocumentStore>,
    pub feedback: FeedbackStore,
    pub ingestor: Arc<Ingestor>,
    pub pipeline: RagPipeline,
}

impl AppState {
    /// Loads `config.yml` + secrets and opens the database.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(InitializationError::Config)?;
        tracing::debug!(
            "Effective configuration: {}",
            config.redact_sensitive_values(&config.load_config())
        );

        Self::build(paths, settings, None).await
    }

    /// Wires the stores and the pipeline. `provider` replaces the
    /// configured OpenAI-compatible backend when set.
    pub async fn build(
        paths: Arc<AppPaths>,
        settings: Settings,
        provider: Option<Arc<dyn GenerationProvider>>,
    ) -> Result<Arc<Self>, InitializationError> {
        let db_path = paths.resolve(&settings.storage.db_path);
        let pool = open_pool(&db_path)
            .await
            .map_err(InitializationError::Storage)?;
        tracing::info!("Document database at {}", db_path.display());

        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(pool.clone()));
        let feedback = FeedbackStore::new(pool, RatingRange::from(&settings.feedback));

        let embedder = build_embedder(&settings.embedding, settings.generation.api_key.as_deref());
        tracing::info!(
            provider = embedder.name(),
            dimensions = embedder.dimensions(),
            "Embedding provider selected"
        );

        let generator = match provider {
            Some(provider) => GenerationClient::with_provider(provider, &settings.generation),
            None => {
                if settings.generation.api_key.is_none() {
                    tracing::warn!("No generation API key configured; /query will fail");
                }
                GenerationClient::from_settings(&settings.generation)
            }
        };

        let retriever = HybridRetriever::new(store.clone(), embedder.clone());
        let pipeline = RagPipeline::from_settings(&settings, retriever, generator)
            .with_query_log(feedback.clone());
        let ingestor = Arc::new(Ingestor::new(store.clone(), embedder));

        Ok(Arc::new(AppState {
            settings: Arc::new(settings),
            store,
            feedback,
            ingestor,
            pipeline,
        }))
    }
}
