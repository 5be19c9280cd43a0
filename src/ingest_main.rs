use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};

use rag_chatbot::core::config::AppPaths;
use rag_chatbot::core::logging;
use rag_chatbot::rag::{load_corpus, ChunkingConfig};
use rag_chatbot::state::AppState;

const USAGE: &str = "usage: rag-ingest <file-or-directory> | rag-ingest --backfill";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let source = match args.as_slice() {
        [flag] if flag == "--backfill" => None,
        [path] => Some(PathBuf::from(path)),
        _ => bail!(USAGE),
    };

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "ingest.log");
    let state = AppState::initialize(paths).await?;

    let report = match source {
        Some(path) => {
            let documents = load_corpus(&path, &ChunkingConfig::default())
                .with_context(|| format!("Failed to load corpus from {}", path.display()))?;
            tracing::info!("Loaded {} documents from {}", documents.len(), path.display());
            state.ingestor.ingest(&documents).await?
        }
        None => state.ingestor.backfill_embeddings().await?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
