//! Corpus ingestion.
//!
//! Loads documents from:
//! - `*.json` files holding `[{"content": "..."}]` arrays
//! - `*.txt` files, split into sentence-bounded chunks
//!
//! and writes them to the document store with their embeddings.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;
use crate::embedding::EmbeddingProvider;
use crate::storage::DocumentStore;

/// Chunking parameters for plain-text sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub inserted: usize,
    pub embedded: usize,
    pub pending: usize,
}

/// Reads every supported file under `path` (or `path` itself) in name order.
pub fn load_corpus(path: &Path, chunking: &ChunkingConfig) -> anyhow::Result<Vec<String>> {
    let mut files = if path.is_dir() {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)
            .with_context(|| format!("Failed to list {}", path.display()))?
        {
            entries.push(entry?.path());
        }
        entries
    } else {
        vec![path.to_path_buf()]
    };
    files.sort();

    let mut documents = Vec::new();
    for file in files {
        match file.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let raw = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let parsed: Vec<RawDocument> = serde_json::from_str(&raw)
                    .with_context(|| format!("Malformed document list in {}", file.display()))?;
                documents.extend(
                    parsed
                        .into_iter()
                        .map(|doc| doc.content)
                        .filter(|content| !content.trim().is_empty()),
                );
            }
            Some("txt") => {
                let raw = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                documents.extend(split_into_chunks(&raw, chunking));
            }
            _ => {
                tracing::debug!("Skipping unsupported file {}", file.display());
            }
        }
    }

    Ok(documents)
}

/// Split text into overlapping chunks, preferring sentence boundaries.
pub fn split_into_chunks(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let total_chars = chars.len();
    let chunk_size = config.chunk_size.max(1);

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total_chars {
        let end = (start + chunk_size).min(total_chars);
        let chunk_text: String = chars[start..end].iter().collect();

        let final_text = if end < total_chars {
            cut_at_sentence_boundary(&chunk_text)
        } else {
            chunk_text
        };

        let kept_chars = final_text.chars().count();
        let trimmed = final_text.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end == total_chars {
            break;
        }
        // The next chunk resumes from the cut, not the window end.
        start = (start + kept_chars)
            .saturating_sub(config.chunk_overlap)
            .max(start + 1);
    }

    chunks
}

/// Cuts after the last sentence ending found in the final 20% of the chunk.
fn cut_at_sentence_boundary(text: &str) -> String {
    const SENTENCE_ENDINGS: [&str; 6] = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

    let mut search_start = (text.len() * 80) / 100;
    while !text.is_char_boundary(search_start) {
        search_start += 1;
    }
    let tail = &text[search_start..];

    SENTENCE_ENDINGS
        .iter()
        .filter_map(|ending| tail.rfind(ending).map(|pos| search_start + pos + ending.len()))
        .max()
        .map(|cut| text[..cut].to_string())
        .unwrap_or_else(|| text.to_string())
}

/// Writes documents with their embeddings; fills in missing ones later.
pub struct Ingestor {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    /// Embed and insert one document. An embedding failure still stores the
    /// document, leaving the vector for `backfill_embeddings`.
    pub async fn add_document(&self, content: &str) -> Result<(i64, bool), RagError> {
        let embedding = match self.embedder.encode(content).await {
            Ok(vector) => Some(vector),
            Err(err) => {
                tracing::warn!("Embedding failed, storing document without vector: {}", err);
                None
            }
        };
        let embedded = embedding.is_some();
        let id = self.store.add(content, embedding).await?;
        Ok((id, embedded))
    }

    pub async fn ingest(&self, documents: &[String]) -> Result<IngestReport, RagError> {
        let mut report = IngestReport::default();
        for content in documents {
            let (_, embedded) = self.add_document(content).await?;
            report.inserted += 1;
            if embedded {
                report.embedded += 1;
            } else {
                report.pending += 1;
            }
        }

        tracing::info!(
            inserted = report.inserted,
            embedded = report.embedded,
            pending = report.pending,
            "ingestion finished"
        );
        Ok(report)
    }

    /// Computes embeddings for every stored document that lacks one.
    pub async fn backfill_embeddings(&self) -> Result<IngestReport, RagError> {
        let pending = self.store.pending_embeddings().await?;
        let mut report = IngestReport::default();

        for doc in pending {
            match self.embedder.encode(&doc.content).await {
                Ok(vector) => {
                    if self.store.set_embedding(doc.id, &vector).await? {
                        report.embedded += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!("Backfill failed for document {}: {}", doc.id, err);
                    report.pending += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingError, HashingEmbedder};
    use crate::storage::{test_pool, SqliteDocumentStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Fails until switched on.
    struct FlakyEmbedder {
        online: AtomicBool,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyEmbedder {
        fn name(&self) -> &str {
            "flaky"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn encode(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if self.online.load(Ordering::SeqCst) {
                Ok(vec![1.0, 0.0])
            } else {
                Err(EmbeddingError::Request("offline".to_string()))
            }
        }
    }

    #[test]
    fn chunk_splitting_respects_size() {
        let config = ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 20,
        };
        let text = "This is a test. ".repeat(20);
        let chunks = split_into_chunks(&text, &config);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
        assert!(chunks[0].ends_with('.'));
    }

    #[test]
    fn sentence_cuts_do_not_drop_text() {
        let config = ChunkingConfig::default();
        let sentence = format!("{}end. ", "filler ".repeat(59));
        let tail: Vec<String> = (0..30).map(|i| format!("word{i:02}")).collect();
        let text = format!("{}{}", sentence, tail.join(" "));

        let chunks = split_into_chunks(&text, &config);
        assert!(chunks.len() > 1);
        for word in text.split_whitespace() {
            assert!(
                chunks
                    .iter()
                    .any(|chunk| chunk.split_whitespace().any(|w| w == word)),
                "{word} missing from every chunk"
            );
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split_into_chunks("One sentence only.", &ChunkingConfig::default());
        assert_eq!(chunks, vec!["One sentence only."]);
        assert!(split_into_chunks("", &ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn sentence_cut_handles_multibyte_text() {
        let text = "ééééééééé. ééééé";
        let cut = cut_at_sentence_boundary(text);
        assert!(text.starts_with(&cut));
    }

    #[test]
    fn load_corpus_reads_json_and_text_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"[{"content": "Rule 1. The field is 120 yards."}, {"content": "  "}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("b.txt"), "A short text file.").unwrap();
        std::fs::write(dir.path().join("c.csv"), "ignored").unwrap();

        let docs = load_corpus(dir.path(), &ChunkingConfig::default()).unwrap();
        assert_eq!(
            docs,
            vec!["Rule 1. The field is 120 yards.", "A short text file."]
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.json");
        std::fs::write(&file, "{not json").unwrap();
        assert!(load_corpus(&file, &ChunkingConfig::default()).is_err());
    }

    #[tokio::test]
    async fn ingest_embeds_every_document() {
        let store = Arc::new(SqliteDocumentStore::new(test_pool().await));
        let ingestor = Ingestor::new(store.clone(), Arc::new(HashingEmbedder::new(32)));

        let report = ingestor
            .ingest(&["first doc".to_string(), "second doc".to_string()])
            .await
            .unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.embedded, 2);
        assert!(store.pending_embeddings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_embeddings_are_backfilled_later() {
        let store = Arc::new(SqliteDocumentStore::new(test_pool().await));
        let embedder = Arc::new(FlakyEmbedder {
            online: AtomicBool::new(false),
        });
        let ingestor = Ingestor::new(store.clone(), embedder.clone());

        let report = ingestor.ingest(&["needs a vector".to_string()]).await.unwrap();
        assert_eq!(report.pending, 1);
        assert_eq!(store.pending_embeddings().await.unwrap().len(), 1);

        embedder.online.store(true, Ordering::SeqCst);
        let backfill = ingestor.backfill_embeddings().await.unwrap();
        assert_eq!(backfill.embedded, 1);
        assert!(store.pending_embeddings().await.unwrap().is_empty());
    }
}
