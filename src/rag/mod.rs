//! Retrieval-augmented generation building blocks.
//!
//! - `HybridRetriever`: keyword + vector search fused by reciprocal rank
//! - `PromptAssembler`: bounded context + grounding template
//! - `Ingestor`: corpus loading, chunking and embedding

mod fusion;
mod ingest;
mod prompt;
mod retriever;

pub use fusion::{reciprocal_rank_fusion, FusedScore};
pub use ingest::{load_corpus, split_into_chunks, ChunkingConfig, IngestReport, Ingestor};
pub use prompt::PromptAssembler;
pub use retriever::{HybridRetriever, RetrievalResult};
