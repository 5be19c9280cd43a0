pub mod core;
pub mod embedding;
pub mod eval;
pub mod feedback;
pub mod llm;
pub mod pipeline;
pub mod rag;
pub mod server;
pub mod state;
pub mod storage;
pub mod vector_math;
