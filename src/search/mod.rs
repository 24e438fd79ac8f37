//! Chunked semantic retrieval over the loaded document

pub mod chunker;
pub mod retriever;

pub use chunker::chunk_fixed;
pub use retriever::{DocumentRetriever, RetrievalHit, RetrieverError};

/// Characters per retrieval chunk
pub const DEFAULT_CHUNK_SIZE: usize = 400;

/// Chunks returned per question
pub const DEFAULT_TOP_K: usize = 5;
