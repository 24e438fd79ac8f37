//! Docsage - Document Q&A Assistant
//!
//! Loads a single document and answers questions about it, summarizes it at
//! a chosen length, extracts keywords and groups them into concept clusters.
//!
//! # Architecture
//!
//! - **Retriever**: fixed-size character chunks ranked by embedding similarity
//! - **QA**: retrieved chunks handed to a generation model with a grounded prompt
//! - **Summarizer**: centroid-ranked sentences, paraphrased and deduplicated
//! - **Keywords**: statistical scoring with case-insensitive dedup
//! - **Concepts**: keyword similarity graph, connected components as clusters
//!
//! # Main Modules
//!
//! - [`session`] - Wires the units together around one loaded document
//! - [`search`] - Chunking and semantic retrieval
//! - [`summary`] - Extractive-then-abstractive summarization
//! - [`keywords`] - Keyword extraction and the built-in scorer
//! - [`concepts`] - Concept clusters and their graph
//! - [`loader`] - Text extraction from PDF, DOCX, PPTX and TXT
//!
//! # Example
//!
//! ```rust,no_run
//! use docsage::config::AppConfig;
//! use docsage::embedding::EmbeddingEngine;
//! use docsage::keywords::YakeScorer;
//! use docsage::loader::FileExtractor;
//! use docsage::provider::create_provider;
//! use docsage::session::{DocumentSession, SessionComponents};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AppConfig::default();
//! let components = SessionComponents {
//!     embedder: Arc::new(EmbeddingEngine::new().await?),
//!     answer_provider: Arc::from(create_provider(config.answer_model.clone())?),
//!     paraphrase_provider: Arc::from(create_provider(config.paraphrase_model.clone())?),
//!     extractor: Arc::new(FileExtractor::new()),
//!     scorer: Box::new(YakeScorer::new()),
//! };
//!
//! let mut session = DocumentSession::new(components, &config);
//! session.load(Path::new("paper.pdf")).await?;
//! let answer = session.ask("What problem does the paper solve?").await?;
//! # Ok(())
//! # }
//! ```

pub mod concepts;
pub mod config;
pub mod embedding;
pub mod keywords;
pub mod loader;
pub mod logging;
pub mod provider;
pub mod qa;
pub mod search;
pub mod session;
pub mod summary;

#[cfg(test)]
mod test_support;

pub use concepts::{ConceptCluster, ConceptGraph, ConceptLinker};
pub use embedding::{Embedder, EmbeddingEngine};
pub use keywords::{KeywordExtractor, YakeScorer};
pub use loader::{FileExtractor, TextExtractor};
pub use qa::QaModule;
pub use search::DocumentRetriever;
pub use session::{DocumentSession, SessionComponents};
pub use summary::{SummaryLevel, SummaryModule};
