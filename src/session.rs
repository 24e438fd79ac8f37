//! One loaded document and the actions a user can run against it.

use crate::concepts::{describe_clusters, ConceptCluster, ConceptError, ConceptGraph, ConceptLinker};
use crate::config::AppConfig;
use crate::embedding::Embedder;
use crate::keywords::{KeywordError, KeywordExtractor, KeywordScorer};
use crate::loader::{ExtractError, TextExtractor};
use crate::provider::{ModelProvider, ProviderError};
use crate::qa::{QaModule, DEFAULT_MAX_SENTENCES};
use crate::search::{DocumentRetriever, RetrieverError};
use crate::summary::{Paraphraser, SummaryLevel, SummaryModule};
use crate::{log_debug, log_info, log_warn};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No document loaded")]
    NoDocument,

    #[error("Couldn't extract any text from {0:?}")]
    EmptyDocument(PathBuf),

    #[error("Question is empty")]
    EmptyQuestion,

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Retriever(#[from] RetrieverError),

    #[error("Answer generation failed: {0}")]
    Answer(#[from] ProviderError),

    #[error(transparent)]
    Keywords(#[from] KeywordError),

    #[error(transparent)]
    Concepts(#[from] ConceptError),

    #[error("Summarization failed: {0}")]
    Summary(anyhow::Error),
}

/// External collaborators a session is built from
pub struct SessionComponents {
    pub embedder: Arc<dyn Embedder>,
    pub answer_provider: Arc<dyn ModelProvider>,
    pub paraphrase_provider: Arc<dyn ModelProvider>,
    pub extractor: Arc<dyn TextExtractor>,
    pub scorer: Box<dyn KeywordScorer>,
}

/// Text of the currently loaded document
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub id: Uuid,
    pub source: PathBuf,
    pub text: String,
    pub chunk_count: usize,
    pub loaded_at: DateTime<Utc>,
}

/// Clusters, their text description and the graph to render
#[derive(Debug, Clone)]
pub struct ConceptMap {
    pub clusters: Vec<ConceptCluster>,
    pub description: String,
    pub graph: ConceptGraph,
}

pub struct DocumentSession {
    extractor: Arc<dyn TextExtractor>,
    retriever: DocumentRetriever,
    qa: QaModule,
    summarizer: SummaryModule,
    keyword_extractor: KeywordExtractor,
    linker: ConceptLinker,
    chunk_size: usize,
    top_k: usize,
    document: Option<LoadedDocument>,
    keywords: Vec<String>,
}

impl DocumentSession {
    pub fn new(components: SessionComponents, config: &AppConfig) -> Self {
        let SessionComponents {
            embedder,
            answer_provider,
            paraphrase_provider,
            extractor,
            scorer,
        } = components;

        let keyword_extractor = KeywordExtractor::new(scorer, config.keywords.top_k).with_params(
            &config.keywords.language,
            config.keywords.ngram_max,
            config.keywords.dedup_limit,
        );

        Self {
            extractor,
            retriever: DocumentRetriever::new(embedder.clone()),
            qa: QaModule::new(answer_provider),
            summarizer: SummaryModule::new(embedder.clone(), Paraphraser::new(paraphrase_provider)),
            keyword_extractor,
            linker: ConceptLinker::new(embedder, config.concepts.threshold),
            chunk_size: config.retrieval.chunk_size,
            top_k: config.retrieval.top_k,
            document: None,
            keywords: Vec::new(),
        }
    }

    /// Extract and index a document, replacing whatever was loaded before.
    /// Returns the number of indexed chunks.
    pub async fn load(&mut self, path: &Path) -> Result<usize, SessionError> {
        // Nothing from the previous document survives a load attempt
        self.document = None;
        self.keywords.clear();

        let text = self.extractor.extract(path)?;
        if text.trim().is_empty() {
            log_warn!("No text extracted from {:?}", path);
            return Err(SessionError::EmptyDocument(path.to_path_buf()));
        }

        let chunk_count = self.retriever.index(&text, self.chunk_size).await?;
        let document = LoadedDocument {
            id: Uuid::new_v4(),
            source: path.to_path_buf(),
            text,
            chunk_count,
            loaded_at: Utc::now(),
        };
        log_info!(
            "Loaded document {} from {:?}: {} chars, {} chunks",
            document.id,
            path,
            document.text.len(),
            chunk_count
        );

        self.document = Some(document);
        Ok(chunk_count)
    }

    pub fn document(&self) -> Option<&LoadedDocument> {
        self.document.as_ref()
    }

    /// Keywords from the last [`extract_keywords`](Self::extract_keywords) call
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    fn text(&self) -> Result<&str, SessionError> {
        self.document
            .as_ref()
            .map(|d| d.text.as_str())
            .ok_or(SessionError::NoDocument)
    }

    pub async fn ask(&self, question: &str) -> Result<String, SessionError> {
        self.text()?;
        let question = question.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyQuestion);
        }

        let contexts = self.retriever.retrieve(question, self.top_k).await?;
        log_debug!("Retrieved {} contexts for question", contexts.len());

        Ok(self.qa.answer(question, &contexts, DEFAULT_MAX_SENTENCES).await?)
    }

    pub async fn summarize(&self, level: SummaryLevel) -> Result<String, SessionError> {
        let text = self.text()?;
        log_info!("Generating {} summary", level);
        self.summarizer
            .generate_summary(text, level)
            .await
            .map_err(SessionError::Summary)
    }

    /// Extract keywords and remember them for [`concept_map`](Self::concept_map)
    pub fn extract_keywords(&mut self) -> Result<Vec<String>, SessionError> {
        let keywords = self.keyword_extractor.extract_keywords(self.text()?)?;
        log_info!("Extracted {} keywords", keywords.len());
        self.keywords = keywords.clone();
        Ok(keywords)
    }

    /// Cluster the stored keyword list
    pub async fn concept_map(&self) -> Result<ConceptMap, SessionError> {
        self.text()?;
        let clusters = self.linker.build_concept_clusters(&self.keywords).await?;
        log_info!(
            "Built {} concept clusters from {} keywords",
            clusters.len(),
            self.keywords.len()
        );

        Ok(ConceptMap {
            description: describe_clusters(&clusters),
            graph: ConceptGraph::from_clusters(&clusters),
            clusters,
        })
    }
}
