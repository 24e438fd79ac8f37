//! Extractive-then-abstractive document summarizer
//!
//! Pipeline per call: clean → filter sentences → pick a sentence budget →
//! rank by centrality (mean-embedding cosine) → paraphrase → merge into
//! paragraphs → sentence-level dedup. Nothing is kept between calls.

pub mod paraphrase;
pub mod text;

use crate::embedding::{calculate_centroid, cosine_similarity, Embedder};
use anyhow::Result;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use paraphrase::{ParaphraseError, Paraphraser};
pub use text::{
    clean_summary_text, deduplicate_summary, filter_sentences, merge_into_paragraphs,
    split_sentences,
};

/// Returned when cleaning leaves nothing
pub const NO_TEXT_MESSAGE: &str = "No text provided for summarization.";
/// Returned when no sentence survives filtering
pub const NOT_AVAILABLE_MESSAGE: &str = "Summary not available.";
/// Word count after which a paragraph is closed
pub const PARAGRAPH_WORD_LIMIT: usize = 80;

/// Requested summary length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLevel {
    Short,
    #[default]
    Medium,
    Detailed,
}

impl SummaryLevel {
    /// Parse a UI label. Anything other than short/medium is treated as detailed.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "short" => Self::Short,
            "medium" => Self::Medium,
            _ => Self::Detailed,
        }
    }

    /// Number of source sentences kept before paraphrasing
    pub fn sentence_budget(self) -> usize {
        match self {
            Self::Short => 4,
            Self::Medium => 8,
            Self::Detailed => 14,
        }
    }
}

impl std::fmt::Display for SummaryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Short => write!(f, "short"),
            Self::Medium => write!(f, "medium"),
            Self::Detailed => write!(f, "detailed"),
        }
    }
}

pub struct SummaryModule {
    embedder: Arc<dyn Embedder>,
    paraphraser: Paraphraser,
}

impl SummaryModule {
    pub fn new(embedder: Arc<dyn Embedder>, paraphraser: Paraphraser) -> Self {
        Self {
            embedder,
            paraphraser,
        }
    }

    /// Pick the `budget` sentences closest to the document centroid and
    /// return them in their original order. Inputs that already fit the
    /// budget come back untouched.
    pub async fn rank_sentences(&self, sentences: &[String], budget: usize) -> Result<Vec<String>> {
        if sentences.len() <= budget {
            return Ok(sentences.to_vec());
        }

        let embeddings = self.embedder.embed_batch(sentences).await?;
        let centroid = calculate_centroid(&embeddings);

        let mut scored: Vec<(usize, OrderedFloat<f32>)> = embeddings
            .iter()
            .enumerate()
            .map(|(i, emb)| (i, OrderedFloat(cosine_similarity(&centroid, emb))))
            .collect();
        // Stable sort: equal scores keep document order
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let mut selected: Vec<usize> = scored.into_iter().take(budget).map(|(i, _)| i).collect();
        selected.sort_unstable();

        Ok(selected.into_iter().map(|i| sentences[i].clone()).collect())
    }

    /// Summarize `text` at the requested level.
    ///
    /// Only embedding failures are returned as errors; paraphrase failures
    /// fall back to the source sentence.
    pub async fn generate_summary(&self, text: &str, level: SummaryLevel) -> Result<String> {
        let cleaned = clean_summary_text(text);
        if cleaned.is_empty() {
            return Ok(NO_TEXT_MESSAGE.to_string());
        }

        let sentences = filter_sentences(&cleaned);
        if sentences.is_empty() {
            return Ok(NOT_AVAILABLE_MESSAGE.to_string());
        }

        let budget = level.sentence_budget();
        let ranked = self.rank_sentences(&sentences, budget).await?;
        tracing::debug!(
            "Summary ({}): {} candidate sentences, {} selected",
            level,
            sentences.len(),
            ranked.len()
        );

        let mut paraphrased = Vec::with_capacity(ranked.len());
        for sentence in &ranked {
            paraphrased.push(self.paraphraser.paraphrase_or_original(sentence).await);
        }

        let merged = merge_into_paragraphs(&paraphrased, PARAGRAPH_WORD_LIMIT);
        Ok(deduplicate_summary(&merged).trim().to_string())
    }
}
