//! Embedding Module
//!
//! Text embedding behind the [`Embedder`] trait. The default engine uses
//! FastEmbed (ONNX-based, local inference) with a sentence-transformers model,
//! the same family the retriever, summarizer and concept linker were tuned on.

use anyhow::{Context, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default embedding model
const DEFAULT_MODEL: EmbeddingModel = EmbeddingModel::AllMiniLML6V2;

/// Embedding dimension for AllMiniLML6V2
pub const EMBEDDING_DIMENSION: usize = 384;

/// Default number of cached vectors
pub const DEFAULT_CACHE_SIZE: usize = 1000;

/// Anything that turns text into fixed-dimension vectors.
///
/// Implementations must be deterministic for a given model and input.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Map a sentence-transformers style model name to a FastEmbed model.
pub fn resolve_model(name: &str) -> Result<EmbeddingModel> {
    let normalized = name
        .trim()
        .trim_start_matches("sentence-transformers/")
        .trim_start_matches("BAAI/")
        .to_lowercase();

    match normalized.as_str() {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "paraphrase-multilingual-minilm-l12-v2" => Ok(EmbeddingModel::ParaphraseMLMiniLML12V2),
        other => anyhow::bail!("Unsupported embedding model: {}", other),
    }
}

/// Embedding engine for generating text embeddings
pub struct EmbeddingEngine {
    model: Arc<RwLock<TextEmbedding>>,
    cache: Arc<RwLock<LruCache<String, Vec<f32>>>>,
    model_name: String,
}

impl EmbeddingEngine {
    /// Create a new embedding engine with default model
    pub async fn new() -> Result<Self> {
        Self::with_model(DEFAULT_MODEL, DEFAULT_CACHE_SIZE).await
    }

    /// Create an engine from a configured model name
    pub async fn from_name(name: &str, cache_size: usize) -> Result<Self> {
        Self::with_model(resolve_model(name)?, cache_size).await
    }

    /// Create a new embedding engine with specific model
    pub async fn with_model(embedding_model: EmbeddingModel, cache_size: usize) -> Result<Self> {
        let model_name = format!("{:?}", embedding_model);

        let init_options = InitOptions::new(embedding_model).with_show_download_progress(false);

        let model = tokio::task::spawn_blocking(move || TextEmbedding::try_new(init_options))
            .await
            .context("Failed to spawn blocking task")?
            .context("Failed to initialize embedding model")?;

        let cache_size = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        let cache = LruCache::new(cache_size);

        tracing::debug!("Embedding engine ready: {}", model_name);

        Ok(Self {
            model: Arc::new(RwLock::new(model)),
            cache: Arc::new(RwLock::new(cache)),
            model_name,
        })
    }

    async fn run_model(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = self.model.clone();

        tokio::task::spawn_blocking(move || {
            let model_guard = futures::executor::block_on(model.read());
            model_guard.embed(texts, None)
        })
        .await
        .context("Failed to spawn blocking task")?
        .context("Failed to generate embeddings")
    }

    /// Get model name
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Get cache statistics
    pub async fn cache_stats(&self) -> (usize, usize) {
        let cache = self.cache.read().await;
        (cache.len(), cache.cap().get())
    }
}

#[async_trait]
impl Embedder for EmbeddingEngine {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        {
            let mut cache = self.cache.write().await;
            if let Some(cached) = cache.get(text) {
                return Ok(cached.clone());
            }
        }

        let embedding = self
            .run_model(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .context("No embedding generated")?;

        {
            let mut cache = self.cache.write().await;
            cache.put(text.to_string(), embedding.clone());
        }

        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut to_embed = Vec::new();
        let mut to_embed_indices = Vec::new();

        {
            let mut cache = self.cache.write().await;
            for (i, text) in texts.iter().enumerate() {
                if let Some(cached) = cache.get(text) {
                    results.push(Some(cached.clone()));
                } else {
                    to_embed.push(text.clone());
                    to_embed_indices.push(i);
                    results.push(None);
                }
            }
        }

        if !to_embed.is_empty() {
            let embeddings = self.run_model(to_embed.clone()).await?;
            if embeddings.len() != to_embed.len() {
                anyhow::bail!(
                    "Embedding model returned {} vectors for {} texts",
                    embeddings.len(),
                    to_embed.len()
                );
            }

            let mut cache = self.cache.write().await;
            for ((text, idx), embedding) in to_embed
                .into_iter()
                .zip(to_embed_indices)
                .zip(embeddings)
            {
                cache.put(text, embedding.clone());
                results[idx] = Some(embedding);
            }
        }

        results
            .into_iter()
            .map(|r| r.context("Missing embedding in batch"))
            .collect()
    }
}

/// Calculate cosine similarity between two embeddings.
/// Mismatched lengths and zero vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Calculate centroid (average) of multiple embeddings
pub fn calculate_centroid(embeddings: &[Vec<f32>]) -> Vec<f32> {
    if embeddings.is_empty() {
        return Vec::new();
    }

    let dim = embeddings[0].len();
    let mut centroid = vec![0.0; dim];

    for emb in embeddings {
        for (i, val) in emb.iter().enumerate().take(dim) {
            centroid[i] += val;
        }
    }

    let n = embeddings.len() as f32;
    for val in centroid.iter_mut() {
        *val /= n;
    }

    centroid
}
