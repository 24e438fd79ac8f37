use crate::embedding::{cosine_similarity, Embedder};
use crate::search::chunker::chunk_fixed;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrieverError {
    #[error("Index not ready: call index() before retrieve()")]
    IndexNotReady,

    #[error("Chunk size must be greater than 0")]
    InvalidChunkSize,

    #[error("Embedding error: {0}")]
    EmbeddingError(#[from] anyhow::Error),
}

/// A chunk returned for a query
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHit {
    pub text: String,
    pub score: f32,
    /// Position of the chunk in the indexed document
    pub position: usize,
}

struct ChunkIndex {
    chunks: Vec<String>,
    embeddings: Vec<Vec<f32>>,
}

/// Semantic retriever over fixed-size chunks of a single document.
/// Linear scan with a bounded heap, which is plenty for one document.
pub struct DocumentRetriever {
    embedder: Arc<dyn Embedder>,
    index: Option<ChunkIndex>,
}

impl DocumentRetriever {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            index: None,
        }
    }

    /// Chunk and embed `text`, replacing any previous index.
    /// Returns the number of chunks.
    pub async fn index(&mut self, text: &str, chunk_size: usize) -> Result<usize, RetrieverError> {
        if chunk_size == 0 {
            return Err(RetrieverError::InvalidChunkSize);
        }

        // Drop the old index first so a failed re-index never serves stale chunks
        self.index = None;

        let chunks = chunk_fixed(text, chunk_size);
        let embeddings = self.embedder.embed_batch(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(RetrieverError::EmbeddingError(anyhow::anyhow!(
                "expected {} chunk embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        tracing::debug!("Indexed {} chunks (chunk_size={})", chunks.len(), chunk_size);

        let count = chunks.len();
        self.index = Some(ChunkIndex { chunks, embeddings });
        Ok(count)
    }

    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }

    /// Indexed chunks in document order
    pub fn chunks(&self) -> &[String] {
        self.index.as_ref().map(|i| i.chunks.as_slice()).unwrap_or(&[])
    }

    /// Top-k chunks by cosine similarity to `query`, best first.
    /// Equal scores keep document order.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalHit>, RetrieverError> {
        let index = self.index.as_ref().ok_or(RetrieverError::IndexNotReady)?;

        if top_k == 0 || index.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let q_emb = self.embedder.embed_text(query).await?;

        // Min-heap of the best k; on equal scores the later chunk is evicted first
        let mut heap: BinaryHeap<Reverse<(OrderedFloat<f32>, Reverse<usize>)>> = BinaryHeap::new();
        for (idx, emb) in index.embeddings.iter().enumerate() {
            let sim = cosine_similarity(&q_emb, emb);
            heap.push(Reverse((OrderedFloat(sim), Reverse(idx))));
            if heap.len() > top_k {
                heap.pop();
            }
        }

        let mut scored: Vec<(OrderedFloat<f32>, usize)> = heap
            .into_iter()
            .map(|Reverse((score, Reverse(idx)))| (score, idx))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        Ok(scored
            .into_iter()
            .map(|(score, idx)| RetrievalHit {
                text: index.chunks[idx].clone(),
                score: score.into_inner(),
                position: idx,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{BrokenEmbedder, TableEmbedder};

    fn retriever() -> DocumentRetriever {
        DocumentRetriever::new(Arc::new(TableEmbedder::new()))
    }

    #[tokio::test]
    async fn test_retrieve_before_index_fails() {
        let r = retriever();
        assert!(matches!(
            r.retrieve("anything", 5).await,
            Err(RetrieverError::IndexNotReady)
        ));
    }

    #[tokio::test]
    async fn test_empty_text_gives_empty_index() {
        let mut r = retriever();
        assert_eq!(r.index("", 400).await.unwrap(), 0);
        assert!(r.is_ready());
        assert!(r.retrieve("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_chunk_size_rejected() {
        let mut r = retriever();
        assert!(matches!(
            r.index("text", 0).await,
            Err(RetrieverError::InvalidChunkSize)
        ));
    }

    #[tokio::test]
    async fn test_retrieve_ranks_matching_chunk_first() {
        let mut r = retriever();
        let text = format!(
            "{:<20}{:<20}{:<20}",
            "cats purr softly", "rust borrow checker", "ocean tides rise"
        );
        assert_eq!(r.index(&text, 20).await.unwrap(), 3);

        let hits = r.retrieve("borrow checker", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].position, 1);
        assert!(hits[0].text.starts_with("rust borrow checker"));
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_results_bounded_sorted_and_from_index() {
        let mut r = retriever();
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa ".repeat(20);
        r.index(&text, 37).await.unwrap();

        let hits = r.retrieve("gamma delta", 4).await.unwrap();
        assert!(hits.len() <= 4);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for hit in &hits {
            assert_eq!(r.chunks()[hit.position], hit.text);
        }
    }

    #[tokio::test]
    async fn test_ties_keep_document_order() {
        let embedder = TableEmbedder::new()
            .with("aaaa", vec![1.0, 0.0])
            .with("bbbb", vec![1.0, 0.0])
            .with("cccc", vec![1.0, 0.0])
            .with("q", vec![1.0, 0.0]);
        let mut r = DocumentRetriever::new(Arc::new(embedder));
        r.index("aaaabbbbcccc", 4).await.unwrap();

        let hits = r.retrieve("q", 2).await.unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_reindex_replaces_previous_document() {
        let mut r = retriever();
        r.index("first document text", 5).await.unwrap();
        r.index("second", 400).await.unwrap();
        assert_eq!(r.chunks(), &["second".to_string()]);
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_index_unready() {
        let mut r = DocumentRetriever::new(Arc::new(BrokenEmbedder));
        assert!(matches!(
            r.index("some text", 4).await,
            Err(RetrieverError::EmbeddingError(_))
        ));
        assert!(!r.is_ready());
    }
}
