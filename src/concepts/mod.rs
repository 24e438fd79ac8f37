//! Concept linking
//!
//! Keywords are cleaned, embedded and joined into an undirected similarity
//! graph; each connected component becomes a labeled concept cluster.

pub mod graph;
pub mod linker;

use thiserror::Error;

pub use graph::{ConceptEdge, ConceptGraph, ConceptNode, PALETTE};
pub use linker::{clean_keywords, cluster_label, describe_clusters, ConceptCluster, ConceptLinker};

/// Similarity threshold used when none is configured
pub const DEFAULT_THRESHOLD: f32 = 0.6;

/// Returned by [`describe_clusters`] for an empty result
pub const NO_CLUSTERS_MESSAGE: &str = "No concept clusters found.";

#[derive(Debug, Error)]
pub enum ConceptError {
    #[error("Keyword embedding failed: {0}")]
    Embedding(#[from] anyhow::Error),

    #[error("Embedder returned {got} vectors for {expected} keywords")]
    EmbeddingMismatch { expected: usize, got: usize },

    #[error("Graph serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
