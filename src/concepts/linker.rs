use super::{ConceptError, DEFAULT_THRESHOLD, NO_CLUSTERS_MESSAGE};
use crate::embedding::{cosine_similarity, Embedder};
use lazy_static::lazy_static;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{NodeIndex, UnGraph};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

lazy_static! {
    static ref NON_WORD_RE: Regex = Regex::new(r"^\W+$").expect("valid regex");
    static ref TRIVIAL_KEYWORDS: HashSet<&'static str> = [
        "use", "using", "used", "like", "make", "work", "works", "based", "data",
    ]
    .into_iter()
    .collect();
}

const MIN_KEYWORD_CHARS: usize = 3;

/// Lowercase, trim and drop trivial keywords. Output is sorted and unique.
pub fn clean_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| {
            k.chars().count() >= MIN_KEYWORD_CHARS
                && !TRIVIAL_KEYWORDS.contains(k.as_str())
                && !NON_WORD_RE.is_match(k)
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Keywords that are transitively similar to each other
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptCluster {
    pub members: Vec<String>,
}

impl ConceptCluster {
    pub fn new(members: Vec<String>) -> Self {
        Self { members }
    }

    pub fn label(&self) -> String {
        cluster_label(&self.members)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Name for a group of keywords.
///
/// The first member mentioning "learning" or "language" decides; otherwise the
/// first member, capitalized, followed by "Group".
pub fn cluster_label(members: &[String]) -> String {
    for member in members {
        if member.contains("learning") {
            return "Learning Concepts".to_string();
        }
        if member.contains("language") {
            return "Language Concepts".to_string();
        }
    }

    match members.first() {
        Some(first) => format!("{} Group", capitalize(first)),
        None => "Group".to_string(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

/// Human-readable listing, one `**label** → members` line per cluster
pub fn describe_clusters(clusters: &[ConceptCluster]) -> String {
    if clusters.is_empty() {
        return NO_CLUSTERS_MESSAGE.to_string();
    }

    clusters
        .iter()
        .map(|cluster| {
            let members: BTreeSet<&str> = cluster.members.iter().map(String::as_str).collect();
            format!(
                "**{}** → {}",
                cluster.label(),
                members.into_iter().collect::<Vec<_>>().join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub struct ConceptLinker {
    embedder: Arc<dyn Embedder>,
    threshold: f32,
}

impl ConceptLinker {
    pub fn new(embedder: Arc<dyn Embedder>, threshold: f32) -> Self {
        Self { embedder, threshold }
    }

    pub fn with_default_threshold(embedder: Arc<dyn Embedder>) -> Self {
        Self::new(embedder, DEFAULT_THRESHOLD)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Group keywords into connected components of the similarity graph.
    ///
    /// Fewer than two keywords surviving cleanup yields no clusters.
    pub async fn build_concept_clusters(
        &self,
        keywords: &[String],
    ) -> Result<Vec<ConceptCluster>, ConceptError> {
        let cleaned = clean_keywords(keywords);
        if cleaned.len() < 2 {
            return Ok(Vec::new());
        }

        let embeddings = self.embedder.embed_batch(&cleaned).await?;
        if embeddings.len() != cleaned.len() {
            return Err(ConceptError::EmbeddingMismatch {
                expected: cleaned.len(),
                got: embeddings.len(),
            });
        }

        let mut graph: UnGraph<usize, f32> = UnGraph::new_undirected();
        let nodes: Vec<NodeIndex> = (0..cleaned.len()).map(|i| graph.add_node(i)).collect();

        for i in 0..cleaned.len() {
            for j in (i + 1)..cleaned.len() {
                let similarity = cosine_similarity(&embeddings[i], &embeddings[j]);
                if similarity >= self.threshold {
                    graph.add_edge(nodes[i], nodes[j], similarity);
                }
            }
        }

        // On an undirected graph every strongly connected component is a
        // connected component
        let mut components: Vec<Vec<usize>> = tarjan_scc(&graph)
            .into_iter()
            .map(|component| {
                let mut members: Vec<usize> = component.into_iter().map(|n| graph[n]).collect();
                members.sort_unstable();
                members
            })
            .collect();
        components.sort_by_key(|members| members.first().copied());

        tracing::debug!(
            "Concept graph: {} keywords, {} edges, {} clusters",
            cleaned.len(),
            graph.edge_count(),
            components.len()
        );

        Ok(components
            .into_iter()
            .map(|members| ConceptCluster::new(members.into_iter().map(|i| cleaned[i].clone()).collect()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{BrokenEmbedder, TableEmbedder};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_clean_keywords() {
        let cleaned = clean_keywords(&strings(&[
            "  Rust ", "rust", "AI", "using", "Data", "---", "Borrow Checker", "ok",
        ]));
        assert_eq!(cleaned, strings(&["borrow checker", "rust"]));
    }

    #[test]
    fn test_cluster_label() {
        assert_eq!(cluster_label(&strings(&["deep learning", "neural network"])), "Learning Concepts");
        assert_eq!(cluster_label(&strings(&["grammar", "language model"])), "Language Concepts");
        assert_eq!(cluster_label(&strings(&["weather forecast"])), "Weather forecast Group");
        // First qualifying member wins
        assert_eq!(
            cluster_label(&strings(&["language learning", "other"])),
            "Learning Concepts"
        );
    }

    #[test]
    fn test_describe_clusters() {
        assert_eq!(describe_clusters(&[]), NO_CLUSTERS_MESSAGE);

        let clusters = vec![
            ConceptCluster::new(strings(&["neural network", "deep learning"])),
            ConceptCluster::new(strings(&["weather forecast"])),
        ];
        assert_eq!(
            describe_clusters(&clusters),
            "**Learning Concepts** → deep learning, neural network\n\n\
             **Weather forecast Group** → weather forecast"
        );
    }

    #[tokio::test]
    async fn test_fewer_than_two_keywords() {
        let linker = ConceptLinker::with_default_threshold(Arc::new(BrokenEmbedder));
        let clusters = linker
            .build_concept_clusters(&strings(&["rust", "RUST", "use"]))
            .await
            .unwrap();
        assert!(clusters.is_empty());
    }

    #[tokio::test]
    async fn test_no_edges_gives_singletons() {
        let embedder = TableEmbedder::new()
            .with("alpha", vec![1.0, 0.0, 0.0])
            .with("beta", vec![0.0, 1.0, 0.0])
            .with("gamma", vec![0.0, 0.0, 1.0]);
        let linker = ConceptLinker::with_default_threshold(Arc::new(embedder));

        let clusters = linker
            .build_concept_clusters(&strings(&["gamma", "alpha", "beta"]))
            .await
            .unwrap();
        assert_eq!(
            clusters,
            vec![
                ConceptCluster::new(strings(&["alpha"])),
                ConceptCluster::new(strings(&["beta"])),
                ConceptCluster::new(strings(&["gamma"])),
            ]
        );
    }

    #[tokio::test]
    async fn test_all_edges_gives_one_cluster() {
        let embedder = TableEmbedder::new()
            .with("alpha", vec![1.0, 0.1])
            .with("beta", vec![1.0, 0.0])
            .with("gamma", vec![0.9, 0.1]);
        let linker = ConceptLinker::with_default_threshold(Arc::new(embedder));

        let clusters = linker
            .build_concept_clusters(&strings(&["alpha", "beta", "gamma"]))
            .await
            .unwrap();
        assert_eq!(clusters, vec![ConceptCluster::new(strings(&["alpha", "beta", "gamma"]))]);
    }

    #[tokio::test]
    async fn test_transitive_chain_joins() {
        // a~b and b~c but a and c are orthogonal
        let embedder = TableEmbedder::new()
            .with("aaa", vec![1.0, 0.0])
            .with("bbb", vec![1.0, 1.0])
            .with("ccc", vec![0.0, 1.0]);
        let linker = ConceptLinker::new(Arc::new(embedder), 0.7);

        let clusters = linker
            .build_concept_clusters(&strings(&["aaa", "bbb", "ccc"]))
            .await
            .unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
    }

    #[tokio::test]
    async fn test_neural_network_scenario() {
        let embedder = TableEmbedder::new()
            .with("neural network", vec![1.0, 0.2, 0.0])
            .with("deep learning", vec![0.9, 0.3, 0.0])
            .with("weather forecast", vec![0.0, 0.1, 1.0]);
        let linker = ConceptLinker::with_default_threshold(Arc::new(embedder));

        let clusters = linker
            .build_concept_clusters(&strings(&["neural network", "deep learning", "weather forecast"]))
            .await
            .unwrap();
        assert_eq!(
            clusters,
            vec![
                ConceptCluster::new(strings(&["deep learning", "neural network"])),
                ConceptCluster::new(strings(&["weather forecast"])),
            ]
        );
        assert_eq!(clusters[0].label(), "Learning Concepts");
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let linker = ConceptLinker::with_default_threshold(Arc::new(BrokenEmbedder));
        let result = linker.build_concept_clusters(&strings(&["alpha", "beta"])).await;
        assert!(matches!(result, Err(ConceptError::Embedding(_))));
    }
}
