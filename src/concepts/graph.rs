//! Renderer-neutral description of concept clusters.

use super::{ConceptCluster, ConceptError};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node colors, assigned by cluster index
pub const PALETTE: [&str; 6] = ["#90CAF9", "#A5D6A7", "#FFD54F", "#FFAB91", "#CE93D8", "#80CBC4"];
pub const EDGE_COLOR: &str = "#888888";
pub const NODE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptNode {
    /// The keyword itself
    pub id: String,
    /// Display text, title-cased
    pub label: String,
    /// Tooltip: the cluster label
    pub title: String,
    pub color: String,
    pub size: u32,
    pub cluster: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptEdge {
    pub from: String,
    pub to: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptGraph {
    pub nodes: Vec<ConceptNode>,
    pub edges: Vec<ConceptEdge>,
}

impl ConceptGraph {
    /// One node per keyword; members of a cluster are linked in a ring and
    /// clusters are never linked to each other.
    pub fn from_clusters(clusters: &[ConceptCluster]) -> Self {
        let mut graph = Self::default();

        for (index, cluster) in clusters.iter().enumerate() {
            let color = PALETTE[index % PALETTE.len()];
            let label = cluster.label();

            for member in &cluster.members {
                graph.nodes.push(ConceptNode {
                    id: member.clone(),
                    label: title_case(member),
                    title: label.clone(),
                    color: color.to_string(),
                    size: NODE_SIZE,
                    cluster: index,
                });
            }

            let n = cluster.members.len();
            for i in 0..n {
                graph.edges.push(ConceptEdge {
                    from: cluster.members[i].clone(),
                    to: cluster.members[(i + 1) % n].clone(),
                    color: EDGE_COLOR.to_string(),
                });
            }
        }

        graph
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn to_json(&self) -> Result<String, ConceptError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Graphviz rendering with node colors carried as attributes
    pub fn to_dot(&self) -> String {
        let mut graph: UnGraph<String, &str> = UnGraph::new_undirected();
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();

        for node in &self.nodes {
            let idx = graph.add_node(node.label.clone());
            index.insert(node.id.as_str(), idx);
        }
        for edge in &self.edges {
            if let (Some(&a), Some(&b)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str())) {
                graph.add_edge(a, b, "");
            }
        }

        let nodes = &self.nodes;
        let edge_attrs = |_, _| format!("color=\"{}\"", EDGE_COLOR);
        let node_attrs = |_, (idx, _): (NodeIndex, _)| {
            let node = &nodes[idx.index()];
            format!(
                "style=filled fillcolor=\"{}\" tooltip=\"{}\"",
                node.color,
                node.title.replace('"', "\\\"")
            )
        };
        let dot = Dot::with_attr_getters(
            &graph,
            &[Config::EdgeNoLabel],
            &edge_attrs,
            &node_attrs,
        );
        dot.to_string()
    }
}

/// Uppercase the first letter of every word, lowercase the rest
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
