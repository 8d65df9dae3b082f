//! Semantic clustering via connected components
//!
//! Connections at or above the similarity threshold are treated as
//! undirected edges; each connected component becomes one cluster. The
//! traversal is an explicit stack walk rather than recursion so deep
//! chains cannot exhaust the call stack. Cluster ids follow discovery
//! order over the input node list, which makes the output deterministic
//! for a fixed input ordering.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

use crate::value_objects::{ClusterId, Connection, GraphNode, NodeId};

/// Builds clusters from similarity-thresholded connectivity
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterBuilder;

impl ClusterBuilder {
    /// Partition nodes into connected components over connections with
    /// `strength >= similarity_threshold`.
    ///
    /// Every input node lands in exactly one cluster, including isolated
    /// nodes which become singletons. Connections referencing unknown node
    /// ids are silently skipped.
    pub fn build_clusters(
        nodes: &[GraphNode],
        connections: &[Connection],
        similarity_threshold: f64,
    ) -> IndexMap<ClusterId, Vec<NodeId>> {
        let mut clusters = IndexMap::new();
        if nodes.is_empty() {
            return clusters;
        }

        let known: HashSet<&NodeId> = nodes.iter().map(|n| &n.id).collect();

        // Adjacency over eligible edges, in input edge order.
        let mut adjacency: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
        for connection in connections {
            if connection.strength < similarity_threshold {
                continue;
            }
            if !known.contains(&connection.source) || !known.contains(&connection.target) {
                tracing::debug!(
                    source = %connection.source,
                    target = %connection.target,
                    "skipping connection with unknown endpoint"
                );
                continue;
            }
            adjacency
                .entry(&connection.source)
                .or_default()
                .push(&connection.target);
            adjacency
                .entry(&connection.target)
                .or_default()
                .push(&connection.source);
        }

        let mut visited: HashSet<&NodeId> = HashSet::new();
        let mut next_cluster = 0u32;

        for node in nodes {
            if visited.contains(&node.id) {
                continue;
            }

            let mut members = Vec::new();
            let mut stack = vec![&node.id];
            visited.insert(&node.id);

            while let Some(current) = stack.pop() {
                members.push(current.clone());

                if let Some(neighbors) = adjacency.get(current) {
                    for &neighbor in neighbors {
                        if visited.insert(neighbor) {
                            stack.push(neighbor);
                        }
                    }
                }
            }

            clusters.insert(ClusterId::new(next_cluster), members);
            next_cluster += 1;
        }

        tracing::debug!(
            nodes = nodes.len(),
            clusters = clusters.len(),
            threshold = similarity_threshold,
            "built semantic clusters"
        );

        clusters
    }
}
