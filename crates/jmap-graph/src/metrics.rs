//! Aggregate shape metrics over a directed graph: degree distributions,
//! sources/sinks, branch/merge nodes, acyclicity, and weak connectedness.
//! Grounded directly on the reference engine's `compute_graph_metrics`.

use indexmap::{IndexMap, IndexSet};

use crate::adjacency::{build_adjacency, vertices, Adjacency};
use crate::connectivity::is_weakly_connected;
use crate::scc::{count_cycles, find_cycle_path};

#[derive(Debug, Clone, PartialEq)]
pub struct GraphMetrics {
    pub directed: bool,
    pub vertex_count: usize,
    pub edge_count: usize,
    pub in_degree: IndexMap<String, usize>,
    pub out_degree: IndexMap<String, usize>,
    pub sources: IndexSet<String>,
    pub sinks: IndexSet<String>,
    pub branch_nodes: IndexSet<String>,
    pub merge_nodes: IndexSet<String>,
    pub is_acyclic: bool,
    pub cycle_path: Option<Vec<String>>,
    pub cycle_count: usize,
    pub weakly_connected: bool,
}

impl GraphMetrics {
    /// Build the full metrics report from a raw edge list (deduplicated
    /// and vertex-completed internally via [`build_adjacency`]).
    pub fn compute<I, S, T>(raw: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: IntoIterator<Item = S>,
    {
        let adjacency = build_adjacency(raw);
        Self::from_adjacency(&adjacency)
    }

    pub fn from_adjacency(adjacency: &Adjacency) -> Self {
        let verts = vertices(adjacency);
        let mut in_degree: IndexMap<String, usize> = verts.iter().map(|v| (v.clone(), 0)).collect();
        let mut out_degree: IndexMap<String, usize> = IndexMap::new();

        for v in &verts {
            let count = adjacency.get(v).map(Vec::len).unwrap_or(0);
            out_degree.insert(v.clone(), count);
        }
        for targets in adjacency.values() {
            for target in targets {
                *in_degree.entry(target.clone()).or_insert(0) += 1;
            }
        }

        let sources: IndexSet<String> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(k, _)| k.clone())
            .collect();
        let sinks: IndexSet<String> = out_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(k, _)| k.clone())
            .collect();
        let branch_nodes: IndexSet<String> = out_degree
            .iter()
            .filter(|(_, deg)| **deg > 1)
            .map(|(k, _)| k.clone())
            .collect();
        let merge_nodes: IndexSet<String> = in_degree
            .iter()
            .filter(|(_, deg)| **deg > 1)
            .map(|(k, _)| k.clone())
            .collect();

        let edge_count: usize = out_degree.values().sum();
        let cycle_path = find_cycle_path(adjacency);
        let is_acyclic = cycle_path.is_none();
        let cycle_count = count_cycles(adjacency);
        let weakly_connected = is_weakly_connected(adjacency);

        Self {
            directed: true,
            vertex_count: verts.len(),
            edge_count,
            in_degree,
            out_degree,
            sources,
            sinks,
            branch_nodes,
            merge_nodes,
            is_acyclic,
            cycle_path,
            cycle_count,
            weakly_connected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_graph_has_one_source_one_sink_no_branches() {
        let metrics = GraphMetrics::compute([("a", vec!["b"]), ("b", vec!["c"])]);
        assert_eq!(metrics.sources, IndexSet::from(["a".to_string()]));
        assert_eq!(metrics.sinks, IndexSet::from(["c".to_string()]));
        assert!(metrics.branch_nodes.is_empty());
        assert!(metrics.is_acyclic);
        assert!(metrics.weakly_connected);
        assert_eq!(metrics.edge_count, 2);
    }

    #[test]
    fn branching_node_is_flagged_and_merge_node_too() {
        let metrics = GraphMetrics::compute([("a", vec!["b", "c"]), ("b", vec!["d"]), ("c", vec!["d"])]);
        assert_eq!(metrics.branch_nodes, IndexSet::from(["a".to_string()]));
        assert_eq!(metrics.merge_nodes, IndexSet::from(["d".to_string()]));
    }

    #[test]
    fn cyclic_graph_reports_cycle_count_and_path() {
        let metrics = GraphMetrics::compute([("a", vec!["b"]), ("b", vec!["a"])]);
        assert!(!metrics.is_acyclic);
        assert_eq!(metrics.cycle_count, 1);
        assert!(metrics.cycle_path.is_some());
    }

    #[test]
    fn empty_graph_is_vacuously_weakly_connected() {
        let metrics = GraphMetrics::compute(std::iter::empty::<(&str, Vec<&str>)>());
        assert!(metrics.weakly_connected);
        assert_eq!(metrics.vertex_count, 0);
    }
}
