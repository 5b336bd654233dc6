//! Normalized adjacency representation shared by every algorithm in this
//! crate: every vertex that appears anywhere (as a source or a target) gets
//! an entry, and duplicate edges out of one vertex are collapsed, in the
//! order they were first seen.

use indexmap::{IndexMap, IndexSet};

pub type Adjacency = IndexMap<String, Vec<String>>;

/// Build a normalized adjacency map from a raw edge list. Targets are
/// deduplicated per source while preserving first-seen order; every vertex
/// mentioned only as a target still gets an (empty, unless later added)
/// entry so downstream algorithms can iterate `vertices()` directly.
pub fn build_adjacency<I, S, T>(raw: I) -> Adjacency
where
    I: IntoIterator<Item = (S, T)>,
    S: Into<String>,
    T: IntoIterator<Item = S>,
{
    let mut adjacency: Adjacency = IndexMap::new();
    let mut pending_targets: Vec<(String, Vec<String>)> = Vec::new();

    for (source, targets) in raw {
        let source = source.into();
        let mut seen = IndexSet::new();
        let mut unique = Vec::new();
        for target in targets {
            let target = target.into();
            if seen.insert(target.clone()) {
                unique.push(target);
            }
        }
        adjacency.entry(source.clone()).or_default();
        pending_targets.push((source, unique));
    }

    for (source, targets) in &pending_targets {
        for target in targets {
            adjacency.entry(target.clone()).or_default();
        }
        adjacency.entry(source.clone()).or_default().extend(targets.iter().cloned());
    }

    adjacency
}

pub fn vertices(adjacency: &Adjacency) -> IndexSet<String> {
    let mut vertices: IndexSet<String> = IndexSet::new();
    for (source, targets) in adjacency {
        vertices.insert(source.clone());
        for target in targets {
            vertices.insert(target.clone());
        }
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_targets_preserving_order() {
        let adj = build_adjacency([("a", vec!["b", "c", "b"])]);
        assert_eq!(adj.get("a").unwrap(), &vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn target_only_vertices_get_an_entry() {
        let adj = build_adjacency([("a", vec!["b"])]);
        assert!(adj.contains_key("b"));
        assert!(adj.get("b").unwrap().is_empty());
    }
}
