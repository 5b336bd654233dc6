//! Undirected-view queries over a directed adjacency: weak connectedness
//! and cached forward reachability.

use indexmap::{IndexMap, IndexSet};

use crate::adjacency::{vertices, Adjacency};

pub fn is_weakly_connected(adjacency: &Adjacency) -> bool {
    let verts = vertices(adjacency);
    let Some(start) = verts.iter().next() else {
        return true;
    };

    let mut undirected: IndexMap<String, IndexSet<String>> = IndexMap::new();
    for (source, targets) in adjacency {
        for target in targets {
            undirected.entry(source.clone()).or_default().insert(target.clone());
            undirected.entry(target.clone()).or_default().insert(source.clone());
        }
    }

    let mut visited: IndexSet<String> = IndexSet::new();
    let mut stack = vec![start.clone()];
    while let Some(node) = stack.pop() {
        if !visited.insert(node.clone()) {
            continue;
        }
        if let Some(neighbors) = undirected.get(&node) {
            for neighbor in neighbors {
                if !visited.contains(neighbor) {
                    stack.push(neighbor.clone());
                }
            }
        }
    }
    visited.len() == verts.len()
}

/// Forward reachability from every vertex, memoized so a diagram with many
/// cross-references (service-zone containment checks, "does A eventually
/// reach B") pays DFS cost once per vertex rather than once per query.
/// Partition the graph's vertices into weakly-connected components, each
/// returned in discovery order. A procedure-graph layout lays out one
/// component per cluster of vertically stacked lanes.
pub fn weak_components(adjacency: &Adjacency) -> Vec<Vec<String>> {
    let verts = vertices(adjacency);
    let mut undirected: IndexMap<String, IndexSet<String>> = IndexMap::new();
    for (source, targets) in adjacency {
        for target in targets {
            undirected.entry(source.clone()).or_default().insert(target.clone());
            undirected.entry(target.clone()).or_default().insert(source.clone());
        }
    }

    let mut visited: IndexSet<String> = IndexSet::new();
    let mut components: Vec<Vec<String>> = Vec::new();
    for root in verts.iter() {
        if visited.contains(root) {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            if !visited.insert(node.clone()) {
                continue;
            }
            component.push(node.clone());
            if let Some(neighbors) = undirected.get(&node) {
                for neighbor in neighbors {
                    if !visited.contains(neighbor) {
                        stack.push(neighbor.clone());
                    }
                }
            }
        }
        components.push(component);
    }
    components
}

#[derive(Debug, Default)]
pub struct ReachabilityCache {
    reachable: IndexMap<String, IndexSet<String>>,
}

impl ReachabilityCache {
    pub fn build(adjacency: &Adjacency) -> Self {
        let mut reachable: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for start in adjacency.keys() {
            if reachable.contains_key(start) {
                continue;
            }
            let mut visited: IndexSet<String> = IndexSet::new();
            let mut stack = vec![start.clone()];
            while let Some(node) = stack.pop() {
                if !visited.insert(node.clone()) {
                    continue;
                }
                if let Some(targets) = adjacency.get(&node) {
                    for target in targets {
                        if !visited.contains(target) {
                            stack.push(target.clone());
                        }
                    }
                }
            }
            visited.shift_remove(start);
            reachable.insert(start.clone(), visited);
        }
        Self { reachable }
    }

    pub fn reaches(&self, from: &str, to: &str) -> bool {
        self.reachable.get(from).map(|set| set.contains(to)).unwrap_or(false)
    }

    pub fn reachable_from(&self, from: &str) -> Option<&IndexSet<String>> {
        self.reachable.get(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::build_adjacency;

    #[test]
    fn linear_chain_is_weakly_connected() {
        let adj = build_adjacency([("a", vec!["b"]), ("b", vec!["c"])]);
        assert!(is_weakly_connected(&adj));
    }

    #[test]
    fn disjoint_halves_are_not_weakly_connected() {
        let adj = build_adjacency([("a", vec!["b"]), ("c", vec!["d"])]);
        assert!(!is_weakly_connected(&adj));
    }

    #[test]
    fn weak_components_splits_disjoint_halves() {
        let adj = build_adjacency([("a", vec!["b"]), ("c", vec!["d"])]);
        let components = weak_components(&adj);
        assert_eq!(components.len(), 2);
    }

    #[test]
    fn reachability_cache_ignores_self_and_sees_transitive_targets() {
        let adj = build_adjacency([("a", vec!["b"]), ("b", vec!["c"])]);
        let cache = ReachabilityCache::build(&adj);
        assert!(cache.reaches("a", "c"));
        assert!(!cache.reaches("c", "a"));
        assert!(!cache.reaches("a", "a"));
    }
}
