//! Longest-path levelization: assign each vertex the layer index one past
//! its deepest incoming predecessor, with optional forcing of designated
//! start vertices to layer 0 and end vertices to the final layer.
//!
//! This is the shared relaxation loop behind both the block-level grid
//! layout and the procedure-level lane layout; they differ only in which
//! vertices they mark as starts/ends.

use indexmap::IndexMap;

use crate::adjacency::Adjacency;

/// Relax `level[target] = max(level[target], level[source] + 1)` to a
/// fixpoint. `starts` are pinned to level 0 before relaxation; `ends` are
/// pushed to `max_level + 1` after relaxation converges, so a journey's
/// terminal blocks always draw in their own rightmost column even when an
/// earlier branch would have placed them sooner.
pub fn levelize(adjacency: &Adjacency, starts: &[String], ends: &[String]) -> IndexMap<String, usize> {
    let mut levels: IndexMap<String, usize> = IndexMap::new();
    for start in starts {
        levels.insert(start.clone(), 0);
    }

    let mut changed = true;
    while changed {
        changed = false;
        for (source, targets) in adjacency {
            let source_level = *levels.get(source).unwrap_or(&0);
            for target in targets {
                let current = levels.get(target).copied();
                let desired = current.map(|c| c.max(source_level + 1)).unwrap_or(source_level + 1);
                if current != Some(desired) {
                    levels.insert(target.clone(), desired);
                    changed = true;
                }
            }
        }
    }

    let max_level = levels.values().copied().max().unwrap_or(0);
    for end in ends {
        let current = levels.get(end).copied().unwrap_or(max_level);
        levels.insert(end.clone(), current.max(max_level + 1));
    }

    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::build_adjacency;

    #[test]
    fn linear_chain_levels_increase_by_one() {
        let adj = build_adjacency([("a", vec!["b"]), ("b", vec!["c"])]);
        let levels = levelize(&adj, &["a".to_string()], &[]);
        assert_eq!(levels.get("a"), Some(&0));
        assert_eq!(levels.get("b"), Some(&1));
        assert_eq!(levels.get("c"), Some(&2));
    }

    #[test]
    fn end_vertices_are_forced_past_the_max_level() {
        let adj = build_adjacency([("a", vec!["b", "c"]), ("b", vec!["c"])]);
        let levels = levelize(&adj, &["a".to_string()], &["c".to_string()]);
        let max_non_end = levels
            .iter()
            .filter(|(k, _)| *k != "c")
            .map(|(_, v)| *v)
            .max()
            .unwrap();
        assert!(levels["c"] > max_non_end);
    }

    #[test]
    fn branch_takes_the_longer_incoming_path() {
        let adj = build_adjacency([("a", vec!["b", "d"]), ("b", vec!["c"]), ("c", vec!["d"])]);
        let levels = levelize(&adj, &["a".to_string()], &[]);
        assert_eq!(levels.get("d"), Some(&3));
    }
}
