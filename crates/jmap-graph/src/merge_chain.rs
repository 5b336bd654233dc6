//! Maximal connected runs of "merge" nodes (nodes satisfying a
//! caller-supplied predicate), used to group contiguous intersection
//! procedures into one labeled chain instead of numbering each separately.

use indexmap::IndexMap;

use crate::adjacency::Adjacency;

/// For every node satisfying `is_member`, find the maximal weakly-connected
/// cluster of members reachable through edges whose both endpoints are
/// members. Clusters of size `< min_chain_size` are left out of the
/// returned map (the caller treats an absent entry as "not part of a
/// chain"). Present entries map a member id to a `chain_group_id` derived
/// from the cluster's sorted member ids, stable regardless of discovery
/// order.
pub fn merge_chains(
    adjacency: &Adjacency,
    is_member: impl Fn(&str) -> bool,
    min_chain_size: usize,
) -> IndexMap<String, String> {
    let mut member_adjacency: IndexMap<String, Vec<String>> = IndexMap::new();
    for (source, targets) in adjacency {
        if !is_member(source) {
            continue;
        }
        member_adjacency.entry(source.clone()).or_default();
        for target in targets {
            if is_member(target) {
                member_adjacency.entry(target.clone()).or_default();
                member_adjacency.get_mut(source).unwrap().push(target.clone());
            }
        }
    }

    let clusters = crate::connectivity::weak_components(&member_adjacency);

    let mut result = IndexMap::new();
    for mut cluster in clusters {
        if cluster.len() < min_chain_size {
            continue;
        }
        cluster.sort();
        let group_id = cluster.join("|");
        for member in &cluster {
            result.insert(member.clone(), group_id.clone());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::build_adjacency;

    #[test]
    fn contiguous_members_form_one_chain() {
        let adj = build_adjacency([("a", vec!["b"]), ("b", vec!["c"]), ("c", vec!["d"])]);
        let members = |id: &str| matches!(id, "b" | "c");
        let chains = merge_chains(&adj, members, 2);
        assert_eq!(chains.get("b"), chains.get("c"));
        assert!(!chains.contains_key("a"));
    }

    #[test]
    fn isolated_member_below_min_size_is_not_a_chain() {
        let adj = build_adjacency([("a", vec!["b"]), ("b", vec!["c"])]);
        let members = |id: &str| id == "b";
        let chains = merge_chains(&adj, members, 2);
        assert!(chains.is_empty());
    }
}
