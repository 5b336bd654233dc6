//! `BuildCatalogHealthReport`: per-item graph/gaming health classification,
//! cross-item similarity, and per-team rollups.

use indexmap::IndexMap;

use jmap_graph::{build_adjacency, weak_components};

use crate::catalog_index::CatalogItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphHealthIssue {
    TooMany,
    MultipleWithoutBot,
    NoBot,
    OnlyBot,
}

impl GraphHealthIssue {
    pub fn code(self) -> &'static str {
        match self {
            Self::TooMany => "TOO_MANY",
            Self::MultipleWithoutBot => "MULTIPLE_WITHOUT_BOT",
            Self::NoBot => "NO_BOT",
            Self::OnlyBot => "ONLY_BOT",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimilarityMatch {
    pub scene_id: String,
    pub overlap_percent: f64,
}

#[derive(Debug, Clone)]
pub struct ItemHealth {
    pub scene_id: String,
    pub graph_issue: Option<GraphHealthIssue>,
    pub no_branch_and_no_end_except_postpone: bool,
    pub top_same_team: Option<SimilarityMatch>,
    pub top_cross_team: Option<SimilarityMatch>,
}

impl ItemHealth {
    pub fn is_problematic(&self) -> bool {
        self.graph_issue.is_some() || self.no_branch_and_no_end_except_postpone
    }
}

#[derive(Debug, Clone, Default)]
pub struct TeamSummary {
    pub too_many: u64,
    pub multiple_without_bot: u64,
    pub no_bot: u64,
    pub only_bot: u64,
    pub gaming: u64,
    pub total_problems: u64,
}

pub struct CatalogHealthReport {
    pub items: Vec<ItemHealth>,
    pub team_summaries: IndexMap<String, TeamSummary>,
    pub total_problem_markups: u64,
}

#[derive(Debug, Clone)]
pub struct BuildCatalogHealthReport {
    pub same_team_threshold_percent: f64,
    pub cross_team_threshold_percent: f64,
}

impl Default for BuildCatalogHealthReport {
    fn default() -> Self {
        Self { same_team_threshold_percent: 40.0, cross_team_threshold_percent: 20.0 }
    }
}

fn is_bot_start(procedure_id: &str) -> bool {
    let lower = procedure_id.to_lowercase();
    lower.contains("bot") || lower.contains("multi")
}

/// The component's in-degree-0 nodes (edges counted only within the
/// component), sorted lexically case-insensitive. Falls back to the
/// lexically smallest node when every node has an incoming edge (a cycle
/// spanning the whole component).
fn component_starts(component: &[String], adjacency: &jmap_graph::Adjacency) -> Vec<String> {
    let members: std::collections::HashSet<&String> = component.iter().collect();
    let mut in_degree: IndexMap<&String, usize> = component.iter().map(|node| (node, 0)).collect();
    for source in component {
        for target in adjacency.get(source).into_iter().flatten() {
            if members.contains(target) {
                *in_degree.entry(target).or_insert(0) += 1;
            }
        }
    }
    let mut starts: Vec<String> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(node, _)| (*node).clone())
        .collect();
    starts.sort_by_key(|node| node.to_lowercase());
    if !starts.is_empty() {
        return starts;
    }
    component.iter().min_by_key(|node| node.to_lowercase()).cloned().into_iter().collect()
}

fn classify_graph(item: &CatalogItem) -> Option<GraphHealthIssue> {
    let adjacency = build_adjacency(
        item.procedure_graph.iter().map(|(k, v)| (k.clone(), v.clone())),
    );
    let components = weak_components(&adjacency);
    if components.is_empty() {
        return None;
    }
    if components.len() > 3 {
        return Some(GraphHealthIssue::TooMany);
    }

    let bot_components = components
        .iter()
        .filter(|component| component_starts(component, &adjacency).iter().any(|id| is_bot_start(id)))
        .count();

    if components.len() >= 2 && bot_components == 0 {
        return Some(GraphHealthIssue::MultipleWithoutBot);
    }
    if components.len() == 1 && bot_components == 0 {
        return Some(GraphHealthIssue::NoBot);
    }
    if bot_components == components.len() {
        return Some(GraphHealthIssue::OnlyBot);
    }
    None
}

fn overlap_percent(a: &CatalogItem, b: &CatalogItem) -> f64 {
    if a.procedure_ids.is_empty() {
        return 0.0;
    }
    let b_set: std::collections::HashSet<&String> = b.procedure_ids.iter().collect();
    let shared = a.procedure_ids.iter().filter(|id| b_set.contains(id)).count();
    let percent = (shared as f64 / a.procedure_ids.len() as f64) * 100.0;
    (percent * 100.0).round() / 100.0
}

fn top_match<'a>(item: &CatalogItem, candidates: impl Iterator<Item = &'a CatalogItem>) -> Option<SimilarityMatch> {
    candidates
        .filter(|other| other.scene_id != item.scene_id)
        .map(|other| SimilarityMatch { scene_id: other.scene_id.clone(), overlap_percent: overlap_percent(item, other) })
        .max_by(|a, b| a.overlap_percent.partial_cmp(&b.overlap_percent).unwrap_or(std::cmp::Ordering::Equal))
}

impl BuildCatalogHealthReport {
    pub fn build(&self, items: &[CatalogItem]) -> CatalogHealthReport {
        let mut item_healths = Vec::with_capacity(items.len());
        let mut team_summaries: IndexMap<String, TeamSummary> = IndexMap::new();
        let mut total_problem_markups = 0u64;

        for item in items {
            let graph_issue = classify_graph(item);
            let gaming = !item.procedure_graph.is_empty()
                && item.branch_block_count == 0
                && item.non_postpone_end_block_count == 0;

            let same_team = top_match(
                item,
                items.iter().filter(|other| other.team_id == item.team_id && item.team_id.is_some()),
            )
            .filter(|m| m.overlap_percent > self.same_team_threshold_percent);

            let cross_team = top_match(
                item,
                items.iter().filter(|other| other.team_id != item.team_id),
            )
            .filter(|m| m.overlap_percent > self.cross_team_threshold_percent);

            let health = ItemHealth {
                scene_id: item.scene_id.clone(),
                graph_issue,
                no_branch_and_no_end_except_postpone: gaming,
                top_same_team: same_team,
                top_cross_team: cross_team,
            };

            if health.is_problematic() {
                total_problem_markups += 1;
                let team = item.team_name.clone().unwrap_or_else(|| "unassigned".to_string());
                let summary = team_summaries.entry(team).or_default();
                match graph_issue {
                    Some(GraphHealthIssue::TooMany) => summary.too_many += 1,
                    Some(GraphHealthIssue::MultipleWithoutBot) => summary.multiple_without_bot += 1,
                    Some(GraphHealthIssue::NoBot) => summary.no_bot += 1,
                    Some(GraphHealthIssue::OnlyBot) => summary.only_bot += 1,
                    None => {}
                }
                if gaming {
                    summary.gaming += 1;
                }
                summary.total_problems += 1;
            }

            item_healths.push(health);
        }

        CatalogHealthReport { items: item_healths, team_summaries, total_problem_markups }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap as Map;

    fn item(scene_id: &str, procedure_graph: Map<String, Vec<String>>) -> CatalogItem {
        CatalogItem {
            scene_id: scene_id.into(),
            path: format!("{scene_id}.json"),
            markup_type: "service".into(),
            finedog_unit_id: None,
            criticality_level: None,
            team_id: None,
            team_name: None,
            title: scene_id.into(),
            group_values: Map::new(),
            fields: Map::new(),
            markup_meta: Map::new(),
            markup_rel_path: format!("{scene_id}.json"),
            excalidraw_rel_path: format!("{scene_id}.excalidraw"),
            unidraw_rel_path: format!("{scene_id}.unidraw"),
            tags: vec![],
            updated_at: "t".into(),
            procedure_ids: procedure_graph.keys().cloned().collect(),
            block_ids: vec![],
            procedure_blocks: Map::new(),
            procedure_graph,
            branch_block_count: 1,
            non_postpone_end_block_count: 1,
            postpone_end_block_count: 0,
        }
    }

    #[test]
    fn single_component_without_bot_start_is_no_bot() {
        let i = item("s1", Map::from([("p1".to_string(), vec!["p2".to_string()]), ("p2".to_string(), vec![])]));
        let report = BuildCatalogHealthReport::default().build(&[i]);
        assert_eq!(report.items[0].graph_issue, Some(GraphHealthIssue::NoBot));
    }

    #[test]
    fn four_component_graph_is_too_many() {
        let mut graph = Map::new();
        for n in 0..4 {
            graph.insert(format!("p{n}"), vec![]);
        }
        let i = item("s1", graph);
        let report = BuildCatalogHealthReport::default().build(&[i]);
        assert_eq!(report.items[0].graph_issue, Some(GraphHealthIssue::TooMany));
    }

    #[test]
    fn all_bot_components_is_only_bot() {
        let graph = Map::from([
            ("bot_p1".to_string(), vec![]),
            ("bot_p2".to_string(), vec![]),
        ]);
        let i = item("s1", graph);
        let report = BuildCatalogHealthReport::default().build(&[i]);
        assert_eq!(report.items[0].graph_issue, Some(GraphHealthIssue::OnlyBot));
    }

    #[test]
    fn bot_check_looks_at_the_components_start_not_any_member() {
        // p1 (the in-degree-0 start) is plain, but a downstream node mentions
        // "bot" - only the start node should count toward bot_graph_count.
        let graph = Map::from([("p1".to_string(), vec!["bot_followup".to_string()]), ("bot_followup".to_string(), vec![])]);
        let i = item("s1", graph);
        let report = BuildCatalogHealthReport::default().build(&[i]);
        assert_eq!(report.items[0].graph_issue, Some(GraphHealthIssue::NoBot));
    }

    #[test]
    fn bot_start_fallback_uses_lexical_min_when_component_is_a_cycle() {
        let graph = Map::from([("bot_p2".to_string(), vec!["p1".to_string()]), ("p1".to_string(), vec!["bot_p2".to_string()])]);
        let i = item("s1", graph);
        let report = BuildCatalogHealthReport::default().build(&[i]);
        // every node has in-degree 1; fallback picks the lexically smallest, "bot_p2".
        assert_eq!(report.items[0].graph_issue, Some(GraphHealthIssue::OnlyBot));
    }

    #[test]
    fn gaming_flag_requires_no_branches_and_no_non_postpone_ends() {
        let mut i = item("s1", Map::from([("bot_p1".to_string(), vec![])]));
        i.branch_block_count = 0;
        i.non_postpone_end_block_count = 0;
        let report = BuildCatalogHealthReport::default().build(&[i]);
        assert!(report.items[0].no_branch_and_no_end_except_postpone);
    }
}
