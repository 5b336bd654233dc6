//! `BuildCrossTeamGraphDashboard`: graph- and procedure-level counts over a
//! scoped (selected) document set, contextualized against the full (all)
//! document set.

use indexmap::{IndexMap, IndexSet};

use jmap_graph::{build_adjacency, levelize, weak_components, Adjacency};
use jmap_model::MarkupDocument;

fn contains_token(id: &str, token: &str) -> bool {
    id.to_lowercase().contains(token)
}

fn merged_procedure_graph(documents: &[MarkupDocument]) -> Adjacency {
    let mut raw: IndexMap<String, Vec<String>> = IndexMap::new();
    for document in documents {
        for (source, targets) in &document.procedure_graph {
            let entry = raw.entry(source.clone()).or_default();
            for target in targets {
                if !entry.contains(target) {
                    entry.push(target.clone());
                }
            }
        }
    }
    build_adjacency(raw)
}

/// A document's own `(team, service)` identity, derived the same way
/// `procedure.team_id()`/`service_keys()` already resolve those fields:
/// falls back to "unknown-team"/"Unknown service" when no procedure
/// carries the metadata. Returns `(graph_key, team_id)`.
fn document_graph_key(document: &MarkupDocument) -> (String, String) {
    let team_id = document
        .procedures
        .iter()
        .find_map(|p| p.team_id())
        .unwrap_or_else(|| "unknown-team".to_string());
    let service_name = document
        .procedures
        .iter()
        .find_map(|p| p.service_keys().into_iter().next())
        .unwrap_or_else(|| "Unknown service".to_string());
    (format!("{team_id}::{service_name}"), team_id)
}

/// Number of distinct `(team, service)` graphs among `documents`. With
/// `merge_selected_markups` disabled this is a plain head count of graph
/// keys - two services are two graphs regardless of any procedure they
/// happen to share. With it enabled, graphs that share at least one
/// procedure id are unioned into one, so a procedure bridging two services
/// counts them as a single graph.
fn unique_graph_count(documents: &[MarkupDocument], merge_selected_markups: bool) -> u64 {
    let mut groups: IndexMap<String, IndexSet<String>> = IndexMap::new();
    for document in documents {
        let (graph_key, _) = document_graph_key(document);
        let entry = groups.entry(graph_key).or_default();
        for procedure in &document.procedures {
            entry.insert(procedure.procedure_id.clone());
        }
        for (source, targets) in &document.procedure_graph {
            entry.insert(source.clone());
            entry.extend(targets.iter().cloned());
        }
    }

    if !merge_selected_markups {
        return groups.len() as u64;
    }

    let mut procedure_to_groups: IndexMap<String, Vec<String>> = IndexMap::new();
    for (graph_key, procedure_ids) in &groups {
        for procedure_id in procedure_ids {
            procedure_to_groups.entry(procedure_id.clone()).or_default().push(graph_key.clone());
        }
    }

    let seeds = groups.keys().map(|key| (key.clone(), Vec::<String>::new()));
    let edges = procedure_to_groups.values().flat_map(|graph_keys| {
        graph_keys.iter().map(move |key| {
            let others: Vec<String> = graph_keys.iter().filter(|other| *other != key).cloned().collect();
            (key.clone(), others)
        })
    });
    let adjacency = build_adjacency(seeds.chain(edges));
    weak_components(&adjacency).len() as u64
}

#[derive(Debug, Clone, Default)]
pub struct LinkingProcedure {
    pub procedure_id: String,
    pub service_count: usize,
    pub edge_degree: usize,
}

#[derive(Debug, Clone, Default)]
pub struct OverloadedService {
    pub service_key: String,
    pub cycle_count: usize,
    pub block_count: usize,
    pub merge_node_count: usize,
    pub procedure_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CrossTeamGraphDashboard {
    pub markup_type_counts: IndexMap<String, u64>,
    pub unique_graph_count: u64,
    pub bot_graph_count: u64,
    pub multi_graph_count: u64,
    pub procedure_count_total: u64,
    pub procedure_count_unique: u64,
    pub procedure_count_bot: u64,
    pub procedure_count_multi: u64,
    pub procedure_count_employee: u64,
    pub internal_intersections: u64,
    pub external_intersections: u64,
    pub top_linking_procedures: Vec<LinkingProcedure>,
    pub top_overloaded_services: Vec<OverloadedService>,
    pub flow_order: Vec<String>,
}

pub struct BuildCrossTeamGraphDashboard {
    pub top_n: usize,
    /// Whether a procedure shared across two `(team, service)` graphs
    /// bridges them into one graph for `unique_graph_count`, mirroring
    /// `BuildTeamProcedureGraph::merge_selected_markups`.
    pub merge_selected_markups: bool,
}

impl Default for BuildCrossTeamGraphDashboard {
    fn default() -> Self {
        Self { top_n: 10, merge_selected_markups: true }
    }
}

impl BuildCrossTeamGraphDashboard {
    pub fn build(&self, selected: &[MarkupDocument], all: &[MarkupDocument]) -> CrossTeamGraphDashboard {
        let mut markup_type_counts: IndexMap<String, u64> = IndexMap::new();
        for document in selected {
            *markup_type_counts.entry(document.markup_type.clone()).or_insert(0) += 1;
        }

        let adjacency = merged_procedure_graph(selected);
        let components = weak_components(&adjacency);
        let bot_graph_count = components
            .iter()
            .filter(|c| c.iter().any(|id| contains_token(id, "bot")))
            .count() as u64;
        let multi_graph_count = components
            .iter()
            .filter(|c| c.iter().any(|id| contains_token(id, "multi")))
            .count() as u64;

        let mut unique_ids: IndexSet<String> = IndexSet::new();
        let mut procedure_count_total = 0u64;
        let mut service_membership: IndexMap<String, IndexSet<String>> = IndexMap::new();
        let mut service_procedures: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut service_block_counts: IndexMap<String, usize> = IndexMap::new();

        for document in selected {
            for procedure in &document.procedures {
                procedure_count_total += 1;
                unique_ids.insert(procedure.procedure_id.clone());
                for service in procedure.service_keys() {
                    service_membership
                        .entry(procedure.procedure_id.clone())
                        .or_default()
                        .insert(service.clone());
                    service_procedures.entry(service.clone()).or_default().push(procedure.procedure_id.clone());
                    *service_block_counts.entry(service.clone()).or_insert(0) += procedure.block_ids().len();
                }
            }
        }

        let procedure_count_bot = unique_ids.iter().filter(|id| contains_token(id, "bot")).count() as u64;
        let procedure_count_multi = unique_ids.iter().filter(|id| contains_token(id, "multi")).count() as u64;
        let procedure_count_employee = unique_ids.len() as u64 - procedure_count_bot - procedure_count_multi;

        // service key -> the team that claims it, resolved against the full
        // document universe so a service outside `selected` still classifies
        // correctly as same-team (internal) or other-team (external).
        let mut service_team_all: IndexMap<String, Option<String>> = IndexMap::new();
        let mut procedure_services_all: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for document in all {
            for procedure in &document.procedures {
                let team = procedure.team_name();
                for service in procedure.service_keys() {
                    service_team_all.entry(service.clone()).or_insert_with(|| team.clone());
                    procedure_services_all.entry(procedure.procedure_id.clone()).or_default().insert(service);
                }
            }
        }

        let mut internal_intersections = 0u64;
        let mut external_intersections = 0u64;
        for document in selected {
            let doc_services: IndexSet<String> = document.procedures.iter().flat_map(|p| p.service_keys()).collect();
            let doc_team = document.procedures.iter().find_map(|p| p.team_name());
            let mut has_internal = false;
            let mut has_external = false;
            for procedure in &document.procedures {
                let Some(all_services) = procedure_services_all.get(&procedure.procedure_id) else { continue };
                for other_service in all_services {
                    if doc_services.contains(other_service) {
                        continue;
                    }
                    let other_team = service_team_all.get(other_service).cloned().flatten();
                    if doc_team.is_some() && other_team == doc_team {
                        has_internal = true;
                    } else {
                        has_external = true;
                    }
                }
            }
            if has_internal {
                internal_intersections += 1;
            }
            if has_external {
                external_intersections += 1;
            }
        }

        let mut linking: Vec<LinkingProcedure> = service_membership
            .iter()
            .filter(|(_, services)| services.len() > 1)
            .map(|(procedure_id, services)| {
                let in_degree = adjacency.values().flatten().filter(|t| *t == procedure_id).count();
                let out_degree = adjacency.get(procedure_id).map(Vec::len).unwrap_or(0);
                LinkingProcedure {
                    procedure_id: procedure_id.clone(),
                    service_count: services.len(),
                    edge_degree: in_degree + out_degree,
                }
            })
            .collect();
        linking.sort_by(|a, b| {
            b.service_count.cmp(&a.service_count).then(b.edge_degree.cmp(&a.edge_degree)).then(a.procedure_id.cmp(&b.procedure_id))
        });
        linking.truncate(self.top_n);

        let mut overloaded: Vec<OverloadedService> = service_procedures
            .iter()
            .map(|(service_key, procedure_ids)| {
                let restricted: Adjacency = adjacency
                    .iter()
                    .filter(|(source, _)| procedure_ids.contains(source))
                    .map(|(source, targets)| {
                        (source.clone(), targets.iter().filter(|t| procedure_ids.contains(t)).cloned().collect())
                    })
                    .collect();
                let metrics = jmap_graph::GraphMetrics::from_adjacency(&restricted);
                OverloadedService {
                    service_key: service_key.clone(),
                    cycle_count: metrics.cycle_count,
                    block_count: service_block_counts.get(service_key).copied().unwrap_or(0),
                    merge_node_count: metrics.merge_nodes.len(),
                    procedure_count: procedure_ids.len(),
                }
            })
            .collect();
        overloaded.sort_by(|a, b| {
            b.cycle_count
                .cmp(&a.cycle_count)
                .then(b.block_count.cmp(&a.block_count))
                .then(b.merge_node_count.cmp(&a.merge_node_count))
                .then(b.procedure_count.cmp(&a.procedure_count))
                .then(a.service_key.cmp(&b.service_key))
        });
        overloaded.truncate(self.top_n);

        let starts: Vec<String> = adjacency
            .keys()
            .filter(|id| adjacency.values().flatten().all(|t| t != *id))
            .cloned()
            .collect();
        let levels = levelize(&adjacency, &starts, &[]);

        let mut component_index: IndexMap<String, usize> = IndexMap::new();
        for (index, component) in components.iter().enumerate() {
            for id in component {
                component_index.insert(id.clone(), index);
            }
        }

        let mut flow_order: Vec<String> = adjacency.keys().cloned().collect();
        flow_order.sort_by(|a, b| {
            let comp_a = component_index.get(a).copied().unwrap_or(usize::MAX);
            let comp_b = component_index.get(b).copied().unwrap_or(usize::MAX);
            let level_a = levels.get(a).copied().unwrap_or(0);
            let level_b = levels.get(b).copied().unwrap_or(0);
            comp_a.cmp(&comp_b).then(level_a.cmp(&level_b))
        });

        CrossTeamGraphDashboard {
            markup_type_counts,
            unique_graph_count: unique_graph_count(selected, self.merge_selected_markups),
            bot_graph_count,
            multi_graph_count,
            procedure_count_total,
            procedure_count_unique: unique_ids.len() as u64,
            procedure_count_bot,
            procedure_count_multi,
            procedure_count_employee,
            internal_intersections,
            external_intersections,
            top_linking_procedures: linking,
            top_overloaded_services: overloaded,
            flow_order,
        }
    }
}
