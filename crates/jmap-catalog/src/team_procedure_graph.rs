//! `BuildTeamProcedureGraph`: merges N documents into one cross-team
//! procedure graph, with service coloring, intersection marking, and
//! intermediate-procedure elision.

use indexmap::{IndexMap, IndexSet};

use jmap_graph::merge_chains;
use jmap_model::{EndType, MarkupDocument};

/// Adapted from `jmap-layout::service::SERVICE_COLOR_PALETTE`; duplicated
/// here rather than taken as a dependency since this crate never lays out
/// zones, only assigns a stable color index per service.
pub const SERVICE_COLOR_PALETTE: [&str; 8] =
    ["#4C72B0", "#DD8452", "#55A868", "#C44E52", "#8172B2", "#937860", "#DA8BC3", "#8C8C8C"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphLevel {
    Procedure,
    Service,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedProcedure {
    pub procedure_id: String,
    pub display_name: Option<String>,
    pub start_block_ids: Vec<String>,
    pub end_block_ids: Vec<String>,
    pub end_block_types: IndexMap<String, EndType>,
    pub branches: IndexMap<String, Vec<String>>,
    pub block_id_to_block_name: IndexMap<String, String>,
    pub services: Vec<String>,
    pub is_intersection: bool,
    pub service_color_index: Option<usize>,
    pub merge_chain_group_id: Option<String>,
    pub merge_chain_members: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TeamProcedureGraph {
    pub procedures: Vec<MergedProcedure>,
    pub procedure_graph: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct BuildTeamProcedureGraph {
    pub merge_selected_markups: bool,
    pub merge_node_min_chain_size: usize,
    pub graph_level: GraphLevel,
}

impl Default for BuildTeamProcedureGraph {
    fn default() -> Self {
        Self { merge_selected_markups: true, merge_node_min_chain_size: 2, graph_level: GraphLevel::Procedure }
    }
}

struct Accumulator {
    display_name: Option<String>,
    start_block_ids: IndexSet<String>,
    end_block_ids: IndexSet<String>,
    end_block_types: IndexMap<String, EndType>,
    branches: IndexMap<String, IndexSet<String>>,
    block_id_to_block_name: IndexMap<String, String>,
    services: IndexSet<String>,
}

impl BuildTeamProcedureGraph {
    fn scope_key(&self, procedure_id: &str, doc_index: usize) -> String {
        if self.merge_selected_markups {
            procedure_id.to_string()
        } else {
            format!("{procedure_id}::doc{doc_index}")
        }
    }

    pub fn build(&self, documents: &[MarkupDocument]) -> TeamProcedureGraph {
        let mut accumulators: IndexMap<String, Accumulator> = IndexMap::new();

        for (doc_index, document) in documents.iter().enumerate() {
            for procedure in &document.procedures {
                let key = self.scope_key(&procedure.procedure_id, doc_index);
                let entry = accumulators.entry(key).or_insert_with(|| Accumulator {
                    display_name: None,
                    start_block_ids: IndexSet::new(),
                    end_block_ids: IndexSet::new(),
                    end_block_types: IndexMap::new(),
                    branches: IndexMap::new(),
                    block_id_to_block_name: IndexMap::new(),
                    services: IndexSet::new(),
                });

                if entry.display_name.is_none() {
                    entry.display_name = procedure.display_name.clone();
                }
                for id in &procedure.start_block_ids {
                    entry.start_block_ids.insert(id.clone());
                }
                for id in &procedure.end_block_ids {
                    entry.end_block_ids.insert(id.clone());
                }
                for (block_id, end_type) in &procedure.end_block_types {
                    let merged = EndType::merge(entry.end_block_types.get(block_id).copied(), *end_type);
                    entry.end_block_types.insert(block_id.clone(), merged);
                }
                for (source, targets) in &procedure.branches {
                    let bucket = entry.branches.entry(source.clone()).or_default();
                    for target in targets {
                        bucket.insert(target.clone());
                    }
                }
                for (block_id, name) in &procedure.block_id_to_block_name {
                    entry.block_id_to_block_name.entry(block_id.clone()).or_insert_with(|| name.clone());
                }
                for service in procedure.service_keys() {
                    entry.services.insert(service);
                }
            }
        }

        let mut distinct_services: Vec<String> = accumulators
            .values()
            .flat_map(|a| a.services.iter().cloned())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        distinct_services.sort();
        let color_index: IndexMap<String, usize> = distinct_services
            .iter()
            .enumerate()
            .map(|(i, service)| (service.clone(), i % SERVICE_COLOR_PALETTE.len()))
            .collect();

        let mut procedures: Vec<MergedProcedure> = accumulators
            .into_iter()
            .map(|(procedure_id, acc)| {
                let services: Vec<String> = acc.services.into_iter().collect();
                let is_intersection = services.len() > 1;
                let service_color_index = services.first().and_then(|s| color_index.get(s)).copied();
                let mut start_block_ids: Vec<String> = acc.start_block_ids.into_iter().collect();
                start_block_ids.sort();
                let mut end_block_ids: Vec<String> = acc.end_block_ids.into_iter().collect();
                end_block_ids.sort();
                MergedProcedure {
                    procedure_id,
                    display_name: acc.display_name,
                    start_block_ids,
                    end_block_ids,
                    end_block_types: acc.end_block_types,
                    branches: acc
                        .branches
                        .into_iter()
                        .map(|(k, v)| (k, v.into_iter().collect()))
                        .collect(),
                    block_id_to_block_name: acc.block_id_to_block_name,
                    services,
                    is_intersection,
                    service_color_index,
                    merge_chain_group_id: None,
                    merge_chain_members: Vec::new(),
                }
            })
            .collect();

        let mut procedure_graph: IndexMap<String, Vec<String>> = IndexMap::new();
        for (doc_index, document) in documents.iter().enumerate() {
            for (source, targets) in &document.procedure_graph {
                let source_key = self.scope_key(source, doc_index);
                let bucket = procedure_graph.entry(source_key).or_default();
                for target in targets {
                    let target_key = self.scope_key(target, doc_index);
                    if !bucket.contains(&target_key) {
                        bucket.push(target_key);
                    }
                }
            }
        }

        self.elide_intermediate_procedures(&mut procedures, &mut procedure_graph);
        self.assign_merge_chains(&mut procedures, &procedure_graph);

        TeamProcedureGraph { procedures, procedure_graph }
    }

    fn elide_intermediate_procedures(
        &self,
        procedures: &mut Vec<MergedProcedure>,
        procedure_graph: &mut IndexMap<String, Vec<String>>,
    ) {
        loop {
            let in_degree = in_degree_map(procedure_graph);
            let removable = procedures.iter().position(|p| {
                p.start_block_ids.is_empty()
                    && p.end_block_ids.is_empty()
                    && !p.is_intersection
                    && in_degree.get(&p.procedure_id).copied().unwrap_or(0) == 1
                    && procedure_graph.get(&p.procedure_id).map(Vec::len).unwrap_or(0) == 1
            });

            let Some(index) = removable else { break };
            let target_id = procedures[index].procedure_id.clone();
            let successor = procedure_graph.get(&target_id).unwrap()[0].clone();
            tracing::debug!(
                target: "jmap_catalog::team_procedure_graph",
                procedure_id = %target_id,
                rerouted_to = %successor,
                "elided intermediate procedure"
            );

            for targets in procedure_graph.values_mut() {
                if let Some(pos) = targets.iter().position(|t| *t == target_id) {
                    targets.remove(pos);
                    if !targets.contains(&successor) {
                        targets.push(successor.clone());
                    }
                }
            }
            procedure_graph.shift_remove(&target_id);
            procedures.remove(index);
        }
    }

    fn assign_merge_chains(&self, procedures: &mut [MergedProcedure], procedure_graph: &IndexMap<String, Vec<String>>) {
        let intersection_ids: IndexSet<String> =
            procedures.iter().filter(|p| p.is_intersection).map(|p| p.procedure_id.clone()).collect();
        let adjacency = jmap_graph::build_adjacency(
            procedure_graph.iter().map(|(k, v)| (k.clone(), v.clone())),
        );
        let groups = merge_chains(&adjacency, |id| intersection_ids.contains(id), self.merge_node_min_chain_size);

        for procedure in procedures.iter_mut() {
            if let Some(group_id) = groups.get(&procedure.procedure_id) {
                procedure.merge_chain_group_id = Some(group_id.clone());
                procedure.merge_chain_members = group_id.split('|').map(str::to_string).collect();
            }
        }
    }
}

fn in_degree_map(procedure_graph: &IndexMap<String, Vec<String>>) -> IndexMap<String, usize> {
    let mut degrees: IndexMap<String, usize> = IndexMap::new();
    for targets in procedure_graph.values() {
        for target in targets {
            *degrees.entry(target.clone()).or_insert(0) += 1;
        }
    }
    degrees
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap as Map;
    use jmap_model::Procedure;
    use serde_json::json;

    fn procedure(id: &str, start: bool, end: bool, services: Vec<&str>) -> Procedure {
        let mut meta = Map::new();
        if services.len() == 1 {
            meta.insert("service_name".to_string(), json!(services[0]));
        } else if services.len() > 1 {
            meta.insert("services".to_string(), json!(services));
        }
        Procedure {
            procedure_id: id.into(),
            display_name: None,
            start_block_ids: if start { vec!["a".into()] } else { vec![] },
            end_block_ids: if end { vec!["z".into()] } else { vec![] },
            end_block_types: Map::new(),
            branches: Map::new(),
            block_id_to_block_name: Map::new(),
            procedure_meta: meta,
        }
    }

    fn doc(procedures: Vec<Procedure>, graph: Map<String, Vec<String>>) -> MarkupDocument {
        MarkupDocument {
            slug: "d".into(),
            markup_type: "service".into(),
            display_markup_type: None,
            finedog_unit_meta: Default::default(),
            procedures,
            block_graph: Map::new(),
            procedure_graph: graph,
        }
    }

    #[test]
    fn duplicate_procedure_ids_merge_branches_and_services() {
        let d1 = doc(vec![procedure("p1", true, true, vec!["alpha"])], Map::new());
        let d2 = doc(vec![procedure("p1", true, true, vec!["beta"])], Map::new());
        let built = BuildTeamProcedureGraph::default().build(&[d1, d2]);
        assert_eq!(built.procedures.len(), 1);
        assert!(built.procedures[0].is_intersection);
        assert_eq!(built.procedures[0].services.len(), 2);
    }

    #[test]
    fn scoped_merge_keeps_documents_separate_when_disabled() {
        let d1 = doc(vec![procedure("p1", true, true, vec![])], Map::new());
        let d2 = doc(vec![procedure("p1", true, true, vec![])], Map::new());
        let build = BuildTeamProcedureGraph { merge_selected_markups: false, ..BuildTeamProcedureGraph::default() };
        let built = build.build(&[d1, d2]);
        assert_eq!(built.procedures.len(), 2);
    }

    #[test]
    fn intermediate_procedure_is_elided_and_edge_rerouted() {
        let document = doc(
            vec![
                procedure("start", true, false, vec![]),
                procedure("middle", false, false, vec![]),
                procedure("end", false, true, vec![]),
            ],
            Map::from([
                ("start".to_string(), vec!["middle".to_string()]),
                ("middle".to_string(), vec!["end".to_string()]),
            ]),
        );
        let built = BuildTeamProcedureGraph::default().build(&[document]);
        assert_eq!(built.procedures.len(), 2);
        assert_eq!(built.procedure_graph.get("start"), Some(&vec!["end".to_string()]));
    }
}
