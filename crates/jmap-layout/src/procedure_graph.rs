//! Procedure-graph layout engine: lays out whole procedures as nodes,
//! grouped into weakly-connected components, each optionally partitioned
//! into service zones with a scenario side panel.

use std::collections::HashSet;

use indexmap::IndexMap;

use jmap_graph::{build_adjacency, is_weakly_connected, levelize, merge_chains, weak_components, Adjacency};
use jmap_model::{
    FramePlacement, LayoutPlan, MarkupDocument, Point, Rect, ScenarioMergeNodesBlock, ScenarioPlacement,
    ScenarioProceduresBlock, SeparatorOrientation, SeparatorPlacement, ServiceZonePlacement, Size,
};

use crate::config::LayoutConfig;
use crate::edge_crossing::edges_cross;
use crate::service::collect_services;

pub struct ProcedureGraphLayoutEngine {
    config: LayoutConfig,
}

const EPS: f64 = 1e-6;

impl ProcedureGraphLayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn build_plan(&self, document: &MarkupDocument) -> LayoutPlan {
        let procedure_adjacency = self.procedure_adjacency(document);
        let mut components = weak_components(&procedure_adjacency);
        // order_hint: position of first appearance in procedure_graph / the
        // document's procedure list, whichever names the procedure first.
        let order_hint = self.order_hints(document);
        components.sort_by_key(|members| {
            members.iter().filter_map(|m| order_hint.get(m)).copied().min().unwrap_or(usize::MAX)
        });

        let node_size = self.config.block_size;
        let mut frames = Vec::new();
        let mut separators = Vec::new();
        let mut service_zones = Vec::new();
        let mut scenarios = Vec::new();

        let mut cursor_x = 0.0_f64;
        let is_service_graph = document.markup_type == "service_graph";

        for (component_index, members) in components.iter().enumerate() {
            if members.is_empty() {
                continue;
            }
            let component_procedures: Vec<_> = document
                .procedures
                .iter()
                .filter(|p| members.contains(&p.procedure_id))
                .collect();

            let local_adjacency = restrict(&procedure_adjacency, members);
            let feedback_edges = feedback_edges(&local_adjacency, &order_hint);
            let dag_adjacency = remove_edges(&local_adjacency, &feedback_edges);

            let starts: Vec<String> = component_procedures
                .iter()
                .filter(|p| !p.start_block_ids.is_empty())
                .map(|p| p.procedure_id.clone())
                .collect();
            let ends: Vec<String> = component_procedures
                .iter()
                .filter(|p| !p.end_block_ids.is_empty())
                .map(|p| p.procedure_id.clone())
                .collect();
            let levels = levelize(&dag_adjacency, &starts, &ends);

            let services = if is_service_graph {
                Vec::new()
            } else {
                collect_services(&component_procedures.iter().map(|p| (**p).clone()).collect::<Vec<_>>())
            };
            let zones_enabled = !is_service_graph && services.len() >= 2;

            let component_origin_x = cursor_x;
            let component_frames = if is_service_graph {
                self.place_service_graph_nodes(&component_procedures, &levels, component_origin_x, node_size)
            } else {
                self.place_linear(&component_procedures, &levels, component_origin_x, node_size)
            };

            let frame_lookup: IndexMap<String, FramePlacement> = component_frames
                .iter()
                .map(|f| (f.frame_id.clone(), f.clone()))
                .collect();

            let chosen_frames = if zones_enabled {
                let crosses = edges_cross(&frame_lookup, &dag_adjacency);
                let zone_rects = service_zone_rects(&services, &component_procedures, &frame_lookup, &self.config);
                let overlaps_partially = zone_rects.iter().enumerate().any(|(i, (_, a))| {
                    zone_rects[i + 1..].iter().any(|(_, b)| a.overlaps(b, EPS) && !a.nests_cleanly_with(b, EPS))
                });

                if !crosses && !overlaps_partially {
                    component_frames
                } else {
                    tracing::debug!(
                        target: "jmap_layout::procedure_graph",
                        component = component_index,
                        crosses,
                        overlaps_partially,
                        "falling back to service-band layout"
                    );
                    self.place_service_bands(&component_procedures, &levels, &services, component_origin_x, node_size)
                }
            } else {
                component_frames
            };

            let frame_lookup: IndexMap<String, FramePlacement> = chosen_frames
                .iter()
                .map(|f| (f.frame_id.clone(), f.clone()))
                .collect();

            if zones_enabled {
                let mut zones = build_service_zones(&services, &component_procedures, &frame_lookup, &self.config);
                service_zones.append(&mut zones);
            }

            let component_width = chosen_frames
                .iter()
                .map(|f| f.origin.x + f.size.width - component_origin_x)
                .fold(0.0_f64, f64::max);
            cursor_x = component_origin_x + component_width.max(node_size.width) + self.config.lane_gap;

            if component_index > 0 {
                separators.push(self.build_separator(component_origin_x - self.config.lane_gap / 2.0, &chosen_frames));
            }

            if !is_service_graph {
                scenarios.push(self.build_scenario_panel(
                    component_index,
                    &component_procedures,
                    &local_adjacency,
                    component_origin_x,
                ));
            }

            frames.extend(chosen_frames);
        }

        let canvas_width = frames.iter().map(|f| f.origin.x + f.size.width).fold(0.0_f64, f64::max);
        let canvas_height = frames.iter().map(|f| f.origin.y + f.size.height).fold(0.0_f64, f64::max);

        LayoutPlan {
            canvas_size: Size::new(canvas_width, canvas_height),
            frames,
            blocks: Vec::new(),
            markers: Vec::new(),
            separators,
            service_zones,
            scenarios,
        }
    }

    fn procedure_adjacency(&self, document: &MarkupDocument) -> Adjacency {
        let mut raw: Vec<(String, Vec<String>)> = document
            .procedure_graph
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let named: HashSet<&str> = document.procedure_graph.keys().map(String::as_str).collect();
        for procedure in &document.procedures {
            if !named.contains(procedure.procedure_id.as_str()) {
                // isolated procedure: self-loop so it still forms its own
                // weak component instead of vanishing from the adjacency.
                raw.push((procedure.procedure_id.clone(), vec![procedure.procedure_id.clone()]));
            }
        }
        build_adjacency(raw)
    }

    fn order_hints(&self, document: &MarkupDocument) -> IndexMap<String, usize> {
        let mut hints = IndexMap::new();
        for (index, key) in document.procedure_graph.keys().enumerate() {
            hints.entry(key.clone()).or_insert(index);
        }
        let base = hints.len();
        for (index, procedure) in document.procedures.iter().enumerate() {
            hints.entry(procedure.procedure_id.clone()).or_insert(base + index);
        }
        hints
    }

    fn place_linear(
        &self,
        procedures: &[&jmap_model::Procedure],
        levels: &IndexMap<String, usize>,
        origin_x: f64,
        node_size: Size,
    ) -> Vec<FramePlacement> {
        let mut by_level: IndexMap<usize, Vec<String>> = IndexMap::new();
        for procedure in procedures {
            let level = *levels.get(&procedure.procedure_id).unwrap_or(&0);
            by_level.entry(level).or_default().push(procedure.procedure_id.clone());
        }
        for ids in by_level.values_mut() {
            ids.sort();
        }

        let mut frames = Vec::new();
        for (level, ids) in &by_level {
            for (row, id) in ids.iter().enumerate() {
                let x = origin_x + *level as f64 * (node_size.width + self.config.gap_x);
                let y = row as f64 * (node_size.height + self.config.gap_y);
                let procedure = procedures.iter().find(|p| &p.procedure_id == id).unwrap();
                frames.push(FramePlacement {
                    frame_id: id.clone(),
                    title: procedure.display_name().to_string(),
                    origin: Point::new(x, y),
                    size: node_size,
                });
            }
        }
        frames
    }

    fn place_service_graph_nodes(
        &self,
        procedures: &[&jmap_model::Procedure],
        levels: &IndexMap<String, usize>,
        origin_x: f64,
        node_size: Size,
    ) -> Vec<FramePlacement> {
        self.place_linear(procedures, levels, origin_x, node_size)
            .into_iter()
            .map(|mut frame| {
                let procedure = procedures.iter().find(|p| p.procedure_id == frame.frame_id).unwrap();
                let scale = 1.0 + 0.05 * (procedure.procedure_count().saturating_sub(1)) as f64;
                frame.size = node_size.scaled(scale);
                frame
            })
            .collect()
    }

    fn place_service_bands(
        &self,
        procedures: &[&jmap_model::Procedure],
        levels: &IndexMap<String, usize>,
        services: &[crate::service::ServiceInfo],
        origin_x: f64,
        node_size: Size,
    ) -> Vec<FramePlacement> {
        let mut assigned: IndexMap<String, String> = IndexMap::new();
        let mut load: IndexMap<String, usize> = services.iter().map(|s| (s.service_key.clone(), 0)).collect();
        for procedure in procedures {
            let keys = procedure.service_keys();
            let chosen = keys
                .iter()
                .min_by_key(|k| *load.get(*k).unwrap_or(&usize::MAX))
                .cloned()
                .unwrap_or_default();
            *load.entry(chosen.clone()).or_insert(0) += 1;
            assigned.insert(procedure.procedure_id.clone(), chosen);
        }

        let top_padding = self.config.zone_pad_y + self.config.zone_label_height + self.config.zone_label_gap;
        let bottom_padding = self.config.zone_pad_y;

        let mut frames = Vec::new();
        let mut band_y = 0.0_f64;
        for service in services {
            let members: Vec<&jmap_model::Procedure> = procedures
                .iter()
                .filter(|p| assigned.get(&p.procedure_id) == Some(&service.service_key))
                .copied()
                .collect();
            let mut by_level: IndexMap<usize, Vec<String>> = IndexMap::new();
            for procedure in &members {
                let level = *levels.get(&procedure.procedure_id).unwrap_or(&0);
                by_level.entry(level).or_default().push(procedure.procedure_id.clone());
            }
            for ids in by_level.values_mut() {
                ids.sort();
            }
            let max_per_level = by_level.values().map(Vec::len).max().unwrap_or(0);
            let band_height = max_per_level as f64 * (node_size.height + self.config.gap_y)
                + top_padding
                + bottom_padding;

            for (level, ids) in &by_level {
                for (row, id) in ids.iter().enumerate() {
                    let x = origin_x + *level as f64 * (node_size.width + self.config.gap_x);
                    let y = band_y + top_padding + row as f64 * (node_size.height + self.config.gap_y);
                    let procedure = members.iter().find(|p| &p.procedure_id == id).unwrap();
                    frames.push(FramePlacement {
                        frame_id: id.clone(),
                        title: procedure.display_name().to_string(),
                        origin: Point::new(x, y),
                        size: node_size,
                    });
                }
            }
            band_y += band_height;
        }
        frames
    }

    fn build_separator(&self, x_hint: f64, frames: &[FramePlacement]) -> SeparatorPlacement {
        let min_y = frames.iter().map(|f| f.origin.y).fold(f64::MAX, f64::min).max(0.0);
        let max_y = frames.iter().map(|f| f.origin.y + f.size.height).fold(0.0_f64, f64::max);
        let midpoint_y = (min_y + max_y) / 2.0;
        let min_x = frames.iter().map(|f| f.origin.x).fold(f64::MAX, f64::min);
        let max_x = frames.iter().map(|f| f.origin.x + f.size.width).fold(0.0_f64, f64::max);
        let length = (max_x - min_x) + 2.0 * self.config.separator_margin_x;
        SeparatorPlacement {
            orientation: SeparatorOrientation::Horizontal,
            origin: Point::new(x_hint - self.config.separator_margin_x, midpoint_y),
            length,
        }
    }

    fn build_scenario_panel(
        &self,
        component_index: usize,
        procedures: &[&jmap_model::Procedure],
        local_adjacency: &Adjacency,
        component_origin_x: f64,
    ) -> ScenarioPlacement {
        let title = if component_index == 0 {
            "Граф".to_string()
        } else {
            format!("Граф {}", component_index + 1)
        };

        let acyclic = jmap_graph::find_cycle_path(local_adjacency).is_none();
        let connected = is_weakly_connected(local_adjacency);
        let mut properties = IndexMap::new();
        properties.insert("acyclic".to_string(), acyclic.to_string());
        properties.insert("weakly_connected".to_string(), connected.to_string());
        if let Some(path) = jmap_graph::find_cycle_path(local_adjacency) {
            properties.insert("cycle".to_string(), path.join(" -> "));
        }

        let starts: usize = procedures.iter().map(|p| p.start_block_ids.len()).sum();
        let ends: usize = procedures.iter().map(|p| p.end_block_ids.len()).sum();
        let branches: usize = procedures
            .iter()
            .flat_map(|p| p.branches.values())
            .map(Vec::len)
            .sum();
        let mut complexity_counts = IndexMap::new();
        complexity_counts.insert("starts".to_string(), starts);
        complexity_counts.insert("ends".to_string(), ends);
        complexity_counts.insert("branches".to_string(), branches);

        let cycle_text = properties.get("cycle").cloned();
        let body_text = [
            format!("Ацикличный: {}", if acyclic { "да" } else { "нет" }),
            format!("Слабо связный: {}", if connected { "да" } else { "нет" }),
            String::new(),
            String::new(),
            "Комплексность:".to_string(),
            format!("- Входы: {starts}"),
            format!("- Выходы: {ends}"),
            format!("- Ветвления: {branches}"),
        ]
        .join("\n");

        let services = collect_services(&procedures.iter().map(|p| (**p).clone()).collect::<Vec<_>>());
        let mut procedure_ids: Vec<String> = procedures.iter().map(|p| p.procedure_id.clone()).collect();
        procedure_ids.sort();
        let procedures_text = render_procedures_text(&services);
        let procedures_block = ScenarioProceduresBlock {
            origin: Point::new(component_origin_x - self.config.scenario_width - self.config.gap_x, 0.0),
            size: Size::new(self.config.scenario_width, services.len() as f64 * 28.0 + 40.0),
            procedure_ids,
            text: procedures_text,
        };

        let is_member = |id: &str| procedures.iter().any(|p| p.procedure_id == id && p.is_intersection());
        let chains = merge_chains(local_adjacency, is_member, self.config.merge_node_min_chain_size);
        let mut merge_chain_ids: Vec<String> = chains.keys().cloned().collect();
        merge_chain_ids.sort();
        let merge_text = render_merge_text(&chains, procedures);
        let merge_nodes_block = ScenarioMergeNodesBlock {
            origin: Point::new(
                component_origin_x - self.config.scenario_width - self.config.gap_x,
                procedures_block.size.height + self.config.gap_y,
            ),
            size: Size::new(self.config.scenario_width, merge_chain_ids.len() as f64 * 24.0 + 24.0),
            merge_chain_ids,
            text: merge_text,
        };

        ScenarioPlacement {
            scenario_id: format!("scenario-{component_index}"),
            origin: Point::new(component_origin_x - self.config.scenario_width - self.config.gap_x, 0.0),
            size: Size::new(
                self.config.scenario_width,
                procedures_block.size.height + merge_nodes_block.size.height + self.config.gap_y,
            ),
            title_text: title,
            body_text,
            cycle_text,
            properties,
            complexity_counts,
            procedures_block,
            merge_nodes_block,
        }
    }
}

/// Render the "team header, underlined" plus per-service tile listing
/// (spec §4.3 step 8) as plain text: one team name per line, followed by
/// a `"- service_name"` line per service in that team.
fn render_procedures_text(services: &[crate::service::ServiceInfo]) -> String {
    let mut lines = vec!["Разметки:".to_string(), String::new()];
    if services.is_empty() {
        lines.push("- (нет данных)".to_string());
        return lines.join("\n");
    }
    let mut last_team: Option<&str> = None;
    for service in services {
        if last_team != Some(service.team_name.as_str()) {
            if last_team.is_some() {
                lines.push(String::new());
            }
            lines.push(service.team_name.clone());
            last_team = Some(service.team_name.as_str());
        }
        lines.push(format!("- {}", service.service_name));
    }
    lines.join("\n")
}

/// Render the merge-nodes sub-panel: one `"> [Team] Service x ...:"`
/// header per distinct contributing-service set, followed by globally
/// numbered `"(i) procedure_name"` lines for its members.
fn render_merge_text(chains: &IndexMap<String, String>, procedures: &[&jmap_model::Procedure]) -> String {
    if chains.is_empty() {
        return String::new();
    }

    let mut groups: IndexMap<String, Vec<&str>> = IndexMap::new();
    for (member, group_id) in chains {
        groups.entry(group_id.clone()).or_default().push(member.as_str());
    }
    let mut ordered: Vec<(&String, &mut Vec<&str>)> = groups.iter_mut().collect();
    ordered.sort_by(|a, b| a.0.cmp(b.0));

    let mut lines = vec!["Узлы слияния:".to_string()];
    let mut counter = 1usize;
    for (idx, (_, members)) in ordered.iter_mut().enumerate() {
        members.sort();
        let mut tokens: Vec<(String, String)> = members
            .iter()
            .flat_map(|id| {
                let procedure = procedures.iter().find(|p| p.procedure_id == *id);
                let team = procedure.and_then(|p| p.team_name()).unwrap_or_else(|| "Unknown team".to_string());
                let services = procedure.map(|p| p.service_keys()).unwrap_or_default();
                if services.is_empty() {
                    vec![(team, "Unknown service".to_string())]
                } else {
                    services.into_iter().map(|s| (team.clone(), s)).collect()
                }
            })
            .collect();
        tokens.sort_by_key(|(team, service)| (team.to_lowercase(), service.to_lowercase()));
        tokens.dedup();
        let label = tokens
            .iter()
            .map(|(team, service)| format!("[{team}] {service}"))
            .collect::<Vec<_>>()
            .join(" x ");

        if idx > 0 {
            lines.push(String::new());
        }
        lines.push(format!("> {label}:"));
        for id in members.iter() {
            let name = procedures
                .iter()
                .find(|p| p.procedure_id == *id)
                .map(|p| p.display_name().to_string())
                .unwrap_or_else(|| id.to_string());
            lines.push(format!("({counter}) {name}"));
            counter += 1;
        }
    }
    lines.join("\n")
}

fn restrict(adjacency: &Adjacency, members: &[String]) -> Adjacency {
    let member_set: HashSet<&str> = members.iter().map(String::as_str).collect();
    let raw: Vec<(String, Vec<String>)> = adjacency
        .iter()
        .filter(|(k, _)| member_set.contains(k.as_str()))
        .map(|(k, v)| (k.clone(), v.iter().filter(|t| member_set.contains(t.as_str())).cloned().collect()))
        .collect();
    build_adjacency(raw)
}

/// Edges `(u, v)` whose target has an order hint no later than its
/// source's: these close a cycle relative to the declared draw order and
/// are excluded from the levelization DAG.
fn feedback_edges(adjacency: &Adjacency, order_hint: &IndexMap<String, usize>) -> HashSet<(String, String)> {
    let mut feedback = HashSet::new();
    for (source, targets) in adjacency {
        let source_hint = *order_hint.get(source).unwrap_or(&0);
        for target in targets {
            let target_hint = *order_hint.get(target).unwrap_or(&0);
            if target_hint <= source_hint {
                feedback.insert((source.clone(), target.clone()));
            }
        }
    }
    feedback
}

fn remove_edges(adjacency: &Adjacency, removed: &HashSet<(String, String)>) -> Adjacency {
    let raw: Vec<(String, Vec<String>)> = adjacency
        .iter()
        .map(|(source, targets)| {
            let kept = targets
                .iter()
                .filter(|t| !removed.contains(&(source.clone(), (*t).clone())))
                .cloned()
                .collect();
            (source.clone(), kept)
        })
        .collect();
    build_adjacency(raw)
}

fn service_zone_rects(
    services: &[crate::service::ServiceInfo],
    procedures: &[&jmap_model::Procedure],
    frame_lookup: &IndexMap<String, FramePlacement>,
    config: &LayoutConfig,
) -> Vec<(String, Rect)> {
    services
        .iter()
        .filter_map(|service| {
            let members: Vec<&FramePlacement> = procedures
                .iter()
                .filter(|p| p.service_keys().contains(&service.service_key))
                .filter_map(|p| frame_lookup.get(&p.procedure_id))
                .collect();
            bounding_rect(&members).map(|rect| {
                (
                    service.service_key.clone(),
                    inflate(rect, config.zone_pad_x, config.zone_pad_y + config.zone_label_height + config.zone_label_gap),
                )
            })
        })
        .collect()
}

fn build_service_zones(
    services: &[crate::service::ServiceInfo],
    procedures: &[&jmap_model::Procedure],
    frame_lookup: &IndexMap<String, FramePlacement>,
    config: &LayoutConfig,
) -> Vec<ServiceZonePlacement> {
    let rects = service_zone_rects(services, procedures, frame_lookup, config);
    let mut depths: Vec<usize> = vec![0; rects.len()];
    for i in 0..rects.len() {
        for j in 0..rects.len() {
            if i != j && rects[j].1.contains(&rects[i].1, EPS) {
                depths[i] += 1;
            }
        }
    }

    rects
        .into_iter()
        .zip(depths)
        .map(|((service_key, rect), depth)| {
            let extra_x = depth as f64 * config.zone_border_gap_x;
            let extra_y = depth as f64 * config.zone_border_gap_y;
            let service = services.iter().find(|s| s.service_key == service_key).unwrap();
            ServiceZonePlacement {
                service_name: service.service_name.clone(),
                origin: Point::new(rect.origin.x - extra_x, rect.origin.y - extra_y),
                size: Size::new(rect.size.width + 2.0 * extra_x, rect.size.height + 2.0 * extra_y),
                depth,
                color: Some(service.color.clone()),
            }
        })
        .collect()
}

fn bounding_rect(frames: &[&FramePlacement]) -> Option<Rect> {
    if frames.is_empty() {
        return None;
    }
    let min_x = frames.iter().map(|f| f.origin.x).fold(f64::MAX, f64::min);
    let min_y = frames.iter().map(|f| f.origin.y).fold(f64::MAX, f64::min);
    let max_x = frames.iter().map(|f| f.origin.x + f.size.width).fold(f64::MIN, f64::max);
    let max_y = frames.iter().map(|f| f.origin.y + f.size.height).fold(f64::MIN, f64::max);
    Some(Rect::new(Point::new(min_x, min_y), Size::new(max_x - min_x, max_y - min_y)))
}

fn inflate(rect: Rect, pad_x: f64, pad_y_top: f64) -> Rect {
    Rect::new(
        Point::new(rect.origin.x - pad_x, rect.origin.y - pad_y_top),
        Size::new(rect.size.width + 2.0 * pad_x, rect.size.height + pad_y_top + pad_y_top / 2.0),
    )
}
