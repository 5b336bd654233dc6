//! The visitor that turns a `LayoutPlan` + document into the abstract
//! element stream. Build order is fixed (see module docs below each
//! stage) so two runs over identical input produce identical IDs,
//! geometry, and z-ordering.

use indexmap::IndexMap;

use jmap_graph::{build_adjacency, strongly_connected_components};
use jmap_model::{LayoutPlan, MarkerKind, MarkupDocument, Point};

use crate::element::{BaseMeta, Element, ElementKind, ElementMeta, Geometry};
use crate::ids::element_id;

pub struct DiagramConverter {
    pub schema_version: String,
}

impl Default for DiagramConverter {
    fn default() -> Self {
        Self { schema_version: "1.0".to_string() }
    }
}

impl DiagramConverter {
    pub fn new(schema_version: impl Into<String>) -> Self {
        Self { schema_version: schema_version.into() }
    }

    pub fn convert(&self, document: &MarkupDocument, plan: &LayoutPlan) -> Vec<Element> {
        let base = self.base_meta(document);
        let mut elements = Vec::new();
        let mut z = 0i64;

        let mut zones_desc = plan.service_zones.clone();
        zones_desc.sort_by(|a, b| (b.size.width * b.size.height).total_cmp(&(a.size.width * a.size.height)));
        for zone in &zones_desc {
            elements.push(Element {
                id: element_id(&["service_zone", &zone.service_name]),
                kind: ElementKind::ShapeRectangle,
                geometry: Geometry::Rect { origin: zone.origin, size: zone.size },
                base: base.clone(),
                meta: ElementMeta::ServiceZone { service_name: zone.service_name.clone(), depth: zone.depth },
                binding: None,
                z_index: z,
            });
            z -= 1;
        }

        let merge_procedure_ids: Vec<&str> = document
            .procedures
            .iter()
            .filter(|p| p.is_intersection())
            .map(|p| p.procedure_id.as_str())
            .collect();
        let mut merge_index = 0usize;

        for frame in &plan.frames {
            elements.push(Element {
                id: element_id(&["frame", &frame.frame_id]),
                kind: ElementKind::Frame,
                geometry: Geometry::Rect { origin: frame.origin, size: frame.size },
                base: base.clone(),
                meta: ElementMeta::Frame { procedure_id: frame.frame_id.clone() },
                binding: None,
                z_index: z,
            });

            if merge_procedure_ids.contains(&frame.frame_id.as_str()) {
                merge_index += 1;
                elements.push(Element {
                    id: element_id(&["intersection_highlight", &frame.frame_id]),
                    kind: ElementKind::ShapeEllipse,
                    geometry: Geometry::Ellipse { origin: frame.origin, size: frame.size },
                    base: base.clone(),
                    meta: ElementMeta::IntersectionHighlight { procedure_id: frame.frame_id.clone() },
                    binding: None,
                    z_index: z,
                });
                elements.push(Element {
                    id: element_id(&["intersection_pointer", &frame.frame_id]),
                    kind: ElementKind::Text,
                    geometry: Geometry::Rect { origin: frame.origin, size: frame.size },
                    base: base.clone(),
                    meta: ElementMeta::IntersectionPointer {
                        procedure_id: frame.frame_id.clone(),
                        index: merge_index,
                    },
                    binding: None,
                    z_index: z,
                });
            }

            if let Some(procedure) = document.procedures.iter().find(|p| p.procedure_id == frame.frame_id) {
                let label = format!(
                    "{} starts/{} branches/{} ends/{} postpones",
                    procedure.start_block_ids.len(),
                    procedure.branches.values().map(Vec::len).sum::<usize>(),
                    procedure
                        .end_block_ids
                        .iter()
                        .filter(|id| procedure.end_block_types.get(*id) != Some(&jmap_model::EndType::Postpone))
                        .count(),
                    procedure
                        .end_block_ids
                        .iter()
                        .filter(|id| procedure.end_block_types.get(*id) == Some(&jmap_model::EndType::Postpone))
                        .count(),
                );
                elements.push(Element {
                    id: element_id(&["procedure_stat", &frame.frame_id]),
                    kind: ElementKind::ShapeEllipse,
                    geometry: Geometry::Ellipse {
                        origin: Point::new(frame.origin.x, frame.origin.y + frame.size.height - 16.0),
                        size: jmap_model::Size::new(160.0, 24.0),
                    },
                    base: base.clone(),
                    meta: ElementMeta::ProcedureStat { procedure_id: frame.frame_id.clone(), label },
                    binding: None,
                    z_index: z,
                });
            }
        }

        for separator in &plan.separators {
            elements.push(Element {
                id: element_id(&["separator", &format!("{:?}", separator.origin)]),
                kind: ElementKind::Line,
                geometry: Geometry::Line {
                    start: separator.origin,
                    end: Point::new(separator.origin.x + separator.length, separator.origin.y),
                },
                base: base.clone(),
                meta: ElementMeta::Separator,
                binding: None,
                z_index: z,
            });
        }

        for scenario in &plan.scenarios {
            elements.push(Element {
                id: element_id(&["scenario_title", &scenario.scenario_id]),
                kind: ElementKind::Text,
                geometry: Geometry::Rect { origin: scenario.origin, size: jmap_model::Size::new(scenario.size.width, 28.0) },
                base: base.clone(),
                meta: ElementMeta::ScenarioTitle {
                scenario_id: scenario.scenario_id.clone(),
                text: scenario.title_text.clone(),
            },
                binding: None,
                z_index: z,
            });
            if let Some(cycle_text) = &scenario.cycle_text {
                elements.push(Element {
                    id: element_id(&["scenario_cycle", &scenario.scenario_id]),
                    kind: ElementKind::Text,
                    geometry: Geometry::Rect {
                        origin: Point::new(scenario.origin.x, scenario.origin.y + 28.0),
                        size: jmap_model::Size::new(scenario.size.width, 20.0),
                    },
                    base: base.clone(),
                    meta: ElementMeta::ScenarioCycleLine {
                        scenario_id: scenario.scenario_id.clone(),
                        text: cycle_text.clone(),
                    },
                    binding: None,
                    z_index: z,
                });
            }
            elements.push(Element {
                id: element_id(&["scenario_body", &scenario.scenario_id]),
                kind: ElementKind::TextBlock,
                geometry: Geometry::Rect { origin: scenario.origin, size: scenario.size },
                base: base.clone(),
                meta: ElementMeta::ScenarioBody {
                scenario_id: scenario.scenario_id.clone(),
                text: scenario.body_text.clone(),
            },
                binding: None,
                z_index: z,
            });
            elements.push(Element {
                id: element_id(&["scenario_procedures", &scenario.scenario_id]),
                kind: ElementKind::TextBlock,
                geometry: Geometry::Rect {
                    origin: scenario.procedures_block.origin,
                    size: scenario.procedures_block.size,
                },
                base: base.clone(),
                meta: ElementMeta::ScenarioProcedures {
                scenario_id: scenario.scenario_id.clone(),
                text: scenario.procedures_block.text.clone(),
            },
                binding: None,
                z_index: z,
            });
            if !scenario.merge_nodes_block.merge_chain_ids.is_empty() {
                elements.push(Element {
                    id: element_id(&["scenario_merge_nodes", &scenario.scenario_id]),
                    kind: ElementKind::TextBlock,
                    geometry: Geometry::Rect {
                        origin: scenario.merge_nodes_block.origin,
                        size: scenario.merge_nodes_block.size,
                    },
                    base: base.clone(),
                    meta: ElementMeta::ScenarioMergeNodes {
                    scenario_id: scenario.scenario_id.clone(),
                    text: scenario.merge_nodes_block.text.clone(),
                },
                    binding: None,
                    z_index: z,
                });
            }
        }

        let frame_lookup: IndexMap<String, &jmap_model::FramePlacement> =
            plan.frames.iter().map(|f| (f.frame_id.clone(), f)).collect();
        let procedure_cycle_edges = cycle_edge_set(&document.procedure_graph);
        for (source, targets) in &document.procedure_graph {
            let Some(source_frame) = frame_lookup.get(source) else { continue };
            for target in targets {
                let Some(target_frame) = frame_lookup.get(target) else { continue };
                let is_cycle = procedure_cycle_edges.contains(&(source.clone(), target.clone()));
                elements.push(self.flow_edge(source, target, source_frame, target_frame, is_cycle, &base, z));
            }
        }

        for procedure in &document.procedures {
            let cycle_edges = cycle_edge_set(&procedure.branches);
            let block_lookup: IndexMap<&String, &jmap_model::BlockPlacement> =
                plan.blocks.iter().map(|b| (&b.block_id, b)).collect();
            for (source, targets) in &procedure.branches {
                let Some(source_block) = block_lookup.get(source) else { continue };
                for target in targets {
                    let Some(target_block) = block_lookup.get(target) else { continue };
                    let is_cycle = cycle_edges.contains(&(source.clone(), target.clone()));
                    elements.push(self.block_edge(source, target, source_block, target_block, is_cycle, &base, z));
                }
            }
        }

        let block_lookup: IndexMap<&String, &jmap_model::BlockPlacement> =
            plan.blocks.iter().map(|b| (&b.block_id, b)).collect();
        for edge in document.resolve_block_graph_edges() {
            let Some(source_block) = block_lookup.get(&edge.source_block_id) else { continue };
            let Some(target_block) = block_lookup.get(&edge.target_block_id) else { continue };
            elements.push(self.block_edge(
                &edge.source_block_id,
                &edge.target_block_id,
                source_block,
                target_block,
                false,
                &base,
                z,
            ));
        }

        for marker in &plan.markers {
            let kind_tag = match marker.kind {
                MarkerKind::Start => "start_marker",
                MarkerKind::End => "end_marker",
                _ => "marker",
            };
            elements.push(Element {
                id: element_id(&["marker", kind_tag, &marker.marker_id]),
                kind: ElementKind::ShapeEllipse,
                geometry: Geometry::Ellipse { origin: marker.origin, size: marker.size },
                base: base.clone(),
                meta: match marker.kind {
                    MarkerKind::Start => ElementMeta::StartMarker {
                        procedure_id: String::new(),
                        block_id: marker.marker_id.clone(),
                    },
                    _ => ElementMeta::EndMarker {
                        procedure_id: String::new(),
                        block_id: marker.marker_id.clone(),
                        end_type: marker.end_type,
                    },
                },
                binding: None,
                z_index: z,
            });
        }

        if let Some(first_frame) = plan.frames.first() {
            let center = Point::new(
                first_frame.origin.x + first_frame.size.width / 2.0,
                first_frame.origin.y + first_frame.size.height / 2.0,
            );
            translate_all(&mut elements, -center.x, -center.y);
        }

        elements
    }

    fn base_meta(&self, document: &MarkupDocument) -> BaseMeta {
        let types: std::collections::HashSet<&str> = document
            .procedures
            .iter()
            .filter_map(|p| p.procedure_meta.get("markup_type").and_then(|v| v.as_str()))
            .collect();
        let display_markup_type = if types.len() > 1 {
            "mixed".to_string()
        } else {
            humanize(document.display_markup_type())
        };

        BaseMeta {
            schema_version: self.schema_version.clone(),
            markup_type: document.markup_type.clone(),
            display_markup_type,
            finedog_unit_id: document.finedog_unit_meta.finedog_unit_id.clone(),
            service_name: document
                .finedog_unit_meta
                .extra
                .get("service_name")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            criticality_level: document.finedog_unit_meta.extra.get("criticality_level").and_then(|v| v.as_str()).map(str::to_string),
            team_id: document.finedog_unit_meta.extra.get("team_id").and_then(|v| v.as_str()).map(str::to_string),
            team_name: document.finedog_unit_meta.team.clone(),
        }
    }

    fn flow_edge(
        &self,
        source: &str,
        target: &str,
        source_frame: &jmap_model::FramePlacement,
        target_frame: &jmap_model::FramePlacement,
        is_cycle: bool,
        base: &BaseMeta,
        z: i64,
    ) -> Element {
        let geometry = if is_cycle {
            let start = Point::new(
                source_frame.origin.x + source_frame.size.width / 2.0,
                source_frame.origin.y + source_frame.size.height,
            );
            let end = Point::new(target_frame.origin.x, target_frame.origin.y + target_frame.size.height / 2.0);
            let bend = Point::new(start.x, end.y);
            Geometry::Polyline { points: vec![start, bend, end] }
        } else {
            Geometry::Line {
                start: Point::new(source_frame.origin.x + source_frame.size.width, source_frame.origin.y + source_frame.size.height / 2.0),
                end: Point::new(target_frame.origin.x, target_frame.origin.y + target_frame.size.height / 2.0),
            }
        };
        Element {
            id: element_id(&["procedure_edge", source, target]),
            kind: ElementKind::Arrow,
            geometry,
            base: base.clone(),
            meta: ElementMeta::Edge { source: source.to_string(), target: target.to_string(), is_cycle },
            binding: Some((element_id(&["frame", source]), element_id(&["frame", target]))),
            z_index: z,
        }
    }

    fn block_edge(
        &self,
        source: &str,
        target: &str,
        source_block: &jmap_model::BlockPlacement,
        target_block: &jmap_model::BlockPlacement,
        is_cycle: bool,
        base: &BaseMeta,
        z: i64,
    ) -> Element {
        let reverse = source_block.origin.x > target_block.origin.x || source_block.origin.y > target_block.origin.y;
        let geometry = if is_cycle && reverse {
            let start = Point::new(
                source_block.origin.x + source_block.size.width / 2.0,
                source_block.origin.y + source_block.size.height,
            );
            let end = Point::new(target_block.origin.x, target_block.origin.y + target_block.size.height / 2.0);
            let bend = Point::new(start.x, end.y);
            Geometry::Polyline { points: vec![start, bend, end] }
        } else {
            Geometry::Line {
                start: Point::new(source_block.origin.x + source_block.size.width, source_block.origin.y + source_block.size.height / 2.0),
                end: Point::new(target_block.origin.x, target_block.origin.y + target_block.size.height / 2.0),
            }
        };
        Element {
            id: element_id(&["block_edge", source, target]),
            kind: ElementKind::Arrow,
            geometry,
            base: base.clone(),
            meta: ElementMeta::Edge { source: source.to_string(), target: target.to_string(), is_cycle },
            binding: Some((element_id(&["block", source]), element_id(&["block", target]))),
            z_index: z,
        }
    }
}

fn humanize(raw: &str) -> String {
    raw.replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn cycle_edge_set(adjacency: &IndexMap<String, Vec<String>>) -> std::collections::HashSet<(String, String)> {
    let graph = build_adjacency(adjacency.iter().map(|(k, v)| (k.clone(), v.clone())));
    let components = strongly_connected_components(&graph);
    let mut in_cycle_component: std::collections::HashSet<&str> = std::collections::HashSet::new();
    for component in &components {
        if component.len() > 1 {
            for node in component {
                in_cycle_component.insert(node.as_str());
            }
        }
    }
    let mut edges = std::collections::HashSet::new();
    for (source, targets) in &graph {
        for target in targets {
            let self_loop = source == target;
            if self_loop || (in_cycle_component.contains(source.as_str()) && in_cycle_component.contains(target.as_str())) {
                edges.insert((source.clone(), target.clone()));
            }
        }
    }
    edges
}

fn translate_all(elements: &mut [Element], dx: f64, dy: f64) {
    for element in elements.iter_mut() {
        element.geometry = match &element.geometry {
            Geometry::Rect { origin, size } => Geometry::Rect { origin: origin.translated(dx, dy), size: *size },
            Geometry::Ellipse { origin, size } => Geometry::Ellipse { origin: origin.translated(dx, dy), size: *size },
            Geometry::Line { start, end } => Geometry::Line { start: start.translated(dx, dy), end: end.translated(dx, dy) },
            Geometry::Polyline { points } => {
                Geometry::Polyline { points: points.iter().map(|p| p.translated(dx, dy)).collect() }
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap as Map;
    use jmap_model::{FramePlacement, Point, Procedure, Size};

    fn document_with_cycle() -> MarkupDocument {
        MarkupDocument {
            slug: "s".into(),
            markup_type: "service".into(),
            display_markup_type: None,
            finedog_unit_meta: Default::default(),
            procedures: vec![
                Procedure {
                    procedure_id: "p1".into(),
                    display_name: None,
                    start_block_ids: vec!["a".into()],
                    end_block_ids: vec!["b".into()],
                    end_block_types: Map::new(),
                    branches: Map::from([("a".into(), vec!["b".into()])]),
                    block_id_to_block_name: Map::new(),
                    procedure_meta: Map::new(),
                },
                Procedure {
                    procedure_id: "p2".into(),
                    display_name: None,
                    start_block_ids: vec!["c".into()],
                    end_block_ids: vec!["d".into()],
                    end_block_types: Map::new(),
                    branches: Map::from([("c".into(), vec!["d".into()])]),
                    block_id_to_block_name: Map::new(),
                    procedure_meta: Map::new(),
                },
            ],
            block_graph: Map::new(),
            procedure_graph: Map::from([
                ("p1".to_string(), vec!["p2".to_string()]),
                ("p2".to_string(), vec!["p1".to_string()]),
            ]),
        }
    }

    fn plan_with_two_frames() -> LayoutPlan {
        LayoutPlan {
            canvas_size: Size::new(800.0, 400.0),
            frames: vec![
                FramePlacement { frame_id: "p1".into(), title: "p1".into(), origin: Point::new(0.0, 0.0), size: Size::new(260.0, 120.0) },
                FramePlacement { frame_id: "p2".into(), title: "p2".into(), origin: Point::new(400.0, 0.0), size: Size::new(260.0, 120.0) },
            ],
            blocks: Vec::new(),
            markers: Vec::new(),
            separators: Vec::new(),
            service_zones: Vec::new(),
            scenarios: Vec::new(),
        }
    }

    #[test]
    fn reverse_edge_of_a_two_cycle_is_marked_cycle_and_elbowed() {
        let document = document_with_cycle();
        let plan = plan_with_two_frames();
        let converter = DiagramConverter::default();
        let elements = converter.convert(&document, &plan);

        let p2_to_p1 = elements.iter().find(|e| matches!(&e.meta, ElementMeta::Edge { source, target, .. } if source == "p2" && target == "p1")).unwrap();
        assert!(matches!(&p2_to_p1.meta, ElementMeta::Edge { is_cycle: true, .. }));
        assert!(matches!(p2_to_p1.geometry, Geometry::Polyline { .. }));
    }

    #[test]
    fn frame_elements_are_emitted_for_every_placed_frame() {
        let document = document_with_cycle();
        let plan = plan_with_two_frames();
        let converter = DiagramConverter::default();
        let elements = converter.convert(&document, &plan);
        let frame_count = elements.iter().filter(|e| e.kind == ElementKind::Frame).count();
        assert_eq!(frame_count, 2);
    }

    #[test]
    fn block_graph_edges_are_drawn_between_procedures() {
        let mut document = document_with_cycle();
        document.block_graph = Map::from([("b".to_string(), vec!["c".to_string()])]);
        let plan = LayoutPlan {
            blocks: vec![
                jmap_model::BlockPlacement {
                    block_id: "b".into(),
                    label: "b".into(),
                    origin: Point::new(260.0, 0.0),
                    size: Size::new(120.0, 40.0),
                    level: 0,
                    is_start: false,
                    end_type: None,
                },
                jmap_model::BlockPlacement {
                    block_id: "c".into(),
                    label: "c".into(),
                    origin: Point::new(400.0, 0.0),
                    size: Size::new(120.0, 40.0),
                    level: 0,
                    is_start: true,
                    end_type: None,
                },
            ],
            ..plan_with_two_frames()
        };
        let converter = DiagramConverter::default();
        let elements = converter.convert(&document, &plan);

        assert!(elements
            .iter()
            .any(|e| matches!(&e.meta, ElementMeta::Edge { source, target, .. } if source == "b" && target == "c")));
    }
}
