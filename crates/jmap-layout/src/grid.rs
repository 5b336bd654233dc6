//! Per-procedure block/marker placement on a left-to-right layered grid.
//! Levels come from forward relaxation; rows within a level are chosen to
//! minimize the vertical distance to each block's predecessors.

use indexmap::IndexMap;

use jmap_graph::{build_adjacency, levelize, Adjacency};
use jmap_model::{BlockPlacement, FramePlacement, LayoutPlan, MarkerKind, MarkerPlacement, MarkupDocument, Point, Procedure, Size};

use crate::config::LayoutConfig;

pub struct GridLayoutEngine {
    config: LayoutConfig,
}

impl GridLayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Build placements for every procedure in `document`, laid out in
    /// left-to-right lanes ordered by cross-procedure level.
    pub fn build_plan(&self, document: &MarkupDocument) -> LayoutPlan {
        let mut frames = Vec::new();
        let mut blocks = Vec::new();
        let mut markers = Vec::new();

        let mut sizing: IndexMap<String, Size> = IndexMap::new();
        let mut rows_by_proc: IndexMap<String, IndexMap<String, usize>> = IndexMap::new();
        let mut levels_by_proc: IndexMap<String, IndexMap<String, usize>> = IndexMap::new();

        for procedure in &document.procedures {
            let adjacency = procedure_adjacency(procedure);
            let levels = levelize(&adjacency, &procedure.start_block_ids, &procedure.end_block_ids);
            let rows = assign_rows(&adjacency, &levels);

            let max_level = levels.values().copied().max().unwrap_or(0);
            let cols = max_level + 1;
            let mut level_counts: IndexMap<usize, usize> = IndexMap::new();
            for level in levels.values() {
                *level_counts.entry(*level).or_insert(0) += 1;
            }
            let row_count = level_counts.values().copied().max().unwrap_or(1);

            let frame_width = self.config.padding * 2.0
                + cols as f64 * self.config.block_size.width
                + (cols.saturating_sub(1)) as f64 * self.config.gap_x
                + self.config.marker_size.width;
            let frame_height = self.config.padding * 2.0
                + row_count as f64 * self.config.block_size.height
                + (row_count.saturating_sub(1)) as f64 * self.config.gap_y;

            sizing.insert(procedure.procedure_id.clone(), Size::new(frame_width, frame_height));
            rows_by_proc.insert(procedure.procedure_id.clone(), rows);
            levels_by_proc.insert(procedure.procedure_id.clone(), levels);
        }

        let procedure_levels = compute_procedure_levels(document);
        let lane_span = sizing
            .values()
            .map(|s| s.width)
            .fold(0.0_f64, f64::max)
            + self.config.lane_gap;

        for procedure in &document.procedures {
            let proc_level = *procedure_levels.get(&procedure.procedure_id).unwrap_or(&0);
            let frame_size = sizing[&procedure.procedure_id];
            let frame_origin = Point::new(proc_level as f64 * lane_span, 0.0);
            frames.push(FramePlacement {
                frame_id: procedure.procedure_id.clone(),
                title: procedure.display_name().to_string(),
                origin: frame_origin,
                size: frame_size,
            });

            let levels = &levels_by_proc[&procedure.procedure_id];
            let rows = &rows_by_proc[&procedure.procedure_id];
            let starts: std::collections::HashSet<&String> = procedure.start_block_ids.iter().collect();
            let end_types = &procedure.end_block_types;

            let mut placed: IndexMap<String, (Point, Size)> = IndexMap::new();
            for block_id in procedure.block_ids() {
                let level = *levels.get(&block_id).unwrap_or(&0);
                let row = *rows.get(&block_id).unwrap_or(&0);
                let x = frame_origin.x
                    + self.config.padding
                    + level as f64 * (self.config.block_size.width + self.config.gap_x);
                let y = frame_origin.y
                    + self.config.padding
                    + row as f64 * (self.config.block_size.height + self.config.gap_y);
                let origin = Point::new(x, y);
                placed.insert(block_id.clone(), (origin, self.config.block_size));
                blocks.push(BlockPlacement {
                    block_id: block_id.clone(),
                    label: block_id.clone(),
                    origin,
                    size: self.config.block_size,
                    level,
                    is_start: starts.contains(&block_id),
                    end_type: end_types.get(&block_id).copied(),
                });
            }

            for start_id in &procedure.start_block_ids {
                let Some((origin, size)) = placed.get(start_id) else { continue };
                let x = origin.x - (self.config.marker_size.width + self.config.gap_x / 2.0);
                let y = origin.y + (size.height - self.config.marker_size.height) / 2.0;
                markers.push(MarkerPlacement {
                    marker_id: format!("{}|start|{start_id}", procedure.procedure_id),
                    kind: MarkerKind::Start,
                    origin: Point::new(x, y),
                    size: self.config.marker_size,
                    end_type: None,
                });
            }

            for end_id in &procedure.end_block_ids {
                let Some((origin, size)) = placed.get(end_id) else { continue };
                let x = origin.x + size.width + self.config.gap_x / 2.0;
                let y = origin.y + (size.height - self.config.marker_size.height) / 2.0;
                markers.push(MarkerPlacement {
                    marker_id: format!("{}|end|{end_id}", procedure.procedure_id),
                    kind: MarkerKind::End,
                    origin: Point::new(x, y),
                    size: self.config.marker_size,
                    end_type: end_types.get(end_id).copied(),
                });
            }
        }

        let canvas_width = frames.iter().map(|f| f.origin.x + f.size.width).fold(0.0_f64, f64::max);
        let canvas_height = frames.iter().map(|f| f.origin.y + f.size.height).fold(0.0_f64, f64::max);

        LayoutPlan {
            canvas_size: Size::new(canvas_width, canvas_height),
            frames,
            blocks,
            markers,
            separators: Vec::new(),
            service_zones: Vec::new(),
            scenarios: Vec::new(),
        }
    }
}

fn procedure_adjacency(procedure: &Procedure) -> Adjacency {
    build_adjacency(procedure.branches.iter().map(|(k, v)| (k.clone(), v.clone())))
}

/// Assign each block a row within its level: blocks start in block-id
/// ascending order, then move to the row closest to the mean row of their
/// predecessors (lower index wins ties). Earlier levels are resolved
/// first since every predecessor sits at a strictly lower level.
fn assign_rows(adjacency: &Adjacency, levels: &IndexMap<String, usize>) -> IndexMap<String, usize> {
    let mut predecessors: IndexMap<String, Vec<String>> = IndexMap::new();
    for (source, targets) in adjacency {
        for target in targets {
            predecessors.entry(target.clone()).or_default().push(source.clone());
        }
    }

    let max_level = levels.values().copied().max().unwrap_or(0);
    let mut by_level: Vec<Vec<String>> = vec![Vec::new(); max_level + 1];
    for (block, level) in levels {
        by_level[*level].push(block.clone());
    }
    for blocks in &mut by_level {
        blocks.sort();
    }

    let mut rows: IndexMap<String, usize> = IndexMap::new();
    for blocks in by_level {
        let mut scored: Vec<(f64, usize, String)> = blocks
            .iter()
            .enumerate()
            .map(|(initial_index, block)| {
                let preds = predecessors.get(block).cloned().unwrap_or_default();
                let avg = if preds.is_empty() {
                    f64::MAX
                } else {
                    let sum: usize = preds.iter().filter_map(|p| rows.get(p)).sum();
                    let count = preds.iter().filter(|p| rows.contains_key(*p)).count().max(1);
                    sum as f64 / count as f64
                };
                (avg, initial_index, block.clone())
            })
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)));
        for (row, (_, _, block)) in scored.into_iter().enumerate() {
            rows.insert(block, row);
        }
    }
    rows
}

/// Assigns each procedure a lane index from the cross-procedure edges
/// resolved out of `document.block_graph` ([`MarkupDocument::resolve_block_graph_edges`]):
/// a block owned by procedure A that targets a block owned by procedure B
/// contributes a lane edge A -> B.
fn compute_procedure_levels(document: &MarkupDocument) -> IndexMap<String, usize> {
    let mut targets_by_proc: IndexMap<String, Vec<String>> = IndexMap::new();
    for edge in document.resolve_block_graph_edges() {
        if edge.source_procedure_id != edge.target_procedure_id {
            targets_by_proc.entry(edge.source_procedure_id).or_default().push(edge.target_procedure_id);
        }
    }
    let edges: Vec<(String, Vec<String>)> = document
        .procedures
        .iter()
        .map(|p| (p.procedure_id.clone(), targets_by_proc.get(&p.procedure_id).cloned().unwrap_or_default()))
        .collect();

    let adjacency = build_adjacency(edges);
    let starts: Vec<String> = document
        .procedures
        .iter()
        .filter(|p| !p.start_block_ids.is_empty())
        .map(|p| p.procedure_id.clone())
        .collect();
    let ends: Vec<String> = document
        .procedures
        .iter()
        .filter(|p| !p.end_block_ids.is_empty())
        .map(|p| p.procedure_id.clone())
        .collect();
    levelize(&adjacency, &starts, &ends)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap as Map;

    fn doc_with_single_branch_fan_out() -> MarkupDocument {
        MarkupDocument {
            slug: "s".into(),
            markup_type: "service".into(),
            display_markup_type: None,
            finedog_unit_meta: Default::default(),
            procedures: vec![Procedure {
                procedure_id: "p1".into(),
                display_name: None,
                start_block_ids: vec!["a".into(), "b".into(), "c".into()],
                end_block_ids: vec![],
                end_block_types: Map::new(),
                branches: Map::from([
                    ("a".into(), vec!["f".into()]),
                    ("b".into(), vec!["d".into()]),
                    ("c".into(), vec!["e".into()]),
                ]),
                block_id_to_block_name: Map::new(),
                procedure_meta: Map::new(),
            }],
            block_graph: Map::new(),
            procedure_graph: Map::new(),
        }
    }

    #[test]
    fn fan_out_blocks_stay_aligned_with_their_sole_predecessor() {
        let doc = doc_with_single_branch_fan_out();
        let engine = GridLayoutEngine::new(LayoutConfig::default());
        let plan = engine.build_plan(&doc);

        let row_of = |id: &str| {
            plan.blocks.iter().find(|b| b.block_id == id).unwrap().origin.y
        };
        assert_eq!(row_of("f"), row_of("a"));
        assert_eq!(row_of("d"), row_of("b"));
        assert_eq!(row_of("e"), row_of("c"));
    }

    #[test]
    fn frame_width_reserves_marker_column() {
        let doc = doc_with_single_branch_fan_out();
        let engine = GridLayoutEngine::new(LayoutConfig::default());
        let plan = engine.build_plan(&doc);
        let frame = &plan.frames[0];
        assert!(frame.size.width > LayoutConfig::default().block_size.width * 2.0);
    }

    #[test]
    fn layout_is_deterministic_across_runs() {
        let doc = doc_with_single_branch_fan_out();
        let engine = GridLayoutEngine::new(LayoutConfig::default());
        let first = engine.build_plan(&doc);
        let second = engine.build_plan(&doc);
        assert_eq!(first, second);
    }
}
