//! Layout output records produced by the grid and procedure-graph layout
//! engines (crate `jmap-layout`) and consumed by the diagram converter
//! (crate `jmap-diagram`). Pure data: no layout logic lives here.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::end_type::EndType;
use crate::geometry::{Point, Size};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramePlacement {
    pub frame_id: String,
    pub title: String,
    pub origin: Point,
    pub size: Size,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockPlacement {
    pub block_id: String,
    pub label: String,
    pub origin: Point,
    pub size: Size,
    pub level: usize,
    #[serde(default)]
    pub is_start: bool,
    #[serde(default)]
    pub end_type: Option<EndType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Start,
    End,
    Branch,
    Merge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerPlacement {
    pub marker_id: String,
    pub kind: MarkerKind,
    pub origin: Point,
    pub size: Size,
    #[serde(default)]
    pub end_type: Option<EndType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparatorOrientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeparatorPlacement {
    pub orientation: SeparatorOrientation,
    pub origin: Point,
    pub length: f64,
}

/// A nested service boundary on the procedure-graph canvas. Zones must
/// nest cleanly (disjoint or strictly contained, never partial overlap),
/// validated by [`crate::geometry::Rect::nests_cleanly_with`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceZonePlacement {
    pub service_name: String,
    pub origin: Point,
    pub size: Size,
    pub depth: usize,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioProceduresBlock {
    pub origin: Point,
    pub size: Size,
    pub procedure_ids: Vec<String>,
    /// Rendered "team header + per-service tile" listing, one line per tile.
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMergeNodesBlock {
    pub origin: Point,
    pub size: Size,
    pub merge_chain_ids: Vec<String>,
    /// Rendered `"> [Team] Service x ...:"` group headers plus numbered
    /// `"(i) procedure_name"` member lines.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPlacement {
    pub scenario_id: String,
    pub origin: Point,
    pub size: Size,
    pub title_text: String,
    pub body_text: String,
    pub cycle_text: Option<String>,
    pub properties: IndexMap<String, String>,
    pub complexity_counts: IndexMap<String, usize>,
    pub procedures_block: ScenarioProceduresBlock,
    pub merge_nodes_block: ScenarioMergeNodesBlock,
}

/// The full layout result for one markup document: every placed element,
/// positioned in an absolute coordinate space with the document's overall
/// bounding size already computed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutPlan {
    pub canvas_size: Size,
    pub frames: Vec<FramePlacement>,
    pub blocks: Vec<BlockPlacement>,
    pub markers: Vec<MarkerPlacement>,
    pub separators: Vec<SeparatorPlacement>,
    pub service_zones: Vec<ServiceZonePlacement>,
    pub scenarios: Vec<ScenarioPlacement>,
}

