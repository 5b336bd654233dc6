//! The abstract element stream a `DiagramConverter` emits: geometry plus a
//! role-tagged metadata variant, decoupled from any concrete drawing
//! format. A target-specific emitter maps this stream to its wire model.

use indexmap::IndexMap;
use uuid::Uuid;

use jmap_model::{EndType, Point, Size};

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Rect { origin: Point, size: Size },
    Ellipse { origin: Point, size: Size },
    Line { start: Point, end: Point },
    Polyline { points: Vec<Point> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Frame,
    ShapeRectangle,
    ShapeEllipse,
    Text,
    TextBlock,
    Line,
    Arrow,
}

/// Shared envelope fields present on (almost) every element, mirroring the
/// base-metadata merge step of the converter's build order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseMeta {
    pub schema_version: String,
    pub markup_type: String,
    pub display_markup_type: String,
    pub finedog_unit_id: Option<String>,
    pub service_name: Option<String>,
    pub criticality_level: Option<String>,
    pub team_id: Option<String>,
    pub team_name: Option<String>,
}

/// Role-tagged payload. Each variant corresponds to one element role a
/// diagram emitter needs to distinguish; `extra` carries role-specific
/// scalars that don't warrant their own field (keeps this enum from
/// growing a field per one-off attribute).
#[derive(Debug, Clone, PartialEq)]
pub enum ElementMeta {
    Frame { procedure_id: String },
    Block { procedure_id: String, block_id: String, end_type: Option<EndType> },
    BlockLabel { block_id: String, text: String },
    StartMarker { procedure_id: String, block_id: String },
    EndMarker { procedure_id: String, block_id: String, end_type: Option<EndType> },
    Edge { source: String, target: String, is_cycle: bool },
    ScenarioTitle { scenario_id: String, text: String },
    ScenarioCycleLine { scenario_id: String, text: String },
    ScenarioBody { scenario_id: String, text: String },
    ScenarioProcedures { scenario_id: String, text: String },
    ScenarioMergeNodes { scenario_id: String, text: String },
    ServiceZone { service_name: String, depth: usize },
    ServiceZoneLabel { service_name: String },
    DiagramTitle,
    IntersectionHighlight { procedure_id: String },
    IntersectionPointer { procedure_id: String, index: usize },
    ProcedureStat { procedure_id: String, label: String },
    Separator,
    Extra(IndexMap<String, String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: Uuid,
    pub kind: ElementKind,
    pub geometry: Geometry,
    pub base: BaseMeta,
    pub meta: ElementMeta,
    /// For arrows only: the shape IDs they visually connect, used by
    /// interactive editors to keep bindings intact when a shape moves.
    pub binding: Option<(Uuid, Uuid)>,
    pub z_index: i64,
}
