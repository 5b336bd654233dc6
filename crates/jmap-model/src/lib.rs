//! Markup document schema, end-type normalization, and the layout/geometry
//! record types shared across the journey-map pipeline.
//!
//! This crate owns the data model only: parsing and validation of
//! [`MarkupDocument`]/[`Procedure`], the [`EndType`] alphabet and its merge
//! rule, plane geometry ([`Point`]/[`Size`]/[`Rect`]), and the placement
//! records a layout engine produces ([`LayoutPlan`] and friends). Graph
//! algorithms, layout engines, and diagram rendering live downstream in
//! `jmap-graph`, `jmap-layout`, and `jmap-diagram` respectively.

mod document;
mod end_type;
mod error;
mod geometry;
mod layout_plan;
mod procedure;

pub use document::{FinedogUnitMeta, MarkupDocument, ResolvedBlockGraphEdge, BLOCK_GRAPH_INITIAL_SUFFIX};
pub use end_type::{EndType, END_BLOCK_SEPARATOR};
pub use error::{KeyPath, MarkupError, MarkupResult};
pub use geometry::{Point, Rect, Size};
pub use layout_plan::{
    FramePlacement, LayoutPlan, MarkerKind, MarkerPlacement, ScenarioMergeNodesBlock,
    ScenarioPlacement, ScenarioProceduresBlock, SeparatorOrientation, SeparatorPlacement,
    ServiceZonePlacement,
};
pub use procedure::Procedure;
