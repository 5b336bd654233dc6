//! Facade crate tying together the journey-map pipeline: parse/validate a
//! markup document, run graph analysis, lay it out, convert the layout to
//! an abstract diagram, and optionally fold many documents into catalog
//! aggregates.
//!
//! This crate adds no behavior of its own beyond two thin convenience
//! wrappers (`layout_procedure_grid`, `layout_procedure_graph`) chaining a
//! layout engine straight into [`jmap_diagram::DiagramConverter`]; callers
//! needing finer control should drive the component crates directly.

pub use jmap_catalog as catalog;
pub use jmap_diagram as diagram;
pub use jmap_graph as graph;
pub use jmap_layout as layout;
pub use jmap_model as model;

use jmap_diagram::{DiagramConverter, Element};
use jmap_layout::{GridLayoutEngine, LayoutConfig, ProcedureGraphLayoutEngine};
use jmap_model::{LayoutPlan, MarkupDocument};

/// Build a per-procedure block grid and convert it to an abstract
/// element stream in one call.
pub fn layout_procedure_grid(document: &MarkupDocument, config: LayoutConfig) -> (LayoutPlan, Vec<Element>) {
    let plan = GridLayoutEngine::new(config).build_plan(document);
    let elements = DiagramConverter::default().convert(document, &plan);
    (plan, elements)
}

/// Build a whole-procedure component layout and convert it to an
/// abstract element stream in one call.
pub fn layout_procedure_graph(document: &MarkupDocument, config: LayoutConfig) -> (LayoutPlan, Vec<Element>) {
    let plan = ProcedureGraphLayoutEngine::new(config).build_plan(document);
    let elements = DiagramConverter::default().convert(document, &plan);
    (plan, elements)
}

