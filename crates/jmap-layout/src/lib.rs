//! Two-level layout engine: per-procedure block grids, and the
//! procedure-graph lane/zone/scenario layout built on top of them.

mod config;
mod edge_crossing;
mod grid;
mod procedure_graph;
mod service;

pub use config::LayoutConfig;
pub use edge_crossing::{edges_cross, frame_edge_endpoints, segments_intersect};
pub use grid::GridLayoutEngine;
pub use procedure_graph::ProcedureGraphLayoutEngine;
pub use service::{collect_services, ServiceInfo, SERVICE_COLOR_PALETTE};
