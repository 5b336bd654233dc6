//! Catalog aggregators: project markup documents into a
//! sorted catalog index, a per-item/per-team health report, a cross-team
//! dashboard, and a merged team procedure graph. None of these touch
//! layout or rendering; they operate purely on [`jmap_model::MarkupDocument`]
//! and [`jmap_model::Procedure`] metadata.

mod catalog_health;
mod catalog_index;
mod cross_team_dashboard;
mod jsonpath;
mod team_procedure_graph;

pub use catalog_health::{
    BuildCatalogHealthReport, CatalogHealthReport, GraphHealthIssue, ItemHealth, SimilarityMatch, TeamSummary,
};
pub use catalog_index::{
    rfc3339_now, BuildCatalogIndex, CatalogIndex, CatalogIndexConfig, CatalogItem, RawCatalogEntry, SortOrder,
};
pub use cross_team_dashboard::{
    BuildCrossTeamGraphDashboard, CrossTeamGraphDashboard, LinkingProcedure, OverloadedService,
};
pub use jsonpath::{resolve, stringify};
pub use team_procedure_graph::{
    BuildTeamProcedureGraph, GraphLevel, MergedProcedure, TeamProcedureGraph, SERVICE_COLOR_PALETTE,
};
