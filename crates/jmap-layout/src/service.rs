//! Service/team membership derived from procedure metadata, and the
//! deterministic color palette used to tile service zones and legend
//! entries.

use jmap_model::Procedure;

/// Fixed 8-color palette; a service's color is its sorted-index modulo the
/// palette length, so the same service key always draws in the same
/// color across documents and runs.
pub const SERVICE_COLOR_PALETTE: [&str; 8] = [
    "#4C6EF5", "#12B886", "#F59F00", "#E64980", "#7048E8", "#15AABF", "#F76707", "#82C91E",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceInfo {
    pub service_key: String,
    pub service_name: String,
    pub team_name: String,
    pub team_id: Option<String>,
    pub color: String,
}

/// Distinct service keys referenced by `procedures`, sorted
/// case-insensitively by `(team_name, service_name, team_id)`; the order
/// service bands are drawn in.
pub fn collect_services(procedures: &[Procedure]) -> Vec<ServiceInfo> {
    use indexmap::IndexMap;

    let mut by_key: IndexMap<String, ServiceInfo> = IndexMap::new();
    for procedure in procedures {
        let team_name = procedure.team_name().unwrap_or_default();
        let team_id = procedure.team_id();
        for service_key in procedure.service_keys() {
            by_key.entry(service_key.clone()).or_insert_with(|| ServiceInfo {
                service_key: service_key.clone(),
                service_name: service_key.clone(),
                team_name: team_name.clone(),
                team_id: team_id.clone(),
                color: String::new(),
            });
        }
    }

    let mut sorted: Vec<ServiceInfo> = by_key.into_values().collect();
    sorted.sort_by(|a, b| {
        (
            a.team_name.to_lowercase(),
            a.service_name.to_lowercase(),
            a.team_id.clone().unwrap_or_default(),
        )
            .cmp(&(
                b.team_name.to_lowercase(),
                b.service_name.to_lowercase(),
                b.team_id.clone().unwrap_or_default(),
            ))
    });

    for (index, info) in sorted.iter_mut().enumerate() {
        info.color = SERVICE_COLOR_PALETTE[index % SERVICE_COLOR_PALETTE.len()].to_string();
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::json;

    fn procedure_with_service(id: &str, service: &str, team: &str) -> Procedure {
        Procedure {
            procedure_id: id.into(),
            display_name: None,
            start_block_ids: vec!["a".into()],
            end_block_ids: vec!["b".into()],
            end_block_types: IndexMap::new(),
            branches: IndexMap::from([("a".into(), vec!["b".into()])]),
            block_id_to_block_name: IndexMap::new(),
            procedure_meta: IndexMap::from([
                ("service_name".to_string(), json!(service)),
                ("team_name".to_string(), json!(team)),
            ]),
        }
    }

    #[test]
    fn services_are_sorted_by_team_then_service_case_insensitively() {
        let procs = vec![
            procedure_with_service("p1", "Payments", "Beta"),
            procedure_with_service("p2", "Loans", "Alpha"),
        ];
        let services = collect_services(&procs);
        assert_eq!(services[0].team_name, "Alpha");
        assert_eq!(services[1].team_name, "Beta");
    }

    #[test]
    fn colors_are_assigned_from_the_fixed_palette() {
        let procs = vec![procedure_with_service("p1", "Payments", "Alpha")];
        let services = collect_services(&procs);
        assert_eq!(services[0].color, SERVICE_COLOR_PALETTE[0]);
    }
}
