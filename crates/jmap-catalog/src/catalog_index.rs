//! `BuildCatalogIndex`: projects raw `(path, document, payload, updated_at)`
//! tuples into sorted `CatalogItem` records.

use chrono::Utc;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use sha2::{Digest, Sha256};

use jmap_model::MarkupDocument;

use crate::jsonpath::{resolve, stringify};

/// RFC3339 timestamp for `CatalogIndex::generated_at`, stamped by the
/// caller rather than inside `build` so a single call stays a pure
/// function of its inputs.
pub fn rfc3339_now() -> String {
    Utc::now().to_rfc3339()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone)]
pub struct CatalogIndexConfig {
    pub group_by: Vec<String>,
    pub title_field: String,
    pub tag_fields: Vec<String>,
    pub sort_by: String,
    pub sort_order: SortOrder,
    pub unknown_value: String,
}

impl Default for CatalogIndexConfig {
    fn default() -> Self {
        Self {
            group_by: vec!["markup_type".to_string()],
            title_field: "finedog_unit_meta.unit_id".to_string(),
            tag_fields: Vec::new(),
            sort_by: "title".to_string(),
            sort_order: SortOrder::Ascending,
            unknown_value: "unknown".to_string(),
        }
    }
}

impl CatalogIndexConfig {
    /// `title_field`, then `tag_fields`, then `group_by`, deduplicated in
    /// that order: the fields `fields` resolves on every item.
    fn config_fields(&self) -> Vec<String> {
        let mut seen = IndexSet::new();
        for field in std::iter::once(&self.title_field).chain(self.tag_fields.iter()).chain(self.group_by.iter()) {
            if !field.is_empty() {
                seen.insert(field.clone());
            }
        }
        seen.into_iter().collect()
    }
}

const MARKUP_META_SKIP_FIELDS: [&str; 5] =
    ["service_name", "criticality_level", "team_id", "team_name", "unit_id"];

pub struct RawCatalogEntry {
    pub path: String,
    pub document: MarkupDocument,
    pub raw_payload: Value,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub scene_id: String,
    pub path: String,
    pub markup_type: String,
    pub finedog_unit_id: Option<String>,
    pub criticality_level: Option<String>,
    pub team_id: Option<String>,
    pub team_name: Option<String>,
    pub title: String,
    pub group_values: IndexMap<String, String>,
    /// `title_field`/`tag_fields`/`group_by` resolved against the raw
    /// payload, plus `criticality_level`/`team_id`/`team_name` injected if
    /// not already present under those keys.
    pub fields: IndexMap<String, String>,
    /// `finedog_unit_meta` entries not already surfaced as their own
    /// `CatalogItem` field, sorted by key.
    pub markup_meta: IndexMap<String, String>,
    pub markup_rel_path: String,
    pub excalidraw_rel_path: String,
    pub unidraw_rel_path: String,
    pub tags: Vec<String>,
    pub updated_at: String,
    pub procedure_ids: Vec<String>,
    pub block_ids: Vec<String>,
    /// procedure_id -> its block ids, sorted case-insensitively.
    pub procedure_blocks: IndexMap<String, Vec<String>>,
    pub procedure_graph: IndexMap<String, Vec<String>>,
    pub branch_block_count: u64,
    pub non_postpone_end_block_count: u64,
    pub postpone_end_block_count: u64,
}

pub struct CatalogIndex {
    pub generated_at: String,
    pub config: CatalogIndexConfig,
    pub items: Vec<CatalogItem>,
}

pub struct BuildCatalogIndex;

impl BuildCatalogIndex {
    pub fn build(entries: Vec<RawCatalogEntry>, config: &CatalogIndexConfig, generated_at: String) -> CatalogIndex {
        let mut items: Vec<CatalogItem> = entries
            .iter()
            .map(|entry| Self::project(entry, config))
            .collect();

        stable_sort_by_key(&mut items, &config.sort_by, config.sort_order, &config.unknown_value);

        CatalogIndex { generated_at, config: config.clone(), items }
    }

    fn project(entry: &RawCatalogEntry, config: &CatalogIndexConfig) -> CatalogItem {
        let document_json = entry.document.to_json().unwrap_or(Value::Null);

        let finedog_unit_id = entry.document.finedog_unit_meta.finedog_unit_id.clone();
        let scene_id = match &finedog_unit_id {
            Some(id) => id.clone(),
            None => {
                let stem = entry
                    .path
                    .rsplit('/')
                    .next()
                    .unwrap_or(&entry.path)
                    .trim_end_matches(".json");
                let slug: String = stem
                    .to_lowercase()
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
                    .collect();
                let digest = Sha256::digest(canonical_bytes(&document_json));
                let hash_prefix = hex_prefix(&digest, 10);
                format!("{slug}-{hash_prefix}")
            }
        };

        let title = resolve(&entry.raw_payload, &config.title_field)
            .or_else(|| resolve(&document_json, &config.title_field))
            .map(stringify)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| config.unknown_value.clone());

        let mut group_values = IndexMap::new();
        for field in &config.group_by {
            let value = resolve(&entry.raw_payload, field)
                .or_else(|| resolve(&document_json, field))
                .map(stringify)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| config.unknown_value.clone());
            group_values.insert(field.clone(), value);
        }

        let tags: Vec<String> = config
            .tag_fields
            .iter()
            .filter_map(|field| resolve(&entry.raw_payload, field).or_else(|| resolve(&document_json, field)))
            .map(stringify)
            .filter(|s| !s.is_empty())
            .collect();

        let mut fields: IndexMap<String, String> = IndexMap::new();
        for field in config.config_fields() {
            let value = resolve(&entry.raw_payload, &field)
                .or_else(|| resolve(&document_json, &field))
                .map(stringify)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| config.unknown_value.clone());
            fields.insert(field, value);
        }

        let markup_meta: IndexMap<String, String> = {
            let mut filtered: Vec<(String, String)> = entry
                .document
                .finedog_unit_meta
                .extra
                .iter()
                .filter(|(key, _)| !MARKUP_META_SKIP_FIELDS.contains(&key.as_str()))
                .filter_map(|(key, value)| stringify_meta(value).map(|text| (key.clone(), text)))
                .collect();
            filtered.sort_by(|a, b| a.0.cmp(&b.0));
            filtered.into_iter().collect()
        };

        let stem = entry.path.rsplit('/').next().unwrap_or(&entry.path).trim_end_matches(".json");
        let markup_rel_path = entry.path.clone();
        let excalidraw_rel_path = format!("{stem}.excalidraw");
        let unidraw_rel_path = format!("{stem}.unidraw");

        let mut procedure_ids: IndexSet<String> = IndexSet::new();
        let mut block_ids: IndexSet<String> = IndexSet::new();
        let mut procedure_blocks: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut branch_block_count = 0u64;
        let mut non_postpone_end_block_count = 0u64;
        let mut postpone_end_block_count = 0u64;
        let mut criticality_level = None;
        let mut team_id = None;
        let mut team_name = None;

        for procedure in &entry.document.procedures {
            criticality_level = criticality_level.or_else(|| procedure.criticality_level());
            team_id = team_id.or_else(|| procedure.team_id());
            team_name = team_name.or_else(|| procedure.team_name());
            procedure_ids.insert(procedure.procedure_id.clone());
            let mut own_block_ids: Vec<String> = procedure.block_ids().into_iter().collect();
            own_block_ids.sort_by_key(|id| id.to_lowercase());
            for block_id in &own_block_ids {
                block_ids.insert(block_id.clone());
            }
            procedure_blocks.entry(procedure.procedure_id.clone()).or_insert(own_block_ids);
            for targets in procedure.branches.values() {
                if targets.len() > 1 {
                    branch_block_count += 1;
                }
            }
            for end_id in &procedure.end_block_ids {
                if procedure.end_block_types.get(end_id) == Some(&jmap_model::EndType::Postpone) {
                    postpone_end_block_count += 1;
                } else {
                    non_postpone_end_block_count += 1;
                }
            }
        }

        fields.entry("criticality_level".to_string()).or_insert_with(|| criticality_level.clone().unwrap_or_else(|| config.unknown_value.clone()));
        fields.entry("team_id".to_string()).or_insert_with(|| team_id.clone().unwrap_or_else(|| config.unknown_value.clone()));
        fields.entry("team_name".to_string()).or_insert_with(|| team_name.clone().unwrap_or_else(|| config.unknown_value.clone()));

        CatalogItem {
            scene_id,
            path: entry.path.clone(),
            markup_type: entry.document.markup_type.clone(),
            finedog_unit_id,
            criticality_level,
            team_id,
            team_name,
            title,
            group_values,
            fields,
            markup_meta,
            markup_rel_path,
            excalidraw_rel_path,
            unidraw_rel_path,
            tags,
            updated_at: entry.updated_at.clone(),
            procedure_ids: procedure_ids.into_iter().collect(),
            block_ids: block_ids.into_iter().collect(),
            procedure_blocks,
            procedure_graph: entry.document.procedure_graph.clone(),
            branch_block_count,
            non_postpone_end_block_count,
            postpone_end_block_count,
        }
    }
}

/// Stringify a `finedog_unit_meta` extra value for `markup_meta`: objects
/// as compact JSON, arrays comma-joined, scalars as their own text. `None`
/// suppresses the field entirely, matching the Python filter.
fn stringify_meta(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
        Value::Array(items) => items
            .iter()
            .map(stringify)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn canonical_bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

fn hex_prefix(digest: &[u8], len: usize) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect::<String>().chars().take(len).collect()
}

fn field_value(item: &CatalogItem, field: &str, unknown_value: &str) -> String {
    match field {
        "title" => item.title.clone(),
        "updated_at" => item.updated_at.clone(),
        "markup_type" => item.markup_type.clone(),
        "finedog_unit_id" => item.finedog_unit_id.clone().unwrap_or_else(|| unknown_value.to_string()),
        other => item.group_values.get(other).cloned().unwrap_or_else(|| unknown_value.to_string()),
    }
}

fn stable_sort_by_key(items: &mut [CatalogItem], sort_by: &str, order: SortOrder, unknown_value: &str) {
    let mut indexed: Vec<(usize, String)> = items
        .iter()
        .enumerate()
        .map(|(i, item)| (i, field_value(item, sort_by, unknown_value)))
        .collect();
    indexed.sort_by(|a, b| match order {
        SortOrder::Ascending => a.1.cmp(&b.1).then(a.0.cmp(&b.0)),
        SortOrder::Descending => b.1.cmp(&a.1).then(a.0.cmp(&b.0)),
    });
    let reordered: Vec<CatalogItem> = indexed.into_iter().map(|(i, _)| items[i].clone()).collect();
    items.clone_from_slice(&reordered);
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap as Map;
    use jmap_model::Procedure;
    use serde_json::json;

    fn doc(markup_type: &str) -> MarkupDocument {
        MarkupDocument {
            slug: "s".into(),
            markup_type: markup_type.into(),
            display_markup_type: None,
            finedog_unit_meta: Default::default(),
            procedures: vec![Procedure {
                procedure_id: "p1".into(),
                display_name: None,
                start_block_ids: vec!["a".into()],
                end_block_ids: vec!["b::postpone".into()],
                end_block_types: Map::new(),
                branches: Map::from([("a".into(), vec!["b".into(), "c".into()])]),
                block_id_to_block_name: Map::new(),
                procedure_meta: Map::new(),
            }],
            block_graph: Map::new(),
            procedure_graph: Map::new(),
        }
    }

    #[test]
    fn scene_id_falls_back_to_slug_plus_hash_without_finedog_id() {
        let entry = RawCatalogEntry {
            path: "docs/checkout.json".into(),
            document: doc("service"),
            raw_payload: json!({}),
            updated_at: "2026-01-01T00:00:00Z".into(),
        };
        let index = BuildCatalogIndex::build(vec![entry], &CatalogIndexConfig::default(), "now".into());
        assert!(index.items[0].scene_id.starts_with("checkout-"));
    }

    #[test]
    fn scene_id_prefers_finedog_unit_id() {
        let mut document = doc("service");
        document.finedog_unit_meta.finedog_unit_id = Some("fd-9".into());
        let entry = RawCatalogEntry {
            path: "docs/checkout.json".into(),
            document,
            raw_payload: json!({}),
            updated_at: "2026-01-01T00:00:00Z".into(),
        };
        let index = BuildCatalogIndex::build(vec![entry], &CatalogIndexConfig::default(), "now".into());
        assert_eq!(index.items[0].scene_id, "fd-9");
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let entries = vec![
            RawCatalogEntry { path: "a.json".into(), document: doc("service"), raw_payload: json!({}), updated_at: "t".into() },
            RawCatalogEntry { path: "b.json".into(), document: doc("service"), raw_payload: json!({}), updated_at: "t".into() },
        ];
        let config = CatalogIndexConfig { sort_by: "markup_type".into(), ..CatalogIndexConfig::default() };
        let index = BuildCatalogIndex::build(entries, &config, "now".into());
        assert_eq!(index.items[0].path, "a.json");
        assert_eq!(index.items[1].path, "b.json");
    }

    #[test]
    fn postpone_ends_counted_separately_from_other_ends() {
        let entry = RawCatalogEntry {
            path: "a.json".into(),
            document: doc("service"),
            raw_payload: json!({}),
            updated_at: "t".into(),
        };
        let index = BuildCatalogIndex::build(vec![entry], &CatalogIndexConfig::default(), "now".into());
        assert_eq!(index.items[0].postpone_end_block_count, 1);
        assert_eq!(index.items[0].non_postpone_end_block_count, 0);
    }

    #[test]
    fn markup_meta_drops_skip_fields_and_sorts_the_rest() {
        let mut document = doc("service");
        document.finedog_unit_meta.extra = Map::from([
            ("service_name".to_string(), json!("checkout")),
            ("owner_email".to_string(), json!("team@example.com")),
            ("region".to_string(), json!("eu")),
        ]);
        let entry = RawCatalogEntry {
            path: "a.json".into(),
            document,
            raw_payload: json!({}),
            updated_at: "t".into(),
        };
        let index = BuildCatalogIndex::build(vec![entry], &CatalogIndexConfig::default(), "now".into());
        let meta = &index.items[0].markup_meta;
        assert!(!meta.contains_key("service_name"));
        assert_eq!(meta.get("owner_email").map(String::as_str), Some("team@example.com"));
        assert_eq!(meta.keys().collect::<Vec<_>>(), vec!["owner_email", "region"]);
    }

    #[test]
    fn procedure_blocks_are_sorted_case_insensitively_per_procedure() {
        let mut document = doc("service");
        document.procedures[0].end_block_ids = vec![];
        document.procedures[0].branches =
            Map::from([("a".into(), vec!["Zeta".into(), "beta".into(), "b".into()])]);
        let entry = RawCatalogEntry {
            path: "a.json".into(),
            document,
            raw_payload: json!({}),
            updated_at: "t".into(),
        };
        let index = BuildCatalogIndex::build(vec![entry], &CatalogIndexConfig::default(), "now".into());
        let blocks = &index.items[0].procedure_blocks["p1"];
        assert_eq!(blocks, &vec!["a".to_string(), "b".to_string(), "beta".to_string(), "Zeta".to_string()]);
    }

    #[test]
    fn rel_paths_are_derived_from_the_markup_path_stem() {
        let entry = RawCatalogEntry {
            path: "docs/checkout.json".into(),
            document: doc("service"),
            raw_payload: json!({}),
            updated_at: "t".into(),
        };
        let index = BuildCatalogIndex::build(vec![entry], &CatalogIndexConfig::default(), "now".into());
        let item = &index.items[0];
        assert_eq!(item.markup_rel_path, "docs/checkout.json");
        assert_eq!(item.excalidraw_rel_path, "checkout.excalidraw");
        assert_eq!(item.unidraw_rel_path, "checkout.unidraw");
    }

    #[test]
    fn fields_resolves_title_field_and_injects_team_defaults() {
        let entry = RawCatalogEntry {
            path: "a.json".into(),
            document: doc("service"),
            raw_payload: json!({}),
            updated_at: "t".into(),
        };
        let config = CatalogIndexConfig { title_field: "finedog_unit_meta.unit_id".into(), ..CatalogIndexConfig::default() };
        let index = BuildCatalogIndex::build(vec![entry], &config, "now".into());
        let fields = &index.items[0].fields;
        assert_eq!(fields.get("team_id").map(String::as_str), Some(config.unknown_value.as_str()));
        assert_eq!(fields.get("team_name").map(String::as_str), Some(config.unknown_value.as_str()));
    }
}
