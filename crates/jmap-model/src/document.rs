//! The top-level markup document: a named collection of procedures sharing
//! one block graph, plus the unit metadata used to key catalog entries.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{KeyPath, MarkupError, MarkupResult};
use crate::procedure::Procedure;

pub const BLOCK_GRAPH_INITIAL_SUFFIX: &str = "::initial";

/// One `block_graph` entry resolved down to the pair of procedures it
/// actually connects, once block ownership is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedBlockGraphEdge {
    pub source_block_id: String,
    pub target_block_id: String,
    pub source_procedure_id: String,
    pub target_procedure_id: String,
}

/// Free-form unit metadata. `finedog_unit_id` is the preferred catalog key;
/// when absent, catalog builders fall back to `(markup_type, slug)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinedogUnitMeta {
    #[serde(default)]
    pub finedog_unit_id: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupDocument {
    pub slug: String,
    pub markup_type: String,
    #[serde(default)]
    pub display_markup_type: Option<String>,
    #[serde(default)]
    pub finedog_unit_meta: FinedogUnitMeta,
    pub procedures: Vec<Procedure>,
    /// block_id -> list of block_ids it initializes when entered; a
    /// `"::initial"`-suffixed key denotes the procedure's entry block and
    /// is normalized away, the plain id retained as the graph key.
    #[serde(default)]
    pub block_graph: IndexMap<String, Vec<String>>,
    /// procedure_id -> list of procedure_ids it links to; the input to the
    /// procedure-graph layout engine. Independent of `block_graph`, which
    /// operates at block granularity.
    #[serde(default)]
    pub procedure_graph: IndexMap<String, Vec<String>>,
}

impl MarkupDocument {
    pub fn display_markup_type(&self) -> &str {
        self.display_markup_type.as_deref().unwrap_or(&self.markup_type)
    }

    /// The catalog identity key: `finedog_unit_id` when present, else
    /// `(markup_type, slug)`.
    pub fn unit_key(&self) -> (String, String) {
        if let Some(id) = &self.finedog_unit_meta.finedog_unit_id {
            ("finedog_unit_id".to_string(), id.clone())
        } else {
            (self.markup_type.clone(), self.slug.clone())
        }
    }

    /// Normalize every procedure's end-type suffixes and strip the
    /// `"::initial"` marker from `block_graph` keys. Validates
    /// `procedure_id` uniqueness across the document.
    pub fn normalize(&mut self) -> MarkupResult<()> {
        let mut seen = std::collections::HashSet::new();
        for (idx, proc) in self.procedures.iter_mut().enumerate() {
            if !seen.insert(proc.procedure_id.clone()) {
                return Err(MarkupError::DuplicateProcedureId {
                    procedure_id: proc.procedure_id.clone(),
                });
            }
            let path = KeyPath::new(format!("procedures[{idx}]"));
            proc.normalize(&path)?;
        }

        let mut normalized = IndexMap::new();
        for (key, targets) in self.block_graph.drain(..) {
            let base = key
                .strip_suffix(BLOCK_GRAPH_INITIAL_SUFFIX)
                .map(str::to_string)
                .unwrap_or(key);
            normalized.entry(base).or_insert_with(Vec::new).extend(targets);
        }
        self.block_graph = normalized;

        Ok(())
    }

    /// Block ids that are procedure entry points, derived from
    /// `block_graph`'s original `"::initial"`-suffixed keys. Must be called
    /// before [`MarkupDocument::normalize`], which erases the suffix.
    pub fn block_graph_initials(&self) -> Vec<String> {
        self.block_graph
            .keys()
            .filter_map(|k| k.strip_suffix(BLOCK_GRAPH_INITIAL_SUFFIX).map(str::to_string))
            .collect()
    }

    /// Resolve `block_graph`'s block-granularity edges into cross-procedure
    /// edges: look up which procedure(s) own each source and target block,
    /// then pick the owning pair(s) `procedure_graph` actually links, falling
    /// back to same-procedure pairs (block ids reused verbatim across
    /// procedures) and finally to the reverse direction before giving up.
    /// A block owned by no procedure contributes no edge.
    pub fn resolve_block_graph_edges(&self) -> Vec<ResolvedBlockGraphEdge> {
        let mut owners: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for procedure in &self.procedures {
            for block_id in procedure.block_ids() {
                owners.entry(block_id).or_default().insert(procedure.procedure_id.clone());
            }
        }

        let mut seen: std::collections::HashSet<(String, String, String, String)> = std::collections::HashSet::new();
        let mut resolved = Vec::new();
        for (source_block_id, targets) in &self.block_graph {
            let Some(source_candidates) = owners.get(source_block_id) else { continue };
            for target_block_id in targets {
                let Some(target_candidates) = owners.get(target_block_id) else { continue };
                for (source_proc, target_proc) in
                    select_procedure_pairs(source_candidates, target_candidates, &self.procedure_graph)
                {
                    let key =
                        (source_block_id.clone(), target_block_id.clone(), source_proc.clone(), target_proc.clone());
                    if seen.insert(key) {
                        resolved.push(ResolvedBlockGraphEdge {
                            source_block_id: source_block_id.clone(),
                            target_block_id: target_block_id.clone(),
                            source_procedure_id: source_proc,
                            target_procedure_id: target_proc,
                        });
                    }
                }
            }
        }
        resolved
    }

    pub fn to_json(&self) -> MarkupResult<Value> {
        serde_json::to_value(self)
            .map_err(|e| MarkupError::invalid("document", format!("serialize failed: {e}")))
    }

    pub fn from_json(value: Value) -> MarkupResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| MarkupError::invalid("document", format!("parse failed: {e}")))
    }
}

/// When a block id is owned by exactly one procedure on each side, that is
/// the edge. Otherwise prefer pairs `procedure_graph` names directly, then
/// same-procedure pairs (reused block ids), then the reverse direction.
fn select_procedure_pairs(
    source_candidates: &IndexSet<String>,
    target_candidates: &IndexSet<String>,
    procedure_graph: &IndexMap<String, Vec<String>>,
) -> Vec<(String, String)> {
    if source_candidates.len() == 1 && target_candidates.len() == 1 {
        return vec![(
            source_candidates.iter().next().unwrap().clone(),
            target_candidates.iter().next().unwrap().clone(),
        )];
    }

    let mut sources: Vec<&String> = source_candidates.iter().collect();
    sources.sort();
    let mut targets: Vec<&String> = target_candidates.iter().collect();
    targets.sort();
    let pairs: Vec<(String, String)> =
        sources.iter().flat_map(|s| targets.iter().map(move |t| ((*s).clone(), (*t).clone()))).collect();
    if pairs.is_empty() {
        return pairs;
    }

    let adjacent = |source: &str, target: &str| {
        source != target
            && procedure_graph.get(source).map(|v| v.iter().any(|x| x == target)).unwrap_or(false)
    };

    let direct: Vec<(String, String)> = pairs.iter().filter(|(s, t)| adjacent(s, t)).cloned().collect();
    if !direct.is_empty() {
        return direct;
    }

    let mut local: Vec<String> = source_candidates.intersection(target_candidates).cloned().collect();
    local.sort();
    if !local.is_empty() {
        return local.into_iter().map(|id| (id.clone(), id)).collect();
    }

    let reverse: Vec<(String, String)> = pairs.iter().filter(|(s, t)| adjacent(t, s)).cloned().collect();
    if !reverse.is_empty() {
        return reverse;
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::end_type::EndType;

    fn sample() -> MarkupDocument {
        MarkupDocument {
            slug: "checkout-flow".into(),
            markup_type: "journey".into(),
            display_markup_type: None,
            finedog_unit_meta: FinedogUnitMeta::default(),
            procedures: vec![Procedure {
                procedure_id: "checkout".into(),
                display_name: None,
                start_block_ids: vec!["enter".into()],
                end_block_ids: vec!["confirm::exit".into()],
                end_block_types: IndexMap::new(),
                branches: IndexMap::from([("enter".into(), vec!["confirm".into()])]),
                block_id_to_block_name: IndexMap::new(),
                procedure_meta: IndexMap::new(),
            }],
            block_graph: IndexMap::from([("enter::initial".into(), vec!["confirm".into()])]),
            procedure_graph: IndexMap::new(),
        }
    }

    #[test]
    fn normalize_strips_initial_suffix_from_block_graph() {
        let mut doc = sample();
        doc.normalize().unwrap();
        assert!(doc.block_graph.contains_key("enter"));
        assert!(!doc.block_graph.contains_key("enter::initial"));
    }

    #[test]
    fn block_graph_initials_reads_suffix_before_normalize() {
        let doc = sample();
        assert_eq!(doc.block_graph_initials(), vec!["enter".to_string()]);
    }

    #[test]
    fn normalize_rejects_duplicate_procedure_ids() {
        let mut doc = sample();
        let dup = doc.procedures[0].clone();
        doc.procedures.push(dup);
        assert!(matches!(
            doc.normalize(),
            Err(MarkupError::DuplicateProcedureId { .. })
        ));
    }

    #[test]
    fn unit_key_prefers_finedog_unit_id() {
        let mut doc = sample();
        doc.finedog_unit_meta.finedog_unit_id = Some("fd-42".into());
        assert_eq!(doc.unit_key(), ("finedog_unit_id".to_string(), "fd-42".to_string()));
    }

    #[test]
    fn unit_key_falls_back_to_markup_type_and_slug() {
        let doc = sample();
        assert_eq!(doc.unit_key(), ("journey".to_string(), "checkout-flow".to_string()));
    }

    #[test]
    fn parse_serialize_parse_roundtrips() {
        let mut doc = sample();
        doc.normalize().unwrap();
        let json = doc.to_json().unwrap();
        let reparsed = MarkupDocument::from_json(json).unwrap();
        assert_eq!(doc, reparsed);
    }

    #[test]
    fn normalized_end_block_retains_type() {
        let mut doc = sample();
        doc.normalize().unwrap();
        assert_eq!(
            doc.procedures[0].end_block_types.get("confirm"),
            Some(&EndType::Exit)
        );
    }

    fn two_procedure_document() -> MarkupDocument {
        MarkupDocument {
            slug: "two".into(),
            markup_type: "journey".into(),
            display_markup_type: None,
            finedog_unit_meta: FinedogUnitMeta::default(),
            procedures: vec![
                Procedure {
                    procedure_id: "p1".into(),
                    display_name: None,
                    start_block_ids: vec!["a".into()],
                    end_block_ids: vec!["b".into()],
                    end_block_types: IndexMap::new(),
                    branches: IndexMap::from([("a".into(), vec!["b".into()])]),
                    block_id_to_block_name: IndexMap::new(),
                    procedure_meta: IndexMap::new(),
                },
                Procedure {
                    procedure_id: "p2".into(),
                    display_name: None,
                    start_block_ids: vec!["c".into()],
                    end_block_ids: vec!["d".into()],
                    end_block_types: IndexMap::new(),
                    branches: IndexMap::from([("c".into(), vec!["d".into()])]),
                    block_id_to_block_name: IndexMap::new(),
                    procedure_meta: IndexMap::new(),
                },
            ],
            block_graph: IndexMap::from([("b".to_string(), vec!["c".to_string()])]),
            procedure_graph: IndexMap::from([("p1".to_string(), vec!["p2".to_string()])]),
        }
    }

    #[test]
    fn resolves_cross_procedure_block_edge_via_owning_procedures() {
        let doc = two_procedure_document();
        let edges = doc.resolve_block_graph_edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source_block_id, "b");
        assert_eq!(edges[0].target_block_id, "c");
        assert_eq!(edges[0].source_procedure_id, "p1");
        assert_eq!(edges[0].target_procedure_id, "p2");
    }

    #[test]
    fn resolve_block_graph_edges_skips_blocks_owned_by_nobody() {
        let mut doc = two_procedure_document();
        doc.block_graph.get_mut("b").unwrap().push("ghost".to_string());
        let edges = doc.resolve_block_graph_edges();
        assert!(edges.iter().all(|e| e.target_block_id != "ghost"));
        assert_eq!(edges.len(), 1);
    }
}
