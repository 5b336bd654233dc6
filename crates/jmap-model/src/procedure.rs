//! A single procedure (one lane of a journey map): its block graph, branch
//! table, and the normalized end-type annotations on its terminal blocks.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::end_type::EndType;
use crate::error::{KeyPath, MarkupError, MarkupResult};

/// One procedure's flowchart: a set of named blocks, directed edges between
/// them (`branches`), and the distinguished start/end blocks.
///
/// `end_block_ids` and `end_block_types` are kept in lockstep: both are
/// populated by [`Procedure::normalize`] from the raw `"block::type"`
/// suffix convention, never constructed by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub procedure_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub start_block_ids: Vec<String>,
    pub end_block_ids: Vec<String>,
    #[serde(default)]
    pub end_block_types: IndexMap<String, EndType>,
    /// block_id -> list of block_ids it branches to. A target of the literal
    /// string `"end"` is a generic terminator, not a real node, and is
    /// stripped during normalization.
    pub branches: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub block_id_to_block_name: IndexMap<String, String>,
    /// Free-form attribute bag: `service_name`/`services`, `team_name`,
    /// `team_id`, `criticality_level`, `procedure_count`, `is_intersection`.
    /// Read through the accessor methods below rather than matched on
    /// directly, since single-service and multi-service documents use
    /// different shapes (`service_name` scalar vs `services` list).
    #[serde(default)]
    pub procedure_meta: IndexMap<String, Value>,
}

impl Procedure {
    fn meta_str(&self, key: &str) -> Option<String> {
        self.procedure_meta.get(key).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Distinct service keys this procedure belongs to: the `services`
    /// list if present, else the scalar `service_name`, else empty (no
    /// service membership at all).
    pub fn service_keys(&self) -> Vec<String> {
        if let Some(Value::Array(items)) = self.procedure_meta.get("services") {
            return items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
        }
        self.meta_str("service_name").into_iter().collect()
    }

    pub fn team_name(&self) -> Option<String> {
        self.meta_str("team_name")
    }

    pub fn team_id(&self) -> Option<String> {
        self.meta_str("team_id")
    }

    pub fn criticality_level(&self) -> Option<String> {
        self.meta_str("criticality_level")
    }

    pub fn is_intersection(&self) -> bool {
        matches!(self.procedure_meta.get("is_intersection"), Some(Value::Bool(true)))
            || self.service_keys().len() > 1
    }

    /// `procedure_count` metadata used by `service_graph` scalar scaling;
    /// defaults to 1 when absent.
    pub fn procedure_count(&self) -> u64 {
        match self.procedure_meta.get("procedure_count") {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(1).max(1),
            _ => 1,
        }
    }
}

impl Procedure {
    /// Every block id referenced anywhere in the procedure: starts, ends,
    /// branch sources, and branch targets. Insertion-ordered, deduplicated.
    pub fn block_ids(&self) -> IndexSet<String> {
        let mut ids = IndexSet::new();
        for id in &self.start_block_ids {
            ids.insert(id.clone());
        }
        for id in &self.end_block_ids {
            ids.insert(id.clone());
        }
        for (source, targets) in &self.branches {
            ids.insert(source.clone());
            for target in targets {
                ids.insert(target.clone());
            }
        }
        for id in self.block_id_to_block_name.keys() {
            ids.insert(id.clone());
        }
        ids
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.procedure_id)
    }

    /// Strip `"::<type>"` suffixes from `end_block_ids`, merge duplicate
    /// suffixes with [`EndType::merge`], and drop the literal `"end"`
    /// pseudo-target from every branch list. Idempotent: normalizing an
    /// already-normalized procedure is a no-op.
    pub fn normalize(&mut self, path: &KeyPath) -> MarkupResult<()> {
        let mut base_ids: Vec<String> = Vec::with_capacity(self.end_block_ids.len());
        let mut merged: IndexMap<String, EndType> = IndexMap::new();

        for raw in &self.end_block_ids {
            let (base, end_type) = EndType::split_end_block_id(raw);
            if !merged.contains_key(&base) {
                base_ids.push(base.clone());
            }
            let existing = merged.get(&base).copied();
            merged.insert(base, EndType::merge(existing, end_type));
        }
        for (id, ty) in self.end_block_types.drain(..) {
            let existing = merged.get(&id).copied();
            if !merged.contains_key(&id) && !base_ids.contains(&id) {
                base_ids.push(id.clone());
            }
            merged.insert(id, EndType::merge(existing, ty));
        }

        self.end_block_ids = base_ids;
        self.end_block_types = merged;

        for (source, targets) in self.branches.iter_mut() {
            targets.retain(|t| t != "end");
            if source.trim().is_empty() {
                return Err(MarkupError::invalid(
                    path.0.clone(),
                    "branch source block id must not be empty",
                ));
            }
        }

        Ok(())
    }
}
