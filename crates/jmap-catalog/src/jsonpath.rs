//! Dotted-path field resolution over raw JSON, and the "stringify" policy
//! used to project a resolved value down to a catalog field's scalar
//! string representation.

use serde_json::Value;

/// Walk `path` (dot-separated keys, e.g. `"finedog_unit_meta.team_name"`)
/// through `root`. Any missing key or non-object intermediate yields
/// `None` rather than an error: catalog field resolution is best-effort.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Scalars trim+stringify; lists become a comma-joined string of their
/// own stringified elements; objects serialize to canonical (sorted-key)
/// JSON so the same logical value always stringifies identically.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(", "),
        Value::Object(_) => canonical_json(value),
    }
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let entries: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{:?}:{}", k, canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", entries.join(","))
        }
        Value::Array(items) => {
            format!("[{}]", items.iter().map(canonical_json).collect::<Vec<_>>().join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_dotted_path() {
        let root = json!({"finedog_unit_meta": {"team_name": "Alpha"}});
        assert_eq!(resolve(&root, "finedog_unit_meta.team_name"), Some(&json!("Alpha")));
    }

    #[test]
    fn missing_path_resolves_to_none() {
        let root = json!({"a": {}});
        assert_eq!(resolve(&root, "a.b.c"), None);
    }

    #[test]
    fn stringify_joins_list_elements_with_comma() {
        assert_eq!(stringify(&json!(["a", "b"])), "a, b");
    }

    #[test]
    fn stringify_trims_string_scalars() {
        assert_eq!(stringify(&json!("  hi  ")), "hi");
    }
}
