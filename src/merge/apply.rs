//! Merging flattened parameters into a JSON-shaped argument.

use heck::{ToLowerCamelCase, ToSnakeCase};
use serde_json::{Map, Number, Value};

use super::{FieldNaming, FlatParams, MergeError, MergeOptions};

/// Deep-merge `source` into `target`. Objects merge key by key, anything
/// else replaces the target value.
pub fn overlay(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.get_mut(&key) {
                    Some(existing) => overlay(existing, value),
                    None => {
                        dst.insert(key, value);
                    }
                }
            }
        }
        (dst, src) => *dst = src,
    }
}

/// Merge every parameter into `target` in place.
///
/// Keys are dotted (`filter.name`) or bracketed (`filter[name]`, `tags[]`)
/// paths. Keys that resolve to no field are inserted verbatim and left to
/// deserialization. Values are coerced to the type already present at the
/// destination.
pub fn merge(target: &mut Value, params: &FlatParams, options: &MergeOptions) -> Result<(), MergeError> {
    for (key, values) in params.iter() {
        let path = split_key(key);
        if path.is_empty() || values.is_empty() {
            continue;
        }
        merge_one(target, &path, values, options)?;
    }
    Ok(())
}

fn merge_one(
    target: &mut Value,
    path: &[&str],
    values: &[String],
    options: &MergeOptions,
) -> Result<(), MergeError> {
    // An object created from null has no schema; keys are taken verbatim.
    let mut open = target.is_null();
    if open {
        *target = Value::Object(Map::new());
    }

    let mut node = target;
    for (depth, segment) in path.iter().enumerate() {
        let Value::Object(map) = node else {
            return Err(MergeError::NotAnObject {
                path: path[..depth].join("."),
            });
        };

        let field = if open {
            segment.to_string()
        } else if let Some(field) = resolve_field(map, segment, options) {
            field
        } else {
            // Not in the skeleton (e.g. skipped when serialized); deserialization decides.
            tracing::trace!(key = %path.join("."), "Parameter has no matching field");
            open = true;
            segment.to_string()
        };

        if depth + 1 == path.len() {
            let slot = map.entry(field).or_insert(Value::Null);
            return assign(slot, values, &path.join("."), options);
        }

        let child = map.entry(field).or_insert(Value::Null);
        if child.is_null() {
            *child = Value::Object(Map::new());
            open = true;
        }
        node = child;
    }
    Ok(())
}

fn assign(slot: &mut Value, values: &[String], path: &str, options: &MergeOptions) -> Result<(), MergeError> {
    let strings = || values.iter().cloned().map(Value::String);
    // values is never empty here
    let last = values.last().map(String::as_str).unwrap_or_default();

    match slot {
        Value::Array(items) => {
            if !options.append_lists {
                items.clear();
            }
            items.extend(strings());
        }
        // A list so later values append; scalar targets take the last element.
        Value::Null => *slot = Value::Array(strings().collect()),
        Value::String(s) => *s = last.to_string(),
        Value::Bool(b) => {
            *b = parse_bool(last).ok_or_else(|| coerce(path, last, "a boolean"))?;
        }
        Value::Number(n) => {
            let expected = if n.is_f64() { "a number" } else { "an integer" };
            *n = parse_number(n, last).ok_or_else(|| coerce(path, last, expected))?;
        }
        Value::Object(_) => {
            return Err(MergeError::Unsupported {
                path: path.to_string(),
            })
        }
    }
    Ok(())
}

fn coerce(path: &str, value: &str, expected: &'static str) -> MergeError {
    MergeError::Coerce {
        path: path.to_string(),
        value: value.to_string(),
        expected,
    }
}

pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn parse_number(current: &Number, raw: &str) -> Option<Number> {
    let raw = raw.trim();
    if current.is_f64() {
        return raw.parse::<f64>().ok().and_then(Number::from_f64);
    }
    raw.parse::<i64>()
        .map(Number::from)
        .or_else(|_| raw.parse::<u64>().map(Number::from))
        .ok()
}

fn resolve_field(map: &Map<String, Value>, key: &str, options: &MergeOptions) -> Option<String> {
    if map.contains_key(key) {
        return Some(key.to_string());
    }
    for naming in &options.naming {
        let candidate = match naming {
            FieldNaming::SnakeCase => key.to_snake_case(),
            FieldNaming::LowerCamelCase => key.to_lower_camel_case(),
        };
        if map.contains_key(&candidate) {
            return Some(candidate);
        }
    }
    if options.case_insensitive {
        return map.keys().find(|k| k.eq_ignore_ascii_case(key)).cloned();
    }
    None
}

/// `a.b`, `a[b]`, `a[]` and `a[0]` style keys to path segments. Index
/// segments are dropped: list fields always append.
fn split_key(key: &str) -> Vec<&str> {
    key.split(['.', '[', ']'])
        .enumerate()
        .filter(|(i, s)| !s.is_empty() && !(*i > 0 && s.bytes().all(|b| b.is_ascii_digit())))
        .map(|(_, s)| s)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{collect, from_value};
    use crate::routing::Captures;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> FlatParams {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("a.b.c"), ["a", "b", "c"]);
        assert_eq!(split_key("a[b][c]"), ["a", "b", "c"]);
        assert_eq!(split_key("tags[]"), ["tags"]);
        assert_eq!(split_key("tags[3]"), ["tags"]);
        assert_eq!(split_key("0"), ["0"]);
    }

    #[test]
    fn test_scalar_coercion() {
        let mut target = json!({"id": 0, "ratio": 0.0, "active": false, "name": ""});
        merge(
            &mut target,
            &params(&[("id", "-42"), ("ratio", "0.5"), ("active", "true"), ("name", "bob")]),
            &MergeOptions::default(),
        )
        .unwrap();
        assert_eq!(target, json!({"id": -42, "ratio": 0.5, "active": true, "name": "bob"}));
    }

    #[test]
    fn test_coercion_failure() {
        let mut target = json!({"id": 0});
        let err = merge(&mut target, &params(&[("id", "abc")]), &MergeOptions::default()).unwrap_err();
        assert!(matches!(err, MergeError::Coerce { ref path, .. } if path == "id"));

        let mut target = json!({"id": 0});
        assert!(merge(&mut target, &params(&[("id", "1.5")]), &MergeOptions::default()).is_err());
    }

    #[test]
    fn test_lists_append() {
        let mut target = json!({"tags": ["x"]});
        let p = params(&[("tags", "a"), ("tags", "b")]);
        merge(&mut target, &p, &MergeOptions::default()).unwrap();
        assert_eq!(target, json!({"tags": ["x", "a", "b"]}));

        // not idempotent
        merge(&mut target, &p, &MergeOptions::default()).unwrap();
        assert_eq!(target["tags"].as_array().unwrap().len(), 5);

        let replace = MergeOptions {
            append_lists: false,
            ..MergeOptions::default()
        };
        merge(&mut target, &p, &replace).unwrap();
        assert_eq!(target, json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn test_field_resolution_order() {
        let mut target = json!({"user_id": "", "pageSize": 0, "Kind": ""});
        merge(
            &mut target,
            &params(&[("userId", "u1"), ("page_size", "20"), ("kind", "book")]),
            &MergeOptions::default(),
        )
        .unwrap();
        assert_eq!(target, json!({"user_id": "u1", "pageSize": 20, "Kind": "book"}));
    }

    #[test]
    fn test_scalar_intermediate_rejected() {
        let mut target = json!({"id": ""});
        let err = merge(&mut target, &params(&[("id.deeper", "2")]), &MergeOptions::default()).unwrap_err();
        assert!(matches!(err, MergeError::NotAnObject { ref path } if path == "id"));
    }

    #[test]
    fn test_unresolved_keys_inserted_verbatim() {
        let mut target = json!({"id": ""});
        merge(&mut target, &params(&[("nope", "1"), ("other.x", "3")]), &MergeOptions::default()).unwrap();
        assert_eq!(target, json!({"id": "", "nope": ["1"], "other": {"x": ["3"]}}));
    }

    #[test]
    fn test_null_field_keeps_appending() {
        let mut target = json!({"tags": null});
        merge(&mut target, &params(&[("tags", "x")]), &MergeOptions::default()).unwrap();
        merge(&mut target, &params(&[("tags", "y")]), &MergeOptions::default()).unwrap();
        assert_eq!(target, json!({"tags": ["x", "y"]}));

        // two keys naming one field in a single request
        let mut target = json!({"tags": null});
        let p = collect(&Captures::default(), Some("tags[]=x&tags=y"));
        merge(&mut target, &p, &MergeOptions::default()).unwrap();
        assert_eq!(target, json!({"tags": ["x", "y"]}));
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct Sparse {
        #[serde(skip_serializing_if = "Option::is_none")]
        verbose: Option<bool>,
        tags: Option<Vec<String>>,
        name: Option<String>,
    }

    #[test]
    fn test_optional_fields_reach_typed_argument() {
        let mut target = serde_json::to_value(Sparse::default()).unwrap();
        let p = params(&[("verbose", "true"), ("tags", "x"), ("name", "a"), ("name", "b")]);
        merge(&mut target, &p, &MergeOptions::default()).unwrap();
        merge(&mut target, &params(&[("tags", "y")]), &MergeOptions::default()).unwrap();

        let sparse: Sparse = from_value(target).unwrap();
        assert_eq!(sparse.verbose, Some(true));
        assert_eq!(sparse.tags, Some(vec!["x".to_string(), "y".to_string()]));
        assert_eq!(sparse.name.as_deref(), Some("b"));
    }

    #[test]
    fn test_nested_paths() {
        let mut target = json!({"filter": {"name": "", "limit": 0}, "meta": null});
        merge(
            &mut target,
            &params(&[("filter.name", "a"), ("filter[limit]", "5"), ("meta.k", "v"), ("meta.k", "w")]),
            &MergeOptions::default(),
        )
        .unwrap();
        assert_eq!(
            target,
            json!({"filter": {"name": "a", "limit": 5}, "meta": {"k": ["v", "w"]}})
        );
    }

    #[test]
    fn test_object_leaf_rejected() {
        let mut target = json!({"filter": {"name": ""}});
        let err = merge(&mut target, &params(&[("filter", "x")]), &MergeOptions::default()).unwrap_err();
        assert!(matches!(err, MergeError::Unsupported { .. }));
    }

    #[test]
    fn test_overlay() {
        let mut target = json!({"id": "", "page": {"size": 10, "token": ""}, "tags": []});
        overlay(&mut target, json!({"page": {"token": "abc"}, "tags": ["a"], "extra": 1}));
        assert_eq!(
            target,
            json!({"id": "", "page": {"size": 10, "token": "abc"}, "tags": ["a"], "extra": 1})
        );
    }
}
