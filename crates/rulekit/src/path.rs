//! Dot-notation path engine over nested maps and lists.
//!
//! A path is a dot-separated string of segments; a segment is a map key, or
//! a non-negative decimal integer when the current node is a list. The empty
//! path denotes the root. Lookups mask missing keys, out-of-range indices
//! and type mismatches as `Null`; they never error. All operations leave the
//! input untouched and return a fresh structure.

use std::collections::BTreeMap;

use crate::value::Value;

fn split(path: &str) -> Vec<&str> {
    if path.is_empty() { Vec::new() } else { path.split('.').collect() }
}

fn parse_index(seg: &str) -> Option<usize> {
    if seg.is_empty() || !seg.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    seg.parse().ok()
}

/// Container created for a missing intermediate: numeric next segment
/// means a list, anything else a map.
fn empty_for(seg: &str) -> Value {
    if parse_index(seg).is_some() {
        Value::List(Vec::new())
    } else {
        Value::Map(BTreeMap::new())
    }
}

// ─── Get ──────────────────────────────────────────────────────────────────────

/// Walk segments left to right. Empty path returns the root.
pub fn get(root: &Value, path: &str) -> Value {
    let mut node = root;
    for seg in split(path) {
        node = match node {
            Value::Map(m) => match m.get(seg) {
                Some(v) => v,
                None => return Value::Null,
            },
            Value::List(items) => match parse_index(seg).and_then(|i| items.get(i)) {
                Some(v) => v,
                None => return Value::Null,
            },
            _ => return Value::Null,
        };
    }
    node.clone()
}

// ─── Set ──────────────────────────────────────────────────────────────────────

/// Assign `value` at `path`, creating intermediates as needed. The empty
/// path yields `value` itself. Lists grow with `Null` fillers when the
/// target index is past the end.
pub fn set(root: &Value, path: &str, value: Value) -> Value {
    let segs = split(path);
    if segs.is_empty() {
        return value;
    }
    let mut out = root.clone();
    set_in(&mut out, &segs, value);
    out
}

fn set_in(node: &mut Value, segs: &[&str], value: Value) {
    let seg = segs[0];
    let rest = &segs[1..];
    match node {
        Value::Map(m) => {
            if rest.is_empty() {
                m.insert(seg.to_string(), value);
            } else {
                let child = m.entry(seg.to_string()).or_insert_with(|| empty_for(rest[0]));
                ensure_container(child, rest[0]);
                set_in(child, rest, value);
            }
        }
        Value::List(items) => {
            match parse_index(seg) {
                Some(i) => {
                    if i >= items.len() {
                        items.resize(i + 1, Value::Null);
                    }
                    if rest.is_empty() {
                        items[i] = value;
                    } else {
                        ensure_container(&mut items[i], rest[0]);
                        set_in(&mut items[i], rest, value);
                    }
                }
                None => {
                    // non-index segment over a list: the list gives way
                    *node = Value::Map(BTreeMap::new());
                    set_in(node, segs, value);
                }
            }
        }
        _ => {
            *node = empty_for(seg);
            set_in(node, segs, value);
        }
    }
}

fn ensure_container(node: &mut Value, next_seg: &str) {
    let wants_list = parse_index(next_seg).is_some();
    match node {
        // maps accept numeric keys too
        Value::Map(_) => {}
        Value::List(_) if wants_list => {}
        _ => *node = empty_for(next_seg),
    }
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// Remove the key (map) or splice the element (list) at the terminal
/// segment. Removing a non-existent target is a no-op.
pub fn delete(root: &Value, path: &str) -> Value {
    let segs = split(path);
    if segs.is_empty() {
        return root.clone();
    }
    let mut out = root.clone();
    delete_in(&mut out, &segs);
    out
}

fn delete_in(node: &mut Value, segs: &[&str]) {
    let seg = segs[0];
    if segs.len() == 1 {
        match node {
            Value::Map(m) => {
                m.remove(seg);
            }
            Value::List(items) => {
                if let Some(i) = parse_index(seg) {
                    if i < items.len() {
                        items.remove(i);
                    }
                }
            }
            _ => {}
        }
        return;
    }
    match node {
        Value::Map(m) => {
            if let Some(child) = m.get_mut(seg) {
                delete_in(child, &segs[1..]);
            }
        }
        Value::List(items) => {
            if let Some(child) = parse_index(seg).and_then(|i| items.get_mut(i)) {
                delete_in(child, &segs[1..]);
            }
        }
        _ => {}
    }
}

// ─── Has ──────────────────────────────────────────────────────────────────────

/// JSON-variant presence: the value at `path` is not `Null`.
pub fn has(root: &Value, path: &str) -> bool {
    get(root, path) != Value::Null
}

/// Map-variant presence: every segment up to the last points at a map,
/// and the last key is present.
pub fn has_strict(root: &Value, path: &str) -> bool {
    let segs = split(path);
    if segs.is_empty() {
        return false;
    }
    let mut node = root;
    for (i, seg) in segs.iter().enumerate() {
        match node {
            Value::Map(m) => match m.get(*seg) {
                Some(v) => {
                    if i + 1 == segs.len() {
                        return true;
                    }
                    node = v;
                }
                None => return false,
            },
            _ => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(json: &str) -> Value {
        crate::modules::json::from_json(&serde_json::from_str(json).unwrap())
    }

    #[test]
    fn get_walks_maps_and_lists() {
        let root = obj(r#"{"a": {"b": [10, 20, 30]}}"#);
        assert_eq!(get(&root, "a.b.1"), Value::Number(20.0));
        assert_eq!(get(&root, "a.b.9"), Value::Null);
        assert_eq!(get(&root, "a.x"), Value::Null);
        assert_eq!(get(&root, "a.b.1.c"), Value::Null);
    }

    #[test]
    fn empty_path_returns_root() {
        let root = obj(r#"{"a": 1}"#);
        assert_eq!(get(&root, ""), root);
    }

    #[test]
    fn set_creates_list_for_numeric_next_segment() {
        let out = set(&obj("{}"), "a.b.0", Value::String("x".into()));
        assert_eq!(out, obj(r#"{"a": {"b": ["x"]}}"#));
    }

    #[test]
    fn set_creates_map_for_named_next_segment() {
        let out = set(&obj("{}"), "a.b.c", Value::Number(1.0));
        assert_eq!(out, obj(r#"{"a": {"b": {"c": 1}}}"#));
    }

    #[test]
    fn set_extends_list_with_null_fillers() {
        let out = set(&obj(r#"{"a": [1]}"#), "a.3", Value::Number(4.0));
        assert_eq!(out, obj(r#"{"a": [1, null, null, 4]}"#));
    }

    #[test]
    fn set_does_not_mutate_input() {
        let root = obj(r#"{"a": 1}"#);
        let _ = set(&root, "a", Value::Number(2.0));
        assert_eq!(get(&root, "a"), Value::Number(1.0));
    }

    #[test]
    fn set_then_get_round_trips() {
        let root = obj(r#"{"deep": {"x": true}}"#);
        let v = Value::String("hello".into());
        let out = set(&root, "deep.nested.2.k", v.clone());
        assert_eq!(get(&out, "deep.nested.2.k"), v);
        assert_eq!(get(&out, "deep.x"), Value::Bool(true));
    }

    #[test]
    fn delete_splices_list_element() {
        let out = delete(&obj(r#"{"a": [1, 2, 3]}"#), "a.1");
        assert_eq!(out, obj(r#"{"a": [1, 3]}"#));
    }

    #[test]
    fn delete_missing_is_noop() {
        let root = obj(r#"{"a": 1}"#);
        assert_eq!(delete(&root, "b.c"), root);
    }

    #[test]
    fn delete_after_set_clears_presence() {
        let out = set(&obj("{}"), "a.b", Value::Number(1.0));
        let out = delete(&out, "a.b");
        assert!(!has_strict(&out, "a.b"));
        assert!(!has(&out, "a.b"));
    }

    #[test]
    fn has_strict_requires_maps_all_the_way() {
        let root = obj(r#"{"a": {"b": [1]}, "n": null}"#);
        assert!(has_strict(&root, "a.b"));
        assert!(!has_strict(&root, "a.b.0"));
        assert!(has_strict(&root, "n"));
        assert!(!has(&root, "n"));
    }
}
