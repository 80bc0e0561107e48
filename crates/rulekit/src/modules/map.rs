//! Map module: basic ops, merging, transformation, conversion, path ops.
//!
//! Every listing operation (`keys`, `values`, `toList`, `toQueryString`)
//! enumerates in ascending key order. Mutating path operations reject the
//! empty path; lookups mask misses as `Null`.

use std::collections::BTreeMap;

use crate::error::FnError;
use crate::path;
use crate::value::Value;

use super::{
    ModuleProvider, as_list, as_map, as_str, check_argc, check_argc_min, check_argc_range,
    coerce_string_arg,
};

const EXPORTS: &[&str] = &[
    "delete",
    "deletePath",
    "filter",
    "filterKeys",
    "fromList",
    "fromQueryString",
    "get",
    "getPath",
    "has",
    "hasPath",
    "invert",
    "isEmpty",
    "keys",
    "merge",
    "mergeDeep",
    "omitKeys",
    "rename",
    "set",
    "setPath",
    "size",
    "toList",
    "toQueryString",
    "values",
];

fn non_empty_path<'a>(func: &str, args: &'a [Value], pos: usize) -> Result<&'a str, FnError> {
    let p = as_str(func, args, pos)?;
    if p.is_empty() {
        Err(FnError::segment(func, ""))
    } else {
        Ok(p)
    }
}

fn merge_deep_into(dst: &mut BTreeMap<String, Value>, src: &BTreeMap<String, Value>) {
    for (k, v) in src {
        match (dst.get_mut(k), v) {
            (Some(Value::Map(left)), Value::Map(right)) => merge_deep_into(left, right),
            _ => {
                dst.insert(k.clone(), v.clone());
            }
        }
    }
}

/// One value's query-string fragments: lists emit one `k=v` per element.
fn query_fragments(func: &str, key: &str, v: &Value, out: &mut Vec<String>) -> Result<(), FnError> {
    match v {
        Value::List(items) => {
            for item in items {
                let s = item
                    .coerce_string()
                    .ok_or_else(|| FnError::type_error(func, 0, "string", item.type_name()))?;
                out.push(format!("{key}={s}"));
            }
        }
        other => {
            let s = other
                .coerce_string()
                .ok_or_else(|| FnError::type_error(func, 0, "string", other.type_name()))?;
            out.push(format!("{key}={s}"));
        }
    }
    Ok(())
}

pub struct MapModule;

impl ModuleProvider for MapModule {
    fn name(&self) -> &'static str {
        "map"
    }

    fn exports(&self) -> &'static [&'static str] {
        EXPORTS
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Option<Value>, FnError> {
        let func = format!("map.{name}");
        let func = func.as_str();
        let v = match name {
            // ── Basics ────────────────────────────────────────────────────
            "keys" => {
                check_argc(func, args, 1)?;
                let m = as_map(func, args, 0)?;
                Value::List(m.keys().map(|k| Value::String(k.clone())).collect())
            }
            "values" => {
                check_argc(func, args, 1)?;
                let m = as_map(func, args, 0)?;
                Value::List(m.values().cloned().collect())
            }
            "size" => {
                check_argc(func, args, 1)?;
                Value::Number(as_map(func, args, 0)?.len() as f64)
            }
            "isEmpty" => {
                check_argc(func, args, 1)?;
                Value::Bool(as_map(func, args, 0)?.is_empty())
            }
            "has" => {
                check_argc(func, args, 2)?;
                let m = as_map(func, args, 0)?;
                Value::Bool(m.contains_key(as_str(func, args, 1)?))
            }
            "get" => {
                check_argc_range(func, args, 2, 3)?;
                let m = as_map(func, args, 0)?;
                match m.get(as_str(func, args, 1)?) {
                    Some(v) => v.clone(),
                    None => args.get(2).cloned().unwrap_or(Value::Null),
                }
            }
            "set" => {
                check_argc(func, args, 3)?;
                let mut m = as_map(func, args, 0)?.clone();
                m.insert(as_str(func, args, 1)?.to_string(), args[2].clone());
                Value::Map(m)
            }
            "delete" => {
                check_argc(func, args, 2)?;
                let mut m = as_map(func, args, 0)?.clone();
                m.remove(as_str(func, args, 1)?);
                Value::Map(m)
            }

            // ── Merging ───────────────────────────────────────────────────
            "merge" => {
                check_argc_min(func, args, 1)?;
                let mut out = BTreeMap::new();
                for pos in 0..args.len() {
                    for (k, v) in as_map(func, args, pos)? {
                        out.insert(k.clone(), v.clone());
                    }
                }
                Value::Map(out)
            }
            "mergeDeep" => {
                check_argc_min(func, args, 1)?;
                let mut out = as_map(func, args, 0)?.clone();
                for pos in 1..args.len() {
                    merge_deep_into(&mut out, as_map(func, args, pos)?);
                }
                Value::Map(out)
            }

            // ── Transformation ────────────────────────────────────────────
            "invert" => {
                check_argc(func, args, 1)?;
                let m = as_map(func, args, 0)?;
                let mut out = BTreeMap::new();
                for (k, v) in m {
                    let s = v
                        .coerce_string()
                        .ok_or_else(|| FnError::type_error(func, 0, "string", v.type_name()))?;
                    out.insert(s, Value::String(k.clone()));
                }
                Value::Map(out)
            }
            "filter" => {
                check_argc(func, args, 1)?;
                let m = as_map(func, args, 0)?;
                Value::Map(
                    m.iter()
                        .filter(|(_, v)| !v.is_null_like())
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                )
            }
            "filterKeys" => {
                check_argc(func, args, 2)?;
                let m = as_map(func, args, 0)?;
                let keep = string_set(func, as_list(func, args, 1)?)?;
                Value::Map(
                    m.iter()
                        .filter(|(k, _)| keep.contains(k.as_str()))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                )
            }
            "omitKeys" => {
                check_argc(func, args, 2)?;
                let m = as_map(func, args, 0)?;
                let drop = string_set(func, as_list(func, args, 1)?)?;
                Value::Map(
                    m.iter()
                        .filter(|(k, _)| !drop.contains(k.as_str()))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                )
            }
            "rename" => {
                check_argc(func, args, 2)?;
                let m = as_map(func, args, 0)?;
                let renames = as_map(func, args, 1)?;
                let mut out = BTreeMap::new();
                for (k, v) in m {
                    let new_key = match renames.get(k) {
                        Some(Value::String(n)) => n.clone(),
                        _ => k.clone(),
                    };
                    out.insert(new_key, v.clone());
                }
                Value::Map(out)
            }

            // ── Conversion ────────────────────────────────────────────────
            "toList" => {
                check_argc(func, args, 1)?;
                let m = as_map(func, args, 0)?;
                Value::List(
                    m.iter()
                        .map(|(k, v)| {
                            Value::List(vec![Value::String(k.clone()), v.clone()])
                        })
                        .collect(),
                )
            }
            "fromList" => {
                check_argc(func, args, 1)?;
                let items = as_list(func, args, 0)?;
                let mut out = BTreeMap::new();
                for item in items {
                    let Value::List(pair) = item else {
                        return Err(FnError::type_error(func, 0, "list", item.type_name()));
                    };
                    if pair.len() < 2 {
                        return Err(FnError::domain(func, "pair must have at least 2 elements"));
                    }
                    let key = pair[0]
                        .coerce_string()
                        .ok_or_else(|| FnError::type_error(func, 0, "string", pair[0].type_name()))?;
                    out.insert(key, pair[1].clone());
                }
                Value::Map(out)
            }
            "toQueryString" => {
                check_argc(func, args, 1)?;
                let m = as_map(func, args, 0)?;
                let mut fragments = Vec::new();
                for (k, v) in m {
                    query_fragments(func, k, v, &mut fragments)?;
                }
                Value::String(fragments.join("&"))
            }
            "fromQueryString" => {
                check_argc(func, args, 1)?;
                let s = coerce_string_arg(func, args, 0)?;
                let mut out: BTreeMap<String, Value> = BTreeMap::new();
                for part in s.split('&') {
                    if part.is_empty() {
                        continue;
                    }
                    let (k, v) = part.split_once('=').unwrap_or((part, ""));
                    let entry = match out.remove(k) {
                        None => Value::String(v.to_string()),
                        // second occurrence promotes the entry to a list
                        Some(Value::String(first)) => Value::List(vec![
                            Value::String(first),
                            Value::String(v.to_string()),
                        ]),
                        Some(Value::List(mut items)) => {
                            items.push(Value::String(v.to_string()));
                            Value::List(items)
                        }
                        Some(other) => other,
                    };
                    out.insert(k.to_string(), entry);
                }
                Value::Map(out)
            }

            // ── Path operations ───────────────────────────────────────────
            "getPath" => {
                check_argc(func, args, 2)?;
                let m = as_map(func, args, 0)?;
                path::get(&Value::Map(m.clone()), as_str(func, args, 1)?)
            }
            "setPath" => {
                check_argc(func, args, 3)?;
                let m = as_map(func, args, 0)?;
                let p = non_empty_path(func, args, 1)?;
                path::set(&Value::Map(m.clone()), p, args[2].clone())
            }
            "hasPath" => {
                check_argc(func, args, 2)?;
                let m = as_map(func, args, 0)?;
                Value::Bool(path::has_strict(&Value::Map(m.clone()), as_str(func, args, 1)?))
            }
            "deletePath" => {
                check_argc(func, args, 2)?;
                let m = as_map(func, args, 0)?;
                let p = non_empty_path(func, args, 1)?;
                path::delete(&Value::Map(m.clone()), p)
            }

            _ => return Ok(None),
        };
        Ok(Some(v))
    }
}

fn string_set<'a>(
    func: &str,
    items: &'a [Value],
) -> Result<std::collections::BTreeSet<&'a str>, FnError> {
    items
        .iter()
        .map(|v| match v {
            Value::String(s) => Ok(s.as_str()),
            other => Err(FnError::type_error(func, 1, "string", other.type_name())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, FnError> {
        MapModule
            .call(name, args)
            .map(|v| v.expect("function exists"))
    }

    fn m(pairs: &[(&str, Value)]) -> Value {
        Value::Map(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn keys_and_values_are_sorted() {
        let input = m(&[("zebra", 1.0.into()), ("apple", 2.0.into()), ("mid", 3.0.into())]);
        assert_eq!(
            call("keys", &[input.clone()]).unwrap(),
            Value::List(vec!["apple".into(), "mid".into(), "zebra".into()])
        );
        assert_eq!(
            call("values", &[input]).unwrap(),
            Value::List(vec![2.0.into(), 3.0.into(), 1.0.into()])
        );
    }

    #[test]
    fn get_falls_back_to_default() {
        let input = m(&[("a", 1.0.into())]);
        assert_eq!(call("get", &[input.clone(), "a".into()]).unwrap(), 1.0.into());
        assert_eq!(call("get", &[input.clone(), "b".into()]).unwrap(), Value::Null);
        assert_eq!(
            call("get", &[input, "b".into(), "fallback".into()]).unwrap(),
            Value::String("fallback".into())
        );
    }

    #[test]
    fn set_and_delete_leave_input_untouched() {
        let input = m(&[("a", 1.0.into())]);
        let updated = call("set", &[input.clone(), "b".into(), 2.0.into()]).unwrap();
        assert_eq!(updated, m(&[("a", 1.0.into()), ("b", 2.0.into())]));
        assert_eq!(input, m(&[("a", 1.0.into())]));
        let removed = call("delete", &[updated, "a".into()]).unwrap();
        assert_eq!(removed, m(&[("b", 2.0.into())]));
    }

    #[test]
    fn merge_deep_recurses_on_maps_only() {
        let left = m(&[
            ("cfg", m(&[("a", 1.0.into()), ("b", 1.0.into())])),
            ("tags", Value::List(vec!["x".into()])),
        ]);
        let right = m(&[
            ("cfg", m(&[("b", 2.0.into())])),
            ("tags", Value::List(vec!["y".into()])),
        ]);
        let merged = call("mergeDeep", &[left, right]).unwrap();
        assert_eq!(
            merged,
            m(&[
                ("cfg", m(&[("a", 1.0.into()), ("b", 2.0.into())])),
                ("tags", Value::List(vec!["y".into()])),
            ])
        );
    }

    #[test]
    fn filter_drops_null_like_values() {
        let input = m(&[
            ("keep", 1.0.into()),
            ("zero", 0.0.into()),
            ("empty", "".into()),
            ("null", Value::Null),
            ("no", false.into()),
            ("yes", true.into()),
        ]);
        assert_eq!(
            call("filter", &[input]).unwrap(),
            m(&[("keep", 1.0.into()), ("yes", true.into())])
        );
    }

    #[test]
    fn invert_stringifies_values() {
        let input = m(&[("a", 1.0.into()), ("b", "x".into())]);
        assert_eq!(
            call("invert", &[input]).unwrap(),
            m(&[("1", "a".into()), ("x", "b".into())])
        );
        let err = call("invert", &[m(&[("a", Value::List(vec![]))])]).unwrap_err();
        assert!(err.to_string().contains("expected string"));
    }

    #[test]
    fn rename_maps_keys_through_table() {
        let input = m(&[("old", 1.0.into()), ("same", 2.0.into())]);
        let table = m(&[("old", "new".into())]);
        assert_eq!(
            call("rename", &[input, table]).unwrap(),
            m(&[("new", 1.0.into()), ("same", 2.0.into())])
        );
    }

    #[test]
    fn to_list_emits_sorted_pairs() {
        let input = m(&[("b", 2.0.into()), ("a", 1.0.into())]);
        assert_eq!(
            call("toList", &[input]).unwrap(),
            Value::List(vec![
                Value::List(vec!["a".into(), 1.0.into()]),
                Value::List(vec!["b".into(), 2.0.into()]),
            ])
        );
    }

    #[test]
    fn from_list_requires_pairs() {
        let pairs = Value::List(vec![Value::List(vec!["k".into(), "v".into()])]);
        assert_eq!(call("fromList", &[pairs]).unwrap(), m(&[("k", "v".into())]));
        let short = Value::List(vec![Value::List(vec!["k".into()])]);
        assert!(call("fromList", &[short]).is_err());
    }

    #[test]
    fn query_string_round_trip() {
        let input = m(&[
            ("one", "1".into()),
            ("tag", Value::List(vec!["a".into(), "b".into(), "c".into()])),
        ]);
        let qs = call("toQueryString", &[input.clone()]).unwrap();
        assert_eq!(qs, Value::String("one=1&tag=a&tag=b&tag=c".into()));
        assert_eq!(call("fromQueryString", &[qs]).unwrap(), input);
    }

    #[test]
    fn from_query_string_promotes_duplicates() {
        let out = call("fromQueryString", &["tag=a&tag=b&tag=c".into()]).unwrap();
        assert_eq!(
            out,
            m(&[("tag", Value::List(vec!["a".into(), "b".into(), "c".into()]))])
        );
    }

    #[test]
    fn path_ops_reject_empty_path_for_mutators() {
        let input = m(&[("a", 1.0.into())]);
        assert!(call("setPath", &[input.clone(), "".into(), 1.0.into()]).is_err());
        assert!(call("deletePath", &[input.clone(), "".into()]).is_err());
        assert_eq!(call("getPath", &[input.clone(), "".into()]).unwrap(), input);
    }

    #[test]
    fn set_path_then_get_path() {
        let out = call("setPath", &[m(&[]), "a.b.0".into(), "x".into()]).unwrap();
        assert_eq!(call("getPath", &[out.clone(), "a.b.0".into()]).unwrap(), "x".into());
        assert_eq!(call("hasPath", &[out.clone(), "a.b".into()]).unwrap(), true.into());
        // list index at the tail is not a map key
        assert_eq!(call("hasPath", &[out, "a.b.0".into()]).unwrap(), false.into());
    }
}
