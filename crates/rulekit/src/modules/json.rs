//! JSON module: parse/serialize plus path-addressed access.
//!
//! Path operations accept either a JSON string (parsed first) or an
//! already-parsed value as argument 0. Presence masks missing targets
//! as `Null`; only malformed input errors.

use std::collections::BTreeMap;

use crate::error::FnError;
use crate::path;
use crate::value::Value;

use super::{ModuleProvider, as_map, as_str, check_argc, check_argc_min, check_argc_range};

const EXPORTS: &[&str] = &[
    "delete", "get", "has", "keys", "length", "merge", "parse", "set", "string", "type", "valid",
    "values",
];

// ─── serde_json bridge ────────────────────────────────────────────────────────

/// JSON → dynamic value: numbers become 64-bit floats, objects become
/// key-sorted maps.
pub fn from_json(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(from_json).collect()),
        serde_json::Value::Object(m) => Value::Map(
            m.iter()
                .map(|(k, v)| (k.clone(), from_json(v)))
                .collect::<BTreeMap<_, _>>(),
        ),
    }
}

/// Dynamic value → JSON. Integral numbers serialize without a fraction;
/// non-finite numbers and the protocol view are not representable.
pub fn to_json(func: &str, v: &Value) -> Result<serde_json::Value, FnError> {
    Ok(match v {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => {
            if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
                serde_json::Value::Number((*n as i64).into())
            } else {
                serde_json::Number::from_f64(*n)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| FnError::domain(func, "number is not representable in JSON"))?
            }
        }
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|v| to_json(func, v))
                .collect::<Result<_, _>>()?,
        ),
        Value::Map(m) => serde_json::Value::Object(
            m.iter()
                .map(|(k, v)| Ok((k.clone(), to_json(func, v)?)))
                .collect::<Result<_, FnError>>()?,
        ),
        Value::Protocol(_) => {
            return Err(FnError::type_error(func, 0, "JSON value", "protocol"));
        }
    })
}

fn parse_str(func: &str, s: &str) -> Result<Value, FnError> {
    serde_json::from_str::<serde_json::Value>(s)
        .map(|v| from_json(&v))
        .map_err(|e| FnError::parse(func, e.to_string()))
}

/// Argument 0 of the path operations: a JSON string is parsed first,
/// any other value passes through.
fn root_arg(func: &str, args: &[Value]) -> Result<Value, FnError> {
    match &args[0] {
        Value::String(s) => parse_str(func, s),
        Value::Protocol(_) => Err(FnError::type_error(func, 0, "JSON value", "protocol")),
        other => Ok(other.clone()),
    }
}

// ─── Provider ─────────────────────────────────────────────────────────────────

pub struct JsonModule;

impl ModuleProvider for JsonModule {
    fn name(&self) -> &'static str {
        "json"
    }

    fn exports(&self) -> &'static [&'static str] {
        EXPORTS
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Option<Value>, FnError> {
        let func = format!("json.{name}");
        let func = func.as_str();
        let v = match name {
            "parse" => {
                check_argc(func, args, 1)?;
                parse_str(func, as_str(func, args, 0)?)?
            }
            "string" => {
                check_argc_range(func, args, 1, 2)?;
                let pretty = match args.get(1) {
                    Some(Value::Bool(b)) => *b,
                    Some(other) => {
                        return Err(FnError::type_error(func, 1, "bool", other.type_name()));
                    }
                    None => false,
                };
                let json = to_json(func, &args[0])?;
                let rendered = if pretty {
                    serde_json::to_string_pretty(&json)
                } else {
                    serde_json::to_string(&json)
                };
                Value::String(rendered.map_err(|e| FnError::parse(func, e.to_string()))?)
            }
            "valid" => {
                check_argc(func, args, 1)?;
                let s = as_str(func, args, 0)?;
                Value::Bool(serde_json::from_str::<serde_json::Value>(s).is_ok())
            }
            "get" => {
                check_argc(func, args, 2)?;
                let root = root_arg(func, args)?;
                path::get(&root, as_str(func, args, 1)?)
            }
            "set" => {
                check_argc(func, args, 3)?;
                let root = root_arg(func, args)?;
                path::set(&root, as_str(func, args, 1)?, args[2].clone())
            }
            "delete" => {
                check_argc(func, args, 2)?;
                let root = root_arg(func, args)?;
                path::delete(&root, as_str(func, args, 1)?)
            }
            "has" => {
                check_argc(func, args, 2)?;
                let root = root_arg(func, args)?;
                Value::Bool(path::has(&root, as_str(func, args, 1)?))
            }
            "keys" => {
                check_argc(func, args, 1)?;
                let m = as_map(func, args, 0)?;
                Value::List(m.keys().map(|k| Value::String(k.clone())).collect())
            }
            "values" => {
                check_argc(func, args, 1)?;
                match &args[0] {
                    Value::Map(m) => Value::List(m.values().cloned().collect()),
                    Value::List(items) => Value::List(items.clone()),
                    other => {
                        return Err(FnError::type_error(func, 0, "map or list", other.type_name()));
                    }
                }
            }
            "length" => {
                check_argc(func, args, 1)?;
                let len = match &args[0] {
                    Value::Map(m) => m.len(),
                    Value::List(items) => items.len(),
                    Value::String(s) => s.chars().count(),
                    other => {
                        return Err(FnError::type_error(
                            func,
                            0,
                            "map, list or string",
                            other.type_name(),
                        ));
                    }
                };
                Value::Number(len as f64)
            }
            "merge" => {
                check_argc_min(func, args, 1)?;
                let mut out = BTreeMap::new();
                for pos in 0..args.len() {
                    let m = as_map(func, args, pos)?;
                    for (k, v) in m {
                        out.insert(k.clone(), v.clone());
                    }
                }
                Value::Map(out)
            }
            "type" => {
                check_argc(func, args, 1)?;
                let name = match &args[0] {
                    Value::String(s) => match serde_json::from_str::<serde_json::Value>(s) {
                        Ok(parsed) => json_type_name(&from_json(&parsed)),
                        Err(_) => "invalid",
                    },
                    Value::Protocol(_) => {
                        return Err(FnError::type_error(func, 0, "JSON value", "protocol"));
                    }
                    other => json_type_name(other),
                };
                Value::String(name.to_string())
            }
            _ => return Ok(None),
        };
        Ok(Some(v))
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::List(_) => "array",
        Value::Map(_) => "object",
        Value::Protocol(_) => "invalid",
    }
}
