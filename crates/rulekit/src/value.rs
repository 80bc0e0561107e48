//! The dynamic value universe shared by every module.
//!
//! A `Value` is one of six data variants plus the opaque protocol handle.
//! Containers are logically immutable at the API boundary: functions that
//! "modify" return a fresh structure and never alias the input's interior.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::proto::Protocol;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    /// String-keyed map. `BTreeMap` keeps every user-visible listing
    /// key-sorted; insertion order is not observable.
    Map(BTreeMap<String, Value>),
    /// Opaque HTTP protocol view. Accepted only where a function
    /// explicitly expects it; compares by handle identity.
    Protocol(Arc<dyn Protocol>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Protocol(_) => "protocol",
        }
    }

    /// Deep copy. `Clone` already duplicates lists and maps recursively;
    /// the protocol handle is shared, never duplicated.
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    /// Stringification per the coercion rules. Containers and the protocol
    /// view have no canonical string form and yield `None`.
    pub fn coerce_string(&self) -> Option<String> {
        match self {
            Self::Null => Some(String::new()),
            Self::Bool(b) => Some(if *b { "true".into() } else { "false".into() }),
            Self::Number(n) => Some(format_number(*n)),
            Self::String(s) => Some(s.clone()),
            Self::List(_) | Self::Map(_) | Self::Protocol(_) => None,
        }
    }

    /// Numeric coercion: numbers pass through, strings are trimmed and
    /// parsed as decimal floats, booleans map to 1/0.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.trim().parse::<f64>().ok(),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Boolean coercion. `"true"`/`"false"`/`""` are the only accepted
    /// strings; containers never coerce.
    pub fn coerce_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Number(n) => Some(*n != 0.0),
            Self::String(s) => match s.as_str() {
                "true" => Some(true),
                "false" | "" => Some(false),
                _ => None,
            },
            Self::Null => Some(false),
            _ => None,
        }
    }

    /// True for the values treated as "empty": null, `""`, empty
    /// container, `0`, `false`. Used by `types.isEmpty` and `map.filter`.
    pub fn is_null_like(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(b) => !*b,
            Self::Number(n) => *n == 0.0,
            Self::String(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Map(m) => m.is_empty(),
            Self::Protocol(_) => false,
        }
    }
}

/// Render a number the way every stringifying operation does: integers
/// without a trailing `.0`, everything else shortest round-trip.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ─── Equality ─────────────────────────────────────────────────────────────────

impl PartialEq for Value {
    /// Deep structural equality, variant tag first. Cross-variant
    /// comparisons are always false; NaN is never equal to itself;
    /// protocol handles compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Protocol(a), Self::Protocol(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Number(n) => write!(f, "Number({n})"),
            Self::String(s) => write!(f, "String({s:?})"),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Map(m) => f.debug_tuple("Map").field(m).finish(),
            Self::Protocol(_) => write!(f, "Protocol(..)"),
        }
    }
}

// ─── Conversions ──────────────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(m: BTreeMap<String, Value>) -> Self {
        Self::Map(m)
    }
}
