//! Module providers and the merged registry.
//!
//! Each module exposes a flat set of named functions over `&[Value]`.
//! Function names are namespaced as `"module.func"` in the merged
//! catalog. The registry is built once and is read-only afterwards;
//! it is safe to share across threads.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::FnError;
use crate::proto::Protocol;
use crate::value::Value;

pub mod http;
pub mod json;
pub mod map;
pub mod time;
pub mod types;
pub mod url;

// ─── Provider interface ───────────────────────────────────────────────────────

/// One module's function catalog: a name, the exported function names,
/// and call dispatch. `call` answers `Ok(None)` for names it does not
/// export so a merged lookup can fall through.
pub trait ModuleProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn exports(&self) -> &'static [&'static str];
    fn call(&self, name: &str, args: &[Value]) -> Result<Option<Value>, FnError>;
}

/// The function contract at the registry boundary.
pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value, FnError> + Send + Sync>;

// ─── Registry ─────────────────────────────────────────────────────────────────

pub struct Registry {
    providers: Vec<Arc<dyn ModuleProvider>>,
}

impl Registry {
    pub fn new() -> Self {
        Self { providers: Vec::new() }
    }

    pub fn register(&mut self, provider: Arc<dyn ModuleProvider>) {
        self.providers.push(provider);
    }

    pub fn get(&self, module: &str) -> Option<&Arc<dyn ModuleProvider>> {
        self.providers.iter().find(|p| p.name() == module)
    }

    /// Invoke `"module.func"` with an argument slice.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, FnError> {
        let Some((module, func)) = name.split_once('.') else {
            return Err(FnError::unknown(name));
        };
        let Some(provider) = self.get(module) else {
            return Err(FnError::unknown(name));
        };
        provider
            .call(func, args)?
            .ok_or_else(|| FnError::unknown(name))
    }

    /// Every `"module.func"` name, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .providers
            .iter()
            .flat_map(|p| {
                p.exports()
                    .iter()
                    .map(move |f| format!("{}.{}", p.name(), f))
            })
            .collect();
        out.sort();
        out
    }

    /// Flatten the catalog into the `name → callable` map embedders
    /// consume directly.
    pub fn export(&self) -> BTreeMap<String, Function> {
        let mut out = BTreeMap::new();
        for provider in &self.providers {
            for func in provider.exports() {
                let provider = Arc::clone(provider);
                let name = format!("{}.{}", provider.name(), func);
                let callable: Function = Arc::new(move |args: &[Value]| {
                    provider
                        .call(func, args)?
                        .ok_or_else(|| FnError::unknown(func))
                });
                out.insert(name, callable);
            }
        }
        out
    }

    /// All six standard modules.
    pub fn standard() -> Self {
        let mut r = Self::new();
        r.register(Arc::new(http::HttpModule));
        r.register(Arc::new(json::JsonModule));
        r.register(Arc::new(map::MapModule));
        r.register(Arc::new(url::UrlModule));
        r.register(Arc::new(time::TimeModule));
        r.register(Arc::new(types::TypesModule));
        r
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

// ─── Shared argument helpers ──────────────────────────────────────────────────

pub(crate) fn check_argc(func: &str, args: &[Value], n: usize) -> Result<(), FnError> {
    if args.len() != n {
        Err(FnError::arity(func, n, args.len()))
    } else {
        Ok(())
    }
}

pub(crate) fn check_argc_min(func: &str, args: &[Value], min: usize) -> Result<(), FnError> {
    if args.len() < min {
        Err(FnError::arity_min(func, min, args.len()))
    } else {
        Ok(())
    }
}

pub(crate) fn check_argc_range(
    func: &str,
    args: &[Value],
    min: usize,
    max: usize,
) -> Result<(), FnError> {
    if args.len() < min || args.len() > max {
        Err(FnError::arity_range(func, min, max, args.len()))
    } else {
        Ok(())
    }
}

pub(crate) fn as_str<'a>(func: &str, args: &'a [Value], pos: usize) -> Result<&'a str, FnError> {
    match &args[pos] {
        Value::String(s) => Ok(s),
        other => Err(FnError::type_error(func, pos, "string", other.type_name())),
    }
}

pub(crate) fn as_number(func: &str, args: &[Value], pos: usize) -> Result<f64, FnError> {
    match &args[pos] {
        Value::Number(n) => Ok(*n),
        other => Err(FnError::type_error(func, pos, "number", other.type_name())),
    }
}

pub(crate) fn as_list<'a>(
    func: &str,
    args: &'a [Value],
    pos: usize,
) -> Result<&'a [Value], FnError> {
    match &args[pos] {
        Value::List(items) => Ok(items),
        other => Err(FnError::type_error(func, pos, "list", other.type_name())),
    }
}

pub(crate) fn as_map<'a>(
    func: &str,
    args: &'a [Value],
    pos: usize,
) -> Result<&'a BTreeMap<String, Value>, FnError> {
    match &args[pos] {
        Value::Map(m) => Ok(m),
        other => Err(FnError::type_error(func, pos, "map", other.type_name())),
    }
}

pub(crate) fn as_proto<'a>(
    func: &str,
    args: &'a [Value],
    pos: usize,
) -> Result<&'a Arc<dyn Protocol>, FnError> {
    match &args[pos] {
        Value::Protocol(p) => Ok(p),
        other => Err(FnError::type_error(func, pos, "protocol", other.type_name())),
    }
}

/// Coercing variant of `as_number`: strings and booleans convert per the
/// value-model rules.
pub(crate) fn coerce_number_arg(func: &str, args: &[Value], pos: usize) -> Result<f64, FnError> {
    args[pos]
        .coerce_number()
        .ok_or_else(|| FnError::type_error(func, pos, "number", args[pos].type_name()))
}

/// Coercing variant of `as_str`: scalars stringify per the value-model
/// rules; containers fail.
pub(crate) fn coerce_string_arg(func: &str, args: &[Value], pos: usize) -> Result<String, FnError> {
    args[pos]
        .coerce_string()
        .ok_or_else(|| FnError::type_error(func, pos, "string", args[pos].type_name()))
}
