//! HTTP module: accessors over the protocol view.
//!
//! Every function takes the protocol view as argument 0. Fields the
//! underlying message lacks come back as zero values, so the same
//! accessors work on requests and responses alike.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use http::HeaderMap;

use crate::error::FnError;
use crate::proto::{Cookie, Protocol};
use crate::value::Value;

use super::url::query_map;
use super::{ModuleProvider, as_proto, as_str, check_argc};

const EXPORTS: &[&str] = &[
    "body",
    "contentLength",
    "contentType",
    "cookie",
    "cookies",
    "fragment",
    "hasHeader",
    "header",
    "headers",
    "host",
    "ip",
    "method",
    "path",
    "pattern",
    "port",
    "proto",
    "protoMajor",
    "protoMinor",
    "query",
    "queryParam",
    "rawQuery",
    "referer",
    "remoteAddr",
    "scheme",
    "statusCode",
    "trailers",
    "transferEncoding",
    "url",
    "userAgent",
];

fn header_value(proto: &Arc<dyn Protocol>, name: &str) -> String {
    proto
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

/// Multi-valued header map as `name → [values]`, names lowercased,
/// server order preserved per name.
fn header_map_value(headers: &HeaderMap) -> Value {
    let mut out: BTreeMap<String, Value> = BTreeMap::new();
    for name in headers.keys() {
        let values = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(|v| Value::String(v.to_string()))
            .collect();
        out.insert(name.as_str().to_string(), Value::List(values));
    }
    Value::Map(out)
}

fn cookie_value(cookie: &Cookie) -> Value {
    let mut m = BTreeMap::new();
    m.insert("domain".to_string(), Value::String(cookie.domain.clone()));
    m.insert(
        "expires".to_string(),
        Value::String(
            cookie
                .expires
                .map(super::time::render_timestamp)
                .unwrap_or_default(),
        ),
    );
    m.insert("httpOnly".to_string(), Value::Bool(cookie.http_only));
    m.insert(
        "maxAge".to_string(),
        Value::Number(cookie.max_age.unwrap_or(0) as f64),
    );
    m.insert("name".to_string(), Value::String(cookie.name.clone()));
    m.insert("partitioned".to_string(), Value::Bool(cookie.partitioned));
    m.insert("path".to_string(), Value::String(cookie.path.clone()));
    m.insert("quoted".to_string(), Value::Bool(cookie.quoted));
    m.insert("raw".to_string(), Value::String(cookie.raw.clone()));
    m.insert(
        "rawExpires".to_string(),
        Value::String(cookie.raw_expires.clone()),
    );
    m.insert("sameSite".to_string(), Value::String(cookie.same_site.clone()));
    m.insert("secure".to_string(), Value::Bool(cookie.secure));
    m.insert(
        "unparsed".to_string(),
        Value::List(
            cookie
                .unparsed
                .iter()
                .map(|s| Value::String(s.clone()))
                .collect(),
        ),
    );
    m.insert("value".to_string(), Value::String(cookie.value.clone()));
    Value::Map(m)
}

fn url_value(proto: &Arc<dyn Protocol>) -> Value {
    let mut m = BTreeMap::new();
    let url = proto.url();
    let str_of = |s: Option<&str>| Value::String(s.unwrap_or("").to_string());
    match &url {
        Some(u) => {
            m.insert("scheme".to_string(), Value::String(u.scheme().to_string()));
            m.insert("host".to_string(), str_of(u.host_str()));
            m.insert("path".to_string(), Value::String(u.path().to_string()));
            m.insert("query".to_string(), str_of(u.query()));
            m.insert("fragment".to_string(), str_of(u.fragment()));
            m.insert(
                "port".to_string(),
                Value::Number(f64::from(u.port().unwrap_or(0))),
            );
            let mut user = BTreeMap::new();
            user.insert(
                "username".to_string(),
                Value::String(u.username().to_string()),
            );
            user.insert("password".to_string(), str_of(u.password()));
            m.insert("user".to_string(), Value::Map(user));
            m.insert("rawPath".to_string(), Value::String(u.path().to_string()));
            m.insert("rawQuery".to_string(), str_of(u.query()));
            m.insert("rawFragment".to_string(), str_of(u.fragment()));
        }
        None => {
            for key in ["scheme", "host", "path", "query", "fragment", "rawPath", "rawQuery", "rawFragment"] {
                m.insert(key.to_string(), Value::String(String::new()));
            }
            m.insert("port".to_string(), Value::Number(0.0));
            let mut user = BTreeMap::new();
            user.insert("username".to_string(), Value::String(String::new()));
            user.insert("password".to_string(), Value::String(String::new()));
            m.insert("user".to_string(), Value::Map(user));
        }
    }
    m.insert("opaque".to_string(), Value::String(String::new()));
    m.insert("forceQuery".to_string(), Value::Bool(false));
    m.insert("omitHost".to_string(), Value::Bool(false));
    Value::Map(m)
}

fn raw_query(proto: &Arc<dyn Protocol>) -> String {
    proto
        .url()
        .and_then(|u| u.query().map(str::to_string))
        .unwrap_or_default()
}

pub struct HttpModule;

impl ModuleProvider for HttpModule {
    fn name(&self) -> &'static str {
        "http"
    }

    fn exports(&self) -> &'static [&'static str] {
        EXPORTS
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Option<Value>, FnError> {
        let func = format!("http.{name}");
        let func = func.as_str();
        if !EXPORTS.contains(&name) {
            return Ok(None);
        }
        let two_args = matches!(name, "header" | "hasHeader" | "cookie" | "queryParam");
        check_argc(func, args, if two_args { 2 } else { 1 })?;
        let proto = as_proto(func, args, 0)?;

        let v = match name {
            "body" => {
                let mut buf = Vec::new();
                proto
                    .get_body()
                    .and_then(|mut r| r.read_to_end(&mut buf))
                    .map_err(|e| FnError::domain(func, e.to_string()))?;
                Value::String(String::from_utf8_lossy(&buf).into_owned())
            }
            "contentLength" => Value::Number(proto.content_length() as f64),
            "contentType" => Value::String(header_value(proto, "content-type")),
            "cookie" => {
                let wanted = as_str(func, args, 1)?;
                proto
                    .cookies()
                    .iter()
                    .find(|c| c.name == wanted)
                    .map(cookie_value)
                    .unwrap_or(Value::Null)
            }
            "cookies" => Value::List(proto.cookies().iter().map(cookie_value).collect()),
            "fragment" => Value::String(
                proto
                    .url()
                    .and_then(|u| u.fragment().map(str::to_string))
                    .unwrap_or_default(),
            ),
            "hasHeader" => {
                Value::Bool(proto.headers().contains_key(as_str(func, args, 1)?))
            }
            "header" => Value::String(header_value(proto, as_str(func, args, 1)?)),
            "headers" => header_map_value(proto.headers()),
            "host" => Value::String(proto.host()),
            "ip" => {
                let forwarded = header_value(proto, "x-forwarded-for");
                let first = forwarded.split(',').next().unwrap_or("").trim();
                if !first.is_empty() {
                    Value::String(first.to_string())
                } else {
                    let real = header_value(proto, "x-real-ip");
                    if !real.is_empty() {
                        Value::String(real)
                    } else {
                        Value::String(proto.remote_address())
                    }
                }
            }
            "method" => Value::String(proto.method()),
            "path" => Value::String(
                proto
                    .url()
                    .map(|u| u.path().to_string())
                    .unwrap_or_default(),
            ),
            "pattern" => Value::String(proto.pattern()),
            "port" => {
                let port = proto
                    .url()
                    .map(|u| {
                        u.port()
                            .unwrap_or_else(|| super::url::default_port(u.scheme()))
                    })
                    .unwrap_or(0);
                Value::Number(f64::from(port))
            }
            "proto" => Value::String(proto.proto()),
            "protoMajor" => Value::Number(f64::from(proto.proto_major())),
            "protoMinor" => Value::Number(f64::from(proto.proto_minor())),
            "query" => Value::Map(query_map(&raw_query(proto))),
            "queryParam" => {
                let params = query_map(&raw_query(proto));
                match params.get(as_str(func, args, 1)?) {
                    Some(Value::String(s)) => Value::List(vec![Value::String(s.clone())]),
                    Some(Value::List(items)) => Value::List(items.clone()),
                    _ => Value::Null,
                }
            }
            "rawQuery" => Value::String(raw_query(proto)),
            "referer" => Value::String(header_value(proto, "referer")),
            "remoteAddr" => Value::String(proto.remote_address()),
            "scheme" => Value::String(
                proto
                    .url()
                    .map(|u| u.scheme().to_string())
                    .unwrap_or_default(),
            ),
            "statusCode" => Value::Number(f64::from(proto.status_code())),
            "trailers" => header_map_value(proto.trailers()),
            "transferEncoding" => Value::List(
                proto
                    .transfer_encoding()
                    .into_iter()
                    .map(Value::String)
                    .collect(),
            ),
            "url" => url_value(proto),
            "userAgent" => Value::String(header_value(proto, "user-agent")),
            _ => return Ok(None),
        };
        Ok(Some(v))
    }
}
