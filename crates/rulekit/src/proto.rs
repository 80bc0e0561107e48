//! HTTP protocol view: one capability interface over requests and
//! responses.
//!
//! Both sides expose the same observers; a field the underlying message
//! does not have comes back as its zero value (empty string, 0, empty
//! list), never as an error. Adapters wrap the `http` crate's message
//! types and hold the body as an owned buffer so `get_body` can hand out
//! a fresh reader on every call.

use std::io::{self, Cursor, Read};
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use http::{HeaderMap, Version};
use url::Url;

use crate::value::Value;

// ─── Capability interface ─────────────────────────────────────────────────────

pub trait Protocol: Send + Sync {
    fn content_length(&self) -> i64;
    fn cookies(&self) -> Vec<Cookie>;
    fn headers(&self) -> &HeaderMap;
    fn trailers(&self) -> &HeaderMap;
    fn host(&self) -> String;
    fn method(&self) -> String;
    fn pattern(&self) -> String;
    fn proto(&self) -> String;
    fn proto_major(&self) -> u16;
    fn proto_minor(&self) -> u16;
    fn remote_address(&self) -> String;
    fn status_code(&self) -> u16;
    fn transfer_encoding(&self) -> Vec<String>;
    fn url(&self) -> Option<Url>;
    /// A fresh reader over the message body. Must succeed on repeated
    /// calls; adapters buffer the body to guarantee it.
    fn get_body(&self) -> io::Result<Box<dyn Read + Send>>;
}

fn proto_parts(v: Version) -> (&'static str, u16, u16) {
    if v == Version::HTTP_09 {
        ("HTTP/0.9", 0, 9)
    } else if v == Version::HTTP_10 {
        ("HTTP/1.0", 1, 0)
    } else if v == Version::HTTP_2 {
        ("HTTP/2.0", 2, 0)
    } else if v == Version::HTTP_3 {
        ("HTTP/3.0", 3, 0)
    } else {
        ("HTTP/1.1", 1, 1)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn content_length_of(headers: &HeaderMap, body_len: usize) -> i64 {
    header_str(headers, "content-length")
        .parse()
        .unwrap_or(body_len as i64)
}

fn transfer_encoding_of(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all("transfer-encoding")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

// ─── Cookies ──────────────────────────────────────────────────────────────────

/// One cookie with the full attribute set carried by a `Set-Cookie`
/// header. Request cookies only populate `name`/`value`/`quoted`/`raw`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub quoted: bool,
    pub path: String,
    pub domain: String,
    pub expires: Option<DateTime<Utc>>,
    pub raw_expires: String,
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: String,
    pub partitioned: bool,
    pub raw: String,
    pub unparsed: Vec<String>,
}

fn split_pair(s: &str) -> Option<(String, String, bool)> {
    let (name, value) = s.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let value = value.trim();
    let (value, quoted) = match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => (inner, true),
        None => (value, false),
    };
    Some((name.to_string(), value.to_string(), quoted))
}

fn parse_cookie_date(s: &str) -> Option<DateTime<Utc>> {
    const FORMATS: [&str; 3] = [
        "%a, %d %b %Y %H:%M:%S GMT",
        "%A, %d-%b-%y %H:%M:%S GMT",
        "%a %b %e %H:%M:%S %Y",
    ];
    FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(s, fmt)
            .ok()
            .map(|dt| dt.and_utc())
    })
}

/// Parse every `Cookie:` header into name/value cookies.
pub fn parse_request_cookies(headers: &HeaderMap) -> Vec<Cookie> {
    let mut out = Vec::new();
    for header in headers.get_all("cookie") {
        let Ok(header) = header.to_str() else { continue };
        for part in header.split(';') {
            let part = part.trim();
            if let Some((name, value, quoted)) = split_pair(part) {
                out.push(Cookie {
                    name,
                    value,
                    quoted,
                    raw: part.to_string(),
                    ..Cookie::default()
                });
            }
        }
    }
    out
}

/// Parse one `Set-Cookie:` header, attributes included. Unrecognized
/// attributes land in `unparsed`.
pub fn parse_set_cookie(raw: &str) -> Option<Cookie> {
    let mut parts = raw.split(';');
    let (name, value, quoted) = split_pair(parts.next()?.trim())?;
    let mut cookie = Cookie {
        name,
        value,
        quoted,
        raw: raw.to_string(),
        ..Cookie::default()
    };
    for attr in parts {
        let attr = attr.trim();
        if attr.is_empty() {
            continue;
        }
        let (key, val) = match attr.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (attr, ""),
        };
        match key.to_ascii_lowercase().as_str() {
            "path" => cookie.path = val.to_string(),
            "domain" => cookie.domain = val.to_string(),
            "expires" => {
                cookie.raw_expires = val.to_string();
                cookie.expires = parse_cookie_date(val);
            }
            "max-age" => cookie.max_age = val.parse().ok(),
            "secure" => cookie.secure = true,
            "httponly" => cookie.http_only = true,
            "samesite" => cookie.same_site = val.to_string(),
            "partitioned" => cookie.partitioned = true,
            _ => cookie.unparsed.push(attr.to_string()),
        }
    }
    Some(cookie)
}

// ─── Request adapter ──────────────────────────────────────────────────────────

pub struct RequestView {
    req: http::Request<Vec<u8>>,
    trailers: HeaderMap,
    remote_addr: String,
    pattern: String,
}

impl RequestView {
    pub fn new(req: http::Request<Vec<u8>>) -> Self {
        Self {
            req,
            trailers: HeaderMap::new(),
            remote_addr: String::new(),
            pattern: String::new(),
        }
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = addr.into();
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_trailers(mut self, trailers: HeaderMap) -> Self {
        self.trailers = trailers;
        self
    }

    pub fn into_value(self) -> Value {
        Value::Protocol(Arc::new(self))
    }
}

impl Protocol for RequestView {
    fn content_length(&self) -> i64 {
        content_length_of(self.req.headers(), self.req.body().len())
    }

    fn cookies(&self) -> Vec<Cookie> {
        parse_request_cookies(self.req.headers())
    }

    fn headers(&self) -> &HeaderMap {
        self.req.headers()
    }

    fn trailers(&self) -> &HeaderMap {
        &self.trailers
    }

    fn host(&self) -> String {
        if let Some(authority) = self.req.uri().authority() {
            return authority.to_string();
        }
        header_str(self.req.headers(), "host").to_string()
    }

    fn method(&self) -> String {
        self.req.method().to_string()
    }

    fn pattern(&self) -> String {
        self.pattern.clone()
    }

    fn proto(&self) -> String {
        proto_parts(self.req.version()).0.to_string()
    }

    fn proto_major(&self) -> u16 {
        proto_parts(self.req.version()).1
    }

    fn proto_minor(&self) -> u16 {
        proto_parts(self.req.version()).2
    }

    fn remote_address(&self) -> String {
        self.remote_addr.clone()
    }

    fn status_code(&self) -> u16 {
        0
    }

    fn transfer_encoding(&self) -> Vec<String> {
        transfer_encoding_of(self.req.headers())
    }

    fn url(&self) -> Option<Url> {
        let uri = self.req.uri();
        if uri.scheme().is_some() {
            return Url::parse(&uri.to_string()).ok();
        }
        let mut host = self.host();
        if host.is_empty() {
            host = "localhost".to_string();
        }
        Url::parse(&format!("http://{host}{uri}")).ok()
    }

    fn get_body(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.req.body().clone())))
    }
}

// ─── Response adapter ─────────────────────────────────────────────────────────

pub struct ResponseView {
    resp: http::Response<Vec<u8>>,
    trailers: HeaderMap,
}

impl ResponseView {
    pub fn new(resp: http::Response<Vec<u8>>) -> Self {
        Self { resp, trailers: HeaderMap::new() }
    }

    pub fn with_trailers(mut self, trailers: HeaderMap) -> Self {
        self.trailers = trailers;
        self
    }

    pub fn into_value(self) -> Value {
        Value::Protocol(Arc::new(self))
    }
}

impl Protocol for ResponseView {
    fn content_length(&self) -> i64 {
        content_length_of(self.resp.headers(), self.resp.body().len())
    }

    fn cookies(&self) -> Vec<Cookie> {
        self.resp
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(parse_set_cookie)
            .collect()
    }

    fn headers(&self) -> &HeaderMap {
        self.resp.headers()
    }

    fn trailers(&self) -> &HeaderMap {
        &self.trailers
    }

    fn host(&self) -> String {
        String::new()
    }

    fn method(&self) -> String {
        String::new()
    }

    fn pattern(&self) -> String {
        String::new()
    }

    fn proto(&self) -> String {
        proto_parts(self.resp.version()).0.to_string()
    }

    fn proto_major(&self) -> u16 {
        proto_parts(self.resp.version()).1
    }

    fn proto_minor(&self) -> u16 {
        proto_parts(self.resp.version()).2
    }

    fn remote_address(&self) -> String {
        String::new()
    }

    fn status_code(&self) -> u16 {
        self.resp.status().as_u16()
    }

    fn transfer_encoding(&self) -> Vec<String> {
        transfer_encoding_of(self.resp.headers())
    }

    fn url(&self) -> Option<Url> {
        None
    }

    fn get_body(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.resp.body().clone())))
    }
}
