//! Protocol-view behavior through the http module.
//!
//! Requests and responses are built with the `http` crate's builders and
//! wrapped in the adapter views; every accessor goes through the registry.

use rulekit::{Registry, RequestView, ResponseView, Value};

fn call(name: &str, args: &[Value]) -> Value {
    Registry::standard()
        .call(name, args)
        .unwrap_or_else(|e| panic!("{name} failed: {e}"))
}

fn s(v: Value) -> String {
    match v {
        Value::String(s) => s,
        other => panic!("expected string, got {other:?}"),
    }
}

fn mock_request() -> Value {
    let req = http::Request::builder()
        .method("POST")
        .uri("/api/users?page=2&tag=a&tag=b")
        .header("Host", "api.example.com")
        .header("Content-Type", "application/json; charset=utf-8")
        .header("User-Agent", "rulekit-test/1.0")
        .header("X-Forwarded-For", "192.168.1.1, 10.0.0.1")
        .header("Cookie", "session=abc; theme=dark")
        .body(br#"{"name": "John"}"#.to_vec())
        .unwrap();
    RequestView::new(req)
        .with_remote_addr("203.0.113.9:52100")
        .with_pattern("/api/users")
        .into_value()
}

#[test]
fn header_lookup_is_case_insensitive() {
    assert_eq!(
        s(call("http.header", &[mock_request(), "content-type".into()])),
        "application/json; charset=utf-8"
    );
    assert_eq!(
        s(call("http.header", &[mock_request(), "Content-Type".into()])),
        "application/json; charset=utf-8"
    );
    assert_eq!(s(call("http.header", &[mock_request(), "missing".into()])), "");
}

#[test]
fn ip_prefers_forwarded_for_first_token() {
    assert_eq!(s(call("http.ip", &[mock_request()])), "192.168.1.1");

    let req = http::Request::builder()
        .uri("/")
        .header("X-Real-IP", "10.1.2.3")
        .body(Vec::new())
        .unwrap();
    let view = RequestView::new(req).with_remote_addr("203.0.113.9:52100");
    assert_eq!(s(call("http.ip", &[view.into_value()])), "10.1.2.3");

    let req = http::Request::builder().uri("/").body(Vec::new()).unwrap();
    let view = RequestView::new(req).with_remote_addr("203.0.113.9:52100");
    assert_eq!(s(call("http.ip", &[view.into_value()])), "203.0.113.9:52100");
}

#[test]
fn headers_map_groups_values_per_name() {
    let req = http::Request::builder()
        .uri("/")
        .header("Accept", "text/html")
        .header("Accept", "application/json")
        .body(Vec::new())
        .unwrap();
    let headers = call("http.headers", &[RequestView::new(req).into_value()]);
    let Value::Map(m) = headers else { panic!("expected map") };
    assert_eq!(
        m["accept"],
        Value::List(vec!["text/html".into(), "application/json".into()])
    );
}

#[test]
fn query_param_wraps_values_in_a_list() {
    assert_eq!(
        call("http.queryParam", &[mock_request(), "page".into()]),
        Value::List(vec!["2".into()])
    );
    assert_eq!(
        call("http.queryParam", &[mock_request(), "tag".into()]),
        Value::List(vec!["a".into(), "b".into()])
    );
    assert_eq!(
        call("http.queryParam", &[mock_request(), "missing".into()]),
        Value::Null
    );
}

#[test]
fn body_reads_the_full_stream_repeatedly() {
    let req = mock_request();
    assert_eq!(s(call("http.body", &[req.clone()])), r#"{"name": "John"}"#);
    // protocol view guarantees a fresh reader per call
    assert_eq!(s(call("http.body", &[req])), r#"{"name": "John"}"#);
}

#[test]
fn url_map_carries_every_field() {
    let url = call("http.url", &[mock_request()]);
    let Value::Map(m) = url else { panic!("expected map") };
    assert_eq!(m["scheme"], Value::String("http".into()));
    assert_eq!(m["host"], Value::String("api.example.com".into()));
    assert_eq!(m["path"], Value::String("/api/users".into()));
    assert_eq!(m["query"], Value::String("page=2&tag=a&tag=b".into()));
    let Value::Map(user) = &m["user"] else { panic!("expected user map") };
    assert_eq!(user["username"], Value::String("".into()));
}

#[test]
fn scalar_accessors() {
    let req = mock_request();
    assert_eq!(s(call("http.method", &[req.clone()])), "POST");
    assert_eq!(s(call("http.path", &[req.clone()])), "/api/users");
    assert_eq!(s(call("http.pattern", &[req.clone()])), "/api/users");
    assert_eq!(s(call("http.host", &[req.clone()])), "api.example.com");
    assert_eq!(s(call("http.scheme", &[req.clone()])), "http");
    assert_eq!(s(call("http.rawQuery", &[req.clone()])), "page=2&tag=a&tag=b");
    assert_eq!(s(call("http.userAgent", &[req.clone()])), "rulekit-test/1.0");
    assert_eq!(s(call("http.contentType", &[req.clone()])), "application/json; charset=utf-8");
    assert_eq!(s(call("http.proto", &[req.clone()])), "HTTP/1.1");
    assert_eq!(call("http.protoMajor", &[req.clone()]), Value::Number(1.0));
    assert_eq!(call("http.port", &[req.clone()]), Value::Number(80.0));
    // requests have no status; the zero value comes back, not an error
    assert_eq!(call("http.statusCode", &[req]), Value::Number(0.0));
}

#[test]
fn trailers_surface_as_a_header_map() {
    let mut trailers = http::HeaderMap::new();
    trailers.insert("x-checksum", "abc123".parse().unwrap());
    let req = http::Request::builder().uri("/").body(Vec::new()).unwrap();
    let view = RequestView::new(req).with_trailers(trailers).into_value();
    let Value::Map(m) = call("http.trailers", &[view]) else { panic!("expected map") };
    assert_eq!(m["x-checksum"], Value::List(vec!["abc123".into()]));
    // absent trailers give an empty map, not an error
    assert_eq!(call("http.trailers", &[mock_request()]), Value::Map(Default::default()));
}

#[test]
fn transfer_encoding_splits_comma_separated_values() {
    let req = http::Request::builder()
        .uri("/")
        .header("Transfer-Encoding", "gzip, chunked")
        .body(Vec::new())
        .unwrap();
    assert_eq!(
        call("http.transferEncoding", &[RequestView::new(req).into_value()]),
        Value::List(vec!["gzip".into(), "chunked".into()])
    );
    assert_eq!(call("http.transferEncoding", &[mock_request()]), Value::List(vec![]));
}

#[test]
fn fragment_is_empty_when_the_target_has_none() {
    // request targets carry no fragment on the wire
    assert_eq!(s(call("http.fragment", &[mock_request()])), "");
    let resp = http::Response::builder().status(200).body(Vec::new()).unwrap();
    assert_eq!(s(call("http.fragment", &[ResponseView::new(resp).into_value()])), "");
}

#[test]
fn request_cookies_by_name() {
    let cookies = call("http.cookies", &[mock_request()]);
    let Value::List(items) = cookies else { panic!("expected list") };
    assert_eq!(items.len(), 2);

    let theme = call("http.cookie", &[mock_request(), "theme".into()]);
    let Value::Map(m) = theme else { panic!("expected map") };
    assert_eq!(m["name"], Value::String("theme".into()));
    assert_eq!(m["value"], Value::String("dark".into()));
    assert_eq!(
        call("http.cookie", &[mock_request(), "missing".into()]),
        Value::Null
    );
}

#[test]
fn response_set_cookie_attributes_surface() {
    let resp = http::Response::builder()
        .status(200)
        .header(
            "Set-Cookie",
            "session=xyz; Path=/; Secure; HttpOnly; SameSite=Strict; Max-Age=60",
        )
        .body(Vec::new())
        .unwrap();
    let cookies = call("http.cookies", &[ResponseView::new(resp).into_value()]);
    let Value::List(items) = cookies else { panic!("expected list") };
    let Value::Map(m) = &items[0] else { panic!("expected map") };
    assert_eq!(m["name"], Value::String("session".into()));
    assert_eq!(m["path"], Value::String("/".into()));
    assert_eq!(m["secure"], Value::Bool(true));
    assert_eq!(m["httpOnly"], Value::Bool(true));
    assert_eq!(m["sameSite"], Value::String("Strict".into()));
    assert_eq!(m["maxAge"], Value::Number(60.0));
}

#[test]
fn response_shares_the_accessor_set() {
    let resp = http::Response::builder()
        .status(418)
        .header("Content-Type", "text/plain")
        .body(b"short and stout".to_vec())
        .unwrap();
    let view = ResponseView::new(resp).into_value();
    assert_eq!(call("http.statusCode", &[view.clone()]), Value::Number(418.0));
    assert_eq!(s(call("http.contentType", &[view.clone()])), "text/plain");
    assert_eq!(s(call("http.body", &[view.clone()])), "short and stout");
    // request-side fields come back as zero values
    assert_eq!(s(call("http.method", &[view.clone()])), "");
    assert_eq!(s(call("http.host", &[view.clone()])), "");
    let Value::Map(url) = call("http.url", &[view.clone()]) else { panic!("expected map") };
    assert_eq!(url["scheme"], Value::String("".into()));
    assert_eq!(call("http.contentLength", &[view]), Value::Number(15.0));
}

#[test]
fn non_protocol_argument_is_a_type_error() {
    let err = Registry::standard()
        .call("http.header", &["nope".into(), "x".into()])
        .unwrap_err();
    assert!(err.to_string().contains("expected protocol"), "{err}");
}
