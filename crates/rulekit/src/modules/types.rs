//! Types module: kind predicates, format validators, conversions.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use regex::Regex;

use crate::error::FnError;
use crate::value::Value;

use super::{ModuleProvider, as_number, as_str, check_argc, coerce_number_arg};

const EXPORTS: &[&str] = &[
    "areEqual",
    "areStrictEqual",
    "canConvertToBool",
    "canConvertToNumber",
    "canConvertToString",
    "hasLength",
    "isAlpha",
    "isAlphanumeric",
    "isArray",
    "isBase64",
    "isBool",
    "isDefined",
    "isDigit",
    "isEmail",
    "isEmpty",
    "isEven",
    "isFinite",
    "isFloat",
    "isHex",
    "isInRange",
    "isInfinite",
    "isInteger",
    "isIpAddress",
    "isJSON",
    "isLengthInRange",
    "isList",
    "isLower",
    "isMap",
    "isNan",
    "isNegative",
    "isNotEmpty",
    "isNull",
    "isNumber",
    "isNumericString",
    "isObject",
    "isOdd",
    "isPositive",
    "isString",
    "isUUID",
    "isUpper",
    "isUrl",
    "isWhitespace",
    "isZero",
    "type",
];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid regex")
});
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[A-Za-z0-9.-]+(\.[A-Za-z]{2,})?(/.*)?$").expect("valid regex")
});
static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("valid regex")
});
static HEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]+$").expect("valid regex"));

fn is_integer(n: f64) -> bool {
    n.is_finite() && n.trunc() == n
}

fn length_of(v: &Value) -> Option<usize> {
    match v {
        Value::String(s) => Some(s.chars().count()),
        Value::List(items) => Some(items.len()),
        Value::Map(m) => Some(m.len()),
        _ => None,
    }
}

fn type_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::List(_) => "list",
        Value::Map(_) => "map",
        Value::Protocol(_) => "unknown",
    }
}

pub struct TypesModule;

impl ModuleProvider for TypesModule {
    fn name(&self) -> &'static str {
        "types"
    }

    fn exports(&self) -> &'static [&'static str] {
        EXPORTS
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Option<Value>, FnError> {
        let func = format!("types.{name}");
        let func = func.as_str();
        let v = match name {
            "type" => {
                check_argc(func, args, 1)?;
                Value::String(type_of(&args[0]).to_string())
            }

            // ── Existence ─────────────────────────────────────────────────
            "isNull" => {
                check_argc(func, args, 1)?;
                Value::Bool(args[0] == Value::Null)
            }
            "isDefined" => {
                check_argc(func, args, 1)?;
                Value::Bool(args[0] != Value::Null)
            }
            "isEmpty" => {
                check_argc(func, args, 1)?;
                Value::Bool(args[0].is_null_like())
            }
            "isNotEmpty" => {
                check_argc(func, args, 1)?;
                Value::Bool(!args[0].is_null_like())
            }

            // ── Kind predicates ───────────────────────────────────────────
            "isBool" => {
                check_argc(func, args, 1)?;
                Value::Bool(matches!(args[0], Value::Bool(_)))
            }
            "isNumber" => {
                check_argc(func, args, 1)?;
                Value::Bool(matches!(args[0], Value::Number(_)))
            }
            "isString" => {
                check_argc(func, args, 1)?;
                Value::Bool(matches!(args[0], Value::String(_)))
            }
            "isList" | "isArray" => {
                check_argc(func, args, 1)?;
                Value::Bool(matches!(args[0], Value::List(_)))
            }
            "isMap" | "isObject" => {
                check_argc(func, args, 1)?;
                Value::Bool(matches!(args[0], Value::Map(_)))
            }

            // ── Number predicates ─────────────────────────────────────────
            "isInteger" => {
                check_argc(func, args, 1)?;
                Value::Bool(matches!(&args[0], Value::Number(n) if is_integer(*n)))
            }
            "isFloat" => {
                check_argc(func, args, 1)?;
                Value::Bool(matches!(&args[0], Value::Number(n) if n.is_finite() && !is_integer(*n)))
            }
            "isPositive" => {
                check_argc(func, args, 1)?;
                Value::Bool(as_number(func, args, 0)? > 0.0)
            }
            "isNegative" => {
                check_argc(func, args, 1)?;
                Value::Bool(as_number(func, args, 0)? < 0.0)
            }
            "isZero" => {
                check_argc(func, args, 1)?;
                Value::Bool(as_number(func, args, 0)? == 0.0)
            }
            "isEven" => {
                check_argc(func, args, 1)?;
                let n = as_number(func, args, 0)?;
                Value::Bool(is_integer(n) && (n as i64) % 2 == 0)
            }
            "isOdd" => {
                check_argc(func, args, 1)?;
                let n = as_number(func, args, 0)?;
                Value::Bool(is_integer(n) && (n as i64) % 2 != 0)
            }
            "isNan" => {
                check_argc(func, args, 1)?;
                Value::Bool(matches!(&args[0], Value::Number(n) if n.is_nan()))
            }
            "isInfinite" => {
                check_argc(func, args, 1)?;
                Value::Bool(matches!(&args[0], Value::Number(n) if n.is_infinite()))
            }
            "isFinite" => {
                check_argc(func, args, 1)?;
                Value::Bool(matches!(&args[0], Value::Number(n) if n.is_finite()))
            }

            // ── String predicates ─────────────────────────────────────────
            "isNumericString" => {
                check_argc(func, args, 1)?;
                let s = as_str(func, args, 0)?;
                Value::Bool(s.trim().parse::<f64>().is_ok())
            }
            "isAlpha" => {
                check_argc(func, args, 1)?;
                let s = as_str(func, args, 0)?;
                Value::Bool(!s.is_empty() && s.chars().all(char::is_alphabetic))
            }
            "isAlphanumeric" => {
                check_argc(func, args, 1)?;
                let s = as_str(func, args, 0)?;
                Value::Bool(!s.is_empty() && s.chars().all(char::is_alphanumeric))
            }
            "isDigit" => {
                check_argc(func, args, 1)?;
                let s = as_str(func, args, 0)?;
                Value::Bool(!s.is_empty() && s.chars().all(char::is_numeric))
            }
            "isLower" => {
                check_argc(func, args, 1)?;
                let s = as_str(func, args, 0)?;
                Value::Bool(s == s.to_lowercase() && s.chars().any(char::is_lowercase))
            }
            "isUpper" => {
                check_argc(func, args, 1)?;
                let s = as_str(func, args, 0)?;
                Value::Bool(s == s.to_uppercase() && s.chars().any(char::is_uppercase))
            }
            "isWhitespace" => {
                check_argc(func, args, 1)?;
                let s = as_str(func, args, 0)?;
                Value::Bool(!s.is_empty() && s.chars().all(char::is_whitespace))
            }

            // ── Format validators ─────────────────────────────────────────
            "isEmail" => {
                check_argc(func, args, 1)?;
                Value::Bool(EMAIL_RE.is_match(as_str(func, args, 0)?))
            }
            "isUrl" => {
                check_argc(func, args, 1)?;
                Value::Bool(URL_RE.is_match(as_str(func, args, 0)?))
            }
            "isIpAddress" => {
                check_argc(func, args, 1)?;
                Value::Bool(as_str(func, args, 0)?.parse::<std::net::IpAddr>().is_ok())
            }
            "isUUID" => {
                check_argc(func, args, 1)?;
                Value::Bool(UUID_RE.is_match(as_str(func, args, 0)?))
            }
            "isJSON" => {
                check_argc(func, args, 1)?;
                let s = as_str(func, args, 0)?;
                Value::Bool(serde_json::from_str::<serde_json::Value>(s).is_ok())
            }
            "isBase64" => {
                check_argc(func, args, 1)?;
                let s = as_str(func, args, 0)?;
                Value::Bool(STANDARD.decode(s).is_ok() || STANDARD_NO_PAD.decode(s).is_ok())
            }
            "isHex" => {
                check_argc(func, args, 1)?;
                Value::Bool(HEX_RE.is_match(as_str(func, args, 0)?))
            }

            // ── Ranges and lengths ────────────────────────────────────────
            "hasLength" => {
                check_argc(func, args, 1)?;
                Value::Bool(length_of(&args[0]).is_some())
            }
            "isInRange" => {
                check_argc(func, args, 3)?;
                let v = coerce_number_arg(func, args, 0)?;
                let min = coerce_number_arg(func, args, 1)?;
                let max = coerce_number_arg(func, args, 2)?;
                if min > max {
                    return Err(FnError::domain(func, "min must not exceed max"));
                }
                Value::Bool(v >= min && v <= max)
            }
            "isLengthInRange" => {
                check_argc(func, args, 3)?;
                let len = length_of(&args[0]).ok_or_else(|| {
                    FnError::type_error(func, 0, "string, list or map", args[0].type_name())
                })? as f64;
                let min = as_number(func, args, 1)?;
                let max = as_number(func, args, 2)?;
                if min < 0.0 {
                    return Err(FnError::domain(func, "min must be non-negative"));
                }
                if min > max {
                    return Err(FnError::domain(func, "min must not exceed max"));
                }
                Value::Bool(len >= min && len <= max)
            }

            // ── Conversion predicates ─────────────────────────────────────
            "canConvertToNumber" => {
                check_argc(func, args, 1)?;
                Value::Bool(args[0].coerce_number().is_some())
            }
            "canConvertToString" => {
                check_argc(func, args, 1)?;
                Value::Bool(args[0].coerce_string().is_some())
            }
            "canConvertToBool" => {
                check_argc(func, args, 1)?;
                Value::Bool(args[0].coerce_bool().is_some())
            }

            // ── Equality ──────────────────────────────────────────────────
            "areEqual" => {
                check_argc(func, args, 2)?;
                Value::Bool(args[0] == args[1])
            }
            "areStrictEqual" => {
                check_argc(func, args, 2)?;
                let same_kind = args[0].type_name() == args[1].type_name();
                Value::Bool(same_kind && args[0] == args[1])
            }

            _ => return Ok(None),
        };
        Ok(Some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, FnError> {
        TypesModule
            .call(name, args)
            .map(|v| v.expect("function exists"))
    }

    fn yes(name: &str, arg: Value) {
        assert_eq!(call(name, &[arg.clone()]).unwrap(), Value::Bool(true), "{name}({arg:?})");
    }

    fn no(name: &str, arg: Value) {
        assert_eq!(call(name, &[arg.clone()]).unwrap(), Value::Bool(false), "{name}({arg:?})");
    }

    #[test]
    fn type_names() {
        assert_eq!(call("type", &[Value::Null]).unwrap(), Value::String("null".into()));
        assert_eq!(call("type", &[Value::List(vec![])]).unwrap(), Value::String("list".into()));
        assert_eq!(
            call("type", &[Value::Map(Default::default())]).unwrap(),
            Value::String("map".into())
        );
    }

    #[test]
    fn empty_covers_null_like_values() {
        yes("isEmpty", Value::Null);
        yes("isEmpty", "".into());
        yes("isEmpty", 0.0.into());
        yes("isEmpty", false.into());
        yes("isEmpty", Value::List(vec![]));
        no("isEmpty", "x".into());
        no("isEmpty", 1.0.into());
    }

    #[test]
    fn integer_and_float_split() {
        yes("isInteger", 4.0.into());
        no("isInteger", 4.5.into());
        no("isInteger", f64::NAN.into());
        yes("isFloat", 4.5.into());
        no("isFloat", 4.0.into());
        no("isFloat", f64::INFINITY.into());
    }

    #[test]
    fn parity_applies_to_integers_only() {
        yes("isEven", 4.0.into());
        yes("isOdd", 3.0.into());
        no("isEven", 2.5.into());
        no("isOdd", 2.5.into());
        yes("isEven", (-2.0).into());
    }

    #[test]
    fn string_class_predicates() {
        yes("isAlpha", "héllo".into());
        no("isAlpha", "h3llo".into());
        no("isAlpha", "".into());
        yes("isAlphanumeric", "abc123".into());
        yes("isDigit", "0123".into());
        no("isDigit", "12a".into());
        yes("isLower", "abc def".into());
        no("isLower", "Abc".into());
        no("isLower", "123".into());
        yes("isUpper", "ABC".into());
        yes("isWhitespace", " \t\n".into());
        no("isWhitespace", "".into());
        yes("isNumericString", " 42.5 ".into());
        no("isNumericString", "42x".into());
    }

    #[test]
    fn email_and_url_formats() {
        yes("isEmail", "user.name+tag@example.co".into());
        no("isEmail", "not-an-email".into());
        no("isEmail", "a@b".into());
        yes("isUrl", "https://example.com/path".into());
        yes("isUrl", "http://localhost".into());
        no("isUrl", "ftp://example.com".into());
    }

    #[test]
    fn ip_address_forms() {
        yes("isIpAddress", "192.168.1.1".into());
        no("isIpAddress", "256.1.1.1".into());
        yes("isIpAddress", "::1".into());
        yes("isIpAddress", "::".into());
        yes("isIpAddress", "2001:0db8:0000:0000:0000:0000:0000:0001".into());
        no("isIpAddress", "host".into());
    }

    #[test]
    fn uuid_requires_dashes() {
        yes("isUUID", "550e8400-e29b-41d4-a716-446655440000".into());
        no("isUUID", "550e8400e29b41d4a716446655440000".into());
    }

    #[test]
    fn base64_standard_and_raw() {
        yes("isBase64", "aGVsbG8=".into());
        yes("isBase64", "aGVsbG8".into());
        no("isBase64", "not base64!!".into());
    }

    #[test]
    fn hex_is_non_empty() {
        yes("isHex", "deadBEEF01".into());
        no("isHex", "".into());
        no("isHex", "xyz".into());
    }

    #[test]
    fn in_range_coerces_and_validates() {
        assert_eq!(
            call("isInRange", &["5".into(), 1.0.into(), 10.0.into()]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call("isInRange", &[true.into(), 0.0.into(), 1.0.into()]).unwrap(),
            Value::Bool(true)
        );
        let err = call("isInRange", &[5.0.into(), 10.0.into(), 1.0.into()]).unwrap_err();
        assert!(err.to_string().contains("min must not exceed max"));
    }

    #[test]
    fn length_range_checks_kinds_first() {
        assert_eq!(
            call("isLengthInRange", &["abc".into(), 1.0.into(), 5.0.into()]).unwrap(),
            Value::Bool(true)
        );
        assert!(call("isLengthInRange", &[1.0.into(), 0.0.into(), 5.0.into()]).is_err());
        assert!(call("isLengthInRange", &["abc".into(), (-1.0).into(), 5.0.into()]).is_err());
    }

    #[test]
    fn equality_is_deep_and_strict_matches_kinds() {
        let a = Value::List(vec![1.0.into(), "x".into()]);
        assert_eq!(call("areEqual", &[a.clone(), a.clone()]).unwrap(), Value::Bool(true));
        assert_eq!(
            call("areEqual", &[42.0.into(), "42".into()]).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            call("areStrictEqual", &[a.clone(), a]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn conversion_predicates_follow_coercions() {
        yes("canConvertToNumber", "1e3".into());
        no("canConvertToNumber", "abc".into());
        yes("canConvertToNumber", true.into());
        no("canConvertToString", Value::List(vec![]));
        yes("canConvertToString", Value::Null);
        yes("canConvertToBool", "false".into());
        no("canConvertToBool", "maybe".into());
    }
}
