//! Time module over UTC timestamps.
//!
//! Timestamps are numbers of seconds since the Unix epoch (`Millis` /
//! `Nanos` suffixed functions scale accordingly). Formatting and parsing
//! use either a token layout (`YYYY MM DD HH mm ss SSS`) or one of the
//! named layouts; everything is computed in UTC. Arithmetic is linear
//! seconds, deliberately calendar-free.

use chrono::offset::Offset;
use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone,
    Timelike, Utc,
};
use chrono_tz::Tz;

use crate::error::FnError;
use crate::value::Value;

use super::{ModuleProvider, as_number, as_str, check_argc, check_argc_range};

const EXPORTS: &[&str] = &[
    "add",
    "addDays",
    "addHours",
    "addMinutes",
    "age",
    "day",
    "daysInMonth",
    "diff",
    "diffDays",
    "diffHours",
    "diffMinutes",
    "endOfDay",
    "format",
    "fromTimezone",
    "hour",
    "isLeapYear",
    "isWeekend",
    "minute",
    "month",
    "now",
    "nowMillis",
    "nowNanos",
    "parse",
    "range",
    "second",
    "sleep",
    "startOfDay",
    "startOfMonth",
    "startOfWeek",
    "startOfYear",
    "toTimezone",
    "validate",
    "week",
    "weekday",
    "year",
    "yearday",
];

// ─── Layouts ──────────────────────────────────────────────────────────────────

enum Layout {
    Rfc3339,
    Rfc3339Nano,
    Fmt(String),
}

/// Token grammar → chrono format string. Unknown characters pass through
/// as literals; `%` is escaped so stray input can never inject a
/// specifier.
fn translate_tokens(layout: &str) -> String {
    const TOKENS: [(&str, &str); 8] = [
        ("YYYY", "%Y"),
        ("SSS", "%3f"),
        ("YY", "%y"),
        ("MM", "%m"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
    ];
    let mut out = String::new();
    let mut rest = layout;
    'outer: while !rest.is_empty() {
        for (token, fmt) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(fmt);
                rest = tail;
                continue 'outer;
            }
        }
        let ch = rest.chars().next().unwrap_or_default();
        if ch == '%' {
            out.push_str("%%");
        } else {
            out.push(ch);
        }
        rest = &rest[ch.len_utf8()..];
    }
    out
}

fn resolve_layout(layout: &str) -> Layout {
    match layout {
        "" | "ISO8601" | "RFC3339" => Layout::Rfc3339,
        "RFC3339Nano" => Layout::Rfc3339Nano,
        "RFC822" => Layout::Fmt("%d %b %y %H:%M UTC".to_string()),
        "RFC850" => Layout::Fmt("%A, %d-%b-%y %H:%M:%S UTC".to_string()),
        "RFC1123" => Layout::Fmt("%a, %d %b %Y %H:%M:%S GMT".to_string()),
        "RFC1123Z" => Layout::Fmt("%a, %d %b %Y %H:%M:%S %z".to_string()),
        "Kitchen" => Layout::Fmt("%-I:%M%p".to_string()),
        "Stamp" => Layout::Fmt("%b %e %H:%M:%S".to_string()),
        "StampMilli" => Layout::Fmt("%b %e %H:%M:%S%.3f".to_string()),
        "StampMicro" => Layout::Fmt("%b %e %H:%M:%S%.6f".to_string()),
        "StampNano" => Layout::Fmt("%b %e %H:%M:%S%.9f".to_string()),
        custom => Layout::Fmt(translate_tokens(custom)),
    }
}

/// Accept date+time, date-only and time-only inputs against one format.
/// Date-only assumes midnight; time-only assumes the epoch date.
fn parse_with_format(s: &str, fmt: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }
    if let Ok(t) = NaiveTime::parse_from_str(s, fmt) {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
        return Some(epoch.and_time(t).and_utc());
    }
    None
}

fn parse_ts(func: &str, s: &str, layout: &str) -> Result<f64, FnError> {
    let dt = match resolve_layout(layout) {
        Layout::Rfc3339 | Layout::Rfc3339Nano => DateTime::parse_from_rfc3339(s)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| FnError::parse(func, e.to_string()))?,
        Layout::Fmt(fmt) => parse_with_format(s, &fmt)
            .ok_or_else(|| FnError::parse(func, format!("`{s}` does not match layout")))?,
    };
    Ok(timestamp_of(dt))
}

fn format_ts(func: &str, ts: f64, layout: &str) -> Result<String, FnError> {
    let dt = to_datetime(func, ts)?;
    Ok(match resolve_layout(layout) {
        Layout::Rfc3339 => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        Layout::Rfc3339Nano => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        Layout::Fmt(fmt) => dt.format(&fmt).to_string(),
    })
}

// ─── Timestamp plumbing ───────────────────────────────────────────────────────

fn timestamp_of(dt: DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9
}

fn to_datetime(func: &str, ts: f64) -> Result<DateTime<Utc>, FnError> {
    if !ts.is_finite() {
        return Err(FnError::domain(func, "timestamp is not finite"));
    }
    let secs = ts.floor();
    let nanos = ((ts - secs) * 1e9).round() as u32;
    let (secs, nanos) = if nanos >= 1_000_000_000 {
        (secs as i64 + 1, 0)
    } else {
        (secs as i64, nanos)
    };
    Utc.timestamp_opt(secs, nanos)
        .single()
        .ok_or_else(|| FnError::domain(func, "timestamp out of range"))
}

fn day_start(dt: DateTime<Utc>) -> f64 {
    dt.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|d| d.and_utc().timestamp() as f64)
        .unwrap_or(0.0)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if is_leap(year) {
                29
            } else {
                28
            }
        }
    }
}

fn is_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn tz_offset_seconds(func: &str, name: &str, dt: DateTime<Utc>) -> Result<i64, FnError> {
    let tz: Tz = name
        .parse()
        .map_err(|_| FnError::domain(func, format!("unknown timezone `{name}`")))?;
    let offset = tz.offset_from_utc_datetime(&dt.naive_utc());
    Ok(i64::from(offset.fix().local_minus_utc()))
}

fn layout_arg<'a>(func: &str, args: &'a [Value], pos: usize) -> Result<&'a str, FnError> {
    match args.get(pos) {
        Some(_) => as_str(func, args, pos),
        None => Ok(""),
    }
}

pub struct TimeModule;

impl ModuleProvider for TimeModule {
    fn name(&self) -> &'static str {
        "time"
    }

    fn exports(&self) -> &'static [&'static str] {
        EXPORTS
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Option<Value>, FnError> {
        let func = format!("time.{name}");
        let func = func.as_str();
        let v = match name {
            // ── Clock ─────────────────────────────────────────────────────
            "now" => {
                check_argc(func, args, 0)?;
                Value::Number(timestamp_of(Utc::now()))
            }
            "nowMillis" => {
                check_argc(func, args, 0)?;
                Value::Number(timestamp_of(Utc::now()) * 1e3)
            }
            "nowNanos" => {
                check_argc(func, args, 0)?;
                Value::Number(timestamp_of(Utc::now()) * 1e9)
            }

            // ── Parse / format ────────────────────────────────────────────
            "parse" => {
                check_argc_range(func, args, 1, 2)?;
                let s = as_str(func, args, 0)?;
                Value::Number(parse_ts(func, s, layout_arg(func, args, 1)?)?)
            }
            "format" => {
                check_argc_range(func, args, 1, 2)?;
                let ts = as_number(func, args, 0)?;
                Value::String(format_ts(func, ts, layout_arg(func, args, 1)?)?)
            }
            "validate" => {
                check_argc_range(func, args, 1, 2)?;
                let s = as_str(func, args, 0)?;
                Value::Bool(parse_ts(func, s, layout_arg(func, args, 1)?).is_ok())
            }

            // ── Arithmetic ────────────────────────────────────────────────
            "add" => {
                check_argc(func, args, 2)?;
                Value::Number(as_number(func, args, 0)? + as_number(func, args, 1)?)
            }
            "addDays" => {
                check_argc(func, args, 2)?;
                Value::Number(as_number(func, args, 0)? + as_number(func, args, 1)? * 86_400.0)
            }
            "addHours" => {
                check_argc(func, args, 2)?;
                Value::Number(as_number(func, args, 0)? + as_number(func, args, 1)? * 3_600.0)
            }
            "addMinutes" => {
                check_argc(func, args, 2)?;
                Value::Number(as_number(func, args, 0)? + as_number(func, args, 1)? * 60.0)
            }
            "diff" => {
                check_argc(func, args, 2)?;
                Value::Number(as_number(func, args, 0)? - as_number(func, args, 1)?)
            }
            "diffDays" => {
                check_argc(func, args, 2)?;
                Value::Number((as_number(func, args, 0)? - as_number(func, args, 1)?) / 86_400.0)
            }
            "diffHours" => {
                check_argc(func, args, 2)?;
                Value::Number((as_number(func, args, 0)? - as_number(func, args, 1)?) / 3_600.0)
            }
            "diffMinutes" => {
                check_argc(func, args, 2)?;
                Value::Number((as_number(func, args, 0)? - as_number(func, args, 1)?) / 60.0)
            }

            // ── Components (UTC) ──────────────────────────────────────────
            "year" | "month" | "day" | "hour" | "minute" | "second" | "weekday" | "yearday"
            | "week" => {
                check_argc(func, args, 1)?;
                let dt = to_datetime(func, as_number(func, args, 0)?)?;
                let n = match name {
                    "year" => f64::from(dt.year()),
                    "month" => f64::from(dt.month()),
                    "day" => f64::from(dt.day()),
                    "hour" => f64::from(dt.hour()),
                    "minute" => f64::from(dt.minute()),
                    "second" => f64::from(dt.second()),
                    "weekday" => f64::from(dt.weekday().num_days_from_sunday()),
                    "yearday" => f64::from(dt.ordinal()),
                    _ => f64::from(dt.iso_week().week()),
                };
                Value::Number(n)
            }

            // ── Boundaries (UTC) ──────────────────────────────────────────
            "startOfDay" => {
                check_argc(func, args, 1)?;
                let dt = to_datetime(func, as_number(func, args, 0)?)?;
                Value::Number(day_start(dt))
            }
            "endOfDay" => {
                check_argc(func, args, 1)?;
                let dt = to_datetime(func, as_number(func, args, 0)?)?;
                Value::Number(day_start(dt) + 86_399.999_999_999)
            }
            "startOfWeek" => {
                check_argc(func, args, 1)?;
                let dt = to_datetime(func, as_number(func, args, 0)?)?;
                let monday = dt.date_naive()
                    - Duration::days(i64::from(dt.weekday().num_days_from_monday()));
                Value::Number(
                    monday
                        .and_hms_opt(0, 0, 0)
                        .map(|d| d.and_utc().timestamp() as f64)
                        .unwrap_or(0.0),
                )
            }
            "startOfMonth" | "startOfYear" => {
                check_argc(func, args, 1)?;
                let dt = to_datetime(func, as_number(func, args, 0)?)?;
                let month = if name == "startOfYear" { 1 } else { dt.month() };
                let first = NaiveDate::from_ymd_opt(dt.year(), month, 1)
                    .ok_or_else(|| FnError::domain(func, "timestamp out of range"))?;
                Value::Number(
                    first
                        .and_hms_opt(0, 0, 0)
                        .map(|d| d.and_utc().timestamp() as f64)
                        .unwrap_or(0.0),
                )
            }

            // ── Predicates ────────────────────────────────────────────────
            "isWeekend" => {
                check_argc(func, args, 1)?;
                let dt = to_datetime(func, as_number(func, args, 0)?)?;
                let wd = dt.weekday().num_days_from_sunday();
                Value::Bool(wd == 0 || wd == 6)
            }
            "isLeapYear" => {
                check_argc(func, args, 1)?;
                let dt = to_datetime(func, as_number(func, args, 0)?)?;
                Value::Bool(is_leap(dt.year()))
            }
            "daysInMonth" => {
                check_argc(func, args, 1)?;
                let dt = to_datetime(func, as_number(func, args, 0)?)?;
                Value::Number(f64::from(days_in_month(dt.year(), dt.month())))
            }
            "age" => {
                check_argc_range(func, args, 1, 2)?;
                let birth = to_datetime(func, as_number(func, args, 0)?)?;
                let now = match args.get(1) {
                    Some(_) => to_datetime(func, as_number(func, args, 1)?)?,
                    None => Utc::now(),
                };
                let mut years = now.year() - birth.year();
                if (now.month(), now.day()) < (birth.month(), birth.day()) {
                    years -= 1;
                }
                Value::Number(f64::from(years))
            }

            // ── Timezones ─────────────────────────────────────────────────
            "toTimezone" | "fromTimezone" => {
                check_argc(func, args, 2)?;
                let ts = as_number(func, args, 0)?;
                let tz = as_str(func, args, 1)?;
                if tz.is_empty() || tz == "UTC" {
                    Value::Number(ts)
                } else {
                    let dt = to_datetime(func, ts)?;
                    let offset = tz_offset_seconds(func, tz, dt)? as f64;
                    if name == "toTimezone" {
                        Value::Number(ts + offset)
                    } else {
                        Value::Number(ts - offset)
                    }
                }
            }

            // ── Utilities ─────────────────────────────────────────────────
            "sleep" => {
                check_argc(func, args, 1)?;
                let secs = as_number(func, args, 0)?;
                if !secs.is_finite() || secs < 0.0 {
                    return Err(FnError::domain(func, "sleep duration must be non-negative"));
                }
                std::thread::sleep(std::time::Duration::from_secs_f64(secs));
                Value::Bool(true)
            }
            "range" => {
                check_argc(func, args, 3)?;
                let start = as_number(func, args, 0)?;
                let end = as_number(func, args, 1)?;
                let step = as_number(func, args, 2)?;
                if step <= 0.0 {
                    return Err(FnError::domain(func, "step must be positive"));
                }
                if start > end {
                    return Err(FnError::domain(func, "start must not exceed end"));
                }
                let mut out = Vec::new();
                let mut k = 0u64;
                loop {
                    let v = start + step * k as f64;
                    if v > end {
                        break;
                    }
                    out.push(Value::Number(v));
                    k += 1;
                }
                Value::List(out)
            }

            _ => return Ok(None),
        };
        Ok(Some(v))
    }
}

/// Exposed for the HTTP module's cookie expiry rendering.
pub(crate) fn render_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}
