//! Lenient conversions between value types.
//!
//! The strict accessors on [`Value`] fail unless the type matches exactly;
//! these functions instead apply the conversion rules of the query
//! language, e.g. when a filter result has to be interpreted as a boolean.

use base64::Engine;
use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};

use super::value::Value;
use crate::error::{StreamqlError, StreamqlResult};

const MAX_CONV_FLOAT64: f64 = i64::MAX as f64;
const MIN_CONV_FLOAT64: f64 = i64::MIN as f64;

/// The zero timestamp: 0001-01-01T00:00:00Z. This is not the Unix epoch,
/// which is an ordinary (truthy) timestamp.
pub fn zero_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn cannot_convert(value: &Value, target: &str) -> StreamqlError {
    StreamqlError::TypeError(format!(
        "cannot convert {} to {}",
        value.value_type(),
        target
    ))
}

/// Convert a value to a boolean:
///
/// - Null: false
/// - Bool: the value itself
/// - Int: true if non-zero
/// - Float: true if non-zero and not NaN
/// - String, Blob, Array, Map: true if non-empty
/// - Timestamp: true unless it is the zero time
pub fn to_bool(value: &Value) -> StreamqlResult<bool> {
    Ok(match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0 && !f.is_nan(),
        Value::String(s) => !s.is_empty(),
        Value::Blob(b) => !b.is_empty(),
        Value::Timestamp(t) => *t != zero_time(),
        Value::Array(a) => !a.is_empty(),
        Value::Map(m) => !m.is_empty(),
    })
}

/// Convert a value to an `i64`.
///
/// Floats are truncated and must lie within the `i64` range. Strings are
/// parsed with an optional sign and radix prefix (`0x`, `0o`, `0b`, or a
/// leading `0` for octal). Timestamps yield Unix seconds.
pub fn to_int(value: &Value) -> StreamqlResult<i64> {
    match value {
        Value::Null => Ok(0),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Int(i) => Ok(*i),
        Value::Float(f) => {
            if *f >= MIN_CONV_FLOAT64 && *f <= MAX_CONV_FLOAT64 {
                Ok(*f as i64)
            } else {
                Err(StreamqlError::TypeError(format!(
                    "{} is out of bounds for int64 conversion",
                    f
                )))
            }
        }
        Value::String(s) => parse_int_with_prefix(s),
        Value::Timestamp(t) => Ok(t.timestamp()),
        other => Err(cannot_convert(other, "int")),
    }
}

fn parse_int_with_prefix(s: &str) -> StreamqlResult<i64> {
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => ("-", &s[1..]),
        Some(b'+') => ("", &s[1..]),
        _ => ("", s),
    };
    let lower = rest.to_ascii_lowercase();
    let (radix, digits) = if let Some(d) = lower.strip_prefix("0x") {
        (16, d)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (8, d)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (2, d)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..])
    } else {
        (10, lower.as_str())
    };
    // from_str_radix would accept a second sign after the prefix
    if digits.is_empty() || digits.starts_with(|c: char| c == '+' || c == '-') {
        return Err(StreamqlError::TypeError(format!(
            "invalid integer literal '{}'",
            s
        )));
    }
    i64::from_str_radix(&format!("{}{}", sign, digits), radix)
        .map_err(|e| StreamqlError::TypeError(format!("invalid integer literal '{}': {}", s, e)))
}

/// Convert a value to an `f64`. Timestamps yield Unix seconds including
/// the fractional part.
pub fn to_float(value: &Value) -> StreamqlResult<f64> {
    match value {
        Value::Null => Ok(0.0),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| StreamqlError::TypeError(format!("invalid float literal '{}': {}", s, e))),
        Value::Timestamp(t) => {
            Ok(t.timestamp() as f64 + f64::from(t.timestamp_subsec_nanos()) / 1e9)
        }
        other => Err(cannot_convert(other, "float")),
    }
}

/// Convert a value to its string form. Never fails for the current value
/// types, but keeps the fallible signature of its siblings.
pub fn to_string(value: &Value) -> StreamqlResult<String> {
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Blob(b) => base64::engine::general_purpose::STANDARD.encode(b),
        Value::Timestamp(t) => t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Array(_) | Value::Map(_) => value.to_string(),
    })
}

/// Convert a value to raw bytes. Strings are decoded as base64, arrays
/// must only hold integers in `0..=255`.
pub fn to_blob(value: &Value) -> StreamqlResult<Vec<u8>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|e| StreamqlError::TypeError(format!("invalid base64 string: {}", e))),
        Value::Blob(b) => Ok(b.clone()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Int(i) => u8::try_from(*i).map_err(|_| {
                    StreamqlError::TypeError(format!("cannot convert int to blob value: {}", i))
                }),
                other => Err(cannot_convert(other, "blob value")),
            })
            .collect(),
        other => Err(cannot_convert(other, "blob")),
    }
}

/// Convert a value to a timestamp. Numbers are interpreted as Unix seconds,
/// strings as RFC 3339.
pub fn to_timestamp(value: &Value) -> StreamqlResult<DateTime<Utc>> {
    match value {
        Value::Null => Ok(zero_time()),
        Value::Int(i) => from_unix(*i, 0),
        Value::Float(f) => {
            if *f >= MIN_CONV_FLOAT64 && *f <= MAX_CONV_FLOAT64 {
                let mut secs = *f as i64;
                let mut nanos = (1e9 * (*f - secs as f64)) as i64;
                if nanos < 0 {
                    secs -= 1;
                    nanos += 1_000_000_000;
                }
                from_unix(secs, nanos as u32)
            } else {
                Err(StreamqlError::TypeError(format!(
                    "{} is out of bounds for int64 conversion",
                    f
                )))
            }
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| StreamqlError::TypeError(format!("invalid timestamp '{}': {}", s, e))),
        Value::Timestamp(t) => Ok(*t),
        other => Err(cannot_convert(other, "timestamp")),
    }
}

fn from_unix(secs: i64, nanos: u32) -> StreamqlResult<DateTime<Utc>> {
    Utc.timestamp_opt(secs, nanos).single().ok_or_else(|| {
        StreamqlError::TypeError(format!("{} is out of range for a timestamp", secs))
    })
}

/// Convert a value to a duration. Numbers are seconds; strings are a
/// signed sequence of decimal numbers with units, e.g. `1h30m`, `1.5s`,
/// `-250ms`, `500us`.
pub fn to_duration(value: &Value) -> StreamqlResult<Duration> {
    match value {
        Value::Null => Ok(Duration::zero()),
        Value::Int(i) => Duration::try_seconds(*i).ok_or_else(|| {
            StreamqlError::TypeError(format!("{} seconds is out of range for a duration", i))
        }),
        Value::Float(f) => {
            let nanos = f * 1e9;
            if nanos >= MIN_CONV_FLOAT64 && nanos <= MAX_CONV_FLOAT64 {
                Ok(Duration::nanoseconds(nanos as i64))
            } else {
                Err(StreamqlError::TypeError(format!(
                    "{} seconds is out of range for a duration",
                    f
                )))
            }
        }
        Value::String(s) => parse_duration(s),
        other => Err(cannot_convert(other, "duration")),
    }
}

const NANOS_PER_SECOND: i128 = 1_000_000_000;

fn unit_nanos(unit: &str) -> Option<i128> {
    Some(match unit {
        "ns" => 1,
        "us" | "\u{b5}s" | "\u{3bc}s" => 1_000,
        "ms" => 1_000_000,
        "s" => NANOS_PER_SECOND,
        "m" => 60 * NANOS_PER_SECOND,
        "h" => 3600 * NANOS_PER_SECOND,
        _ => return None,
    })
}

/// Split a leading run of ASCII digits off `s`.
fn split_digits(s: &str) -> (&str, &str) {
    s.split_at(s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len()))
}

fn parse_duration(s: &str) -> StreamqlResult<Duration> {
    let invalid = || StreamqlError::TypeError(format!("invalid duration '{}'", s));
    let (negative, mut rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if rest == "0" {
        return Ok(Duration::zero());
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    // i64::MIN nanoseconds is representable, i64::MAX + 1 is not
    let limit = i64::MAX as i128 + i128::from(negative);
    let mut total: i128 = 0;
    while !rest.is_empty() {
        let (int_part, after) = split_digits(rest);
        let (frac_part, after) = match after.strip_prefix('.') {
            Some(frac) => split_digits(frac),
            None => ("", after),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let unit_len = after
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(after.len());
        let (unit, next) = after.split_at(unit_len);
        if unit.is_empty() {
            return Err(StreamqlError::TypeError(format!(
                "missing unit in duration '{}'",
                s
            )));
        }
        let scale = unit_nanos(unit).ok_or_else(|| {
            StreamqlError::TypeError(format!(
                "unknown unit '{}' in duration '{}' (use ns, us, ms, s, m, h)",
                unit, s
            ))
        })?;

        let whole: i128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(invalid)?;
        if !frac_part.is_empty() {
            // digits beyond nanosecond precision of the largest unit are dropped
            let digits = &frac_part[..frac_part.len().min(18)];
            let frac: i128 = digits.parse().map_err(|_| invalid())?;
            nanos += frac * scale / 10i128.pow(digits.len() as u32);
        }

        total = total.checked_add(nanos).ok_or_else(invalid)?;
        if total > limit {
            return Err(invalid());
        }
        rest = next;
    }

    let total = if negative { -total } else { total };
    i64::try_from(total)
        .map(Duration::nanoseconds)
        .map_err(|_| invalid())
}
