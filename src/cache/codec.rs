//! Type Codec Module
//!
//! Maps values backends cannot hold onto reversible sentinel strings of the
//! form `[storage <tag>]#<payload>`.

use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cache::{RegExpValue, Value, WireValue};

// == Sentinel Constants ==
/// Prefix every sentinel string starts with
pub const SENTINEL_PREFIX: &str = "[storage";

static SENTINEL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[storage ([^\]#]+)\]#([\s\S]*)$").expect("sentinel pattern is valid")
});

/// Tags understood by the codec
mod tag {
    pub const UNDEFINED: &str = "undefined";
    pub const DATE: &str = "date";
    pub const REGEXP: &str = "regexp";
    pub const FUNCTION: &str = "function";
    pub const NAN: &str = "nan";
    pub const INFINITY: &str = "infinity";
}

fn sentinel(tag: &str, payload: impl std::fmt::Display) -> WireValue {
    WireValue::String(format!("[storage {}]#{}", tag, payload))
}

// == Encode ==
/// Converts a value into its backend-native form.
///
/// Structures are encoded element by element.
pub fn encode(value: &Value) -> WireValue {
    match value {
        Value::Undefined => sentinel(tag::UNDEFINED, "undefined"),
        Value::Null => WireValue::Null,
        Value::Bool(b) => WireValue::Bool(*b),
        Value::Number(n) if n.is_nan() => sentinel(tag::NAN, "NaN"),
        Value::Number(n) if n.is_infinite() && *n > 0.0 => sentinel(tag::INFINITY, "Infinity"),
        Value::Number(n) if n.is_infinite() => sentinel(tag::INFINITY, "-Infinity"),
        Value::Number(n) => WireValue::Number(*n),
        Value::String(s) => WireValue::String(s.clone()),
        Value::Date(date) => sentinel(tag::DATE, date.timestamp_millis()),
        Value::RegExp(re) => sentinel(tag::REGEXP, re),
        Value::Function(source) => sentinel(tag::FUNCTION, source),
        Value::Bytes(bytes) => WireValue::Bytes(bytes.clone()),
        Value::Array(items) => WireValue::Array(items.iter().map(encode).collect()),
        Value::Object(map) => WireValue::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), encode(v)))
                .collect(),
        ),
    }
}

// == Decode ==
/// Reconstructs a value from its backend-native form.
///
/// Strings that do not match the sentinel pattern, carry an unknown tag or a
/// malformed payload are returned unchanged.
pub fn decode(wire: WireValue) -> Value {
    match wire {
        WireValue::Null => Value::Null,
        WireValue::Bool(b) => Value::Bool(b),
        WireValue::Number(n) => Value::Number(n),
        WireValue::String(s) => decode_string(s),
        WireValue::Bytes(bytes) => Value::Bytes(bytes),
        WireValue::Array(items) => Value::Array(items.into_iter().map(decode).collect()),
        WireValue::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, decode(v))).collect())
        }
    }
}

fn decode_string(s: String) -> Value {
    if !s.starts_with(SENTINEL_PREFIX) {
        return Value::String(s);
    }

    let decoded = SENTINEL_PATTERN.captures(&s).and_then(|caps| {
        let payload = &caps[2];
        // Only function source may be empty
        if payload.is_empty() && &caps[1] != tag::FUNCTION {
            return None;
        }
        match &caps[1] {
            tag::UNDEFINED => Some(Value::Undefined),
            tag::DATE => payload
                .parse::<i64>()
                .ok()
                .and_then(DateTime::from_timestamp_millis)
                .map(Value::Date),
            tag::REGEXP => RegExpValue::parse(payload).map(Value::RegExp),
            tag::FUNCTION => Some(Value::Function(payload.to_string())),
            tag::NAN => Some(Value::Number(f64::NAN)),
            tag::INFINITY if payload.starts_with('-') => Some(Value::Number(f64::NEG_INFINITY)),
            tag::INFINITY => Some(Value::Number(f64::INFINITY)),
            _ => None,
        }
    });

    decoded.unwrap_or(Value::String(s))
}
