//! Value Module
//!
//! Caller-facing values and the backend-native wire representation.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::codec;

// == Value ==
/// Any value a caller can store, including kinds backends cannot hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    /// May be NaN or infinite
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    RegExp(RegExpValue),
    /// Function source text. Stored and returned verbatim, never executed.
    Function(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Renders the value as JSON, using the wire form for special kinds.
    pub fn to_json(&self) -> serde_json::Value {
        codec::encode(self).into()
    }
}

impl From<serde_json::Value> for Value {
    /// Strings pass through the codec, so sentinel strings become their kind.
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => codec::decode(WireValue::String(s)),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    /// Dates are kept at millisecond precision, the precision they are stored at.
    fn from(date: DateTime<Utc>) -> Self {
        Value::Date(date.trunc_subsecs(3))
    }
}

impl From<RegExpValue> for Value {
    fn from(re: RegExpValue) -> Self {
        Value::RegExp(re)
    }
}

// == RegExp Value ==
/// A regular expression kept as pattern and flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegExpValue {
    source: String,
    flags: String,
}

impl RegExpValue {
    pub fn new(source: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            flags: flags.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    // == Parse ==
    /// Splits a `/pattern/flags` literal at its last slash.
    ///
    /// Returns None when the text is not delimited by slashes or the flags
    /// contain anything other than ASCII letters.
    pub fn parse(literal: &str) -> Option<Self> {
        let body = literal.strip_prefix('/')?;
        let end = body.rfind('/')?;
        let (source, flags) = (&body[..end], &body[end + 1..]);

        if !flags.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        Some(Self::new(source, flags))
    }

    // == Compile ==
    /// Compiles the pattern with the `regex` crate.
    ///
    /// Flags `i`, `m`, `s` and `x` map to their regex builder options;
    /// matching-state flags such as `g` or `y` have no counterpart and are ignored.
    pub fn to_regex(&self) -> std::result::Result<regex::Regex, regex::Error> {
        let mut builder = regex::RegexBuilder::new(&self.source);
        for flag in self.flags.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'x' => {
                    builder.ignore_whitespace(true);
                }
                _ => {}
            }
        }
        builder.build()
    }
}

impl fmt::Display for RegExpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

// == Wire Value ==
/// The representation actually held by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireValue {
    Null,
    Bool(bool),
    /// Always finite
    Number(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<WireValue>),
    Object(BTreeMap<String, WireValue>),
}

impl From<WireValue> for serde_json::Value {
    fn from(wire: WireValue) -> Self {
        match wire {
            WireValue::Null => serde_json::Value::Null,
            WireValue::Bool(b) => serde_json::Value::Bool(b),
            WireValue::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            WireValue::String(s) => serde_json::Value::String(s),
            WireValue::Bytes(bytes) => {
                serde_json::Value::Array(bytes.into_iter().map(serde_json::Value::from).collect())
            }
            WireValue::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            WireValue::Object(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}
