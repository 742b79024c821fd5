//! Payload parsing and shape normalization.
//!
//! Windowed payloads map field names to either one sample object or an array
//! of them:
//!
//! ```json
//! { "Sensor1": [{ "ts": 1700000000000, "v": 3.5 }], "Sensor2": { "v": 1.25 } }
//! ```
//!
//! Scalar payloads carry `Temperature` and `Humidity`. Both shapes are
//! normalized here, once, so the dispatcher only ever sees sequences of
//! [`RawSample`] and a [`ScalarReading`].

use serde_json::{Map, Value};

use crate::error::IngestError;

const TIMESTAMP_FIELD: &str = "ts";
const VALUE_FIELD: &str = "v";
const TEMPERATURE_FIELD: &str = "Temperature";
const HUMIDITY_FIELD: &str = "Humidity";

/// A sample still stamped with the remote device clock, if it had one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub remote_ts: Option<i64>,
    pub value: f64,
}

/// Samples extracted from one payload field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSamples {
    pub samples: Vec<RawSample>,
    /// Entries skipped because they were not objects or had no usable value.
    pub dropped: usize,
}

impl FieldSamples {
    /// Earliest remote timestamp among the samples.
    pub fn min_remote_ts(&self) -> Option<i64> {
        self.samples.iter().filter_map(|s| s.remote_ts).min()
    }

    /// Remote timestamp of the first sample, used for lag diagnostics.
    pub fn first_remote_ts(&self) -> Option<i64> {
        self.samples.first().and_then(|s| s.remote_ts)
    }
}

/// Temperature and humidity after numeric coercion.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct ScalarReading {
    pub temperature: f64,
    pub humidity: f64,
}

/// Parse a raw payload into its top-level JSON object.
///
/// # Errors
///
/// Fails on invalid UTF-8, invalid JSON, or a top-level value that is not an
/// object.
pub fn parse_object(payload: &[u8]) -> Result<Map<String, Value>, IngestError> {
    let text = std::str::from_utf8(payload)?;
    match serde_json::from_str::<Value>(text)? {
        Value::Object(object) => Ok(object),
        other => Err(IngestError::NotAnObject {
            kind: value_kind(&other),
        }),
    }
}

/// Normalize one windowed field (object or array of objects) into samples.
pub fn normalize_field(field: &Value) -> FieldSamples {
    let mut out = FieldSamples::default();
    match field {
        Value::Array(entries) => {
            out.samples.reserve(entries.len());
            for entry in entries {
                push_entry(&mut out, entry);
            }
        }
        entry => push_entry(&mut out, entry),
    }
    out
}

fn push_entry(out: &mut FieldSamples, entry: &Value) {
    let Value::Object(object) = entry else {
        out.dropped += 1;
        return;
    };
    let Some(value) = object.get(VALUE_FIELD).and_then(coerce_number) else {
        out.dropped += 1;
        return;
    };
    let remote_ts = object.get(TIMESTAMP_FIELD).and_then(timestamp_ms);
    out.samples.push(RawSample { remote_ts, value });
}

/// Remote timestamp in milliseconds; only JSON numbers qualify.
fn timestamp_ms(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    if let Some(ms) = number.as_i64() {
        return Some(ms);
    }
    number
        .as_f64()
        .map(f64::round)
        .filter(|ms| ms.is_finite() && *ms >= i64::MIN as f64 && *ms <= i64::MAX as f64)
        .map(|ms| ms as i64)
}

/// Coerce a JSON value to a finite number.
///
/// Numbers pass through, strings holding a finite number are parsed, and
/// everything else yields `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Coerce a scalar payload; missing or non-numeric fields become zero.
pub fn parse_scalar_reading(object: &Map<String, Value>) -> ScalarReading {
    let field = |name: &str| object.get(name).and_then(coerce_number).unwrap_or(0.0);
    ScalarReading {
        temperature: field(TEMPERATURE_FIELD),
        humidity: field(HUMIDITY_FIELD),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
