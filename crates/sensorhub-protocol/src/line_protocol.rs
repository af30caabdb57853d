//! InfluxDB v2 line protocol.
//!
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2=val2 timestamp_ns
//! ```
//!
//! Tags and fields arrive as `BTreeMap`s, so both are written in key order.

use chrono::{DateTime, Utc};
use sensorhub_core::record::{SinkFields, SinkTags};
use sensorhub_core::FieldValue;

use crate::codec::CodecError;

/// Format one field value.
///
/// Integers carry the `i` suffix, strings are double-quoted with `"` and
/// `\` escaped.
pub fn format_field_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Float(v) => format!("{}", v),
        FieldValue::Integer(v) => format!("{}i", v),
        FieldValue::String(v) => {
            let escaped = v.replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{}\"", escaped)
        }
        FieldValue::Boolean(v) => v.to_string(),
    }
}

/// Accumulates points and hands them out as a newline-joined body.
#[derive(Debug, Default)]
pub struct LineProtocolWriter {
    buffer: Vec<String>,
}

impl LineProtocolWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Append a point. Empty tag values and non-finite floats are skipped;
    /// a point left with no fields is rejected.
    pub fn write_point(
        &mut self,
        measurement: &str,
        tags: &SinkTags,
        fields: &SinkFields,
        timestamp: DateTime<Utc>,
    ) -> Result<(), CodecError> {
        let body: Vec<String> = fields
            .iter()
            .filter(|(_, value)| !matches!(value, FieldValue::Float(v) if !v.is_finite()))
            .map(|(key, value)| format!("{}={}", escape_key(key), format_field_value(value)))
            .collect();
        if body.is_empty() {
            return Err(CodecError::NoFields(measurement.to_string()));
        }

        let mut line = escape_measurement(measurement);

        for (key, value) in tags.iter().filter(|(_, v)| !v.is_empty()) {
            line.push(',');
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&escape_key(value));
        }

        line.push(' ');
        line.push_str(&body.join(","));

        line.push(' ');
        line.push_str(&timestamp_nanos(timestamp).to_string());

        self.buffer.push(line);
        Ok(())
    }

    /// Drain the buffer into a request body.
    pub fn flush(&mut self) -> String {
        std::mem::take(&mut self.buffer).join("\n")
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Nanoseconds since the epoch, saturating outside the representable range
/// (roughly 1677 to 2262).
fn timestamp_nanos(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_nanos_opt().unwrap_or_else(|| {
        if ts.timestamp() < 0 {
            i64::MIN
        } else {
            i64::MAX
        }
    })
}

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

/// Tag keys, tag values and field keys share the same escaping rules.
fn escape_key(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}
