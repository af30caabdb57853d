//! Fields shared by every leaf-measurement payload.
//!
//! A leaf payload looks like:
//!
//! ```json
//! {"$source": "venus.com.victronenergy.gps.288",
//!  "timestamp": "2025-01-01T12:00:00.000Z",
//!  "value": 3.14159}
//! ```
//!
//! Only `value` is domain specific; `$source` and `timestamp` are resolved
//! here, once, before the domain decoder runs.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use sensorhub_core::coerce::{parse_iso_millis, parse_string};
use sensorhub_core::lookup::{resolve_source, LookupTable};
use sensorhub_core::SensorRecord;

/// Wire key of the device identifier.
pub const SOURCE_KEY: &str = "$source";
/// Wire key of the event time.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// `$source` and `timestamp` as extracted from a leaf payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommonFields {
    /// Device id exactly as it arrived, before name mapping.
    pub raw_source: String,
    /// Event time when present and parseable.
    pub timestamp: Option<DateTime<Utc>>,
}

impl CommonFields {
    /// Pull the common fields out of a decoded payload. Coercion failures
    /// are logged and leave the field unset.
    pub fn extract(raw: &Map<String, Value>, topic: &str) -> Self {
        let mut fields = CommonFields::default();

        match raw.get(SOURCE_KEY).map(parse_string) {
            Some(Ok(source)) => fields.raw_source = source,
            Some(Err(e)) => warn!("Error parsing {} in {}: {}", SOURCE_KEY, topic, e),
            None => warn!("No {} in {}", SOURCE_KEY, topic),
        }

        match raw.get(TIMESTAMP_KEY).map(parse_string) {
            Some(Ok(ts)) => {
                fields.timestamp = parse_iso_millis(&ts);
                if fields.timestamp.is_none() {
                    warn!("Error parsing time string {:?} in {}", ts, topic);
                }
            }
            Some(Err(e)) => warn!("Error parsing {} in {}: {}", TIMESTAMP_KEY, topic, e),
            None => warn!("No {} in {}", TIMESTAMP_KEY, topic),
        }

        fields
    }

    /// Copy the fields onto a record, mapping the source to its display
    /// name. A missing timestamp is left for the caller to default.
    pub fn apply(&self, record: &mut SensorRecord, names: &LookupTable) {
        record.set_source(resolve_source(names, &self.raw_source));
        if let Some(ts) = self.timestamp {
            record.set_timestamp(ts);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use sensorhub_core::lookup::normalize_keys;
    use sensorhub_core::Domain;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_extract_complete() {
        let raw = map(json!({
            "$source": "s",
            "timestamp": "2025-01-01T12:00:00.000Z",
            "value": 1.0
        }));
        let fields = CommonFields::extract(&raw, "t");
        assert_eq!(
            fields,
            CommonFields {
                raw_source: "s".to_string(),
                timestamp: Some(Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()),
            }
        );
    }

    #[test]
    fn test_extract_tolerates_bad_shapes() {
        let raw = map(json!({"$source": 42, "timestamp": "yesterday"}));
        assert_eq!(CommonFields::extract(&raw, "t"), CommonFields::default());

        let raw = map(json!({"value": 1}));
        assert_eq!(CommonFields::extract(&raw, "t"), CommonFields::default());
    }

    #[test]
    fn test_apply_maps_source_case_insensitively() {
        let names = normalize_keys(
            [("test-source".to_string(), "mapped-source".to_string())]
                .into_iter()
                .collect(),
        );
        let mut record = SensorRecord::new(Domain::Wind);
        let fields = CommonFields {
            raw_source: "TEST-SOURCE".to_string(),
            timestamp: None,
        };
        fields.apply(&mut record, &names);
        assert_eq!(record.source(), "mapped-source");
        assert!(record.timestamp().is_none());

        let mut record = SensorRecord::new(Domain::Wind);
        let fields = CommonFields {
            raw_source: "unmapped".to_string(),
            timestamp: Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
        };
        fields.apply(&mut record, &names);
        assert_eq!(record.source(), "unmapped");
        assert_eq!(record.timestamp(), fields.timestamp);
    }
}
