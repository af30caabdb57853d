//! BLE temperature beacons, relayed by the ESP32 hubs as flat JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coerce::{lenient_f64, lenient_i64, lenient_string, lenient_timestamp};
use crate::record::{
    is_zero, is_zero_i64, put_f64, put_i64, put_tag, DomainRecord, SinkFields, SinkTags,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BleTemperature {
    #[serde(
        rename = "MAC",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub mac: String,
    #[serde(
        rename = "Location",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub location: String,
    #[serde(
        rename = "TempF",
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "is_zero"
    )]
    pub temp_f: f64,
    #[serde(
        rename = "BatteryPct",
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "is_zero"
    )]
    pub battery_percent: f64,
    #[serde(
        rename = "Humidity",
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "is_zero"
    )]
    pub humidity: f64,
    #[serde(
        rename = "RSSI",
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "is_zero_i64"
    )]
    pub rssi: i64,
    #[serde(
        rename = "Timestamp",
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

impl DomainRecord for BleTemperature {
    /// A reading arrived, which is meaningful even when every value is zero.
    fn is_empty(&self) -> bool {
        false
    }

    fn sink_tags(&self) -> SinkTags {
        let mut tags = SinkTags::new();
        tags.insert("MAC".to_string(), self.mac.clone());
        put_tag(&mut tags, "Location", &self.location);
        tags
    }

    fn sink_fields(&self) -> SinkFields {
        let mut fields = SinkFields::new();
        put_f64(&mut fields, "TempF", self.temp_f);
        put_f64(&mut fields, "BatteryPercent", self.battery_percent);
        put_f64(&mut fields, "Humidity", self.humidity);
        put_i64(&mut fields, "RSSI", self.rssi);
        fields
    }

    /// Location when known, otherwise the MAC.
    fn source(&self) -> &str {
        if self.location.is_empty() {
            &self.mac
        } else {
            &self.location
        }
    }

    fn set_source(&mut self, source: String) {
        self.location = source;
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = Some(timestamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserialize_payload() {
        let ble: BleTemperature = serde_json::from_str(
            r#"{"MAC":"A4:C1:38:00:11:22","TempF":71.6,"BatteryPct":"88","Humidity":45.5,"RSSI":-71}"#,
        )
        .unwrap();
        assert_eq!(
            ble,
            BleTemperature {
                mac: "A4:C1:38:00:11:22".to_string(),
                temp_f: 71.6,
                battery_percent: 88.0,
                humidity: 45.5,
                rssi: -71,
                ..Default::default()
            }
        );
        assert!(ble.timestamp.is_none());
    }

    #[test]
    fn test_never_empty() {
        assert!(!BleTemperature::default().is_empty());
    }

    #[test]
    fn test_sink_shape() {
        let ble = BleTemperature {
            mac: "aa".to_string(),
            battery_percent: 50.0,
            ..Default::default()
        };
        let tags = ble.sink_tags();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("MAC").map(String::as_str), Some("aa"));
        let fields = ble.sink_fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("BatteryPercent"), Some(&FieldValue::Float(50.0)));
    }

    #[test]
    fn test_source_prefers_location() {
        let mut ble = BleTemperature {
            mac: "aa".to_string(),
            ..Default::default()
        };
        assert_eq!(ble.source(), "aa");
        ble.set_source("Cabin".to_string());
        assert_eq!(ble.source(), "Cabin");
        assert_eq!(ble.sink_tags().get("Location").map(String::as_str), Some("Cabin"));
    }
}
