//! ESP32 hub health reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coerce::{lenient_bool, lenient_i64, lenient_string, lenient_timestamp};
use crate::record::{
    is_false, is_zero_i64, put_i64, put_tag, DomainRecord, FieldValue, SinkFields, SinkTags,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EspStatus {
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
        rename = "IPAddress",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub ip_address: String,
    /// Firmware version.
    #[serde(
        rename = "MSHVersion",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub msh_version: String,
    #[serde(
        rename = "FreeSRAM",
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "is_zero_i64"
    )]
    pub free_sram: i64,
    #[serde(
        rename = "FreeHeap",
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "is_zero_i64"
    )]
    pub free_heap: i64,
    #[serde(
        rename = "FreePSRAM",
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "is_zero_i64"
    )]
    pub free_psram: i64,
    #[serde(
        rename = "WiFiReconnectCount",
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "is_zero_i64"
    )]
    pub wifi_reconnect_count: i64,
    #[serde(
        rename = "MQTTReconnectCount",
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "is_zero_i64"
    )]
    pub mqtt_reconnect_count: i64,
    #[serde(
        rename = "BLEEnabled",
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "is_false"
    )]
    pub ble_enabled: bool,
    #[serde(
        rename = "RTDEnabled",
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "is_false"
    )]
    pub rtd_enabled: bool,
    #[serde(
        rename = "WiFiRSSI",
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "is_zero_i64"
    )]
    pub wifi_rssi: i64,
    #[serde(
        rename = "HasTime",
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "is_false"
    )]
    pub has_time: bool,
    #[serde(
        rename = "HasResetMQTT",
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "is_false"
    )]
    pub has_reset_mqtt: bool,
    #[serde(
        rename = "Timestamp",
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

fn flag(fields: &mut SinkFields, key: &str, v: bool) {
    fields.insert(key.to_string(), FieldValue::Integer(i64::from(v)));
}

impl DomainRecord for EspStatus {
    fn is_empty(&self) -> bool {
        false
    }

    fn sink_tags(&self) -> SinkTags {
        let mut tags = SinkTags::new();
        tags.insert("MAC".to_string(), self.mac.clone());
        put_tag(&mut tags, "Location", &self.location);
        put_tag(&mut tags, "IPAddress", &self.ip_address);
        put_tag(&mut tags, "MSHVersion", &self.msh_version);
        tags
    }

    fn sink_fields(&self) -> SinkFields {
        let mut fields = SinkFields::new();
        put_i64(&mut fields, "FreeSRAM", self.free_sram);
        put_i64(&mut fields, "FreeHeap", self.free_heap);
        put_i64(&mut fields, "FreePSRAM", self.free_psram);
        // zero reconnects is a real observation
        fields.insert(
            "WiFiReconnectCount".to_string(),
            FieldValue::Integer(self.wifi_reconnect_count),
        );
        fields.insert(
            "MQTTReconnectCount".to_string(),
            FieldValue::Integer(self.mqtt_reconnect_count),
        );
        flag(&mut fields, "BLEEnabled", self.ble_enabled);
        flag(&mut fields, "RTDEnabled", self.rtd_enabled);
        flag(&mut fields, "HasTime", self.has_time);
        flag(&mut fields, "HasResetMQTT", self.has_reset_mqtt);
        put_i64(&mut fields, "WiFiRSSI", self.wifi_rssi);
        fields
    }

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
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserialize_status() {
        let esp: EspStatus = serde_json::from_str(
            r#"{"MAC":"24:6F:28:AA:BB:CC","IPAddress":"10.0.0.7","MSHVersion":"1.4.2",
                "FreeHeap":123456,"FreeSRAM":"2048","WiFiReconnectCount":0,"MQTTReconnectCount":3,
                "BLEEnabled":true,"RTDEnabled":"false","WiFiRSSI":-58,"HasTime":1}"#,
        )
        .unwrap();
        assert_eq!(esp.free_heap, 123456);
        assert_eq!(esp.free_sram, 2048);
        assert_eq!(esp.mqtt_reconnect_count, 3);
        assert!(esp.ble_enabled);
        assert!(!esp.rtd_enabled);
        assert!(esp.has_time);
        assert!(!esp.has_reset_mqtt);
    }

    #[test]
    fn test_sink_fields_always_carry_counters_and_flags() {
        let fields = EspStatus::default().sink_fields();
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "BLEEnabled",
                "HasResetMQTT",
                "HasTime",
                "MQTTReconnectCount",
                "RTDEnabled",
                "WiFiReconnectCount",
            ]
        );
        assert_eq!(fields.get("BLEEnabled"), Some(&FieldValue::Integer(0)));
    }

    #[test]
    fn test_tags() {
        let esp = EspStatus {
            mac: "m".to_string(),
            ip_address: "10.0.0.7".to_string(),
            ..Default::default()
        };
        let tags = esp.sink_tags();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.get("IPAddress").map(String::as_str), Some("10.0.0.7"));
        assert!(!esp.is_empty());
    }
}
