//! Wired RTD temperature probes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coerce::{lenient_f64, lenient_string, lenient_timestamp};
use crate::record::{is_zero, put_f64, put_tag, DomainRecord, SinkFields, SinkTags};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhyTemperature {
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
    /// Probe channel on the hub.
    #[serde(
        rename = "Device",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub device: String,
    /// What the probe is attached to, e.g. `exhaust`.
    #[serde(
        rename = "Component",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub component: String,
    #[serde(
        rename = "TempF",
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "is_zero"
    )]
    pub temp_f: f64,
    #[serde(
        rename = "Timestamp",
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

impl DomainRecord for PhyTemperature {
    fn is_empty(&self) -> bool {
        false
    }

    fn sink_tags(&self) -> SinkTags {
        let mut tags = SinkTags::new();
        tags.insert("MAC".to_string(), self.mac.clone());
        put_tag(&mut tags, "Location", &self.location);
        put_tag(&mut tags, "Device", &self.device);
        put_tag(&mut tags, "Component", &self.component);
        tags
    }

    fn sink_fields(&self) -> SinkFields {
        let mut fields = SinkFields::new();
        put_f64(&mut fields, "TempF", self.temp_f);
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
