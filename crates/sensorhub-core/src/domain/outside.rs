//! Outside air temperature and barometric pressure.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::{unknown_measurement, value_f64};
use crate::convert::{kelvin_to_fahrenheit, millibar_to_in_hg};
use crate::record::{
    is_zero, put_f64, put_tag, DecodeContext, DomainRecord, LeafDecoder, SinkFields, SinkTags,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Outside {
    #[serde(rename = "Source", skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(rename = "TempF", skip_serializing_if = "is_zero")]
    pub temp_f: f64,
    /// Millibar.
    #[serde(rename = "Pressure", skip_serializing_if = "is_zero")]
    pub pressure: f64,
    #[serde(rename = "PressureInHg", skip_serializing_if = "is_zero")]
    pub pressure_in_hg: f64,
    #[serde(rename = "Timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LeafDecoder for Outside {
    fn decode(&mut self, raw: &Map<String, Value>, ctx: &DecodeContext<'_>) {
        match ctx.measurement {
            "temperature" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.temp_f = kelvin_to_fahrenheit(v);
                }
            }
            "pressure" => {
                // Pa -> hPa (== mbar) -> inHg
                if let Some(v) = value_f64(raw, ctx) {
                    self.pressure = v / 100.0;
                    self.pressure_in_hg = millibar_to_in_hg(self.pressure);
                }
            }
            _ => unknown_measurement(ctx),
        }
    }
}

impl DomainRecord for Outside {
    fn is_empty(&self) -> bool {
        self.temp_f == 0.0 && self.pressure == 0.0 && self.pressure_in_hg == 0.0
    }

    fn sink_tags(&self) -> SinkTags {
        let mut tags = SinkTags::new();
        put_tag(&mut tags, "Source", &self.source);
        tags
    }

    fn sink_fields(&self) -> SinkFields {
        let mut fields = SinkFields::new();
        put_f64(&mut fields, "TempF", self.temp_f);
        put_f64(&mut fields, "Pressure", self.pressure);
        put_f64(&mut fields, "PressureInHg", self.pressure_in_hg);
        fields
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn set_source(&mut self, source: String) {
        self.source = source;
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = Some(timestamp);
    }
}
