//! GNSS fix quality.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::{unknown_measurement, value_f64, value_i64, value_string};
use crate::record::{
    is_zero, is_zero_i64, put_f64, put_i64, put_str, put_tag, DecodeContext, DomainRecord,
    LeafDecoder, SinkFields, SinkTags,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Gnss {
    #[serde(rename = "Source", skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(rename = "AntennaAlt", skip_serializing_if = "is_zero")]
    pub antenna_altitude: f64,
    #[serde(rename = "Satellites", skip_serializing_if = "is_zero_i64")]
    pub satellites: i64,
    #[serde(rename = "HozDilution", skip_serializing_if = "is_zero")]
    pub horizontal_dilution: f64,
    #[serde(rename = "PosDilution", skip_serializing_if = "is_zero")]
    pub position_dilution: f64,
    #[serde(rename = "GeoidalSep", skip_serializing_if = "is_zero")]
    pub geoidal_separation: f64,
    #[serde(rename = "Type", skip_serializing_if = "String::is_empty")]
    pub fix_type: String,
    #[serde(rename = "MethodQuality", skip_serializing_if = "String::is_empty")]
    pub method_quality: String,
    #[serde(rename = "Timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LeafDecoder for Gnss {
    fn decode(&mut self, raw: &Map<String, Value>, ctx: &DecodeContext<'_>) {
        match ctx.measurement {
            "antennaAltitude" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.antenna_altitude = v;
                }
            }
            "satellites" => {
                if let Some(v) = value_i64(raw, ctx) {
                    self.satellites = v;
                }
            }
            "horizontalDilution" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.horizontal_dilution = v;
                }
            }
            "positionDilution" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.position_dilution = v;
                }
            }
            "geoidalSeparation" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.geoidal_separation = v;
                }
            }
            "type" => {
                if let Some(s) = value_string(raw, ctx) {
                    self.fix_type = s;
                }
            }
            "methodQuality" => {
                if let Some(s) = value_string(raw, ctx) {
                    self.method_quality = s;
                }
            }
            "integrity" | "satellitesInView" => {}
            _ => unknown_measurement(ctx),
        }
    }
}

impl DomainRecord for Gnss {
    fn is_empty(&self) -> bool {
        self.antenna_altitude == 0.0
            && self.satellites == 0
            && self.horizontal_dilution == 0.0
            && self.position_dilution == 0.0
            && self.geoidal_separation == 0.0
            && self.fix_type.is_empty()
            && self.method_quality.is_empty()
    }

    fn sink_tags(&self) -> SinkTags {
        let mut tags = SinkTags::new();
        put_tag(&mut tags, "Source", &self.source);
        tags
    }

    fn sink_fields(&self) -> SinkFields {
        let mut fields = SinkFields::new();
        put_f64(&mut fields, "AntennaAlt", self.antenna_altitude);
        put_i64(&mut fields, "Satellites", self.satellites);
        put_f64(&mut fields, "HozDilution", self.horizontal_dilution);
        put_f64(&mut fields, "PosDilution", self.position_dilution);
        put_f64(&mut fields, "GeoidalSep", self.geoidal_separation);
        put_str(&mut fields, "Type", &self.fix_type);
        put_str(&mut fields, "MethodQuality", &self.method_quality);
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
