//! Wind speed and direction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::{unknown_measurement, value_f64};
use crate::convert::{meters_per_second_to_knots, radians_to_degrees};
use crate::record::{
    is_zero, put_f64, put_tag, DecodeContext, DomainRecord, LeafDecoder, SinkFields, SinkTags,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Wind {
    #[serde(rename = "Source", skip_serializing_if = "String::is_empty")]
    pub source: String,
    /// Apparent wind speed, knots.
    #[serde(rename = "SpeedApp", skip_serializing_if = "is_zero")]
    pub speed_apparent: f64,
    /// Apparent wind angle, degrees.
    #[serde(rename = "AngleApp", skip_serializing_if = "is_zero")]
    pub angle_apparent: f64,
    #[serde(rename = "SOG", skip_serializing_if = "is_zero")]
    pub speed_over_ground: f64,
    #[serde(rename = "DirectionTrue", skip_serializing_if = "is_zero")]
    pub direction_true: f64,
    #[serde(rename = "Timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LeafDecoder for Wind {
    fn decode(&mut self, raw: &Map<String, Value>, ctx: &DecodeContext<'_>) {
        match ctx.measurement {
            "speedOverGround" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.speed_over_ground = meters_per_second_to_knots(v);
                }
            }
            "directionTrue" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.direction_true = radians_to_degrees(v);
                }
            }
            "speedApparent" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.speed_apparent = meters_per_second_to_knots(v);
                }
            }
            "angleApparent" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.angle_apparent = radians_to_degrees(v);
                }
            }
            _ => unknown_measurement(ctx),
        }
    }
}

impl DomainRecord for Wind {
    fn is_empty(&self) -> bool {
        self.speed_apparent == 0.0
            && self.angle_apparent == 0.0
            && self.speed_over_ground == 0.0
            && self.direction_true == 0.0
    }

    fn sink_tags(&self) -> SinkTags {
        let mut tags = SinkTags::new();
        put_tag(&mut tags, "Source", &self.source);
        tags
    }

    fn sink_fields(&self) -> SinkFields {
        let mut fields = SinkFields::new();
        put_f64(&mut fields, "SpeedApp", self.speed_apparent);
        put_f64(&mut fields, "AngleApp", self.angle_apparent);
        put_f64(&mut fields, "SOG", self.speed_over_ground);
        put_f64(&mut fields, "DirectionTrue", self.direction_true);
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
