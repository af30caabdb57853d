//! Navigation: position, heading, speed and attitude.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;

use super::{member_f64, unknown_measurement, value_f64, value_map};
use crate::coerce::parse_f64;
use crate::convert::{meters_per_second_to_knots, meters_to_feet, radians_to_degrees};
use crate::record::{
    is_zero, put_f64, put_tag, DecodeContext, DomainRecord, LeafDecoder, SinkFields, SinkTags,
};

/// `$source` prefix of the GPS built into Victron gear. Its fixes duplicate
/// the primary GPS with worse accuracy, so they are dropped.
pub const VICTRON_GPS_MARKER: &str = "venus.com.victronenergy.gps.";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Navigation {
    #[serde(rename = "Source", skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(rename = "Latitude", skip_serializing_if = "is_zero")]
    pub latitude: f64,
    #[serde(rename = "Longitude", skip_serializing_if = "is_zero")]
    pub longitude: f64,
    /// Feet.
    #[serde(rename = "Altitude", skip_serializing_if = "is_zero")]
    pub altitude: f64,
    /// Knots.
    #[serde(rename = "SpeedOverGround", skip_serializing_if = "is_zero")]
    pub speed_over_ground: f64,
    /// Degrees per second.
    #[serde(rename = "RateOfTurn", skip_serializing_if = "is_zero")]
    pub rate_of_turn: f64,
    #[serde(rename = "CourseOverGroundTrue", skip_serializing_if = "is_zero")]
    pub course_over_ground_true: f64,
    #[serde(rename = "HeadingMagnetic", skip_serializing_if = "is_zero")]
    pub heading_magnetic: f64,
    #[serde(rename = "MagneticVariation", skip_serializing_if = "is_zero")]
    pub magnetic_variation: f64,
    #[serde(rename = "MagneticDeviation", skip_serializing_if = "is_zero")]
    pub magnetic_deviation: f64,
    #[serde(rename = "Yaw", skip_serializing_if = "is_zero")]
    pub yaw: f64,
    #[serde(rename = "Pitch", skip_serializing_if = "is_zero")]
    pub pitch: f64,
    #[serde(rename = "Roll", skip_serializing_if = "is_zero")]
    pub roll: f64,
    #[serde(rename = "HeadingTrue", skip_serializing_if = "is_zero")]
    pub heading_true: f64,
    /// Knots.
    #[serde(rename = "SpeedThroughWater", skip_serializing_if = "is_zero")]
    pub speed_through_water: f64,
    #[serde(rename = "Timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Navigation {
    fn degrees(slot: &mut f64, raw: &Map<String, Value>, ctx: &DecodeContext<'_>) {
        if let Some(v) = value_f64(raw, ctx) {
            *slot = radians_to_degrees(v);
        }
    }

    fn knots(slot: &mut f64, raw: &Map<String, Value>, ctx: &DecodeContext<'_>) {
        if let Some(v) = value_f64(raw, ctx) {
            *slot = meters_per_second_to_knots(v);
        }
    }

    fn decode_position(&mut self, raw: &Map<String, Value>, ctx: &DecodeContext<'_>) {
        let Some(position) = value_map(raw, ctx) else {
            return;
        };
        if let Some(lat) = member_f64(position, "latitude", ctx) {
            self.latitude = lat;
        }
        if let Some(lon) = member_f64(position, "longitude", ctx) {
            self.longitude = lon;
        }
        match position.get("altitude").map(parse_f64) {
            Some(Ok(alt)) => self.altitude = meters_to_feet(alt),
            Some(Err(e)) => trace!("Ignoring altitude in {}: {}", ctx.topic, e),
            None => trace!("No altitude in {}", ctx.topic),
        }
    }

    fn decode_attitude(&mut self, raw: &Map<String, Value>, ctx: &DecodeContext<'_>) {
        let Some(attitude) = value_map(raw, ctx) else {
            return;
        };
        if let Some(yaw) = member_f64(attitude, "yaw", ctx) {
            self.yaw = radians_to_degrees(yaw);
        }
        if let Some(pitch) = member_f64(attitude, "pitch", ctx) {
            self.pitch = radians_to_degrees(pitch);
        }
        if let Some(roll) = member_f64(attitude, "roll", ctx) {
            self.roll = radians_to_degrees(roll);
        }
    }
}

impl LeafDecoder for Navigation {
    fn decode(&mut self, raw: &Map<String, Value>, ctx: &DecodeContext<'_>) {
        if ctx.raw_source.contains(VICTRON_GPS_MARKER) {
            trace!("Skipping Victron GPS source {} on {}", ctx.raw_source, ctx.topic);
            return;
        }
        match ctx.measurement {
            "position" => self.decode_position(raw, ctx),
            "attitude" => self.decode_attitude(raw, ctx),
            "speedOverGround" => Self::knots(&mut self.speed_over_ground, raw, ctx),
            "speedThroughWater" => Self::knots(&mut self.speed_through_water, raw, ctx),
            "rateOfTurn" => Self::degrees(&mut self.rate_of_turn, raw, ctx),
            "courseOverGroundTrue" => Self::degrees(&mut self.course_over_ground_true, raw, ctx),
            "headingMagnetic" => Self::degrees(&mut self.heading_magnetic, raw, ctx),
            "magneticVariation" => Self::degrees(&mut self.magnetic_variation, raw, ctx),
            "magneticDeviation" => Self::degrees(&mut self.magnetic_deviation, raw, ctx),
            "headingTrue" => Self::degrees(&mut self.heading_true, raw, ctx),
            "datetime" | "speedThroughWaterReferenceType" | "log" => {}
            _ => unknown_measurement(ctx),
        }
    }
}

impl DomainRecord for Navigation {
    fn is_empty(&self) -> bool {
        [
            self.latitude,
            self.longitude,
            self.altitude,
            self.speed_over_ground,
            self.rate_of_turn,
            self.course_over_ground_true,
            self.heading_magnetic,
            self.magnetic_variation,
            self.magnetic_deviation,
            self.yaw,
            self.pitch,
            self.roll,
            self.heading_true,
            self.speed_through_water,
        ]
        .iter()
        .all(|v| *v == 0.0)
    }

    fn sink_tags(&self) -> SinkTags {
        let mut tags = SinkTags::new();
        put_tag(&mut tags, "Source", &self.source);
        tags
    }

    fn sink_fields(&self) -> SinkFields {
        let mut fields = SinkFields::new();
        put_f64(&mut fields, "Latitude", self.latitude);
        put_f64(&mut fields, "Longitude", self.longitude);
        put_f64(&mut fields, "Altitude", self.altitude);
        put_f64(&mut fields, "SpeedOverGround", self.speed_over_ground);
        put_f64(&mut fields, "RateOfTurn", self.rate_of_turn);
        put_f64(&mut fields, "CourseOverGroundTrue", self.course_over_ground_true);
        put_f64(&mut fields, "HeadingMagnetic", self.heading_magnetic);
        put_f64(&mut fields, "MagneticVariation", self.magnetic_variation);
        put_f64(&mut fields, "MagneticDeviation", self.magnetic_deviation);
        put_f64(&mut fields, "Yaw", self.yaw);
        put_f64(&mut fields, "Pitch", self.pitch);
        put_f64(&mut fields, "Roll", self.roll);
        put_f64(&mut fields, "HeadingTrue", self.heading_true);
        put_f64(&mut fields, "SpeedThroughWater", self.speed_through_water);
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
