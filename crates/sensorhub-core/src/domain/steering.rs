//! Rudder and autopilot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::{unknown_measurement, value_f64, value_string};
use crate::convert::radians_to_degrees;
use crate::record::{
    is_zero, put_f64, put_str, put_tag, DecodeContext, DomainRecord, LeafDecoder, SinkFields,
    SinkTags,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Steering {
    #[serde(rename = "Source", skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(rename = "RudderAngle", skip_serializing_if = "is_zero")]
    pub rudder_angle: f64,
    #[serde(rename = "AutoPilotState", skip_serializing_if = "String::is_empty")]
    pub autopilot_state: String,
    /// Autopilot target, degrees magnetic.
    #[serde(rename = "TargetHeading", skip_serializing_if = "is_zero")]
    pub target_heading: f64,
    #[serde(rename = "Timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LeafDecoder for Steering {
    fn decode(&mut self, raw: &Map<String, Value>, ctx: &DecodeContext<'_>) {
        match ctx.measurement {
            "rudderAngle" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.rudder_angle = radians_to_degrees(v);
                }
            }
            "state" => {
                if let Some(s) = value_string(raw, ctx) {
                    self.autopilot_state = s;
                }
            }
            "headingMagnetic" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.target_heading = radians_to_degrees(v);
                }
            }
            "autopilot" | "target" => {}
            _ => unknown_measurement(ctx),
        }
    }
}

impl DomainRecord for Steering {
    fn is_empty(&self) -> bool {
        self.rudder_angle == 0.0 && self.autopilot_state.is_empty() && self.target_heading == 0.0
    }

    fn sink_tags(&self) -> SinkTags {
        let mut tags = SinkTags::new();
        put_tag(&mut tags, "Source", &self.source);
        tags
    }

    fn sink_fields(&self) -> SinkFields {
        let mut fields = SinkFields::new();
        put_f64(&mut fields, "RudderAngle", self.rudder_angle);
        put_str(&mut fields, "AutopilotState", &self.autopilot_state);
        put_f64(&mut fields, "TargetHeading", self.target_heading);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::{close, ctx, raw};
    use crate::record::FieldValue;
    use serde_json::json;

    #[test]
    fn test_autopilot_state() {
        let mut steering = Steering::default();
        steering.decode(&raw(json!("engaged")), &ctx("s/autopilot/state", "state"));
        assert_eq!(steering.autopilot_state, "engaged");
        assert!(!steering.is_empty());
        assert_eq!(
            steering.sink_fields().get("AutopilotState"),
            Some(&FieldValue::String("engaged".to_string()))
        );
        assert!(serde_json::to_string(&steering)
            .unwrap()
            .contains(r#""AutoPilotState":"engaged""#));
    }

    #[test]
    fn test_state_must_be_a_string() {
        let mut steering = Steering::default();
        steering.decode(&raw(json!(1)), &ctx("s/autopilot/state", "state"));
        assert!(steering.is_empty());
    }

    #[test]
    fn test_angles() {
        let mut steering = Steering::default();
        steering.decode(&raw(json!(-0.1)), &ctx("s/rudderAngle", "rudderAngle"));
        steering.decode(
            &raw(json!(1.5708)),
            &ctx("s/autopilot/target/headingMagnetic", "headingMagnetic"),
        );
        assert!(close(steering.rudder_angle, -5.73));
        assert!(close(steering.target_heading, 90.0));
    }

    #[test]
    fn test_container_noops() {
        for m in ["autopilot", "target"] {
            let mut steering = Steering::default();
            steering.decode(&raw(json!({})), &ctx("s/x", m));
            assert!(steering.is_empty());
        }
    }
}
