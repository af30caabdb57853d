//! Engine and transmission.
//!
//! Engine and transmission share leaf names (`oilTemperature`,
//! `oilPressure`); a `/transmission/` segment in the topic decides which
//! field a reading lands in.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::{unknown_measurement, value_f64, value_i64};
use crate::convert::{
    cubic_meters_per_second_to_gallons_per_hour, kelvin_to_fahrenheit, pascal_to_psi,
};
use crate::record::{
    is_zero, is_zero_i64, put_f64, put_i64, put_tag, DecodeContext, DomainRecord, LeafDecoder,
    SinkFields, SinkTags,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Propulsion {
    /// Engine instance from the topic, e.g. `port`.
    #[serde(rename = "Device", skip_serializing_if = "String::is_empty")]
    pub device: String,
    #[serde(rename = "Source", skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(rename = "RPM", skip_serializing_if = "is_zero_i64")]
    pub rpm: i64,
    #[serde(rename = "BoostPSI", skip_serializing_if = "is_zero")]
    pub boost_psi: f64,
    #[serde(rename = "OilTempF", skip_serializing_if = "is_zero")]
    pub oil_temp_f: f64,
    #[serde(rename = "OilPressure", skip_serializing_if = "is_zero")]
    pub oil_pressure: f64,
    #[serde(rename = "CoolantTempF", skip_serializing_if = "is_zero")]
    pub coolant_temp_f: f64,
    /// Seconds.
    #[serde(rename = "RunTime", skip_serializing_if = "is_zero_i64")]
    pub run_time: i64,
    /// Percent.
    #[serde(rename = "EngineLoad", skip_serializing_if = "is_zero")]
    pub engine_load: f64,
    /// Percent.
    #[serde(rename = "EngineTorque", skip_serializing_if = "is_zero")]
    pub engine_torque: f64,
    #[serde(rename = "TransOilTemp", skip_serializing_if = "is_zero")]
    pub trans_oil_temp_f: f64,
    #[serde(rename = "TransOilPressure", skip_serializing_if = "is_zero")]
    pub trans_oil_pressure: f64,
    #[serde(rename = "AlternatorVoltage", skip_serializing_if = "is_zero")]
    pub alternator_voltage: f64,
    /// Gallons per hour.
    #[serde(rename = "FuelRate", skip_serializing_if = "is_zero")]
    pub fuel_rate: f64,
    #[serde(rename = "Timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Segment following `propulsion` in a topic such as
/// `vessels/self/propulsion/port/revolutions`.
fn device_from_topic(topic: &str) -> Option<&str> {
    let mut segments = topic.split('/');
    segments.find(|s| *s == "propulsion")?;
    segments.next().filter(|s| !s.is_empty())
}

fn is_transmission(topic: &str) -> bool {
    topic.contains("/transmission/")
}

impl LeafDecoder for Propulsion {
    fn decode(&mut self, raw: &Map<String, Value>, ctx: &DecodeContext<'_>) {
        if let Some(device) = device_from_topic(ctx.topic) {
            if device != ctx.measurement {
                self.device = device.to_string();
            }
        }
        let transmission = is_transmission(ctx.topic);

        match ctx.measurement {
            "revolutions" => {
                // Hz -> RPM
                if let Some(v) = value_i64(raw, ctx) {
                    self.rpm = v.saturating_mul(60);
                }
            }
            "boostPressure" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.boost_psi = pascal_to_psi(v);
                }
            }
            "oilTemperature" => {
                if let Some(v) = value_f64(raw, ctx) {
                    let slot = if transmission {
                        &mut self.trans_oil_temp_f
                    } else {
                        &mut self.oil_temp_f
                    };
                    *slot = kelvin_to_fahrenheit(v);
                }
            }
            "oilPressure" => {
                if let Some(v) = value_f64(raw, ctx) {
                    let slot = if transmission {
                        &mut self.trans_oil_pressure
                    } else {
                        &mut self.oil_pressure
                    };
                    *slot = pascal_to_psi(v);
                }
            }
            "temperature" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.coolant_temp_f = kelvin_to_fahrenheit(v);
                }
            }
            "alternatorVoltage" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.alternator_voltage = v;
                }
            }
            "rate" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.fuel_rate = cubic_meters_per_second_to_gallons_per_hour(v);
                }
            }
            "runTime" => {
                if let Some(v) = value_i64(raw, ctx) {
                    self.run_time = v;
                }
            }
            "engineLoad" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.engine_load = v * 100.0;
                }
            }
            "engineTorque" => {
                if let Some(v) = value_f64(raw, ctx) {
                    self.engine_torque = v * 100.0;
                }
            }
            "transmission" | "fuel" => {}
            _ => unknown_measurement(ctx),
        }
    }
}

impl DomainRecord for Propulsion {
    fn is_empty(&self) -> bool {
        self.rpm == 0
            && self.run_time == 0
            && [
                self.boost_psi,
                self.oil_temp_f,
                self.oil_pressure,
                self.coolant_temp_f,
                self.engine_load,
                self.engine_torque,
                self.trans_oil_temp_f,
                self.trans_oil_pressure,
                self.alternator_voltage,
                self.fuel_rate,
            ]
            .iter()
            .all(|v| *v == 0.0)
    }

    fn sink_tags(&self) -> SinkTags {
        let mut tags = SinkTags::new();
        put_tag(&mut tags, "Source", &self.source);
        put_tag(&mut tags, "Device", &self.device);
        tags
    }

    fn sink_fields(&self) -> SinkFields {
        let mut fields = SinkFields::new();
        put_i64(&mut fields, "RPM", self.rpm);
        put_f64(&mut fields, "BoostPSI", self.boost_psi);
        put_f64(&mut fields, "OilTempF", self.oil_temp_f);
        put_f64(&mut fields, "OilPressure", self.oil_pressure);
        put_f64(&mut fields, "CoolantTempF", self.coolant_temp_f);
        put_i64(&mut fields, "RunTime", self.run_time);
        put_f64(&mut fields, "EngineLoad", self.engine_load);
        put_f64(&mut fields, "EngineTorque", self.engine_torque);
        put_f64(&mut fields, "TransOilTempF", self.trans_oil_temp_f);
        put_f64(&mut fields, "TransOilPressure", self.trans_oil_pressure);
        put_f64(&mut fields, "AlternatorVoltage", self.alternator_voltage);
        put_f64(&mut fields, "FuelRate", self.fuel_rate);
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
    use serde_json::json;

    #[test]
    fn test_revolutions_to_rpm() {
        let mut prop = Propulsion::default();
        prop.decode(&raw(json!(30)), &ctx("v/propulsion/port/revolutions", "revolutions"));
        assert_eq!(prop.rpm, 1800);
        assert_eq!(prop.device, "port");

        let mut prop = Propulsion::default();
        prop.decode(&raw(json!(30.9)), &ctx("v/propulsion/port/revolutions", "revolutions"));
        assert_eq!(prop.rpm, 1800);
    }

    #[test]
    fn test_transmission_disambiguation() {
        let mut prop = Propulsion::default();
        prop.decode(
            &raw(json!(350)),
            &ctx("v/propulsion/port/transmission/oilTemperature", "oilTemperature"),
        );
        assert!(close(prop.trans_oil_temp_f, 170.33));
        assert_eq!(prop.oil_temp_f, 0.0);
        assert_eq!(prop.device, "port");

        let mut prop = Propulsion::default();
        prop.decode(
            &raw(json!(350)),
            &ctx("v/propulsion/port/oilTemperature", "oilTemperature"),
        );
        assert!(close(prop.oil_temp_f, 170.33));
        assert_eq!(prop.trans_oil_temp_f, 0.0);
    }

    #[test]
    fn test_oil_pressure() {
        let mut prop = Propulsion::default();
        prop.decode(
            &raw(json!(300000)),
            &ctx("v/propulsion/port/transmission/oilPressure", "oilPressure"),
        );
        assert!(close(prop.trans_oil_pressure, 43.51));
        assert_eq!(prop.oil_pressure, 0.0);
    }

    #[test]
    fn test_fractions_to_percent() {
        let mut prop = Propulsion::default();
        prop.decode(&raw(json!(0.42)), &ctx("v/propulsion/port/engineLoad", "engineLoad"));
        prop.decode(&raw(json!("0.5")), &ctx("v/propulsion/port/engineTorque", "engineTorque"));
        assert!(close(prop.engine_load, 42.0));
        assert!(close(prop.engine_torque, 50.0));
    }

    #[test]
    fn test_fuel_rate_and_runtime() {
        let mut prop = Propulsion::default();
        prop.decode(&raw(json!(0.0001)), &ctx("v/propulsion/port/fuel/rate", "rate"));
        prop.decode(&raw(json!(3600.0)), &ctx("v/propulsion/port/runTime", "runTime"));
        assert!(close(prop.fuel_rate, 95.1019));
        assert_eq!(prop.run_time, 3600);
    }

    #[test]
    fn test_containers_and_unknowns_are_empty() {
        for m in ["transmission", "fuel", "exhaustTemperature"] {
            let mut prop = Propulsion::default();
            prop.decode(&raw(json!(1.0)), &ctx("v/propulsion/port/x", m));
            assert!(prop.is_empty(), "{m}");
        }
    }

    #[test]
    fn test_tags_include_device() {
        let prop = Propulsion {
            device: "port".to_string(),
            source: "ecu".to_string(),
            rpm: 1800,
            ..Default::default()
        };
        let tags = prop.sink_tags();
        assert_eq!(tags.get("Device").map(String::as_str), Some("port"));
        assert_eq!(tags.get("Source").map(String::as_str), Some("ecu"));
    }

    #[test]
    fn test_device_from_topic() {
        assert_eq!(device_from_topic("a/propulsion/stbd/revolutions"), Some("stbd"));
        assert_eq!(device_from_topic("a/engine/revolutions"), None);
        assert_eq!(device_from_topic("a/propulsion"), None);
    }
}
