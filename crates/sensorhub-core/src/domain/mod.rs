//! Per-domain records and decoders.
//!
//! Seven domains are "leaf" domains: a device publishes one message per
//! measurement and the topic's last segment says which field it carries.
//! The remaining three (BLE temperature, RTD temperature and ESP status)
//! publish a flat JSON object per reading.

mod ble;
mod esp;
mod gnss;
mod navigation;
mod outside;
mod phy;
mod propulsion;
mod steering;
mod water;
mod wind;

pub use ble::BleTemperature;
pub use esp::EspStatus;
pub use gnss::Gnss;
pub use navigation::{Navigation, VICTRON_GPS_MARKER};
pub use outside::Outside;
pub use phy::PhyTemperature;
pub use propulsion::Propulsion;
pub use steering::Steering;
pub use water::Water;
pub use wind::Wind;

use serde_json::{Map, Value};
use tracing::warn;

use crate::coerce::{parse_f64, parse_i64, parse_map, parse_string};
use crate::record::DecodeContext;

fn value<'a>(raw: &'a Map<String, Value>, ctx: &DecodeContext<'_>) -> Option<&'a Value> {
    let v = raw.get("value");
    if v.is_none() {
        warn!("No value for {} in {}", ctx.measurement, ctx.topic);
    }
    v
}

/// `raw["value"]` as `f64`; coercion failures are logged and yield `None`.
pub(crate) fn value_f64(raw: &Map<String, Value>, ctx: &DecodeContext<'_>) -> Option<f64> {
    let v = value(raw, ctx)?;
    match parse_f64(v) {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("Error parsing {} in {}: {}", ctx.measurement, ctx.topic, e);
            None
        }
    }
}

pub(crate) fn value_i64(raw: &Map<String, Value>, ctx: &DecodeContext<'_>) -> Option<i64> {
    let v = value(raw, ctx)?;
    match parse_i64(v) {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("Error parsing {} in {}: {}", ctx.measurement, ctx.topic, e);
            None
        }
    }
}

pub(crate) fn value_string(raw: &Map<String, Value>, ctx: &DecodeContext<'_>) -> Option<String> {
    let v = value(raw, ctx)?;
    match parse_string(v) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("Error parsing {} in {}: {}", ctx.measurement, ctx.topic, e);
            None
        }
    }
}

pub(crate) fn value_map<'a>(
    raw: &'a Map<String, Value>,
    ctx: &DecodeContext<'_>,
) -> Option<&'a Map<String, Value>> {
    let v = value(raw, ctx)?;
    match parse_map(v) {
        Ok(m) => Some(m),
        Err(e) => {
            warn!("Error parsing {} in {}: {}", ctx.measurement, ctx.topic, e);
            None
        }
    }
}

/// A named member of a compound value, e.g. `position.latitude`.
pub(crate) fn member_f64(
    map: &Map<String, Value>,
    key: &str,
    ctx: &DecodeContext<'_>,
) -> Option<f64> {
    let Some(v) = map.get(key) else {
        warn!("No {} in {} for {}", key, ctx.measurement, ctx.topic);
        return None;
    };
    match parse_f64(v) {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("Error parsing {}.{} in {}: {}", ctx.measurement, key, ctx.topic, e);
            None
        }
    }
}

pub(crate) fn unknown_measurement(ctx: &DecodeContext<'_>) {
    warn!("Unknown measurement {} in {}", ctx.measurement, ctx.topic);
}

#[cfg(test)]
pub(crate) mod test_support {
    use serde_json::{Map, Value};

    use crate::record::DecodeContext;

    pub fn raw(value: Value) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("$source".to_string(), Value::String("src".to_string()));
        map.insert("value".to_string(), value);
        map
    }

    pub fn ctx<'a>(topic: &'a str, measurement: &'a str) -> DecodeContext<'a> {
        DecodeContext {
            topic,
            measurement,
            raw_source: "src",
        }
    }

    pub fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.01
    }
}
