//! The sensor record contract.
//!
//! Every inbound message produces exactly one [`SensorRecord`]. The record is
//! a closed sum over the ten sensor domains; each variant carries its own
//! field set and knows how to serialize itself, whether it holds anything
//! worth emitting, and how it maps onto time-series tags and fields.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::trace;

use crate::config::Settings;
use crate::domain::{
    BleTemperature, EspStatus, Gnss, Navigation, Outside, PhyTemperature, Propulsion, Steering,
    Water, Wind,
};
use crate::topic::strip_whitespace;

/// Sensor domain tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    Navigation,
    Wind,
    Water,
    Outside,
    Steering,
    Propulsion,
    Gnss,
    BleTemperature,
    PhyTemperature,
    EspStatus,
}

impl Domain {
    /// All domains, in subscription order.
    pub const ALL: [Domain; 10] = [
        Domain::BleTemperature,
        Domain::PhyTemperature,
        Domain::EspStatus,
        Domain::Navigation,
        Domain::Gnss,
        Domain::Steering,
        Domain::Wind,
        Domain::Water,
        Domain::Outside,
        Domain::Propulsion,
    ];

    /// Time-series measurement name.
    pub fn measurement_name(self) -> &'static str {
        match self {
            Domain::Navigation => "navigation",
            Domain::Wind => "wind",
            Domain::Water => "water",
            Domain::Outside => "outside",
            Domain::Steering => "steering",
            Domain::Propulsion => "propulsion",
            Domain::Gnss => "gnss",
            Domain::BleTemperature => "bleTemperature",
            Domain::PhyTemperature => "phyTemperature",
            Domain::EspStatus => "espStatus",
        }
    }

    /// Path fragment used when building the republish topic.
    pub fn topic_prefix(self) -> &'static str {
        match self {
            Domain::Navigation => "navigation",
            Domain::Wind => "environment/wind",
            Domain::Water => "water",
            Domain::Outside => "environment/outside",
            Domain::Steering => "steering",
            Domain::Propulsion => "propulsion",
            Domain::Gnss => "gnss",
            Domain::BleTemperature => "ble/temperature",
            Domain::PhyTemperature => "rtd/temperature",
            Domain::EspStatus => "esp/status",
        }
    }

    /// Key used for this domain in `topic-overrides` and
    /// `verbose-topic-logging`.
    pub fn config_key(self) -> &'static str {
        match self {
            Domain::Navigation => "nav",
            Domain::Wind => "wind",
            Domain::Water => "water",
            Domain::Outside => "outside",
            Domain::Steering => "steering",
            Domain::Propulsion => "propulsion",
            Domain::Gnss => "gnss",
            Domain::BleTemperature => "ble",
            Domain::PhyTemperature => "phy",
            Domain::EspStatus => "esp",
        }
    }

    pub fn from_config_key(key: &str) -> Option<Domain> {
        Domain::ALL.into_iter().find(|d| d.config_key() == key)
    }

    /// Flat-payload domains publish one self-describing JSON object per
    /// reading instead of one message per leaf measurement.
    pub fn is_flat(self) -> bool {
        matches!(
            self,
            Domain::BleTemperature | Domain::PhyTemperature | Domain::EspStatus
        )
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.measurement_name())
    }
}

/// A single time-series field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    String(String),
    Boolean(bool),
}

pub type SinkTags = BTreeMap<String, String>;
pub type SinkFields = BTreeMap<String, FieldValue>;

/// What a leaf decoder gets to know about the message beyond its JSON body.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    /// Full inbound topic.
    pub topic: &'a str,
    /// Final `/`-delimited segment of the topic.
    pub measurement: &'a str,
    /// `$source` exactly as it arrived, before name mapping.
    pub raw_source: &'a str,
}

/// Behaviour shared by every domain record.
pub trait DomainRecord {
    /// True when no domain-specific field holds a meaningful value.
    fn is_empty(&self) -> bool;
    fn sink_tags(&self) -> SinkTags;
    fn sink_fields(&self) -> SinkFields;
    fn source(&self) -> &str;
    fn set_source(&mut self, source: String);
    fn timestamp(&self) -> Option<DateTime<Utc>>;
    fn set_timestamp(&mut self, timestamp: DateTime<Utc>);
}

/// Decoding of one leaf measurement into a record.
pub trait LeafDecoder {
    /// Mutate the field(s) that `ctx.measurement` represents. Unknown
    /// measurements are logged and ignored.
    fn decode(&mut self, raw: &Map<String, Value>, ctx: &DecodeContext<'_>);
}

/// One normalized sensor reading.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorRecord {
    Navigation(Navigation),
    Wind(Wind),
    Water(Water),
    Outside(Outside),
    Steering(Steering),
    Propulsion(Propulsion),
    Gnss(Gnss),
    BleTemperature(BleTemperature),
    PhyTemperature(PhyTemperature),
    EspStatus(EspStatus),
}

macro_rules! each_variant {
    ($record:expr, $inner:ident => $body:expr) => {
        match $record {
            SensorRecord::Navigation($inner) => $body,
            SensorRecord::Wind($inner) => $body,
            SensorRecord::Water($inner) => $body,
            SensorRecord::Outside($inner) => $body,
            SensorRecord::Steering($inner) => $body,
            SensorRecord::Propulsion($inner) => $body,
            SensorRecord::Gnss($inner) => $body,
            SensorRecord::BleTemperature($inner) => $body,
            SensorRecord::PhyTemperature($inner) => $body,
            SensorRecord::EspStatus($inner) => $body,
        }
    };
}

impl SensorRecord {
    /// A fresh, zero-valued record for `domain`.
    pub fn new(domain: Domain) -> Self {
        match domain {
            Domain::Navigation => SensorRecord::Navigation(Navigation::default()),
            Domain::Wind => SensorRecord::Wind(Wind::default()),
            Domain::Water => SensorRecord::Water(Water::default()),
            Domain::Outside => SensorRecord::Outside(Outside::default()),
            Domain::Steering => SensorRecord::Steering(Steering::default()),
            Domain::Propulsion => SensorRecord::Propulsion(Propulsion::default()),
            Domain::Gnss => SensorRecord::Gnss(Gnss::default()),
            Domain::BleTemperature => SensorRecord::BleTemperature(BleTemperature::default()),
            Domain::PhyTemperature => SensorRecord::PhyTemperature(PhyTemperature::default()),
            Domain::EspStatus => SensorRecord::EspStatus(EspStatus::default()),
        }
    }

    pub fn domain(&self) -> Domain {
        match self {
            SensorRecord::Navigation(_) => Domain::Navigation,
            SensorRecord::Wind(_) => Domain::Wind,
            SensorRecord::Water(_) => Domain::Water,
            SensorRecord::Outside(_) => Domain::Outside,
            SensorRecord::Steering(_) => Domain::Steering,
            SensorRecord::Propulsion(_) => Domain::Propulsion,
            SensorRecord::Gnss(_) => Domain::Gnss,
            SensorRecord::BleTemperature(_) => Domain::BleTemperature,
            SensorRecord::PhyTemperature(_) => Domain::PhyTemperature,
            SensorRecord::EspStatus(_) => Domain::EspStatus,
        }
    }

    /// Apply one leaf measurement. Flat-payload records have no
    /// measurement switch and are left untouched.
    pub fn decode_leaf(&mut self, raw: &Map<String, Value>, ctx: &DecodeContext<'_>) {
        match self {
            SensorRecord::Navigation(r) => r.decode(raw, ctx),
            SensorRecord::Wind(r) => r.decode(raw, ctx),
            SensorRecord::Water(r) => r.decode(raw, ctx),
            SensorRecord::Outside(r) => r.decode(raw, ctx),
            SensorRecord::Steering(r) => r.decode(raw, ctx),
            SensorRecord::Propulsion(r) => r.decode(raw, ctx),
            SensorRecord::Gnss(r) => r.decode(raw, ctx),
            SensorRecord::BleTemperature(_)
            | SensorRecord::PhyTemperature(_)
            | SensorRecord::EspStatus(_) => {
                trace!("{} is a flat-payload record, skipping leaf decode", self.domain());
            }
        }
    }

    /// JSON encoding with zero-valued fields omitted.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        each_variant!(self, r => serde_json::to_string(r))
    }

    pub fn is_empty(&self) -> bool {
        each_variant!(self, r => r.is_empty())
    }

    pub fn sink_tags(&self) -> SinkTags {
        each_variant!(self, r => r.sink_tags())
    }

    pub fn sink_fields(&self) -> SinkFields {
        each_variant!(self, r => r.sink_fields())
    }

    pub fn measurement_name(&self) -> &'static str {
        self.domain().measurement_name()
    }

    pub fn topic_prefix(&self) -> &'static str {
        self.domain().topic_prefix()
    }

    /// Whether verbose logging is switched on for this record's domain.
    pub fn log_enabled(&self, settings: &Settings) -> bool {
        settings.verbose_logging(self.domain())
    }

    pub fn source(&self) -> &str {
        each_variant!(self, r => r.source())
    }

    pub fn set_source(&mut self, source: String) {
        each_variant!(self, r => r.set_source(source))
    }

    /// Hardware address of a flat-payload record; leaf records have none.
    pub fn mac(&self) -> Option<&str> {
        match self {
            SensorRecord::BleTemperature(r) => Some(&r.mac),
            SensorRecord::PhyTemperature(r) => Some(&r.mac),
            SensorRecord::EspStatus(r) => Some(&r.mac),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        each_variant!(self, r => r.timestamp())
    }

    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        each_variant!(self, r => r.set_timestamp(timestamp))
    }

    /// Default a missing timestamp to now and return the effective value.
    pub fn resolve_timestamp(&mut self) -> DateTime<Utc> {
        match self.timestamp() {
            Some(ts) => ts,
            None => {
                let now = Utc::now();
                self.set_timestamp(now);
                now
            }
        }
    }

    /// Canonical topic this record is republished under.
    ///
    /// Leaf domains: `{root}vessel/{prefix}/{source}/{measurement}`.
    /// Flat domains: `{root}{prefix}/{location}`. Whitespace is stripped.
    pub fn republish_topic(&self, root: &str, measurement: &str) -> String {
        let topic = if self.domain().is_flat() {
            format!("{}{}/{}", root, self.topic_prefix(), self.source())
        } else {
            let segment = match (self, measurement) {
                (SensorRecord::Steering(_), "state") => "autopilotState",
                _ => measurement,
            };
            format!(
                "{}vessel/{}/{}/{}",
                root,
                self.topic_prefix(),
                self.source(),
                segment
            )
        };
        strip_whitespace(&topic)
    }
}

macro_rules! record_from {
    ($($variant:ident),+) => {
        $(
            impl From<$variant> for SensorRecord {
                fn from(r: $variant) -> Self {
                    SensorRecord::$variant(r)
                }
            }
        )+
    };
}

record_from!(
    Navigation,
    Wind,
    Water,
    Outside,
    Steering,
    Propulsion,
    Gnss,
    BleTemperature,
    PhyTemperature,
    EspStatus
);

// ============================================================================
// Helpers shared by the domain records
// ============================================================================

pub(crate) fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

pub(crate) fn is_zero_i64(v: &i64) -> bool {
    *v == 0
}

pub(crate) fn is_false(v: &bool) -> bool {
    !*v
}

pub(crate) fn put_f64(fields: &mut SinkFields, key: &str, v: f64) {
    if v != 0.0 {
        fields.insert(key.to_string(), FieldValue::Float(v));
    }
}

pub(crate) fn put_i64(fields: &mut SinkFields, key: &str, v: i64) {
    if v != 0 {
        fields.insert(key.to_string(), FieldValue::Integer(v));
    }
}

pub(crate) fn put_str(fields: &mut SinkFields, key: &str, v: &str) {
    if !v.is_empty() {
        fields.insert(key.to_string(), FieldValue::String(v.to_string()));
    }
}

pub(crate) fn put_tag(tags: &mut SinkTags, key: &str, v: &str) {
    if !v.is_empty() {
        tags.insert(key.to_string(), v.to_string());
    }
}
