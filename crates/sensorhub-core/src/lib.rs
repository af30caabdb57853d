//! # sensorhub-core
//!
//! Core model for the marine sensor hub.
//!
//! This crate provides:
//! - Unit conversions from SI wire units to display units
//! - Lenient coercion of loosely typed JSON values
//! - The [`SensorRecord`] sum type and the ten domain records behind it
//! - MQTT topic filter matching and topic helpers
//! - The YAML configuration model and its validation
//!
//! This crate is intentionally runtime-agnostic and contains no async code.

pub mod coerce;
pub mod config;
pub mod convert;
pub mod domain;
pub mod lookup;
pub mod record;
pub mod topic;

pub use coerce::{CoerceError, Scalar};
pub use config::{
    BrokerAddress, BrokerAuth, ConfigError, ConfigFile, InfluxSettings, PubServer, PublishSettings,
    Settings, Transport,
};
pub use record::{DecodeContext, Domain, FieldValue, SensorRecord};
pub use topic::{TopicFilter, TopicFilterError};
