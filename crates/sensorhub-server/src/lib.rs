//! # sensorhub-server
//!
//! Tokio runtime side of the marine sensor hub.
//!
//! - [`pipeline`]: the per-message dispatcher and the sink traits
//! - [`tasks`]: the per-message task pool
//! - [`bridge`]: the rumqttc subscription bridge and republisher
//! - [`influx`]: the InfluxDB v2 sink
//! - [`keepalive`]: the `pub` command's keepalive publisher

pub mod bridge;
pub mod influx;
pub mod keepalive;
pub mod pipeline;
pub mod statistics;
pub mod subscription;
pub mod tasks;
pub mod tls;

pub use bridge::{BridgeError, MqttBridge, MqttPublisher};
pub use influx::InfluxSink;
pub use keepalive::{KeepalivePublisher, RoundReport};
pub use pipeline::{Dispatcher, Outcome, Publisher, SinkError, TimeSeriesSink};
pub use statistics::{Statistics, StatisticsSnapshot};
pub use subscription::RoutingTable;
pub use tasks::TaskPool;
pub use tls::TlsError;
