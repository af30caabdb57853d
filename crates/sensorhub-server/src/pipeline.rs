//! Message dispatch.
//!
//! [`Dispatcher::process`] takes one inbound `(topic, payload)` through
//! decode, common-field resolution, domain decode and the empty check, then
//! fans the record out to the broker and the time-series sink. Every error
//! is contained to the message: it is logged, counted and reported in the
//! returned [`Outcome`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{trace, warn};

use sensorhub_core::lookup::resolve_location;
use sensorhub_core::record::{SinkFields, SinkTags};
use sensorhub_core::topic::measurement_of;
use sensorhub_core::{DecodeContext, Domain, SensorRecord, Settings};
use sensorhub_protocol::{decode_flat, decode_leaf, encode_record, CodecError, CommonFields};

use crate::statistics::Statistics;

/// Log at `info` when the domain's verbose toggle is on, `trace` otherwise.
macro_rules! gated {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    };
}

/// Errors from either sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    #[error("broker client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("point has no fields")]
    NoFields,

    #[error("encoding failed: {0}")]
    Codec(CodecError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("InfluxDB returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<CodecError> for SinkError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::NoFields(_) => SinkError::NoFields,
            other => SinkError::Codec(other),
        }
    }
}

/// Republishes normalized records to the broker.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), SinkError>;
}

/// Writes one point to a time-series store.
#[async_trait]
pub trait TimeSeriesSink: Send + Sync {
    async fn write(
        &self,
        measurement: &str,
        tags: &SinkTags,
        fields: &SinkFields,
        timestamp: DateTime<Utc>,
    ) -> Result<(), SinkError>;
}

/// Terminal state of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The payload could not be decoded.
    Malformed,
    /// The record carried nothing worth emitting.
    Suppressed,
    /// The record went to the sinks. Each flag is true when that sink was
    /// attempted and succeeded.
    Delivered { published: bool, persisted: bool },
}

pub struct Dispatcher {
    settings: Arc<Settings>,
    publisher: Arc<dyn Publisher>,
    sink: Option<Arc<dyn TimeSeriesSink>>,
    stats: Arc<Statistics>,
}

impl Dispatcher {
    /// Republishing is governed by `settings.repost`; persistence happens
    /// whenever a sink is given.
    pub fn new(
        settings: Arc<Settings>,
        publisher: Arc<dyn Publisher>,
        sink: Option<Arc<dyn TimeSeriesSink>>,
        stats: Arc<Statistics>,
    ) -> Self {
        Self {
            settings,
            publisher,
            sink,
            stats,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn statistics(&self) -> Arc<Statistics> {
        self.stats.clone()
    }

    pub async fn process(&self, domain: Domain, topic: &str, payload: &[u8]) -> Outcome {
        self.stats.record_received();
        let verbose = self.settings.verbose_logging(domain);
        gated!(verbose, "Got a message from: {}", topic);

        let measurement = measurement_of(topic);
        let decoded = if domain.is_flat() {
            self.decode_flat(domain, payload)
        } else {
            self.decode_leaf(domain, topic, measurement, payload)
        };
        let mut record = match decoded {
            Ok(record) => record,
            Err(e) => {
                warn!("Error unmarshalling JSON for topic: {} error: {}", topic, e);
                self.stats.record_malformed();
                return Outcome::Malformed;
            }
        };

        let timestamp = record.resolve_timestamp();

        if record.is_empty() {
            trace!("Empty {} record from {}, not emitting", domain, topic);
            self.stats.record_suppressed();
            return Outcome::Suppressed;
        }

        let published = self.publish(&record, measurement, verbose).await;
        let persisted = self.persist(&record, timestamp, verbose).await;

        Outcome::Delivered {
            published,
            persisted,
        }
    }

    fn decode_flat(&self, domain: Domain, payload: &[u8]) -> Result<SensorRecord, CodecError> {
        let mut record = decode_flat(domain, payload)?;
        let location = record
            .mac()
            .and_then(|mac| resolve_location(&self.settings.mac_locations, mac));
        if let Some(location) = location {
            record.set_source(location);
        }
        Ok(record)
    }

    fn decode_leaf(
        &self,
        domain: Domain,
        topic: &str,
        measurement: &str,
        payload: &[u8],
    ) -> Result<SensorRecord, CodecError> {
        let raw = decode_leaf(payload)?;
        let common = CommonFields::extract(&raw, topic);

        let mut record = SensorRecord::new(domain);
        common.apply(&mut record, &self.settings.source_names);

        let ctx = DecodeContext {
            topic,
            measurement,
            raw_source: &common.raw_source,
        };
        record.decode_leaf(&raw, &ctx);
        Ok(record)
    }

    async fn publish(&self, record: &SensorRecord, measurement: &str, verbose: bool) -> bool {
        if !self.settings.repost {
            return false;
        }

        let topic = record.republish_topic(&self.settings.repost_root_topic, measurement);
        let result = match encode_record(record) {
            Ok(json) => {
                gated!(verbose, "{} {}", record.measurement_name(), json);
                self.publisher.publish(&topic, json).await
            }
            Err(e) => Err(SinkError::from(e)),
        };

        match result {
            Ok(()) => {
                trace!("Published to {}", topic);
                self.stats.record_publish(true);
                true
            }
            Err(e) => {
                warn!("Error publishing to {}: {}", topic, e);
                self.stats.record_publish(false);
                false
            }
        }
    }

    async fn persist(
        &self,
        record: &SensorRecord,
        timestamp: DateTime<Utc>,
        verbose: bool,
    ) -> bool {
        let Some(sink) = &self.sink else {
            return false;
        };

        let result = sink
            .write(
                record.measurement_name(),
                &record.sink_tags(),
                &record.sink_fields(),
                timestamp,
            )
            .await;

        match result {
            Ok(()) => {
                gated!(verbose, "Wrote Point");
                self.stats.record_persist(true);
                true
            }
            Err(e) => {
                warn!("Error writing to influx: {}", e);
                self.stats.record_persist(false);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        published: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Publisher for Recorder {
        async fn publish(&self, topic: &str, payload: String) -> Result<(), SinkError> {
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), payload));
            Ok(())
        }
    }

    fn dispatcher(repost: bool) -> (Dispatcher, Arc<Recorder>) {
        let mut settings = Settings::default();
        settings.repost = repost;
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(
            Arc::new(settings),
            recorder.clone(),
            None,
            Arc::new(Statistics::new()),
        );
        (dispatcher, recorder)
    }

    #[tokio::test]
    async fn test_repost_disabled_skips_publisher() {
        let (dispatcher, recorder) = dispatcher(false);
        let outcome = dispatcher
            .process(
                Domain::Wind,
                "vessels/self/environment/wind/speedApparent",
                br#"{"$source":"w","value":5.0}"#,
            )
            .await;
        assert_eq!(
            outcome,
            Outcome::Delivered {
                published: false,
                persisted: false
            }
        );
        assert!(recorder.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_and_suppressed_are_counted() {
        let (dispatcher, recorder) = dispatcher(true);
        let topic = "vessels/self/navigation/headingTrue";

        assert_eq!(
            dispatcher.process(Domain::Navigation, topic, b"not json").await,
            Outcome::Malformed
        );
        assert_eq!(
            dispatcher
                .process(Domain::Navigation, topic, br#"{"$source":"s"}"#)
                .await,
            Outcome::Suppressed
        );

        let stats = dispatcher.statistics().snapshot();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.suppressed, 1);
        assert!(recorder.published.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_fields_maps_to_sink_error() {
        let err = SinkError::from(CodecError::NoFields("wind".to_string()));
        assert!(matches!(err, SinkError::NoFields));
    }
}
