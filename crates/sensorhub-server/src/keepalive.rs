//! Keepalive publisher for the `pub` command.
//!
//! Victron Cerbo and SignalK brokers stop relaying unless something
//! publishes to a keepalive topic now and then. Each round connects to every
//! configured server in turn, publishes an empty payload to each of its
//! topics and disconnects. A connection is never reused across rounds.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, QoS};
use tracing::{debug, info, warn};
use uuid::Uuid;

use sensorhub_core::{PubServer, PublishSettings};

use crate::bridge::{mqtt_options, wait_for_connack, BridgeError};

/// How long to wait for the broker's ConnAck.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of one pass over every server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundReport {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct KeepalivePublisher {
    settings: PublishSettings,
    servers: Vec<PubServer>,
}

impl KeepalivePublisher {
    pub fn new(settings: PublishSettings, servers: Vec<PubServer>) -> Self {
        Self { settings, servers }
    }

    pub fn interval(&self) -> Duration {
        self.settings.interval
    }

    /// Run rounds every `interval`. `None` runs until the future is dropped.
    pub async fn run(&self, rounds: Option<u64>) {
        let mut done = 0u64;
        loop {
            let report = self.run_round().await;
            debug!(
                "Keepalive round complete: {} ok, {} failed",
                report.succeeded, report.failed
            );
            done += 1;
            if rounds.is_some_and(|n| done >= n) {
                return;
            }
            tokio::time::sleep(self.settings.interval).await;
        }
    }

    /// One pass over every server. Failures are logged and do not stop the
    /// round.
    pub async fn run_round(&self) -> RoundReport {
        let mut report = RoundReport::default();
        for server in &self.servers {
            match self.publish_server(server).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    warn!("Error publishing keepalive to {}: {}", server.url, e);
                    report.failed += 1;
                }
            }
        }
        report
    }

    pub async fn publish_server(&self, server: &PubServer) -> Result<(), BridgeError> {
        debug!("Will publish to {}", server.url);
        let client_id = format!("msh-pub-{}", Uuid::new_v4());
        let options = mqtt_options(client_id, &server.broker, &server.auth)?;
        // Room for every publish plus the disconnect, so nothing below waits
        // on the request channel.
        let (client, mut eventloop) = AsyncClient::new(options, server.topics.len() + 2);

        tokio::time::timeout(CONNECT_TIMEOUT, wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| BridgeError::ConnectTimeout(server.url.clone()))??;

        for topic in &server.topics {
            info!("Publish message to host {} on topic {}", server.url, topic);
            client.try_publish(topic.as_str(), QoS::AtMostOnce, false, Vec::<u8>::new())?;
        }
        client.try_disconnect()?;

        let steps = u32::try_from(server.topics.len() + 1).unwrap_or(u32::MAX);
        let grace = self.settings.disconnect_timeout.saturating_mul(steps);
        tokio::time::timeout(grace, flush_until_disconnect(&mut eventloop))
            .await
            .map_err(|_| BridgeError::FlushTimeout(server.url.clone()))?
    }
}

async fn flush_until_disconnect(eventloop: &mut EventLoop) -> Result<(), BridgeError> {
    loop {
        if let Event::Outgoing(Outgoing::Disconnect) = eventloop.poll().await? {
            return Ok(());
        }
    }
}
