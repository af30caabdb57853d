//! MQTT bridge.
//!
//! Owns the rumqttc event loop for the subscription broker. Inbound
//! publishes are routed to a domain and handed to the task pool; the loop
//! itself never waits on a sink. rumqttc reconnects on the next `poll` after
//! an error, and every ConnAck re-issues the full subscription list.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, Publish, QoS};
use thiserror::Error;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use sensorhub_core::{BrokerAddress, BrokerAuth, Settings, Transport};

use crate::pipeline::{Dispatcher, Publisher, SinkError, TimeSeriesSink};
use crate::statistics::Statistics;
use crate::subscription::RoutingTable;
use crate::tasks::TaskPool;
use crate::tls::{self, TlsError};

/// Keep-alive interval for broker connections.
pub const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Pause between polls after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Capacity of the request channel between clients and the event loop.
const REQUEST_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("transport of {0} is not supported")]
    UnsupportedTransport(String),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    #[error("client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("timed out connecting to {0}")]
    ConnectTimeout(String),

    #[error("timed out flushing messages to {0}")]
    FlushTimeout(String),
}

/// rumqttc options for a broker: transport, credentials and keep-alive.
pub fn mqtt_options(
    client_id: String,
    broker: &BrokerAddress,
    auth: &BrokerAuth,
) -> Result<MqttOptions, BridgeError> {
    let mut options = MqttOptions::new(client_id, broker.host.clone(), broker.port);
    options.set_keep_alive(KEEP_ALIVE);

    if let Some(username) = &auth.username {
        debug!("Using Username: {}", username);
        let password = auth.password.clone().unwrap_or_default();
        options.set_credentials(username.clone(), password);
    }

    match broker.transport {
        Transport::Tcp => {}
        Transport::Tls => {
            options.set_transport(tls::transport(auth.ca_cert.as_deref())?);
        }
        Transport::Ws | Transport::Wss => {
            return Err(BridgeError::UnsupportedTransport(broker.to_string()));
        }
    }

    Ok(options)
}

/// Republishes through the bridge's own client.
pub struct MqttPublisher {
    client: AsyncClient,
    timeout: Duration,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), SinkError> {
        let topic = sensorhub_core::topic::strip_whitespace(topic);
        trace!("Will publish to topic: {}", topic);
        let send = self
            .client
            .publish(topic, QoS::AtMostOnce, false, payload.into_bytes());
        match tokio::time::timeout(self.timeout, send).await {
            Ok(result) => result.map_err(SinkError::from),
            Err(_) => Err(SinkError::Timeout(self.timeout)),
        }
    }
}

/// The subscription side: one broker connection feeding the dispatcher.
pub struct MqttBridge {
    client: AsyncClient,
    eventloop: EventLoop,
    routes: Arc<RoutingTable>,
    dispatcher: Arc<Dispatcher>,
    pool: TaskPool,
}

impl MqttBridge {
    /// Build the client, publisher and dispatcher for `settings`. Nothing
    /// touches the network until [`MqttBridge::run`].
    pub fn new(
        settings: Arc<Settings>,
        routes: RoutingTable,
        sink: Option<Arc<dyn TimeSeriesSink>>,
        pool: TaskPool,
    ) -> Result<Self, BridgeError> {
        let client_id = format!("msh-sub-{}", Uuid::new_v4());
        debug!("Client ID {}", client_id);
        let options = mqtt_options(client_id, &settings.broker, &settings.auth)?;
        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

        let publisher = Arc::new(MqttPublisher::new(client.clone(), settings.publish_timeout));
        let dispatcher = Arc::new(Dispatcher::new(
            settings,
            publisher,
            sink,
            Arc::new(Statistics::new()),
        ));

        Ok(Self {
            client,
            eventloop,
            routes: Arc::new(routes),
            dispatcher,
            pool,
        })
    }

    pub fn statistics(&self) -> Arc<Statistics> {
        self.dispatcher.statistics()
    }

    pub fn pool(&self) -> TaskPool {
        self.pool.clone()
    }

    /// Wait for the first ConnAck and subscribe. A broker that cannot be
    /// reached at launch is an error; later drops are retried by [`run`].
    ///
    /// [`run`]: MqttBridge::run
    pub async fn connect(&mut self, timeout: Duration) -> Result<(), BridgeError> {
        let broker = self.dispatcher.settings().broker.to_string();
        info!("Connecting to {}", broker);
        tokio::time::timeout(timeout, wait_for_connack(&mut self.eventloop))
            .await
            .map_err(|_| BridgeError::ConnectTimeout(broker))??;
        info!("Connected!");
        self.resubscribe();
        Ok(())
    }

    /// Drive the connection until the future is dropped.
    pub async fn run(mut self) {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("Connected!");
                    self.resubscribe();
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => self.dispatch(publish),
                Ok(_) => {}
                Err(e) => {
                    warn!("Connection Lost! {}", e);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    /// Subscribing goes through the request channel, which only drains
    /// while the event loop is polled, so it runs on its own task.
    fn resubscribe(&self) {
        let client = self.client.clone();
        let filters = self.routes.subscriptions();
        tokio::spawn(async move {
            for filter in filters {
                info!("Subscribing to {}", filter);
                if let Err(e) = client.subscribe(filter.as_str(), QoS::AtMostOnce).await {
                    warn!("Error subscribing to {}: {}", filter, e);
                }
            }
        });
    }

    fn dispatch(&self, publish: Publish) {
        let topic = publish.topic;
        let Some(domain) = self.routes.route(&topic) else {
            debug!("No route for topic {}, dropping", topic);
            return;
        };
        let dispatcher = self.dispatcher.clone();
        let payload = publish.payload;
        self.pool.spawn(async move {
            dispatcher.process(domain, &topic, &payload).await;
        });
    }
}

pub(crate) async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), BridgeError> {
    loop {
        if let Event::Incoming(Packet::ConnAck(_)) = eventloop.poll().await? {
            return Ok(());
        }
    }
}
