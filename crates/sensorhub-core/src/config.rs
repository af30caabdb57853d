//! YAML configuration.
//!
//! The configuration file is deserialized as-is into [`ConfigFile`]. Each
//! command then asks for the part it needs, and only that part is validated:
//! - `sub` calls [`ConfigFile::settings`] for the subscription [`Settings`]
//! - `pub` calls [`ConfigFile::publish_settings`] and
//!   [`ConfigFile::publish_servers`]
//!
//! Validated settings are immutable. The pipeline shares one [`Settings`]
//! behind an `Arc` for the lifetime of the process.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_yaml::Value as YamlValue;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::lookup::{normalize_keys, LookupTable};
use crate::record::Domain;
use crate::topic::{TopicFilter, TopicFilterError};

/// File name searched for when no `--config` is given.
pub const DEFAULT_CONFIG_NAME: &str = "marine-sensorhub-mqtt.conf";

/// Directories searched, in order, for [`DEFAULT_CONFIG_NAME`].
pub const DEFAULT_CONFIG_DIRS: [&str; 2] = ["/etc/", "."];

const DEFAULT_PUBLISH_TIMEOUT_MS: u64 = 500;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {0} not found in /etc or current dir")]
    NotFound(String),

    #[error("unable to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("interval not set")]
    IntervalNotSet,

    #[error("interval set to invalid value {0}")]
    InvalidInterval(i64),

    #[error("publishtimeout not set")]
    PublishTimeoutNotSet,

    #[error("publishtimeout set to invalid value {0}")]
    InvalidPublishTimeout(i64),

    #[error("disconnecttimeout not set")]
    DisconnectTimeoutNotSet,

    #[error("disconnecttimeout set to invalid value {0}")]
    InvalidDisconnectTimeout(i64),

    #[error("no publish servers set")]
    NoPublishServers,

    #[error("no topics set for host {0}")]
    NoTopics(String),

    #[error("unable to read CA file {path}: {source}")]
    CaFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no subscription information set")]
    NoSubscription,

    #[error("server is required but is not set")]
    ServerNotSet,

    #[error("invalid broker url {0}")]
    InvalidBroker(String),

    #[error("influxdb enabled but {0} is not set")]
    InfluxIncomplete(&'static str),

    #[error("invalid topic filter: {0}")]
    Topic(#[from] TopicFilterError),
}

// ============================================================================
// File shape
// ============================================================================

/// The configuration file exactly as written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Directory for the rolling log file.
    #[serde(default = "default_logdir")]
    pub logdir: PathBuf,

    /// Seconds per iteration of `sub --iter`.
    #[serde(default = "default_interval")]
    pub interval: u64,

    #[serde(default)]
    publish: Option<RawPublish>,

    #[serde(default)]
    pubservers: Option<BTreeMap<String, RawPubServer>>,

    #[serde(default)]
    subscription: Option<RawSubscription>,
}

fn default_logdir() -> PathBuf {
    PathBuf::from("./")
}

fn default_interval() -> u64 {
    15
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawPublish {
    interval: Option<i64>,
    timeout: Option<i64>,
    disconnecttimeout: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawPubServer {
    topics: Option<Vec<String>>,
    username: Option<String>,
    password: Option<String>,
    cafile: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawSubscription {
    server: Option<String>,
    username: Option<String>,
    password: Option<String>,
    cafile: Option<PathBuf>,
    repost: Option<YamlValue>,
    #[serde(rename = "repost-root-topic", default)]
    repost_root_topic: String,
    #[serde(rename = "publish-timeout")]
    publish_timeout: Option<YamlValue>,

    #[serde(rename = "bleTopics", default)]
    ble_topics: Vec<String>,
    #[serde(rename = "phyTopics", default)]
    phy_topics: Vec<String>,
    #[serde(rename = "espTopics", default)]
    esp_topics: Vec<String>,
    #[serde(rename = "navTopics", default)]
    nav_topics: Vec<String>,
    #[serde(rename = "gnssTopics", default)]
    gnss_topics: Vec<String>,
    #[serde(rename = "steeringTopics", default)]
    steering_topics: Vec<String>,
    #[serde(rename = "windTopics", default)]
    wind_topics: Vec<String>,
    #[serde(rename = "waterTopics", default)]
    water_topics: Vec<String>,
    #[serde(rename = "outsideTopics", default)]
    outside_topics: Vec<String>,
    #[serde(rename = "propulsionTopics", default)]
    propulsion_topics: Vec<String>,

    #[serde(rename = "MACtoName")]
    mac_to_name: Option<HashMap<String, String>>,
    #[serde(rename = "N2KtoName")]
    n2k_to_name: Option<HashMap<String, String>>,

    #[serde(rename = "topic-overrides")]
    topic_overrides: Option<BTreeMap<String, YamlValue>>,
    #[serde(rename = "verbose-topic-logging")]
    verbose_topic_logging: Option<BTreeMap<String, YamlValue>>,

    influxdb: Option<RawInflux>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawInflux {
    enabled: Option<YamlValue>,
    url: Option<String>,
    org: Option<String>,
    bucket: Option<String>,
    token: Option<String>,
}

// ============================================================================
// Validated settings
// ============================================================================

/// How to reach a broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Tls,
    Ws,
    Wss,
}

/// A parsed broker URL such as `ssl://broker.local:8883`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub transport: Transport,
    pub host: String,
    pub port: u16,
}

impl BrokerAddress {
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidBroker(url.to_string());
        let (scheme, rest) = url.split_once("://").ok_or_else(invalid)?;
        let (transport, default_port) = match scheme.to_ascii_lowercase().as_str() {
            "tcp" | "mqtt" => (Transport::Tcp, 1883),
            "ssl" | "tls" | "mqtts" => (Transport::Tls, 8883),
            "ws" => (Transport::Ws, 80),
            "wss" => (Transport::Wss, 443),
            _ => return Err(invalid()),
        };
        let authority = rest.split('/').next().unwrap_or_default();
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid())?),
            None => (authority, default_port),
        };
        if host.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            transport,
            host: host.to_string(),
            port,
        })
    }

    pub fn is_tls(&self) -> bool {
        matches!(self.transport, Transport::Tls | Transport::Wss)
    }
}

impl Default for BrokerAddress {
    fn default() -> Self {
        Self {
            transport: Transport::Tcp,
            host: "localhost".to_string(),
            port: 1883,
        }
    }
}

impl std::fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheme = match self.transport {
            Transport::Tcp => "tcp",
            Transport::Tls => "ssl",
            Transport::Ws => "ws",
            Transport::Wss => "wss",
        };
        write!(f, "{}://{}:{}", scheme, self.host, self.port)
    }
}

/// Per-domain on/off switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainToggles {
    enabled: BTreeSet<Domain>,
}

impl DomainToggles {
    pub fn all() -> Self {
        Self {
            enabled: Domain::ALL.into_iter().collect(),
        }
    }

    pub fn none() -> Self {
        Self {
            enabled: BTreeSet::new(),
        }
    }

    pub fn set(&mut self, domain: Domain, on: bool) {
        if on {
            self.enabled.insert(domain);
        } else {
            self.enabled.remove(&domain);
        }
    }

    pub fn is_enabled(&self, domain: Domain) -> bool {
        self.enabled.contains(&domain)
    }

    /// Apply a `{key: bool}` override map on top of the current state.
    fn apply(&mut self, section: &str, overrides: &BTreeMap<String, YamlValue>) {
        for (key, value) in overrides {
            let Some(domain) = Domain::from_config_key(key) else {
                warn!("Invalid Key {} found in {}", key, section);
                continue;
            };
            match lenient_bool(value) {
                Some(on) => self.set(domain, on),
                None => warn!("Invalid value {:?} for {} in {}", value, key, section),
            }
        }
    }
}

/// InfluxDB v2 connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxSettings {
    pub url: String,
    pub org: String,
    pub bucket: String,
    pub token: String,
}

/// Credentials and trust anchors for one broker connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerAuth {
    pub username: Option<String>,
    pub password: Option<String>,
    /// PEM bytes of an extra CA to trust on top of the system roots.
    pub ca_cert: Option<Vec<u8>>,
}

/// Runtime settings for the subscription pipeline.
#[derive(Debug, Clone)]
pub struct Settings {
    pub broker: BrokerAddress,
    pub auth: BrokerAuth,
    /// Republish normalized records to the broker.
    pub repost: bool,
    /// Prepended verbatim to every republish topic (include the trailing `/`).
    pub repost_root_topic: String,
    /// Upper bound on waiting for a republish to be handed to the broker.
    pub publish_timeout: Duration,
    topics: BTreeMap<Domain, Vec<String>>,
    pub source_names: LookupTable,
    pub mac_locations: LookupTable,
    pub subscriptions: DomainToggles,
    pub verbose: DomainToggles,
    /// Present only when time-series writes are enabled.
    pub influx: Option<InfluxSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerAddress::default(),
            auth: BrokerAuth::default(),
            repost: false,
            repost_root_topic: String::new(),
            publish_timeout: Duration::from_millis(DEFAULT_PUBLISH_TIMEOUT_MS),
            topics: BTreeMap::new(),
            source_names: LookupTable::new(),
            mac_locations: LookupTable::new(),
            subscriptions: DomainToggles::all(),
            verbose: DomainToggles::none(),
            influx: None,
        }
    }
}

impl Settings {
    /// Configured topic filters for a domain.
    pub fn topics(&self, domain: Domain) -> &[String] {
        self.topics.get(&domain).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_topics(&mut self, domain: Domain, topics: Vec<String>) {
        self.topics.insert(domain, topics);
    }

    pub fn subscription_enabled(&self, domain: Domain) -> bool {
        self.subscriptions.is_enabled(domain)
    }

    pub fn verbose_logging(&self, domain: Domain) -> bool {
        self.verbose.is_enabled(domain)
    }

    pub fn influx_enabled(&self) -> bool {
        self.influx.is_some()
    }
}

/// Settings for the keepalive publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSettings {
    pub interval: Duration,
    /// `publish.timeout`. Required and validated so existing config files
    /// keep loading, but keepalive publishes are queued without waiting and
    /// their delivery is bounded by `disconnect_timeout` alone.
    pub publish_timeout: Duration,
    pub disconnect_timeout: Duration,
}

/// A broker the keepalive publisher sends empty messages to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubServer {
    pub url: String,
    pub broker: BrokerAddress,
    pub topics: Vec<String>,
    pub auth: BrokerAuth,
}

// ============================================================================
// Loading
// ============================================================================

impl ConfigFile {
    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: ConfigFile = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Parse configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Locate the configuration file: `explicit` if given, otherwise the
    /// first [`DEFAULT_CONFIG_NAME`] found in `dirs`.
    pub fn discover(explicit: Option<&Path>, dirs: &[&str]) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        dirs.iter()
            .map(|dir| Path::new(dir).join(DEFAULT_CONFIG_NAME))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| ConfigError::NotFound(DEFAULT_CONFIG_NAME.to_string()))
    }

    /// Validate the `publish` section.
    pub fn publish_settings(&self) -> Result<PublishSettings, ConfigError> {
        let raw = self.publish.clone().unwrap_or_default();

        let interval = raw.interval.ok_or(ConfigError::IntervalNotSet)?;
        if interval <= 0 {
            return Err(ConfigError::InvalidInterval(interval));
        }
        debug!("Interval Set to: {}", interval);

        let timeout = raw.timeout.ok_or(ConfigError::PublishTimeoutNotSet)?;
        if timeout <= 0 {
            return Err(ConfigError::InvalidPublishTimeout(timeout));
        }
        debug!("Publish Timeout Set to: {}", timeout);

        let disconnect = raw
            .disconnecttimeout
            .ok_or(ConfigError::DisconnectTimeoutNotSet)?;
        if disconnect <= 0 {
            return Err(ConfigError::InvalidDisconnectTimeout(disconnect));
        }
        debug!("Disconnect Timeout Set to: {}", disconnect);

        Ok(PublishSettings {
            interval: Duration::from_secs(interval.unsigned_abs()),
            publish_timeout: Duration::from_millis(timeout.unsigned_abs()),
            disconnect_timeout: Duration::from_millis(disconnect.unsigned_abs()),
        })
    }

    /// Validate the `pubservers` section. Every host needs topics and a
    /// readable CA file if one is named.
    pub fn publish_servers(&self) -> Result<Vec<PubServer>, ConfigError> {
        let servers = self
            .pubservers
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::NoPublishServers)?;

        servers
            .iter()
            .map(|(host, raw)| {
                debug!("Server: {}", host);
                let topics = raw
                    .topics
                    .clone()
                    .ok_or_else(|| ConfigError::NoTopics(host.clone()))?;
                let ca_cert = match &raw.cafile {
                    Some(path) => {
                        debug!("Using CA File {}", path.display());
                        Some(std::fs::read(path).map_err(|source| ConfigError::CaFile {
                            path: path.clone(),
                            source,
                        })?)
                    }
                    None => None,
                };
                Ok(PubServer {
                    url: host.clone(),
                    broker: BrokerAddress::parse(host)?,
                    topics,
                    auth: BrokerAuth {
                        username: raw.username.clone(),
                        password: raw.password.clone(),
                        ca_cert,
                    },
                })
            })
            .collect()
    }

    /// Validate the `subscription` section into runtime [`Settings`].
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let raw = self
            .subscription
            .as_ref()
            .ok_or(ConfigError::NoSubscription)?;

        let server = raw.server.as_deref().ok_or(ConfigError::ServerNotSet)?;
        debug!("Setting host: {}", server);
        let mut settings = Settings {
            broker: BrokerAddress::parse(server)?,
            ..Settings::default()
        };

        settings.auth.username = raw.username.clone();
        settings.auth.password = raw.password.clone();
        if let Some(path) = &raw.cafile {
            debug!("Using CA File {}", path.display());
            match std::fs::read(path) {
                Ok(bytes) => settings.auth.ca_cert = Some(bytes),
                Err(e) => warn!("Error Reading Defined CA File {}: {}", path.display(), e),
            }
        }

        if let Some(value) = &raw.repost {
            match lenient_bool(value) {
                Some(repost) => settings.repost = repost,
                None => warn!("Error parsing boolean from config for repost: {:?}", value),
            }
        }
        settings.repost_root_topic = raw.repost_root_topic.clone();

        if let Some(value) = &raw.publish_timeout {
            match lenient_u64(value) {
                Some(ms) => settings.publish_timeout = Duration::from_millis(ms),
                None => warn!(
                    "Error parsing publish-timeout {:?}, will use default {}ms",
                    value, DEFAULT_PUBLISH_TIMEOUT_MS
                ),
            }
        }

        let lists = [
            (Domain::BleTemperature, &raw.ble_topics),
            (Domain::PhyTemperature, &raw.phy_topics),
            (Domain::EspStatus, &raw.esp_topics),
            (Domain::Navigation, &raw.nav_topics),
            (Domain::Gnss, &raw.gnss_topics),
            (Domain::Steering, &raw.steering_topics),
            (Domain::Wind, &raw.wind_topics),
            (Domain::Water, &raw.water_topics),
            (Domain::Outside, &raw.outside_topics),
            (Domain::Propulsion, &raw.propulsion_topics),
        ];
        for (domain, topics) in lists {
            for topic in topics {
                TopicFilter::new(topic)?;
            }
            trace!("{} topics: {:?}", domain, topics);
            settings.set_topics(domain, topics.clone());
        }

        match &raw.mac_to_name {
            Some(table) => settings.mac_locations = normalize_keys(table.clone()),
            None => warn!("MAC to Location Mappings not found"),
        }
        match &raw.n2k_to_name {
            Some(table) => settings.source_names = normalize_keys(table.clone()),
            None => warn!("N2K to Name Mappings not found"),
        }

        if let Some(overrides) = &raw.topic_overrides {
            settings.subscriptions.apply("topic-overrides", overrides);
        }
        if let Some(overrides) = &raw.verbose_topic_logging {
            settings.verbose.apply("verbose-topic-logging", overrides);
        }

        settings.influx = influx_settings(raw.influxdb.as_ref())?;

        Ok(settings)
    }
}

fn influx_settings(raw: Option<&RawInflux>) -> Result<Option<InfluxSettings>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let enabled = match &raw.enabled {
        Some(value) => lenient_bool(value).unwrap_or_else(|| {
            warn!("Error parsing boolean from config for influxdb.enabled: {:?}", value);
            false
        }),
        None => false,
    };
    if !enabled {
        return Ok(None);
    }
    let url = raw
        .url
        .clone()
        .filter(|u| !u.is_empty())
        .ok_or(ConfigError::InfluxIncomplete("url"))?;
    Ok(Some(InfluxSettings {
        url,
        org: raw.org.clone().unwrap_or_default(),
        bucket: raw.bucket.clone().unwrap_or_default(),
        token: raw.token.clone().unwrap_or_default(),
    }))
}

/// `true`, `"true"`, `"T"`, `1` and friends.
fn lenient_bool(value: &YamlValue) -> Option<bool> {
    match value {
        YamlValue::Bool(b) => Some(*b),
        YamlValue::String(s) => match s.as_str() {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
            _ => None,
        },
        YamlValue::Number(n) => match n.as_u64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    }
}

fn lenient_u64(value: &YamlValue) -> Option<u64> {
    match value {
        YamlValue::Number(n) => n.as_u64(),
        YamlValue::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const FULL_YAML: &str = r#"
logdir: /var/log/msh/
publish:
  interval: 30
  timeout: 500
  disconnecttimeout: 250
pubservers:
  "tcp://cerbo.local:1883":
    topics:
      - R/c0619ab1234/keepalive
    username: cerbo
subscription:
  server: ssl://broker.local:8883
  username: msh
  password: secret
  repost: "true"
  repost-root-topic: msh/
  publish-timeout: "750"
  navTopics:
    - vessels/self/navigation/#
  waterTopics:
    - vessels/self/environment/water/+
  bleTopics:
    - msh/+/ble
  MACtoName:
    A4:C1:38:00:11:22: Cabin
  N2KtoName:
    venus.com.victronenergy.gps.288: Main GPS
  topic-overrides:
    gnss: false
    bogus: true
  verbose-topic-logging:
    nav: true
  influxdb:
    enabled: true
    url: http://influx.local:8086
    org: boat
    bucket: sensors
    token: tkn
"#;

    #[test]
    fn test_full_subscription_settings() {
        let file = ConfigFile::from_yaml(FULL_YAML).unwrap();
        assert_eq!(file.logdir, PathBuf::from("/var/log/msh/"));
        assert_eq!(file.interval, 15);

        let settings = file.settings().unwrap();
        assert_eq!(
            settings.broker,
            BrokerAddress {
                transport: Transport::Tls,
                host: "broker.local".to_string(),
                port: 8883
            }
        );
        assert_eq!(settings.auth.username.as_deref(), Some("msh"));
        assert!(settings.repost);
        assert_eq!(settings.repost_root_topic, "msh/");
        assert_eq!(settings.publish_timeout, Duration::from_millis(750));
        assert_eq!(settings.topics(Domain::Navigation), ["vessels/self/navigation/#"]);
        assert!(settings.topics(Domain::Wind).is_empty());
        assert_eq!(
            settings.mac_locations.get("a4:c1:38:00:11:22").map(String::as_str),
            Some("Cabin")
        );
        assert_eq!(
            settings
                .source_names
                .get("venus.com.victronenergy.gps.288")
                .map(String::as_str),
            Some("Main GPS")
        );
        assert!(!settings.subscription_enabled(Domain::Gnss));
        assert!(settings.subscription_enabled(Domain::Navigation));
        assert!(settings.verbose_logging(Domain::Navigation));
        assert!(!settings.verbose_logging(Domain::Wind));
        assert_eq!(
            settings.influx,
            Some(InfluxSettings {
                url: "http://influx.local:8086".to_string(),
                org: "boat".to_string(),
                bucket: "sensors".to_string(),
                token: "tkn".to_string(),
            })
        );
    }

    #[test]
    fn test_subscription_defaults() {
        let settings = ConfigFile::from_yaml("subscription:\n  server: tcp://localhost:1883\n")
            .unwrap()
            .settings()
            .unwrap();
        assert!(!settings.repost);
        assert_eq!(settings.publish_timeout, Duration::from_millis(500));
        for domain in Domain::ALL {
            assert!(settings.subscription_enabled(domain));
            assert!(!settings.verbose_logging(domain));
        }
        assert!(!settings.influx_enabled());
    }

    #[test]
    fn test_invalid_lenient_values_fall_back() {
        let yaml = r#"
subscription:
  server: tcp://localhost
  repost: maybe
  publish-timeout: soon
"#;
        let settings = ConfigFile::from_yaml(yaml).unwrap().settings().unwrap();
        assert!(!settings.repost);
        assert_eq!(settings.publish_timeout, Duration::from_millis(500));
        assert_eq!(settings.broker.port, 1883);
    }

    #[test]
    fn test_subscription_errors() {
        let err = ConfigFile::from_yaml("logdir: ./\n").unwrap().settings().unwrap_err();
        assert!(matches!(err, ConfigError::NoSubscription));
        assert_eq!(err.to_string(), "no subscription information set");

        let err = ConfigFile::from_yaml("subscription:\n  username: x\n")
            .unwrap()
            .settings()
            .unwrap_err();
        assert_eq!(err.to_string(), "server is required but is not set");

        let err = ConfigFile::from_yaml("subscription:\n  server: localhost:1883\n")
            .unwrap()
            .settings()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBroker(_)));

        let err = ConfigFile::from_yaml(
            "subscription:\n  server: tcp://h\n  navTopics: [\"a/#/b\"]\n",
        )
        .unwrap()
        .settings()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Topic(_)));
    }

    #[test]
    fn test_influx_requires_url_when_enabled() {
        let yaml = "subscription:\n  server: tcp://h\n  influxdb:\n    enabled: true\n";
        let err = ConfigFile::from_yaml(yaml).unwrap().settings().unwrap_err();
        assert_eq!(err.to_string(), "influxdb enabled but url is not set");

        let yaml = "subscription:\n  server: tcp://h\n  influxdb:\n    enabled: false\n";
        let settings = ConfigFile::from_yaml(yaml).unwrap().settings().unwrap();
        assert!(settings.influx.is_none());
    }

    #[test]
    fn test_unreadable_subscription_ca_is_not_fatal() {
        let yaml = "subscription:\n  server: ssl://h\n  cafile: /nonexistent/ca.pem\n";
        let settings = ConfigFile::from_yaml(yaml).unwrap().settings().unwrap();
        assert!(settings.auth.ca_cert.is_none());
    }

    #[test]
    fn test_publish_settings() {
        let file = ConfigFile::from_yaml(FULL_YAML).unwrap();
        let publish = file.publish_settings().unwrap();
        assert_eq!(publish.interval, Duration::from_secs(30));
        assert_eq!(publish.publish_timeout, Duration::from_millis(500));
        assert_eq!(publish.disconnect_timeout, Duration::from_millis(250));

        let servers = file.publish_servers().unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].url, "tcp://cerbo.local:1883");
        assert_eq!(servers[0].broker.host, "cerbo.local");
        assert_eq!(servers[0].topics, ["R/c0619ab1234/keepalive"]);
        assert_eq!(servers[0].auth.username.as_deref(), Some("cerbo"));
    }

    #[test]
    fn test_publish_errors() {
        let cases = [
            ("publish:\n  timeout: 1\n  disconnecttimeout: 1\n", "interval not set"),
            (
                "publish:\n  interval: 0\n  timeout: 1\n  disconnecttimeout: 1\n",
                "interval set to invalid value 0",
            ),
            ("publish:\n  interval: 1\n  disconnecttimeout: 1\n", "publishtimeout not set"),
            (
                "publish:\n  interval: 1\n  timeout: -5\n  disconnecttimeout: 1\n",
                "publishtimeout set to invalid value -5",
            ),
            ("publish:\n  interval: 1\n  timeout: 1\n", "disconnecttimeout not set"),
            (
                "publish:\n  interval: 1\n  timeout: 1\n  disconnecttimeout: 0\n",
                "disconnecttimeout set to invalid value 0",
            ),
        ];
        for (yaml, message) in cases {
            let err = ConfigFile::from_yaml(yaml)
                .unwrap()
                .publish_settings()
                .unwrap_err();
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn test_publish_server_errors() {
        let err = ConfigFile::from_yaml("logdir: ./\n")
            .unwrap()
            .publish_servers()
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoPublishServers));

        let err = ConfigFile::from_yaml("pubservers:\n  tcp://h:1883:\n    username: u\n")
            .unwrap()
            .publish_servers()
            .unwrap_err();
        assert_eq!(err.to_string(), "no topics set for host tcp://h:1883");

        let err = ConfigFile::from_yaml(
            "pubservers:\n  tcp://h:1883:\n    topics: [a]\n    cafile: /nonexistent/ca.pem\n",
        )
        .unwrap()
        .publish_servers()
        .unwrap_err();
        assert!(err.to_string().starts_with("unable to read CA file"));
    }

    #[test]
    fn test_publish_server_ca_is_loaded() {
        let mut ca = tempfile::NamedTempFile::new().unwrap();
        ca.write_all(b"-----BEGIN CERTIFICATE-----\n").unwrap();
        let yaml = format!(
            "pubservers:\n  ssl://h:8883:\n    topics: [a]\n    cafile: {}\n",
            ca.path().display()
        );
        let servers = ConfigFile::from_yaml(&yaml).unwrap().publish_servers().unwrap();
        assert_eq!(
            servers[0].auth.ca_cert.as_deref(),
            Some(&b"-----BEGIN CERTIFICATE-----\n"[..])
        );
        assert!(servers[0].broker.is_tls());
    }

    #[test]
    fn test_from_file_and_discover() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_NAME);
        std::fs::write(&path, FULL_YAML).unwrap();

        let dir_str = dir.path().to_str().unwrap();
        let found = ConfigFile::discover(None, &["/nonexistent-dir", dir_str]).unwrap();
        assert_eq!(found, path);
        assert!(ConfigFile::from_file(&found).unwrap().settings().is_ok());

        let explicit = Path::new("/some/where.conf");
        assert_eq!(
            ConfigFile::discover(Some(explicit), &[dir_str]).unwrap(),
            explicit
        );
        assert!(matches!(
            ConfigFile::discover(None, &["/nonexistent-dir"]),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_broker_address_parse() {
        let addr = BrokerAddress::parse("tcp://localhost:1883").unwrap();
        assert_eq!(addr.transport, Transport::Tcp);
        assert_eq!(addr.to_string(), "tcp://localhost:1883");

        let addr = BrokerAddress::parse("mqtts://broker").unwrap();
        assert_eq!(addr.port, 8883);
        assert!(addr.is_tls());

        assert!(BrokerAddress::parse("tcp://:1883").is_err());
        assert!(BrokerAddress::parse("tcp://h:notaport").is_err());
        assert!(BrokerAddress::parse("ftp://h").is_err());
    }
}
