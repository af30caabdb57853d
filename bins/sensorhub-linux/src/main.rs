//! # Marine Sensor Hub MQTT
//!
//! `sub` normalizes sensor topics into `msh/...` records and InfluxDB
//! points. `pub` sends keepalive messages to brokers that need them.

mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use sensorhub_core::config::DEFAULT_CONFIG_DIRS;
use sensorhub_core::ConfigFile;
use sensorhub_server::{
    InfluxSink, KeepalivePublisher, MqttBridge, RoutingTable, TaskPool, TimeSeriesSink,
};

/// How long `sub` waits for the first ConnAck before giving up.
const STARTUP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Exit status for configuration and startup failures.
const EXIT_CONFIG: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "marine-sensorhub-mqtt",
    version = env!("CARGO_PKG_VERSION"),
    about = "Normalize marine sensor MQTT topics and publish keepalives"
)]
struct Cli {
    /// Config file (default is /etc/marine-sensorhub-mqtt.conf, then ./marine-sensorhub-mqtt.conf)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Subscribe to sensor topics and republish normalized records
    Sub(RunMode),
    /// Publish empty keepalive messages to the configured servers
    Pub(RunMode),
}

#[derive(Args, Debug, Clone, Copy)]
#[group(required = true, multiple = false)]
struct RunMode {
    /// Run until SIGINT or SIGTERM
    #[arg(long)]
    daemon: bool,

    /// Run N iterations, then exit
    #[arg(long, value_name = "N")]
    iter: Option<u64>,
}

impl RunMode {
    /// `None` means run until signalled.
    fn iterations(self) -> Option<u64> {
        if self.daemon {
            None
        } else {
            self.iter
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let loaded = ConfigFile::discover(cli.config.as_deref(), &DEFAULT_CONFIG_DIRS)
        .and_then(|path| ConfigFile::from_file(&path).map(|file| (path, file)));

    let logdir = match &loaded {
        Ok((_, file)) => file.logdir.clone(),
        Err(_) => PathBuf::from("./"),
    };
    let Some(_guard) = start_logging(&logdir) else {
        return Ok(ExitCode::from(EXIT_CONFIG));
    };

    let (path, file) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Fatal error config file: {}", e);
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };
    info!("Using config file: {}", path.display());

    match cli.command {
        Command::Sub(mode) => run_sub(&file, mode).await,
        Command::Pub(mode) => run_pub(&file, mode).await,
    }
}

/// Install logging, reporting failure on stderr since there is no
/// subscriber yet to report it through.
fn start_logging(logdir: &Path) -> Option<WorkerGuard> {
    match logging::init(logdir) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Fatal error setting up logging: {:#}", e);
            None
        }
    }
}

async fn run_sub(file: &ConfigFile, mode: RunMode) -> anyhow::Result<ExitCode> {
    let settings = match file.settings() {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            error!("Invalid subscription configuration: {}", e);
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };

    let routes = RoutingTable::from_settings(&settings).context("building routing table")?;
    if routes.is_empty() {
        warn!("No topics enabled, nothing will be subscribed");
    }

    let sink: Option<Arc<dyn TimeSeriesSink>> = settings.influx.as_ref().map(|influx| {
        info!("Writing to InfluxDB at {}", influx.url);
        Arc::new(InfluxSink::new(influx)) as Arc<dyn TimeSeriesSink>
    });

    let mut bridge = match MqttBridge::new(settings.clone(), routes, sink, TaskPool::unbounded()) {
        Ok(bridge) => bridge,
        Err(e) => {
            error!("Unable to set up connection to {}: {}", settings.broker, e);
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };
    if let Err(e) = bridge.connect(STARTUP_CONNECT_TIMEOUT).await {
        error!("Unable to connect to {}: {}", settings.broker, e);
        return Ok(ExitCode::from(EXIT_CONFIG));
    }

    let stats = bridge.statistics();
    let pool = bridge.pool();
    let interval = Duration::from_secs(file.interval);

    tokio::select! {
        _ = bridge.run() => {}
        _ = shutdown_signal() => {}
        _ = iterate(mode.iterations(), interval) => {
            info!("Completed requested iterations");
        }
    }

    match serde_json::to_string(&stats.snapshot()) {
        Ok(json) => debug!("Statistics: {}", json),
        Err(e) => warn!("Unable to serialize statistics: {}", e),
    }
    debug!("{} messages still in flight at exit", pool.in_flight());
    Ok(ExitCode::SUCCESS)
}

async fn run_pub(file: &ConfigFile, mode: RunMode) -> anyhow::Result<ExitCode> {
    let loaded = file
        .publish_settings()
        .and_then(|publish| Ok((publish, file.publish_servers()?)));
    let (publish, servers) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Invalid publish configuration: {}", e);
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };

    let keepalive = KeepalivePublisher::new(publish, servers);
    tokio::select! {
        _ = keepalive.run(mode.iterations()) => {}
        _ = shutdown_signal() => {}
    }
    Ok(ExitCode::SUCCESS)
}

/// Sleep `interval` `rounds` times. `None` never completes.
async fn iterate(rounds: Option<u64>, interval: Duration) {
    let Some(rounds) = rounds else {
        return std::future::pending().await;
    };
    for i in 0..rounds {
        debug!("Iteration {} of {}", i + 1, rounds);
        tokio::time::sleep(interval).await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Unable to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sub_daemon() {
        let cli = Cli::try_parse_from(["marine-sensorhub-mqtt", "sub", "--daemon"]).unwrap();
        let Command::Sub(mode) = cli.command else {
            panic!("expected sub");
        };
        assert_eq!(mode.iterations(), None);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_pub_iter_with_config() {
        let cli = Cli::try_parse_from([
            "marine-sensorhub-mqtt",
            "--config",
            "/tmp/msh.conf",
            "pub",
            "--iter",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/msh.conf")));
        let Command::Pub(mode) = cli.command else {
            panic!("expected pub");
        };
        assert_eq!(mode.iterations(), Some(3));
    }

    #[test]
    fn test_run_mode_is_required_and_exclusive() {
        assert!(Cli::try_parse_from(["marine-sensorhub-mqtt", "sub"]).is_err());
        assert!(Cli::try_parse_from([
            "marine-sensorhub-mqtt",
            "sub",
            "--daemon",
            "--iter",
            "2"
        ])
        .is_err());
    }

    #[test]
    fn test_unwritable_logdir_stops_startup() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("msh.log");
        std::fs::write(&file, b"").unwrap();
        assert!(start_logging(&file).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_iterate_sleeps_each_round() {
        let start = tokio::time::Instant::now();
        iterate(Some(3), Duration::from_secs(15)).await;
        assert_eq!(start.elapsed(), Duration::from_secs(45));
    }
}
