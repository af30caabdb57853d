//! Console and rolling-file logging.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_NAME: &str = "marine-sensorhub-mqtt.log";

/// Map a `LOGLEVEL` value to a filter directive. Unknown or missing values
/// mean `debug`.
pub fn level_directive(level: Option<&str>) -> &'static str {
    match level.map(|l| l.trim().to_ascii_uppercase()).as_deref() {
        Some("TRACE") => "trace",
        Some("DEBUG") => "debug",
        Some("INFO") => "info",
        Some("WARN") => "warn",
        Some("ERROR") => "error",
        _ => "debug",
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOGLEVEL").ok();
        EnvFilter::new(level_directive(level.as_deref()))
    })
}

/// Install the global subscriber: stderr plus a daily file in `logdir`.
/// Keep the returned guard alive for the life of the process or buffered
/// file output is lost.
pub fn init(logdir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(logdir)
        .with_context(|| format!("creating log directory {}", logdir.display()))?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_NAME)
        .build(logdir)
        .with_context(|| format!("opening log file in {}", logdir.display()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(guard)
}
