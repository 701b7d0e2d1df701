//! Tracing subscriber setup

use crate::config::LogConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoLocal;

const LOG_FILE_PREFIX: &str = "nomark.log";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `log.level`. When `log.directory` is set,
/// output goes to a daily rolling file instead of stderr, and the returned
/// guard must be held until exit so buffered lines get flushed.
pub fn init(config: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_target(false);

    let guard = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let builder = builder.with_writer(writer).with_ansi(false);
            let installed = if config.json {
                builder.json().try_init()
            } else {
                builder.try_init()
            };
            installed.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
            Some(guard)
        }
        None => {
            let builder = builder.with_writer(std::io::stderr);
            let installed = if config.json {
                builder.json().try_init()
            } else {
                builder.try_init()
            };
            installed.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
            None
        }
    };

    Ok(guard)
}
