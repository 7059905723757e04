//! Tracing subscriber setup for the binary.

use color_eyre::{eyre::eyre, Result};
use std::ffi::OsStr;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `log.level`. With `log.file` set, output goes to that
/// file through a background writer; keep the returned guard alive until
/// exit or buffered lines are lost.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
  let filter = build_filter(&config.level)?;

  match &config.file {
    Some(path) => {
      let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
      let filename = path.file_name().unwrap_or(OsStr::new("citadel.log"));

      let file_appender = tracing_appender::rolling::never(dir, filename);
      let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

      tracing_subscriber::registry()
        .with(filter)
        .with(
          fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true),
        )
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::registry()
        .with(filter)
        .with(
          fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false),
        )
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

      Ok(None)
    }
  }
}

fn build_filter(level: &str) -> Result<EnvFilter> {
  match EnvFilter::try_from_default_env() {
    Ok(filter) => Ok(filter),
    Err(_) => level_filter(level),
  }
}

fn level_filter(level: &str) -> Result<EnvFilter> {
  EnvFilter::try_new(level).map_err(|e| eyre!("Invalid log level {:?}: {}", level, e))
}
