//! Run log setup: stdout plus a timestamped file per run.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Run log file name for the current moment, e.g. `20261018153000.log`.
pub fn run_log_name() -> String {
    format!("{}.log", chrono::Local::now().format("%Y%m%d%H%M%S"))
}

/// Install the global subscriber. Keep the guard alive until exit so the
/// file writer flushes.
pub fn init(log_dir: &Path, debug: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_name = run_log_name();
    let log_path = log_dir.join(&file_name);
    let file_appender = tracing_appender::rolling::never(log_dir, &file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("modelshelf={0},modelshelf_core={0}", level))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string())),
        )
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
                .with_writer(file_writer),
        )
        .try_init()
        .context("Failed to install logging")?;

    tracing::debug!("Run log: {}", log_path.display());
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_name_shape() {
        let name = run_log_name();
        let stem = name.strip_suffix(".log").unwrap();
        assert_eq!(stem.len(), 14);
        assert!(stem.chars().all(|c| c.is_ascii_digit()));
    }
}
