//! Tracing subscriber setup for the service.

use crate::config::LoggingConfig;
use castkit_common::logging::{ensure_log_dir, SERVICE_LOG_PREFIX};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber: stderr plus a daily rolling file in the
/// log directory.
///
/// `RUST_LOG` overrides the configured level. The returned guard flushes the
/// file writer on drop and must be kept alive. If the log directory cannot
/// be created, only stderr logging is installed and `None` is returned.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, String> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match ensure_log_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(&dir, SERVICE_LOG_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(env_filter(config))
                .with(stderr_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .try_init()
                .map_err(|e| format!("Failed to initialise tracing subscriber: {}", e))?;
            tracing::debug!("Logging to {:?}", dir);
            Ok(Some(guard))
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(env_filter(config))
                .with(stderr_layer)
                .try_init()
                .map_err(|e| format!("Failed to initialise tracing subscriber: {}", e))?;
            tracing::warn!("Log directory unavailable, logging to stderr only: {}", e);
            Ok(None)
        }
    }
}
