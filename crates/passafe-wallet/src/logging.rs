use crate::config::LoggingConfig;
use passafe_types::{PassafeError, PassafeResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
/// A second call is a no-op.
pub fn init_logging(config: &LoggingConfig) -> PassafeResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let layer = match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| PassafeError::Config(format!("Failed to open log file: {}", e)))?;
            let writer = std::sync::Mutex::new(file);
            if config.json {
                fmt::layer().json().with_writer(writer).boxed()
            } else {
                fmt::layer().with_writer(writer).with_ansi(false).boxed()
            }
        }
        None if config.json => fmt::layer().json().boxed(),
        None => fmt::layer().with_target(false).boxed(),
    };

    // Err only means a subscriber is already installed.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init();
    Ok(())
}
