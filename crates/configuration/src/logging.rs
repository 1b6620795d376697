use crate::error::ConfigError;
use crate::settings::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Installs the global `tracing` subscriber.
///
/// Console output is always enabled. If `config.directory` is set, a daily
/// rolling file is written as well; the returned guard must be kept alive for
/// as long as file logging should keep flushing.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>, ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| ConfigError::LoggingError(e.to_string()))?;

    let console_layer = fmt::layer().with_target(true).boxed();

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "lemon-trader.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ConfigError::LoggingError(e.to_string()))?;

    Ok(guard)
}
