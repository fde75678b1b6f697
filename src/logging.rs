// logging.rs
use tracing_appender::{non_blocking, non_blocking::WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::errors::{MpesaError, Result};

pub const LOG_FILE_PREFIX: &str = "mpesa";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn filter_for(config: &LoggingConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.min_log_level))
        .map_err(|e| {
            MpesaError::Config(format!(
                "Invalid log level '{}': {}",
                config.min_log_level, e
            ))
        })
}

fn is_json(config: &LoggingConfig) -> bool {
    config
        .log_format
        .as_deref()
        .is_some_and(|f| f.eq_ignore_ascii_case("json"))
}

/// Installs the global subscriber described by `config`. Keep the returned
/// guard alive for as long as file output should be flushed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if config.log_to_console {
        let console = fmt::layer().with_target(true).with_ansi(true);
        layers.push(if is_json(config) {
            console.json().boxed()
        } else {
            console.boxed()
        });
    }

    if config.log_to_file {
        std::fs::create_dir_all(&config.log_dir).map_err(|e| {
            MpesaError::Config(format!(
                "Failed to create log directory {}: {}",
                config.log_dir, e
            ))
        })?;

        let mut builder = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix("log");
        if let Some(max_files) = config.max_files {
            builder = builder.max_log_files(max_files);
        }
        let appender = builder
            .build(&config.log_dir)
            .map_err(|e| MpesaError::Config(format!("Failed to open log file: {}", e)))?;

        let (writer, worker_guard) = non_blocking(appender);
        guard = Some(worker_guard);

        let file = fmt::layer().with_ansi(false).with_writer(writer);
        layers.push(if is_json(config) {
            file.json().boxed()
        } else {
            file.boxed()
        });
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter_for(config)?)
        .try_init()
        .map_err(|e| MpesaError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(guard)
}
