//! Logging configuration for PulseRAG

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;

use crate::Result;

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "pulserag.log";

/// Initialize logging from the configured level.
///
/// `RUST_LOG` wins over the configuration when it is set. The returned guard
/// flushes the file writer on drop, so keep it alive for the whole process.
pub fn init_logging_with_config(config: Option<&crate::config::AppConfig>) -> Result<WorkerGuard> {
    let level = config.map_or("info", |c| c.logging.level.as_str());
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for_level(level));
    install(env_filter, level)
}

/// Initialize logging with custom log level
pub fn init_logging_with_level(level: &str) -> Result<WorkerGuard> {
    install(filter_for_level(level), level)
}

/// Initialize simple logging for testing
pub fn init_simple_logging() -> Result<()> {
    // A second init in the same test binary is not an error
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
    Ok(())
}

fn filter_for_level(level: &str) -> EnvFilter {
    EnvFilter::new(format!("warn,pulserag={level}"))
}

fn install(env_filter: EnvFilter, level: &str) -> Result<WorkerGuard> {
    let logs_dir = Path::new(LOG_DIR);
    if !logs_dir.exists() {
        std::fs::create_dir_all(logs_dir)?;
    }

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(non_blocking)
        .with_ansi(false); // No colors in file

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::PulseRagError::Config(format!("logging already initialized: {e}")))?;

    tracing::debug!("Logging initialized with level: {}", level);
    tracing::debug!("Log files will be saved to: {}/{}.YYYY-MM-DD", LOG_DIR, LOG_FILE);

    Ok(guard)
}
