//! Logging initialization for the client binaries.
//!
//! Thin wrapper over the observability crate: compact stderr output plus an
//! optional JSONL file.

use std::path::PathBuf;

use observability::LogConfig;

/// Service name stamped on every JSONL line.
const SERVICE_NAME: &str = "cabinet";

/// Initialize logging.
///
/// `level` is the default filter (overridable with `RUST_LOG`); when
/// `log_path` is given, events are also appended there as JSONL.
///
/// ```ignore
/// init_logging("info", Some(paths.log_file()));
/// tracing::info!("client started");
/// ```
pub fn init_logging(level: &str, log_path: Option<PathBuf>) {
    observability::init_with_config(LogConfig {
        service_name: SERVICE_NAME.into(),
        default_level: parse_level(level).to_string().to_lowercase(),
        log_path,
        also_stderr: true,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
