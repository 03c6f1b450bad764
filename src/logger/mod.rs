//! Structured logging for the adaptive resource-management core
//!
//! Provides a tag + level logging API with:
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-component debug control via --debug-<component> flags
//! - Colored console output
//! - A structured variant carrying an operation name and key/value context
//!
//! ## Usage
//!
//! ```rust
//! use autotune::logger::{self, LogTag};
//!
//! logger::warning(LogTag::Store, "Backing store unreachable, degrading to miss");
//! logger::info(LogTag::Tuner, "Pool 'analysis' grown 8 -> 10");
//! logger::debug(LogTag::Cache, "Effective TTL for analysis:123 is 6300s"); // Only if --debug-cache
//! ```
//!
//! Call `logger::init()` once at startup before any logging occurs.

mod config;
mod core;
mod format;
mod levels;
mod tags;

// Re-export public types
pub use config::{get_logger_config, init_from_args, set_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Scans command-line arguments for --debug-<component>, --verbose and
/// --quiet flags and configures filtering accordingly.
pub fn init() {
    config::init_from_args();
}

/// Log at ERROR level (always shown, critical issues)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (important issues that need attention)
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (detailed diagnostics, gated by --debug-<component>)
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (very detailed tracing, gated by --verbose)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Structured log: operation name plus key/value context fields
///
/// The context renders as compact JSON after the message, so external
/// collectors can scrape snapshots without parsing prose.
///
/// ```rust
/// use autotune::logger::{self, LogLevel, LogTag};
///
/// logger::structured(LogTag::Health, LogLevel::Info, "cache_stats", "periodic snapshot",
///     &[("hits", serde_json::json!(42)), ("hit_rate", serde_json::json!(0.93))]);
/// ```
pub fn structured(
    tag: LogTag,
    level: LogLevel,
    operation: &str,
    message: &str,
    context: &[(&str, serde_json::Value)],
) {
    let mut map = serde_json::Map::new();
    for (key, value) in context {
        map.insert((*key).to_string(), value.clone());
    }
    let rendered = serde_json::Value::Object(map).to_string();
    core::log_internal(tag, level, &format!("{}: {} {}", operation, message, rendered));
}
