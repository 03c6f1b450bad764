/// Logger configuration with per-component debug gating
///
/// Configuration is derived once from command-line arguments at init time
/// and can be replaced at runtime (tests use this to silence output).
use super::levels::LogLevel;
use super::tags::LogTag;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::env;
use std::sync::RwLock;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum level threshold (messages above are dropped)
    pub min_level: LogLevel,

    /// Components with --debug-<key> enabled
    pub debug_tags: HashSet<String>,

    /// Components with --verbose-<key> enabled
    pub verbose_tags: HashSet<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Build configuration from command-line arguments
///
/// Recognized flags:
/// - --quiet             only errors and warnings
/// - --verbose           everything, including verbose traces
/// - --debug             debug level for all components
/// - --debug-<key>       debug level for one component (e.g. --debug-cache)
/// - --verbose-<key>     verbose level for one component
pub fn init_from_args() {
    let args: Vec<String> = env::args().collect();
    let mut config = LoggerConfig::default();

    for arg in &args {
        match arg.as_str() {
            "--quiet" => {
                config.min_level = LogLevel::Warning;
            }
            "--verbose" => {
                config.min_level = LogLevel::Verbose;
            }
            "--debug" => {
                config.min_level = LogLevel::Debug;
                for tag in LogTag::ALL {
                    config.debug_tags.insert(tag.to_debug_key());
                }
            }
            other => {
                if let Some(key) = other.strip_prefix("--debug-") {
                    config.debug_tags.insert(key.to_string());
                    if config.min_level < LogLevel::Debug {
                        config.min_level = LogLevel::Debug;
                    }
                } else if let Some(key) = other.strip_prefix("--verbose-") {
                    config.verbose_tags.insert(key.to_string());
                }
            }
        }
    }

    set_logger_config(config);
}

/// Get a snapshot of the current logger configuration
pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG
        .read()
        .map(|c| c.clone())
        .unwrap_or_default()
}

/// Replace the logger configuration
pub fn set_logger_config(config: LoggerConfig) {
    if let Ok(mut current) = LOGGER_CONFIG.write() {
        *current = config;
    }
}

/// Check if debug output is enabled for a tag
pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    let config = get_logger_config();
    config.debug_tags.contains(&tag.to_debug_key())
}

/// Check if verbose output is enabled for a tag
pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    let config = get_logger_config();
    config.verbose_tags.contains(&tag.to_debug_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_filters_debug() {
        let config = LoggerConfig::default();
        assert_eq!(config.min_level, LogLevel::Info);
        assert!(config.debug_tags.is_empty());
    }
}
