/// Core logging implementation with automatic filtering
///
/// Filtering rules:
/// 1. Errors are always shown
/// 2. Check against minimum log level threshold
/// 3. Debug level requires --debug-<component> flag for that tag
/// 4. Verbose level requires --verbose flag OR --verbose-<component> flag
use super::config::{get_logger_config, is_debug_enabled_for_tag, is_verbose_enabled_for_tag};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Check if a log message should be displayed
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    let config = get_logger_config();

    // Rule 1: Errors always log (critical)
    if level == LogLevel::Error {
        return true;
    }

    // Rule 2: Check minimum level threshold
    if level > config.min_level {
        // Debug/verbose can still be enabled per-tag below the threshold
        if level == LogLevel::Debug && is_debug_enabled_for_tag(tag) {
            return true;
        }
        if level == LogLevel::Verbose && is_verbose_enabled_for_tag(tag) {
            return true;
        }
        return false;
    }

    // Rule 3: Debug level requires debug mode for that specific tag
    if level == LogLevel::Debug {
        return is_debug_enabled_for_tag(tag) || config.min_level >= LogLevel::Debug;
    }

    // Rule 4: Verbose requires the global threshold or a per-tag flag
    if level == LogLevel::Verbose {
        return config.min_level == LogLevel::Verbose || is_verbose_enabled_for_tag(tag);
    }

    true
}

/// Internal logging function with automatic filtering
pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    super::format::format_and_log(tag, level, message);
}
