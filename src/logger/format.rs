//! Log formatting and output with ANSI colors
//!
//! Handles colorized console output with aligned tag and level columns,
//! plus broken-pipe handling so piped invocations exit quietly.

use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

/// Column widths for alignment
const TAG_WIDTH: usize = 8;
const LEVEL_WIDTH: usize = 7;

/// Format and output a log message
pub fn format_and_log(tag: LogTag, level: LogLevel, message: &str) {
    let time = Local::now().format("%H:%M:%S").to_string();

    let tag_str = format!("{:<width$}", tag.colored(), width = TAG_WIDTH);
    let level_str = colorize_level(level);

    let line = format!(
        "{} [{}] [{}] {}",
        time.dimmed(),
        tag_str,
        level_str,
        message
    );

    print_stdout_safe(&line);
}

fn colorize_level(level: LogLevel) -> ColoredString {
    let padded = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);
    match level {
        LogLevel::Error => padded.bright_red().bold(),
        LogLevel::Warning => padded.yellow(),
        LogLevel::Info => padded.normal(),
        LogLevel::Debug => padded.bright_blue(),
        LogLevel::Verbose => padded.dimmed(),
    }
}

/// Print to stdout, swallowing broken-pipe errors from piped commands
fn print_stdout_safe(line: &str) {
    let mut out = stdout();
    if let Err(e) = writeln!(out, "{}", line) {
        if e.kind() != ErrorKind::BrokenPipe {
            eprintln!("{}", line);
        }
    }
}
