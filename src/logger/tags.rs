/// Log tags identify the component a message originates from
///
/// Each tag maps to a --debug-<key> command-line flag for targeted
/// diagnostics, e.g. --debug-cache or --debug-tuner.
use colored::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Cache,
    Store,
    Tasks,
    Pool,
    Tuner,
    Health,
}

impl LogTag {
    pub const ALL: [LogTag; 7] = [
        LogTag::System,
        LogTag::Cache,
        LogTag::Store,
        LogTag::Tasks,
        LogTag::Pool,
        LogTag::Tuner,
        LogTag::Health,
    ];

    /// Plain name used in file-style output and flag matching
    pub fn to_plain_string(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Cache => "CACHE",
            LogTag::Store => "STORE",
            LogTag::Tasks => "TASKS",
            LogTag::Pool => "POOL",
            LogTag::Tuner => "TUNER",
            LogTag::Health => "HEALTH",
        }
    }

    /// Key used for --debug-<key> flags
    pub fn to_debug_key(&self) -> String {
        self.to_plain_string().to_lowercase()
    }

    /// Colored representation for console output
    pub fn colored(&self) -> ColoredString {
        match self {
            LogTag::System => self.to_plain_string().bright_white(),
            LogTag::Cache => self.to_plain_string().bright_cyan(),
            LogTag::Store => self.to_plain_string().cyan(),
            LogTag::Tasks => self.to_plain_string().bright_green(),
            LogTag::Pool => self.to_plain_string().green(),
            LogTag::Tuner => self.to_plain_string().bright_magenta(),
            LogTag::Health => self.to_plain_string().bright_yellow(),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
