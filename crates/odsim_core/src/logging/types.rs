//! Log levels, run-log settings and line prefixes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity threshold, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings of one `RunLogger`.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Lines below this level are dropped.
    pub level: LogLevel,
    /// Sub-job output lines kept for `show_tail`.
    pub error_tail: usize,
    pub show_timestamps: bool,
    /// Re-emit every line as a `tracing` event.
    pub mirror_to_tracing: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            error_tail: 20,
            show_timestamps: true,
            mirror_to_tracing: true,
        }
    }
}

/// Receives every line a `RunLogger` writes, already formatted.
pub type LogCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Marker put in front of a run-log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePrefix {
    /// `$ cmd`
    Command,
    /// `=== name ===`
    Phase,
    Success,
    Retry,
    Warning,
    Error,
    None,
}

impl MessagePrefix {
    pub fn format(self, message: &str) -> String {
        let tag = match self {
            MessagePrefix::Command => return format!("$ {}", message),
            MessagePrefix::Phase => return format!("=== {} ===", message),
            MessagePrefix::None => return message.to_string(),
            MessagePrefix::Success => "SUCCESS",
            MessagePrefix::Retry => "RETRY",
            MessagePrefix::Warning => "WARNING",
            MessagePrefix::Error => "ERROR",
        };
        format!("[{}] {}", tag, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_by_severity() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }

    #[test]
    fn level_reads_from_toml() {
        #[derive(Deserialize)]
        struct Section {
            level: LogLevel,
        }
        let section: Section = toml::from_str("level = \"debug\"").unwrap();
        assert_eq!(section.level, LogLevel::Debug);
    }

    #[test]
    fn prefixes() {
        assert_eq!(MessagePrefix::Phase.format("Publish"), "=== Publish ===");
        assert_eq!(MessagePrefix::Command.format("ls"), "$ ls");
        assert_eq!(MessagePrefix::Retry.format("x"), "[RETRY] x");
        assert_eq!(MessagePrefix::None.format("x"), "x");
    }
}
