//! Structured logging for the modem state machines.
//!
//! Decoding runs sample by sample in contexts (embedded ports, WASM) where
//! a global logging facade is unavailable or unwanted, so the encoder and
//! decoder each own a logger that collects structured entries which the
//! host can drain after the fact.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum level to record.
    pub level: LogLevel,

    /// Per-subsystem switches.
    pub enable_sync: bool,
    pub enable_mode: bool,
    pub enable_slant: bool,
    pub enable_framing: bool,

    /// Bound on retained entries; oldest entries are dropped first.
    pub max_entries: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            enable_sync: true,
            enable_mode: true,
            enable_slant: true,
            enable_framing: true,
            max_entries: 1000,
        }
    }
}

impl LogConfig {
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            max_entries: 5000,
            ..Self::default()
        }
    }

    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Warn,
            enable_sync: false,
            enable_mode: false,
            enable_slant: false,
            enable_framing: false,
            max_entries: 100,
        }
    }

    pub fn disabled() -> Self {
        Self {
            level: LogLevel::Error,
            enable_sync: false,
            enable_mode: false,
            enable_slant: false,
            enable_framing: false,
            max_entries: 0,
        }
    }
}

/// A single log entry.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub subsystem: &'static str,
    pub message: String,
}

/// Logger collecting structured entries.
#[derive(Debug, Clone)]
pub struct SignalLogger {
    config: LogConfig,
    entries: Vec<LogEntry>,
}

impl SignalLogger {
    pub fn new(config: LogConfig) -> Self {
        let capacity = config.max_entries.min(1000);
        Self {
            config,
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn log(&mut self, level: LogLevel, subsystem: &'static str, message: impl fmt::Display) {
        if level < self.config.level {
            return;
        }

        let enabled = match subsystem {
            "SYNC" | "HSYNC" => self.config.enable_sync,
            "MODE" | "VIS" => self.config.enable_mode,
            "SLANT" | "TIMING" => self.config.enable_slant,
            "FRAME" | "TONE" => self.config.enable_framing,
            _ => true,
        };
        if !enabled {
            return;
        }

        if self.config.max_entries == 0 {
            return;
        }
        if self.entries.len() >= self.config.max_entries {
            self.entries.remove(0);
        }
        self.entries.push(LogEntry {
            level,
            subsystem,
            message: message.to_string(),
        });
    }

    pub fn trace(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Trace, subsystem, message);
    }

    pub fn debug(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Debug, subsystem, message);
    }

    pub fn info(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Info, subsystem, message);
    }

    pub fn warn(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Warn, subsystem, message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn entries_for_subsystem(&self, subsystem: &str) -> Vec<&LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.subsystem == subsystem)
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for SignalLogger {
    fn default() -> Self {
        Self::new(LogConfig::default())
    }
}

impl fmt::Display for SignalLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in &self.entries {
            writeln!(f, "[{}] {}: {}", e.level, e.subsystem, e.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_below_the_level_are_dropped() {
        let mut logger = SignalLogger::new(LogConfig {
            level: LogLevel::Info,
            ..Default::default()
        });
        logger.trace("MODE", "dropped");
        logger.debug("MODE", "dropped");
        logger.info("MODE", "kept");
        logger.warn("MODE", "kept");
        assert_eq!(logger.entries().len(), 2);
    }

    #[test]
    fn subsystem_switches_filter() {
        let mut logger = SignalLogger::new(LogConfig {
            level: LogLevel::Debug,
            enable_sync: false,
            ..Default::default()
        });
        logger.info("SYNC", "dropped");
        logger.info("MODE", "kept");
        assert_eq!(logger.entries().len(), 1);
        assert_eq!(logger.entries()[0].subsystem, "MODE");
    }

    #[test]
    fn entry_count_is_bounded() {
        let mut logger = SignalLogger::new(LogConfig {
            max_entries: 2,
            ..Default::default()
        });
        logger.info("MODE", "one");
        logger.info("MODE", "two");
        logger.info("MODE", "three");
        assert_eq!(logger.entries().len(), 2);
        assert!(logger.entries()[0].message.contains("two"));
    }
}
