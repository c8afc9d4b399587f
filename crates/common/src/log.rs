//! Log sink boundary
//!
//! Observers write leveled, timestamped records tagged with the execution
//! context they belong to. [`TracingSink`] forwards them to `tracing`;
//! [`MemorySink`] keeps them for inspection.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::types::ContextId;

/// Severity of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Fatal => write!(f, "fatal"),
        }
    }
}

/// One log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub at: DateTime<Utc>,
    pub context: Option<ContextId>,
    pub message: String,
}

impl LogRecord {
    pub fn new(level: LogLevel, context: Option<ContextId>, message: impl Into<String>) -> Self {
        Self {
            level,
            at: Utc::now(),
            context,
            message: message.into(),
        }
    }
}

/// Destination for observer log output.
pub trait LogSink: Send + Sync + 'static {
    fn emit(&self, record: LogRecord);
}

/// Forwards records to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, record: LogRecord) {
        let context = record
            .context
            .map(|c| c.to_string())
            .unwrap_or_else(|| "suite".to_string());
        let at = record.at.to_rfc3339();

        match record.level {
            LogLevel::Debug => debug!(context = %context, at = %at, "{}", record.message),
            LogLevel::Info => info!(context = %context, at = %at, "{}", record.message),
            LogLevel::Warn => warn!(context = %context, at = %at, "{}", record.message),
            LogLevel::Error => error!(context = %context, at = %at, "{}", record.message),
            LogLevel::Fatal => {
                error!(context = %context, at = %at, fatal = true, "{}", record.message)
            }
        }
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn by_level(&self, level: LogLevel) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .cloned()
            .collect()
    }

    pub fn for_context(&self, context: ContextId) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.context == Some(context))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: LogRecord) {
        self.records.lock().push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_filters() {
        let sink = MemorySink::new();
        let a = ContextId::new(1);
        let b = ContextId::new(2);
        sink.emit(LogRecord::new(LogLevel::Info, Some(a), "start"));
        sink.emit(LogRecord::new(LogLevel::Error, Some(b), "boom"));
        sink.emit(LogRecord::new(LogLevel::Info, None, "suite"));

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.by_level(LogLevel::Error).len(), 1);
        assert_eq!(sink.for_context(b)[0].message, "boom");
        assert!(LogLevel::Fatal > LogLevel::Error);
    }

    #[test]
    fn test_tracing_sink_accepts_all_levels() {
        let sink = TracingSink;
        for level in [
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
            LogLevel::Fatal,
        ] {
            sink.emit(LogRecord::new(level, Some(ContextId::new(9)), "message"));
        }
    }
}
