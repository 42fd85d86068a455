use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Severity of a [`LogRecord`], ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    /// Canonical upper-case name, as it appears in the persisted document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        if *level == tracing::Level::ERROR {
            Level::Error
        } else if *level == tracing::Level::WARN {
            Level::Warning
        } else if *level == tracing::Level::INFO {
            Level::Info
        } else {
            // TRACE has no counterpart in the document schema.
            Level::Debug
        }
    }
}

/// Error attached to a [`LogRecord`], carried into the document's
/// `exception` object.
#[derive(Debug, Clone, Serialize)]
pub struct RecordError {
    pub message: String,
    pub stack_trace: String,
}

impl RecordError {
    pub fn new(message: impl Into<String>, stack_trace: impl Into<String>) -> Self {
        RecordError {
            message: message.into(),
            stack_trace: stack_trace.into(),
        }
    }

    /// Build from any error value, flattening its `source()` chain into the
    /// stack-trace text.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let message = err.to_string();
        let mut trace = vec![message.clone()];
        let mut source = err.source();
        while let Some(cause) = source {
            trace.push(format!("caused by: {}", cause));
            source = cause.source();
        }
        RecordError {
            message,
            stack_trace: trace.join("\n"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub logger: String,
    pub message: String,
    pub module_path: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub method: Option<String>,
    pub thread_id: String,
    pub thread_name: Option<String>,
    pub error: Option<RecordError>,
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl LogRecord {
    /// Create a record stamped with the current instant and the calling
    /// thread's identity. Source location and extras start empty.
    pub fn new(level: Level, logger: impl Into<String>, message: impl Into<String>) -> Self {
        let current = std::thread::current();
        LogRecord {
            timestamp: Utc::now(),
            level,
            logger: logger.into(),
            message: message.into(),
            module_path: None,
            file: None,
            line: None,
            method: None,
            thread_id: format!("{:?}", current.id()),
            thread_name: current.name().map(str::to_string),
            error: None,
            extras: BTreeMap::new(),
        }
    }

    pub fn with_error(mut self, error: RecordError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }
}
