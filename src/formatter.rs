use crate::record::LogRecord;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Structured document persisted per log event. Field names are the schema
/// contract that external readers of the log store depend on.
pub type Document = BTreeMap<String, Value>;

/// Keys every formatted document carries, regardless of record content.
pub const STANDARD_FIELDS: &[&str] = &[
    "timestamp",
    "level",
    "thread",
    "threadName",
    "message",
    "loggerName",
    "fileName",
    "module",
    "method",
    "lineNumber",
];

/// Converts a [`LogRecord`] into a [`Document`].
///
/// The transformation is total: it performs no I/O and cannot fail. The
/// `timestamp` field is the formatting instant, not the record's creation
/// instant.
#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentFormatter;

impl DocumentFormatter {
    pub fn format(&self, record: &LogRecord) -> Document {
        let mut document = Document::new();
        document.insert(
            "timestamp".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        document.insert(
            "level".to_string(),
            Value::String(record.level.as_str().to_string()),
        );
        document.insert(
            "thread".to_string(),
            Value::String(record.thread_id.clone()),
        );
        document.insert("threadName".to_string(), opt_string(&record.thread_name));
        document.insert("message".to_string(), Value::String(record.message.clone()));
        document.insert("loggerName".to_string(), Value::String(record.logger.clone()));
        document.insert("fileName".to_string(), opt_string(&record.file));
        document.insert("module".to_string(), opt_string(&record.module_path));
        document.insert("method".to_string(), opt_string(&record.method));
        document.insert(
            "lineNumber".to_string(),
            record.line.map(Value::from).unwrap_or(Value::Null),
        );

        if let Some(error) = &record.error {
            document.insert(
                "exception".to_string(),
                json!({
                    "message": error.message,
                    "stackTrace": error.stack_trace,
                    "code": 0,
                }),
            );
        }

        // Extras never shadow the fixed schema or the exception object.
        for (key, value) in &record.extras {
            if is_reserved(key) {
                continue;
            }
            document.insert(key.clone(), value.clone());
        }

        document
    }
}

fn is_reserved(key: &str) -> bool {
    key == "exception" || STANDARD_FIELDS.contains(&key)
}

fn opt_string(value: &Option<String>) -> Value {
    value
        .as_ref()
        .map(|s| Value::String(s.clone()))
        .unwrap_or(Value::Null)
}

/// Severity name recorded in a document, when present and well-formed.
pub(crate) fn document_level(document: &Document) -> Option<&str> {
    document.get("level").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Level, LogRecord, RecordError};

    fn plain_record() -> LogRecord {
        LogRecord::new(Level::Info, "testLogger", "test message")
    }

    #[test]
    fn plain_record_yields_exactly_the_standard_keys() {
        let document = DocumentFormatter.format(&plain_record());
        let keys: Vec<&str> = document.keys().map(String::as_str).collect();
        let mut expected: Vec<&str> = STANDARD_FIELDS.to_vec();
        expected.sort_unstable();
        assert_eq!(keys, expected);
    }

    #[test]
    fn standard_values_are_copied_from_the_record() {
        let mut record = plain_record();
        record.file = Some("src/api.rs".to_string());
        record.line = Some(42);
        record.module_path = Some("api::users".to_string());
        record.method = Some("create_user".to_string());

        let document = DocumentFormatter.format(&record);
        assert_eq!(document["level"], Value::String("INFO".to_string()));
        assert_eq!(document["message"], Value::String("test message".to_string()));
        assert_eq!(document["loggerName"], Value::String("testLogger".to_string()));
        assert_eq!(document["fileName"], Value::String("src/api.rs".to_string()));
        assert_eq!(document["lineNumber"], Value::from(42u32));
        assert_eq!(document["module"], Value::String("api::users".to_string()));
        assert_eq!(document["method"], Value::String("create_user".to_string()));
    }

    #[test]
    fn absent_source_location_serializes_as_null_not_missing() {
        let document = DocumentFormatter.format(&plain_record());
        assert_eq!(document["fileName"], Value::Null);
        assert_eq!(document["lineNumber"], Value::Null);
        assert_eq!(document["method"], Value::Null);
    }

    #[test]
    fn extras_are_copied_verbatim() {
        let record = plain_record()
            .with_extra("request_id", Value::String("abc-123".to_string()))
            .with_extra("attempt", Value::from(3));
        let document = DocumentFormatter.format(&record);
        assert_eq!(document["request_id"], Value::String("abc-123".to_string()));
        assert_eq!(document["attempt"], Value::from(3));
    }

    #[test]
    fn extras_never_shadow_standard_keys() {
        let record = plain_record()
            .with_extra("loggerName", Value::String("impostor".to_string()))
            .with_extra("exception", Value::String("impostor".to_string()));
        let document = DocumentFormatter.format(&record);
        assert_eq!(document["loggerName"], Value::String("testLogger".to_string()));
        assert!(!document.contains_key("exception"));
    }

    #[test]
    fn record_error_becomes_exception_object_with_code_zero() {
        let record = plain_record().with_error(RecordError::new("exc1", "at line 36\nexc1"));
        let document = DocumentFormatter.format(&record);
        let exception = document["exception"].as_object().expect("exception object");
        assert_eq!(exception["message"], Value::String("exc1".to_string()));
        assert_eq!(exception["code"], Value::from(0));
        assert!(exception["stackTrace"]
            .as_str()
            .map(|s| s.contains("exc1"))
            .unwrap_or(false));
    }

    #[test]
    fn document_level_reads_the_level_field() {
        let document = DocumentFormatter.format(&plain_record());
        assert_eq!(document_level(&document), Some("INFO"));
        assert_eq!(document_level(&Document::new()), None);
    }
}
