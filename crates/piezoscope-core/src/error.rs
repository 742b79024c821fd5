//! Error types for the ingestion pipeline.

use thiserror::Error;

/// A message that could not be turned into store updates.
///
/// Every variant is local to one message: the dispatcher drops the message,
/// leaves the stores untouched and keeps going.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Failed to parse payload JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Payload must be a JSON object, got {kind}")]
    NotAnObject { kind: &'static str },
}

impl IngestError {
    /// Short machine-friendly label used in logs and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::InvalidUtf8(_) => "utf8",
            IngestError::InvalidJson(_) => "json",
            IngestError::NotAnObject { .. } => "shape",
        }
    }
}

/// Invalid routing table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("Topic is routed more than once: {0}")]
    DuplicateTopic(String),

    #[error("Topic name must not be empty")]
    EmptyTopic,

    #[error("Windowed topic {topic} has no sensor bindings")]
    NoSensors { topic: String },

    #[error("Sensor key {key} is bound twice on topic {topic}")]
    DuplicateSensorKey { topic: String, key: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_error_kind() {
        let err = IngestError::NotAnObject { kind: "array" };
        assert_eq!(err.kind(), "shape");
        assert_eq!(err.to_string(), "Payload must be a JSON object, got array");
    }

    #[test]
    fn test_json_error_converts() {
        let err: IngestError = match serde_json::from_str::<serde_json::Value>("{") {
            Ok(_) => return,
            Err(e) => e.into(),
        };
        assert_eq!(err.kind(), "json");
        assert!(err.to_string().starts_with("Failed to parse payload JSON"));
    }
}
