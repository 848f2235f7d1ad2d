use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::context::Request;

/// Unprocessed responder output.
///
/// Responders are heterogeneous: some answer with bare text, others with a JSON
/// object that may carry a `content` or `text` field (or neither).
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutput {
    Text(String),
    Structured(Map<String, Value>),
}

impl RawOutput {
    pub fn text(s: impl Into<String>) -> Self {
        RawOutput::Text(s.into())
    }

    /// Build a structured payload from a JSON value; non-objects become text.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => RawOutput::Structured(map),
            Value::String(s) => RawOutput::Text(s),
            other => RawOutput::Text(other.to_string()),
        }
    }

    /// Error message carried inside a structured payload, if any
    pub fn error_payload(&self) -> Option<String> {
        match self {
            RawOutput::Structured(map) => match map.get("error") {
                None | Some(Value::Null) | Some(Value::Bool(false)) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Object(obj)) => Some(
                    obj.get("message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
                ),
                Some(other) => Some(other.to_string()),
            },
            RawOutput::Text(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResponderFailure {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("responder returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for ResponderFailure {
    fn from(err: reqwest::Error) -> Self {
        ResponderFailure::Transport(err.to_string())
    }
}

/// A named specialist capable of answering a contextualized request
#[async_trait]
pub trait Responder: Send + Sync {
    fn name(&self) -> &str;

    async fn respond(&self, request: &Request) -> Result<RawOutput, ResponderFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_shapes() {
        assert_eq!(
            RawOutput::from_json(json!("plain")),
            RawOutput::Text("plain".into())
        );
        assert!(matches!(
            RawOutput::from_json(json!({"content": "x"})),
            RawOutput::Structured(_)
        ));
        assert_eq!(RawOutput::from_json(json!(42)), RawOutput::Text("42".into()));
    }

    #[test]
    fn test_error_payload_detection() {
        let err = RawOutput::from_json(json!({"error": "quota exceeded"}));
        assert_eq!(err.error_payload().as_deref(), Some("quota exceeded"));

        let nested = RawOutput::from_json(json!({"error": {"message": "bad key", "code": 401}}));
        assert_eq!(nested.error_payload().as_deref(), Some("bad key"));

        let ok = RawOutput::from_json(json!({"content": "fine", "error": null}));
        assert!(ok.error_payload().is_none());
        assert!(RawOutput::text("error: looks bad but is text").error_payload().is_none());
    }
}
