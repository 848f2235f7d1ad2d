//! Domain-specific error types for health-advisor

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::context::Intent;

/// Main error type for the health-advisor pipeline and its serving layer
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("No responder registered for {intent} requests")]
    ResponderUnavailable { intent: RouteKey },

    #[error("Responder '{responder}' failed: {message}")]
    ResponderError { responder: String, message: String },

    #[error("Responder '{responder}' timed out after {timeout_ms}ms")]
    ResponderTimeout { responder: String, timeout_ms: u64 },

    #[error("Responder output contained no usable content")]
    NormalizationEmpty,

    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String },
}

/// Route a request resolved to: an explicit intent or the default responder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKey {
    Default,
    Intent(Intent),
}

impl std::fmt::Display for RouteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteKey::Default => write!(f, "default"),
            RouteKey::Intent(intent) => write!(f, "{intent}"),
        }
    }
}

impl AdvisorError {
    /// Whether the fallback supervisor absorbs this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AdvisorError::ResponderUnavailable { .. }
                | AdvisorError::ResponderError { .. }
                | AdvisorError::ResponderTimeout { .. }
                | AdvisorError::NormalizationEmpty
        )
    }
}

/// Convert AdvisorError to an HTTP error response
impl IntoResponse for AdvisorError {
    fn into_response(self) -> Response {
        let (status, label) = match &self {
            AdvisorError::InvalidParams { .. } => (StatusCode::BAD_REQUEST, "Invalid parameters"),
            AdvisorError::ResponderUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "Responder unavailable")
            }
            AdvisorError::ResponderTimeout { .. } => {
                (StatusCode::GATEWAY_TIMEOUT, "Responder timeout")
            }
            AdvisorError::ResponderError { .. } => (StatusCode::BAD_GATEWAY, "Responder error"),
            AdvisorError::NormalizationEmpty => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
        };

        (
            status,
            Json(json!({
                "error": {
                    "code": status.as_u16(),
                    "message": format!("{label}: {self}"),
                }
            })),
        )
            .into_response()
    }
}

/// Result type alias for health-advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;
