//! Dispatch router: one request, one responder call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::context::Request;
use crate::error::{AdvisorError, Result};
use crate::registry::ResponderRegistry;
use crate::responders::RawOutput;

/// Anything that can turn a request into raw responder output.
///
/// [`Dispatcher`] is the production implementation; the seam lets the supervisor
/// be driven by scripted routers in tests.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, request: &Request) -> Result<RawOutput>;
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ResponderRegistry>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<ResponderRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }
}

#[async_trait]
impl Dispatch for Dispatcher {
    async fn dispatch(&self, request: &Request) -> Result<RawOutput> {
        let responder = self
            .registry
            .resolve(request.intent_hint)
            .map_err(|intent| AdvisorError::ResponderUnavailable { intent })?;
        let name = responder.name().to_string();

        tracing::debug!(
            request_id = %request.request_id,
            intent = ?request.intent_hint,
            responder = %name,
            "Dispatching request"
        );

        let output = match tokio::time::timeout(self.timeout, responder.respond(request)).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(AdvisorError::ResponderError {
                    responder: name,
                    message: e.to_string(),
                });
            }
            Err(_) => {
                return Err(AdvisorError::ResponderTimeout {
                    responder: name,
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        if let Some(message) = output.error_payload() {
            return Err(AdvisorError::ResponderError {
                responder: name,
                message,
            });
        }

        Ok(output)
    }
}
