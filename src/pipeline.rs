//! Fallback supervisor: the single recovery boundary of the advisory pipeline.
//!
//! Every public operation dispatches exactly once, normalizes the answer, and on any
//! responder failure (or an answer with nothing usable in it) records one failure
//! event and substitutes static content for the caller's role. Callers never see
//! an error. There are no retries.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::Level;

use crate::config::Config;
use crate::context::{self, Intent, Request, Role};
use crate::error::{AdvisorError, Result};
use crate::fallback::FallbackContent;
use crate::normalize::{normalize_insights, normalize_text};
use crate::registry::ResponderRegistry;
use crate::responders::RawOutput;
use crate::router::{Dispatch, Dispatcher};

const ANALYSIS_UNAVAILABLE: &str = "Unable to retrieve data analysis at this time.";
const RECOMMENDATIONS_UNAVAILABLE: &str = "Unable to generate recommendations at this time.";

/// Destination for failure events
pub trait LogSink: Send + Sync {
    fn record(&self, severity: Level, message: &str, error: Option<&AdvisorError>);
}

/// Forwards failure events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, severity: Level, message: &str, error: Option<&AdvisorError>) {
        let error = error.map(|e| e.to_string()).unwrap_or_default();
        match severity {
            Level::ERROR => tracing::error!(error = %error, "{}", message),
            Level::WARN => tracing::warn!(error = %error, "{}", message),
            Level::INFO => tracing::info!(error = %error, "{}", message),
            _ => tracing::debug!(error = %error, "{}", message),
        }
    }
}

/// Per-call lifecycle: `Idle -> Dispatching -> {Succeeded, Failed}`, and
/// `Failed -> SubstitutedFallback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Idle,
    Dispatching,
    Succeeded,
    Failed,
    SubstitutedFallback,
}

/// A supervised value and the terminal state that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supervised<T> {
    pub value: T,
    pub state: CallState,
}

impl<T> Supervised<T> {
    pub fn is_fallback(&self) -> bool {
        self.state == CallState::SubstitutedFallback
    }
}

/// Final answer handed back to a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NormalizedResult {
    Text(String),
    Insights(Vec<String>),
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub analysis: String,
    pub location: String,
    pub query: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationReport {
    pub recommendations: String,
    pub location: String,
    pub user_role: Role,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Normalized text, or `NormalizationEmpty` when nothing but whitespace came back
fn non_blank_text(raw: &RawOutput) -> Result<String> {
    let text = normalize_text(raw);
    if text.trim().is_empty() {
        Err(AdvisorError::NormalizationEmpty)
    } else {
        Ok(text)
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Explicitly constructed pipeline shared by every serving surface
#[derive(Clone)]
pub struct AdvisorPipeline {
    router: Arc<dyn Dispatch>,
    fallback: Arc<FallbackContent>,
    sink: Arc<dyn LogSink>,
}

impl AdvisorPipeline {
    pub fn new(router: Arc<dyn Dispatch>, fallback: Arc<FallbackContent>) -> Self {
        Self {
            router,
            fallback,
            sink: Arc::new(TracingSink),
        }
    }

    /// Registry-backed pipeline from loaded configuration
    pub fn from_config(config: &Config) -> Self {
        let registry = Arc::new(ResponderRegistry::from_config(config));
        if registry.is_empty() {
            tracing::warn!("No responder has an endpoint; every answer will be static content");
        } else {
            tracing::info!(
                "{} responder(s) ready: {}",
                registry.len(),
                registry.names().join(", ")
            );
        }
        let dispatcher = Dispatcher::new(registry, Duration::from_millis(config.dispatch.timeout_ms));
        let fallback = FallbackContent::from_overrides(&config.fallback);
        Self::new(Arc::new(dispatcher), Arc::new(fallback))
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn fallback(&self) -> &FallbackContent {
        &self.fallback
    }

    /// Dispatch and normalize; the one place responder errors are caught.
    async fn supervise<T>(
        &self,
        request: &Request,
        normalize: impl FnOnce(RawOutput) -> Result<T>,
        substitute: impl FnOnce(&AdvisorError) -> T,
    ) -> Supervised<T> {
        let mut state = CallState::Idle;
        tracing::trace!(request_id = %request.request_id, ?state, "Pipeline call");

        state = CallState::Dispatching;
        tracing::trace!(request_id = %request.request_id, ?state, "Pipeline call");

        let err = match self.router.dispatch(request).await.and_then(normalize) {
            Ok(value) => {
                state = CallState::Succeeded;
                tracing::debug!(request_id = %request.request_id, ?state, "Pipeline call");
                return Supervised { value, state };
            }
            Err(e) => e,
        };

        state = CallState::Failed;
        let intent = request
            .intent_hint
            .map(|i| i.to_string())
            .unwrap_or_else(|| "default".to_string());
        // anything a responder can cause is expected; other errors point at a bug
        let severity = if err.is_recoverable() {
            Level::WARN
        } else {
            Level::ERROR
        };
        self.sink.record(
            severity,
            &format!(
                "{intent} request for {} in {} failed; substituting static content",
                request.context.role, request.context.location
            ),
            Some(&err),
        );
        tracing::trace!(request_id = %request.request_id, ?state, "Pipeline call");

        Supervised {
            value: substitute(&err),
            state: CallState::SubstitutedFallback,
        }
    }

    /// Supervised insights list for a prepared request
    pub async fn supervised_insights(&self, request: &Request) -> Supervised<Vec<String>> {
        let role = request.context.role;
        self.supervise(
            request,
            |raw| {
                let insights = normalize_insights(&raw);
                if insights.is_empty() {
                    Err(AdvisorError::NormalizationEmpty)
                } else {
                    Ok(insights)
                }
            },
            |_| self.fallback.insights_for(role),
        )
        .await
    }

    /// Supervised chat answer for a prepared request
    pub async fn supervised_text(&self, request: &Request) -> Supervised<String> {
        let role = request.context.role;
        self.supervise(
            request,
            |raw| non_blank_text(&raw),
            |_| self.fallback.chat_for(role, &request.raw_text),
        )
        .await
    }

    /// Dispatch any request; insight requests yield a list, everything else text.
    pub async fn safe_dispatch(&self, request: Request) -> NormalizedResult {
        match request.intent_hint {
            Some(Intent::Insight) => {
                NormalizedResult::Insights(self.supervised_insights(&request).await.value)
            }
            _ => NormalizedResult::Text(self.supervised_text(&request).await.value),
        }
    }

    /// Up to four insights for a location, tailored to the role
    pub async fn safe_insights(&self, location: &str, role: Role) -> Vec<String> {
        let request = context::insight_request(location, role);
        self.supervised_insights(&request).await.value
    }

    /// Contextualized chat answer from the default responder
    pub async fn safe_chat(&self, text: &str, role: Role, location: &str) -> String {
        let request = context::build(text, role, location);
        self.supervised_text(&request).await.value
    }

    /// Data analysis for a location; failures are reported inside the report
    pub async fn data_analysis(&self, query: &str, location: &str, role: Role) -> AnalysisReport {
        let request = context::analysis_request(query, location, role);
        let mut error = None;
        let result = self
            .supervise(&request, |raw| non_blank_text(&raw), |e| {
                error = Some(e.to_string());
                ANALYSIS_UNAVAILABLE.to_string()
            })
            .await;

        AnalysisReport {
            analysis: result.value,
            location: location.to_string(),
            query: query.to_string(),
            timestamp: timestamp(),
            error,
        }
    }

    /// Resource allocation recommendations for a location and role
    pub async fn resource_recommendations(&self, location: &str, role: Role) -> RecommendationReport {
        let request = context::recommendation_request(location, role);
        let mut error = None;
        let result = self
            .supervise(&request, |raw| non_blank_text(&raw), |e| {
                error = Some(e.to_string());
                RECOMMENDATIONS_UNAVAILABLE.to_string()
            })
            .await;

        RecommendationReport {
            recommendations: result.value,
            location: location.to_string(),
            user_role: role,
            timestamp: timestamp(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Fixed(Result<RawOutput>);

    #[async_trait]
    impl Dispatch for Fixed {
        async fn dispatch(&self, _request: &Request) -> Result<RawOutput> {
            match &self.0 {
                Ok(out) => Ok(out.clone()),
                Err(_) => Err(AdvisorError::ResponderError {
                    responder: "data".into(),
                    message: "boom".into(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(Level, String)>>);

    impl LogSink for Recorder {
        fn record(&self, severity: Level, message: &str, _error: Option<&AdvisorError>) {
            self.0.lock().unwrap().push((severity, message.to_string()));
        }
    }

    fn pipeline(result: Result<RawOutput>) -> (AdvisorPipeline, Arc<Recorder>) {
        let sink = Arc::new(Recorder::default());
        let p = AdvisorPipeline::new(Arc::new(Fixed(result)), Arc::new(FallbackContent::builtin()))
            .with_sink(sink.clone());
        (p, sink)
    }

    #[tokio::test]
    async fn test_success_records_nothing() {
        let (p, sink) = pipeline(Ok(RawOutput::text("Clinics on 5th street open at 9am.")));
        let req = context::build("hi", Role::Resident, "Oakland, CA");
        let out = p.supervised_text(&req).await;
        assert_eq!(out.state, CallState::Succeeded);
        assert_eq!(out.value, "Clinics on 5th street open at 9am.");
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_answer_falls_back() {
        let (p, sink) = pipeline(Ok(RawOutput::text("   ")));
        let req = context::build("hi", Role::Organization, "Oakland, CA");
        let out = p.supervised_text(&req).await;
        assert!(out.is_fallback());
        assert!(
            p.fallback()
                .chat_options(Role::Organization)
                .contains(&out.value)
        );
        assert_eq!(sink.0.lock().unwrap().len(), 1);
        assert_eq!(sink.0.lock().unwrap()[0].0, Level::WARN);
    }

    #[tokio::test]
    async fn test_safe_dispatch_shapes() {
        let (p, _) = pipeline(Ok(RawOutput::text(
            "1. Expand mobile clinic coverage in rural tracts",
        )));
        let insights = p
            .safe_dispatch(context::insight_request("Fresno, CA", Role::Staff))
            .await;
        assert_eq!(
            insights,
            NormalizedResult::Insights(vec!["Expand mobile clinic coverage in rural tracts".into()])
        );

        let text = p
            .safe_dispatch(context::build("hello", Role::Staff, "Fresno, CA"))
            .await;
        assert_eq!(
            text,
            NormalizedResult::Text("1. Expand mobile clinic coverage in rural tracts".into())
        );
    }

    #[tokio::test]
    async fn test_analysis_report_carries_error() {
        let (p, sink) = pipeline(Err(AdvisorError::NormalizationEmpty));
        let report = p.data_analysis("asthma rates", "Fresno, CA", Role::Staff).await;
        assert_eq!(report.analysis, ANALYSIS_UNAVAILABLE);
        assert_eq!(report.query, "asthma rates");
        assert!(report.error.as_deref().unwrap().contains("boom"));
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_reports_substitute_and_log() {
        let (p, sink) = pipeline(Ok(RawOutput::text("   ")));

        let analysis = p.data_analysis("asthma rates", "Fresno, CA", Role::Staff).await;
        assert_eq!(analysis.analysis, ANALYSIS_UNAVAILABLE);
        assert_eq!(
            analysis.error.as_deref(),
            Some("Responder output contained no usable content")
        );

        let recs = p.resource_recommendations("Fresno, CA", Role::Resident).await;
        assert_eq!(recs.recommendations, RECOMMENDATIONS_UNAVAILABLE);
        assert!(recs.error.is_some());

        // same answer through the generic path is substituted as well
        let generic = p
            .safe_dispatch(
                context::analysis_request("asthma rates", "Fresno, CA", Role::Resident),
            )
            .await;
        match generic {
            NormalizedResult::Text(text) => {
                assert!(p.fallback().chat_options(Role::Resident).contains(&text))
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(sink.0.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unexpected_error_logged_at_error_level() {
        struct Rejects;

        #[async_trait]
        impl Dispatch for Rejects {
            async fn dispatch(&self, _request: &Request) -> Result<RawOutput> {
                Err(AdvisorError::InvalidParams {
                    message: "location missing".into(),
                })
            }
        }

        let sink = Arc::new(Recorder::default());
        let p = AdvisorPipeline::new(Arc::new(Rejects), Arc::new(FallbackContent::builtin()))
            .with_sink(sink.clone());
        let insights = p.safe_insights("", Role::Staff).await;
        assert_eq!(insights, p.fallback().insights_for(Role::Staff));
        assert_eq!(sink.0.lock().unwrap()[0].0, Level::ERROR);
    }

    #[tokio::test]
    async fn test_recommendations_success() {
        let (p, _) = pipeline(Ok(RawOutput::text("Fund two additional mobile clinics.")));
        let report = p.resource_recommendations("Sacramento, CA", Role::Organization).await;
        assert_eq!(report.recommendations, "Fund two additional mobile clinics.");
        assert_eq!(report.user_role, Role::Organization);
        assert!(report.error.is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(&report.timestamp).is_ok());
    }
}
