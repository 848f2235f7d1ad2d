//! HTTP transport module for health-advisor
//!
//! Axum server exposing the dashboard operations as JSON endpoints, plus plain JSON
//! health, info and metrics. Pipeline endpoints never fail because of a responder;
//! only malformed input is rejected.

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::context::Role;
use crate::error::{AdvisorError, Result};
use crate::pipeline::AdvisorPipeline;

/// Shared state for HTTP server
#[derive(Clone)]
pub struct HttpState {
    pub pipeline: AdvisorPipeline,
    pub info: Arc<ServiceInfo>,
    pub metrics: Arc<Mutex<HttpMetrics>>,
}

/// Static description of the running service, served from `/info`
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceInfo {
    pub responders: Vec<ResponderInfo>,
    pub routes: serde_json::Value,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponderInfo {
    pub name: String,
    pub model: String,
    pub endpoint: Option<String>,
    pub instruction_checksum: String,
}

impl ServiceInfo {
    pub fn from_config(config: &Config) -> Self {
        let responders = config
            .responders
            .iter()
            .map(|(name, entry)| {
                let profile = entry.profile(name);
                ResponderInfo {
                    name: name.clone(),
                    model: profile.model.clone(),
                    endpoint: entry.endpoint.clone(),
                    instruction_checksum: profile.checksum(),
                }
            })
            .collect();

        Self {
            responders,
            routes: serde_json::to_value(&config.routes).unwrap_or_default(),
            timeout_ms: config.dispatch.timeout_ms,
        }
    }
}

/// Metrics for HTTP server
#[derive(Debug, Clone, Default, Serialize)]
pub struct HttpMetrics {
    pub total_requests: u64,
    pub fallbacks_total: u64,
    pub rejected_total: u64,
}

#[derive(Debug, Deserialize)]
pub struct InsightsBody {
    pub location: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub message: String,
    pub role: Role,
    pub location: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisBody {
    pub query: String,
    pub location: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationBody {
    pub location: String,
    pub role: Role,
}

fn default_role() -> Role {
    Role::Staff
}

async fn count(state: &HttpState, fallback: bool) {
    let mut m = state.metrics.lock().await;
    m.total_requests = m.total_requests.saturating_add(1);
    if fallback {
        m.fallbacks_total = m.fallbacks_total.saturating_add(1);
    }
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({"status": "healthy", "service": "health-intelligence-hub"}))
}

/// Info endpoint
pub async fn info_handler(State(state): State<HttpState>) -> impl IntoResponse {
    Json(state.info.as_ref().clone())
}

/// Metrics endpoint
pub async fn metrics_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let metrics = state.metrics.lock().await.clone();
    Json(json!({
        "metrics_version": "1",
        "total_requests": metrics.total_requests,
        "fallbacks_total": metrics.fallbacks_total,
        "rejected_total": metrics.rejected_total,
    }))
}

pub async fn insights_handler(
    State(state): State<HttpState>,
    Json(body): Json<InsightsBody>,
) -> impl IntoResponse {
    let request = crate::context::insight_request(&body.location, body.role);
    let result = state.pipeline.supervised_insights(&request).await;
    count(&state, result.is_fallback()).await;
    Json(json!({
        "insights": result.value,
        "location": body.location,
        "role": body.role,
        "fallback": result.is_fallback(),
    }))
}

pub async fn chat_handler(
    State(state): State<HttpState>,
    Json(body): Json<ChatBody>,
) -> Result<impl IntoResponse> {
    if body.message.trim().is_empty() {
        let mut m = state.metrics.lock().await;
        m.rejected_total = m.rejected_total.saturating_add(1);
        return Err(AdvisorError::InvalidParams {
            message: "message must not be empty".into(),
        });
    }

    let request = crate::context::build(body.message, body.role, body.location);
    let result = state.pipeline.supervised_text(&request).await;
    count(&state, result.is_fallback()).await;
    Ok(Json(json!({
        "response": result.value,
        "fallback": result.is_fallback(),
    })))
}

pub async fn analysis_handler(
    State(state): State<HttpState>,
    Json(body): Json<AnalysisBody>,
) -> impl IntoResponse {
    let report = state
        .pipeline
        .data_analysis(&body.query, &body.location, body.role)
        .await;
    count(&state, report.error.is_some()).await;
    Json(report)
}

pub async fn recommendations_handler(
    State(state): State<HttpState>,
    Json(body): Json<RecommendationBody>,
) -> impl IntoResponse {
    let report = state
        .pipeline
        .resource_recommendations(&body.location, body.role)
        .await;
    count(&state, report.error.is_some()).await;
    Json(report)
}

/// Build the application router; `/health` is exempt from bearer auth
pub fn router(state: HttpState, bearer_token: Option<String>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/insights", post(insights_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/analysis", post(analysis_handler))
        .route("/api/recommendations", post(recommendations_handler))
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            bearer_token,
            |State(token): State<Option<String>>,
             req: axum::http::Request<Body>,
             next: axum::middleware::Next| async move {
                let Some(expected) = token else {
                    return next.run(req).await;
                };
                if req.uri().path() == "/health" {
                    return next.run(req).await;
                }
                let headers: &HeaderMap = req.headers();
                let header_ok = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|h| h.to_str().ok())
                    .is_some_and(|v| v == format!("Bearer {}", expected));
                if !header_ok {
                    return (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"error": {"code": 401, "message": "Unauthorized"}})),
                    )
                        .into_response();
                }
                next.run(req).await
            },
        ))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

/// Start the HTTP server and run until Ctrl-C
pub async fn start_http_server(pipeline: AdvisorPipeline, config: &Config) -> anyhow::Result<()> {
    let state = HttpState {
        pipeline,
        info: Arc::new(ServiceInfo::from_config(config)),
        metrics: Arc::new(Mutex::new(HttpMetrics::default())),
    };
    let app = router(state, config.runtime.bearer_token.clone());

    let bind = config.runtime.http_bind;
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Health advisor listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
