//! HTTP surface: routing, bearer auth and fallback flags

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request as HttpRequest, StatusCode, header};
use health_advisor::context::Request;
use health_advisor::fallback::FallbackContent;
use health_advisor::http::{HttpMetrics, HttpState, ServiceInfo, router};
use health_advisor::responders::RawOutput;
use health_advisor::router::Dispatch;
use health_advisor::{AdvisorError, AdvisorPipeline, Intent};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

/// Answers insight requests with a numbered list and fails everything else
struct InsightsOnly;

#[async_trait]
impl Dispatch for InsightsOnly {
    async fn dispatch(&self, request: &Request) -> health_advisor::Result<RawOutput> {
        match request.intent_hint {
            Some(Intent::Insight) => Ok(RawOutput::text(
                "1. Childhood asthma visits are rising in the valley\n2. Clinic wait times exceed three weeks",
            )),
            _ => Err(AdvisorError::ResponderTimeout {
                responder: "health".into(),
                timeout_ms: 30_000,
            }),
        }
    }
}

fn app(token: Option<&str>) -> axum::Router {
    let pipeline = AdvisorPipeline::new(Arc::new(InsightsOnly), Arc::new(FallbackContent::builtin()));
    let state = HttpState {
        pipeline,
        info: Arc::new(ServiceInfo::default()),
        metrics: Arc::new(Mutex::new(HttpMetrics::default())),
    };
    router(state, token.map(str::to_string))
}

fn post_json(uri: &str, body: Value) -> HttpRequest<Body> {
    HttpRequest::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn health_reports_service_name() -> Result<()> {
    let response = app(None)
        .oneshot(HttpRequest::get("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "health-intelligence-hub");
    Ok(())
}

#[tokio::test]
async fn insights_route_returns_cleaned_list() -> Result<()> {
    let response = app(None)
        .oneshot(post_json(
            "/api/insights",
            json!({"location": "Fresno, CA", "role": "Public Health Staff"}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(
        body["insights"],
        json!([
            "Childhood asthma visits are rising in the valley",
            "Clinic wait times exceed three weeks"
        ])
    );
    assert_eq!(body["role"], "Public Health Staff");
    assert_eq!(body["fallback"], false);
    Ok(())
}

#[tokio::test]
async fn chat_route_substitutes_fallback_on_timeout() -> Result<()> {
    let response = app(None)
        .oneshot(post_json(
            "/api/chat",
            json!({
                "message": "What clinics are open near me?",
                "role": "resident",
                "location": "Oakland, CA"
            }),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["fallback"], true);

    let answer = body["response"].as_str().unwrap_or_default().to_string();
    let options = FallbackContent::builtin()
        .chat_options(health_advisor::Role::Resident)
        .to_vec();
    assert!(options.contains(&answer));
    Ok(())
}

#[tokio::test]
async fn empty_chat_message_is_rejected() -> Result<()> {
    let response = app(None)
        .oneshot(post_json(
            "/api/chat",
            json!({"message": "   ", "role": "staff", "location": "Fresno, CA"}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await?;
    assert!(body["error"]["message"].as_str().is_some());
    Ok(())
}

#[tokio::test]
async fn analysis_route_reports_error_inline() -> Result<()> {
    let response = app(None)
        .oneshot(post_json(
            "/api/analysis",
            json!({"query": "asthma trends", "location": "Fresno, CA"}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["analysis"], "Unable to retrieve data analysis at this time.");
    assert_eq!(body["query"], "asthma trends");
    assert!(body["error"].as_str().unwrap_or_default().contains("timed out"));
    Ok(())
}

#[tokio::test]
async fn bearer_token_guards_everything_but_health() -> Result<()> {
    let app = app(Some("s3cret"));

    let health = app
        .clone()
        .oneshot(HttpRequest::get("/health").body(Body::empty())?)
        .await?;
    assert_eq!(health.status(), StatusCode::OK);

    let denied = app
        .clone()
        .oneshot(HttpRequest::get("/metrics").body(Body::empty())?)
        .await?;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let allowed = app
        .oneshot(
            HttpRequest::get("/metrics")
                .header(header::AUTHORIZATION, "Bearer s3cret")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(allowed.status(), StatusCode::OK);
    let body = json_body(allowed).await?;
    assert_eq!(body["total_requests"], 0);
    Ok(())
}
