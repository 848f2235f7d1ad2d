use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value, json};

use crate::config::ResponderConfig;
use crate::context::Request;
use crate::prompts::AgentProfile;
use crate::responders::traits::{RawOutput, Responder, ResponderFailure};

/// Responder backed by an OpenAI-compatible `/v1/chat/completions` endpoint
#[derive(Clone, Debug)]
pub struct ChatCompletionResponder {
    profile: AgentProfile,
    endpoint: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
    client: Client,
}

impl ChatCompletionResponder {
    pub fn new(profile: AgentProfile, endpoint: &str) -> Self {
        // Ensure endpoint has the correct path if not provided
        let endpoint = if endpoint.ends_with("/v1/chat/completions") {
            endpoint.to_string()
        } else {
            format!("{}/v1/chat/completions", endpoint.trim_end_matches('/'))
        };

        Self {
            profile,
            endpoint,
            api_key: None,
            max_tokens: 1000,
            temperature: 0.2,
            client: Client::new(),
        }
    }

    /// Build from a configured responder entry; `None` when no endpoint is set
    pub fn from_config(
        profile: AgentProfile,
        cfg: &ResponderConfig,
        api_key: Option<String>,
    ) -> Option<Self> {
        let endpoint = cfg.endpoint.as_deref()?;
        let mut responder = Self::new(profile, endpoint).with_api_key(api_key);
        if let Some(max_tokens) = cfg.max_tokens {
            responder.max_tokens = max_tokens;
        }
        if let Some(temperature) = cfg.temperature {
            responder.temperature = temperature;
        }
        Some(responder)
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, request: &Request) -> Value {
        json!({
            "model": self.profile.model,
            "messages": [
                {"role": "system", "content": self.profile.instruction},
                {"role": "user", "content": request.contextualized_prompt()}
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "user": request.request_id.to_string(),
        })
    }
}

/// Pull the assistant message out of a chat-completions response body
fn extract_output(body: Value) -> Result<RawOutput, ResponderFailure> {
    if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
        let mut map = Map::new();
        map.insert("error".into(), err.clone());
        return Ok(RawOutput::Structured(map));
    }

    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| ResponderFailure::Parse("response has no choices[0].message.content".into()))?
        .trim()
        .to_string();

    let mut map = Map::new();
    map.insert("content".into(), Value::String(content));
    if let Some(model) = body.get("model").and_then(|m| m.as_str()) {
        map.insert("model".into(), Value::String(model.to_string()));
    }
    Ok(RawOutput::Structured(map))
}

#[async_trait]
impl Responder for ChatCompletionResponder {
    fn name(&self) -> &str {
        &self.profile.name
    }

    async fn respond(&self, request: &Request) -> Result<RawOutput, ResponderFailure> {
        tracing::debug!(
            responder = %self.profile.name,
            request_id = %request.request_id,
            "Calling chat completions endpoint"
        );

        let mut req = self.client.post(&self.endpoint).json(&self.request_body(request));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ResponderFailure::Status { status, body });
        }

        let body: Value = res
            .json()
            .await
            .map_err(|e| ResponderFailure::Parse(e.to_string()))?;
        extract_output(body)
    }
}
