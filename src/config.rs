use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::context::{Intent, Role};
use crate::prompts::{self, AgentProfile};

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_LOG_LEVEL: &str = "health_advisor=info";

/// Main configuration structure loaded from health_advisor.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub dispatch: DispatchConfig,
    /// Responder entries keyed by profile name
    pub responders: BTreeMap<String, ResponderConfig>,
    pub routes: RoutesConfig,
    /// Optional static content overrides keyed by role key (staff, organization, resident)
    pub fallback: BTreeMap<String, FallbackEntryConfig>,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Bounds for a single responder call
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// One responder entry; unset fields fall back to the built-in profile
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResponderConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    pub instruction: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl ResponderConfig {
    /// Resolve the agent profile for this entry
    pub fn profile(&self, name: &str) -> AgentProfile {
        let mut profile = prompts::builtin_profile(name).unwrap_or_else(|| {
            AgentProfile::new(
                name,
                "gemini-2.5-pro",
                format!("Custom responder '{name}'"),
                "You are a helpful community health assistant.",
            )
        });
        if let Some(model) = &self.model {
            profile.model = model.clone();
        }
        if let Some(description) = &self.description {
            profile.description = description.clone();
        }
        if let Some(instruction) = &self.instruction {
            profile.instruction = instruction.clone();
        }
        profile
    }
}

/// Which responder handles each intent
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    pub default: String,
    pub chat: Option<String>,
    pub insight: Option<String>,
    pub analysis: Option<String>,
    pub recommendation: Option<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            default: prompts::ROOT_AGENT.to_string(),
            chat: Some(prompts::ROOT_AGENT.to_string()),
            insight: Some(prompts::INSIGHTS_AGENT.to_string()),
            analysis: Some(prompts::DATA_AGENT.to_string()),
            recommendation: Some(prompts::INSIGHTS_AGENT.to_string()),
        }
    }
}

impl RoutesConfig {
    pub fn route_for(&self, intent: Intent) -> Option<&str> {
        match intent {
            Intent::Chat => self.chat.as_deref(),
            Intent::Insight => self.insight.as_deref(),
            Intent::Analysis => self.analysis.as_deref(),
            Intent::Recommendation => self.recommendation.as_deref(),
        }
    }
}

/// Static content override for one role
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackEntryConfig {
    pub chat: Vec<String>,
    pub insights: Vec<String>,
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub api_key: Option<String>,
    pub log_level: String,
    pub log_ansi: bool,
    pub http_bind: std::net::SocketAddr,
    pub bearer_token: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_ansi: true,
            http_bind: std::net::SocketAddr::from(([127, 0, 0, 1], 8080)),
            bearer_token: None,
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self::load_with(|key| std::env::var(key).ok())
    }

    fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self {
            api_key: lookup("ADVISOR_API_KEY").or_else(|| lookup("GOOGLE_API_KEY")),
            log_level: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_ansi: lookup("ADVISOR_LOG_ANSI").is_none_or(|v| v != "0" && v != "false"),
            bearer_token: lookup("ADVISOR_BEARER_TOKEN").filter(|t| !t.trim().is_empty()),
            ..Self::default()
        };

        if let Some(v) = lookup("ADVISOR_HTTP_BIND") {
            match v.parse::<std::net::SocketAddr>() {
                Ok(bind) => cfg.http_bind = bind,
                Err(_) => tracing::warn!("Ignoring invalid ADVISOR_HTTP_BIND: {}", v),
            }
        } else if let Some(port) = lookup("PORT").and_then(|p| p.parse::<u16>().ok()) {
            cfg.http_bind = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        }

        cfg
    }
}

impl Default for Config {
    fn default() -> Self {
        let responders = prompts::builtin_profiles()
            .into_keys()
            .map(|name| (name, ResponderConfig::default()))
            .collect();

        Self {
            dispatch: DispatchConfig::default(),
            responders,
            routes: RoutesConfig::default(),
            fallback: BTreeMap::new(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses HEALTH_ADVISOR_CONFIG environment variable or defaults to "health_advisor.toml"
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(env_path) = std::env::var("ADVISOR_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }

        let config_path = std::env::var("HEALTH_ADVISOR_CONFIG")
            .unwrap_or_else(|_| "health_advisor.toml".to_string());

        let mut config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            Self::from_toml_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Env-first overrides for responder endpoints, models and the dispatch bound
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup("ADVISOR_ENDPOINT") {
            for entry in self.responders.values_mut() {
                if entry.endpoint.is_none() {
                    entry.endpoint = Some(endpoint.clone());
                }
            }
            tracing::debug!("ADVISOR_ENDPOINT env override applied");
        }
        if let Some(model) = lookup("ADVISOR_MODEL") {
            for entry in self.responders.values_mut() {
                entry.model = Some(model.clone());
            }
            tracing::debug!("ADVISOR_MODEL env override applied");
        }
        if let Some(timeout) = lookup("ADVISOR_DISPATCH_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.dispatch.timeout_ms = timeout;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.dispatch.timeout_ms == 0 {
            anyhow::bail!("dispatch.timeout_ms must be greater than 0");
        }

        let mut routed = vec![("default", Some(self.routes.default.as_str()))];
        routed.extend(Intent::ALL.iter().map(|i| (i.as_str(), self.routes.route_for(*i))));
        for (route, target) in routed {
            if let Some(name) = target
                && !self.responders.contains_key(name)
            {
                anyhow::bail!("routes.{route} points at unknown responder '{name}'");
            }
        }

        for (name, entry) in &self.responders {
            if let Some(endpoint) = &entry.endpoint
                && !endpoint.starts_with("http://")
                && !endpoint.starts_with("https://")
            {
                anyhow::bail!("responders.{name}.endpoint must start with http:// or https://");
            }
        }

        for key in self.fallback.keys() {
            if key.parse::<Role>().is_err() {
                anyhow::bail!("fallback.{key} is not a known role");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dispatch.timeout_ms, 30_000);
        assert_eq!(config.routes.route_for(Intent::Insight), Some("insights"));
        assert_eq!(config.routes.route_for(Intent::Analysis), Some("data"));
        assert!(config.responders.values().all(|r| r.endpoint.is_none()));
    }

    #[test]
    fn test_toml_parsing() {
        let config = Config::from_toml_str(
            r#"
            [dispatch]
            timeout_ms = 5000

            [responders.health]
            endpoint = "http://127.0.0.1:8111"
            model = "local-model"

            [responders.insights]
            endpoint = "http://127.0.0.1:8112"

            [routes]
            default = "health"
            insight = "insights"

            [fallback.resident]
            chat = ["Call 211 to find free community health services near you."]
            "#,
        )
        .unwrap();

        assert_eq!(config.dispatch.timeout_ms, 5000);
        assert_eq!(config.responders.len(), 2);
        assert_eq!(config.responders["health"].profile("health").model, "local-model");
        assert_eq!(config.routes.route_for(Intent::Insight), Some("insights"));
        assert_eq!(config.routes.route_for(Intent::Analysis), Some("data"));
        // analysis defaults to "data", which this file does not declare
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_route_target_rejected() {
        let mut config = Config::default();
        config.routes.analysis = Some("weather".into());
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("routes.analysis"));
    }

    #[test]
    fn test_bad_endpoint_and_role_rejected() {
        let mut config = Config::default();
        config.responders.get_mut("data").unwrap().endpoint = Some("ftp://nope".into());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.fallback.insert("mayor".into(), FallbackEntryConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.responders.get_mut("maps").unwrap().endpoint = Some("http://maps:9000".into());
        config.apply_env_overrides(|key| match key {
            "ADVISOR_ENDPOINT" => Some("http://shared:8000".into()),
            "ADVISOR_DISPATCH_TIMEOUT_MS" => Some("1200".into()),
            _ => None,
        });
        assert_eq!(config.dispatch.timeout_ms, 1200);
        assert_eq!(config.responders["maps"].endpoint.as_deref(), Some("http://maps:9000"));
        assert_eq!(config.responders["health"].endpoint.as_deref(), Some("http://shared:8000"));
    }

    #[test]
    fn test_runtime_from_lookup() {
        let runtime = RuntimeConfig::load_with(|key| match key {
            "GOOGLE_API_KEY" => Some("g-key".into()),
            "PORT" => Some("9090".into()),
            "ADVISOR_LOG_ANSI" => Some("0".into()),
            _ => None,
        });
        assert_eq!(runtime.api_key.as_deref(), Some("g-key"));
        assert_eq!(runtime.http_bind.port(), 9090);
        assert!(!runtime.log_ansi);
        assert!(runtime.bearer_token.is_none());
    }
}
