//! Responder registry: named specialists plus intent routes
//!
//! The registry is built once at startup and shared read-only (`Arc`) across
//! concurrent requests; nothing is registered or replaced afterwards.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::Config;
use crate::context::Intent;
use crate::error::RouteKey;
use crate::responders::{ChatCompletionResponder, Responder};

#[derive(Default, Clone)]
pub struct ResponderRegistry {
    responders: BTreeMap<String, Arc<dyn Responder>>,
    routes: HashMap<Intent, String>,
    default: Option<String>,
}

impl std::fmt::Debug for ResponderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponderRegistry")
            .field("responders", &self.responders.keys().collect::<Vec<_>>())
            .field("routes", &self.routes)
            .field("default", &self.default)
            .finish()
    }
}

impl ResponderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a responder under its own name
    pub fn register(mut self, responder: Arc<dyn Responder>) -> Self {
        self.responders
            .insert(responder.name().to_string(), responder);
        self
    }

    /// Route an intent to a responder name
    pub fn route(mut self, intent: Intent, name: impl Into<String>) -> Self {
        self.routes.insert(intent, name.into());
        self
    }

    /// Responder used when a request carries no intent hint
    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default = Some(name.into());
        self
    }

    /// Build responders for every configured entry that has an endpoint.
    ///
    /// Routes are recorded even when their target has no endpoint, so those intents
    /// resolve to "unavailable" and fall back.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new().with_default(config.routes.default.clone());

        for (name, entry) in &config.responders {
            let profile = entry.profile(name);
            match ChatCompletionResponder::from_config(profile, entry, config.runtime.api_key.clone())
            {
                Some(responder) => {
                    tracing::info!(
                        "Registered responder '{}' at {}",
                        name,
                        responder.endpoint()
                    );
                    registry = registry.register(Arc::new(responder));
                }
                None => tracing::debug!("Responder '{}' has no endpoint; skipping", name),
            }
        }

        for intent in Intent::ALL {
            if let Some(target) = config.routes.route_for(intent) {
                registry = registry.route(intent, target);
            }
        }

        registry
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Responder>> {
        self.responders.get(name).cloned()
    }

    /// Resolve the responder for an optional intent.
    ///
    /// An explicit intent only matches its own route; it never falls through to the
    /// default responder.
    pub fn resolve(&self, intent: Option<Intent>) -> Result<Arc<dyn Responder>, RouteKey> {
        let (key, name) = match intent {
            Some(intent) => (RouteKey::Intent(intent), self.routes.get(&intent)),
            None => (RouteKey::Default, self.default.as_ref()),
        };
        name.and_then(|n| self.get(n)).ok_or(key)
    }

    pub fn names(&self) -> Vec<String> {
        self.responders.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.responders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responders.is_empty()
    }
}
