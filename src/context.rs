//! Session context and request construction.
//!
//! A [`Request`] is built once per user interaction from the raw utterance and the
//! caller's session attributes, then handed to the dispatcher. Construction is pure
//! and never fails; rejecting empty input is the caller's job.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Audience a request is answered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Staff,
    Organization,
    Resident,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Staff, Role::Organization, Role::Resident];

    /// Human-facing label used in prompts and the dashboard role picker
    pub fn label(&self) -> &'static str {
        match self {
            Role::Staff => "Public Health Staff",
            Role::Organization => "Community Organizations",
            Role::Resident => "Residents",
        }
    }

    /// Short key used in config tables and CLI flags
    pub fn key(&self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::Organization => "organization",
            Role::Resident => "resident",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "staff" | "public health staff" | "staffrole" => Ok(Role::Staff),
            "org" | "organization" | "organizations" | "community organizations" | "orgrole" => {
                Ok(Role::Organization)
            }
            "resident" | "residents" | "residentrole" => Ok(Role::Resident),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.label().to_string()
    }
}

/// Classification used to pick a non-default responder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Chat,
    Insight,
    Analysis,
    Recommendation,
}

impl Intent {
    pub const ALL: [Intent; 4] = [
        Intent::Chat,
        Intent::Insight,
        Intent::Analysis,
        Intent::Recommendation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Chat => "chat",
            Intent::Insight => "insight",
            Intent::Analysis => "analysis",
            Intent::Recommendation => "recommendation",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role and location scoping a single interaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub role: Role,
    pub location: String,
}

/// An enriched, single-use request for a responder
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub request_id: Uuid,
    pub raw_text: String,
    pub context: SessionContext,
    pub intent_hint: Option<Intent>,
}

/// Build a request from a raw utterance and session attributes.
///
/// No validation is performed; an empty `raw_text` is passed through as-is.
pub fn build(raw_text: impl Into<String>, role: Role, location: impl Into<String>) -> Request {
    Request {
        request_id: Uuid::new_v4(),
        raw_text: raw_text.into(),
        context: SessionContext {
            role,
            location: location.into(),
        },
        intent_hint: None,
    }
}

/// Request for the insights responder: four short findings for a location
pub fn insight_request(location: &str, role: Role) -> Request {
    let text = format!(
        "Generate 4 specific, actionable health insights for {location} tailored for {role}.

Focus on:
1. Key health indicators and current trends
2. Resource gaps and opportunities
3. Actionable recommendations
4. Risk factors and mitigation strategies

Format each insight as a brief, clear statement starting with an action word or key finding. Each insight should be on a new line."
    );
    build(text, role, location).with_intent(Intent::Insight)
}

/// Request for the data responder
pub fn analysis_request(query: &str, location: &str, role: Role) -> Request {
    let text = format!(
        "Analyze health data for {location} based on this query: {query}

Provide:
1. Key findings
2. Data trends
3. Statistical insights
4. Recommendations"
    );
    build(text, role, location).with_intent(Intent::Analysis)
}

/// Request for resource allocation guidance
pub fn recommendation_request(location: &str, role: Role) -> Request {
    let text = format!(
        "Provide resource allocation recommendations for {location} for {role}.

Include:
1. Priority resource needs
2. Capacity gaps
3. Budget recommendations
4. Implementation timeline
5. Expected outcomes"
    );
    build(text, role, location).with_intent(Intent::Recommendation)
}

impl Request {
    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.intent_hint = Some(intent);
        self
    }

    /// The user message sent to a responder.
    ///
    /// Chat requests get the role/location preamble; structured intents already
    /// carry their context in the generated text.
    pub fn contextualized_prompt(&self) -> String {
        match self.intent_hint {
            None | Some(Intent::Chat) => format!(
                "User Role: {}\nLocation: {}\n\n{}\n\nPlease provide a helpful, specific response tailored to this user's role and location. Include actionable insights and recommendations.",
                self.context.role, self.context.location, self.raw_text
            ),
            Some(_) => self.raw_text.clone(),
        }
    }
}
