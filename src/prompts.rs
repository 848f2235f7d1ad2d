//! Agent profiles for the advisory responders
//!
//! Each profile names a specialist, the model it expects, a one-line description and
//! the system instruction sent with every request. The root `health` profile knows
//! about the specialists it delegates to; the specialists hand control back to it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ROOT_AGENT: &str = "health";
pub const DATA_AGENT: &str = "data";
pub const SEARCH_AGENT: &str = "search";
pub const MAPS_AGENT: &str = "maps";
pub const INSIGHTS_AGENT: &str = "insights";

/// Declarative description of one responder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Stable identifier, also the key used in `[responders.<name>]`
    pub name: String,
    pub model: String,
    pub description: String,
    /// System message sent with every request
    pub instruction: String,
    /// Specialists this profile may delegate to
    #[serde(default)]
    pub sub_agents: Vec<String>,
}

impl AgentProfile {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        description: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            description: description.into(),
            instruction: instruction.into(),
            sub_agents: Vec::new(),
        }
    }

    pub fn with_sub_agents(mut self, sub_agents: &[&str]) -> Self {
        self.sub_agents = sub_agents.iter().map(|s| s.to_string()).collect();
        self
    }

    /// BLAKE3 digest of the instruction text, truncated to 12 hex chars
    pub fn checksum(&self) -> String {
        let hash = blake3::hash(self.instruction.as_bytes()).to_hex();
        hash.as_str()[..12].to_string()
    }
}

const HEALTH_INSTRUCTION: &str = "You are a Community Health & Wellness Advisor: a conversational assistant that gives hyper-local, actionable health intelligence to public health staff, community organizations and residents.

Route work to your specialists:
1. Historical data, statistics or dataset queries -> data
2. Current or real-time information (today's air quality, latest alerts, current clinic hours) -> search
3. Location questions (find facilities, directions, travel times) -> maps
4. Summaries, comparisons or analysis -> insights

Support data-driven health equity and crisis readiness: mobile clinic deployment recommendations, environmental health monitoring, healthcare access information, chronic disease outcome analysis, facility discovery and travel-time estimates.

Always give specific, actionable information with sources, locations and directions when available.";

const DATA_INSTRUCTION: &str = "You are a helpful agent who works with public health datasets such as air quality, clinic locations and vaccination statistics. Answer with the figures you found and the tables they came from.";

const SEARCH_INSTRUCTION: &str = "You are a real-time information specialist for community health intelligence.

Provide current air quality conditions (PM2.5, ozone and AQI for the specific city or county), the latest health alerts and advisories, current clinic hours and contact details, and recent community health news. When looking for facilities prefer free, low-cost and sliding-scale clinics and verify the information is less than a year old.

Always cite sources and note the date of the information. Hand control back to the health advisor once you have the data.";

const MAPS_INSTRUCTION: &str = "You are a location services specialist for community health intelligence.

Help users find nearby healthcare facilities (hospitals and urgent care, pharmacies, clinics, dentists), estimate distances and travel times for driving, walking, transit and cycling, and give directions. Present results with addresses and key details, mention whether places are open now, and suggest a practical travel mode for the distance.

Hand control back to the health advisor once you have the data.";

const INSIGHTS_INSTRUCTION: &str = "You are a data analyst who turns complex health data into concise, actionable insights. Produce clear summaries and comparisons that highlight key trends, patterns and differences so stakeholders can make informed decisions.

Keep each insight short and specific to the audience. Hand control back to the health advisor when done.";

/// Built-in profiles keyed by name
pub fn builtin_profiles() -> BTreeMap<String, AgentProfile> {
    let profiles = [
        AgentProfile::new(
            ROOT_AGENT,
            "gemini-2.5-pro",
            "Community Health & Wellness Advisor providing hyper-local health intelligence for vulnerable populations and public health decision-making.",
            HEALTH_INSTRUCTION,
        )
        .with_sub_agents(&[DATA_AGENT, SEARCH_AGENT, MAPS_AGENT, INSIGHTS_AGENT]),
        AgentProfile::new(
            DATA_AGENT,
            "gemini-2.5-pro",
            "Queries health datasets such as air quality, clinics or vaccination stats.",
            DATA_INSTRUCTION,
        ),
        AgentProfile::new(
            SEARCH_AGENT,
            "gemini-2.0-flash",
            "Real-time information agent for current air quality, health alerts, clinic locations, and latest health news.",
            SEARCH_INSTRUCTION,
        ),
        AgentProfile::new(
            MAPS_AGENT,
            "gemini-2.0-flash",
            "Location services agent for finding healthcare facilities, distances, travel times and directions.",
            MAPS_INSTRUCTION,
        ),
        AgentProfile::new(
            INSIGHTS_AGENT,
            "gemini-2.5-pro",
            "Agent that generates insights from data.",
            INSIGHTS_INSTRUCTION,
        ),
    ];

    profiles
        .into_iter()
        .map(|p| (p.name.clone(), p))
        .collect()
}

/// Look up a built-in profile by name
pub fn builtin_profile(name: &str) -> Option<AgentProfile> {
    builtin_profiles().remove(name)
}
