//! Static content substituted when live responders fail.
//!
//! The table is built once at startup and only read afterwards. Every role has a
//! row in the built-in table; config overrides may replace rows, and a lookup for
//! a role without a row uses the staff row.

use std::collections::HashMap;

use crate::config::FallbackEntryConfig;
use crate::context::Role;
use crate::normalize::{MAX_INSIGHTS, MIN_INSIGHT_CHARS};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackEntry {
    pub chat: Vec<String>,
    pub insights: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FallbackContent {
    entries: HashMap<Role, FallbackEntry>,
}

fn owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|s| s.to_string()).collect()
}

impl FallbackContent {
    /// Built-in table covering every role
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            Role::Staff,
            FallbackEntry {
                chat: owned(&[
                    "I can help you analyze health data and identify intervention opportunities in your area.",
                    "Based on current health indicators, I recommend focusing on preventive care programs.",
                    "Consider implementing community health worker programs to improve outreach.",
                ]),
                insights: owned(&[
                    "Monitor chronic disease prevalence trends in your jurisdiction",
                    "Assess resource capacity gaps in mental health services",
                    "Evaluate community health worker program effectiveness",
                    "Review preventive care program coverage and outcomes",
                ]),
            },
        );
        entries.insert(
            Role::Organization,
            FallbackEntry {
                chat: owned(&[
                    "I can help you identify community health needs and available resources.",
                    "Consider partnering with local health departments for screening programs.",
                    "Community engagement programs can help address social determinants of health.",
                ]),
                insights: owned(&[
                    "Identify underserved populations in your service area",
                    "Assess transportation barriers to healthcare access",
                    "Evaluate food security and nutrition program needs",
                    "Review social isolation and community engagement opportunities",
                ]),
            },
        );
        entries.insert(
            Role::Resident,
            FallbackEntry {
                chat: owned(&[
                    "I can help you find local health resources and preventive care options.",
                    "Regular health screenings are important for early detection of health issues.",
                    "Community health programs can help you manage chronic conditions.",
                ]),
                insights: owned(&[
                    "Schedule regular health screenings and checkups",
                    "Access community health programs for chronic disease management",
                    "Utilize preventive care services available in your area",
                    "Connect with local health resources and support groups",
                ]),
            },
        );
        Self { entries }
    }

    /// Replace the row for a role.
    ///
    /// Insight lines that are too short are dropped and the list is capped; an
    /// empty list keeps the existing insights for that role. Same for chat.
    pub fn with_entry(mut self, role: Role, entry: FallbackEntry) -> Self {
        let insights: Vec<String> = entry
            .insights
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| s.chars().count() > MIN_INSIGHT_CHARS)
            .take(MAX_INSIGHTS)
            .collect();
        let chat: Vec<String> = entry
            .chat
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let row = self.entries.entry(role).or_default();
        if !insights.is_empty() {
            row.insights = insights;
        }
        if !chat.is_empty() {
            row.chat = chat;
        }
        self
    }

    /// Built-in table with config overrides applied. Unknown role keys are skipped
    /// (config validation rejects them earlier).
    pub fn from_overrides<'a>(
        overrides: impl IntoIterator<Item = (&'a String, &'a FallbackEntryConfig)>,
    ) -> Self {
        overrides
            .into_iter()
            .fold(Self::builtin(), |content, (key, cfg)| match key.parse::<Role>() {
                Ok(role) => content.with_entry(
                    role,
                    FallbackEntry {
                        chat: cfg.chat.clone(),
                        insights: cfg.insights.clone(),
                    },
                ),
                Err(e) => {
                    tracing::warn!("Skipping fallback override: {}", e);
                    content
                }
            })
    }

    fn row(&self, role: Role) -> Option<&FallbackEntry> {
        self.entries
            .get(&role)
            .or_else(|| self.entries.get(&Role::Staff))
    }

    /// Static insights for a role
    pub fn insights_for(&self, role: Role) -> Vec<String> {
        self.row(role)
            .map(|r| r.insights.clone())
            .unwrap_or_default()
    }

    /// All chat sentences for a role
    pub fn chat_options(&self, role: Role) -> &[String] {
        self.row(role).map(|r| r.chat.as_slice()).unwrap_or(&[])
    }

    /// Pick one chat sentence for a role, stable for the same `seed` text
    pub fn chat_for(&self, role: Role, seed: &str) -> String {
        let options = self.chat_options(role);
        if options.is_empty() {
            return String::new();
        }
        let digest = blake3::hash(seed.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        let idx = (u64::from_le_bytes(head) % options.len() as u64) as usize;
        options[idx].clone()
    }
}
