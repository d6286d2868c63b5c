//! Per-query context payload and prompt rendering

use std::fmt::Write;

use serde::Serialize;
use serde_json::{Value, json};

use super::metrics::MetricsAggregator;
use super::selector::{Category, Selection};
use crate::Result;

/// Characters of each section kept in the prompt
pub const SECTION_CHAR_LIMIT: usize = 500;

/// Key under which a section is rendered into the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKey {
    UserStatus,
    IndividualContribution,
    TeamPerformance,
    ProjectHealth,
    Blockers,
}

impl SectionKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserStatus => "user_status",
            Self::IndividualContribution => "individual_contribution",
            Self::TeamPerformance => "team_performance",
            Self::ProjectHealth => "project_health",
            Self::Blockers => "blockers",
        }
    }

    /// Shape substituted when the section's data could not be gathered
    fn degraded(self) -> Value {
        match self {
            Self::TeamPerformance => json!({}),
            Self::Blockers => json!([]),
            Self::UserStatus | Self::IndividualContribution | Self::ProjectHealth => {
                json!({"status": "error"})
            }
        }
    }
}

/// Outcome of gathering one section
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    /// Data gathered from the store
    Ready(Value),
    /// The store could not provide the data
    Unavailable { reason: String },
}

/// Grounding data for one query, in gathering order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextPayload {
    sections: Vec<(SectionKey, Section)>,
}

impl ContextPayload {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Look up a gathered section
    #[must_use]
    pub fn get(&self, key: SectionKey) -> Option<&Section> {
        self.sections.iter().find(|(k, _)| *k == key).map(|(_, s)| s)
    }

    /// Data of a section, if it was gathered successfully
    #[must_use]
    pub fn data(&self, key: SectionKey) -> Option<&Value> {
        match self.get(key)? {
            Section::Ready(value) => Some(value),
            Section::Unavailable { .. } => None,
        }
    }

    /// Record the result of one store-backed computation
    pub fn insert<T: Serialize>(&mut self, key: SectionKey, result: Result<T>) {
        let section = match result.and_then(|v| serde_json::to_value(v).map_err(Into::into)) {
            Ok(value) => Section::Ready(value),
            Err(e) => {
                tracing::warn!(section = key.as_str(), error = %e, "context section unavailable");
                Section::Unavailable {
                    reason: e.to_string(),
                }
            }
        };
        self.sections.retain(|(k, _)| *k != key);
        self.sections.push((key, section));
    }

    /// Render the user prompt: the query followed by each section,
    /// truncated to [`SECTION_CHAR_LIMIT`] characters
    #[must_use]
    pub fn render_prompt(&self, query: &str) -> String {
        let mut prompt = format!("User Query: {query}\n\nAvailable Data:\n");

        for (key, section) in &self.sections {
            let value = match section {
                Section::Ready(value) => value.to_string(),
                Section::Unavailable { .. } => key.degraded().to_string(),
            };
            let truncated: String = value.chars().take(SECTION_CHAR_LIMIT).collect();
            let _ = write!(prompt, "\n{}:\n{truncated}\n", key.as_str());
        }

        prompt
    }
}

/// Gather every section a selection asks for
///
/// Sections fail independently; a failed store read becomes
/// [`Section::Unavailable`] and the rest are still gathered.
#[must_use]
pub fn gather(selection: &Selection, metrics: &MetricsAggregator) -> ContextPayload {
    let mut payload = ContextPayload::default();

    if let Some(name) = selection.individual.as_deref() {
        payload.insert(SectionKey::UserStatus, metrics.user_status(name));
        payload.insert(
            SectionKey::IndividualContribution,
            metrics.individual_contribution(name),
        );
    }
    if selection.contains(Category::TeamPerformance) {
        payload.insert(SectionKey::TeamPerformance, metrics.team_performance());
    }
    if selection.contains(Category::ProjectHealth) {
        payload.insert(SectionKey::ProjectHealth, metrics.project_health());
    }
    if selection.contains(Category::Blockers) {
        payload.insert(SectionKey::Blockers, metrics.blockers());
    }

    tracing::debug!(sections = payload.len(), "gathered context");
    payload
}
