//! Business insights core
//!
//! A query flows through three stages:
//! - [`selector`] picks data categories by keyword
//! - [`metrics`] aggregates store records for each category
//! - [`engine`] renders the [`context`] payload into a prompt and asks the
//!   language model for a spoken-length answer

pub mod context;
pub mod engine;
pub mod metrics;
pub mod selector;

pub use context::{ContextPayload, Section, SectionKey};
pub use engine::{GenerationSettings, InsightsEngine, Language};
pub use metrics::{
    Blocker, BlockerKind, IndividualContribution, MetricsAggregator, MetricsPolicy, ProjectHealth,
    Severity, TeamPerformance,
};
pub use selector::{Category, KeywordGroup, KeywordPolicy, Selection};
