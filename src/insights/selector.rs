//! Keyword heuristic deciding which data categories ground a query

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of stored data that can ground an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Status and contribution of one named person
    Individual,
    /// Team-wide activity and task completion
    TeamPerformance,
    /// Task progress and overdue work
    ProjectHealth,
    /// High-priority stalled work and overdue tasks
    Blockers,
}

impl Category {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::TeamPerformance => "team_performance",
            Self::ProjectHealth => "project_health",
            Self::Blockers => "blockers",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keywords that pull in one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub category: Category,
    pub keywords: Vec<String>,
}

impl KeywordGroup {
    fn new(category: Category, keywords: &[&str]) -> Self {
        Self {
            category,
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        }
    }

    fn matches(&self, query_lower: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && query_lower.contains(&k.to_lowercase()))
    }
}

/// Classification policy mapping keyword groups to categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordPolicy {
    /// Team members, in match priority order
    pub people: Vec<String>,

    /// Keyword groups for the non-individual categories
    pub groups: Vec<KeywordGroup>,

    /// Categories used when nothing matches
    pub fallback: Vec<Category>,
}

impl Default for KeywordPolicy {
    fn default() -> Self {
        Self {
            people: ["Aryan", "Ritwik", "Mohak", "Manu"]
                .into_iter()
                .map(String::from)
                .collect(),
            groups: vec![
                KeywordGroup::new(
                    Category::TeamPerformance,
                    &["team", "everyone", "all", "performance"],
                ),
                KeywordGroup::new(
                    Category::ProjectHealth,
                    &["project", "deadline", "track", "health", "sprint"],
                ),
                KeywordGroup::new(
                    Category::Blockers,
                    &["blocker", "blocked", "issue", "problem", "stuck"],
                ),
            ],
            fallback: vec![Category::TeamPerformance, Category::ProjectHealth],
        }
    }
}

/// Categories chosen for one query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub categories: BTreeSet<Category>,

    /// Person resolved for [`Category::Individual`]
    pub individual: Option<String>,
}

impl Selection {
    #[must_use]
    pub fn contains(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }
}

impl KeywordPolicy {
    /// Pick the categories a query asks about
    ///
    /// Matching is case-insensitive substring search. Groups are independent,
    /// so a query can select several categories. At most one person is
    /// resolved: the first in `people` order whose name appears.
    #[must_use]
    pub fn select(&self, query: &str) -> Selection {
        let query_lower = query.to_lowercase();
        let mut selection = Selection::default();

        if let Some(person) = self
            .people
            .iter()
            .find(|p| !p.is_empty() && query_lower.contains(&p.to_lowercase()))
        {
            selection.categories.insert(Category::Individual);
            selection.individual = Some(person.clone());
        }

        for group in &self.groups {
            if group.matches(&query_lower) {
                selection.categories.insert(group.category);
            }
        }

        if selection.categories.is_empty() {
            selection.categories.extend(self.fallback.iter().copied());
        }

        selection
    }
}
