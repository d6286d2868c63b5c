//! Derived metrics handed to the language model as grounding context

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::db::MetricsStore;
use crate::model::{
    CommitEntry, ContributionRecord, PersonSnapshot, Priority, Task, TaskStatus, Ticket,
    TicketRecord,
};

/// Thresholds and caps applied while aggregating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsPolicy {
    /// Completion percentage above which a project is on track
    pub on_track_threshold: f64,
    pub top_contributors: usize,
    pub overdue_sample: usize,
    pub max_blockers: usize,
    pub recent_activity: usize,
    /// Window reported with team performance figures
    pub window_days: u32,
}

impl Default for MetricsPolicy {
    fn default() -> Self {
        Self {
            on_track_threshold: 60.0,
            top_contributors: 5,
            overdue_sample: 5,
            max_blockers: 10,
            recent_activity: 5,
            window_days: 7,
        }
    }
}

/// Task counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub total: usize,
}

impl TaskCounts {
    fn of(tasks: &[Task]) -> Self {
        let count = |status| tasks.iter().filter(|t| t.status == status).count();
        Self {
            completed: count(TaskStatus::Completed),
            in_progress: count(TaskStatus::InProgress),
            pending: count(TaskStatus::Pending),
            total: tasks.len(),
        }
    }

    /// Completed share in percent; 0 when there are no tasks
    #[allow(clippy::cast_precision_loss)]
    fn completion_percentage(self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

/// Contributor entry in the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributorSummary {
    pub name: String,
    pub total_commits: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
}

/// Team-wide activity summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamPerformance {
    pub window_days: u32,
    pub total_commits: u64,
    pub total_lines_added: u64,
    pub total_lines_deleted: u64,
    pub total_lines_changed: u64,
    pub top_contributors: Vec<ContributorSummary>,
    pub tasks: TaskCounts,
    pub completion_rate: f64,
}

/// Task as shown in health and blocker reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub assignee_name: String,
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            status: task.status,
            priority: task.priority,
            deadline: task.deadline,
            assignee_name: task.assignee_name.clone(),
        }
    }
}

/// Figures behind a project health verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub total_tasks: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub completion_percentage: f64,
    pub overdue_count: usize,
    pub overdue_tasks: Vec<TaskSummary>,
}

/// Project health verdict, serialized with a `status` discriminator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProjectHealth {
    /// No tasks exist, so no percentages are computed
    NoData,
    OnTrack(HealthReport),
    AtRisk(HealthReport),
}

impl ProjectHealth {
    #[must_use]
    pub const fn status(&self) -> &'static str {
        match self {
            Self::NoData => "no_data",
            Self::OnTrack(_) => "on_track",
            Self::AtRisk(_) => "at_risk",
        }
    }

    #[must_use]
    pub const fn report(&self) -> Option<&HealthReport> {
        match self {
            Self::NoData => None,
            Self::OnTrack(r) | Self::AtRisk(r) => Some(r),
        }
    }
}

/// Why a task is considered a blocker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockerKind {
    HighPriorityPending,
    Overdue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
}

/// A task that is holding work up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blocker {
    #[serde(rename = "type")]
    pub kind: BlockerKind,
    pub task: TaskSummary,
    pub severity: Severity,
}

/// Source control figures for one person
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeActivity {
    pub total_commits: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub total_lines_changed: u64,
    pub recent_commits: Vec<CommitEntry>,
}

/// Ticket figures for one person
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketActivity {
    pub total_tickets: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub recent_tickets: Vec<Ticket>,
}

/// Contribution of a person found in at least one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributionDetail {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeActivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickets: Option<TicketActivity>,
}

/// Individual contribution, or a `user_not_found` marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum IndividualContribution {
    Found(ContributionDetail),
    NotFound { status: &'static str },
}

impl IndividualContribution {
    #[must_use]
    pub const fn not_found() -> Self {
        Self::NotFound {
            status: "user_not_found",
        }
    }

    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Sum commits and lines, count tasks, and rank contributors
#[must_use]
pub fn team_performance(
    contributors: &[ContributionRecord],
    tasks: &[Task],
    policy: &MetricsPolicy,
) -> TeamPerformance {
    let total_commits = contributors.iter().map(|c| c.total_commits).sum();
    let total_lines_added: u64 = contributors.iter().map(|c| c.total_lines_added).sum();
    let total_lines_deleted: u64 = contributors.iter().map(|c| c.total_lines_deleted).sum();

    // sort_by is stable: equal commit counts keep store order
    let mut ranked: Vec<&ContributionRecord> = contributors.iter().collect();
    ranked.sort_by(|a, b| b.total_commits.cmp(&a.total_commits));

    let top_contributors = ranked
        .into_iter()
        .take(policy.top_contributors)
        .map(|c| ContributorSummary {
            name: c.name.clone(),
            total_commits: c.total_commits,
            lines_added: c.total_lines_added,
            lines_deleted: c.total_lines_deleted,
        })
        .collect();

    let counts = TaskCounts::of(tasks);

    TeamPerformance {
        window_days: policy.window_days,
        total_commits,
        total_lines_added,
        total_lines_deleted,
        total_lines_changed: total_lines_added + total_lines_deleted,
        top_contributors,
        tasks: counts,
        completion_rate: counts.completion_percentage(),
    }
}

/// Classify overall progress and list overdue work
#[must_use]
pub fn project_health(tasks: &[Task], now: DateTime<Utc>, policy: &MetricsPolicy) -> ProjectHealth {
    if tasks.is_empty() {
        return ProjectHealth::NoData;
    }

    let counts = TaskCounts::of(tasks);
    let completion_percentage = counts.completion_percentage();

    let overdue: Vec<&Task> = tasks.iter().filter(|t| t.is_overdue(now)).collect();

    let report = HealthReport {
        total_tasks: counts.total,
        completed: counts.completed,
        in_progress: counts.in_progress,
        pending: counts.pending,
        completion_percentage,
        overdue_count: overdue.len(),
        overdue_tasks: overdue
            .into_iter()
            .take(policy.overdue_sample)
            .map(TaskSummary::from)
            .collect(),
    };

    if completion_percentage > policy.on_track_threshold {
        ProjectHealth::OnTrack(report)
    } else {
        ProjectHealth::AtRisk(report)
    }
}

/// Priorities that make a stalled task a blocker
pub const BLOCKING_PRIORITIES: [Priority; 2] = [Priority::High, Priority::Critical];

/// Statuses counted as stalled
pub const STALLED_STATUSES: [TaskStatus; 2] = [TaskStatus::Pending, TaskStatus::Blocked];

/// Combine stalled high-priority tasks and overdue tasks, in that order
///
/// `high_priority` is the store's pre-filtered result and is re-checked here.
/// The cap applies to the combined list.
#[must_use]
pub fn blockers(
    high_priority: &[Task],
    tasks: &[Task],
    now: DateTime<Utc>,
    policy: &MetricsPolicy,
) -> Vec<Blocker> {
    let stalled = high_priority
        .iter()
        .filter(|t| BLOCKING_PRIORITIES.contains(&t.priority) && STALLED_STATUSES.contains(&t.status))
        .map(|t| Blocker {
            kind: BlockerKind::HighPriorityPending,
            task: TaskSummary::from(t),
            severity: Severity::High,
        });

    let overdue = tasks.iter().filter(|t| t.is_overdue(now)).map(|t| Blocker {
        kind: BlockerKind::Overdue,
        task: TaskSummary::from(t),
        severity: Severity::Medium,
    });

    stalled.chain(overdue).take(policy.max_blockers).collect()
}

/// Shape whichever of a person's records were found
#[must_use]
pub fn individual_contribution(
    name: &str,
    contribution: Option<&ContributionRecord>,
    tickets: Option<&TicketRecord>,
    policy: &MetricsPolicy,
) -> IndividualContribution {
    if contribution.is_none() && tickets.is_none() {
        return IndividualContribution::not_found();
    }

    let code = contribution.map(|c| CodeActivity {
        total_commits: c.total_commits,
        lines_added: c.total_lines_added,
        lines_deleted: c.total_lines_deleted,
        total_lines_changed: c.total_lines_changed,
        recent_commits: c.commits.iter().take(policy.recent_activity).cloned().collect(),
    });

    let tickets = tickets.map(|r| {
        let with_status = |label: &str| r.tickets.iter().filter(|t| t.status == label).count();
        TicketActivity {
            total_tickets: r.tickets.len(),
            completed: with_status("Done"),
            in_progress: with_status("In Progress"),
            recent_tickets: r.tickets.iter().take(policy.recent_activity).cloned().collect(),
        }
    });

    IndividualContribution::Found(ContributionDetail {
        name: name.to_string(),
        code,
        tickets,
    })
}

/// Runs store queries and aggregates their results
#[derive(Clone)]
pub struct MetricsAggregator {
    store: Arc<dyn MetricsStore>,
    policy: MetricsPolicy,
}

impl MetricsAggregator {
    #[must_use]
    pub fn new(store: Arc<dyn MetricsStore>, policy: MetricsPolicy) -> Self {
        Self { store, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &MetricsPolicy {
        &self.policy
    }

    /// # Errors
    ///
    /// Returns error if the store cannot be read
    pub fn team_performance(&self) -> Result<TeamPerformance> {
        let contributors = self.store.contributors()?;
        let tasks = self.store.tasks()?;
        Ok(team_performance(&contributors, &tasks, &self.policy))
    }

    /// # Errors
    ///
    /// Returns error if the store cannot be read
    pub fn project_health(&self) -> Result<ProjectHealth> {
        let tasks = self.store.tasks()?;
        Ok(project_health(&tasks, Utc::now(), &self.policy))
    }

    /// # Errors
    ///
    /// Returns error if the store cannot be read
    pub fn blockers(&self) -> Result<Vec<Blocker>> {
        let high_priority = self
            .store
            .tasks_filtered(&BLOCKING_PRIORITIES, &STALLED_STATUSES)?;
        let tasks = self.store.tasks()?;
        Ok(blockers(&high_priority, &tasks, Utc::now(), &self.policy))
    }

    /// # Errors
    ///
    /// Returns error if the store cannot be read
    pub fn individual_contribution(&self, name: &str) -> Result<IndividualContribution> {
        let contribution = self.store.find_contributor(name)?;
        let tickets = self.store.find_ticket_record(name)?;
        Ok(individual_contribution(
            name,
            contribution.as_ref(),
            tickets.as_ref(),
            &self.policy,
        ))
    }

    /// Raw records for one person
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read
    pub fn user_status(&self, name: &str) -> Result<PersonSnapshot> {
        self.store.find_person(name)
    }
}
