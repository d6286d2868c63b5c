//! Store collaborator: read queries consumed by the metrics aggregator

use std::path::Path;

use rusqlite::{Row, params, params_from_iter};
use serde::de::DeserializeOwned;

use super::DbPool;
use crate::model::{
    ContributionRecord, PersonSnapshot, Priority, Snapshot, Task, TaskStatus, TicketRecord,
    parse_timestamp,
};
use crate::{Error, Result};

/// Read-only queries over the operational records
///
/// Name lookups are case-insensitive partial matches; when several records
/// match, the first one in store order is returned.
pub trait MetricsStore: Send + Sync {
    /// Find the contribution record whose name contains `name`
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read
    fn find_contributor(&self, name: &str) -> Result<Option<ContributionRecord>>;

    /// Find the ticket record whose name contains `name`
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read
    fn find_ticket_record(&self, name: &str) -> Result<Option<TicketRecord>>;

    /// Tasks whose assignee name contains `name`
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read
    fn tasks_assigned_to(&self, name: &str) -> Result<Vec<Task>>;

    /// All contribution records
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read
    fn contributors(&self) -> Result<Vec<ContributionRecord>>;

    /// All tasks
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read
    fn tasks(&self) -> Result<Vec<Task>>;

    /// Tasks with a priority in `priorities` and a status in `statuses`
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read
    fn tasks_filtered(&self, priorities: &[Priority], statuses: &[TaskStatus]) -> Result<Vec<Task>>;

    /// Check that the store is reachable
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be queried
    fn ping(&self) -> Result<()>;

    /// Everything known about one person across all record kinds
    ///
    /// # Errors
    ///
    /// Returns error if any of the underlying lookups fails
    fn find_person(&self, name: &str) -> Result<PersonSnapshot> {
        Ok(PersonSnapshot {
            name: name.to_string(),
            contribution: self.find_contributor(name)?,
            tickets: self.find_ticket_record(name)?,
            tasks: self.tasks_assigned_to(name)?,
        })
    }
}

/// Counts of records written by [`SqliteStore::import`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub tasks: usize,
    pub contributors: usize,
    pub ticket_records: usize,
}

/// `SQLite`-backed store
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Wrap an existing pool
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (and migrate) the database at `path`
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(super::init(path)?))
    }

    /// Open a fresh in-memory database
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be initialized
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(super::init_memory()?))
    }

    /// Release the connection pool
    pub fn close(self) {
        let state = self.pool.state();
        drop(self.pool);
        tracing::info!(connections = state.connections, "store closed");
    }

    fn conn(&self) -> Result<super::DbConn> {
        self.pool.get().map_err(|e| Error::Database(e.to_string()))
    }

    /// Replace all records with the contents of an exported snapshot
    ///
    /// # Errors
    ///
    /// Returns error if any record cannot be written; nothing is changed then
    pub fn import(&self, snapshot: &Snapshot) -> Result<ImportSummary> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute_batch("DELETE FROM tasks; DELETE FROM contributors; DELETE FROM ticket_records;")?;

        for task in &snapshot.tasks {
            insert_task(&tx, task)?;
        }
        for record in &snapshot.contributors {
            insert_contributor(&tx, record)?;
        }
        for record in &snapshot.ticket_records {
            insert_ticket_record(&tx, record)?;
        }

        tx.commit()?;

        let summary = ImportSummary {
            tasks: snapshot.tasks.len(),
            contributors: snapshot.contributors.len(),
            ticket_records: snapshot.ticket_records.len(),
        };
        tracing::info!(?summary, "snapshot imported");
        Ok(summary)
    }

    /// Insert or replace a single task
    ///
    /// # Errors
    ///
    /// Returns error if the write fails
    pub fn add_task(&self, task: &Task) -> Result<()> {
        let conn = self.conn()?;
        insert_task(&conn, task)
    }

    /// Insert or replace a single contribution record
    ///
    /// # Errors
    ///
    /// Returns error if the write fails
    pub fn add_contributor(&self, record: &ContributionRecord) -> Result<()> {
        let conn = self.conn()?;
        insert_contributor(&conn, record)
    }

    /// Insert or replace a single ticket record
    ///
    /// # Errors
    ///
    /// Returns error if the write fails
    pub fn add_ticket_record(&self, record: &TicketRecord) -> Result<()> {
        let conn = self.conn()?;
        insert_ticket_record(&conn, record)
    }

    fn query_tasks(&self, sql: &str, params: &[String]) -> Result<Vec<Task>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), TaskRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows.into_iter().filter_map(TaskRow::into_task).collect())
    }

    fn ticket_records(&self) -> Result<Vec<TicketRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name, tickets FROM ticket_records ORDER BY rowid")?;
        let records = stmt
            .query_map([], ticket_record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }
}

const TASK_COLUMNS: &str = "id, title, status, priority, deadline, assignee_name";

impl MetricsStore for SqliteStore {
    // SQLite's lower() and LIKE fold ASCII only, so names are matched here
    fn find_contributor(&self, name: &str) -> Result<Option<ContributionRecord>> {
        let needle = name.to_lowercase();
        Ok(self
            .contributors()?
            .into_iter()
            .find(|record| name_matches(&record.name, &needle)))
    }

    fn find_ticket_record(&self, name: &str) -> Result<Option<TicketRecord>> {
        let needle = name.to_lowercase();
        Ok(self
            .ticket_records()?
            .into_iter()
            .find(|record| name_matches(&record.name, &needle)))
    }

    fn tasks_assigned_to(&self, name: &str) -> Result<Vec<Task>> {
        let needle = name.to_lowercase();
        Ok(self
            .tasks()?
            .into_iter()
            .filter(|task| name_matches(&task.assignee_name, &needle))
            .collect())
    }

    fn contributors(&self) -> Result<Vec<ContributionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, total_commits, total_lines_added, total_lines_deleted,
                    total_lines_changed, commits
             FROM contributors ORDER BY rowid",
        )?;
        let records = stmt
            .query_map([], contributor_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn tasks(&self) -> Result<Vec<Task>> {
        self.query_tasks(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY rowid"), &[])
    }

    fn tasks_filtered(&self, priorities: &[Priority], statuses: &[TaskStatus]) -> Result<Vec<Task>> {
        if priorities.is_empty() || statuses.is_empty() {
            return Ok(Vec::new());
        }

        let priority_slots = placeholders(1, priorities.len());
        let status_slots = placeholders(1 + priorities.len(), statuses.len());
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE priority IN ({priority_slots}) AND status IN ({status_slots})
             ORDER BY rowid"
        );

        let values: Vec<String> = priorities
            .iter()
            .map(|p| p.as_str().to_string())
            .chain(statuses.iter().map(|s| s.as_str().to_string()))
            .collect();

        self.query_tasks(&sql, &values)
    }

    fn ping(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}

/// Raw task columns, validated after the row is read
struct TaskRow {
    id: String,
    title: String,
    status: String,
    priority: String,
    deadline: Option<String>,
    assignee_name: String,
}

impl TaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            status: row.get(2)?,
            priority: row.get(3)?,
            deadline: row.get(4)?,
            assignee_name: row.get(5)?,
        })
    }

    fn into_task(self) -> Option<Task> {
        let status = match self.status.parse::<TaskStatus>() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(task = %self.id, error = %e, "skipping task");
                return None;
            }
        };
        let priority = match self.priority.parse::<Priority>() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(task = %self.id, error = %e, "skipping task");
                return None;
            }
        };

        let deadline = self.deadline.as_deref().and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                tracing::warn!(task = %self.id, deadline = raw, "ignoring unparseable deadline");
            }
            parsed
        });

        Some(Task {
            id: self.id,
            title: self.title,
            status,
            priority,
            deadline,
            assignee_name: self.assignee_name,
        })
    }
}

fn contributor_from_row(row: &Row<'_>) -> rusqlite::Result<ContributionRecord> {
    let name: String = row.get(0)?;
    let commits: String = row.get(5)?;
    Ok(ContributionRecord {
        commits: json_column(&commits, &name, "commits"),
        name,
        total_commits: count_from_sql(row.get(1)?),
        total_lines_added: count_from_sql(row.get(2)?),
        total_lines_deleted: count_from_sql(row.get(3)?),
        total_lines_changed: count_from_sql(row.get(4)?),
    })
}

fn ticket_record_from_row(row: &Row<'_>) -> rusqlite::Result<TicketRecord> {
    let name: String = row.get(0)?;
    let tickets: String = row.get(1)?;
    Ok(TicketRecord {
        tickets: json_column(&tickets, &name, "tickets"),
        name,
    })
}

/// Decode a JSON column, falling back to the empty value when it is corrupt
fn json_column<T: DeserializeOwned + Default>(raw: &str, owner: &str, column: &str) -> T {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(record = owner, column, error = %e, "ignoring corrupt JSON column");
        T::default()
    })
}

fn insert_task(conn: &rusqlite::Connection, task: &Task) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO tasks (id, title, status, priority, deadline, assignee_name)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            task.id,
            task.title,
            task.status.as_str(),
            task.priority.as_str(),
            task.deadline.map(|d| d.to_rfc3339()),
            task.assignee_name,
        ],
    )?;
    Ok(())
}

fn insert_contributor(conn: &rusqlite::Connection, record: &ContributionRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO contributors
            (name, total_commits, total_lines_added, total_lines_deleted, total_lines_changed, commits)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.name,
            count_to_sql(record.total_commits),
            count_to_sql(record.total_lines_added),
            count_to_sql(record.total_lines_deleted),
            count_to_sql(record.total_lines_changed),
            serde_json::to_string(&record.commits)?,
        ],
    )?;
    Ok(())
}

fn insert_ticket_record(conn: &rusqlite::Connection, record: &TicketRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO ticket_records (name, tickets) VALUES (?1, ?2)",
        params![record.name, serde_json::to_string(&record.tickets)?],
    )?;
    Ok(())
}

/// Case-insensitive partial match; `needle` is already lowercased
fn name_matches(name: &str, needle: &str) -> bool {
    name.to_lowercase().contains(needle)
}

/// `?n, ?n+1, ...` for `count` positional parameters
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn count_to_sql(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn count_from_sql(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::model::{CommitEntry, Ticket};

    fn setup() -> SqliteStore {
        SqliteStore::in_memory().unwrap()
    }

    fn task(id: &str, status: TaskStatus, priority: Priority, assignee: &str) -> Task {
        Task {
            id: id.to_string(),
            title: format!("Task {id}"),
            status,
            priority,
            deadline: None,
            assignee_name: assignee.to_string(),
        }
    }

    fn contributor(name: &str, commits: u64) -> ContributionRecord {
        ContributionRecord {
            name: name.to_string(),
            total_commits: commits,
            total_lines_added: commits * 10,
            total_lines_deleted: commits,
            total_lines_changed: commits * 11,
            commits: vec![CommitEntry {
                sha: "abc123".to_string(),
                message: "fix build".to_string(),
                date: None,
            }],
        }
    }

    #[test]
    fn test_find_contributor_case_insensitive_partial() {
        let store = setup();
        store.add_contributor(&contributor("Aryan Sharma", 12)).unwrap();

        let found = store.find_contributor("aryan").unwrap().unwrap();
        assert_eq!(found.name, "Aryan Sharma");
        assert_eq!(found.commits.len(), 1);

        assert!(store.find_contributor("mohak").unwrap().is_none());
    }

    #[test]
    fn test_find_contributor_non_ascii_name() {
        let store = setup();
        store.add_contributor(&contributor("ÉLODIE Martin", 4)).unwrap();

        for query in ["élodie", "ÉLODIE", "Élodie mar"] {
            let found = store.find_contributor(query).unwrap();
            assert_eq!(found.map(|r| r.name).as_deref(), Some("ÉLODIE Martin"), "query: {query}");
        }

        store
            .add_task(&task("1", TaskStatus::Pending, Priority::Low, "Łukasz Nowak"))
            .unwrap();
        assert_eq!(store.tasks_assigned_to("łukasz").unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_json_columns_read_as_empty() {
        let store = setup();
        {
            let conn = store.conn().unwrap();
            conn.execute(
                "INSERT INTO contributors
                    (name, total_commits, total_lines_added, total_lines_deleted, total_lines_changed, commits)
                 VALUES ('Manu', 3, 0, 0, 0, 'not json')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO ticket_records (name, tickets) VALUES ('Manu', '{broken')",
                [],
            )
            .unwrap();
        }

        let record = store.find_contributor("manu").unwrap().unwrap();
        assert_eq!(record.total_commits, 3);
        assert!(record.commits.is_empty());
        assert!(store.find_ticket_record("manu").unwrap().unwrap().tickets.is_empty());
    }

    #[test]
    fn test_wildcards_are_literal() {
        let store = setup();
        store.add_contributor(&contributor("Manu", 1)).unwrap();

        assert!(store.find_contributor("%").unwrap().is_none());
        assert!(store.find_contributor("M_nu").unwrap().is_none());
    }

    #[test]
    fn test_find_ticket_record() {
        let store = setup();
        store
            .add_ticket_record(&TicketRecord {
                name: "Ritwik".to_string(),
                tickets: vec![Ticket {
                    key: "OPS-1".to_string(),
                    summary: "Rotate keys".to_string(),
                    status: "Done".to_string(),
                }],
            })
            .unwrap();

        let record = store.find_ticket_record("RITWIK").unwrap().unwrap();
        assert_eq!(record.tickets[0].key, "OPS-1");
    }

    #[test]
    fn test_tasks_keep_insertion_order() {
        let store = setup();
        for id in ["b", "a", "c"] {
            store
                .add_task(&task(id, TaskStatus::Pending, Priority::Low, "Mohak"))
                .unwrap();
        }

        let ids: Vec<String> = store.tasks().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_tasks_filtered() {
        let store = setup();
        store.add_task(&task("1", TaskStatus::Pending, Priority::High, "A")).unwrap();
        store.add_task(&task("2", TaskStatus::Blocked, Priority::Critical, "A")).unwrap();
        store.add_task(&task("3", TaskStatus::InProgress, Priority::High, "A")).unwrap();
        store.add_task(&task("4", TaskStatus::Pending, Priority::Normal, "A")).unwrap();

        let filtered = store
            .tasks_filtered(
                &[Priority::High, Priority::Critical],
                &[TaskStatus::Pending, TaskStatus::Blocked],
            )
            .unwrap();
        let ids: Vec<&str> = filtered.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        assert!(store.tasks_filtered(&[], &[TaskStatus::Pending]).unwrap().is_empty());
    }

    #[test]
    fn test_deadline_round_trip_and_bad_values() {
        let store = setup();
        let deadline = Utc::now() - Duration::days(2);
        let mut with_deadline = task("1", TaskStatus::Pending, Priority::Low, "A");
        with_deadline.deadline = Some(deadline);
        store.add_task(&with_deadline).unwrap();

        {
            let conn = store.conn().unwrap();
            conn.execute(
                "INSERT INTO tasks (id, title, status, priority, deadline, assignee_name)
                 VALUES ('2', 'Bad', 'pending', 'low', 'next tuesday', 'A')",
                [],
            )
            .unwrap();
        }

        let tasks = store.tasks().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(
            tasks[0].deadline.map(|d| d.timestamp()),
            Some(deadline.timestamp())
        );
        assert!(tasks[1].deadline.is_none());
    }

    #[test]
    fn test_find_person_combines_sources() {
        let store = setup();
        store.add_contributor(&contributor("Mohak", 3)).unwrap();
        store.add_task(&task("1", TaskStatus::Pending, Priority::Low, "mohak k")).unwrap();
        store.add_task(&task("2", TaskStatus::Pending, Priority::Low, "Manu")).unwrap();

        let person = store.find_person("Mohak").unwrap();
        assert_eq!(person.name, "Mohak");
        assert!(person.contribution.is_some());
        assert!(person.tickets.is_none());
        assert_eq!(person.tasks.len(), 1);
    }

    #[test]
    fn test_import_replaces_records() {
        let store = setup();
        store.add_task(&task("old", TaskStatus::Pending, Priority::Low, "A")).unwrap();

        let snapshot = Snapshot {
            tasks: vec![task("new", TaskStatus::Completed, Priority::High, "B")],
            contributors: vec![contributor("B", 2)],
            ticket_records: Vec::new(),
        };
        let summary = store.import(&snapshot).unwrap();

        assert_eq!(summary.tasks, 1);
        assert_eq!(summary.contributors, 1);
        let tasks = store.tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "new");
    }

    #[test]
    fn test_import_naive_and_bad_deadlines() {
        let store = setup();
        let snapshot: Snapshot = serde_json::from_str(
            r#"{"tasks": [
                {"id": "naive", "title": "a", "status": "pending", "priority": "high",
                 "deadline": "2024-01-15T00:00:00", "assignee_name": "A"},
                {"id": "bad", "title": "b", "status": "pending", "priority": "high",
                 "deadline": "end of sprint", "assignee_name": "A"}
            ]}"#,
        )
        .unwrap();

        let summary = store.import(&snapshot).unwrap();
        assert_eq!(summary.tasks, 2);

        let tasks = store.tasks().unwrap();
        assert_eq!(
            tasks[0].deadline.map(|d| d.to_rfc3339()).as_deref(),
            Some("2024-01-15T00:00:00+00:00")
        );
        assert!(tasks[0].is_overdue(Utc::now()));
        assert!(tasks[1].deadline.is_none());
    }

    #[test]
    fn test_ping() {
        setup().ping().unwrap();
    }
}
