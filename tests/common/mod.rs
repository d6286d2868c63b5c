//! Shared test utilities

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use insights_gateway::model::{CommitEntry, PersonSnapshot, Ticket};
use insights_gateway::{
    ContributionRecord, Error, InsightsEngine, KeywordPolicy, LanguageModel, MetricsAggregator,
    MetricsPolicy, MetricsStore, Priority, Result, SqliteStore, Synthesizer, Task, TaskStatus,
    TicketRecord, Transcriber,
};

/// Set up an empty in-memory store
#[must_use]
pub fn setup_test_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::in_memory().expect("failed to init test store"))
}

/// Build a task whose deadline is `deadline_days` from now
#[must_use]
pub fn task(
    id: &str,
    status: TaskStatus,
    priority: Priority,
    deadline_days: Option<i64>,
    assignee: &str,
) -> Task {
    Task {
        id: id.to_string(),
        title: format!("Task {id}"),
        status,
        priority,
        deadline: deadline_days.map(|d| Utc::now() + Duration::days(d)),
        assignee_name: assignee.to_string(),
    }
}

/// Build a contributor with the given commit count
#[must_use]
pub fn contributor(name: &str, commits: u64) -> ContributionRecord {
    ContributionRecord {
        name: name.to_string(),
        total_commits: commits,
        total_lines_added: commits * 20,
        total_lines_deleted: commits * 5,
        total_lines_changed: commits * 25,
        commits: vec![CommitEntry {
            sha: format!("{name}-head"),
            message: format!("work by {name}"),
            date: Some(Utc::now()),
        }],
    }
}

/// Store with 3 tasks (2 completed, 1 pending) and contributors with 5 and 10 commits
#[must_use]
pub fn seeded_store() -> Arc<SqliteStore> {
    let store = setup_test_store();

    store
        .add_task(&task("T-1", TaskStatus::Completed, Priority::Normal, Some(-3), "Ritwik"))
        .expect("failed to add task");
    store
        .add_task(&task("T-2", TaskStatus::Completed, Priority::Low, Some(-1), "Mohak"))
        .expect("failed to add task");
    store
        .add_task(&task("T-3", TaskStatus::Pending, Priority::High, Some(2), "Manu"))
        .expect("failed to add task");

    store
        .add_contributor(&contributor("Mohak Sharma", 5))
        .expect("failed to add contributor");
    store
        .add_contributor(&contributor("Ritwik Rao", 10))
        .expect("failed to add contributor");

    store
        .add_ticket_record(&TicketRecord {
            name: "Ritwik Rao".to_string(),
            tickets: vec![
                Ticket {
                    key: "OPS-1".to_string(),
                    summary: "Migrate queue".to_string(),
                    status: "Done".to_string(),
                },
                Ticket {
                    key: "OPS-2".to_string(),
                    summary: "Tune autoscaling".to_string(),
                    status: "In Progress".to_string(),
                },
            ],
        })
        .expect("failed to add ticket record");

    store
}

/// Build an engine over `store` answering with `llm`
#[must_use]
pub fn engine(store: Arc<dyn MetricsStore>, llm: Arc<dyn LanguageModel>) -> InsightsEngine {
    InsightsEngine::new(
        KeywordPolicy::default(),
        MetricsAggregator::new(store, MetricsPolicy::default()),
        llm,
        insights_gateway::insights::GenerationSettings::default(),
    )
}

/// How a [`FakeModel`] responds
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Quota,
    Fail,
}

/// Language model that returns a scripted reply and records prompts
pub struct FakeModel {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    #[must_use]
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn answering(text: &str) -> Arc<Self> {
        Self::new(Reply::Text(text.to_string()))
    }

    /// User prompts received so far
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt lock poisoned").clone()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn generate(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String> {
        self.prompts
            .lock()
            .expect("prompt lock poisoned")
            .push(user_prompt.to_string());

        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Quota => Err(Error::Llm(
                "Error code: 429 - rate_limit_exceeded".to_string(),
            )),
            Reply::Fail => Err(Error::Llm("connection reset".to_string())),
        }
    }
}

/// Transcriber returning a fixed transcript, or failing when `None`
pub struct FakeTranscriber(pub Option<String>);

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio: &[u8], _language: &str) -> Result<String> {
        self.0
            .clone()
            .ok_or_else(|| Error::Stt("no transcript in response".to_string()))
    }
}

/// Synthesizer echoing the language into the audio bytes, or failing
pub struct FakeSynthesizer {
    pub fail: bool,
    pub languages: Mutex<Vec<String>>,
}

impl FakeSynthesizer {
    #[must_use]
    pub fn working() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            languages: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            languages: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn languages(&self) -> Vec<String> {
        self.languages.lock().expect("language lock poisoned").clone()
    }
}

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, _text: &str, language: &str, _speaker: Option<&str>) -> Result<Vec<u8>> {
        self.languages
            .lock()
            .expect("language lock poisoned")
            .push(language.to_string());

        if self.fail {
            return Err(Error::Tts("TTS API error 500".to_string()));
        }
        Ok(format!("RIFF{language}").into_bytes())
    }
}

/// Store whose every read fails
pub struct BrokenStore;

impl MetricsStore for BrokenStore {
    fn find_contributor(&self, _name: &str) -> Result<Option<ContributionRecord>> {
        Err(Error::Database("store offline".to_string()))
    }

    fn find_ticket_record(&self, _name: &str) -> Result<Option<TicketRecord>> {
        Err(Error::Database("store offline".to_string()))
    }

    fn tasks_assigned_to(&self, _name: &str) -> Result<Vec<Task>> {
        Err(Error::Database("store offline".to_string()))
    }

    fn contributors(&self) -> Result<Vec<ContributionRecord>> {
        Err(Error::Database("store offline".to_string()))
    }

    fn tasks(&self) -> Result<Vec<Task>> {
        Err(Error::Database("store offline".to_string()))
    }

    fn tasks_filtered(&self, _priorities: &[Priority], _statuses: &[TaskStatus]) -> Result<Vec<Task>> {
        Err(Error::Database("store offline".to_string()))
    }

    fn ping(&self) -> Result<()> {
        Err(Error::Database("store offline".to_string()))
    }

    fn find_person(&self, _name: &str) -> Result<PersonSnapshot> {
        Err(Error::Database("store offline".to_string()))
    }
}
