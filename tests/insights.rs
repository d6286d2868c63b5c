//! End-to-end query processing over a real store and a scripted model

use std::sync::Arc;

use insights_gateway::insights::{Category, Language, SectionKey};
use insights_gateway::{MetricsAggregator, MetricsPolicy, MetricsStore};

mod common;
use common::{BrokenStore, FakeModel, Reply, engine, seeded_store, setup_test_store};

#[tokio::test]
async fn test_team_query_grounds_on_team_performance() {
    let store = seeded_store();
    let llm = FakeModel::answering("The team closed two of three tasks.");
    let engine = engine(store, llm.clone());

    let selection = engine.select("How is the team performing?");
    assert_eq!(
        selection.categories.iter().copied().collect::<Vec<_>>(),
        vec![Category::TeamPerformance]
    );

    let payload = engine.gather_context("How is the team performing?");
    assert_eq!(payload.len(), 1);

    let team = payload.data(SectionKey::TeamPerformance).unwrap();
    let rate = team["completion_rate"].as_f64().unwrap();
    assert!((rate - 66.67).abs() < 0.01, "completion rate {rate}");

    let top = team["top_contributors"].as_array().unwrap();
    assert_eq!(top[0]["name"], "Ritwik Rao");
    assert_eq!(top[0]["total_commits"], 10);
    assert_eq!(top[1]["name"], "Mohak Sharma");
    assert_eq!(top[1]["total_commits"], 5);

    let answer = engine
        .process_query("How is the team performing?", "en")
        .await;
    assert_eq!(answer, "The team closed two of three tasks.");

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("User Query: How is the team performing?"));
    assert!(prompts[0].contains("team_performance:"));
    assert!(!prompts[0].contains("project_health:"));
}

#[tokio::test]
async fn test_unknown_person_still_reports_blockers() {
    let store = seeded_store();
    let engine = engine(store, FakeModel::answering("ok"));

    let payload = engine.gather_context("Is Aryan blocked?");

    let individual = payload.data(SectionKey::IndividualContribution).unwrap();
    assert_eq!(individual["status"], "user_not_found");

    let blockers = payload.data(SectionKey::Blockers).unwrap();
    let blockers = blockers.as_array().unwrap();
    assert_eq!(blockers.len(), 1);
    assert_eq!(blockers[0]["type"], "high_priority_pending");
    assert_eq!(blockers[0]["task"]["assignee_name"], "Manu");

    assert!(payload.data(SectionKey::TeamPerformance).is_none());
}

#[tokio::test]
async fn test_known_person_gets_status_and_contribution() {
    let store = seeded_store();
    let engine = engine(store, FakeModel::answering("ok"));

    let payload = engine.gather_context("what is ritwik working on");

    let status = payload.data(SectionKey::UserStatus).unwrap();
    assert_eq!(status["tasks"].as_array().unwrap().len(), 1);

    let contribution = payload.data(SectionKey::IndividualContribution).unwrap();
    assert_eq!(contribution["name"], "Ritwik");
    assert_eq!(contribution["code"]["total_commits"], 10);
    assert_eq!(contribution["tickets"]["completed"], 1);
    assert_eq!(contribution["tickets"]["in_progress"], 1);
}

#[tokio::test]
async fn test_quota_exhaustion_yields_quota_apology() {
    let engine = engine(seeded_store(), FakeModel::new(Reply::Quota));

    let english = engine.process_query("how is the project?", "en").await;
    assert_eq!(english, Language::English.quota_response());
    assert_ne!(english, Language::English.fallback_response());

    let hindi = engine.process_query("how is the project?", "hi").await;
    assert_eq!(hindi, Language::Hindi.quota_response());
}

#[tokio::test]
async fn test_model_failure_yields_fallback() {
    let engine = engine(seeded_store(), FakeModel::new(Reply::Fail));

    let answer = engine.process_query("any blockers?", "en").await;
    assert_eq!(answer, Language::English.fallback_response());
}

#[tokio::test]
async fn test_hindi_prompt_requests_hindi() {
    let llm = FakeModel::answering("ठीक है");
    let engine = engine(seeded_store(), llm.clone());

    engine.process_query("team update", "hi").await;
    assert!(llm.prompts()[0].contains("Respond in Hindi."));
}

#[tokio::test]
async fn test_store_failure_degrades_context() {
    let store: Arc<dyn MetricsStore> = Arc::new(BrokenStore);
    let llm = FakeModel::answering("Data is unavailable right now.");
    let engine = engine(store, llm.clone());

    let payload = engine.gather_context("team health");
    assert_eq!(payload.len(), 2);
    assert!(payload.data(SectionKey::TeamPerformance).is_none());
    assert!(payload.get(SectionKey::TeamPerformance).is_some());

    let answer = engine.process_query("team health", "en").await;
    assert_eq!(answer, "Data is unavailable right now.");

    let prompt = &llm.prompts()[0];
    assert!(prompt.contains("team_performance:\n{}"));
    assert!(prompt.contains("project_health:\n{\"status\":\"error\"}"));
}

#[test]
fn test_empty_store_aggregates_without_fault() {
    let metrics = MetricsAggregator::new(setup_test_store(), MetricsPolicy::default());

    let team = metrics.team_performance().unwrap();
    assert!(team.completion_rate.abs() < f64::EPSILON);
    assert!(team.top_contributors.is_empty());

    let health = serde_json::to_value(metrics.project_health().unwrap()).unwrap();
    assert_eq!(health, serde_json::json!({"status": "no_data"}));

    assert!(metrics.blockers().unwrap().is_empty());
    assert!(!metrics.individual_contribution("nobody").unwrap().is_found());
}
