//! Insights Gateway - Voice business insights for engineering leadership
//!
//! This library provides the core functionality for the insights gateway:
//! - Keyword-based context selection over team data
//! - Metrics aggregation (team performance, project health, blockers)
//! - Grounded answers from an OpenAI-compatible language model
//! - Speech in and out via Sarvam STT/TTS
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Interfaces                        │
//! │        HTTP API  │  Voice chat  │  CLI              │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Insights Engine                      │
//! │   Selector  │  Metrics  │  Context  │  Prompt       │
//! └──────────┬─────────────────────────────┬────────────┘
//!            │                             │
//! ┌──────────▼──────────┐   ┌──────────────▼────────────┐
//! │   Metrics store     │   │  LLM  │  STT  │  TTS      │
//! │   (SQLite)          │   │  (external providers)     │
//! └─────────────────────┘   └───────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod insights;
pub mod llm;
pub mod model;
pub mod voice;

pub use config::Config;
pub use db::{DbConn, DbPool, MetricsStore, SqliteStore};
pub use error::{Error, Result};
pub use insights::{InsightsEngine, KeywordPolicy, MetricsAggregator, MetricsPolicy};
pub use llm::{ChatCompletionClient, LanguageModel};
pub use model::{ContributionRecord, Priority, Snapshot, Task, TaskStatus, TicketRecord};
pub use voice::{SpeechToText, Synthesizer, TextToSpeech, Transcriber};
