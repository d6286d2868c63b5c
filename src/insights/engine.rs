//! Query processing: select context, gather it, ask the language model

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::context::{self, ContextPayload};
use super::metrics::MetricsAggregator;
use super::selector::{KeywordPolicy, Selection};
use crate::llm::LanguageModel;

/// Default system prompt describing the assistant's role
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI Business Insights Assistant for a VP of Engineering.

You have access to comprehensive data from:
1. Jira tickets (tasks, status, assignees, deadlines)
2. GitHub commits (contributors, lines of code, files changed)
3. Team members: Aryan (AWS Solutions Architect), Ritwik (AWS Backend Developer), Mohak (AWS DevOps Engineer), Manu (AWS Cloud Engineer)
4. Project timelines and sprints

Your role:
- Provide clear, concise business insights
- Speak in a professional tone
- Highlight important metrics and trends
- Offer actionable recommendations
- Keep responses short enough to speak aloud (around 100-150 words)

Response Format:
1. Acknowledge the question briefly
2. Provide 2-3 key data points
3. Offer one insight or recommendation
4. End with a positive encouraging note

Always be helpful, accurate, and encouraging!";

/// Language of user-facing text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Hindi,
}

impl Language {
    /// Parse a language code such as `en`, `hi` or `hi-IN`
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        if code.trim().to_lowercase().starts_with("hi") {
            Self::Hindi
        } else {
            Self::English
        }
    }

    /// Apology used when a query cannot be answered
    #[must_use]
    pub const fn fallback_response(self) -> &'static str {
        match self {
            Self::Hindi => {
                "माफ़ कीजिये, मुझे आपकी query process करने में problem हो रही है। कृपया दोबारा try करें।"
            }
            Self::English => "I'm sorry, I'm having trouble processing your query. Please try again.",
        }
    }

    /// Apology used when the language model's quota is exhausted
    #[must_use]
    pub const fn quota_response(self) -> &'static str {
        match self {
            Self::Hindi => {
                "माफ़ करें, AI सर्विस की दैनिक सीमा पूरी हो गई है। कृपया कुछ समय बाद फिर से प्रयास करें या अपने प्रोजेक्ट मैनेजर से संपर्क करें।"
            }
            Self::English => {
                "I apologize, but I've reached my daily AI quota limit. The system is working - please try again in a few hours, or contact your project manager for immediate assistance."
            }
        }
    }

    /// Greeting describing what the assistant can answer
    #[must_use]
    pub const fn introduction(self) -> &'static str {
        match self {
            Self::Hindi => {
                "नमस्ते! मैं आपकी AI बिज़नेस इनसाइट्स असिस्टेंट हूं। मैं आपकी टीम के Jira टिकट्स, GitHub commits, और प्रोजेक्ट स्टेटस के बारे में जानकारी दे सकती हूं। आप मुझसे कुछ भी पूछ सकते हैं जैसे कि टीम का परफॉर्मेंस, किसी का स्टेटस, या प्रोजेक्ट की हेल्थ।"
            }
            Self::English => {
                "Hello! I'm your AI Business Insights Assistant. I can provide information about your team's Jira tickets, GitHub commits, and project status. You can ask me about team performance, individual status, project health, or any blockers. How can I help you today?"
            }
        }
    }
}

/// Completion parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: 200,
            temperature: 0.7,
        }
    }
}

/// Answers business questions grounded in stored metrics
#[derive(Clone)]
pub struct InsightsEngine {
    policy: KeywordPolicy,
    metrics: MetricsAggregator,
    llm: Arc<dyn LanguageModel>,
    settings: GenerationSettings,
}

impl InsightsEngine {
    #[must_use]
    pub fn new(
        policy: KeywordPolicy,
        metrics: MetricsAggregator,
        llm: Arc<dyn LanguageModel>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            policy,
            metrics,
            llm,
            settings,
        }
    }

    /// Categories a query selects
    #[must_use]
    pub fn select(&self, query: &str) -> Selection {
        self.policy.select(query)
    }

    /// Gather the grounding context for a query
    #[must_use]
    pub fn gather_context(&self, query: &str) -> ContextPayload {
        let selection = self.select(query);
        tracing::debug!(
            categories = ?selection.categories,
            individual = ?selection.individual,
            "selected context"
        );
        context::gather(&selection, &self.metrics)
    }

    /// Answer a query in the given language
    ///
    /// Never fails: a failed completion yields an apology, with a distinct
    /// message when the provider's quota is exhausted
    pub async fn process_query(&self, query: &str, language: &str) -> String {
        let lang = Language::from_code(language);
        let payload = self.gather_context(query);

        let mut prompt = payload.render_prompt(query);
        if lang == Language::Hindi {
            prompt.push_str("\nRespond in Hindi.\n");
        }

        match self
            .llm
            .generate(
                &self.settings.system_prompt,
                &prompt,
                self.settings.max_tokens,
                self.settings.temperature,
            )
            .await
        {
            Ok(text) => text,
            Err(e) if e.is_quota_exhausted() => {
                tracing::warn!(error = %e, "language model quota exhausted");
                lang.quota_response().to_string()
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to generate response");
                lang.fallback_response().to_string()
            }
        }
    }
}
