//! Error types for the insights gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the insights gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Language model error
    #[error("llm error: {0}")]
    Llm(String),

    /// Provider signalled rate limiting or quota exhaustion
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Whether this error means the provider's usage quota is exhausted
    ///
    /// Besides the dedicated variant, any error mentioning a 429 status or
    /// the word "quota" counts, since providers phrase this inconsistently
    #[must_use]
    pub fn is_quota_exhausted(&self) -> bool {
        if matches!(self, Self::RateLimited(_)) {
            return true;
        }
        if let Self::Http(e) = self
            && e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS)
        {
            return true;
        }
        let message = self.to_string();
        message.contains("429") || message.to_lowercase().contains("quota")
    }
}
