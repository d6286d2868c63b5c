//! TOML configuration file loading
//!
//! Supports `~/.config/omni/insights/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults,
//! and environment variables override it.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;
use crate::insights::{KeywordPolicy, MetricsPolicy};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct InsightsConfigFile {
    #[serde(default)]
    pub server: ServerFileConfig,

    #[serde(default)]
    pub store: StoreFileConfig,

    #[serde(default)]
    pub llm: LlmFileConfig,

    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Keyword policy; replaces the built-in one when present
    #[serde(default)]
    pub keywords: Option<KeywordPolicy>,

    /// Aggregation thresholds and caps
    #[serde(default)]
    pub metrics: Option<MetricsPolicy>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub port: Option<u16>,

    /// Global request budget per minute
    pub rate_limit_rpm: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreFileConfig {
    /// Path to the `SQLite` database
    pub path: Option<PathBuf>,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// OpenAI-compatible API base URL
    pub base_url: Option<String>,

    /// Model identifier (e.g. "llama-3.3-70b-versatile")
    pub model: Option<String>,

    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,

    /// Replaces the built-in system prompt
    pub system_prompt: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    pub base_url: Option<String>,

    /// STT model (e.g. "saarika:v2.5")
    pub stt_model: Option<String>,

    /// TTS model (e.g. "bulbul:v3")
    pub tts_model: Option<String>,

    /// Default TTS speaker (e.g. "rahul")
    pub speaker: Option<String>,

    /// TTS speed multiplier
    pub pace: Option<f32>,

    pub sample_rate: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub groq: Option<String>,
    pub sarvam: Option<String>,
}

/// Parse a config file's contents
///
/// # Errors
///
/// Returns error if the contents are not valid config TOML
pub fn parse_config(content: &str) -> Result<InsightsConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Load the config file at `path`
///
/// Returns defaults if the file doesn't exist.
///
/// # Errors
///
/// Returns error if the file exists but cannot be read or parsed
pub fn load_config_file(path: &Path) -> Result<InsightsConfigFile> {
    if !path.exists() {
        return Ok(InsightsConfigFile::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Return the config file path: `~/.config/omni/insights/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| {
        d.config_dir()
            .join("omni")
            .join("insights")
            .join("config.toml")
    })
}
