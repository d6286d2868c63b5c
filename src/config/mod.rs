//! Configuration management for the insights gateway

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::insights::{GenerationSettings, KeywordPolicy, MetricsPolicy};
use crate::voice::{self, VoiceSettings};
use crate::{Error, Result};

use file::InsightsConfigFile;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5001;

/// Default OpenAI-compatible endpoint (Groq)
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default completion model
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";

/// Timeout applied to every external call unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Gateway configuration
#[derive(Debug)]
pub struct Config {
    pub server: ServerConfig,

    /// Path to the `SQLite` store
    pub store_path: PathBuf,

    pub llm: LlmConfig,

    pub voice: VoiceConfig,

    /// Context selection policy
    pub keywords: KeywordPolicy,

    /// Aggregation thresholds and caps
    pub metrics: MetricsPolicy,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Global requests-per-minute budget; unlimited when unset
    pub rate_limit_rpm: Option<u32>,
}

/// Language model configuration
#[derive(Debug)]
pub struct LlmConfig {
    /// API key (from `GROQ_API_KEY`)
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub generation: GenerationSettings,
}

/// Speech provider configuration
#[derive(Debug)]
pub struct VoiceConfig {
    /// API key (from `SARVAM_API_KEY`)
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub stt_model: String,
    pub tts: VoiceSettings,
    pub timeout: Duration,
}

impl Config {
    /// Load configuration from the config file and the process environment
    ///
    /// The file is `$INSIGHTS_CONFIG` if set, else the standard path.
    ///
    /// # Errors
    ///
    /// Returns error if the config file is invalid or a value cannot be parsed
    pub fn load() -> Result<Self> {
        let path = std::env::var("INSIGHTS_CONFIG")
            .ok()
            .map(PathBuf::from)
            .or_else(file::config_file_path);

        let file = match path {
            Some(p) => file::load_config_file(&p)?,
            None => InsightsConfigFile::default(),
        };

        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// Environment values take precedence over the file.
    ///
    /// # Errors
    ///
    /// Returns error if a numeric environment value cannot be parsed
    pub fn from_sources<F>(file: InsightsConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let server = ServerConfig {
            port: parse_env(&env, "PORT")?
                .or(file.server.port)
                .unwrap_or(DEFAULT_PORT),
            rate_limit_rpm: parse_env(&env, "INSIGHTS_RATE_LIMIT_RPM")?
                .or(file.server.rate_limit_rpm)
                .filter(|rpm| *rpm > 0),
        };

        let store_path = env("INSIGHTS_DB_PATH")
            .map(PathBuf::from)
            .or(file.store.path)
            .unwrap_or_else(default_store_path);

        let defaults = GenerationSettings::default();
        let llm = LlmConfig {
            api_key: env("GROQ_API_KEY")
                .or(file.api_keys.groq)
                .map(SecretString::from),
            base_url: env("INSIGHTS_LLM_BASE_URL")
                .or(file.llm.base_url)
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            model: env("INSIGHTS_LLM_MODEL")
                .or(file.llm.model)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            timeout: file
                .llm
                .timeout_secs
                .map_or(DEFAULT_TIMEOUT, Duration::from_secs),
            generation: GenerationSettings {
                system_prompt: file.llm.system_prompt.unwrap_or(defaults.system_prompt),
                max_tokens: file.llm.max_tokens.unwrap_or(defaults.max_tokens),
                temperature: file.llm.temperature.unwrap_or(defaults.temperature),
            },
        };

        let tts_defaults = VoiceSettings::default();
        let voice = VoiceConfig {
            api_key: env("SARVAM_API_KEY")
                .or(file.api_keys.sarvam)
                .map(SecretString::from),
            base_url: env("INSIGHTS_VOICE_BASE_URL")
                .or(file.voice.base_url)
                .unwrap_or_else(|| voice::DEFAULT_BASE_URL.to_string()),
            stt_model: file
                .voice
                .stt_model
                .unwrap_or_else(|| voice::DEFAULT_STT_MODEL.to_string()),
            tts: VoiceSettings {
                model: file.voice.tts_model.unwrap_or(tts_defaults.model),
                speaker: file.voice.speaker.unwrap_or(tts_defaults.speaker),
                pace: file.voice.pace.unwrap_or(tts_defaults.pace),
                sample_rate: file.voice.sample_rate.unwrap_or(tts_defaults.sample_rate),
            },
            timeout: file
                .voice
                .timeout_secs
                .map_or(DEFAULT_TIMEOUT, Duration::from_secs),
        };

        Ok(Self {
            server,
            store_path,
            llm,
            voice,
            keywords: file.keywords.unwrap_or_default(),
            metrics: file.metrics.unwrap_or_default(),
        })
    }

    /// Fail unless every collaborator the server needs is configured
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first missing credential
    pub fn validate_for_serving(&self) -> Result<()> {
        if self.llm.api_key.is_none() {
            return Err(Error::Config("GROQ_API_KEY not set".to_string()));
        }
        if self.voice.api_key.is_none() {
            return Err(Error::Config("SARVAM_API_KEY not set".to_string()));
        }
        Ok(())
    }
}

fn parse_env<T, F>(env: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid value for {key}: {raw}")))
        })
        .transpose()
}

/// Default database location (`~/.local/share/omni/insights/insights.db` on Linux)
fn default_store_path() -> PathBuf {
    let data_dir = directories::ProjectDirs::from("dev", "omni", "omni")
        .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("insights"));

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::warn!(
            path = %data_dir.display(),
            error = %e,
            "failed to create data directory"
        );
    }

    data_dir.join("insights.db")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(
            InsightsConfigFile::default(),
            env_from(&[("INSIGHTS_DB_PATH", "/tmp/x.db")]),
        )
        .unwrap();

        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.server.rate_limit_rpm.is_none());
        assert_eq!(config.store_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.llm.model, DEFAULT_LLM_MODEL);
        assert_eq!(config.llm.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.llm.generation.max_tokens, 200);
        assert_eq!(config.voice.stt_model, "saarika:v2.5");
        assert_eq!(config.voice.tts.speaker, "rahul");
        assert_eq!(config.keywords, KeywordPolicy::default());
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let file = file::parse_config(
            r#"
            [server]
            port = 9000
            [api_keys]
            groq = "from-file"
            sarvam = "voice-file"
            "#,
        )
        .unwrap();

        let config = Config::from_sources(
            file,
            env_from(&[
                ("PORT", "7000"),
                ("GROQ_API_KEY", "from-env"),
                ("INSIGHTS_DB_PATH", "/tmp/x.db"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.llm.api_key.unwrap().expose_secret(), "from-env");
        assert_eq!(config.voice.api_key.unwrap().expose_secret(), "voice-file");
    }

    #[test]
    fn test_invalid_port_is_error() {
        let result = Config::from_sources(
            InsightsConfigFile::default(),
            env_from(&[("PORT", "http"), ("INSIGHTS_DB_PATH", "/tmp/x.db")]),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_blank_env_ignored() {
        let config = Config::from_sources(
            InsightsConfigFile::default(),
            env_from(&[("GROQ_API_KEY", "  "), ("INSIGHTS_DB_PATH", "/tmp/x.db")]),
        )
        .unwrap();
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_missing_credentials_fail_validation() {
        let config = Config::from_sources(
            InsightsConfigFile::default(),
            env_from(&[("GROQ_API_KEY", "k"), ("INSIGHTS_DB_PATH", "/tmp/x.db")]),
        )
        .unwrap();

        let err = config.validate_for_serving().unwrap_err();
        assert!(err.to_string().contains("SARVAM_API_KEY"));
    }

    #[test]
    fn test_zero_rate_limit_disables() {
        let config = Config::from_sources(
            InsightsConfigFile::default(),
            env_from(&[("INSIGHTS_RATE_LIMIT_RPM", "0"), ("INSIGHTS_DB_PATH", "/tmp/x.db")]),
        )
        .unwrap();
        assert!(config.server.rate_limit_rpm.is_none());
    }
}
