//! Text-to-speech (TTS) processing

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::{ExposeSecret, SecretString};

use super::{SUBSCRIPTION_HEADER, Synthesizer};
use crate::{Error, Result};

/// Voice parameters for synthesis
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub model: String,
    pub speaker: String,
    /// Speech speed (0.5 to 2.0)
    pub pace: f32,
    pub sample_rate: u32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            model: "bulbul:v3".to_string(),
            speaker: "rahul".to_string(),
            pace: 1.3,
            sample_rate: 8000,
        }
    }
}

/// Synthesizes speech from text using Sarvam Bulbul
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    settings: VoiceSettings,
}

impl TextToSpeech {
    /// Create a new TTS instance
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        settings: VoiceSettings,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("Sarvam API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            settings,
        })
    }
}

#[async_trait]
impl Synthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str, language: &str, speaker: Option<&str>) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            inputs: [&'a str; 1],
            target_language_code: &'a str,
            speaker: &'a str,
            pace: f32,
            speech_sample_rate: u32,
            enable_preprocessing: bool,
            model: &'a str,
        }

        #[derive(serde::Deserialize)]
        struct TtsResponse {
            #[serde(default)]
            audios: Vec<String>,
        }

        let request = TtsRequest {
            inputs: [text],
            target_language_code: language,
            speaker: speaker.unwrap_or(&self.settings.speaker),
            pace: self.settings.pace,
            speech_sample_rate: self.settings.sample_rate,
            enable_preprocessing: true,
            model: &self.settings.model,
        };

        let response = self
            .client
            .post(format!("{}/text-to-speech", self.base_url))
            .header(SUBSCRIPTION_HEADER, self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("TTS API error {status}: {body}")));
        }

        let result: TtsResponse = response.json().await?;
        let encoded = result
            .audios
            .first()
            .ok_or_else(|| Error::Tts("no audio in response".to_string()))?;

        let audio = BASE64
            .decode(encoded)
            .map_err(|e| Error::Tts(format!("invalid audio encoding: {e}")))?;

        tracing::debug!(audio_bytes = audio.len(), language, "synthesis complete");
        Ok(audio)
    }
}
