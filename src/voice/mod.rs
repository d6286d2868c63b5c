//! Speech collaborators
//!
//! STT and TTS are delegated to the Sarvam API; the traits let the HTTP
//! layer and tests swap in other implementations.

mod stt;
mod tts;

use async_trait::async_trait;

use crate::Result;

pub use stt::SpeechToText;
pub use tts::{TextToSpeech, VoiceSettings};

/// Header carrying the Sarvam subscription key
pub(crate) const SUBSCRIPTION_HEADER: &str = "api-subscription-key";

/// Default Sarvam API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.sarvam.ai";

/// Default Sarvam transcription model
pub const DEFAULT_STT_MODEL: &str = "saarika:v2.5";

/// Converts speech to text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe WAV audio spoken in `language` (e.g. `en-IN`)
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails or yields no text
    async fn transcribe(&self, audio: &[u8], language: &str) -> Result<String>;
}

/// Converts text to speech
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` as WAV audio in `language`, optionally with a
    /// specific speaker voice
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails or yields no audio
    async fn synthesize(&self, text: &str, language: &str, speaker: Option<&str>) -> Result<Vec<u8>>;
}
