//! Voice API endpoints: introduction, speech-to-text, text-to-speech and the
//! full voice chat round trip

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use super::{ApiState, error_response};
use crate::insights::Language;
use crate::voice::{Synthesizer, Transcriber};

/// Language assumed when a voice request doesn't name one
pub const DEFAULT_VOICE_LANGUAGE: &str = "en-IN";

/// Upper bound for uploaded audio
const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Build voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/introduction", get(introduction))
        .route("/transcribe", post(transcribe))
        .route("/synthesize", post(synthesize))
        .route("/chat", post(chat))
        .layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct IntroductionParams {
    pub language: Option<String>,
}

/// Spoken introduction of the assistant
async fn introduction(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<IntroductionParams>,
) -> Result<Response, VoiceError> {
    let synthesizer = synthesizer(&state)?;
    let language = params
        .language
        .unwrap_or_else(|| DEFAULT_VOICE_LANGUAGE.to_string());
    let text = Language::from_code(&language).introduction();

    let audio = synthesizer
        .synthesize(text, &language, None)
        .await
        .map_err(|e| VoiceError::SynthesisFailed(e.to_string()))?;

    Ok(wav_response(audio))
}

/// Transcription response
#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub transcript: String,
    pub language: String,
}

/// Transcribe uploaded WAV audio to text
async fn transcribe(
    State(state): State<Arc<ApiState>>,
    multipart: Multipart,
) -> Result<Json<TranscribeResponse>, VoiceError> {
    let transcriber = transcriber(&state)?;
    let upload = AudioUpload::read(multipart).await?;

    let transcript = transcriber
        .transcribe(&upload.audio, &upload.language)
        .await
        .map_err(|e| VoiceError::TranscriptionFailed(e.to_string()))?;

    Ok(Json(TranscribeResponse {
        transcript,
        language: upload.language,
    }))
}

/// Synthesis request
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    #[serde(default)]
    pub text: String,
    pub language: Option<String>,
    pub speaker: Option<String>,
}

/// Synthesize text to WAV speech
async fn synthesize(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<SynthesizeRequest>, JsonRejection>,
) -> Result<Response, VoiceError> {
    let synthesizer = synthesizer(&state)?;
    let Json(request) = payload.map_err(|e| VoiceError::InvalidUpload(e.body_text()))?;

    if request.text.trim().is_empty() {
        return Err(VoiceError::BadRequest("No text provided"));
    }

    let language = request.language.as_deref().unwrap_or(DEFAULT_VOICE_LANGUAGE);
    let audio = synthesizer
        .synthesize(&request.text, language, request.speaker.as_deref())
        .await
        .map_err(|e| VoiceError::SynthesisFailed(e.to_string()))?;

    Ok(wav_response(audio))
}

/// Voice chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub transcript: String,
    pub response_text: String,
    /// Base64-encoded WAV
    pub response_audio: String,
    pub language: String,
}

/// Full round trip: transcribe, answer, speak
async fn chat(
    State(state): State<Arc<ApiState>>,
    multipart: Multipart,
) -> Result<Json<ChatResponse>, VoiceError> {
    let transcriber = transcriber(&state)?;
    let synthesizer = synthesizer(&state)?;
    let upload = AudioUpload::read(multipart).await?;

    let transcript = transcriber
        .transcribe(&upload.audio, &upload.language)
        .await
        .map_err(|e| VoiceError::TranscriptionFailed(e.to_string()))?;

    // "en-IN" -> "en"
    let lang_code = upload.language.split('-').next().unwrap_or_default();
    let response_text = state.engine.process_query(&transcript, lang_code).await;

    let audio = synthesizer
        .synthesize(&response_text, &upload.language, None)
        .await
        .map_err(|e| VoiceError::SynthesisFailed(e.to_string()))?;

    tracing::info!(
        transcript_len = transcript.len(),
        audio_bytes = audio.len(),
        language = %upload.language,
        "voice chat complete"
    );

    Ok(Json(ChatResponse {
        transcript,
        response_text,
        response_audio: BASE64.encode(audio),
        language: upload.language,
    }))
}

/// Audio and language fields of a multipart upload
struct AudioUpload {
    audio: Vec<u8>,
    language: String,
}

impl AudioUpload {
    async fn read(mut multipart: Multipart) -> Result<Self, VoiceError> {
        let mut audio = None;
        let mut language = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| VoiceError::InvalidUpload(e.to_string()))?
        {
            let name = field.name().map(ToString::to_string);
            match name.as_deref() {
                Some("audio") => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| VoiceError::InvalidUpload(e.to_string()))?;
                    audio = Some(bytes.to_vec());
                }
                Some("language") => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| VoiceError::InvalidUpload(e.to_string()))?;
                    if !text.trim().is_empty() {
                        language = Some(text.trim().to_string());
                    }
                }
                _ => {}
            }
        }

        let audio = audio.ok_or(VoiceError::BadRequest("No audio file provided"))?;
        if audio.is_empty() {
            return Err(VoiceError::BadRequest("Empty audio data"));
        }

        Ok(Self {
            audio,
            language: language.unwrap_or_else(|| DEFAULT_VOICE_LANGUAGE.to_string()),
        })
    }
}

fn transcriber(state: &ApiState) -> Result<&Arc<dyn Transcriber>, VoiceError> {
    state
        .transcriber
        .as_ref()
        .ok_or(VoiceError::NotConfigured("STT not configured"))
}

pub(super) fn synthesizer(state: &ApiState) -> Result<&Arc<dyn Synthesizer>, VoiceError> {
    state
        .synthesizer
        .as_ref()
        .ok_or(VoiceError::NotConfigured("TTS not configured"))
}

fn wav_response(audio: Vec<u8>) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "audio/wav")], audio).into_response()
}

/// Voice API errors
#[derive(Debug)]
pub enum VoiceError {
    NotConfigured(&'static str),
    BadRequest(&'static str),
    /// Malformed request body
    InvalidUpload(String),
    TranscriptionFailed(String),
    SynthesisFailed(String),
}

impl IntoResponse for VoiceError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::NotConfigured(msg) => (StatusCode::SERVICE_UNAVAILABLE, "not_configured", msg.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.to_string()),
            Self::InvalidUpload(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::TranscriptionFailed(msg) => {
                tracing::error!(error = %msg, "transcription failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "transcription_failed", msg)
            }
            Self::SynthesisFailed(msg) => {
                tracing::error!(error = %msg, "synthesis failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "synthesis_failed", msg)
            }
        };

        error_response(status, code, message)
    }
}
