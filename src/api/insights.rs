//! Text query endpoint

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use super::ApiState;
use super::voice::VoiceError;

/// Build insights router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/query", post(query))
        .with_state(state)
}

/// Query request
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: String,

    /// Short language code ("en", "hi")
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub return_audio: bool,
}

fn default_language() -> String {
    "en".to_string()
}

/// Query response
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub response: String,
    pub language: String,

    /// Base64-encoded WAV, present when requested and synthesis succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

/// Answer a text query, optionally with spoken audio
async fn query(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, VoiceError> {
    let Json(request) = payload.map_err(|e| VoiceError::InvalidUpload(e.body_text()))?;

    if request.query.trim().is_empty() {
        return Err(VoiceError::BadRequest("No query provided"));
    }

    let response = state
        .engine
        .process_query(&request.query, &request.language)
        .await;

    let audio = if request.return_audio {
        speak(&state, &response, &request.language).await
    } else {
        None
    };

    Ok(Json(QueryResponse {
        query: request.query,
        response,
        language: request.language,
        audio,
    }))
}

/// Best-effort synthesis; the text answer stands on its own if this fails
async fn speak(state: &ApiState, text: &str, language: &str) -> Option<String> {
    let Ok(synthesizer) = super::voice::synthesizer(state) else {
        tracing::warn!("audio requested but TTS is not configured");
        return None;
    };

    match synthesizer
        .synthesize(text, &format!("{language}-IN"), None)
        .await
    {
        Ok(audio) => Some(BASE64.encode(audio)),
        Err(e) => {
            tracing::warn!(error = %e, "failed to synthesize query response");
            None
        }
    }
}
