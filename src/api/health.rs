//! Health check endpoint

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub services: ServiceChecks,
}

/// Per-collaborator checks
#[derive(Serialize)]
pub struct ServiceChecks {
    pub store: CheckResult,
    pub llm: CheckResult,
    pub voice: CheckResult,
}

/// Result of a single health check
#[derive(Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    const fn ok() -> Self {
        Self {
            status: "ok",
            message: None,
        }
    }

    fn ok_with(message: impl Into<String>) -> Self {
        Self {
            status: "ok",
            message: Some(message.into()),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "fail",
            message: Some(message.into()),
        }
    }

    fn unavailable() -> Self {
        Self {
            status: "unavailable",
            message: Some("not configured".to_string()),
        }
    }
}

/// Report gateway health; the store is pinged, other services are reported
/// by configuration only
async fn health(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<HealthResponse>) {
    let store = match state.store.ping() {
        Ok(()) => CheckResult::ok(),
        Err(e) => {
            tracing::warn!(error = %e, "store health check failed");
            CheckResult::fail(e.to_string())
        }
    };

    let voice = match (&state.transcriber, &state.synthesizer) {
        (Some(_), Some(_)) => CheckResult::ok(),
        (None, None) => CheckResult::unavailable(),
        _ => CheckResult::fail("partially configured"),
    };

    let healthy = store.status == "ok";
    let (status, http_status) = if healthy {
        ("healthy", StatusCode::OK)
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        http_status,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            services: ServiceChecks {
                store,
                llm: CheckResult::ok_with(state.llm_model.clone()),
                voice,
            },
        }),
    )
}

/// Build health router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .with_state(state)
}
