//! HTTP API server for the insights gateway

pub mod health;
pub mod insights;
pub mod rate_limit;
pub mod voice;

use std::sync::Arc;

use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::MetricsStore;
use crate::insights::InsightsEngine;
use crate::voice::{Synthesizer, Transcriber};
use crate::Result;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub engine: InsightsEngine,
    pub store: Arc<dyn MetricsStore>,
    /// Speech-to-text; voice input endpoints answer 503 without it
    pub transcriber: Option<Arc<dyn Transcriber>>,
    /// Text-to-speech; voice output endpoints answer 503 without it
    pub synthesizer: Option<Arc<dyn Synthesizer>>,
    pub llm_model: String,
    pub rate_limiter: Option<rate_limit::SharedLimiter>,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    engine: InsightsEngine,
    store: Arc<dyn MetricsStore>,
    port: u16,
    transcriber: Option<Arc<dyn Transcriber>>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
    llm_model: String,
    rate_limit_rpm: Option<u32>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(engine: InsightsEngine, store: Arc<dyn MetricsStore>, port: u16) -> Self {
        Self {
            engine,
            store,
            port,
            transcriber: None,
            synthesizer: None,
            llm_model: crate::config::DEFAULT_LLM_MODEL.to_string(),
            rate_limit_rpm: None,
        }
    }

    /// Set the speech-to-text collaborator
    #[must_use]
    pub fn transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Set the text-to-speech collaborator
    #[must_use]
    pub fn synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Set the LLM model identifier reported by the health endpoint
    #[must_use]
    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.llm_model = model.into();
        self
    }

    /// Enable global rate limiting at the given requests per minute
    #[must_use]
    pub const fn rate_limit_rpm(mut self, rpm: Option<u32>) -> Self {
        self.rate_limit_rpm = rpm;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let rate_limiter = self.rate_limit_rpm.map(rate_limit::create_limiter);

        let state = Arc::new(ApiState {
            engine: self.engine,
            store: self.store,
            transcriber: self.transcriber,
            synthesizer: self.synthesizer,
            llm_model: self.llm_model,
            rate_limiter,
        });

        ApiServer {
            state,
            port: self.port,
            rate_limit_rpm: self.rate_limit_rpm,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    rate_limit_rpm: Option<u32>,
}

impl ApiServer {
    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let router = Router::new()
            .nest("/api/voice", voice::router(self.state.clone()))
            .nest("/api/insights", insights::router(self.state.clone()))
            .merge(health::router(self.state.clone()))
            .fallback(not_found);

        let router = router.layer(axum::middleware::from_fn_with_state(
            self.state.clone(),
            rate_limit::rate_limit_middleware,
        ));

        // CORS layer for cross-origin requests from the web frontend
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        if let Some(rpm) = self.rate_limit_rpm {
            tracing::info!(rpm, "rate limiting active");
        }

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        tracing::info!("API server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

/// JSON error envelope: `{"error": {"code", "message"}}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// Render an error envelope with the given status
pub fn error_response(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: ErrorBody {
                code,
                message: message.into(),
            },
        }),
    )
        .into_response()
}

async fn not_found(uri: Uri) -> Response {
    tracing::debug!(path = %uri.path(), "unknown endpoint");
    error_response(StatusCode::NOT_FOUND, "not_found", "Endpoint not found")
}
