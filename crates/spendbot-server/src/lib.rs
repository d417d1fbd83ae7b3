//! Spendbot Web Server
//!
//! Axum-based webhook receiver for the spendbot chat finance assistant.
//!
//! - `GET /webhook` answers the Messenger subscription handshake
//! - `POST /webhook` feeds every inbound text message to the dispatcher
//! - `GET /health` reports liveness and the configured classifier

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use spendbot_core::Dispatcher;

mod handlers;

/// Environment variable holding the webhook verify token
pub const VERIFY_TOKEN_ENV: &str = "MESSENGER_VERIFY_TOKEN";

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Shared secret expected in `hub.verify_token`; handshakes fail without one
    pub verify_token: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let verify_token = std::env::var(VERIFY_TOKEN_ENV)
            .ok()
            .filter(|token| !token.is_empty());
        Self { verify_token }
    }
}

/// Shared application state
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub config: ServerConfig,
}

/// Create the application router
pub fn create_router(dispatcher: Dispatcher, config: ServerConfig) -> Router {
    let state = Arc::new(AppState { dispatcher, config });

    Router::new()
        .route(
            "/webhook",
            get(handlers::verify_webhook).post(handlers::receive_webhook),
        )
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server
pub async fn serve(
    dispatcher: Dispatcher,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if config.verify_token.is_none() {
        warn!(
            "⚠️  {} not set - webhook verification will be rejected",
            VERIFY_TOKEN_ENV
        );
    }

    check_classifier_connection(&dispatcher).await;

    let app = create_router(dispatcher, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting webhook server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log classifier backend connection status
async fn check_classifier_connection(dispatcher: &Dispatcher) {
    let classifier = dispatcher.classifier();
    if classifier.health_check().await {
        info!(
            "✅ Classifier connected: {} (model: {})",
            classifier.host(),
            classifier.model()
        );
    } else {
        warn!(
            "⚠️  Classifier configured but not responding: {} (model: {})",
            classifier.host(),
            classifier.model()
        );
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn forbidden(msg: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Clients only see a generic message
            message: "An internal error occurred".to_string(),
            internal: Some(err.into()),
        }
    }
}

#[cfg(test)]
mod tests;
