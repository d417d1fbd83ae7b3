//! Messenger webhook handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};

use crate::{AppError, AppState};

/// Query parameters of the subscription handshake
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// A webhook delivery: `{object, entry: [{messaging: [...]}]}`
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

#[derive(Debug, Deserialize)]
pub struct MessagingEvent {
    pub sender: Sender,
    #[serde(default)]
    pub message: Option<InboundMessage>,
}

#[derive(Debug, Deserialize)]
pub struct Sender {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub text: Option<String>,
}

impl WebhookPayload {
    /// `(sender, text)` for every text message of a page delivery, in order
    pub fn text_messages(&self) -> Vec<(&str, &str)> {
        if self.object != "page" {
            return Vec::new();
        }
        self.entry
            .iter()
            .flat_map(|entry| entry.messaging.iter())
            .filter_map(|event| {
                let text = event.message.as_ref()?.text.as_deref()?;
                Some((event.sender.id.as_str(), text))
            })
            .collect()
    }
}

/// Constant-time token comparison
fn tokens_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    provided.len() == expected.len() && bool::from(provided.ct_eq(expected))
}

/// GET /webhook - Subscription handshake
pub async fn verify_webhook(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyQuery>,
) -> Result<Response, AppError> {
    let (Some(mode), Some(token)) = (params.mode.as_deref(), params.verify_token.as_deref())
    else {
        return Ok(Json(serde_json::json!({ "status": "ok" })).into_response());
    };

    let Some(expected) = state.config.verify_token.as_deref() else {
        warn!("Webhook verification attempted but no verify token is configured");
        return Err(AppError::forbidden("Verification failed"));
    };

    if mode == "subscribe" && tokens_match(token, expected) {
        info!("Webhook verified");
        let challenge = params.challenge.unwrap_or_default();
        return Ok((StatusCode::OK, challenge).into_response());
    }

    warn!(mode, "Webhook verification rejected");
    Err(AppError::forbidden("Verification failed"))
}

/// POST /webhook - Message delivery
///
/// Always acknowledged so the platform does not retry; failures are logged.
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Json<serde_json::Value> {
    let received = Json(serde_json::json!({ "status": "received" }));

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed webhook body");
            return received;
        }
    };

    if payload.object != "page" {
        debug!(object = %payload.object, "Ignoring non-page delivery");
        return received;
    }

    for (psid, text) in payload.text_messages() {
        if let Err(e) = state.dispatcher.handle_message(psid, text).await {
            error!(psid, error = %e, "Failed to handle message");
        }
    }

    received
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_messages_skips_events_without_text() {
        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "object": "page",
            "entry": [
                { "messaging": [
                    { "sender": { "id": "a" }, "message": { "text": "KFC 10" } },
                    { "sender": { "id": "b" }, "delivery": { "mids": [] } },
                ]},
                { "messaging": [
                    { "sender": { "id": "c" }, "message": { "attachments": [] } },
                    { "sender": { "id": "d" }, "message": { "text": "help" } },
                ]},
            ]
        }))
        .unwrap();

        assert_eq!(payload.text_messages(), vec![("a", "KFC 10"), ("d", "help")]);
    }

    #[test]
    fn test_text_messages_requires_page_object() {
        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "object": "instagram",
            "entry": [{ "messaging": [{ "sender": { "id": "a" }, "message": { "text": "hi" } }] }]
        }))
        .unwrap();

        assert!(payload.text_messages().is_empty());
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("secret", "secret"));
        assert!(!tokens_match("secreT", "secret"));
        assert!(!tokens_match("secret-longer", "secret"));
        assert!(!tokens_match("", "secret"));
    }
}
