//! Outbound replies to chat users
//!
//! Delivery is fire-and-forget: implementations log failures and never
//! surface them to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::MessengerConfig;
use crate::error::{Error, Result};

/// Environment variable holding the page access token
pub const PAGE_ACCESS_TOKEN_ENV: &str = "MESSENGER_PAGE_ACCESS_TOKEN";

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a text message to a recipient
    async fn send_text(&self, recipient: &str, text: &str);

    /// Send a PNG image to a recipient
    async fn send_image(&self, recipient: &str, png: Vec<u8>);
}

/// Messenger Send API client
#[derive(Clone)]
pub struct MessengerNotifier {
    http_client: Client,
    messages_url: String,
    access_token: String,
    timeout: Duration,
}

impl MessengerNotifier {
    pub fn new(config: &MessengerConfig, access_token: &str) -> Self {
        Self {
            http_client: Client::new(),
            messages_url: config.messages_url(),
            access_token: access_token.to_string(),
            timeout: config.timeout,
        }
    }

    /// Create from `MESSENGER_PAGE_ACCESS_TOKEN`
    pub fn from_env(config: &MessengerConfig) -> Option<Self> {
        let token = std::env::var(PAGE_ACCESS_TOKEN_ENV).ok()?;
        if token.is_empty() {
            return None;
        }
        Some(Self::new(config, &token))
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }

    async fn post_text(&self, recipient: &str, text: &str) -> Result<()> {
        let body = json!({
            "recipient": { "id": recipient },
            "message": { "text": text },
        });

        let response = self
            .http_client
            .post(&self.messages_url)
            .query(&[("access_token", &self.access_token)])
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        check_status(response).await
    }

    async fn post_image(&self, recipient: &str, png: Vec<u8>) -> Result<()> {
        let recipient = json!({ "id": recipient }).to_string();
        let message = json!({
            "attachment": { "type": "image", "payload": {} }
        })
        .to_string();
        let file = Part::bytes(png)
            .file_name("chart.png")
            .mime_str("image/png")?;

        let form = Form::new()
            .text("recipient", recipient)
            .text("message", message)
            .part("filedata", file);

        let response = self
            .http_client
            .post(&self.messages_url)
            .query(&[("access_token", &self.access_token)])
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await?;

        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<()> {
    if response.status().is_success() {
        return Ok(());
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::InvalidData(format!("Send API error {}: {}", status, body)))
}

#[async_trait]
impl Notifier for MessengerNotifier {
    async fn send_text(&self, recipient: &str, text: &str) {
        match self.post_text(recipient, text).await {
            Ok(()) => debug!(recipient, "Sent text reply"),
            Err(e) => warn!(recipient, error = %e, "Failed to send text reply"),
        }
    }

    async fn send_image(&self, recipient: &str, png: Vec<u8>) {
        let size = png.len();
        match self.post_image(recipient, png).await {
            Ok(()) => debug!(recipient, size, "Sent image reply"),
            Err(e) => warn!(recipient, error = %e, "Failed to send image reply"),
        }
    }
}
