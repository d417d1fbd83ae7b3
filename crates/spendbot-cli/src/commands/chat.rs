//! Local chat command: run one message through the dispatcher
//!
//! Replies go to stdout instead of the Send API.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use spendbot_core::{Dispatcher, Notifier, QuickChartRenderer};

use super::{classifier_from_env, load_config, open_db};

/// Prints replies instead of delivering them
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send_text(&self, _recipient: &str, text: &str) {
        println!("💬 {}", text.replace('\n', "\n   "));
    }

    async fn send_image(&self, _recipient: &str, png: Vec<u8>) {
        println!("🖼  chart ({} bytes)", png.len());
    }
}

pub async fn cmd_chat(
    db_path: &Path,
    config_path: Option<&Path>,
    psid: &str,
    text: &str,
    no_encrypt: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let classifier = classifier_from_env(&config)?;
    let db = open_db(db_path, no_encrypt)?;

    let dispatcher = Dispatcher::new(
        db,
        Arc::new(classifier),
        Arc::new(ConsoleNotifier),
        Arc::new(QuickChartRenderer::from_env(&config.chart)),
        config.budget,
    );

    let outcome = dispatcher
        .handle_message(psid, text)
        .await
        .context("Failed to handle message")?;
    tracing::debug!(outcome = outcome.label(), "Dispatched");

    Ok(())
}
