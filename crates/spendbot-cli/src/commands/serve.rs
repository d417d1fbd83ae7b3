//! Server command implementation

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use spendbot_core::notify::PAGE_ACCESS_TOKEN_ENV;
use spendbot_core::{Dispatcher, IntentClassifier, MessengerNotifier, QuickChartRenderer};
use spendbot_server::ServerConfig;

use super::{classifier_from_env, load_config, open_db};

pub async fn cmd_serve(
    db_path: &Path,
    config_path: Option<&Path>,
    host: &str,
    port: u16,
    no_encrypt: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let classifier = classifier_from_env(&config)?;
    let notifier = MessengerNotifier::from_env(&config.messenger)
        .with_context(|| format!("{} is not set", PAGE_ACCESS_TOKEN_ENV))?;
    let charts = QuickChartRenderer::from_env(&config.chart);
    let server_config = ServerConfig::from_env();

    println!("🚀 Starting spendbot webhook server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}/webhook", host, port);
    println!(
        "   Classifier: {} ({})",
        classifier.backend_name(),
        classifier.host()
    );
    println!("   Send API: {}", notifier.messages_url());
    println!("   Charts: {}", charts.url());
    if server_config.verify_token.is_none() {
        println!(
            "   ⚠️  {} not set - webhook verification will fail",
            spendbot_server::VERIFY_TOKEN_ENV
        );
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;
    let dispatcher = Dispatcher::new(
        db,
        Arc::new(classifier),
        Arc::new(notifier),
        Arc::new(charts),
        config.budget,
    );

    spendbot_server::serve(dispatcher, host, port, server_config).await?;

    Ok(())
}
