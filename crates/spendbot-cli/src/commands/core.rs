//! Core command implementations and shared utilities
//!
//! - `open_db` - Open the database
//! - `load_config` - Load the bot configuration
//! - `classifier_from_env` - Build the configured classifier
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use spendbot_core::{db::Database, BotConfig, ClassifierClient};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Load `--config` if given, else the user config or embedded defaults
pub fn load_config(path: Option<&Path>) -> Result<BotConfig> {
    match path {
        Some(path) => BotConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => BotConfig::load().context("Failed to load config"),
    }
}

/// Classifier selected by CLASSIFIER_BACKEND, with the configured timeout
pub fn classifier_from_env(config: &BotConfig) -> Result<ClassifierClient> {
    let client = ClassifierClient::from_env().context(
        "No classifier configured. Set OPENAI_COMPATIBLE_HOST, or CLASSIFIER_BACKEND=ollama \
         with OLLAMA_HOST, or CLASSIFIER_BACKEND=mock",
    )?;
    Ok(client.with_timeout(config.classifier_timeout))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    let users = db.count_users().context("Failed to read users")?;
    println!("   Users: {}", users);

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Try the classifier: spendbot classify \"KFC 10$\"");
    println!("  2. Start the webhook: spendbot serve");

    Ok(())
}
