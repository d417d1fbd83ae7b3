//! Spendbot CLI - chat-driven personal finance assistant
//!
//! Usage:
//!   spendbot init                     Initialize database
//!   spendbot serve --port 3000        Start the webhook server
//!   spendbot classify "KFC 10$"       Show the classifier's interpretation
//!   spendbot report --psid 123        Print a monthly report

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve { port, host } => {
            commands::cmd_serve(&cli.db, config_path, &host, port, cli.no_encrypt).await
        }
        Commands::Classify { text } => commands::cmd_classify(config_path, &text).await,
        Commands::Chat { psid, text } => {
            commands::cmd_chat(&cli.db, config_path, &psid, &text, cli.no_encrypt).await
        }
        Commands::Report { psid, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(config_path)?;
            commands::cmd_report(&db, &config, &psid, json)
        }
        Commands::User { psid, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(config_path)?;
            commands::cmd_user(&db, &config, &psid, json)
        }
        Commands::Prompts { action } => match action {
            PromptsAction::Show => commands::cmd_prompts_show(),
            PromptsAction::Path => commands::cmd_prompts_path(),
        },
    }
}
