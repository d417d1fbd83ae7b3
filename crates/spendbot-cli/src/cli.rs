//! CLI argument definitions using clap
//!
//! The command implementations live in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Spendbot - log spending by chatting
#[derive(Parser)]
#[command(name = "spendbot")]
#[command(about = "Chat-driven personal finance assistant", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "spendbot.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set SPENDBOT_DB_KEY environment variable with your passphrase.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Config file (defaults to ~/.local/share/spendbot/config/spendbot.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the Messenger webhook server
    ///
    /// Requires MESSENGER_PAGE_ACCESS_TOKEN and MESSENGER_VERIFY_TOKEN,
    /// plus a classifier backend (CLASSIFIER_BACKEND, OPENAI_COMPATIBLE_HOST, ...).
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Show how the classifier interprets a message
    Classify {
        /// Message text, e.g. "KFC 10$"
        text: String,
    },

    /// Send a message through the dispatcher locally, printing replies
    Chat {
        /// Sender id to act as
        #[arg(long, default_value = "local")]
        psid: String,

        /// Message text
        text: String,
    },

    /// Print a user's report for the current month
    Report {
        /// Sender id
        #[arg(long)]
        psid: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a user's limit, week-to-date spend and subscriptions
    User {
        /// Sender id
        #[arg(long)]
        psid: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the classifier prompt
    Prompts {
        #[command(subcommand)]
        action: PromptsAction,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// Show the prompt in effect
    Show,
    /// Print the override directory
    Path,
}
