//! CLI command implementations
//!
//! - `chat` - Run a message through the dispatcher locally
//! - `classify` - Show the classifier's interpretation of a message
//! - `core` - Init and shared utilities (open_db, load_config)
//! - `prompts` - Prompt library commands
//! - `reports` - Monthly report and user summary
//! - `serve` - Webhook server command

pub mod chat;
pub mod classify;
pub mod core;
pub mod prompts;
pub mod reports;
pub mod serve;

// Re-export command functions for main.rs
pub use chat::*;
pub use classify::*;
pub use core::*;
pub use prompts::*;
pub use reports::*;
pub use serve::*;
