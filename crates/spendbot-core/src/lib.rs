//! Spendbot Core Library
//!
//! Shared functionality for the spendbot chat finance assistant:
//! - Database access and migrations (users, transactions, subscriptions)
//! - Pluggable intent classifier backends (OpenAI-compatible, Ollama, mock)
//! - Prompt library for the classifier prompt
//! - Messenger notifier and QuickChart renderer
//! - Weekly budget evaluation and monthly reports
//! - Command dispatcher tying it together

pub mod ai;
pub mod budget;
pub mod chart;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod models;
pub mod notify;
pub mod period;
pub mod prompts;
pub mod report;

/// Test utilities including collaborator doubles and mock HTTP servers
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    ClassifiedIntent, ClassifierClient, Intent, IntentClassifier, MockBackend, OllamaBackend,
    OpenAICompatibleBackend,
};
pub use budget::BudgetAlert;
pub use chart::{ChartRenderer, QuickChartRenderer};
pub use config::BotConfig;
pub use db::Database;
pub use dispatcher::{Command, DispatchOutcome, Dispatcher};
pub use error::{Error, Result};
pub use models::{Category, Subscription, Transaction, User, UserStats};
pub use notify::{MessengerNotifier, Notifier};
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use report::{CategoryTotals, MonthlyReport};
