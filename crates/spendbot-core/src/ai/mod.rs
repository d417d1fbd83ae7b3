//! Pluggable intent classifier
//!
//! Turns a free-text chat message into a `ClassifiedIntent`
//! (`{type, item, amount, currency, category}`).
//!
//! # Architecture
//!
//! - `IntentClassifier` trait: the seam the dispatcher depends on
//! - `ClassifierClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAICompatibleBackend`, `OllamaBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `CLASSIFIER_BACKEND`: Backend to use (openai_compatible, ollama, mock). Default: openai_compatible
//! - `OPENAI_COMPATIBLE_HOST`, `OPENAI_COMPATIBLE_MODEL`, `OPENAI_COMPATIBLE_API_KEY`
//! - `OLLAMA_HOST`, `OLLAMA_MODEL`

mod mock;
mod ollama;
mod openai_compatible;
pub mod parsing;
pub mod types;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use openai_compatible::OpenAICompatibleBackend;
pub use types::*;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Category;
use crate::prompts::{PromptId, PromptLibrary};

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Interface every classifier backend implements
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classify a message; `Ok(None)` means the model found nothing to act on
    async fn classify(&self, text: &str) -> Result<Option<ClassifiedIntent>>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Model name (for logging)
    fn model(&self) -> &str;

    /// Host URL (for logging and /health)
    fn host(&self) -> &str;
}

/// Build the (system, user) messages for a classification request
pub(crate) fn render_classify_prompt(
    prompts: &PromptLibrary,
    text: &str,
) -> Result<(Option<String>, String)> {
    let prompt = prompts.get(PromptId::ClassifyIntent)?;
    let categories = Category::classifiable()
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut vars = HashMap::new();
    vars.insert("message", text);
    vars.insert("categories", categories.as_str());

    Ok((
        prompt.system_section().map(str::to_string),
        prompt.render_user(&vars),
    ))
}

/// Concrete classifier enum
#[derive(Clone)]
pub enum ClassifierClient {
    /// Any `/v1/chat/completions` server
    OpenAICompatible(OpenAICompatibleBackend),
    /// Ollama HTTP API
    Ollama(OllamaBackend),
    /// Offline heuristics
    Mock(MockBackend),
}

impl ClassifierClient {
    /// Create a classifier from environment variables
    ///
    /// Returns None if the selected backend's required variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("CLASSIFIER_BACKEND")
            .unwrap_or_else(|_| "openai_compatible".to_string());

        match backend.to_lowercase().as_str() {
            "openai_compatible" | "openai" => {
                OpenAICompatibleBackend::from_env().map(ClassifierClient::OpenAICompatible)
            }
            "ollama" => OllamaBackend::from_env().map(ClassifierClient::Ollama),
            "mock" => Some(ClassifierClient::mock()),
            _ => {
                tracing::warn!(backend = %backend, "Unknown CLASSIFIER_BACKEND, falling back to openai_compatible");
                OpenAICompatibleBackend::from_env().map(ClassifierClient::OpenAICompatible)
            }
        }
    }

    pub fn mock() -> Self {
        ClassifierClient::Mock(MockBackend::new())
    }

    /// Apply a request timeout to HTTP backends
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match self {
            ClassifierClient::OpenAICompatible(b) => {
                ClassifierClient::OpenAICompatible(b.with_timeout(timeout))
            }
            ClassifierClient::Ollama(b) => ClassifierClient::Ollama(b.with_timeout(timeout)),
            ClassifierClient::Mock(b) => ClassifierClient::Mock(b),
        }
    }

    /// Backend name for display
    pub fn backend_name(&self) -> &'static str {
        match self {
            ClassifierClient::OpenAICompatible(_) => "openai_compatible",
            ClassifierClient::Ollama(_) => "ollama",
            ClassifierClient::Mock(_) => "mock",
        }
    }
}

#[async_trait]
impl IntentClassifier for ClassifierClient {
    async fn classify(&self, text: &str) -> Result<Option<ClassifiedIntent>> {
        match self {
            ClassifierClient::OpenAICompatible(b) => b.classify(text).await,
            ClassifierClient::Ollama(b) => b.classify(text).await,
            ClassifierClient::Mock(b) => b.classify(text).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            ClassifierClient::OpenAICompatible(b) => b.health_check().await,
            ClassifierClient::Ollama(b) => b.health_check().await,
            ClassifierClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            ClassifierClient::OpenAICompatible(b) => b.model(),
            ClassifierClient::Ollama(b) => b.model(),
            ClassifierClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            ClassifierClient::OpenAICompatible(b) => b.host(),
            ClassifierClient::Ollama(b) => b.host(),
            ClassifierClient::Mock(b) => b.host(),
        }
    }
}
