//! Heuristic classifier for offline development and tests
//!
//! Understands the command shapes shown in the help text ("KFC 10",
//! "Set limit 500", "Add sub Netflix 15") with a small keyword table for
//! categories. Anything else is unclassifiable.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::error::Result;
use crate::models::Category;

use super::types::ClassifiedIntent;
use super::IntentClassifier;

const AMOUNT: &str = r"(?P<amount>[$€£]?\s*\d[\d,]*(?:\.\d+)?\s*(?:[$€£]|usd|eur)?)";

fn set_limit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)^(?:set\s+)?(?:weekly\s+)?limit\s+(?:to\s+)?{AMOUNT}$"))
            .expect("valid regex")
    })
}

fn add_sub_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)^add\s+(?:sub|subscription)\s+(?P<item>.+?)\s+{AMOUNT}$"
        ))
        .expect("valid regex")
    })
}

fn expense_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)^(?P<item>.*?[a-z].*?)\s+{AMOUNT}$")).expect("valid regex")
    })
}

/// Keyword to category table, checked in order
const KEYWORDS: &[(&[&str], Category)] = &[
    (
        &["kfc", "pho", "coffee", "lunch", "dinner", "breakfast", "pizza", "burger", "food", "cafe"],
        Category::FoodDining,
    ),
    (
        &["taxi", "grab", "uber", "bus", "train", "fuel", "gas", "parking"],
        Category::Transport,
    ),
    (
        &["rent", "electric", "water", "internet", "utilities"],
        Category::LivingUtilities,
    ),
    (
        &["movie", "cinema", "game", "concert", "netflix", "spotify"],
        Category::Entertainment,
    ),
    (
        &["pharmacy", "doctor", "medicine", "hospital", "gym"],
        Category::Health,
    ),
    (&["gift", "wedding", "birthday", "party"], Category::SpecialOccasion),
    (&["shirt", "shoes", "clothes", "mall", "shopping"], Category::Shopping),
];

fn guess_category(item: &str) -> Category {
    let lowered = item.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(words, _)| words.iter().any(|w| lowered.contains(w)))
        .map(|(_, category)| *category)
        .unwrap_or(Category::General)
}

fn amount_value(caps: &regex::Captures<'_>) -> Option<Value> {
    caps.name("amount")
        .map(|m| Value::String(m.as_str().trim().to_string()))
}

/// Regex-driven classifier
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self { healthy: true }
    }

    pub fn unhealthy() -> Self {
        Self { healthy: false }
    }

    /// Classify without going through the async trait
    pub fn classify_text(&self, text: &str) -> Option<ClassifiedIntent> {
        let text = text.trim();

        if let Some(caps) = set_limit_re().captures(text) {
            return Some(ClassifiedIntent {
                kind: Some("set_limit".into()),
                amount: amount_value(&caps),
                ..Default::default()
            });
        }

        if let Some(caps) = add_sub_re().captures(text) {
            let service = caps.name("item").map(|m| m.as_str().trim().to_string());
            return Some(ClassifiedIntent {
                kind: Some("add_sub".into()),
                item: service,
                amount: amount_value(&caps),
                currency: None,
                category: Some(Category::Subscription.as_str().into()),
            });
        }

        if let Some(caps) = expense_re().captures(text) {
            let item = caps.name("item").map(|m| m.as_str().trim().to_string());
            let category = item.as_deref().map(guess_category).unwrap_or(Category::General);
            return Some(ClassifiedIntent {
                kind: Some("expense".into()),
                item,
                amount: amount_value(&caps),
                currency: None,
                category: Some(category.as_str().into()),
            });
        }

        None
    }
}

#[async_trait]
impl IntentClassifier for MockBackend {
    async fn classify(&self, text: &str) -> Result<Option<ClassifiedIntent>> {
        Ok(self.classify_text(text))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Intent;

    fn resolve(text: &str) -> Option<Intent> {
        MockBackend::new()
            .classify_text(text)
            .map(|raw| raw.resolve().unwrap())
    }

    #[test]
    fn test_expense() {
        assert_eq!(
            resolve("KFC 10"),
            Some(Intent::Expense {
                item: "KFC".into(),
                amount: 10.0,
                category: Category::FoodDining,
            })
        );
        assert_eq!(
            resolve("Taxi 10$"),
            Some(Intent::Expense {
                item: "Taxi".into(),
                amount: 10.0,
                category: Category::Transport,
            })
        );
        assert_eq!(
            resolve("paint brushes 1,200.50"),
            Some(Intent::Expense {
                item: "paint brushes".into(),
                amount: 1200.5,
                category: Category::General,
            })
        );
    }

    #[test]
    fn test_set_limit() {
        assert_eq!(resolve("Set limit 500"), Some(Intent::SetLimit { amount: 500.0 }));
        assert_eq!(resolve("limit $0"), Some(Intent::SetLimit { amount: 0.0 }));
    }

    #[test]
    fn test_add_sub() {
        assert_eq!(
            resolve("Add sub Netflix 15"),
            Some(Intent::AddSubscription {
                service: "Netflix".into(),
                amount: 15.0,
            })
        );
        assert_eq!(
            resolve("add subscription Disney Plus $7.99"),
            Some(Intent::AddSubscription {
                service: "Disney Plus".into(),
                amount: 7.99,
            })
        );
    }

    #[test]
    fn test_unclassifiable() {
        let backend = MockBackend::new();
        assert!(backend.classify_text("asdkjh").is_none());
        assert!(backend.classify_text("hello there").is_none());
        assert!(backend.classify_text("42").is_none());
    }

    #[tokio::test]
    async fn test_trait_and_health() {
        let backend = MockBackend::new();
        assert!(backend.classify("KFC 10").await.unwrap().is_some());
        assert!(backend.health_check().await);
        assert!(!MockBackend::unhealthy().health_check().await);
    }
}
