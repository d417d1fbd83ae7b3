//! Domain models for spendbot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat user, keyed by the messaging platform's page-scoped id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub psid: String,
    /// Weekly spending limit; 0 means expenses skip the budget check
    pub weekly_limit: f64,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether a weekly limit is configured
    pub fn has_limit(&self) -> bool {
        self.weekly_limit > 0.0
    }
}

/// Spending categories the classifier is asked to choose from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Food/Dining")]
    FoodDining,
    #[serde(rename = "Living/Utilities")]
    LivingUtilities,
    Transport,
    Shopping,
    Entertainment,
    Health,
    #[serde(rename = "Special Occasion")]
    SpecialOccasion,
    Subscription,
    /// Fallback when the classifier gives nothing usable
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FoodDining => "Food/Dining",
            Self::LivingUtilities => "Living/Utilities",
            Self::Transport => "Transport",
            Self::Shopping => "Shopping",
            Self::Entertainment => "Entertainment",
            Self::Health => "Health",
            Self::SpecialOccasion => "Special Occasion",
            Self::Subscription => "Subscription",
            Self::General => "General",
        }
    }

    /// Categories offered to the classifier (excludes the `General` fallback)
    pub fn classifiable() -> &'static [Category] {
        &[
            Self::FoodDining,
            Self::LivingUtilities,
            Self::Transport,
            Self::Shopping,
            Self::Entertainment,
            Self::Health,
            Self::SpecialOccasion,
            Self::Subscription,
        ]
    }

    /// Map a classifier-provided label onto a category, falling back to `General`
    ///
    /// Matching ignores case and punctuation, and accepts either half of a
    /// compound label ("food" matches "Food/Dining").
    pub fn normalize(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return Self::General;
        };
        if let Ok(category) = label.parse() {
            return category;
        }

        let wanted = squash(label);
        if wanted.is_empty() {
            return Self::General;
        }
        Self::classifiable()
            .iter()
            .copied()
            .find(|c| {
                c.as_str()
                    .split('/')
                    .any(|part| squash(part) == wanted)
            })
            .unwrap_or(Self::General)
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = squash(s);
        Self::classifiable()
            .iter()
            .chain(std::iter::once(&Self::General))
            .copied()
            .find(|c| squash(c.as_str()) == wanted)
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A logged spend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub psid: String,
    /// Always positive
    pub amount: f64,
    pub category: Category,
    pub item_name: String,
    /// Creation instant; the ordering key for undo and the reporting windows
    pub date: DateTime<Utc>,
}

/// A transaction to insert
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub psid: String,
    pub amount: f64,
    pub category: Category,
    pub item_name: String,
    pub date: DateTime<Utc>,
}

/// A monthly subscription registered through chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub psid: String,
    pub service_name: String,
    /// Monthly charge
    pub amount: f64,
    /// Stored for display only; nothing bills against it
    pub next_billing_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A subscription to insert
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub psid: String,
    pub service_name: String,
    pub amount: f64,
    pub next_billing_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Record counts for a single user
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserStats {
    pub transaction_count: i64,
    pub subscription_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_exact_labels() {
        for category in Category::classifiable() {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), *category);
        }
        assert_eq!("general".parse::<Category>().unwrap(), Category::General);
        assert!("Groceries".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_normalize() {
        assert_eq!(Category::normalize(Some("food/dining")), Category::FoodDining);
        assert_eq!(Category::normalize(Some("Dining")), Category::FoodDining);
        assert_eq!(
            Category::normalize(Some("utilities")),
            Category::LivingUtilities
        );
        assert_eq!(
            Category::normalize(Some("special occasion")),
            Category::SpecialOccasion
        );
        assert_eq!(Category::normalize(Some("Crypto")), Category::General);
        assert_eq!(Category::normalize(Some("  ")), Category::General);
        assert_eq!(Category::normalize(None), Category::General);
    }

    #[test]
    fn test_category_serde_uses_labels() {
        let json = serde_json::to_string(&Category::SpecialOccasion).unwrap();
        assert_eq!(json, "\"Special Occasion\"");
    }

    #[test]
    fn test_user_has_limit() {
        let mut user = User {
            psid: "1".into(),
            weekly_limit: 0.0,
            created_at: Utc::now(),
        };
        assert!(!user.has_limit());
        user.weekly_limit = 50.0;
        assert!(user.has_limit());
    }
}
