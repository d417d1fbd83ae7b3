//! Classifier response types
//!
//! `ClassifiedIntent` is the loose JSON shape every backend returns.
//! `Intent` is the validated form the dispatcher acts on.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::Category;

/// Raw classifier output: `{type, item, amount, currency, category}`
///
/// Every field is optional; models omit or null fields freely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedIntent {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub item: Option<String>,
    /// A number, or a numeric string such as `"15$"` or `"$1,200.50"`
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// A validated intent
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    SetLimit {
        amount: f64,
    },
    AddSubscription {
        service: String,
        amount: f64,
    },
    Expense {
        item: String,
        amount: f64,
        category: Category,
    },
}

impl ClassifiedIntent {
    pub fn expense(item: &str, amount: impl Into<Value>, category: &str) -> Self {
        Self {
            kind: Some("expense".into()),
            item: Some(item.into()),
            amount: Some(amount.into()),
            currency: None,
            category: Some(category.into()),
        }
    }

    pub fn set_limit(amount: impl Into<Value>) -> Self {
        Self {
            kind: Some("set_limit".into()),
            amount: Some(amount.into()),
            ..Default::default()
        }
    }

    pub fn add_sub(service: &str, amount: impl Into<Value>) -> Self {
        Self {
            kind: Some("add_sub".into()),
            item: Some(service.into()),
            amount: Some(amount.into()),
            category: Some(Category::Subscription.as_str().into()),
            ..Default::default()
        }
    }

    /// Validate into an `Intent`
    ///
    /// `set_limit` accepts zero; expenses and subscriptions need a positive
    /// amount. Any other `type` (or none) is treated as an expense.
    pub fn resolve(&self) -> Result<Intent> {
        let kind = self
            .kind
            .as_deref()
            .map(|k| k.trim().to_lowercase())
            .unwrap_or_default();
        let amount = parse_amount(self.amount.as_ref())?;

        match kind.as_str() {
            "set_limit" => Ok(Intent::SetLimit { amount }),
            "add_sub" => Ok(Intent::AddSubscription {
                service: non_empty(self.item.as_deref()).unwrap_or_else(|| "Unknown".into()),
                amount: require_positive(amount)?,
            }),
            _ => Ok(Intent::Expense {
                item: non_empty(self.item.as_deref()).unwrap_or_else(|| "Unknown".into()),
                amount: require_positive(amount)?,
                category: Category::normalize(self.category.as_deref()),
            }),
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

fn require_positive(amount: f64) -> Result<f64> {
    if amount > 0.0 {
        Ok(amount)
    } else {
        Err(Error::InvalidAmount(format!("amount must be positive, got {}", amount)))
    }
}

/// Coerce a classifier amount into a finite, non-negative number
///
/// Strings may carry a leading or trailing currency symbol or three-letter
/// code, and thousands separators. The rest must be a single number.
pub fn parse_amount(value: Option<&Value>) -> Result<f64> {
    let amount = match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| Error::InvalidAmount(n.to_string()))?,
        Some(Value::String(s)) => parse_amount_str(s)?,
        Some(other) => return Err(Error::InvalidAmount(format!("unexpected amount {}", other))),
        None => return Err(Error::InvalidAmount("missing amount".into())),
    };

    if !amount.is_finite() {
        return Err(Error::InvalidAmount(format!("non-finite amount {}", amount)));
    }
    if amount < 0.0 {
        return Err(Error::InvalidAmount(format!("negative amount {}", amount)));
    }
    Ok(amount)
}

fn amount_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:[$€£¥₫]\s*|[A-Za-z]{3}\s+)?(?P<num>-?(?:\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?(?:[eE][+-]?\d+)?|\.\d+))\s*(?:[$€£¥₫]|[A-Za-z]{3})?$",
        )
        .expect("valid regex")
    })
}

fn parse_amount_str(s: &str) -> Result<f64> {
    let caps = amount_pattern()
        .captures(s.trim())
        .ok_or_else(|| Error::InvalidAmount(format!("not a single amount: {:?}", s)))?;
    caps["num"]
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| Error::InvalidAmount(format!("not a number: {:?}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_amount_accepts_numbers_and_strings() {
        assert_eq!(parse_amount(Some(&json!(15))).unwrap(), 15.0);
        assert_eq!(parse_amount(Some(&json!(9.99))).unwrap(), 9.99);
        assert_eq!(parse_amount(Some(&json!("15"))).unwrap(), 15.0);
        assert_eq!(parse_amount(Some(&json!("15$"))).unwrap(), 15.0);
        assert_eq!(parse_amount(Some(&json!("$1,200.50"))).unwrap(), 1200.5);
        assert_eq!(parse_amount(Some(&json!("20 USD"))).unwrap(), 20.0);
        assert_eq!(parse_amount(Some(&json!(0))).unwrap(), 0.0);
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(matches!(parse_amount(None), Err(Error::InvalidAmount(_))));
        assert!(parse_amount(Some(&json!(null))).is_err());
        assert!(parse_amount(Some(&json!("lots"))).is_err());
        assert!(parse_amount(Some(&json!("1.2.3"))).is_err());
        assert!(parse_amount(Some(&json!(-5))).is_err());
        assert!(parse_amount(Some(&json!("-5$"))).is_err());
        assert!(parse_amount(Some(&json!(true))).is_err());
    }

    #[test]
    fn test_parse_amount_requires_one_number() {
        for text in ["2 x 15", "10 or 12", "1,5", "12 15", "15 20$", "$", "USD", ""] {
            assert!(
                matches!(parse_amount(Some(&json!(text))), Err(Error::InvalidAmount(_))),
                "{:?} should be rejected",
                text
            );
        }
    }

    #[test]
    fn test_parse_amount_string_forms() {
        assert_eq!(parse_amount(Some(&json!("1e3"))).unwrap(), 1000.0);
        assert_eq!(parse_amount(Some(&json!("1,500"))).unwrap(), 1500.0);
        assert_eq!(parse_amount(Some(&json!("USD 20"))).unwrap(), 20.0);
        assert_eq!(parse_amount(Some(&json!(" € 7.5 "))).unwrap(), 7.5);
        assert_eq!(parse_amount(Some(&json!("50000vnd"))).unwrap(), 50000.0);
        assert_eq!(parse_amount(Some(&json!(".5"))).unwrap(), 0.5);
    }

    #[test]
    fn test_resolve_expense_defaults() {
        let raw = ClassifiedIntent {
            amount: Some(json!("12")),
            ..Default::default()
        };
        assert_eq!(
            raw.resolve().unwrap(),
            Intent::Expense {
                item: "Unknown".into(),
                amount: 12.0,
                category: Category::General,
            }
        );

        let raw = ClassifiedIntent::expense("Taxi", 10, "transport");
        assert_eq!(
            raw.resolve().unwrap(),
            Intent::Expense {
                item: "Taxi".into(),
                amount: 10.0,
                category: Category::Transport,
            }
        );
    }

    #[test]
    fn test_resolve_limits_and_subscriptions() {
        assert_eq!(
            ClassifiedIntent::set_limit(0).resolve().unwrap(),
            Intent::SetLimit { amount: 0.0 }
        );
        assert_eq!(
            ClassifiedIntent::add_sub("Netflix", "15$").resolve().unwrap(),
            Intent::AddSubscription {
                service: "Netflix".into(),
                amount: 15.0,
            }
        );
        assert!(ClassifiedIntent::add_sub("Netflix", 0).resolve().is_err());
        assert!(ClassifiedIntent::expense("Air", 0, "Shopping")
            .resolve()
            .is_err());
    }

    #[test]
    fn test_deserialize_loose_shape() {
        let raw: ClassifiedIntent = serde_json::from_str(
            r#"{"type": "expense", "item": "KFC", "amount": "10$", "category": null}"#,
        )
        .unwrap();
        assert_eq!(raw.kind.as_deref(), Some("expense"));
        assert_eq!(raw.currency, None);
        assert_eq!(raw.category, None);
    }
}
