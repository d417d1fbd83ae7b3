//! Classifier command implementation

use std::path::Path;

use anyhow::{Context, Result};
use spendbot_core::{Intent, IntentClassifier};

use super::{classifier_from_env, load_config};

/// Print the classifier's raw interpretation and the resolved intent
pub async fn cmd_classify(config_path: Option<&Path>, text: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let classifier = classifier_from_env(&config)?;

    println!(
        "🤖 {} ({}, model {})",
        classifier.backend_name(),
        classifier.host(),
        classifier.model()
    );

    let Some(classified) = classifier
        .classify(text)
        .await
        .context("Classifier request failed")?
    else {
        println!("   ❓ Not understood");
        return Ok(());
    };

    println!(
        "   Raw: {}",
        serde_json::to_string(&classified).context("Failed to format response")?
    );

    match classified.resolve() {
        Ok(intent) => println!(
            "   → {}",
            describe_intent(&intent, &config.budget.currency_symbol)
        ),
        Err(e) => println!("   ⚠️  Unusable: {}", e),
    }

    Ok(())
}

pub fn describe_intent(intent: &Intent, currency: &str) -> String {
    match intent {
        Intent::SetLimit { amount } => format!("set weekly limit to {}{:.2}", currency, amount),
        Intent::AddSubscription { service, amount } => {
            format!("add subscription {} at {}{:.2}/mo", service, currency, amount)
        }
        Intent::Expense {
            item,
            amount,
            category,
        } => format!("expense {} {}{:.2} ({})", item, currency, amount, category),
    }
}
