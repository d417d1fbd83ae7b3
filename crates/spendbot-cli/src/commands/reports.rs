//! Report and user summary commands

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use spendbot_core::budget;
use spendbot_core::db::Database;
use spendbot_core::models::Subscription;
use spendbot_core::report::{build_monthly_report, NO_REPORT_DATA};
use spendbot_core::BotConfig;

pub fn cmd_report(db: &Database, config: &BotConfig, psid: &str, json: bool) -> Result<()> {
    let report =
        build_monthly_report(db, psid, &Local::now()).context("Failed to build monthly report")?;

    match (report, json) {
        (Some(report), true) => println!("{}", serde_json::to_string_pretty(&report)?),
        (Some(report), false) => println!("{}", report.message(&config.budget.currency_symbol)),
        (None, true) => println!("null"),
        (None, false) => println!("{}", NO_REPORT_DATA),
    }

    Ok(())
}

/// A user's budget position and subscriptions
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub psid: String,
    pub weekly_limit: f64,
    pub week_spent: f64,
    /// None when no limit is set
    pub week_remaining: Option<f64>,
    pub transaction_count: i64,
    pub subscriptions: Vec<Subscription>,
}

pub fn user_summary<Tz: TimeZone>(
    db: &Database,
    psid: &str,
    now: &DateTime<Tz>,
) -> Result<Option<UserSummary>> {
    let Some(user) = db.get_user(psid)? else {
        return Ok(None);
    };

    let week_spent = budget::week_total(db, psid, now)?;
    let stats = db.user_stats(psid)?;
    let subscriptions = db.list_subscriptions(psid)?;

    Ok(Some(UserSummary {
        psid: user.psid.clone(),
        weekly_limit: user.weekly_limit,
        week_spent,
        week_remaining: user
            .has_limit()
            .then(|| user.weekly_limit - week_spent),
        transaction_count: stats.transaction_count,
        subscriptions,
    }))
}

pub fn cmd_user(db: &Database, config: &BotConfig, psid: &str, json: bool) -> Result<()> {
    let summary = user_summary(db, psid, &Local::now()).context("Failed to load user")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let Some(summary) = summary else {
        println!("No user with id {}", psid);
        return Ok(());
    };

    let currency = config.budget.currency_symbol.as_str();
    println!("👤 {}", summary.psid);
    match summary.week_remaining {
        Some(remaining) => {
            println!(
                "   Weekly limit: {}",
                money(currency, summary.weekly_limit)
            );
            println!("   Spent this week: {}", money(currency, summary.week_spent));
            if remaining < 0.0 {
                println!("   ⚠️  Over by {}", money(currency, -remaining));
            } else {
                println!("   Remaining: {}", money(currency, remaining));
            }
        }
        None => {
            println!("   Weekly limit: not set");
            println!("   Spent this week: {}", money(currency, summary.week_spent));
        }
    }
    println!("   Transactions: {}", summary.transaction_count);

    if summary.subscriptions.is_empty() {
        println!("   Subscriptions: none");
    } else {
        println!("   Subscriptions:");
        for sub in &summary.subscriptions {
            println!(
                "   - {} {}/mo (next billing {})",
                sub.service_name,
                money(currency, sub.amount),
                sub.next_billing_date.format("%Y-%m-%d")
            );
        }
    }

    Ok(())
}

fn money(currency: &str, amount: f64) -> String {
    format!("{}{:.2}", currency, amount)
}
