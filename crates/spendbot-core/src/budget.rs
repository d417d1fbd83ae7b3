//! Weekly budget evaluation
//!
//! Sums the user's spend since the start of the local week and produces an
//! alert when it exceeds the weekly limit. Evaluation has no memory: running
//! it twice over the same data alerts twice.

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::db::Database;
use crate::error::Result;
use crate::period::week_start;

/// A weekly limit that has been exceeded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetAlert {
    /// Spend since the start of the week
    pub total: f64,
    pub limit: f64,
    /// `total - limit`, always positive
    pub overage: f64,
}

impl BudgetAlert {
    /// Reply text, amounts to 2 decimals
    pub fn message(&self, currency: &str) -> String {
        format!(
            "ALERT: You've spent {c}{:.2} this week, exceeding your limit of {c}{:.2} by {c}{:.2}!",
            self.total,
            self.limit,
            self.overage,
            c = currency
        )
    }
}

/// Compare a week's spend against a limit
///
/// Callers decide whether a limit of 0 should be evaluated at all; here it is
/// an ordinary limit that any spend exceeds.
pub fn check_limit(total: f64, limit: f64) -> Option<BudgetAlert> {
    if total > limit {
        Some(BudgetAlert {
            total,
            limit,
            overage: total - limit,
        })
    } else {
        None
    }
}

/// Sum of a user's transactions since the start of the week containing `now`
pub fn week_total<Tz: TimeZone>(db: &Database, psid: &str, now: &DateTime<Tz>) -> Result<f64> {
    let since = week_start(now);
    Ok(db
        .list_transactions_since(psid, since)?
        .iter()
        .map(|t| t.amount)
        .sum())
}

/// Evaluate a user's weekly budget at `now`
pub fn evaluate<Tz: TimeZone>(
    db: &Database,
    psid: &str,
    limit: f64,
    now: &DateTime<Tz>,
) -> Result<Option<BudgetAlert>> {
    let total = week_total(db, psid, now)?;
    Ok(check_limit(total, limit))
}
