//! Monthly spending report

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::db::Database;
use crate::error::Result;
use crate::models::{Category, Transaction};
use crate::period::month_start;

/// Per-category sums in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryTotals {
    entries: Vec<(Category, f64)>,
}

impl CategoryTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an amount, appending the category if it has not been seen yet
    pub fn add(&mut self, category: Category, amount: f64) {
        match self.entries.iter_mut().find(|(c, _)| *c == category) {
            Some((_, sum)) => *sum += amount,
            None => self.entries.push((category, amount)),
        }
    }

    pub fn get(&self, category: Category) -> Option<f64> {
        self.entries
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, sum)| *sum)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, sum)| sum).sum()
    }
}

impl<'a> FromIterator<&'a Transaction> for CategoryTotals {
    fn from_iter<I: IntoIterator<Item = &'a Transaction>>(iter: I) -> Self {
        let mut totals = Self::new();
        for tx in iter {
            totals.add(tx.category, tx.amount);
        }
        totals
    }
}

/// A calendar month's spend for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    /// Full month name, e.g. "March"
    pub month: String,
    pub total: f64,
    pub categories: CategoryTotals,
}

impl MonthlyReport {
    /// Reply text: month, total, then one line per category
    pub fn message(&self, currency: &str) -> String {
        let mut text = format!(
            "Monthly Report ({}):\nTotal: {}{:.2}",
            self.month, currency, self.total
        );
        for (category, sum) in self.categories.iter() {
            text.push_str(&format!("\n- {}: {}{:.2}", category, currency, sum));
        }
        text
    }
}

/// Reply when the month has no transactions
pub const NO_REPORT_DATA: &str = "No data found for this month.";

/// Build the report for the month containing `now`
///
/// Returns `None` when the user has no transactions this month.
pub fn build_monthly_report<Tz: TimeZone>(
    db: &Database,
    psid: &str,
    now: &DateTime<Tz>,
) -> Result<Option<MonthlyReport>>
where
    Tz::Offset: std::fmt::Display,
{
    let transactions = db.list_transactions_since(psid, month_start(now))?;
    if transactions.is_empty() {
        return Ok(None);
    }

    let categories: CategoryTotals = transactions.iter().collect();
    Ok(Some(MonthlyReport {
        month: now.format("%B").to_string(),
        total: categories.total(),
        categories,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewTransaction;
    use chrono::{Duration, Utc};

    fn log(db: &Database, amount: f64, category: Category, date: DateTime<Utc>) {
        db.insert_transaction(&NewTransaction {
            psid: "a".into(),
            amount,
            category,
            item_name: "x".into(),
            date,
        })
        .unwrap();
    }

    #[test]
    fn test_category_totals_first_seen_order() {
        let mut totals = CategoryTotals::new();
        totals.add(Category::FoodDining, 10.0);
        totals.add(Category::Transport, 20.0);
        totals.add(Category::FoodDining, 5.0);

        let entries: Vec<_> = totals.iter().collect();
        assert_eq!(
            entries,
            vec![(Category::FoodDining, 15.0), (Category::Transport, 20.0)]
        );
        assert_eq!(totals.total(), 35.0);
        assert_eq!(totals.get(Category::Health), None);
    }

    #[test]
    fn test_build_monthly_report() {
        let db = Database::in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();

        log(&db, 10.0, Category::FoodDining, now - Duration::days(10));
        log(&db, 20.0, Category::Transport, now - Duration::days(5));
        log(&db, 5.0, Category::FoodDining, now);
        // February
        log(&db, 99.0, Category::Health, now - Duration::days(30));

        let report = build_monthly_report(&db, "a", &now).unwrap().unwrap();
        assert_eq!(report.month, "March");
        assert_eq!(report.total, 35.0);
        assert_eq!(report.categories.get(Category::FoodDining), Some(15.0));
        assert_eq!(report.categories.get(Category::Transport), Some(20.0));
        assert_eq!(report.categories.get(Category::Health), None);

        assert_eq!(
            report.message("$"),
            "Monthly Report (March):\nTotal: $35.00\n- Food/Dining: $15.00\n- Transport: $20.00"
        );
    }

    #[test]
    fn test_empty_month() {
        let db = Database::in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        log(&db, 10.0, Category::FoodDining, now - Duration::days(40));

        assert!(build_monthly_report(&db, "a", &now).unwrap().is_none());
    }
}
