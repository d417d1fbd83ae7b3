//! Subscription operations

use rusqlite::params;

use super::{format_datetime, parse_datetime, Database};
use crate::error::Result;
use crate::models::{NewSubscription, Subscription};

impl Database {
    /// Insert a subscription, returning its id
    pub fn insert_subscription(&self, sub: &NewSubscription) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO subscriptions (psid, service_name, amount, next_billing_date, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                sub.psid,
                sub.service_name,
                sub.amount,
                format_datetime(&sub.next_billing_date),
                format_datetime(&sub.created_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List a user's subscriptions, oldest first
    pub fn list_subscriptions(&self, psid: &str) -> Result<Vec<Subscription>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, psid, service_name, amount, next_billing_date, created_at
            FROM subscriptions
            WHERE psid = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )?;

        let subscriptions = stmt
            .query_map(params![psid], |row| {
                let next_billing: String = row.get(4)?;
                let created_at: String = row.get(5)?;
                Ok(Subscription {
                    id: row.get(0)?,
                    psid: row.get(1)?,
                    service_name: row.get(2)?,
                    amount: row.get(3)?,
                    next_billing_date: parse_datetime(&next_billing),
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(subscriptions)
    }

    /// Delete every subscription for a user, returning how many were removed
    pub fn delete_subscriptions_for_user(&self, psid: &str) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM subscriptions WHERE psid = ?", params![psid])?)
    }
}
