//! User operations

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{User, UserStats};

impl Database {
    /// Look up a user by psid
    pub fn get_user(&self, psid: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT psid, weekly_limit, created_at FROM users WHERE psid = ?",
                params![psid],
                |row| {
                    let created_at: String = row.get(2)?;
                    Ok(User {
                        psid: row.get(0)?,
                        weekly_limit: row.get(1)?,
                        created_at: parse_datetime(&created_at),
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Insert a new user with no weekly limit
    ///
    /// Inserting a psid that already exists leaves the stored row untouched.
    pub fn insert_user(&self, psid: &str, created_at: DateTime<Utc>) -> Result<User> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO users (psid, weekly_limit, created_at) VALUES (?, 0, ?)",
            params![psid, format_datetime(&created_at)],
        )?;
        drop(conn);

        self.get_user(psid)?
            .ok_or_else(|| Error::NotFound(format!("user {}", psid)))
    }

    /// Persist a user's mutable fields
    pub fn save_user(&self, user: &User) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE users SET weekly_limit = ? WHERE psid = ?",
            params![user.weekly_limit, user.psid],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("user {}", user.psid)));
        }
        Ok(())
    }

    /// Count every user
    pub fn count_users(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }

    /// Count the records a user owns
    pub fn user_stats(&self, psid: &str) -> Result<UserStats> {
        let conn = self.conn()?;
        let transaction_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE psid = ?",
            params![psid],
            |row| row.get(0),
        )?;
        let subscription_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM subscriptions WHERE psid = ?",
            params![psid],
            |row| row.get(0),
        )?;
        Ok(UserStats {
            transaction_count,
            subscription_count,
        })
    }
}
