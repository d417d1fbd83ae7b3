//! Transaction operations

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{format_datetime, parse_datetime, Database};
use crate::error::Result;
use crate::models::{Category, NewTransaction, Transaction};

const TRANSACTION_COLUMNS: &str = "id, psid, amount, category, item_name, date";

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let category: String = row.get(3)?;
    let date: String = row.get(5)?;
    Ok(Transaction {
        id: row.get(0)?,
        psid: row.get(1)?,
        amount: row.get(2)?,
        category: category.parse().unwrap_or(Category::General),
        item_name: row.get(4)?,
        date: parse_datetime(&date),
    })
}

impl Database {
    /// Insert a transaction, returning its id
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO transactions (psid, amount, category, item_name, date)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                tx.psid,
                tx.amount,
                tx.category.as_str(),
                tx.item_name,
                format_datetime(&tx.date),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// The user's most recent transaction by date (ties go to the later insert)
    pub fn latest_transaction(&self, psid: &str) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!(
                    "SELECT {} FROM transactions WHERE psid = ? ORDER BY date DESC, id DESC LIMIT 1",
                    TRANSACTION_COLUMNS
                ),
                params![psid],
                row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    /// All of a user's transactions dated at or after `since`, oldest first
    pub fn list_transactions_since(
        &self,
        psid: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE psid = ? AND date >= ? ORDER BY date ASC, id ASC",
            TRANSACTION_COLUMNS
        ))?;
        let transactions = stmt
            .query_map(params![psid, format_datetime(&since)], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    /// Delete a single transaction; returns whether a row was removed
    pub fn delete_transaction(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM transactions WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    /// Delete every transaction for a user, returning how many were removed
    pub fn delete_transactions_for_user(&self, psid: &str) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM transactions WHERE psid = ?", params![psid])?)
    }
}
