//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `users` - User lookup, creation and limit updates
//! - `transactions` - Transaction CRUD and time-window queries
//! - `subscriptions` - Subscription CRUD

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod subscriptions;
mod transactions;
mod users;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "SPENDBOT_DB_KEY";

const POOL_SIZE: u32 = 10;

/// Stored instants are UTC text; fixed width keeps text order equal to time order
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Hex-encoded Argon2id key for a passphrase
///
/// The salt is fixed so a database file can be moved or restored and still
/// open with the same passphrase. Changing it locks out existing databases.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    const KEY_SALT: &[u8; 16] = b"spendbot-salt-v1";

    let salt = SaltString::encode_b64(KEY_SALT)
        .map_err(|e| Error::Encryption(format!("Bad key salt: {}", e)))?;
    let derived = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Key derivation failed: {}", e)))?;
    let output = derived
        .hash
        .ok_or_else(|| Error::Encryption("Key derivation produced no output".to_string()))?;

    Ok(hex::encode(output.as_bytes()))
}

/// Format an instant for storage
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp back into a DateTime<Utc>
///
/// Accepts both the fractional layout written by this crate and SQLite's
/// `CURRENT_TIMESTAMP` layout.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Pooled handle to the record store
///
/// Cloning is cheap; every clone shares the same pool.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Directory owned by a throwaway database; removed after the last clone
    /// (and so the pool) drops. Must stay after `pool`.
    scratch: Option<Arc<tempfile::TempDir>>,
}

impl Database {
    /// Open an encrypted database keyed from `SPENDBOT_DB_KEY`
    ///
    /// Fails when the variable is unset rather than silently writing plaintext.
    pub fn new(path: &str) -> Result<Self> {
        let passphrase = std::env::var(DB_KEY_ENV).map_err(|_| {
            Error::Encryption(format!(
                "{} is not set. Export a passphrase, or pass --no-encrypt for a plaintext \
                 database during development.",
                DB_KEY_ENV
            ))
        })?;
        Self::new_with_key(path, Some(&passphrase))
    }

    /// Open a plaintext database (development and tests)
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Open a database, keying every pooled connection when a passphrase is given
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let manager = match passphrase {
            Some(passphrase) => {
                let pragma = format!("PRAGMA key = 'x\"{}\"';", derive_key(passphrase)?);
                manager.with_init(move |conn| conn.execute_batch(&pragma))
            }
            None => manager,
        };

        let db = Self {
            pool: Pool::builder().max_size(POOL_SIZE).build(manager)?,
            scratch: None,
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Fresh throwaway database for tests
    ///
    /// Backed by a file in a private temp directory, since SQLCipher's
    /// `:memory:` databases are not shared between pooled connections. The
    /// directory, with any `-wal`/`-shm` siblings, is deleted on drop.
    pub fn in_memory() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("spendbot_test_").tempdir()?;
        let path = dir.path().join("spendbot.db");

        let mut db = Self::new_unencrypted(&path.to_string_lossy())?;
        db.scratch = Some(Arc::new(dir));
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn scratch_dir(&self) -> Option<std::path::PathBuf> {
        self.scratch.as_ref().map(|dir| dir.path().to_path_buf())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Create tables and indexes if missing
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the webhook writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Users (one per chat participant)
            CREATE TABLE IF NOT EXISTS users (
                psid TEXT PRIMARY KEY,
                weekly_limit REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            -- Transactions (psid is not a foreign key to users)
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                psid TEXT NOT NULL,
                amount REAL NOT NULL,
                category TEXT NOT NULL DEFAULT 'General',
                item_name TEXT NOT NULL,
                date TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_psid_date ON transactions(psid, date);

            -- Subscriptions registered through chat
            CREATE TABLE IF NOT EXISTS subscriptions (
                id INTEGER PRIMARY KEY,
                psid TEXT NOT NULL,
                service_name TEXT NOT NULL,
                amount REAL NOT NULL,
                next_billing_date TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_subscriptions_psid ON subscriptions(psid);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
