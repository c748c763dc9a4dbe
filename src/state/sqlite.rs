use super::types::{BlacklistEntry, UserContainerRecord};
use super::StateStore;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use fs2::FileExt;
use rusqlite::OptionalExtension;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_rusqlite::Connection;
use tracing::{debug, info, warn};

const SCHEMA_VERSION: i32 = 1;

/// SQLite-backed store for container records and the blacklist.
///
/// Uses an advisory file lock (`<db>.lock`) so that two warden processes do not
/// manage the same database; a second instance would break the one container
/// per user guarantee. The lock is held for the lifetime of the store.
pub struct SqliteStateStore {
    db_path: PathBuf,
    conn: Connection,
    #[allow(dead_code)]
    lock_file: Option<std::fs::File>,
}

impl SqliteStateStore {
    /// Open (or create) the database at `db_path`.
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let lock_path = Self::lock_path_for(&db_path);
        let lock_file = Self::try_acquire_lock(&lock_path)?;

        let conn = Connection::open(&db_path).await?;

        // WAL for crash recovery
        conn.call(|conn: &mut rusqlite::Connection| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await?;

        Ok(Self {
            db_path,
            conn,
            lock_file: Some(lock_file),
        })
    }

    /// Create an in-memory store with no file lock. Used by tests and dry runs.
    pub async fn new_ephemeral() -> Result<Self> {
        let conn = Connection::open(":memory:").await?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            conn,
            lock_file: None,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock_path_for(db_path: &Path) -> PathBuf {
        let mut name = db_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        db_path.with_file_name(name)
    }

    /// Acquire an exclusive advisory lock, failing if another process holds it.
    fn try_acquire_lock(lock_path: &Path) -> Result<std::fs::File> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .map_err(|e| Error::Storage(format!("Failed to open lock file: {}", e)))?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                // PID is for humans debugging a stuck lock
                let _ = file.set_len(0);
                let _ = writeln!(file, "{}", std::process::id());
                debug!("Acquired advisory lock on {:?}", lock_path);
                Ok(file)
            }
            Err(e) => {
                let owner = std::fs::read_to_string(lock_path)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default();
                warn!("Lock acquisition failed on {:?}: {}", lock_path, e);
                Err(Error::Storage(if owner.is_empty() {
                    format!("Database is locked by another process ({:?})", lock_path)
                } else {
                    format!(
                        "Database is locked by another warden instance (PID {})",
                        owner
                    )
                }))
            }
        }
    }

    /// Create tables if missing and record the schema version.
    ///
    /// Table layouts match databases written by earlier deployments, so an
    /// existing `containers.db` is adopted as-is.
    pub async fn initialize(&self) -> Result<()> {
        let version: Option<i32> = self
            .conn
            .call(|conn: &mut rusqlite::Connection| {
                conn.execute_batch(
                    r#"
                    CREATE TABLE IF NOT EXISTS schema_version (
                        version INTEGER PRIMARY KEY,
                        applied_at TEXT NOT NULL
                    );

                    CREATE TABLE IF NOT EXISTS user_containers (
                        user_id TEXT PRIMARY KEY,
                        container_id TEXT,
                        container_name TEXT,
                        created_at TIMESTAMP
                    );

                    CREATE TABLE IF NOT EXISTS blacklist (
                        user_id TEXT PRIMARY KEY,
                        reason TEXT,
                        blacklisted_at TIMESTAMP
                    );
                    "#,
                )?;

                let version = conn
                    .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                        row.get::<_, Option<i32>>(0)
                    })?;
                Ok(version)
            })
            .await?;

        match version {
            Some(v) if v >= SCHEMA_VERSION => {
                debug!("Database schema is up to date (version {})", v);
            }
            _ => {
                info!("Initializing database schema version {}", SCHEMA_VERSION);
                self.conn
                    .call(|conn: &mut rusqlite::Connection| {
                        conn.execute(
                            "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
                            rusqlite::params![SCHEMA_VERSION],
                        )?;
                        Ok(())
                    })
                    .await?;
            }
        }

        Ok(())
    }

    /// Execute a function within a transaction and commit.
    #[tracing::instrument(skip(self, f), fields(operation = "db_transaction"))]
    async fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.conn
            .call(move |conn: &mut rusqlite::Connection| {
                let tx = conn.transaction()?;
                let result = f(&tx)?;
                tx.commit()?;
                Ok(result)
            })
            .await
            .map_err(Error::from)
    }

    fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserContainerRecord> {
        let created_at: Option<String> = row.get(3)?;
        Ok(UserContainerRecord {
            user_id: row.get(0)?,
            container_id: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            container_name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            created_at: parse_timestamp(created_at.as_deref()),
        })
    }

    fn blacklist_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BlacklistEntry> {
        let blacklisted_at: Option<String> = row.get(2)?;
        Ok(BlacklistEntry {
            user_id: row.get(0)?,
            reason: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            blacklisted_at: parse_timestamp(blacklisted_at.as_deref()),
        })
    }
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 and the naive `YYYY-MM-DD HH:MM:SS[.ffffff]` form that
/// older databases contain; anything else falls back to now.
fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Utc::now();
    };
    if let Ok(dt) = raw.parse::<DateTime<Utc>>() {
        return dt;
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        Ok(naive) => naive.and_utc(),
        Err(_) => {
            warn!("Unparseable timestamp '{}' in database, using now", raw);
            Utc::now()
        }
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserContainerRecord>> {
        let user_id = user_id.to_string();
        self.conn
            .call(move |conn: &mut rusqlite::Connection| {
                Ok(conn
                    .query_row(
                        "SELECT user_id, container_id, container_name, created_at FROM user_containers WHERE user_id = ?1",
                        rusqlite::params![&user_id],
                        Self::record_from_row,
                    )
                    .optional()?)
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, record: &UserContainerRecord) -> Result<()> {
        let record = record.clone();
        debug!("Saving container record for user {}", record.user_id);
        self.with_transaction(move |tx| {
            tx.execute(
                "INSERT OR REPLACE INTO user_containers (user_id, container_id, container_name, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    &record.user_id,
                    &record.container_id,
                    &record.container_name,
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        let user_id = user_id.to_string();
        let user_id_for_tx = user_id.clone();
        self.with_transaction(move |tx| {
            tx.execute(
                "DELETE FROM user_containers WHERE user_id = ?1",
                rusqlite::params![&user_id_for_tx],
            )?;
            Ok(())
        })
        .await?;
        debug!("Deleted container record for user {}", user_id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<UserContainerRecord>> {
        self.conn
            .call(|conn: &mut rusqlite::Connection| {
                let mut stmt = conn.prepare(
                    "SELECT user_id, container_id, container_name, created_at FROM user_containers ORDER BY user_id",
                )?;
                let records = stmt
                    .query_map([], Self::record_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
            .await
            .map_err(Error::from)
    }

    async fn is_blacklisted(&self, user_id: &str) -> Result<bool> {
        let user_id = user_id.to_string();
        self.conn
            .call(move |conn: &mut rusqlite::Connection| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) > 0 FROM blacklist WHERE user_id = ?1",
                    rusqlite::params![&user_id],
                    |row| row.get(0),
                )?)
            })
            .await
            .map_err(Error::from)
    }

    async fn get_blacklist(&self, user_id: &str) -> Result<Option<BlacklistEntry>> {
        let user_id = user_id.to_string();
        self.conn
            .call(move |conn: &mut rusqlite::Connection| {
                Ok(conn
                    .query_row(
                        "SELECT user_id, reason, blacklisted_at FROM blacklist WHERE user_id = ?1",
                        rusqlite::params![&user_id],
                        Self::blacklist_from_row,
                    )
                    .optional()?)
            })
            .await
            .map_err(Error::from)
    }

    async fn add_blacklist(&self, entry: &BlacklistEntry) -> Result<()> {
        let entry = entry.clone();
        self.with_transaction(move |tx| {
            tx.execute(
                "INSERT OR REPLACE INTO blacklist (user_id, reason, blacklisted_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![
                    &entry.user_id,
                    &entry.reason,
                    entry.blacklisted_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove_blacklist(&self, user_id: &str) -> Result<bool> {
        let user_id = user_id.to_string();
        let rows = self
            .with_transaction(move |tx| {
                tx.execute(
                    "DELETE FROM blacklist WHERE user_id = ?1",
                    rusqlite::params![&user_id],
                )
            })
            .await?;
        Ok(rows > 0)
    }

    async fn list_blacklist(&self) -> Result<Vec<BlacklistEntry>> {
        self.conn
            .call(|conn: &mut rusqlite::Connection| {
                let mut stmt = conn.prepare(
                    "SELECT user_id, reason, blacklisted_at FROM blacklist ORDER BY user_id",
                )?;
                let entries = stmt
                    .query_map([], Self::blacklist_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }
}
