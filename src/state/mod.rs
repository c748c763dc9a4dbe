//! Persistent state for user containers and the blacklist.
//!
//! State is persisted in a SQLite database with WAL mode enabled for crash
//! recovery, so records survive process restarts and can be reconciled against
//! the runtime on the next start.
//!
//! # Example
//!
//! ```ignore
//! use container_warden::state::{SqliteStateStore, StateStore, UserContainerRecord};
//!
//! let store = SqliteStateStore::open("containers.db").await?;
//! store.initialize().await?;
//! store.put(&UserContainerRecord::new("42", "abc123", "discord-bot-42-1700000000")).await?;
//! ```

mod sqlite;
mod types;

pub use sqlite::SqliteStateStore;
pub use types::{BlacklistEntry, UserContainerRecord};

use crate::error::Result;
use async_trait::async_trait;

/// Durable CRUD over container records and blacklist entries, keyed by user id.
///
/// Every operation touches a single key. Failures are reported as storage
/// errors and must never be swallowed by implementations.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<UserContainerRecord>>;

    /// Insert or replace the record for `record.user_id`.
    async fn put(&self, record: &UserContainerRecord) -> Result<()>;

    /// Remove the record for `user_id`. Removing a missing record succeeds.
    async fn delete(&self, user_id: &str) -> Result<()>;

    async fn list_all(&self) -> Result<Vec<UserContainerRecord>>;

    async fn is_blacklisted(&self, user_id: &str) -> Result<bool>;

    async fn get_blacklist(&self, user_id: &str) -> Result<Option<BlacklistEntry>>;

    /// Insert or overwrite the entry for `entry.user_id`.
    async fn add_blacklist(&self, entry: &BlacklistEntry) -> Result<()>;

    /// Returns whether an entry was actually removed.
    async fn remove_blacklist(&self, user_id: &str) -> Result<bool>;

    async fn list_blacklist(&self) -> Result<Vec<BlacklistEntry>>;
}
