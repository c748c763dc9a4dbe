use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable association between a user and the container they own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContainerRecord {
    pub user_id: String,
    pub container_id: String,
    pub container_name: String,
    pub created_at: DateTime<Utc>,
}

impl UserContainerRecord {
    pub fn new(
        user_id: impl Into<String>,
        container_id: impl Into<String>,
        container_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            container_id: container_id.into(),
            container_name: container_name.into(),
            created_at: Utc::now(),
        }
    }
}

/// A user barred from holding a container until an administrator clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub user_id: String,
    /// Free text; empty when the administrator gave no reason.
    pub reason: String,
    pub blacklisted_at: DateTime<Utc>,
}

impl BlacklistEntry {
    pub fn new(user_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            reason: reason.into(),
            blacklisted_at: Utc::now(),
        }
    }
}
