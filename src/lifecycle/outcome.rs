use super::endpoints::Endpoints;
use crate::runtime::RuntimeError;
use crate::state::{BlacklistEntry, UserContainerRecord};

/// Result of a successful `create`.
#[derive(Debug, Clone)]
pub struct CreatedContainer {
    pub record: UserContainerRecord,
    /// Empty when the endpoints did not show up within the wait bound.
    pub endpoints: Endpoints,
    pub limits: ResourceLimits,
}

/// How a container teardown ended. In every case the user's record is gone.
#[derive(Debug)]
pub enum TeardownOutcome {
    /// Stopped and removed.
    Removed,
    /// The runtime no longer knew the container.
    AlreadyGone,
    /// The runtime refused; the record was cleared anyway.
    ClearedWithWarning(RuntimeError),
}

impl TeardownOutcome {
    pub fn warning(&self) -> Option<&RuntimeError> {
        match self {
            TeardownOutcome::ClearedWithWarning(e) => Some(e),
            _ => None,
        }
    }
}

/// Static limits applied at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLimits {
    pub cpus: f64,
    pub memory: String,
}

/// Live status reported by `status`.
#[derive(Debug, Clone)]
pub struct ContainerStatus {
    pub container_id: String,
    pub container_name: String,
    pub status: String,
    pub limits: ResourceLimits,
}

/// Result of `status` for a user who held a container.
#[derive(Debug, Clone)]
pub enum StatusOutcome {
    Live(ContainerStatus),
    /// The runtime no longer knew the container; the record was cleared.
    Vanished,
}

/// Result of a successful `blacklist`.
#[derive(Debug)]
pub struct BlacklistOutcome {
    pub entry: BlacklistEntry,
    /// Present when the target held a container that was torn down.
    pub teardown: Option<TeardownOutcome>,
}
