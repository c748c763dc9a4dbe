//! Container runtime abstraction.
//!
//! The lifecycle core only talks to the engine through [`ContainerRuntime`].
//! [`DockerRuntime`] is the production adapter; tests substitute an in-memory
//! fake.

mod docker;
mod error;

pub use docker::DockerRuntime;
pub use error::RuntimeError;

use async_trait::async_trait;
use std::collections::BTreeMap;

/// CPU period used when converting a fractional core limit into a quota.
pub const CPU_PERIOD_US: i64 = 100_000;

/// Label set on every container this system creates.
pub const MANAGED_LABEL: &str = "container-warden.managed";

/// Label carrying the owning user id.
pub const USER_LABEL: &str = "container-warden.user";

/// Everything needed to launch one user container.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSpec {
    pub image: String,
    pub name: String,
    pub cpu_quota: i64,
    pub cpu_period: i64,
    pub memory_limit: String,
    pub interactive: bool,
    pub tty: bool,
    pub labels: BTreeMap<String, String>,
}

impl RunSpec {
    /// Build a spec with the CPU fraction converted to quota/period units.
    pub fn new(image: impl Into<String>, name: impl Into<String>, cpus: f64, memory: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            name: name.into(),
            cpu_quota: cpu_quota_for(cpus),
            cpu_period: CPU_PERIOD_US,
            memory_limit: memory.into(),
            interactive: true,
            tty: true,
            labels: BTreeMap::new(),
        }
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Convert a fraction of one core into the engine's quota units.
pub fn cpu_quota_for(cpus: f64) -> i64 {
    (cpus * CPU_PERIOD_US as f64).round() as i64
}

/// Live view of a container as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub status: String,
    pub labels: BTreeMap<String, String>,
}

/// Length of the conventional short container id.
pub const SHORT_ID_LEN: usize = 12;

impl ContainerInfo {
    /// First 12 characters of the id, the conventional short form.
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// Operations the lifecycle core needs from a container engine.
///
/// Every method that addresses an existing container must report a missing
/// container as [`RuntimeError::ContainerNotFound`].
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create and start a detached container.
    async fn run(&self, spec: &RunSpec) -> Result<ContainerInfo, RuntimeError>;

    /// Look up a container by id.
    async fn inspect(&self, container_id: &str) -> Result<ContainerInfo, RuntimeError>;

    /// Combined stdout/stderr output of the container so far.
    async fn logs(&self, container_id: &str) -> Result<Vec<u8>, RuntimeError>;

    async fn stop(&self, container_id: &str) -> Result<(), RuntimeError>;

    async fn remove(&self, container_id: &str) -> Result<(), RuntimeError>;

    /// Containers carrying [`MANAGED_LABEL`] whose name starts with `name_prefix`.
    async fn list_managed(&self, name_prefix: &str) -> Result<Vec<ContainerInfo>, RuntimeError>;
}
