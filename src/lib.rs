#![allow(unused_assignments)]

//! # Container Warden
//!
//! Hands out one sandboxed container per chat user and keeps a durable record
//! of who owns what.
//!
//! ## Features
//!
//! - **One container per user**: creation is refused while a user already holds one
//! - **Durable records**: user/container associations and the blacklist live in SQLite
//! - **Startup reconciliation**: records whose container vanished are dropped before serving
//! - **Orphan sweep**: labelled containers nobody owns are reported or removed
//! - **Per-user locking**: operations for one user are serialized, different users run in parallel
//! - **Connection endpoints**: SSH and web terminal strings are read from container output
//!
//! ## Quick Start
//!
//! ```no_run
//! use container_warden::{DockerRuntime, LifecycleManager, Parser, SqliteStateStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), container_warden::Error> {
//! let config = Parser::new().load_config("warden.yaml")?;
//! config.validate()?;
//!
//! let store = SqliteStateStore::open(&config.database_path).await?;
//! store.initialize().await?;
//! let runtime = DockerRuntime::new().with_timeout(config.docker_timeout);
//!
//! let (manager, report) =
//!     LifecycleManager::bootstrap(Arc::new(store), Arc::new(runtime), &config).await?;
//! println!("{} record(s) dropped at startup", report.dropped.len());
//!
//! let created = manager.create("123456789").await?;
//! println!("ssh: {:?}", created.endpoints.ssh);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! - [`LifecycleManager`] methods take `&self` and are safe to call concurrently
//! - Each call holds the target user's lock until the store and the view agree
//! - The in-memory view is only changed after the matching store write succeeded

pub mod config;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod reconcile;
pub mod runtime;
pub mod state;

// Re-export commonly used types
pub use config::{Config, OrphanPolicy, Parser};
pub use dispatch::{Command, Dispatcher, Invocation};
pub use error::{Error, ErrorKind, Result};
pub use lifecycle::{
    ContainerView, CreatedContainer, Endpoints, LifecycleManager, LifecycleSettings,
    StatusOutcome, TeardownOutcome,
};
pub use reconcile::{ReconcileReport, Reconciler};
pub use runtime::{ContainerInfo, ContainerRuntime, DockerRuntime, RunSpec, RuntimeError};
pub use state::{BlacklistEntry, SqliteStateStore, StateStore, UserContainerRecord};
