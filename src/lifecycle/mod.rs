//! Container lifecycle management.
//!
//! [`LifecycleManager`] owns the in-memory view and executes every user-facing
//! operation against the state store and the container runtime.
//!
//! # Concurrency Model
//!
//! - Each operation acquires the target user's lock from [`UserLocks`] before
//!   reading the view or the store, and holds it until both are updated or both
//!   are left unchanged.
//! - Operations for different users run in parallel; a slow `docker run` for
//!   one user never delays another.
//! - The store is written first; the view follows only if the write succeeded.
//! - Endpoint polling after `create` happens after the lock is released.

mod cooldown;
pub mod endpoints;
mod locks;
mod outcome;
mod view;

use cooldown::Cooldown;
pub use endpoints::{strip_ansi, Endpoints};
pub use locks::{UserGuard, UserLocks};
pub use outcome::{
    BlacklistOutcome, ContainerStatus, CreatedContainer, ResourceLimits, StatusOutcome, TeardownOutcome,
};
pub use view::ContainerView;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::runtime::{ContainerRuntime, RunSpec, RuntimeError, MANAGED_LABEL, USER_LABEL};
use crate::state::{BlacklistEntry, StateStore, UserContainerRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Static parameters for container creation and access control.
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub image: String,
    pub cpu_limit: f64,
    pub memory_limit: String,
    pub name_prefix: String,
    pub admin_ids: BTreeSet<String>,
    pub endpoint_wait: Duration,
    pub endpoint_poll_interval: Duration,
    pub create_cooldown: Duration,
}

impl LifecycleSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            image: config.image_name.clone(),
            cpu_limit: config.cpu_limit,
            memory_limit: config.memory_limit.clone(),
            name_prefix: config.container_name_prefix.clone(),
            admin_ids: config.admin_ids.clone(),
            endpoint_wait: config.endpoint_wait,
            endpoint_poll_interval: config.endpoint_poll_interval,
            create_cooldown: config.create_cooldown,
        }
    }

    pub fn limits(&self) -> ResourceLimits {
        ResourceLimits {
            cpus: self.cpu_limit,
            memory: self.memory_limit.clone(),
        }
    }
}

/// Deterministic container name: `{prefix}-{user}-{unix_seconds}`.
///
/// Characters Docker rejects in names are replaced with `-`.
pub fn container_name_for(prefix: &str, user_id: &str, at: DateTime<Utc>) -> String {
    let user: String = user_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("{}-{}-{}", prefix, user, at.timestamp())
}

pub struct LifecycleManager {
    store: Arc<dyn StateStore>,
    runtime: Arc<dyn ContainerRuntime>,
    view: ContainerView,
    locks: UserLocks,
    cooldown: Cooldown,
    settings: LifecycleSettings,
}

impl LifecycleManager {
    /// Build a manager around a view produced by [`crate::reconcile::Reconciler`].
    pub fn new(
        store: Arc<dyn StateStore>,
        runtime: Arc<dyn ContainerRuntime>,
        view: ContainerView,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            store,
            runtime,
            view,
            locks: UserLocks::new(),
            cooldown: Cooldown::new(settings.create_cooldown),
            settings,
        }
    }

    pub fn view(&self) -> &ContainerView {
        &self.view
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.settings.admin_ids.contains(user_id)
    }

    /// Limits applied to every container this manager creates.
    pub fn limits(&self) -> ResourceLimits {
        self.settings.limits()
    }

    /// Create a container for `user_id`.
    ///
    /// Rejected without touching the runtime if the user is blacklisted or
    /// already holds a container, or while their last admitted attempt is
    /// still inside the create cooldown.
    #[tracing::instrument(skip(self), fields(op = "create"))]
    pub async fn create(&self, user_id: &str) -> Result<CreatedContainer> {
        if let Err(retry_after) = self.cooldown.try_admit(user_id) {
            debug!("User {} is cooling down for {:?}", user_id, retry_after);
            return Err(Error::CoolingDown {
                user: user_id.to_string(),
                retry_after,
            });
        }

        let guard = self.locks.acquire(user_id).await;

        if self.store.is_blacklisted(user_id).await? {
            return Err(Error::AlreadyBlacklisted(user_id.to_string()));
        }
        if self.view.contains(user_id) {
            return Err(Error::AlreadyExists(user_id.to_string()));
        }

        let now = Utc::now();
        let name = container_name_for(&self.settings.name_prefix, user_id, now);
        let spec = RunSpec::new(
            self.settings.image.clone(),
            name,
            self.settings.cpu_limit,
            self.settings.memory_limit.clone(),
        )
        .label(MANAGED_LABEL, "true")
        .label(USER_LABEL, user_id);

        let info = self.runtime.run(&spec).await.map_err(|e| {
            warn!("Container creation for user {} failed: {}", user_id, e);
            Error::Runtime(e)
        })?;

        let record = UserContainerRecord {
            user_id: user_id.to_string(),
            container_id: info.id.clone(),
            container_name: info.name.clone(),
            created_at: now,
        };

        if let Err(e) = self.store.put(&record).await {
            error!(
                "Persisting container {} for user {} failed, discarding it: {}",
                info.short_id(),
                user_id,
                e
            );
            if let Err(cleanup) = self.stop_and_remove(&info.id).await {
                if !cleanup.is_not_found() {
                    warn!("Discarding unpersisted container {} failed: {}", info.short_id(), cleanup);
                }
            }
            return Err(e);
        }
        self.view.insert(user_id, &info.id);
        info!(
            "Created container {} ({}) for user {}",
            info.name,
            info.short_id(),
            user_id
        );

        // The record is durable; a concurrent delete during polling is fine.
        drop(guard);

        let endpoints = endpoints::wait_for_endpoints(
            self.runtime.as_ref(),
            &info.id,
            self.settings.endpoint_wait,
            self.settings.endpoint_poll_interval,
        )
        .await;

        Ok(CreatedContainer {
            record,
            endpoints,
            limits: self.limits(),
        })
    }

    /// Stop and remove the user's container and clear their record.
    #[tracing::instrument(skip(self), fields(op = "delete"))]
    pub async fn delete(&self, user_id: &str) -> Result<TeardownOutcome> {
        let _guard = self.locks.acquire(user_id).await;

        let Some(container_id) = self.view.get(user_id) else {
            return Err(Error::NotFound(user_id.to_string()));
        };
        self.teardown_locked(user_id, &container_id).await
    }

    /// Live status of the user's container.
    ///
    /// A container the runtime no longer knows is dropped from the store and
    /// the view, and reported as [`StatusOutcome::Vanished`]. `NotFound` means
    /// the user held no container at all.
    #[tracing::instrument(skip(self), fields(op = "status"))]
    pub async fn status(&self, user_id: &str) -> Result<StatusOutcome> {
        let _guard = self.locks.acquire(user_id).await;

        let Some(container_id) = self.view.get(user_id) else {
            return Err(Error::NotFound(user_id.to_string()));
        };

        match self.runtime.inspect(&container_id).await {
            Ok(info) => Ok(StatusOutcome::Live(ContainerStatus {
                container_id: info.id,
                container_name: info.name,
                status: info.status,
                limits: self.limits(),
            })),
            Err(e) if e.is_not_found() => {
                info!(
                    "Container {} of user {} vanished, clearing record",
                    container_id, user_id
                );
                self.clear_record(user_id).await?;
                Ok(StatusOutcome::Vanished)
            }
            Err(e) => Err(Error::Runtime(e)),
        }
    }

    /// Blacklist `target_id` and tear down any container they hold.
    ///
    /// The target's lock is held across both steps, so a `create` for the
    /// target that starts after this returns is always rejected.
    #[tracing::instrument(skip(self, reason), fields(op = "blacklist"))]
    pub async fn blacklist(
        &self,
        admin_id: &str,
        target_id: &str,
        reason: &str,
    ) -> Result<BlacklistOutcome> {
        if !self.is_admin(admin_id) {
            warn!("Non-admin {} attempted to blacklist {}", admin_id, target_id);
            return Err(Error::PermissionDenied);
        }

        let _guard = self.locks.acquire(target_id).await;

        let entry = BlacklistEntry::new(target_id, reason);
        self.store.add_blacklist(&entry).await?;
        info!("User {} blacklisted by {}", target_id, admin_id);

        let teardown = match self.view.get(target_id) {
            Some(container_id) => Some(self.teardown_locked(target_id, &container_id).await?),
            None => None,
        };

        Ok(BlacklistOutcome { entry, teardown })
    }

    /// Lift a blacklist entry. Returns whether an entry existed.
    #[tracing::instrument(skip(self), fields(op = "unblacklist"))]
    pub async fn unblacklist(&self, admin_id: &str, target_id: &str) -> Result<bool> {
        if !self.is_admin(admin_id) {
            warn!("Non-admin {} attempted to unblacklist {}", admin_id, target_id);
            return Err(Error::PermissionDenied);
        }

        let _guard = self.locks.acquire(target_id).await;
        let removed = self.store.remove_blacklist(target_id).await?;
        if removed {
            info!("User {} unblacklisted by {}", target_id, admin_id);
        }
        Ok(removed)
    }

    /// Membership event: the user left. Outcome is logged only.
    #[tracing::instrument(skip(self), fields(op = "departed"))]
    pub async fn on_user_departed(&self, user_id: &str) {
        let _guard = self.locks.acquire(user_id).await;

        let Some(container_id) = self.view.get(user_id) else {
            return;
        };

        match self.teardown_locked(user_id, &container_id).await {
            Ok(TeardownOutcome::ClearedWithWarning(e)) => warn!(
                "Departed user {}: record cleared but runtime reported: {}",
                user_id, e
            ),
            Ok(_) => info!("Deleted container of departed user {}", user_id),
            Err(e) => error!("Cleaning up after departed user {} failed: {}", user_id, e),
        }
    }

    /// Stop, remove, then clear the record. Caller holds the user's lock.
    async fn teardown_locked(&self, user_id: &str, container_id: &str) -> Result<TeardownOutcome> {
        let outcome = match self.stop_and_remove(container_id).await {
            Ok(()) => TeardownOutcome::Removed,
            Err(e) if e.is_not_found() => TeardownOutcome::AlreadyGone,
            Err(e) => {
                warn!(
                    "Runtime failed tearing down {} for user {}: {}; clearing record anyway",
                    container_id, user_id, e
                );
                TeardownOutcome::ClearedWithWarning(e)
            }
        };

        self.clear_record(user_id).await?;
        Ok(outcome)
    }

    /// Stop then remove. A failed stop still attempts removal; a container
    /// reported missing by either call is `ContainerNotFound`.
    async fn stop_and_remove(&self, container_id: &str) -> std::result::Result<(), RuntimeError> {
        let stop_error = match self.runtime.stop(container_id).await {
            Ok(()) => None,
            Err(e) if e.is_not_found() => return Err(e),
            Err(e) => {
                warn!("Stopping {} failed, removing anyway: {}", container_id, e);
                Some(e)
            }
        };

        match self.runtime.remove(container_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Err(e),
            Err(e) => Err(stop_error.unwrap_or(e)),
        }
    }

    /// Delete from the store, then from the view.
    async fn clear_record(&self, user_id: &str) -> Result<()> {
        self.store.delete(user_id).await?;
        self.view.remove(user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_container_name_is_deterministic() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            container_name_for("discord-bot", "123456789", at),
            format!("discord-bot-123456789-{}", at.timestamp())
        );
    }

    #[test]
    fn test_container_name_sanitizes_user_id() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(
            container_name_for("sandbox", "user/with space", at),
            "sandbox-user-with-space-1700000000"
        );
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::with_image("img");
        config.admin_ids.insert("1".to_string());
        let settings = LifecycleSettings::from_config(&config);
        assert_eq!(settings.image, "img");
        assert_eq!(settings.limits().memory, "4g");
        assert!(settings.admin_ids.contains("1"));
        assert_eq!(settings.create_cooldown, Duration::from_secs(10));
    }
}
