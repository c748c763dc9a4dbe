//! Startup alignment of stored records with the containers the runtime
//! actually has.
//!
//! Reconciliation is the only way to obtain a [`ContainerView`], so a
//! [`LifecycleManager`] never serves requests from unreconciled state.

use crate::config::{Config, OrphanPolicy};
use crate::error::Result;
use crate::lifecycle::{ContainerView, LifecycleManager, LifecycleSettings};
use crate::runtime::{ContainerInfo, ContainerRuntime};
use crate::state::{StateStore, UserContainerRecord};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// What one reconciliation pass did.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ReconcileReport {
    /// Records whose container is still present.
    pub kept: Vec<String>,
    /// Users whose container had vanished; their records were deleted.
    pub dropped: Vec<String>,
    /// Records kept because the runtime could not be asked about them.
    pub unverified: Vec<String>,
    /// Labelled containers without a record, as `name (short id)`.
    pub orphans: Vec<String>,
    pub orphans_removed: usize,
}

pub struct Reconciler {
    store: Arc<dyn StateStore>,
    runtime: Arc<dyn ContainerRuntime>,
    orphan_policy: OrphanPolicy,
    name_prefix: String,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn StateStore>,
        runtime: Arc<dyn ContainerRuntime>,
        orphan_policy: OrphanPolicy,
        name_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            runtime,
            orphan_policy,
            name_prefix: name_prefix.into(),
        }
    }

    /// Build the initial view. Storage errors abort; runtime errors other
    /// than a missing container keep the record.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<(ContainerView, ReconcileReport)> {
        let records = self.store.list_all().await?;
        let mut report = ReconcileReport::default();
        let mut entries = HashMap::with_capacity(records.len());

        for record in records {
            let UserContainerRecord {
                user_id,
                container_id,
                ..
            } = record;

            if container_id.trim().is_empty() {
                self.store.delete(&user_id).await?;
                warn!("Dropped record for user {}: no container id stored", user_id);
                report.dropped.push(user_id);
                continue;
            }

            match self.runtime.inspect(&container_id).await {
                Ok(_) => {
                    report.kept.push(user_id.clone());
                    entries.insert(user_id, container_id);
                }
                Err(e) if e.is_not_found() => {
                    self.store.delete(&user_id).await?;
                    info!(
                        "Dropped record for user {}: container {} no longer exists",
                        user_id, container_id
                    );
                    report.dropped.push(user_id);
                }
                Err(e) => {
                    warn!(
                        "Could not verify container {} for user {}, keeping record: {}",
                        container_id, user_id, e
                    );
                    report.unverified.push(user_id.clone());
                    entries.insert(user_id, container_id);
                }
            }
        }

        let view = ContainerView::from_map(entries);
        self.sweep_orphans(&view, &mut report).await;

        info!(
            "Reconciled {} record(s): {} kept, {} dropped, {} unverified",
            report.kept.len() + report.dropped.len() + report.unverified.len(),
            report.kept.len(),
            report.dropped.len(),
            report.unverified.len()
        );
        Ok((view, report))
    }

    /// Labelled containers nobody owns. Failures here are logged, never fatal.
    async fn sweep_orphans(&self, view: &ContainerView, report: &mut ReconcileReport) {
        if self.orphan_policy == OrphanPolicy::Ignore {
            return;
        }

        let managed = match self.runtime.list_managed(&self.name_prefix).await {
            Ok(managed) => managed,
            Err(e) => {
                warn!("Listing managed containers failed, skipping orphan sweep: {}", e);
                return;
            }
        };

        let orphans: Vec<ContainerInfo> = managed
            .into_iter()
            .filter(|c| !view.owns_container(&c.id))
            .collect();

        for orphan in orphans {
            let label = format!("{} ({})", orphan.name, orphan.short_id());
            match self.orphan_policy {
                OrphanPolicy::Ignore => {}
                OrphanPolicy::Report => {
                    warn!("Orphaned container {} has no record", label);
                }
                OrphanPolicy::Remove => {
                    if self.remove_orphan(&orphan).await {
                        info!("Removed orphaned container {}", label);
                        report.orphans_removed += 1;
                    }
                }
            }
            report.orphans.push(label);
        }
    }

    async fn remove_orphan(&self, orphan: &ContainerInfo) -> bool {
        if let Err(e) = self.runtime.stop(&orphan.id).await {
            if e.is_not_found() {
                return true;
            }
            warn!("Stopping orphan {} failed: {}", orphan.short_id(), e);
        }
        match self.runtime.remove(&orphan.id).await {
            Ok(()) => true,
            Err(e) if e.is_not_found() => true,
            Err(e) => {
                warn!("Removing orphan {} failed: {}", orphan.short_id(), e);
                false
            }
        }
    }
}

impl LifecycleManager {
    /// Reconcile and build a manager in one step.
    pub async fn bootstrap(
        store: Arc<dyn StateStore>,
        runtime: Arc<dyn ContainerRuntime>,
        config: &Config,
    ) -> Result<(Self, ReconcileReport)> {
        let reconciler = Reconciler::new(
            Arc::clone(&store),
            Arc::clone(&runtime),
            config.orphan_policy,
            config.container_name_prefix.clone(),
        );
        let (view, report) = reconciler.reconcile().await?;
        let manager = LifecycleManager::new(store, runtime, view, LifecycleSettings::from_config(config));
        Ok((manager, report))
    }
}
