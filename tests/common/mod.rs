//! Shared fixtures: an in-memory container runtime and store helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use container_warden::runtime::{ContainerInfo, ContainerRuntime, RunSpec, RuntimeError, MANAGED_LABEL};
use container_warden::state::{BlacklistEntry, SqliteStateStore, StateStore, UserContainerRecord};
use container_warden::{Config, Error, LifecycleManager, ReconcileReport, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const ADMIN: &str = "1000";

/// Output a booted sandbox prints, with both endpoints present.
pub const BOOT_LOGS: &str = "starting tmate...\r\n\
    \x1b[32mssh AbCdEf@nyc1.tmate.io\x1b[0m\r\n\
    sshx ready: https://sshx.io/s/room42#secret\r\n";

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub name: String,
    pub status: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Default)]
struct FakeState {
    containers: HashMap<String, FakeContainer>,
    next_id: u64,
    run_calls: usize,
    stop_calls: usize,
    remove_calls: usize,
    fail_run: bool,
    fail_stop: bool,
    fail_remove: bool,
    fail_inspect: bool,
    fail_list: bool,
    fail_logs: bool,
    logs_calls: usize,
}

/// Container runtime double that keeps containers in a map.
pub struct FakeRuntime {
    state: Mutex<FakeState>,
    logs: Mutex<String>,
    run_delay: Duration,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            logs: Mutex::new(BOOT_LOGS.to_string()),
            run_delay: Duration::ZERO,
        }
    }

    /// Make every `run` take `delay` before it completes.
    pub fn with_run_delay(mut self, delay: Duration) -> Self {
        self.run_delay = delay;
        self
    }

    pub fn set_logs(&self, logs: &str) {
        *self.logs.lock() = logs.to_string();
    }

    /// Seed a container that exists outside the lifecycle manager.
    pub fn insert_container(&self, id: &str, name: &str, managed: bool) {
        let mut labels = BTreeMap::new();
        if managed {
            labels.insert(MANAGED_LABEL.to_string(), "true".to_string());
        }
        self.state.lock().containers.insert(
            id.to_string(),
            FakeContainer {
                name: name.to_string(),
                status: "running".to_string(),
                labels,
            },
        );
    }

    /// Delete a container behind the manager's back.
    pub fn vanish(&self, id: &str) {
        self.state.lock().containers.remove(id);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().containers.contains_key(id)
    }

    pub fn container_count(&self) -> usize {
        self.state.lock().containers.len()
    }

    pub fn container(&self, id: &str) -> Option<FakeContainer> {
        self.state.lock().containers.get(id).cloned()
    }

    pub fn run_calls(&self) -> usize {
        self.state.lock().run_calls
    }

    pub fn stop_calls(&self) -> usize {
        self.state.lock().stop_calls
    }

    pub fn remove_calls(&self) -> usize {
        self.state.lock().remove_calls
    }

    pub fn fail_run(&self, fail: bool) {
        self.state.lock().fail_run = fail;
    }

    pub fn fail_stop(&self, fail: bool) {
        self.state.lock().fail_stop = fail;
    }

    pub fn fail_remove(&self, fail: bool) {
        self.state.lock().fail_remove = fail;
    }

    pub fn fail_inspect(&self, fail: bool) {
        self.state.lock().fail_inspect = fail;
    }

    pub fn fail_list(&self, fail: bool) {
        self.state.lock().fail_list = fail;
    }

    /// Make every `logs` call fail with a non-NotFound error.
    pub fn fail_logs(&self, fail: bool) {
        self.state.lock().fail_logs = fail;
    }

    pub fn logs_calls(&self) -> usize {
        self.state.lock().logs_calls
    }

    fn info(id: &str, container: &FakeContainer) -> ContainerInfo {
        ContainerInfo {
            id: id.to_string(),
            name: container.name.clone(),
            status: container.status.clone(),
            labels: container.labels.clone(),
        }
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn run(&self, spec: &RunSpec) -> std::result::Result<ContainerInfo, RuntimeError> {
        if !self.run_delay.is_zero() {
            tokio::time::sleep(self.run_delay).await;
        }

        let mut state = self.state.lock();
        state.run_calls += 1;
        if state.fail_run {
            return Err(RuntimeError::cmd_failed(
                "docker run",
                "Unable to find image",
                Some(125),
            ));
        }

        state.next_id += 1;
        let id = format!("{:012x}{}", state.next_id, "a".repeat(52));
        let container = FakeContainer {
            name: spec.name.clone(),
            status: "running".to_string(),
            labels: spec.labels.clone(),
        };
        let info = Self::info(&id, &container);
        state.containers.insert(id, container);
        Ok(info)
    }

    async fn inspect(&self, container_id: &str) -> std::result::Result<ContainerInfo, RuntimeError> {
        let state = self.state.lock();
        if state.fail_inspect {
            return Err(RuntimeError::cmd_failed(
                "docker inspect",
                "Cannot connect to the Docker daemon",
                Some(1),
            ));
        }
        state
            .containers
            .get(container_id)
            .map(|c| Self::info(container_id, c))
            .ok_or_else(|| RuntimeError::not_found(container_id))
    }

    async fn logs(&self, container_id: &str) -> std::result::Result<Vec<u8>, RuntimeError> {
        {
            let mut state = self.state.lock();
            state.logs_calls += 1;
            if state.fail_logs {
                return Err(RuntimeError::cmd_failed("docker logs", "read timed out", Some(1)));
            }
            if !state.containers.contains_key(container_id) {
                return Err(RuntimeError::not_found(container_id));
            }
        }
        Ok(self.logs.lock().as_bytes().to_vec())
    }

    async fn stop(&self, container_id: &str) -> std::result::Result<(), RuntimeError> {
        let mut state = self.state.lock();
        state.stop_calls += 1;
        if state.fail_stop {
            return Err(RuntimeError::cmd_failed("docker stop", "daemon busy", Some(1)));
        }
        match state.containers.get_mut(container_id) {
            Some(container) => {
                container.status = "exited".to_string();
                Ok(())
            }
            None => Err(RuntimeError::not_found(container_id)),
        }
    }

    async fn remove(&self, container_id: &str) -> std::result::Result<(), RuntimeError> {
        let mut state = self.state.lock();
        state.remove_calls += 1;
        if state.fail_remove {
            return Err(RuntimeError::cmd_failed(
                "docker rm",
                "removal already in progress",
                Some(1),
            ));
        }
        state
            .containers
            .remove(container_id)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::not_found(container_id))
    }

    async fn list_managed(&self, name_prefix: &str) -> std::result::Result<Vec<ContainerInfo>, RuntimeError> {
        let state = self.state.lock();
        if state.fail_list {
            return Err(RuntimeError::cmd_failed("docker ps", "daemon unreachable", Some(1)));
        }
        Ok(state
            .containers
            .iter()
            .filter(|(_, c)| c.labels.contains_key(MANAGED_LABEL) && c.name.starts_with(name_prefix))
            .map(|(id, c)| Self::info(id, c))
            .collect())
    }
}

/// Store wrapper that can be told to fail writes.
pub struct FlakyStore {
    inner: SqliteStateStore,
    fail_put: AtomicBool,
    fail_delete: AtomicBool,
}

impl FlakyStore {
    pub async fn new() -> Self {
        Self {
            inner: ephemeral_store().await,
            fail_put: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    pub fn fail_put(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StateStore for FlakyStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserContainerRecord>> {
        self.inner.get(user_id).await
    }

    async fn put(&self, record: &UserContainerRecord) -> Result<()> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(Error::Storage("disk full".to_string()));
        }
        self.inner.put(record).await
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Error::Storage("disk full".to_string()));
        }
        self.inner.delete(user_id).await
    }

    async fn list_all(&self) -> Result<Vec<UserContainerRecord>> {
        self.inner.list_all().await
    }

    async fn is_blacklisted(&self, user_id: &str) -> Result<bool> {
        self.inner.is_blacklisted(user_id).await
    }

    async fn get_blacklist(&self, user_id: &str) -> Result<Option<BlacklistEntry>> {
        self.inner.get_blacklist(user_id).await
    }

    async fn add_blacklist(&self, entry: &BlacklistEntry) -> Result<()> {
        self.inner.add_blacklist(entry).await
    }

    async fn remove_blacklist(&self, user_id: &str) -> Result<bool> {
        self.inner.remove_blacklist(user_id).await
    }

    async fn list_blacklist(&self) -> Result<Vec<BlacklistEntry>> {
        self.inner.list_blacklist().await
    }
}

pub async fn ephemeral_store() -> SqliteStateStore {
    let store = SqliteStateStore::new_ephemeral()
        .await
        .expect("Failed to open in-memory store");
    store.initialize().await.expect("Failed to initialize store");
    store
}

/// Config with fast endpoint polling, no create cooldown and one
/// administrator.
pub fn test_config() -> Config {
    let mut config = Config::with_image("sandbox:latest");
    config.admin_ids.insert(ADMIN.to_string());
    config.endpoint_wait = Duration::from_millis(200);
    config.endpoint_poll_interval = Duration::from_millis(10);
    config.create_cooldown = Duration::ZERO;
    config
}

pub struct Harness {
    pub manager: Arc<LifecycleManager>,
    pub store: Arc<dyn StateStore>,
    pub runtime: Arc<FakeRuntime>,
    pub report: ReconcileReport,
}

pub async fn harness_with(
    store: Arc<dyn StateStore>,
    runtime: Arc<FakeRuntime>,
    config: &Config,
) -> Harness {
    let (manager, report) = LifecycleManager::bootstrap(
        Arc::clone(&store),
        Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
        config,
    )
    .await
    .expect("Failed to bootstrap manager");
    Harness {
        manager: Arc::new(manager),
        store,
        runtime,
        report,
    }
}

pub async fn harness() -> Harness {
    harness_with(
        Arc::new(ephemeral_store().await),
        Arc::new(FakeRuntime::new()),
        &test_config(),
    )
    .await
}

/// The view and the store hold exactly the same user → container mapping.
pub async fn assert_view_matches_store(harness: &Harness) {
    let stored: HashMap<String, String> = harness
        .store
        .list_all()
        .await
        .expect("list_all failed")
        .into_iter()
        .map(|r| (r.user_id, r.container_id))
        .collect();
    assert_eq!(harness.manager.view().snapshot(), stored);
}
