use crate::runtime::SHORT_ID_LEN;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory authoritative mapping of user id to container id.
///
/// Seeded only by the reconciler and mutated only by the lifecycle manager
/// while it holds the affected user's lock, after the matching store write
/// has succeeded. The inner lock is never held across an await point.
#[derive(Debug)]
pub struct ContainerView {
    entries: RwLock<HashMap<String, String>>,
}

impl ContainerView {
    pub(crate) fn from_map(entries: HashMap<String, String>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn get(&self, user_id: &str) -> Option<String> {
        self.entries.read().get(user_id).cloned()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.entries.read().contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of the current mapping.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries.read().clone()
    }

    /// True if `container_id` belongs to any user.
    ///
    /// Ids match exactly, or by prefix when the shorter side is at least a
    /// short id long.
    pub fn owns_container(&self, container_id: &str) -> bool {
        self.entries
            .read()
            .values()
            .any(|id| same_container(id, container_id))
    }

    pub(crate) fn insert(&self, user_id: &str, container_id: &str) {
        self.entries
            .write()
            .insert(user_id.to_string(), container_id.to_string());
    }

    pub(crate) fn remove(&self, user_id: &str) -> Option<String> {
        self.entries.write().remove(user_id)
    }
}

fn same_container(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short == long || (short.len() >= SHORT_ID_LEN && long.starts_with(short))
}
