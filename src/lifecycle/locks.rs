//! Per-user mutual exclusion.
//!
//! Every lifecycle operation for a user runs while holding that user's lock,
//! so two requests for the same user can never interleave their
//! check-then-act sequences. Different users never contend.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Held for the duration of one operation on one user.
#[must_use = "the user lock is released as soon as the guard is dropped"]
pub struct UserGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Lazily created async mutex per user id.
///
/// Entries are weak so the map only retains users with an operation in
/// flight; dead entries are pruned on the next acquisition.
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`.
    pub async fn acquire(&self, user_id: &str) -> UserGuard {
        let lock = {
            let mut locks = self.locks.lock();
            locks.retain(|_, weak| weak.strong_count() > 0);
            match locks.get(user_id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(AsyncMutex::new(()));
                    locks.insert(user_id.to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };

        UserGuard {
            _guard: lock.lock_owned().await,
        }
    }
}
