use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Per-session locks that serialize sends against the same chat.
///
/// A send holds its session's lock from the optimistic append until the
/// reply (or the rollback) has been written, so two sends on one chat can
/// never interleave their appends and pops. Sends on different chats do
/// not contend.
pub struct SendLocks {
    locks: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SendLocks {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Waits for exclusive send access to `local_id`.
    pub async fn acquire(&self, local_id: &str) -> OwnedMutexGuard<()> {
        let existing = {
            let locks = self.locks.read().await;
            locks.get(local_id).cloned()
        };
        let lock = match existing {
            Some(lock) => lock,
            None => {
                let mut locks = self.locks.write().await;
                locks
                    .entry(local_id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(())))
                    .clone()
            }
        };
        lock.lock_owned().await
    }

    /// Drops the lock entry of a deleted session.
    pub async fn forget(&self, local_id: &str) {
        let mut locks = self.locks.write().await;
        locks.remove(local_id);
    }

    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }
}

impl Default for SendLocks {
    fn default() -> Self {
        Self::new()
    }
}
