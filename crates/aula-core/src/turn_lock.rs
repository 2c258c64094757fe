//! Per-conversation turn serialization. The orchestrator assumes no two
//! turns for the same conversation run concurrently; this enforces it at
//! the boundary.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

#[derive(Clone, Default)]
pub struct TurnLockManager {
    locks: Arc<Mutex<HashMap<String, Arc<Semaphore>>>>,
}

impl TurnLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire exclusive access to a conversation for one turn. The guard
    /// releases on drop.
    pub async fn acquire(&self, conversation_key: &str) -> TurnLockGuard {
        let sem = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(conversation_key.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };
        // acquire_owned only fails if the semaphore is closed, which we never do
        let permit = sem
            .acquire_owned()
            .await
            .unwrap_or_else(|_| unreachable!("turn lock semaphore closed"));
        TurnLockGuard { _permit: permit }
    }

    /// Drop semaphores nobody currently holds or waits on.
    pub async fn cleanup_unused(&self) {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, sem| Arc::strong_count(sem) > 1 || sem.available_permits() == 0);
    }
}

pub struct TurnLockGuard {
    _permit: OwnedSemaphorePermit,
}
