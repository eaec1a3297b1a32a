//! Per-conversation concurrency control.
//!
//! Turns for the same conversation are strictly serialized: each
//! conversation id maps to a `Semaphore(1)` and a turn holds the permit
//! until it completes. Turns for distinct conversations run in parallel
//! on the runtime's worker pool.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct ConversationLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for ConversationLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the turn lock for a conversation; waits behind an
    /// in-flight turn. The permit releases on drop.
    pub async fn acquire(&self, conversation_id: &str) -> OwnedSemaphorePermit {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(conversation_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };
        // The semaphore is never closed, so acquisition only fails if
        // the map entry were dropped mid-wait, which prune avoids.
        sem.acquire_owned().await.expect("conversation lock closed")
    }

    /// Drop locks that are not currently held.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| sem.available_permits() == 0);
    }

    pub fn tracked(&self) -> usize {
        self.locks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_conversation_serializes() {
        let map = Arc::new(ConversationLockMap::new());
        let p1 = map.acquire("c1").await;

        let map2 = map.clone();
        let waiter = tokio::spawn(async move {
            let _p2 = map2.acquire("c1").await;
            7
        });

        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        assert!(!waiter.is_finished());

        drop(p1);
        assert_eq!(waiter.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn distinct_conversations_run_in_parallel() {
        let map = ConversationLockMap::new();
        let _p1 = map.acquire("c1").await;
        let _p2 = map.acquire("c2").await;
        assert_eq!(map.tracked(), 2);
    }
}
