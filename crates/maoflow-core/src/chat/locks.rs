//! Per-conversation serialization of finalize writes.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Keyed async mutexes, one per conversation with a finalize in flight.
///
/// Entries are created on demand and removed once nobody holds or waits
/// on them.
#[derive(Debug, Default)]
pub struct ConversationLocks {
    inner: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fut` while holding the lock for `conversation_id`.
    pub async fn run_exclusive<F: Future>(&self, conversation_id: Uuid, fut: F) -> F::Output {
        let lock = Arc::clone(self.inner.entry(conversation_id).or_default().value());
        let output = {
            let _guard = lock.lock().await;
            fut.await
        };
        drop(lock);
        self.inner
            .remove_if(&conversation_id, |_, lock| Arc::strong_count(lock) == 1);
        output
    }

    /// Number of conversations with a lock entry.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_conversation_is_serialized() {
        let locks = Arc::new(ConversationLocks::new());
        let id = Uuid::now_v7();
        let inside = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                locks
                    .run_exclusive(id, async {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_conversations_do_not_block() {
        let locks = ConversationLocks::new();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();

        let result = locks
            .run_exclusive(a, async { locks.run_exclusive(b, async { 7 }).await })
            .await;

        assert_eq!(result, 7);
        assert_eq!(locks.len(), 0);
    }
}
