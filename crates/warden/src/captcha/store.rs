//! Bounded in-memory store of outstanding CAPTCHA answers.
//!
//! Entries expire lazily on access and are reclaimed by `sweep`, which runs
//! eagerly when the store is full and periodically from `sweep_worker`.
//! Capacity is best effort: a full store is swept once before rejecting.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use warden_common::WardenError;

struct Entry {
    digits: Vec<u8>,
    created_at: Instant,
}

impl Entry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Expiring `challenge_id -> digits` map guarded by one reader/writer lock
pub struct CaptchaStore {
    entries: RwLock<HashMap<String, Entry>>,
    capacity: usize,
    ttl: Duration,
}

impl CaptchaStore {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(capacity)),
            capacity,
            ttl,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store an answer, sweeping expired entries first if the store is full
    pub async fn insert(&self, id: String, digits: Vec<u8>) -> Result<(), WardenError> {
        let mut entries = self.entries.write().await;

        if entries.len() >= self.capacity && !entries.contains_key(&id) {
            let removed = Self::sweep_locked(&mut entries, self.ttl);
            if entries.len() >= self.capacity {
                tracing::warn!(
                    capacity = self.capacity,
                    swept = removed,
                    "CAPTCHA store full"
                );
                return Err(WardenError::StorageFull);
            }
        }

        entries.insert(
            id,
            Entry {
                digits,
                created_at: Instant::now(),
            },
        );
        Ok(())
    }

    /// Remove an entry and return its digits if it had not expired.
    ///
    /// The entry is gone afterwards whatever the outcome.
    pub async fn take(&self, id: &str) -> Option<Vec<u8>> {
        let entry = self.entries.write().await.remove(id)?;
        if entry.is_expired(self.ttl) {
            return None;
        }
        Some(entry.digits)
    }

    /// True if a live (unexpired) entry exists
    #[cfg(test)]
    pub(crate) async fn contains(&self, id: &str) -> bool {
        self.entries
            .read()
            .await
            .get(id)
            .is_some_and(|entry| !entry.is_expired(self.ttl))
    }

    /// Number of entries, including expired ones not yet swept
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Remove all expired entries, returning how many were dropped
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        Self::sweep_locked(&mut entries, self.ttl)
    }

    fn sweep_locked(entries: &mut HashMap<String, Entry>, ttl: Duration) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(ttl));
        before - entries.len()
    }

    #[cfg(test)]
    pub(crate) async fn peek(&self, id: &str) -> Option<Vec<u8>> {
        self.entries.read().await.get(id).map(|e| e.digits.clone())
    }
}

/// Background worker that periodically sweeps expired challenges
pub async fn sweep_worker(
    store: Arc<CaptchaStore>,
    interval: Duration,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    tracing::info!(interval_secs = interval.as_secs(), "CAPTCHA sweeper started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = store.sweep().await;
                if removed > 0 {
                    tracing::debug!(removed = removed, "Swept expired CAPTCHAs");
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("CAPTCHA sweeper shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn test_take_is_one_shot() {
        let store = CaptchaStore::new(10, TTL);
        store.insert("abc".into(), vec![1, 2, 3]).await.unwrap();

        assert!(store.contains("abc").await);
        assert_eq!(store.take("abc").await, Some(vec![1, 2, 3]));
        assert_eq!(store.take("abc").await, None);
        assert!(!store.contains("abc").await);
        assert_eq!(store.take("missing").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_not_returned() {
        let store = CaptchaStore::new(10, TTL);
        store.insert("old".into(), vec![9]).await.unwrap();

        tokio::time::advance(TTL).await;
        assert!(store.contains("old").await, "age == ttl is still live");

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!store.contains("old").await);
        assert_eq!(store.take("old").await, None);
        // Removed even though it had expired.
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_store_sweeps_then_inserts() {
        let store = CaptchaStore::new(2, TTL);
        store.insert("a".into(), vec![1]).await.unwrap();
        store.insert("b".into(), vec![2]).await.unwrap();

        tokio::time::advance(TTL + Duration::from_secs(1)).await;

        store.insert("c".into(), vec![3]).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert!(store.contains("c").await);
    }

    #[tokio::test]
    async fn test_full_store_rejects_when_nothing_expired() {
        let store = CaptchaStore::new(2, TTL);
        store.insert("a".into(), vec![1]).await.unwrap();
        store.insert("b".into(), vec![2]).await.unwrap();

        let result = store.insert("c".into(), vec![3]).await;
        assert!(matches!(result, Err(WardenError::StorageFull)));
        assert_eq!(store.len().await, 2);

        // Consuming one frees a slot.
        store.take("a").await;
        tokio_test::assert_ok!(store.insert("c".into(), vec![3]).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_counts_removed() {
        let store = CaptchaStore::new(10, TTL);
        store.insert("a".into(), vec![1]).await.unwrap();
        store.insert("b".into(), vec![2]).await.unwrap();

        tokio::time::advance(Duration::from_secs(200)).await;
        store.insert("c".into(), vec![3]).await.unwrap();
        tokio::time::advance(Duration::from_secs(101)).await;

        assert_eq!(store.sweep().await, 2);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.sweep().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_worker_stops_on_shutdown() {
        let store = Arc::new(CaptchaStore::new(10, Duration::from_secs(5)));
        store.insert("a".into(), vec![1]).await.unwrap();

        let (tx, rx) = tokio::sync::broadcast::channel(1);
        let worker = tokio::spawn(sweep_worker(store.clone(), Duration::from_secs(10), rx));

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(store.len().await, 0);

        tx.send(()).unwrap();
        tokio_test::assert_ok!(worker.await);
    }
}
