use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;

use crate::models::PageContent;

struct CacheEntry {
    key: String,
    inserted: Instant,
    cell: Arc<OnceCell<PageContent>>,
}

/// Bounded FIFO cache of preview content with a time-to-live.
///
/// Concurrent loads of the same key share one in-flight fetch.
pub struct PreviewCache {
    capacity: usize,
    ttl: Duration,
    entries: Mutex<VecDeque<CacheEntry>>,
}

impl std::fmt::Debug for PreviewCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewCache")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .finish()
    }
}

impl PreviewCache {
    /// Create a cache; a zero capacity is treated as one.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of cached or in-flight entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Settled content for `key`, if cached and fresh.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<PageContent> {
        let now = Instant::now();
        self.lock()
            .iter()
            .find(|entry| entry.key == key && !self.expired(entry, now))
            .and_then(|entry| entry.cell.get().cloned())
    }

    /// Cached content for `key`, or the result of `load`.
    ///
    /// Only one `load` runs per key while an entry is live.
    pub async fn get_or_load<F, Fut>(&self, key: &str, load: F) -> PageContent
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PageContent>,
    {
        let cell = self.cell_for(key);
        cell.get_or_init(load).await.clone()
    }

    /// Drop the entry for `key`.
    pub fn invalidate(&self, key: &str) {
        self.lock().retain(|entry| entry.key != key);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        entry.cell.initialized() && now.duration_since(entry.inserted) >= self.ttl
    }

    fn cell_for(&self, key: &str) -> Arc<OnceCell<PageContent>> {
        let now = Instant::now();
        let mut entries = self.lock();
        entries.retain(|entry| !self.expired(entry, now));
        if let Some(entry) = entries.iter().find(|entry| entry.key == key) {
            return Arc::clone(&entry.cell);
        }
        let cell = Arc::new(OnceCell::new());
        entries.push_back(CacheEntry {
            key: key.to_string(),
            inserted: now,
            cell: Arc::clone(&cell),
        });
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        cell
    }
}
