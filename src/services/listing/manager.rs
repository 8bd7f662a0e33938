use super::backend::{DirectoryLister, FileEntry};
use async_trait::async_trait;
use lru::LruCache;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

type ListingResult = io::Result<Vec<FileEntry>>;

/// In-flight fetches keyed by cache epoch and path
type PendingListings = Arc<Mutex<HashMap<(u64, String), Vec<oneshot::Sender<ListingResult>>>>>;

type ListingCache = Arc<Mutex<LruCache<String, Vec<FileEntry>>>>;

/// Data-fetching layer between the tree and a directory lister
///
/// - Request deduplication (concurrent requests for the same path share one
///   backend call)
/// - LRU cache of successful listings keyed by path
///
/// Failures are handed to every waiter but never cached. The backend call runs
/// in its own task, so a caller that gives up (timeout, abort) does not strand
/// the other waiters.
pub struct ListingManager {
    backend: Arc<dyn DirectoryLister>,
    /// Map of (epoch, path) -> channels waiting for the in-flight result
    pending: PendingListings,
    /// `None` when caching is disabled
    cache: Option<ListingCache>,
    /// Bumped by `clear_cache`; fetches started in an older epoch neither fill
    /// the cache nor take new waiters
    epoch: Arc<AtomicU64>,
}

impl fmt::Debug for ListingManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListingManager")
            .field("backend", &"<dyn DirectoryLister>")
            .field("pending", &"<mutex>")
            .field("cached", &self.cache.is_some())
            .field("epoch", &self.epoch.load(Ordering::SeqCst))
            .finish()
    }
}

impl ListingManager {
    /// Create a manager without a listing cache
    pub fn new(backend: Arc<dyn DirectoryLister>) -> Self {
        Self::with_cache_capacity(backend, 0)
    }

    /// Create a manager caching up to `capacity` listings (0 disables caching)
    pub fn with_cache_capacity(backend: Arc<dyn DirectoryLister>, capacity: usize) -> Self {
        Self {
            backend,
            pending: Arc::new(Mutex::new(HashMap::new())),
            cache: NonZeroUsize::new(capacity).map(|cap| Arc::new(Mutex::new(LruCache::new(cap)))),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    async fn cached(&self, path: &str) -> Option<Vec<FileEntry>> {
        let cache = self.cache.as_ref()?;
        let entries = cache.lock().await.get(path).cloned()?;
        tracing::debug!("listing cache hit for {:?}", path);
        Some(entries)
    }

    /// List a directory, sharing in-flight requests and cached results
    ///
    /// Must be called from within a tokio runtime.
    pub async fn list(&self, path: &str) -> io::Result<Vec<FileEntry>> {
        if let Some(entries) = self.cached(path).await {
            return Ok(entries);
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let key = (epoch, path.to_string());
        let rx = {
            let mut pending = self.pending.lock().await;

            // The fetch task fills the cache before it leaves `pending`
            if let Some(entries) = self.cached(path).await {
                return Ok(entries);
            }

            let (tx, rx) = oneshot::channel();
            if let Some(senders) = pending.get_mut(&key) {
                // Somebody else is already fetching this path
                senders.push(tx);
            } else {
                pending.insert(key.clone(), vec![tx]);
                self.spawn_fetch(key);
            }
            rx
        };

        rx.await
            .unwrap_or_else(|_| Err(io::Error::other("Request cancelled")))
    }

    /// Run the backend call detached and hand the result to every waiter
    fn spawn_fetch(&self, key: (u64, String)) {
        let backend = Arc::clone(&self.backend);
        let pending = Arc::clone(&self.pending);
        let cache = self.cache.clone();
        let epoch = Arc::clone(&self.epoch);

        tokio::spawn(async move {
            let path = key.1.clone();
            let fetch = tokio::spawn(async move { backend.list_directory(&path).await });
            let result = match fetch.await {
                Ok(result) => result,
                Err(e) => Err(io::Error::other(format!("listing task failed: {e}"))),
            };

            if let (Ok(entries), Some(cache)) = (&result, &cache) {
                let mut cache = cache.lock().await;
                if epoch.load(Ordering::SeqCst) == key.0 {
                    cache.put(key.1.clone(), entries.clone());
                } else {
                    tracing::debug!("not caching {:?} fetched before the cache was cleared", key.1);
                }
            }

            // Notify all waiting requesters
            let senders = pending.lock().await.remove(&key).unwrap_or_default();
            for sender in senders {
                let _ = sender.send(
                    result
                        .as_ref()
                        .map(|v| v.clone())
                        .map_err(|e| io::Error::new(e.kind(), e.to_string())),
                );
            }
        });
    }

    /// Drop one cached listing
    pub async fn invalidate(&self, path: &str) {
        if let Some(cache) = &self.cache {
            cache.lock().await.pop(path);
        }
    }

    /// Drop every cached listing (a remount starts from the server again)
    ///
    /// Fetches already in flight still answer their waiters, but their
    /// results are not cached and later requests start fresh fetches.
    pub async fn clear_cache(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(cache) = &self.cache {
            cache.lock().await.clear();
        }
    }

    /// Number of listings currently cached
    pub async fn cached_len(&self) -> usize {
        match &self.cache {
            Some(cache) => cache.lock().await.len(),
            None => 0,
        }
    }

    /// Get the underlying backend
    pub fn backend(&self) -> &Arc<dyn DirectoryLister> {
        &self.backend
    }
}

impl Clone for ListingManager {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            pending: Arc::clone(&self.pending),
            cache: self.cache.clone(),
            epoch: Arc::clone(&self.epoch),
        }
    }
}

#[async_trait]
impl DirectoryLister for ListingManager {
    async fn list_directory(&self, path: &str) -> io::Result<Vec<FileEntry>> {
        self.list(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::listing::{FixtureConfig, FixtureLister};
    use std::time::Duration;

    fn fixture() -> FixtureLister {
        FixtureLister::new()
            .with_listing(
                "",
                vec![FileEntry::dir("public", 1), FileEntry::dir("q-lab1", 2)],
            )
            .with_listing(
                "q-lab1",
                vec![FileEntry::file("a.txt", 1), FileEntry::file("b.txt", 2)],
            )
    }

    #[tokio::test]
    async fn test_list_passes_through() {
        let backend = Arc::new(fixture());
        let manager = ListingManager::new(backend.clone());

        let entries = manager.list("q-lab1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(backend.metrics().list_calls, 1);
    }

    #[tokio::test]
    async fn test_request_deduplication() {
        let backend = Arc::new(
            fixture().with_config(FixtureConfig::uniform(Duration::from_millis(50))),
        );
        let manager = ListingManager::new(backend.clone());

        let mut handles = vec![];
        for _ in 0..10 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move { manager.list("q-lab1").await }));
        }

        for handle in handles {
            let entries = handle.await.unwrap().unwrap();
            assert_eq!(entries.len(), 2);
        }

        assert_eq!(backend.metrics().calls_for("q-lab1"), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_backend() {
        let backend = Arc::new(fixture());
        let manager = ListingManager::with_cache_capacity(backend.clone(), 8);

        manager.list("").await.unwrap();
        manager.list("").await.unwrap();
        assert_eq!(backend.metrics().calls_for(""), 1);
        assert_eq!(manager.cached_len().await, 1);

        manager.clear_cache().await;
        manager.list("").await.unwrap();
        assert_eq!(backend.metrics().calls_for(""), 2);
    }

    #[tokio::test]
    async fn test_invalidate_single_path() {
        let backend = Arc::new(fixture());
        let manager = ListingManager::with_cache_capacity(backend.clone(), 8);

        manager.list("").await.unwrap();
        manager.list("q-lab1").await.unwrap();
        manager.invalidate("q-lab1").await;

        manager.list("").await.unwrap();
        manager.list("q-lab1").await.unwrap();
        assert_eq!(backend.metrics().calls_for(""), 1);
        assert_eq!(backend.metrics().calls_for("q-lab1"), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let backend = Arc::new(fixture().with_failure("q-lab1"));
        let manager = ListingManager::with_cache_capacity(backend.clone(), 8);

        assert!(manager.list("q-lab1").await.is_err());
        backend.clear_failure("q-lab1");
        assert_eq!(manager.list("q-lab1").await.unwrap().len(), 2);
        assert_eq!(backend.metrics().calls_for("q-lab1"), 2);
    }

    #[tokio::test]
    async fn test_abandoned_request_does_not_strand_later_callers() {
        let backend = Arc::new(
            fixture().with_config(FixtureConfig::uniform(Duration::from_millis(200))),
        );
        let manager = ListingManager::new(backend.clone());

        // The first caller gives up long before the backend answers
        let first = tokio::time::timeout(Duration::from_millis(20), manager.list("q-lab1")).await;
        assert!(first.is_err());

        let second = tokio::time::timeout(Duration::from_secs(2), manager.list_directory("q-lab1"))
            .await
            .expect("second request must not hang");
        assert_eq!(second.unwrap().len(), 2);
        assert_eq!(backend.metrics().calls_for("q-lab1"), 1);
        assert!(manager.pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_aborted_caller_still_fills_cache() {
        let backend = Arc::new(
            fixture().with_config(FixtureConfig::uniform(Duration::from_millis(50))),
        );
        let manager = ListingManager::with_cache_capacity(backend.clone(), 8);

        let caller = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.list("q-lab1").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        caller.abort();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(manager.cached_len().await, 1);
        manager.list("q-lab1").await.unwrap();
        assert_eq!(backend.metrics().calls_for("q-lab1"), 1);
    }

    #[tokio::test]
    async fn test_clear_cache_ignores_fetches_in_flight() {
        let backend = Arc::new(
            fixture().with_config(FixtureConfig::uniform(Duration::from_millis(100))),
        );
        let manager = ListingManager::with_cache_capacity(backend.clone(), 8);

        let before = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.list("").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        manager.clear_cache().await;

        // A request after the clear does not join the older fetch
        let after = manager.list("").await.unwrap();
        assert_eq!(after.len(), 2);
        assert_eq!(before.await.unwrap().unwrap().len(), 2);
        assert_eq!(backend.metrics().calls_for(""), 2);

        // Only the post-clear listing made it into the cache
        assert_eq!(manager.cached_len().await, 1);
        manager.list("").await.unwrap();
        assert_eq!(backend.metrics().calls_for(""), 2);
    }

    #[tokio::test]
    async fn test_cache_filled_while_waiting_for_pending_lock() {
        let backend = Arc::new(fixture());
        let manager = ListingManager::with_cache_capacity(backend.clone(), 8);

        let guard = manager.pending.lock().await;
        let request = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.list("q-lab1").await })
        };
        // Let the request miss the cache and block on the pending map
        tokio::time::sleep(Duration::from_millis(20)).await;

        let cached = vec![FileEntry::file("cached.txt", 1)];
        if let Some(cache) = &manager.cache {
            cache.lock().await.put("q-lab1".to_string(), cached.clone());
        }
        drop(guard);

        assert_eq!(request.await.unwrap().unwrap(), cached);
        assert_eq!(backend.metrics().calls_for("q-lab1"), 0);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let manager = ListingManager::new(Arc::new(fixture()));
        let err = manager.list("nowhere").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
