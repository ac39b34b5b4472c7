//! Refreshing discovery cache

use std::sync::Arc;
use std::time::{Duration, Instant};

use probe_core::{DiscoveryError, DiscoverySnapshot};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::fetcher::{SnapshotFetcher, StaticFetcher};

struct CacheState {
    snapshot: Arc<DiscoverySnapshot>,
    /// `None` once invalidated
    loaded_at: Option<Instant>,
}

impl CacheState {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.loaded_at.is_some_and(|at| at.elapsed() < ttl)
    }
}

/// What a reader found in the cache
enum Lookup {
    Fresh(Arc<DiscoverySnapshot>),
    Stale(Arc<DiscoverySnapshot>),
    Missing,
}

struct Inner {
    fetcher: Arc<dyn SnapshotFetcher>,
    ttl: Duration,
    state: RwLock<Option<CacheState>>,
    /// Held for the duration of a fetch; at most one runs at a time
    refreshing: Arc<Mutex<()>>,
}

impl Inner {
    async fn lookup(&self) -> Lookup {
        match self.state.read().await.as_ref() {
            Some(cached) if cached.is_fresh(self.ttl) => {
                Lookup::Fresh(Arc::clone(&cached.snapshot))
            }
            Some(cached) if cached.loaded_at.is_some() => {
                Lookup::Stale(Arc::clone(&cached.snapshot))
            }
            _ => Lookup::Missing,
        }
    }

    /// Fetch and publish a new snapshot. Callers hold `refreshing`.
    async fn refresh(&self) -> Result<Arc<DiscoverySnapshot>, DiscoveryError> {
        debug!(source = %self.fetcher.describe(), "refreshing discovery");
        let fetched = self.fetcher.fetch().await;

        let mut state = self.state.write().await;
        match fetched {
            Ok(snapshot) => {
                let previous = state.as_ref().map(|s| s.snapshot.fingerprint().to_string());
                if previous.as_deref() != Some(snapshot.fingerprint()) {
                    info!(
                        source = %self.fetcher.describe(),
                        fingerprint = %snapshot.fingerprint(),
                        resources = snapshot.resource_count(),
                        failed_groups = snapshot.failed_groups().len(),
                        "discovery snapshot loaded"
                    );
                }
                let snapshot = Arc::new(snapshot);
                *state = Some(CacheState {
                    snapshot: Arc::clone(&snapshot),
                    loaded_at: Some(Instant::now()),
                });
                Ok(snapshot)
            }
            Err(e) => match state.as_mut() {
                Some(stale) => {
                    warn!(error = %e, "discovery refresh failed, serving stale snapshot");
                    stale.loaded_at = Some(Instant::now());
                    Ok(Arc::clone(&stale.snapshot))
                }
                None => Err(e),
            },
        }
    }
}

/// Shares immutable discovery snapshots and refreshes them after a TTL.
///
/// Readers get an `Arc` to a point-in-time snapshot and never hold a lock
/// while resolving. Once the TTL lapses, readers keep getting the previous
/// snapshot while a single background task refreshes it. Only the first
/// load, and the first call after `invalidate`, wait for the fetch.
pub struct CachedDiscovery {
    inner: Arc<Inner>,
}

impl CachedDiscovery {
    pub fn new(fetcher: Arc<dyn SnapshotFetcher>, ttl: Duration) -> Self {
        Self::with_state(fetcher, ttl, None)
    }

    /// A cache that always serves `snapshot`
    pub fn from_snapshot(snapshot: DiscoverySnapshot) -> Self {
        let state = CacheState {
            snapshot: Arc::new(snapshot.clone()),
            loaded_at: Some(Instant::now()),
        };
        Self::with_state(
            Arc::new(StaticFetcher::new(snapshot)),
            Duration::MAX,
            Some(state),
        )
    }

    fn with_state(
        fetcher: Arc<dyn SnapshotFetcher>,
        ttl: Duration,
        state: Option<CacheState>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                ttl,
                state: RwLock::new(state),
                refreshing: Arc::new(Mutex::new(())),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// The current snapshot.
    ///
    /// An expired snapshot is returned as is and refreshed in the background.
    /// With no usable snapshot the call waits for a fetch, which concurrent
    /// callers share; dropping the future abandons that fetch and the next
    /// caller starts a new one. A failed refresh keeps serving the previous
    /// snapshot if there is one.
    pub async fn current(&self) -> Result<Arc<DiscoverySnapshot>, DiscoveryError> {
        match self.inner.lookup().await {
            Lookup::Fresh(snapshot) => Ok(snapshot),
            Lookup::Stale(snapshot) => {
                self.spawn_refresh();
                Ok(snapshot)
            }
            Lookup::Missing => {
                let _refreshing = self.inner.refreshing.lock().await;
                // Another caller may have loaded it while we waited
                if let Lookup::Fresh(snapshot) = self.inner.lookup().await {
                    return Ok(snapshot);
                }
                self.inner.refresh().await
            }
        }
    }

    /// Start a background refresh unless one is already running
    fn spawn_refresh(&self) {
        let Ok(guard) = Arc::clone(&self.inner.refreshing).try_lock_owned() else {
            return;
        };
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _refreshing = guard;
            if let Lookup::Fresh(_) = inner.lookup().await {
                return;
            }
            // Failures are logged and leave the stale snapshot in place
            let _ = inner.refresh().await;
        });
    }

    /// Force the next `current()` call to wait for a refresh
    pub async fn invalidate(&self) {
        if let Some(cached) = self.inner.state.write().await.as_mut() {
            cached.loaded_at = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use probe_core::{ApiResource, ApiResourceList};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves queued results in order, counting fetches
    struct ScriptedFetcher {
        results: Mutex<Vec<Result<DiscoverySnapshot, DiscoveryError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(mut results: Vec<Result<DiscoverySnapshot, DiscoveryError>>) -> Self {
            results.reverse();
            Self {
                results: Mutex::new(results),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SnapshotFetcher for ScriptedFetcher {
        async fn fetch(&self) -> Result<DiscoverySnapshot, DiscoveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(DiscoveryError::Unavailable("script exhausted".into())))
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    /// Answers the first fetch at once and stalls on every later one
    struct SlowFetcher {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl SnapshotFetcher for SlowFetcher {
        async fn fetch(&self) -> Result<DiscoverySnapshot, DiscoveryError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
                tokio::time::sleep(self.delay).await;
            }
            Ok(snapshot("Pod"))
        }

        fn describe(&self) -> String {
            "slow".to_string()
        }
    }

    async fn wait_for_calls(fetcher: &ScriptedFetcher, calls: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while fetcher.calls() < calls {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    fn snapshot(kind: &str) -> DiscoverySnapshot {
        DiscoverySnapshot::new(vec![ApiResourceList::new(
            "v1",
            vec![ApiResource::new(format!("{}s", kind.to_lowercase()), kind, true)],
        )])
    }

    #[tokio::test]
    async fn test_caches_within_ttl() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(snapshot("Pod"))]));
        let cache = CachedDiscovery::new(fetcher.clone(), Duration::from_secs(3600));

        let first = cache.current().await.unwrap();
        let second = cache.current().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(snapshot("Pod")),
            Ok(snapshot("Node")),
        ]));
        let cache = CachedDiscovery::new(fetcher.clone(), Duration::from_secs(3600));

        let first = cache.current().await.unwrap();
        cache.invalidate().await;
        let second = cache.current().await.unwrap();

        assert_eq!(fetcher.calls(), 2);
        assert_ne!(first.fingerprint(), second.fingerprint());
    }

    #[tokio::test]
    async fn test_serves_stale_snapshot_on_refresh_failure() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(snapshot("Pod")),
            Err(DiscoveryError::Unavailable("connection refused".into())),
        ]));
        let cache = CachedDiscovery::new(fetcher.clone(), Duration::ZERO);

        let first = cache.current().await.unwrap();
        let stale = cache.current().await.unwrap();
        assert!(Arc::ptr_eq(&first, &stale));

        wait_for_calls(&fetcher, 2).await;
        let after = cache.current().await.unwrap();
        assert!(Arc::ptr_eq(&first, &after));
    }

    #[tokio::test]
    async fn test_expired_snapshot_is_replaced_in_background() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(snapshot("Pod")),
            Ok(snapshot("Node")),
        ]));
        let cache = CachedDiscovery::new(fetcher.clone(), Duration::ZERO);

        let first = cache.current().await.unwrap();
        let stale = cache.current().await.unwrap();
        assert!(Arc::ptr_eq(&first, &stale));

        let refreshed = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let current = cache.current().await.unwrap();
                if current.fingerprint() != first.fingerprint() {
                    return current;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(refreshed.resource_count(), 1);
    }

    #[tokio::test]
    async fn test_slow_refresh_does_not_block_readers() {
        let fetcher = Arc::new(SlowFetcher {
            calls: AtomicUsize::new(0),
            delay: Duration::from_secs(2),
        });
        let cache = CachedDiscovery::new(fetcher.clone(), Duration::ZERO);
        let first = cache.current().await.unwrap();

        for _ in 0..5 {
            let stale = tokio::time::timeout(Duration::from_millis(500), cache.current())
                .await
                .expect("reader blocked behind refresh")
                .unwrap();
            assert!(Arc::ptr_eq(&first, &stale));
        }

        // One background refresh is in flight, the rest were skipped
        tokio::time::timeout(Duration::from_secs(1), async {
            while fetcher.calls.load(Ordering::SeqCst) < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_first_refresh_failure_is_returned() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(
            DiscoveryError::Unavailable("connection refused".into()),
        )]));
        let cache = CachedDiscovery::new(fetcher, Duration::from_secs(60));

        let err = cache.current().await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(snapshot("Pod"))]));
        let cache = Arc::new(CachedDiscovery::new(
            fetcher.clone(),
            Duration::from_secs(3600),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.current().await.map(|s| s.resource_count()) })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 1);
        }
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_from_snapshot() {
        let cache = CachedDiscovery::from_snapshot(snapshot("Pod"));
        let current = cache.current().await.unwrap();
        assert_eq!(current.resource_count(), 1);

        // Invalidation refetches the same static snapshot
        cache.invalidate().await;
        let again = cache.current().await.unwrap();
        assert_eq!(current.fingerprint(), again.fingerprint());
    }
}
