//! Memory-bounded avatar cache
//!
//! A key -> bytes store whose total value size never exceeds a fixed budget.
//! Entries are evicted oldest-insertion-first when a new value would not fit.
//! Reads never reorder entries, so a frequently served avatar is evicted just
//! as early as one that was never requested again.
//!
//! All state sits behind a single reader/writer lock: lookups share it,
//! insertions and flushes take it exclusively.

use bytes::Bytes;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

struct CacheState {
    entries: LruCache<String, Bytes>,
    size: u64,
}

/// Size-bounded cache of encoded avatar images
pub struct BoundedCache {
    state: RwLock<CacheState>,
    budget: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Point-in-time view of the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub size_bytes: u64,
    pub budget_bytes: u64,
    pub hits: u64,
    pub misses: u64,
}

impl BoundedCache {
    /// Create a cache holding at most `budget` bytes of values
    pub fn new(budget: u64) -> Self {
        Self {
            state: RwLock::new(CacheState {
                entries: LruCache::unbounded(),
                size: 0,
            }),
            budget,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up `key` without affecting eviction order
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        let state = self.state.read().await;
        let value = state.entries.peek(key).cloned();
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Insert or overwrite `key`, evicting the oldest entries until it fits.
    ///
    /// A value larger than the whole budget empties the cache and is then
    /// stored anyway.
    pub async fn put(&self, key: impl Into<String>, value: impl Into<Bytes>) {
        let key = key.into();
        let value = value.into();
        let item_size = value.len() as u64;

        let mut state = self.state.write().await;

        if let Some(previous) = state.entries.pop(&key) {
            state.size -= previous.len() as u64;
        }

        let mut evicted = 0usize;
        while state.size + item_size > self.budget {
            match state.entries.pop_lru() {
                Some((evicted_key, evicted_value)) => {
                    state.size -= evicted_value.len() as u64;
                    evicted += 1;
                    trace!("Evicted avatar '{}' ({} bytes)", evicted_key, evicted_value.len());
                }
                None => break,
            }
        }

        if evicted > 0 {
            debug!(
                "Evicted {} avatar(s) to fit '{}' ({} bytes, budget {} bytes)",
                evicted, key, item_size, self.budget
            );
        }
        if item_size > self.budget {
            debug!(
                "Avatar '{}' ({} bytes) exceeds the cache budget of {} bytes",
                key, item_size, self.budget
            );
        }

        state.entries.put(key, value);
        state.size += item_size;
    }

    /// Remove every entry, returning how many were removed
    pub async fn flush(&self) -> usize {
        let mut state = self.state.write().await;
        let removed = state.entries.len();
        state.entries.clear();
        state.size = 0;
        removed
    }

    /// Total size of all stored values in bytes
    pub async fn size(&self) -> u64 {
        self.state.read().await.size
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        CacheStats {
            entries: state.entries.len(),
            size_bytes: state.size,
            budget_bytes: self.budget,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Flush the cache every `every` until the returned handle is stopped or
    /// dropped. Returns `None` for a zero interval.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_periodic_flush(self: &Arc<Self>, every: Duration) -> Option<FlushHandle> {
        if every.is_zero() {
            return None;
        }

        let cache = Arc::clone(self);
        let token = CancellationToken::new();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = cache.flush().await;
                        if removed > 0 {
                            debug!("Periodic flush removed {} cached avatar(s)", removed);
                        } else {
                            trace!("Periodic flush: cache already empty");
                        }
                    }
                }
            }

            debug!("Periodic avatar cache flush stopped");
        });

        info!(
            "Avatar cache will be flushed every {}",
            humantime::format_duration(every)
        );

        Some(FlushHandle {
            token,
            task: Some(task),
        })
    }
}

/// Handle to the periodic flush task; stopping or dropping it ends the task
#[derive(Debug)]
pub struct FlushHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl FlushHandle {
    /// Signal the flush task to stop
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stop the flush task and wait for it to exit
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for FlushHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = BoundedCache::new(1024);
        cache.put("AS", vec![1u8, 2, 3]).await;

        assert_eq!(cache.get("AS").await, Some(Bytes::from_static(&[1, 2, 3])));
        assert_eq!(cache.get("MJW").await, None);
        assert_eq!(cache.size().await, 3);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_size() {
        let cache = BoundedCache::new(100);
        cache.put("AS", vec![0u8; 40]).await;
        cache.put("AS", vec![1u8; 10]).await;

        assert_eq!(cache.size().await, 10);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("AS").await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_evicts_oldest_insertion_first() {
        let cache = BoundedCache::new(30);
        cache.put("A", vec![0u8; 10]).await;
        cache.put("B", vec![0u8; 10]).await;
        cache.put("C", vec![0u8; 10]).await;

        // Reading "A" must not protect it from eviction
        assert!(cache.get("A").await.is_some());

        cache.put("D", vec![0u8; 10]).await;

        assert!(cache.get("A").await.is_none());
        assert!(cache.get("B").await.is_some());
        assert!(cache.get("C").await.is_some());
        assert!(cache.get("D").await.is_some());
        assert_eq!(cache.size().await, 30);
    }

    #[tokio::test]
    async fn test_evicts_until_new_entry_fits() {
        let cache = BoundedCache::new(30);
        cache.put("A", vec![0u8; 10]).await;
        cache.put("B", vec![0u8; 10]).await;
        cache.put("C", vec![0u8; 10]).await;

        cache.put("BIG", vec![0u8; 25]).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.size().await, 25);
        assert!(cache.get("BIG").await.is_some());
    }

    #[tokio::test]
    async fn test_oversized_value_empties_cache_and_is_stored() {
        let cache = BoundedCache::new(16);
        cache.put("A", vec![0u8; 8]).await;
        cache.put("B", vec![0u8; 8]).await;

        cache.put("HUGE", vec![0u8; 64]).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.size().await, 64);
        assert!(cache.get("A").await.is_none());
        assert!(cache.get("HUGE").await.is_some());
    }

    #[tokio::test]
    async fn test_flush_clears_everything() {
        let cache = BoundedCache::new(1024);
        cache.put("A", vec![0u8; 10]).await;
        cache.put("B", vec![0u8; 10]).await;

        assert_eq!(cache.flush().await, 2);
        assert!(cache.get("A").await.is_none());
        assert!(cache.get("B").await.is_none());
        assert_eq!(cache.size().await, 0);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let cache = BoundedCache::new(1024 * 1024);
        cache.put("A", vec![0u8; 10]).await;
        let _ = cache.get("A").await;
        let _ = cache.get("A").await;
        let _ = cache.get("Z").await;

        let stats = cache.stats().await;
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.size_bytes, 10);
        assert_eq!(stats.budget_bytes, 1024 * 1024);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_respect_budget() {
        let cache = Arc::new(BoundedCache::new(500));
        let mut tasks = Vec::new();
        for i in 0..32 {
            let cache = Arc::clone(&cache);
            tasks.push(tokio::spawn(async move {
                cache.put(format!("K{}", i % 8), vec![0u8; 10 + i]).await;
                let _ = cache.get(&format!("K{}", (i + 1) % 8)).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert!(cache.size().await <= 500);
    }

    #[tokio::test]
    async fn test_zero_interval_does_not_start_flush() {
        let cache = Arc::new(BoundedCache::new(1024));
        assert!(cache.start_periodic_flush(Duration::ZERO).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_flush_runs_and_stops() {
        let cache = Arc::new(BoundedCache::new(1024));
        cache.put("A", vec![0u8; 10]).await;

        let handle = cache
            .start_periodic_flush(Duration::from_secs(10))
            .expect("flush task should start");

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(cache.get("A").await.is_some(), "flushed before the interval elapsed");

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(cache.get("A").await.is_none(), "not flushed after the interval");

        handle.shutdown().await;

        cache.put("B", vec![0u8; 10]).await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(cache.get("B").await.is_some(), "flushed after shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_flush() {
        let cache = Arc::new(BoundedCache::new(1024));
        let handle = cache.start_periodic_flush(Duration::from_secs(1)).unwrap();
        drop(handle);

        // Let the task observe the cancellation
        tokio::task::yield_now().await;

        cache.put("A", vec![0u8; 10]).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(cache.get("A").await.is_some());
    }

    proptest! {
        #[test]
        fn prop_budget_never_exceeded(
            budget in 1u64..512,
            puts in prop::collection::vec((0u8..16, 0usize..128), 1..64),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            runtime.block_on(async {
                let cache = BoundedCache::new(budget);
                for (key, len) in puts {
                    cache.put(format!("K{key}"), vec![0u8; len]).await;
                    let size = cache.size().await;
                    if (len as u64) <= budget {
                        prop_assert!(size <= budget, "size {} over budget {}", size, budget);
                    } else {
                        prop_assert_eq!(size, len as u64);
                        prop_assert_eq!(cache.len().await, 1);
                    }
                }
                Ok(())
            })?;
        }
    }
}
