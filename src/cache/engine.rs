//! Cache Engine Module
//!
//! Concurrent key-value table with lazy TTL expiry on read and a periodic
//! sweep that handles both time-based and memory-pressure eviction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{
    CacheEntry, MemorySampler, ProcessMemorySampler, MAX_KEY_LENGTH, MAX_VALUE_LENGTH,
};
use crate::error::{CacheError, Result};
use crate::tasks::spawn_sweeper;

// == Engine Config ==
/// Immutable engine settings, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Process memory threshold in bytes, 0 disables memory-pressure eviction
    pub max_memory_bytes: u64,
    /// Maximum entry age, zero disables TTL expiry
    pub max_item_age: Duration,
    /// Interval between sweeps; ignored when both eviction modes are off
    pub cleanup_interval: Duration,
}

impl EngineConfig {
    pub fn ttl_enabled(&self) -> bool {
        !self.max_item_age.is_zero()
    }

    pub fn memory_eviction_enabled(&self) -> bool {
        self.max_memory_bytes > 0
    }

    /// A sweeper runs iff at least one eviction mode is enabled.
    pub fn sweeping_enabled(&self) -> bool {
        self.ttl_enabled() || self.memory_eviction_enabled()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: 0,
            max_item_age: Duration::ZERO,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

// == Sweep Report ==
/// Outcome of a single sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries removed for exceeding the maximum item age
    pub expired: usize,
    /// Entries removed by the memory-pressure phase
    pub evicted: usize,
    /// Process memory reading, if the memory phase ran and sampling succeeded
    pub memory_sample: Option<u64>,
    /// Entries left after the sweep
    pub remaining: usize,
}

// == Engine Core ==
/// State shared between the engine handle, the sweeper and lazy-expiry tasks.
pub(crate) struct EngineCore {
    table: RwLock<HashMap<String, CacheEntry>>,
    config: EngineConfig,
    sampler: Arc<dyn MemorySampler>,
}

impl EngineCore {
    // == Sweep ==
    /// Stop-the-world pass over the whole table under the write lock.
    pub(crate) async fn sweep(&self) -> SweepReport {
        let mut table = self.table.write().await;
        let now = Instant::now();
        let mut report = SweepReport::default();

        if self.config.ttl_enabled() {
            let before = table.len();
            let max_age = self.config.max_item_age;
            table.retain(|_, entry| !entry.is_expired(max_age, now));
            report.expired = before - table.len();
        }

        if self.config.memory_eviction_enabled() {
            match self.sampler.sample() {
                Some(used) => {
                    report.memory_sample = Some(used);
                    if used > self.config.max_memory_bytes {
                        report.evicted = evict_oldest_half(&mut table);
                        info!(
                            "Memory usage {} bytes above threshold {}, evicted {} entries",
                            used, self.config.max_memory_bytes, report.evicted
                        );
                    }
                }
                None => warn!("Memory sample unavailable, skipping memory-pressure eviction"),
            }
        }

        report.remaining = table.len();
        report
    }

    /// Removes `key` in its own write-lock acquisition, detached from the
    /// read that found it expired.
    fn schedule_removal(self: &Arc<Self>, key: String) {
        let core = Arc::clone(self);
        tokio::spawn(async move {
            let mut table = core.table.write().await;
            let now = Instant::now();
            // A put may have refreshed the key since the read saw it expire
            let still_expired = table
                .get(&key)
                .is_some_and(|entry| entry.is_expired(core.config.max_item_age, now));
            if still_expired {
                table.remove(&key);
                debug!("Lazily removed expired key '{}'", key);
            }
        });
    }
}

/// Evicts `len / 2` entries with the oldest `stored_at`.
///
/// Uses an unstable selection, so entries sharing a timestamp at the cut
/// are chosen arbitrarily. This is pressure relief, not an LRU policy.
fn evict_oldest_half(table: &mut HashMap<String, CacheEntry>) -> usize {
    let count = table.len() / 2;
    if count == 0 {
        return 0;
    }

    let mut by_age: Vec<(Instant, String)> = table
        .iter()
        .map(|(key, entry)| (entry.stored_at, key.clone()))
        .collect();
    by_age.select_nth_unstable_by_key(count - 1, |(stored_at, _)| *stored_at);

    for (_, key) in by_age.drain(..count) {
        table.remove(&key);
    }
    count
}

// == Cache Engine ==
/// The cache engine: owns the table and, when eviction is enabled, the
/// periodic sweeper.
pub struct CacheEngine {
    core: Arc<EngineCore>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl CacheEngine {
    // == Constructor ==
    /// Creates an engine that samples this process's memory.
    ///
    /// # Panics
    /// Starting the sweeper requires a tokio runtime; constructing an engine
    /// with eviction enabled outside one panics.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_sampler(config, Arc::new(ProcessMemorySampler::new()))
    }

    /// Creates an engine with a custom memory sampler.
    pub fn with_sampler(config: EngineConfig, sampler: Arc<dyn MemorySampler>) -> Self {
        let core = Arc::new(EngineCore {
            table: RwLock::new(HashMap::new()),
            config,
            sampler,
        });

        let sweeper = if config.sweeping_enabled() {
            Some(spawn_sweeper(Arc::clone(&core), config.cleanup_interval))
        } else {
            debug!("Eviction disabled, no sweeper started");
            None
        };

        Self {
            core,
            sweeper: Mutex::new(sweeper),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.core.config
    }

    /// Whether this engine was built with a background sweeper.
    pub fn is_sweeping(&self) -> bool {
        self.core.config.sweeping_enabled()
    }

    // == Put ==
    /// Inserts or overwrites `key`, refreshing its timestamp.
    ///
    /// Returns `true` if the key already existed. Keys and values longer than
    /// 256 bytes are rejected without touching the table.
    pub async fn put(&self, key: impl Into<String>, value: impl Into<String>) -> Result<bool> {
        let key = key.into();
        let value = value.into();

        if key.len() > MAX_KEY_LENGTH || value.len() > MAX_VALUE_LENGTH {
            return Err(CacheError::Validation(format!(
                "key or value exceeds {} characters",
                MAX_KEY_LENGTH.max(MAX_VALUE_LENGTH)
            )));
        }

        let mut table = self.core.table.write().await;
        let existed = table.insert(key, CacheEntry::new(value)).is_some();
        Ok(existed)
    }

    // == Get ==
    /// Returns the value for `key` if present and not expired.
    ///
    /// An expired entry reads as absent and is handed to a detached removal
    /// task. Reads issued right after may still find it in the table.
    pub async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        {
            let table = self.core.table.read().await;
            match table.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(self.core.config.max_item_age, now) => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        self.core.schedule_removal(key.to_string());
        None
    }

    // == Sweep ==
    /// Runs one sweep pass immediately. The sweeper calls the same routine
    /// on every tick.
    pub async fn sweep(&self) -> SweepReport {
        self.core.sweep().await
    }

    // == Shutdown ==
    /// Stops the sweeper. Idempotent; the table stays usable.
    pub fn shutdown(&self) {
        let handle = match self.sweeper.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(handle) = handle {
            handle.abort();
            info!("Cache sweeper stopped");
        }
    }

    // == Length ==
    /// Number of entries in the table, including expired ones not yet removed.
    pub async fn len(&self) -> usize {
        self.core.table.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.core.table.read().await.is_empty()
    }
}

impl Drop for CacheEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("config", &self.core.config)
            .finish_non_exhaustive()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Sampler returning a fixed reading; `u64::MAX` means "unavailable".
    struct FixedSampler(AtomicU64);

    impl FixedSampler {
        fn new(bytes: u64) -> Arc<Self> {
            Arc::new(Self(AtomicU64::new(bytes)))
        }
    }

    impl MemorySampler for FixedSampler {
        fn sample(&self) -> Option<u64> {
            match self.0.load(Ordering::Relaxed) {
                u64::MAX => None,
                bytes => Some(bytes),
            }
        }
    }

    fn no_eviction() -> EngineConfig {
        EngineConfig::default()
    }

    fn ttl(secs: u64) -> EngineConfig {
        EngineConfig {
            max_item_age: Duration::from_secs(secs),
            cleanup_interval: Duration::from_secs(3600),
            ..EngineConfig::default()
        }
    }

    fn memory(threshold: u64) -> EngineConfig {
        EngineConfig {
            max_memory_bytes: threshold,
            cleanup_interval: Duration::from_secs(3600),
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let engine = CacheEngine::new(no_eviction());

        assert!(!engine.put("a", "1").await.unwrap());
        assert!(engine.put("a", "2").await.unwrap());
        assert_eq!(engine.get("a").await.as_deref(), Some("2"));
        assert_eq!(engine.get("missing").await, None);
        assert_eq!(engine.len().await, 1);
    }

    #[tokio::test]
    async fn test_put_validation_leaves_state_unchanged() {
        let engine = CacheEngine::new(no_eviction());
        engine.put("key", "original").await.unwrap();

        let long_value = "x".repeat(MAX_VALUE_LENGTH + 1);
        let result = engine.put("key", long_value).await;
        assert!(matches!(result, Err(CacheError::Validation(_))));

        let long_key = "k".repeat(MAX_KEY_LENGTH + 1);
        let result = engine.put(long_key.clone(), "v").await;
        assert!(matches!(result, Err(CacheError::Validation(_))));

        assert_eq!(engine.get("key").await.as_deref(), Some("original"));
        assert_eq!(engine.get(&long_key).await, None);
        assert_eq!(engine.len().await, 1);
    }

    #[tokio::test]
    async fn test_put_accepts_exact_bound() {
        let engine = CacheEngine::new(no_eviction());
        let key = "k".repeat(MAX_KEY_LENGTH);
        let value = "v".repeat(MAX_VALUE_LENGTH);

        assert!(!engine.put(key.clone(), value.clone()).await.unwrap());
        assert_eq!(engine.get(&key).await, Some(value));
    }

    #[tokio::test]
    async fn test_length_is_measured_in_bytes() {
        let engine = CacheEngine::new(no_eviction());
        // 129 two-byte characters: 258 bytes
        let value = "é".repeat(129);

        assert!(engine.put("k", value).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_boundary() {
        let engine = CacheEngine::new(ttl(10));
        engine.put("k", "v").await.unwrap();

        tokio::time::advance(Duration::from_millis(9_999)).await;
        assert_eq!(engine.get("k").await.as_deref(), Some("v"));

        tokio::time::advance(Duration::from_millis(2)).await;
        assert_eq!(engine.get("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lazy_expiry_removes_entry() {
        let engine = CacheEngine::new(ttl(1));
        engine.put("k", "v").await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(engine.get("k").await, None);
        // Expired but possibly not removed yet
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(engine.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lazy_expiry_spares_refreshed_key() {
        let engine = CacheEngine::new(ttl(1));
        engine.put("k", "old").await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(engine.get("k").await, None);
        // Re-put before the removal task gets to run
        engine.put("k", "new").await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(engine.get("k").await.as_deref(), Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_refreshes_timestamp() {
        let engine = CacheEngine::new(ttl(10));
        engine.put("k", "v1").await.unwrap();

        tokio::time::advance(Duration::from_secs(8)).await;
        engine.put("k", "v2").await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(engine.get("k").await.as_deref(), Some("v2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_time_phase() {
        let engine = CacheEngine::new(ttl(10));
        engine.put("old", "v").await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        engine.put("young", "v").await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;

        let report = engine.sweep().await;
        assert_eq!(report.expired, 1);
        assert_eq!(report.evicted, 0);
        assert_eq!(report.remaining, 1);
        assert_eq!(engine.get("young").await.as_deref(), Some("v"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_evicts_oldest_half_under_pressure() {
        let sampler = FixedSampler::new(2_000);
        let engine = CacheEngine::with_sampler(memory(1_000), sampler);

        for i in 0..10 {
            engine.put(format!("key{i}"), "v").await.unwrap();
            tokio::time::advance(Duration::from_millis(10)).await;
        }

        let report = engine.sweep().await;
        assert_eq!(report.evicted, 5);
        assert_eq!(report.memory_sample, Some(2_000));
        assert_eq!(engine.len().await, 5);

        for i in 0..5 {
            assert_eq!(engine.get(&format!("key{i}")).await, None);
        }
        for i in 5..10 {
            assert!(engine.get(&format!("key{i}")).await.is_some());
        }
    }

    #[tokio::test]
    async fn test_sweep_no_eviction_below_threshold() {
        let engine = CacheEngine::with_sampler(memory(1_000), FixedSampler::new(500));
        for i in 0..4 {
            engine.put(format!("key{i}"), "v").await.unwrap();
        }

        let report = engine.sweep().await;
        assert_eq!(report.evicted, 0);
        assert_eq!(report.memory_sample, Some(500));
        assert_eq!(engine.len().await, 4);
    }

    #[tokio::test]
    async fn test_sweep_single_entry_under_pressure() {
        let engine = CacheEngine::with_sampler(memory(1), FixedSampler::new(10));
        engine.put("only", "v").await.unwrap();

        let report = engine.sweep().await;
        assert_eq!(report.evicted, 0);
        assert_eq!(engine.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_sample_still_runs_time_phase() {
        let config = EngineConfig {
            max_memory_bytes: 1,
            max_item_age: Duration::from_secs(1),
            cleanup_interval: Duration::from_secs(3600),
        };
        let engine = CacheEngine::with_sampler(config, FixedSampler::new(u64::MAX));
        engine.put("stale", "v").await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        engine.put("fresh", "v").await.unwrap();

        let report = engine.sweep().await;
        assert_eq!(report.expired, 1);
        assert_eq!(report.evicted, 0);
        assert_eq!(report.memory_sample, None);
        assert_eq!(engine.get("fresh").await.as_deref(), Some("v"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_expires_unread_keys() {
        let config = EngineConfig {
            max_item_age: Duration::from_secs(1),
            cleanup_interval: Duration::from_secs(1),
            ..EngineConfig::default()
        };
        let engine = CacheEngine::new(config);
        engine.put("never_read", "v").await.unwrap();

        tokio::time::sleep(Duration::from_millis(2_500)).await;

        assert!(engine.is_empty().await);
        engine.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_max_age_never_expires() {
        let config = EngineConfig {
            max_memory_bytes: u64::MAX,
            max_item_age: Duration::ZERO,
            cleanup_interval: Duration::from_secs(1),
        };
        let engine = CacheEngine::with_sampler(config, FixedSampler::new(0));
        engine.put("k", "v").await.unwrap();

        // Several sweep intervals
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(engine.get("k").await.as_deref(), Some("v"));
        engine.shutdown();
    }

    #[tokio::test]
    async fn test_sweeping_state_fixed_by_config() {
        let disabled = CacheEngine::new(no_eviction());
        assert!(!disabled.is_sweeping());
        assert!(disabled.sweeper.lock().unwrap().is_none());

        let enabled = CacheEngine::new(ttl(5));
        assert!(enabled.is_sweeping());
        assert!(enabled.sweeper.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let engine = CacheEngine::new(ttl(5));
        engine.shutdown();
        engine.shutdown();
        assert!(engine.sweeper.lock().unwrap().is_none());

        // Table remains usable
        engine.put("k", "v").await.unwrap();
        assert_eq!(engine.get("k").await.as_deref(), Some("v"));

        let disabled = CacheEngine::new(no_eviction());
        disabled.shutdown();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_distinct_keys() {
        let engine = Arc::new(CacheEngine::new(no_eviction()));

        let handles: Vec<_> = (0..50)
            .map(|worker| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    for i in 0..20 {
                        let existed = engine
                            .put(format!("w{worker}-k{i}"), format!("v{i}"))
                            .await
                            .unwrap();
                        assert!(!existed);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(engine.len().await, 1000);
        for worker in 0..50 {
            for i in 0..20 {
                let value = engine.get(&format!("w{worker}-k{i}")).await;
                assert_eq!(value, Some(format!("v{i}")));
            }
        }
    }
}
