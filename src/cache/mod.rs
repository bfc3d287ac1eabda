//! Client-side registry cache
//!
//! [`CachedServiceRegistry`] keeps an eventually consistent copy of the
//! remote registry. A one-shot bootstrap task installs the first full
//! snapshot; a periodic task pulls deltas, merges them, and reconciles the
//! local instance count against the server's, refetching in full on drift.
//!
//! # Publication
//!
//! The current [`Snapshot`] lives in an [`ArcSwap`]. Readers load it
//! without locking and keep whatever `Arc` they got; nothing they hold is
//! ever mutated. Writers always publish a new snapshot:
//!
//! | Path | Lock | Install |
//! |------|------|---------|
//! | Bootstrap / forced full fetch | none | CAS retried until it lands |
//! | Delta merge | merge lock | copy, apply batch, CAS; replay on a lost race |
//! | Reconcile refetch | merge lock | CAS retried until it lands |
//!
//! Concurrent full installs race freely: the last CAS wins.

mod backoff;
mod metrics;

pub use backoff::BackoffPolicy;
pub use metrics::{CacheMetrics, MetricsSnapshot};

use crate::error::{RegCacheError, RegCacheResult};
use crate::registry::{DeltaRegistry, MergeStats, Snapshot};
use crate::transport::RegistryTransport;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Longest delta period the cache will schedule
pub const MAX_FETCH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Runtime tunables for the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Period of the delta task (default: 30 seconds)
    pub fetch_interval: Duration,

    /// Recency window requested from the transport (default: 3 minutes)
    pub delta_window: Duration,

    /// Retry policy for the bootstrap full fetch
    pub bootstrap: BackoffPolicy,
}

impl CacheSettings {
    /// `fetch_interval` clamped to `1ms..=MAX_FETCH_INTERVAL`
    pub fn effective_fetch_interval(&self) -> Duration {
        self.fetch_interval
            .clamp(Duration::from_millis(1), MAX_FETCH_INTERVAL)
    }
}

/// Ticker whose first tick fires after `delay` rather than immediately
pub(crate) fn delayed_ticker(delay: Duration, period: Duration) -> Interval {
    let mut ticker = match Instant::now().checked_add(delay) {
        Some(start) => interval_at(start, period),
        None => interval(period),
    };
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Resolve once the shutdown flag is set
///
/// The `watch::Ref` from `wait_for` is not `Send`; drop it before returning.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await.map(|_| ());
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            fetch_interval: Duration::from_secs(30),
            delta_window: Duration::from_secs(180),
            bootstrap: BackoffPolicy::default(),
        }
    }
}

/// Result of one delta cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    pub merge: MergeStats,

    /// Whether reconcile found drift and installed a fresh full snapshot
    pub refetched: bool,
}

/// Process-scoped registry cache
///
/// Construct once, wrap in an `Arc`, call [`initialize`](Self::initialize)
/// from inside a tokio runtime, and hand clones of the `Arc` to consumers.
/// The background tasks keep the cache alive until
/// [`destroy`](Self::destroy) is awaited.
pub struct CachedServiceRegistry {
    transport: Arc<dyn RegistryTransport>,
    settings: CacheSettings,
    current: ArcSwap<Snapshot>,
    /// Serializes read-modify-write of the live snapshot (merge + reconcile)
    merge_lock: tokio::sync::Mutex<()>,
    metrics: CacheMetrics,
    started: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    bootstrap_task: Mutex<Option<JoinHandle<()>>>,
    delta_task: Mutex<Option<JoinHandle<()>>>,
}

impl CachedServiceRegistry {
    /// Create a cache holding an empty snapshot
    pub fn new(transport: Arc<dyn RegistryTransport>, settings: CacheSettings) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            transport,
            settings,
            current: ArcSwap::from_pointee(Snapshot::empty()),
            merge_lock: tokio::sync::Mutex::new(()),
            metrics: CacheMetrics::new(),
            started: AtomicBool::new(false),
            shutdown_tx,
            bootstrap_task: Mutex::new(None),
            delta_task: Mutex::new(None),
        }
    }

    /// Start the bootstrap full fetch and the periodic delta task
    ///
    /// Returns immediately; reads see an empty snapshot until the bootstrap
    /// fetch lands. Fails with `AlreadyInitialized` on a second call.
    pub fn initialize(self: &Arc<Self>) -> RegCacheResult<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| RegCacheError::Internal(format!("initialize outside tokio runtime: {e}")))?;

        if self.started.swap(true, Ordering::AcqRel) {
            return Err(RegCacheError::AlreadyInitialized);
        }

        info!(
            transport = self.transport.transport_name(),
            interval_secs = self.settings.fetch_interval.as_secs(),
            window_secs = self.settings.delta_window.as_secs(),
            "Initializing registry cache"
        );

        let this = Arc::clone(self);
        let bootstrap = runtime.spawn(async move {
            if let Err(e) = this.bootstrap().await {
                error!("{}", e);
            }
        });

        let this = Arc::clone(self);
        let delta = runtime.spawn(async move { this.run_delta_loop().await });

        *lock(&self.bootstrap_task) = Some(bootstrap);
        *lock(&self.delta_task) = Some(delta);
        Ok(())
    }

    /// Current snapshot; never blocks, empty before the first fetch
    pub fn registry(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn is_initialized(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Stop background work
    ///
    /// The delta task finishes its current cycle before exiting. A bootstrap
    /// fetch still in flight is abandoned. Safe to call more than once.
    pub async fn destroy(&self) {
        self.shutdown_tx.send_replace(true);

        if let Some(handle) = lock(&self.bootstrap_task).take() {
            handle.abort();
        }

        let delta = lock(&self.delta_task).take();
        if let Some(handle) = delta {
            if let Err(e) = handle.await {
                warn!("Delta fetch task ended abnormally: {}", e);
            }
        }

        info!("Registry cache stopped");
    }

    /// Fetch a full snapshot and install it, bypassing the delta path
    pub async fn refresh_full(&self) -> RegCacheResult<Arc<Snapshot>> {
        let snapshot = self.transport.fetch_full_registry().await?;
        Ok(self.install_full(snapshot))
    }

    /// Run one delta cycle: fetch, merge, reconcile
    ///
    /// Used by the periodic task; callable directly to force a sync.
    pub async fn sync_once(&self) -> RegCacheResult<CycleOutcome> {
        let delta = self
            .transport
            .fetch_delta_registry(self.settings.delta_window)
            .await?;

        let _guard = self.merge_lock.lock().await;
        let merge = self.merge_delta(&delta);
        let refetched = self.reconcile(&delta).await?;

        Ok(CycleOutcome { merge, refetched })
    }

    /// Full fetch with bounded retry
    async fn bootstrap(&self) -> RegCacheResult<()> {
        let policy = self.settings.bootstrap;
        let mut shutdown = self.shutdown_tx.subscribe();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match self.transport.fetch_full_registry().await {
                Ok(snapshot) => {
                    self.install_full(snapshot);
                    return Ok(());
                }
                Err(e) => e,
            };

            if !err.is_retryable() || !policy.allows_retry(attempt) {
                return Err(RegCacheError::BootstrapExhausted {
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            }

            let delay = policy.delay_after(attempt);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Bootstrap full fetch failed: {}",
                err
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stopped(&mut shutdown) => {
                    debug!("Bootstrap abandoned on shutdown");
                    return Ok(());
                }
            }
        }
    }

    async fn run_delta_loop(&self) {
        let mut shutdown = self.shutdown_tx.subscribe();
        let period = self.settings.effective_fetch_interval();

        // First cycle waits a full period; bootstrap covers startup
        let mut ticker = delayed_ticker(period, period);

        loop {
            tokio::select! {
                _ = stopped(&mut shutdown) => break,
                _ = ticker.tick() => self.run_cycle().await,
            }
        }

        debug!("Delta fetch task exited");
    }

    async fn run_cycle(&self) {
        match self.sync_once().await {
            Ok(outcome) => {
                CacheMetrics::incr(&self.metrics.cycles);
                debug!(
                    inserted = outcome.merge.inserted,
                    ignored = outcome.merge.ignored,
                    removed = outcome.merge.removed,
                    missing = outcome.merge.missing,
                    refetched = outcome.refetched,
                    "Delta cycle complete"
                );
            }
            Err(e) => {
                CacheMetrics::incr(&self.metrics.failed_cycles);
                warn!("Delta cycle failed, retrying next interval: {}", e);
            }
        }
    }

    /// Apply a delta batch to a copy of the live snapshot and publish it
    ///
    /// Caller holds the merge lock. If a full install lands between load and
    /// swap, the batch is replayed on top of the new snapshot.
    fn merge_delta(&self, delta: &DeltaRegistry) -> MergeStats {
        if delta.changes.is_empty() {
            return MergeStats::default();
        }

        self.publish_derived(|cur| {
            let mut next = cur.clone();
            let stats = next.apply_changes(&delta.changes);
            (next, stats)
        })
    }

    /// Publish a snapshot derived from the current one
    ///
    /// `derive` reruns against whatever is current whenever the CAS loses.
    fn publish_derived<T>(&self, mut derive: impl FnMut(&Snapshot) -> (Snapshot, T)) -> T {
        loop {
            let cur = self.current.load_full();
            let (next, out) = derive(&cur);

            let prev = self.current.compare_and_swap(&cur, Arc::new(next));
            if Arc::ptr_eq(&prev, &cur) {
                return out;
            }

            CacheMetrics::incr(&self.metrics.cas_retries);
            debug!("Snapshot replaced during merge, replaying batch");
        }
    }

    /// Compare local and authoritative counts, refetching on mismatch
    ///
    /// Caller holds the merge lock.
    async fn reconcile(&self, delta: &DeltaRegistry) -> RegCacheResult<bool> {
        let local_total = self.current.load().total_count();
        if local_total == delta.total_count {
            return Ok(false);
        }

        warn!(
            local_total,
            authoritative_total = delta.total_count,
            "Registry drift detected, refetching full registry"
        );

        let snapshot = self.transport.fetch_full_registry().await?;
        self.install_full(snapshot);
        CacheMetrics::incr(&self.metrics.refetches);
        Ok(true)
    }

    /// Publish a whole snapshot, retrying the CAS until it lands
    fn install_full(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let fetched = Arc::new(snapshot);

        loop {
            let cur = self.current.load_full();
            let prev = self.current.compare_and_swap(&cur, Arc::clone(&fetched));
            if Arc::ptr_eq(&prev, &cur) {
                break;
            }
            CacheMetrics::incr(&self.metrics.cas_retries);
        }

        CacheMetrics::incr(&self.metrics.full_installs);
        info!(
            services = fetched.service_count(),
            instances = fetched.total_count(),
            "Installed full registry snapshot"
        );
        fetched
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
