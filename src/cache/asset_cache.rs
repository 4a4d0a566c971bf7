//! Asset cache
//!
//! Loads frame images through an [`AssetFetcher`], deduplicating concurrent
//! requests for the same (material, frame, encoding) and keeping results in a
//! bounded LRU store. Failures never escape as errors: `get` resolves to a
//! fallback and the failure is logged and recorded instead.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use super::fetcher::sniff;
use super::{
    circular_distance, AssetFetcher, CacheKey, FallbackReason, FetchError, FetchRequest, FrameOutcome, FrameResource,
    FrameStore, Priority, SequenceRef,
};
use crate::catalog::{Encoding, MaterialId};
use crate::error::{EngineError, EngineResult};
use crate::settings::{CacheSettings, EngineSettings, HealthSettings, PrefetchSettings};
use crate::telemetry::{FetchMetrics, FetchOutcome, OperationKind, OperationStats};

type SharedFetch = Shared<BoxFuture<'static, Result<FrameResource, FetchError>>>;

/// A fetch currently running on its own task
struct InFlight {
    fetch: SharedFetch,
    abort: AbortHandle,
    serial: u64,
    /// Set once an interactive caller joins; such fetches survive prefetch cancellation
    interactive: bool,
}

struct CacheState {
    store: FrameStore,
    in_flight: HashMap<CacheKey, InFlight>,
    /// Encodings that failed permanently for a frame
    failed_keys: HashSet<CacheKey>,
    /// Frames that failed in every encoding
    unavailable: HashSet<(MaterialId, usize)>,
    errors: VecDeque<EngineError>,
    metrics: FetchMetrics,
    /// Bumped by `clear`; completions from an older epoch are not stored
    epoch: u64,
    next_serial: u64,
    last_health: HealthStatus,
}

struct CacheInner {
    fetcher: Arc<dyn AssetFetcher>,
    runtime: Handle,
    settings: CacheSettings,
    retry: PrefetchSettings,
    health: HealthSettings,
    state: Mutex<CacheState>,
}

enum Lookup {
    Hit(FrameResource),
    /// Encoding already failed permanently for this frame
    Skip,
    Wait { fetch: SharedFetch, coalesced: bool },
}

/// Overall cache health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Cache health snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub entries: usize,
    pub bytes: u64,
    pub fill_ratio: f64,
    pub avg_fetch_ms: f64,
    /// One `PerformanceDegradation` per threshold crossed
    #[serde(skip)]
    pub warnings: Vec<EngineError>,
}

/// Cache counters for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: u64,
    pub in_flight: usize,
    pub unavailable_frames: usize,
    pub operations: HashMap<OperationKind, OperationStats>,
}

/// Shared handle to the frame cache. Clones refer to the same cache.
#[derive(Clone)]
pub struct AssetCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("AssetCache")
            .field("entries", &state.store.len())
            .field("bytes", &state.store.total_bytes())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}

impl Priority {
    fn operation_kind(self) -> OperationKind {
        match self {
            Priority::Interactive => OperationKind::Interactive,
            Priority::Background => OperationKind::Background,
        }
    }
}

impl AssetCache {
    /// Create a cache on the current tokio runtime
    pub fn new(fetcher: Arc<dyn AssetFetcher>, settings: &EngineSettings) -> EngineResult<Self> {
        let runtime = Handle::try_current().map_err(|e| EngineError::Runtime(e.to_string()))?;
        Ok(Self::with_runtime(fetcher, settings, runtime))
    }

    /// Create a cache whose fetch tasks run on `runtime`
    pub fn with_runtime(fetcher: Arc<dyn AssetFetcher>, settings: &EngineSettings, runtime: Handle) -> Self {
        let cache = &settings.cache;
        Self {
            inner: Arc::new(CacheInner {
                fetcher,
                runtime,
                settings: cache.clone(),
                retry: settings.prefetch.clone(),
                health: settings.health.clone(),
                state: Mutex::new(CacheState {
                    store: FrameStore::new(cache.max_entries, cache.max_bytes, cache.ttl()),
                    in_flight: HashMap::new(),
                    failed_keys: HashSet::new(),
                    unavailable: HashSet::new(),
                    errors: VecDeque::new(),
                    metrics: FetchMetrics::new(),
                    epoch: 0,
                    next_serial: 0,
                    last_health: HealthStatus::Healthy,
                }),
            }),
        }
    }

    /// Load one frame, trying the sequence's encodings in preference order.
    ///
    /// Never fails: a frame that cannot be loaded resolves to a
    /// [`FrameOutcome::Fallback`] and the failure is recorded.
    pub async fn get(&self, sequence: &SequenceRef, frame: usize, priority: Priority) -> FrameOutcome {
        let started = Instant::now();
        let kind = priority.operation_kind();
        let material = sequence.material().clone();

        if frame >= sequence.frame_count() {
            return FrameOutcome::Fallback(FallbackReason::OutOfRange);
        }
        if self.is_unavailable(&material, frame) {
            return FrameOutcome::Fallback(FallbackReason::Unavailable);
        }

        let mut transient: Option<FetchError> = None;
        for &encoding in &sequence.descriptor.encodings {
            let key = CacheKey::new(material.clone(), frame, encoding);
            match self.load(sequence, key, priority).await {
                Ok((resource, outcome)) => {
                    self.record(kind, outcome, started.elapsed());
                    return FrameOutcome::Ready(resource);
                }
                Err(FetchError::Cancelled) => return FrameOutcome::Fallback(FallbackReason::Cancelled),
                Err(err) if err.is_permanent() => {
                    tracing::debug!(
                        target: "immersive_turntable::cache",
                        material = %material,
                        frame,
                        ?encoding,
                        error = %err,
                        "Encoding unavailable, trying next"
                    );
                }
                Err(err) => transient = Some(err),
            }
        }

        self.record(kind, FetchOutcome::Failed, started.elapsed());
        match transient {
            Some(err) => {
                tracing::warn!(
                    target: "immersive_turntable::cache",
                    material = %material,
                    frame,
                    error = %err,
                    "Frame fetch failed"
                );
                self.push_error(EngineError::Network(format!("{} frame {}: {}", material, frame, err)));
                FrameOutcome::Fallback(FallbackReason::Network(err.to_string()))
            }
            None => {
                self.mark_unavailable(&material, frame);
                FrameOutcome::Fallback(FallbackReason::Unavailable)
            }
        }
    }

    /// Cached resource for a frame in the first encoding present, without I/O
    pub fn ready(&self, material: &MaterialId, frame: usize, encodings: &[Encoding]) -> Option<FrameResource> {
        let now = Instant::now();
        let mut state = self.inner.state.lock();
        encodings
            .iter()
            .find_map(|&encoding| state.store.get(&CacheKey::new(material.clone(), frame, encoding), now))
    }

    /// Nearest loaded frame of `material` to `frame`, by circular distance.
    ///
    /// Ties go to the lower frame index.
    pub fn fallback_for(&self, material: &MaterialId, frame: usize, frame_count: usize) -> Option<FrameResource> {
        let now = Instant::now();
        let state = self.inner.state.lock();
        state
            .store
            .frames_of(material, now)
            .min_by_key(|r| {
                (
                    circular_distance(r.key.frame, frame, frame_count),
                    r.key.frame,
                    r.key.encoding,
                )
            })
            .cloned()
    }

    /// Whether every encoding of a frame has failed permanently
    pub fn is_unavailable(&self, material: &MaterialId, frame: usize) -> bool {
        self.inner.state.lock().unavailable.contains(&(material.clone(), frame))
    }

    /// Abort in-flight background fetches of one material.
    ///
    /// Fetches an interactive caller is waiting on keep running.
    pub fn cancel_background(&self, material: &MaterialId) -> usize {
        let mut state = self.inner.state.lock();
        let doomed: Vec<CacheKey> = state
            .in_flight
            .iter()
            .filter(|(key, f)| &key.material == material && !f.interactive)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            if let Some(f) = state.in_flight.remove(key) {
                f.abort.abort();
            }
        }
        if !doomed.is_empty() {
            tracing::debug!(
                target: "immersive_turntable::cache",
                material = %material,
                cancelled = doomed.len(),
                "Cancelled background fetches"
            );
        }
        doomed.len()
    }

    /// Abort every in-flight fetch
    pub fn cancel_all(&self) -> usize {
        let mut state = self.inner.state.lock();
        let count = state.in_flight.len();
        for (_, f) in state.in_flight.drain() {
            f.abort.abort();
        }
        count
    }

    /// Invalidate everything, e.g. after a catalog or asset version change.
    ///
    /// Fetches already running still answer their callers but their results
    /// are not stored.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.store.clear();
        state.in_flight.clear();
        state.failed_keys.clear();
        state.unavailable.clear();
        state.epoch += 1;
        tracing::info!(target: "immersive_turntable::cache", epoch = state.epoch, "Cache cleared");
    }

    /// Drop entries older than the configured TTL
    pub fn purge_expired(&self) -> usize {
        self.inner.state.lock().store.purge_expired(Instant::now())
    }

    /// Most recent recorded errors, oldest first
    pub fn recent_errors(&self) -> Vec<EngineError> {
        self.inner.state.lock().errors.iter().cloned().collect()
    }

    /// Record a timing for an operation the cache does not run itself
    pub fn record_operation(&self, kind: OperationKind, outcome: FetchOutcome, duration: Duration) {
        self.record(kind, outcome, duration);
    }

    /// Record an error raised outside the fetch path
    pub fn record_error(&self, error: EngineError) {
        self.push_error(error);
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        CacheStats {
            entries: state.store.len(),
            bytes: state.store.total_bytes(),
            in_flight: state.in_flight.len(),
            unavailable_frames: state.unavailable.len(),
            operations: state.metrics.snapshot(),
        }
    }

    /// Check fill level and latency against the health thresholds.
    ///
    /// Crossing into `Degraded` logs a warning and records a
    /// `PerformanceDegradation` error once per transition.
    pub fn health(&self) -> HealthReport {
        let thresholds = &self.inner.health;
        let mut state = self.inner.state.lock();

        let entries = state.store.len();
        let bytes = state.store.total_bytes();
        let fill_ratio = (entries as f64 / state.store.max_entries() as f64)
            .max(bytes as f64 / state.store.max_bytes() as f64);
        let avg_fetch_ms = state.metrics.average_fetch_ms();

        let mut warnings = Vec::new();
        if fill_ratio >= thresholds.max_fill_ratio {
            warnings.push(EngineError::PerformanceDegradation(format!(
                "cache {:.0}% full",
                fill_ratio * 100.0
            )));
        }
        if avg_fetch_ms > thresholds.max_avg_latency_ms {
            warnings.push(EngineError::PerformanceDegradation(format!(
                "average fetch {:.1}ms exceeds {:.1}ms",
                avg_fetch_ms, thresholds.max_avg_latency_ms
            )));
        }

        let status = if warnings.is_empty() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        if status != state.last_health {
            state.last_health = status;
            if status == HealthStatus::Degraded {
                for warning in &warnings {
                    tracing::warn!(target: "immersive_turntable::cache", "{}", warning);
                }
                push_bounded(&mut state.errors, warnings.clone(), self.inner.settings.error_log_capacity);
            } else {
                tracing::info!(target: "immersive_turntable::cache", "Cache healthy again");
            }
        }

        HealthReport {
            status,
            entries,
            bytes,
            fill_ratio,
            avg_fetch_ms,
            warnings,
        }
    }

    /// Load one encoding of a frame, retrying transient failures for
    /// background callers
    async fn load(
        &self,
        sequence: &SequenceRef,
        key: CacheKey,
        priority: Priority,
    ) -> Result<(FrameResource, FetchOutcome), FetchError> {
        let attempts = match priority {
            Priority::Interactive => 1,
            Priority::Background => 1 + self.inner.retry.retry_attempts,
        };
        let max_backoff = Duration::from_millis(self.inner.retry.max_backoff_ms);
        let mut backoff = Duration::from_millis(self.inner.retry.retry_backoff_ms);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let (fetch, coalesced) = match self.lookup(sequence, &key, priority) {
                Lookup::Hit(resource) => return Ok((resource, FetchOutcome::Hit)),
                Lookup::Skip => {
                    return Err(FetchError::NotFound(sequence.path(key.frame, key.encoding)));
                }
                Lookup::Wait { fetch, coalesced } => (fetch, coalesced),
            };

            match fetch.await {
                Ok(resource) => {
                    let outcome = if coalesced {
                        FetchOutcome::Coalesced
                    } else {
                        FetchOutcome::Loaded
                    };
                    return Ok((resource, outcome));
                }
                Err(err) if err.is_transient() && attempt < attempts => {
                    tracing::debug!(
                        target: "immersive_turntable::cache",
                        ?key,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Retrying fetch"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(max_backoff);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Serve from the store, join an in-flight fetch, or start a new one
    fn lookup(&self, sequence: &SequenceRef, key: &CacheKey, priority: Priority) -> Lookup {
        let now = Instant::now();
        let mut state = self.inner.state.lock();

        if let Some(resource) = state.store.get(key, now) {
            return Lookup::Hit(resource);
        }
        if state.failed_keys.contains(key) {
            return Lookup::Skip;
        }
        if let Some(in_flight) = state.in_flight.get_mut(key) {
            if priority == Priority::Interactive {
                in_flight.interactive = true;
            }
            return Lookup::Wait {
                fetch: in_flight.fetch.clone(),
                coalesced: true,
            };
        }

        let serial = state.next_serial;
        state.next_serial += 1;
        let epoch = state.epoch;

        let request = FetchRequest {
            key: key.clone(),
            path: sequence.path(key.frame, key.encoding),
        };
        tracing::trace!(target: "immersive_turntable::cache", path = %request.path, ?priority, "Fetching frame");
        let pending = self.inner.fetcher.fetch(&request);

        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let handle = self.inner.runtime.spawn(async move {
            let result = match pending.await {
                Ok(bytes) => sniff(&bytes, task_key.encoding).map(|()| FrameResource {
                    key: task_key.clone(),
                    bytes,
                    fetch_serial: serial,
                }),
                Err(err) => Err(err),
            };
            inner.settle(&task_key, epoch, serial, &result);
            result
        });

        let abort = handle.abort_handle();
        let fetch = async move { handle.await.unwrap_or_else(|_| Err(FetchError::Cancelled)) }
            .boxed()
            .shared();

        state.in_flight.insert(
            key.clone(),
            InFlight {
                fetch: fetch.clone(),
                abort,
                serial,
                interactive: priority == Priority::Interactive,
            },
        );
        Lookup::Wait {
            fetch,
            coalesced: false,
        }
    }

    fn mark_unavailable(&self, material: &MaterialId, frame: usize) {
        let mut state = self.inner.state.lock();
        if !state.unavailable.insert((material.clone(), frame)) {
            return;
        }
        let error = EngineError::AssetUnavailable {
            material: material.clone(),
            frame,
            detail: "no encoding could be loaded".to_string(),
        };
        tracing::warn!(target: "immersive_turntable::cache", "{}", error);
        push_bounded(&mut state.errors, [error], self.inner.settings.error_log_capacity);
    }

    fn push_error(&self, error: EngineError) {
        let mut state = self.inner.state.lock();
        push_bounded(&mut state.errors, [error], self.inner.settings.error_log_capacity);
    }

    fn record(&self, kind: OperationKind, outcome: FetchOutcome, duration: Duration) {
        self.inner.state.lock().metrics.record(kind, outcome, duration);
    }
}

impl CacheInner {
    /// Store the result of a finished fetch task
    fn settle(&self, key: &CacheKey, epoch: u64, serial: u64, result: &Result<FrameResource, FetchError>) {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            return;
        }
        if state.in_flight.get(key).is_some_and(|f| f.serial == serial) {
            state.in_flight.remove(key);
        }

        match result {
            Ok(resource) => {
                state.store.insert(key.clone(), resource.clone(), Instant::now());
            }
            Err(err) if err.is_permanent() => {
                state.failed_keys.insert(key.clone());
            }
            Err(_) => {}
        }
    }
}

fn push_bounded(log: &mut VecDeque<EngineError>, errors: impl IntoIterator<Item = EngineError>, capacity: usize) {
    for error in errors {
        log.push_back(error);
        while log.len() > capacity.max(1) {
            log.pop_front();
        }
    }
}
