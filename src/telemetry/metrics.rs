//! Fetch metrics
//!
//! Records duration, outcome and cache hit/miss of every asset fetch and
//! aggregates them per operation kind.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Which path issued a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// The frame currently on screen (or about to be)
    Interactive,
    /// Speculative prefetch of the rest of a sequence
    Background,
    /// Server-side price validation round trip
    PriceValidation,
}

/// How a fetch settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    /// Served from the cache without I/O
    Hit,
    /// Joined a request already in flight
    Coalesced,
    /// Loaded from the network/filesystem
    Loaded,
    /// Failed (permanent or transient)
    Failed,
}

/// Aggregated statistics for one operation kind
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationStats {
    /// Number of recorded operations
    pub count: u64,
    /// Cache hits
    pub hits: u64,
    /// Cache misses (loaded, coalesced or failed)
    pub misses: u64,
    /// Failed operations
    pub failures: u64,
    /// Average duration in milliseconds
    pub avg_ms: f64,
    /// Minimum duration in milliseconds
    pub min_ms: f64,
    /// Maximum duration in milliseconds
    pub max_ms: f64,
    /// 95th percentile over the recent window
    pub p95_ms: f64,
}

#[derive(Debug, Clone, Default)]
struct Accumulator {
    count: u64,
    hits: u64,
    failures: u64,
    total: Duration,
    min: Option<Duration>,
    max: Duration,
    recent: VecDeque<Duration>,
}

/// Collector for fetch timings
#[derive(Debug, Clone)]
pub struct FetchMetrics {
    per_kind: HashMap<OperationKind, Accumulator>,
    /// Maximum samples kept per kind for percentiles
    max_samples: usize,
}

impl Default for FetchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self {
            per_kind: HashMap::new(),
            max_samples: 300,
        }
    }

    /// Record one settled operation
    pub fn record(&mut self, kind: OperationKind, outcome: FetchOutcome, duration: Duration) {
        let max_samples = self.max_samples;
        let acc = self.per_kind.entry(kind).or_default();

        acc.count += 1;
        match outcome {
            FetchOutcome::Hit => acc.hits += 1,
            FetchOutcome::Failed => acc.failures += 1,
            FetchOutcome::Coalesced | FetchOutcome::Loaded => {}
        }
        acc.total += duration;
        acc.min = Some(acc.min.map_or(duration, |m| m.min(duration)));
        acc.max = acc.max.max(duration);

        acc.recent.push_back(duration);
        if acc.recent.len() > max_samples {
            acc.recent.pop_front();
        }
    }

    /// Statistics for one kind (zeroed if nothing was recorded)
    pub fn stats(&self, kind: OperationKind) -> OperationStats {
        let Some(acc) = self.per_kind.get(&kind) else {
            return OperationStats::default();
        };
        if acc.count == 0 {
            return OperationStats::default();
        }

        let mut recent: Vec<f64> = acc.recent.iter().map(to_ms).collect();
        recent.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        OperationStats {
            count: acc.count,
            hits: acc.hits,
            misses: acc.count - acc.hits,
            failures: acc.failures,
            avg_ms: to_ms(&acc.total) / acc.count as f64,
            min_ms: acc.min.as_ref().map(to_ms).unwrap_or(0.0),
            max_ms: to_ms(&acc.max),
            p95_ms: percentile(&recent, 0.95),
        }
    }

    /// Statistics for every kind that has samples
    pub fn snapshot(&self) -> HashMap<OperationKind, OperationStats> {
        self.per_kind.keys().map(|kind| (*kind, self.stats(*kind))).collect()
    }

    /// Average duration across the fetch kinds that hit the asset store
    pub fn average_fetch_ms(&self) -> f64 {
        let (total, count) = [OperationKind::Interactive, OperationKind::Background]
            .iter()
            .filter_map(|kind| self.per_kind.get(kind))
            .fold((Duration::ZERO, 0u64), |(t, c), acc| (t + acc.total, c + acc.count));

        if count == 0 {
            0.0
        } else {
            to_ms(&total) / count as f64
        }
    }

    /// Forget all samples
    pub fn reset(&mut self) {
        self.per_kind.clear();
    }
}

fn to_ms(d: &Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Calculate percentile from sorted array
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p) as usize;
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregates_per_kind() {
        let mut metrics = FetchMetrics::new();
        metrics.record(OperationKind::Interactive, FetchOutcome::Loaded, Duration::from_millis(30));
        metrics.record(OperationKind::Interactive, FetchOutcome::Hit, Duration::from_millis(0));
        metrics.record(OperationKind::Interactive, FetchOutcome::Failed, Duration::from_millis(90));
        metrics.record(OperationKind::Background, FetchOutcome::Loaded, Duration::from_millis(10));

        let interactive = metrics.stats(OperationKind::Interactive);
        assert_eq!(interactive.count, 3);
        assert_eq!(interactive.hits, 1);
        assert_eq!(interactive.misses, 2);
        assert_eq!(interactive.failures, 1);
        assert!((interactive.avg_ms - 40.0).abs() < 1e-6);
        assert_eq!(interactive.min_ms, 0.0);
        assert!((interactive.max_ms - 90.0).abs() < 1e-6);

        assert_eq!(metrics.stats(OperationKind::PriceValidation), OperationStats::default());
        assert!((metrics.average_fetch_ms() - 32.5).abs() < 1e-6);
        assert_eq!(metrics.snapshot().len(), 2);
    }

    #[test]
    fn test_percentile() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&values, 0.5), 5.0);
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 1.0), 10.0);
    }

    #[test]
    fn test_reset() {
        let mut metrics = FetchMetrics::new();
        metrics.record(OperationKind::Background, FetchOutcome::Loaded, Duration::from_millis(5));
        metrics.reset();
        assert_eq!(metrics.average_fetch_ms(), 0.0);
    }
}
