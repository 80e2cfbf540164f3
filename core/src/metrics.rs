use crate::error::ErrorCode;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Navigate,
    Locate,
    Search,
}

#[derive(Debug, Clone, Default)]
struct QueryMetrics {
    navigations: u64,
    locates: u64,
    searches: u64,
    failures: BTreeMap<String, u64>,
    latencies: VecDeque<u64>, // microseconds
}

/// Read-path counters shared by request handlers.
#[derive(Clone)]
pub struct MetricsCollector {
    state: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    query_metrics: QueryMetrics,
    snapshot_swaps: u64,
    max_history: usize,
}

impl MetricsCollector {
    pub fn new(max_history: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MetricsState {
                query_metrics: QueryMetrics::default(),
                snapshot_swaps: 0,
                max_history: max_history.max(1),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_query(&self, kind: QueryKind, latency_us: u64, failure: Option<ErrorCode>) {
        let mut state = self.lock();
        let max_history = state.max_history;
        let q = &mut state.query_metrics;
        match kind {
            QueryKind::Navigate => q.navigations += 1,
            QueryKind::Locate => q.locates += 1,
            QueryKind::Search => q.searches += 1,
        }
        if let Some(code) = failure {
            *q.failures.entry(code.to_string()).or_insert(0) += 1;
        }
        q.latencies.push_back(latency_us);
        if q.latencies.len() > max_history {
            q.latencies.pop_front();
        }
    }

    pub fn record_snapshot_swap(&self) {
        self.lock().snapshot_swaps += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.lock();
        let q = &state.query_metrics;

        let mut sorted_latencies: Vec<u64> = q.latencies.iter().copied().collect();
        sorted_latencies.sort_unstable();

        MetricsSnapshot {
            total_queries: q.navigations + q.locates + q.searches,
            navigations: q.navigations,
            locates: q.locates,
            searches: q.searches,
            failures: q.failures.clone(),
            snapshot_swaps: state.snapshot_swaps,
            p50: percentile(&sorted_latencies, 50.0),
            p95: percentile(&sorted_latencies, 95.0),
            p99: percentile(&sorted_latencies, 99.0),
            history_count: q.latencies.len(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(1_024)
    }
}

fn percentile(sorted: &[u64], p: f32) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((p / 100.0) * (sorted.len() as f32)).ceil() as usize;
    sorted[idx.saturating_sub(1).min(sorted.len() - 1)]
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub total_queries: u64,
    pub navigations: u64,
    pub locates: u64,
    pub searches: u64,
    /// Failure counts keyed by error code.
    pub failures: BTreeMap<String, u64>,
    pub snapshot_swaps: u64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub history_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_bounded_and_percentiles_are_monotonic() {
        let metrics = MetricsCollector::new(4);
        for latency in [10, 20, 30, 40, 50, 60] {
            metrics.record_query(QueryKind::Search, latency, None);
        }
        metrics.record_query(QueryKind::Navigate, 5, Some(ErrorCode::NoPath));

        let snap = metrics.snapshot();
        assert_eq!(snap.total_queries, 7);
        assert_eq!(snap.searches, 6);
        assert_eq!(snap.navigations, 1);
        assert_eq!(snap.history_count, 4);
        assert_eq!(snap.failures.get("NO_PATH"), Some(&1));
        assert!(snap.p50 <= snap.p95 && snap.p95 <= snap.p99);
        assert_eq!(snap.p99, 60);
    }
}
