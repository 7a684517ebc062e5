//! Operation counters and their exported snapshots.

use super::histogram::{LatencyHistogram, LatencyStats};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use crate::error::{BloomIndexError, Result};

#[derive(Debug, Default)]
struct OperationCounters {
    adds: AtomicU64,
    deletes_hit: AtomicU64,
    deletes_miss: AtomicU64,
    queries: AtomicU64,
    matches: AtomicU64,
}

/// Thread-safe collector of index operation metrics.
///
/// Clones share the same counters, so one clone can be handed to a
/// reporting thread while another records.
///
/// # Examples
///
/// ```
/// use bloomindex::metrics::MetricsCollector;
/// use std::time::Duration;
///
/// let metrics = MetricsCollector::new();
/// metrics.record_add(Duration::from_nanos(300));
/// metrics.record_delete(true);
/// metrics.record_query(4, Duration::from_micros(2));
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.adds, 1);
/// assert_eq!(snapshot.matches, 4);
/// ```
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    counters: Arc<OperationCounters>,
    query_latency: Arc<LatencyHistogram>,
    add_latency: Arc<LatencyHistogram>,
    start_time: Instant,
}

impl MetricsCollector {
    /// Create a collector with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counters: Arc::default(),
            query_latency: Arc::default(),
            add_latency: Arc::default(),
            start_time: Instant::now(),
        }
    }

    /// Record one `add` and how long it took.
    pub fn record_add(&self, latency: Duration) {
        self.counters.adds.fetch_add(1, Ordering::Relaxed);
        self.add_latency.record(latency);
    }

    /// Record one `delete`; `hit` is its return value.
    pub fn record_delete(&self, hit: bool) {
        let counter = if hit {
            &self.counters.deletes_hit
        } else {
            &self.counters.deletes_miss
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one `count` or `search` that produced `matches` results.
    pub fn record_query(&self, matches: usize, latency: Duration) {
        self.counters.queries.fetch_add(1, Ordering::Relaxed);
        self.counters
            .matches
            .fetch_add(matches as u64, Ordering::Relaxed);
        self.query_latency.record(latency);
    }

    /// Total adds recorded.
    pub fn total_adds(&self) -> u64 {
        self.counters.adds.load(Ordering::Relaxed)
    }

    /// Total queries recorded.
    pub fn total_queries(&self) -> u64 {
        self.counters.queries.load(Ordering::Relaxed)
    }

    /// Query latency distribution.
    pub fn query_latency_histogram(&self) -> &LatencyHistogram {
        &self.query_latency
    }

    /// Add latency distribution.
    pub fn add_latency_histogram(&self) -> &LatencyHistogram {
        &self.add_latency
    }

    /// Time since the collector was created.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Copy every counter into a plain value.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.counters;
        MetricsSnapshot {
            adds: c.adds.load(Ordering::Relaxed),
            deletes_hit: c.deletes_hit.load(Ordering::Relaxed),
            deletes_miss: c.deletes_miss.load(Ordering::Relaxed),
            queries: c.queries.load(Ordering::Relaxed),
            matches: c.matches.load(Ordering::Relaxed),
            uptime: self.uptime(),
            query_latency: self.query_latency.snapshot(),
            add_latency: self.add_latency.snapshot(),
        }
    }

    /// Zero every counter and histogram. Uptime keeps running.
    pub fn reset(&self) {
        let c = &self.counters;
        for counter in [&c.adds, &c.deletes_hit, &c.deletes_miss, &c.queries, &c.matches] {
            counter.store(0, Ordering::Relaxed);
        }
        self.query_latency.reset();
        self.add_latency.reset();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain copy of a [`MetricsCollector`] at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    /// Filters added.
    pub adds: u64,
    /// Deletes that removed a copy.
    pub deletes_hit: u64,
    /// Deletes of absent filters.
    pub deletes_miss: u64,
    /// `count` and `search` calls.
    pub queries: u64,
    /// Matches returned over all queries.
    pub matches: u64,
    /// Collector age.
    pub uptime: Duration,
    /// Query latency summary.
    pub query_latency: LatencyStats,
    /// Add latency summary.
    pub add_latency: LatencyStats,
}

impl MetricsSnapshot {
    /// Average matches per query, zero before the first query.
    pub fn mean_matches(&self) -> f64 {
        if self.queries == 0 {
            return 0.0;
        }
        self.matches as f64 / self.queries as f64
    }

    /// Queries per second of uptime.
    pub fn queries_per_second(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.queries as f64 / secs
    }

    /// Render as Prometheus text exposition with every metric name
    /// prefixed by `prefix`.
    pub fn to_prometheus_format(&self, prefix: &str) -> String {
        let mut lines = Vec::new();

        lines.push(format!("# HELP {}_adds_total Filters added", prefix));
        lines.push(format!("# TYPE {}_adds_total counter", prefix));
        lines.push(format!("{}_adds_total {}", prefix, self.adds));

        lines.push(format!("# HELP {}_deletes_total Delete calls by outcome", prefix));
        lines.push(format!("# TYPE {}_deletes_total counter", prefix));
        lines.push(format!("{}_deletes_total{{result=\"hit\"}} {}", prefix, self.deletes_hit));
        lines.push(format!("{}_deletes_total{{result=\"miss\"}} {}", prefix, self.deletes_miss));

        lines.push(format!("# HELP {}_queries_total Containment queries", prefix));
        lines.push(format!("# TYPE {}_queries_total counter", prefix));
        lines.push(format!("{}_queries_total {}", prefix, self.queries));

        lines.push(format!("# HELP {}_matches_total Matches returned by queries", prefix));
        lines.push(format!("# TYPE {}_matches_total counter", prefix));
        lines.push(format!("{}_matches_total {}", prefix, self.matches));

        lines.push(format!("# HELP {}_query_latency_seconds Query latency", prefix));
        lines.push(format!("# TYPE {}_query_latency_seconds summary", prefix));
        for (quantile, value) in [
            ("0.5", self.query_latency.p50),
            ("0.9", self.query_latency.p90),
            ("0.99", self.query_latency.p99),
        ] {
            lines.push(format!(
                "{}_query_latency_seconds{{quantile=\"{}\"}} {:.9}",
                prefix,
                quantile,
                value.as_secs_f64()
            ));
        }
        lines.push(format!(
            "{}_query_latency_seconds_count {}",
            prefix, self.query_latency.count
        ));

        lines.join("\n")
    }

    /// Render as pretty-printed JSON.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String> {
        #[derive(serde::Serialize)]
        struct JsonLatency {
            count: u64,
            mean_ns: u128,
            max_ns: u128,
            p50_ns: u128,
            p90_ns: u128,
            p99_ns: u128,
        }

        #[derive(serde::Serialize)]
        struct JsonSnapshot {
            adds: u64,
            deletes_hit: u64,
            deletes_miss: u64,
            queries: u64,
            matches: u64,
            mean_matches: f64,
            uptime_secs: f64,
            query_latency: JsonLatency,
            add_latency: JsonLatency,
        }

        let latency = |s: &LatencyStats| JsonLatency {
            count: s.count,
            mean_ns: s.mean.as_nanos(),
            max_ns: s.max.as_nanos(),
            p50_ns: s.p50.as_nanos(),
            p90_ns: s.p90.as_nanos(),
            p99_ns: s.p99.as_nanos(),
        };

        let json = JsonSnapshot {
            adds: self.adds,
            deletes_hit: self.deletes_hit,
            deletes_miss: self.deletes_miss,
            queries: self.queries,
            matches: self.matches,
            mean_matches: self.mean_matches(),
            uptime_secs: self.uptime.as_secs_f64(),
            query_latency: latency(&self.query_latency),
            add_latency: latency(&self.add_latency),
        };

        serde_json::to_string_pretty(&json)
            .map_err(|e| BloomIndexError::serialization_error(e.to_string()))
    }
}
