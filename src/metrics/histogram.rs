//! Latency histogram with power-of-two buckets.
//!
//! Bucket `i` holds samples whose nanosecond value has its highest set bit at
//! position `i - 1` (bucket 0 holds exact zeros), so 65 buckets cover the
//! whole `u64` range with a worst-case relative error of 2x. Recording is
//! lock-free; percentiles are read from a consistent-enough relaxed scan.
//!
//! # Examples
//!
//! ```
//! use bloomindex::metrics::LatencyHistogram;
//! use std::time::Duration;
//!
//! let histogram = LatencyHistogram::new();
//! histogram.record(Duration::from_micros(100));
//! histogram.record(Duration::from_micros(200));
//! histogram.record(Duration::from_millis(1));
//!
//! let stats = histogram.snapshot();
//! assert_eq!(stats.count, 3);
//! assert!(stats.p50 >= Duration::from_micros(64));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// One bucket for zero plus one per bit position of a `u64`.
const BUCKET_COUNT: usize = 65;

/// Lock-free latency histogram.
pub struct LatencyHistogram {
    buckets: [AtomicU64; BUCKET_COUNT],
    count: AtomicU64,
    sum_nanos: AtomicU64,
    min_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl LatencyHistogram {
    /// Create an empty histogram.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            count: AtomicU64::new(0),
            sum_nanos: AtomicU64::new(0),
            min_nanos: AtomicU64::new(u64::MAX),
            max_nanos: AtomicU64::new(0),
        }
    }

    #[inline]
    fn bucket_of(nanos: u64) -> usize {
        (u64::BITS - nanos.leading_zeros()) as usize
    }

    /// Smallest value that lands in bucket `i`.
    #[inline]
    fn lower_bound(i: usize) -> u64 {
        if i == 0 {
            0
        } else {
            1u64 << (i - 1)
        }
    }

    /// Largest value that lands in bucket `i`.
    #[inline]
    fn upper_bound(i: usize) -> u64 {
        match i {
            0 => 0,
            64 => u64::MAX,
            _ => (1u64 << i) - 1,
        }
    }

    /// Record one sample.
    pub fn record(&self, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);

        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.min_nanos.fetch_min(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
        self.buckets[Self::bucket_of(nanos)].fetch_add(1, Ordering::Relaxed);
    }

    /// Number of recorded samples.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Mean of recorded samples, zero when empty.
    pub fn mean(&self) -> Duration {
        let count = self.count();
        if count == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.sum_nanos.load(Ordering::Relaxed) / count)
    }

    /// Smallest recorded sample, zero when empty.
    pub fn min(&self) -> Duration {
        match self.min_nanos.load(Ordering::Relaxed) {
            u64::MAX => Duration::ZERO,
            min => Duration::from_nanos(min),
        }
    }

    /// Largest recorded sample.
    pub fn max(&self) -> Duration {
        Duration::from_nanos(self.max_nanos.load(Ordering::Relaxed))
    }

    /// Estimate the `p` quantile, interpolating linearly inside the bucket
    /// and clamping to the observed min and max.
    ///
    /// # Panics
    ///
    /// Panics if `p` is outside `[0.0, 1.0]`.
    pub fn percentile(&self, p: f64) -> Duration {
        assert!((0.0..=1.0).contains(&p), "percentile must be in [0.0, 1.0], got {}", p);

        let count = self.count();
        if count == 0 {
            return Duration::ZERO;
        }

        let target = ((count as f64 * p).ceil() as u64).max(1);
        let mut cumulative = 0u64;

        for (i, bucket) in self.buckets.iter().enumerate() {
            let in_bucket = bucket.load(Ordering::Relaxed);
            if in_bucket == 0 {
                continue;
            }
            if cumulative + in_bucket >= target {
                let low = Self::lower_bound(i) as f64;
                let high = Self::upper_bound(i) as f64;
                let ratio = (target - cumulative) as f64 / in_bucket as f64;
                let estimate = (low + ratio * (high - low)) as u64;
                let clamped = estimate
                    .max(self.min_nanos.load(Ordering::Relaxed))
                    .min(self.max_nanos.load(Ordering::Relaxed));
                return Duration::from_nanos(clamped);
            }
            cumulative += in_bucket;
        }

        self.max()
    }

    /// Summary statistics at the common quantiles.
    pub fn snapshot(&self) -> LatencyStats {
        LatencyStats {
            count: self.count(),
            mean: self.mean(),
            min: self.min(),
            max: self.max(),
            p50: self.percentile(0.50),
            p90: self.percentile(0.90),
            p99: self.percentile(0.99),
        }
    }

    /// Forget every sample.
    pub fn reset(&self) {
        for bucket in &self.buckets {
            bucket.store(0, Ordering::Relaxed);
        }
        self.count.store(0, Ordering::Relaxed);
        self.sum_nanos.store(0, Ordering::Relaxed);
        self.min_nanos.store(u64::MAX, Ordering::Relaxed);
        self.max_nanos.store(0, Ordering::Relaxed);
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LatencyHistogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyHistogram")
            .field("count", &self.count())
            .field("mean", &self.mean())
            .field("max", &self.max())
            .finish()
    }
}

/// Point-in-time latency summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyStats {
    /// Samples recorded.
    pub count: u64,
    /// Mean latency.
    pub mean: Duration,
    /// Smallest sample.
    pub min: Duration,
    /// Largest sample.
    pub max: Duration,
    /// Median.
    pub p50: Duration,
    /// 90th percentile.
    pub p90: Duration,
    /// 99th percentile.
    pub p99: Duration,
}
