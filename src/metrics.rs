//! Scoring statistics for the command-line scorer.

use crate::error::PipelineError;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Failure kind for input lines that are not valid observations
pub const PARSE_ERROR_KIND: &str = "parse_error";

/// Metrics collector for scoring runs
pub struct ScoringMetrics {
    /// Observations scored successfully
    pub observations_scored: AtomicU64,
    /// Observations rejected with an error
    pub observations_failed: AtomicU64,
    /// Failures by error kind
    failures_by_kind: RwLock<BTreeMap<&'static str, u64>>,
    /// Scoring times (in microseconds)
    scoring_times: RwLock<Vec<u64>>,
    /// Catch probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ScoringMetrics {
    pub fn new() -> Self {
        Self {
            observations_scored: AtomicU64::new(0),
            observations_failed: AtomicU64::new(0),
            failures_by_kind: RwLock::new(BTreeMap::new()),
            scoring_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a scored observation
    pub fn record_prediction(&self, scoring_time: Duration, probability: f64) {
        self.observations_scored.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.scoring_times.write() {
            times.push(scoring_time.as_micros() as u64);
            // Keep only the most recent samples
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = ((probability * 10.0) as usize).min(9);
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a rejected observation
    pub fn record_failure(&self, error: &PipelineError) {
        self.record_rejection(error.kind());
    }

    /// Record an input line that never reached the pipeline
    pub fn record_parse_error(&self) {
        self.record_rejection(PARSE_ERROR_KIND);
    }

    fn record_rejection(&self, kind: &'static str) {
        self.observations_failed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(kind).or_insert(0) += 1;
        }
    }

    /// Scoring time statistics
    pub fn get_scoring_stats(&self) -> ScoringStats {
        let sorted = match self.scoring_times.read() {
            Ok(times) if !times.is_empty() => {
                let mut sorted = times.clone();
                sorted.sort_unstable();
                sorted
            }
            _ => return ScoringStats::default(),
        };

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        ScoringStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.50),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Observations per second since start
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.observations_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|b| *b)
            .unwrap_or_default()
    }

    pub fn get_failures_by_kind(&self) -> BTreeMap<&'static str, u64> {
        self.failures_by_kind
            .read()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let scored = self.observations_scored.load(Ordering::Relaxed);
        let failed = self.observations_failed.load(Ordering::Relaxed);
        let stats = self.get_scoring_stats();

        info!(
            scored = scored,
            failed = failed,
            throughput = format!("{:.1} obs/s", self.get_throughput()),
            "Scoring summary"
        );
        info!(
            mean_us = stats.mean_us,
            p50_us = stats.p50_us,
            p95_us = stats.p95_us,
            p99_us = stats.p99_us,
            max_us = stats.max_us,
            "Scoring latency"
        );
        for (kind, count) in self.get_failures_by_kind() {
            info!(kind = kind, count = count, "Rejected observations");
        }

        let distribution = self.get_probability_distribution();
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 {
                (count as f64 / total as f64) * 100.0
            } else {
                0.0
            };
            info!(
                "  {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                "█".repeat(((pct / 5.0) as usize).min(20))
            );
        }
    }
}

impl Default for ScoringMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoring time statistics
#[derive(Debug, Default)]
pub struct ScoringStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}
