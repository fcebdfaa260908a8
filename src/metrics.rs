//! Request metrics and statistics for the prediction service.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept before the oldest half is dropped
const MAX_SAMPLES: usize = 10_000;

/// Metrics collector for the HTTP service
pub struct ServiceMetrics {
    /// Successful predictions
    pub predictions: AtomicU64,
    /// Requests rejected by validation
    pub validation_failures: AtomicU64,
    /// Requests that failed inside inference
    pub errors: AtomicU64,
    /// Predictions per class
    by_class: RwLock<BTreeMap<String, u64>>,
    /// Request processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            by_class: RwLock::new(BTreeMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, class: &str, processing_time: Duration) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        self.record_time(processing_time);

        if let Ok(mut by_class) = self.by_class.write() {
            *by_class.entry(class.to_string()).or_insert(0) += 1;
        }
    }

    /// Record a request rejected by validation
    pub fn record_validation_failure(&self, processing_time: Duration) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
        self.record_time(processing_time);
    }

    /// Record an internal failure
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_time(&self, processing_time: Duration) {
        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > MAX_SAMPLES {
                times.drain(0..MAX_SAMPLES / 2);
            }
        }
    }

    /// Processing time statistics over the retained samples
    pub fn processing_stats(&self) -> ProcessingStats {
        let mut sorted = match self.processing_times.read() {
            Ok(times) => times.clone(),
            Err(_) => return ProcessingStats::default(),
        };
        if sorted.is_empty() {
            return ProcessingStats::default();
        }
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(&sorted, 0.50),
            p95_us: percentile(&sorted, 0.95),
            p99_us: percentile(&sorted, 0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Requests per second since startup
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_requests() as f64 / elapsed
        } else {
            0.0
        }
    }

    fn total_requests(&self) -> u64 {
        self.predictions.load(Ordering::Relaxed)
            + self.validation_failures.load(Ordering::Relaxed)
            + self.errors.load(Ordering::Relaxed)
    }

    /// Predictions per class
    pub fn predictions_by_class(&self) -> BTreeMap<String, u64> {
        self.by_class
            .read()
            .map(|by_class| by_class.clone())
            .unwrap_or_default()
    }

    /// Point-in-time view, served at `/metrics`
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            predictions: self.predictions.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            throughput: self.throughput(),
            processing: self.processing_stats(),
            predictions_by_class: self.predictions_by_class(),
        }
    }

    /// Log summary statistics
    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        let total = snapshot.predictions + snapshot.validation_failures + snapshot.errors;
        let rejection_rate = if total > 0 {
            snapshot.validation_failures as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        info!(
            predictions = snapshot.predictions,
            validation_failures = snapshot.validation_failures,
            errors = snapshot.errors,
            rejection_rate = format!("{rejection_rate:.1}%"),
            throughput = format!("{:.2} req/s", snapshot.throughput),
            "Service metrics"
        );
        info!(
            mean_us = snapshot.processing.mean_us,
            p50_us = snapshot.processing.p50_us,
            p95_us = snapshot.processing.p95_us,
            p99_us = snapshot.processing.p99_us,
            max_us = snapshot.processing.max_us,
            "Processing time"
        );
        for (class, count) in &snapshot.predictions_by_class {
            let pct = if snapshot.predictions > 0 {
                *count as f64 / snapshot.predictions as f64 * 100.0
            } else {
                0.0
            };
            info!(class = %class, count, share = format!("{pct:.1}%"), "Predicted class");
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Value at quantile `q` of sorted samples
fn percentile(sorted: &[u64], q: f64) -> u64 {
    let idx = ((sorted.len() as f64 * q) as usize).min(sorted.len() - 1);
    sorted[idx]
}

/// Processing time statistics
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub predictions: u64,
    pub validation_failures: u64,
    pub errors: u64,
    /// Requests per second since startup
    pub throughput: f64,
    pub processing: ProcessingStats,
    pub predictions_by_class: BTreeMap<String, u64>,
}

/// Logs a metrics summary at a fixed interval
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task; never returns
    pub async fn start(self) {
        let period = Duration::from_secs(self.interval_secs.max(1));
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            interval.tick().await;
            self.metrics.log_summary();
        }
    }
}
