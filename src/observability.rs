use tracing::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// POS API usage and checkout outcome counters
#[derive(Debug, Default)]
pub struct ApiMetrics {
    pub total_requests: AtomicU64,
    pub errors: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub completed_sales: AtomicU64,
    pub rejected_payments: AtomicU64,
    /// Submissions dropped before the POS API answered
    pub abandoned_submissions: AtomicU64,
    /// Customer or device lookups that failed and were shown as empty
    pub degraded_lookups: AtomicU64,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed_sale(&self) {
        self.completed_sales.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abandoned_submission(&self) {
        self.abandoned_submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_degraded_lookup(&self, lookup: &str) {
        self.degraded_lookups.fetch_add(1, Ordering::Relaxed);
        debug!(lookup, "Lookup degraded to an empty result");
    }

    pub fn record_rejected_payment(&self) {
        self.rejected_payments.fetch_add(1, Ordering::Relaxed);
        warn!("Payment rejected by POS API");
    }

    pub fn get_stats(&self) -> ApiStats {
        ApiStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            completed_sales: self.completed_sales.load(Ordering::Relaxed),
            rejected_payments: self.rejected_payments.load(Ordering::Relaxed),
            abandoned_submissions: self.abandoned_submissions.load(Ordering::Relaxed),
            degraded_lookups: self.degraded_lookups.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            requests = stats.total_requests,
            errors = stats.errors,
            cache_hits = stats.cache_hits,
            cache_misses = stats.cache_misses,
            completed_sales = stats.completed_sales,
            rejected_payments = stats.rejected_payments,
            abandoned_submissions = stats.abandoned_submissions,
            degraded_lookups = stats.degraded_lookups,
            "POS API metrics"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiStats {
    pub total_requests: u64,
    pub errors: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub completed_sales: u64,
    pub rejected_payments: u64,
    pub abandoned_submissions: u64,
    pub degraded_lookups: u64,
}

/// Global metrics instance
static API_METRICS: std::sync::LazyLock<ApiMetrics> = std::sync::LazyLock::new(ApiMetrics::new);

pub fn api_metrics() -> &'static ApiMetrics {
    &API_METRICS
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}
