//! Router metrics
//!
//! Atomic counters with relaxed ordering; eventually consistent, never
//! on the control-flow path.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the router hot paths
///
/// All methods are safe to call from multiple threads concurrently.
#[derive(Debug, Default)]
pub struct RouterMetrics {
    /// Synchronous requests routed
    requests_routed: AtomicU64,

    /// Synchronous requests that failed
    requests_failed: AtomicU64,

    /// Streams received for fan-out
    streams_received: AtomicU64,

    /// Individual outputs delivered
    outputs_routed: AtomicU64,

    /// Individual outputs that failed
    outputs_failed: AtomicU64,
}

impl RouterMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            requests_routed: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            streams_received: AtomicU64::new(0),
            outputs_routed: AtomicU64::new(0),
            outputs_failed: AtomicU64::new(0),
        }
    }

    /// Record a successfully routed request
    #[inline]
    pub fn record_request_routed(&self) {
        self.requests_routed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed request
    #[inline]
    pub fn record_request_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a stream entering fan-out
    #[inline]
    pub fn record_stream_received(&self) {
        self.streams_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivered output
    #[inline]
    pub fn record_output_routed(&self) {
        self.outputs_routed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed output
    #[inline]
    pub fn record_output_failed(&self) {
        self.outputs_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_routed: self.requests_routed.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            streams_received: self.streams_received.load(Ordering::Relaxed),
            outputs_routed: self.outputs_routed.load(Ordering::Relaxed),
            outputs_failed: self.outputs_failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the router counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Synchronous requests routed
    pub requests_routed: u64,
    /// Synchronous requests that failed
    pub requests_failed: u64,
    /// Streams received for fan-out
    pub streams_received: u64,
    /// Individual outputs delivered
    pub outputs_routed: u64,
    /// Individual outputs that failed
    pub outputs_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = RouterMetrics::new();
        metrics.record_stream_received();
        metrics.record_output_routed();
        metrics.record_output_routed();
        metrics.record_output_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.streams_received, 1);
        assert_eq!(snapshot.outputs_routed, 2);
        assert_eq!(snapshot.outputs_failed, 1);
        assert_eq!(snapshot.requests_routed, 0);
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(RouterMetrics::new());
        let mut handles = vec![];

        for _ in 0..4 {
            let m = Arc::clone(&metrics);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    m.record_request_routed();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.snapshot().requests_routed, 4000);
    }
}
