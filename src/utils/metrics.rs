//! Protocol counters.
//!
//! Plain atomic counters, shared behind an `Arc` and incremented from the
//! send path, the read loop, and the correlator. A snapshot can be logged
//! at any time without pausing traffic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Counter set for one connection or one process, caller's choice.
#[derive(Debug)]
pub struct Metrics {
    /// Connections established over this collector's lifetime
    pub connections_total: AtomicU64,
    /// Connections currently open
    pub connections_active: AtomicU64,
    /// Total frames encoded for sending
    pub frames_encoded: AtomicU64,
    /// Total frames decoded from the stream
    pub frames_decoded: AtomicU64,
    /// Bytes written to the wire
    pub bytes_sent: AtomicU64,
    /// Bytes read from the wire
    pub bytes_received: AtomicU64,
    /// Responses that matched a pending request by opaque
    pub correlation_hits: AtomicU64,
    /// Responses with no pending request for their opaque
    pub correlation_misses: AtomicU64,
    /// Connection-level failures
    pub connection_errors: AtomicU64,
    /// Protocol errors (framing and body decode)
    pub protocol_errors: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            frames_encoded: AtomicU64::new(0),
            frames_decoded: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            correlation_hits: AtomicU64::new(0),
            correlation_misses: AtomicU64::new(0),
            connection_errors: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Count a newly opened connection.
    pub fn connection_established(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a closed connection.
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record an encoded outbound frame of the given wire length
    pub fn frame_encoded(&self, bytes: usize) {
        self.frames_encoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a decoded inbound frame of the given wire length
    pub fn frame_decoded(&self, bytes: usize) {
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a response matched to a pending request
    pub fn correlation_hit(&self) {
        self.correlation_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a response with no matching pending request
    pub fn correlation_miss(&self) {
        self.correlation_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a connection-level failure.
    pub fn connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a framing or body-decode failure.
    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Uptime since this collector was created
    pub fn uptime(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Log a snapshot of all counters at INFO level
    pub fn log_snapshot(&self) {
        info!(
            connections_total = self.connections_total.load(Ordering::Relaxed),
            connections_active = self.connections_active.load(Ordering::Relaxed),
            frames_encoded = self.frames_encoded.load(Ordering::Relaxed),
            frames_decoded = self.frames_decoded.load(Ordering::Relaxed),
            bytes_sent = self.bytes_sent.load(Ordering::Relaxed),
            bytes_received = self.bytes_received.load(Ordering::Relaxed),
            correlation_hits = self.correlation_hits.load(Ordering::Relaxed),
            correlation_misses = self.correlation_misses.load(Ordering::Relaxed),
            connection_errors = self.connection_errors.load(Ordering::Relaxed),
            protocol_errors = self.protocol_errors.load(Ordering::Relaxed),
            uptime_secs = self.uptime().as_secs(),
            "metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.connection_established();
        metrics.frame_encoded(42);
        metrics.frame_encoded(8);
        metrics.frame_decoded(24);
        metrics.correlation_hit();
        metrics.correlation_miss();
        metrics.connection_closed();

        assert_eq!(metrics.connections_total.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.connections_active.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.frames_encoded.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.bytes_sent.load(Ordering::Relaxed), 50);
        assert_eq!(metrics.bytes_received.load(Ordering::Relaxed), 24);
        assert_eq!(metrics.correlation_hits.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.correlation_misses.load(Ordering::Relaxed), 1);
    }
}
