//! Request/response correlation.
//!
//! The opaque header field is a caller-chosen token echoed back in
//! responses. The [`Correlator`] keeps a pending-request table keyed by
//! opaque value, which allows multiple requests to be in flight on one
//! connection at a time instead of a strict send-wait-send chain.

use crate::core::packet::Frame;
use crate::error::{constants, ProtocolError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::warn;

/// Pending-request table keyed by the opaque correlation token.
///
/// One correlator per connection. Opaque values are allocated
/// monotonically and wrap at `u32::MAX`; a table would need four billion
/// simultaneously pending requests before a collision.
#[derive(Debug)]
pub struct Correlator {
    next_opaque: AtomicU32,
    pending: Mutex<HashMap<u32, oneshot::Sender<Frame>>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            // Start above zero so captured traffic from encoders that
            // hardcode opaque 0 never collides with live requests.
            next_opaque: AtomicU32::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate an opaque token and register a completion slot for it.
    ///
    /// The returned receiver resolves when a response frame carrying the
    /// token arrives, or fails when the connection tears down.
    pub fn register(&self) -> Result<(u32, oneshot::Receiver<Frame>)> {
        let opaque = self.next_opaque.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        let mut pending = self
            .pending
            .lock()
            .map_err(|_| ProtocolError::Custom(constants::ERR_CORRELATOR_LOCK.to_string()))?;
        pending.insert(opaque, tx);

        Ok((opaque, rx))
    }

    /// Route a response frame to the request that is waiting on its
    /// opaque token. Returns `false` when no request is pending for the
    /// token; unmatched responses are reported, not fatal.
    pub fn complete(&self, frame: Frame) -> Result<bool> {
        let header = frame.expect_response()?;
        let opaque = header.opaque;

        let sender = {
            let mut pending = self
                .pending
                .lock()
                .map_err(|_| ProtocolError::Custom(constants::ERR_CORRELATOR_LOCK.to_string()))?;
            pending.remove(&opaque)
        };

        match sender {
            Some(tx) => {
                // A dropped receiver means the caller gave up (timeout);
                // the response is simply discarded.
                let _ = tx.send(frame);
                Ok(true)
            }
            None => {
                warn!(opaque, opcode = frame.header.opcode(), "Response without a pending request");
                Ok(false)
            }
        }
    }

    /// Abandon a registration, e.g. after a send failure or timeout.
    pub fn forget(&self, opaque: u32) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&opaque);
        }
    }

    /// Fail every pending request. Called on connection teardown; each
    /// waiting receiver observes a closed channel.
    pub fn fail_all(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.clear();
        }
    }

    /// Number of requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::header::{Opcode, Status};
    use crate::core::packet::Response;

    #[tokio::test]
    async fn test_register_complete_resolves_receiver() {
        let correlator = Correlator::new();
        let (opaque, rx) = correlator.register().unwrap();
        assert_eq!(correlator.in_flight(), 1);

        let frame = Response::Set.into_frame(Opcode::Set, opaque);
        assert!(correlator.complete(frame).unwrap());

        let received = rx.await.unwrap();
        assert_eq!(received.header.opaque(), opaque);
        assert_eq!(correlator.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_unmatched_opaque_is_reported_not_fatal() {
        let correlator = Correlator::new();
        let frame = Response::Set.into_frame(Opcode::Set, 0xABCD);
        assert!(!correlator.complete(frame).unwrap());
    }

    #[tokio::test]
    async fn test_fail_all_closes_receivers() {
        let correlator = Correlator::new();
        let (_, rx) = correlator.register().unwrap();
        correlator.fail_all();
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_request_magic_is_rejected() {
        let correlator = Correlator::new();
        let bytes = crate::core::packet::encode_get("k").unwrap();
        let frame = crate::core::packet::Frame::parse(&bytes).unwrap();
        assert!(matches!(
            correlator.complete(frame),
            Err(ProtocolError::InvalidMagic(_))
        ));
    }

    #[tokio::test]
    async fn test_distinct_opaques_for_concurrent_requests() {
        let correlator = Correlator::new();
        let (a, rx_a) = correlator.register().unwrap();
        let (b, rx_b) = correlator.register().unwrap();
        assert_ne!(a, b);

        // complete out of order
        let frame_b = Response::Error {
            status: Status::KeyNotFound,
            message: bytes::Bytes::new(),
        }
        .into_frame(Opcode::Get, b);
        correlator.complete(frame_b).unwrap();
        let frame_a = Response::Set.into_frame(Opcode::Set, a);
        correlator.complete(frame_a).unwrap();

        assert_eq!(rx_a.await.unwrap().header.opaque(), a);
        assert_eq!(rx_b.await.unwrap().header.opaque(), b);
    }
}
