use crate::config::ProtocolConfig;
use crate::core::codec::{Envelope, FrameCodec};
use crate::core::header::Status;
use crate::core::packet::{Frame, Request, Response};
use crate::error::{ProtocolError, Result};
use crate::protocol::correlation::Correlator;
use crate::utils::metrics::Metrics;
use crate::utils::timeout::with_timeout_error;

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, warn};

/// A Get hit: client flags and the stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetValue {
    pub flags: u32,
    pub value: Bytes,
}

/// Connection-scoped client context.
///
/// Owns one TCP connection, its frame codec, and the pending-request
/// table. Commands correlate to responses through the opaque token, so
/// multiple requests may be awaited concurrently on one connection; no
/// ambient global connection state exists.
pub struct Client {
    sink: Mutex<SplitSink<Framed<TcpStream, FrameCodec>, Envelope>>,
    correlator: Arc<Correlator>,
    metrics: Arc<Metrics>,
    response_timeout: Duration,
    reader: JoinHandle<()>,
}

impl Client {
    /// Connect to a server and spawn the background read loop.
    #[instrument(skip(config))]
    pub async fn connect(addr: &str, config: &ProtocolConfig) -> Result<Self> {
        let stream = with_timeout_error(
            async { Ok(TcpStream::connect(addr).await?) },
            config.client.connection_timeout,
        )
        .await?;
        info!(addr, "Connected");

        let codec = FrameCodec::with_max_frame_size(config.framing.max_frame_size);
        let (sink, stream) = Framed::new(stream, codec).split();

        let correlator = Arc::new(Correlator::new());
        let metrics = Arc::new(Metrics::new());
        metrics.connection_established();

        let reader = tokio::spawn(read_loop(
            stream,
            Arc::clone(&correlator),
            Arc::clone(&metrics),
        ));

        Ok(Self {
            sink: Mutex::new(sink),
            correlator,
            metrics,
            response_timeout: config.client.response_timeout,
            reader,
        })
    }

    /// Store `value` under `key`. Fails with
    /// [`ProtocolError::ErrorStatus`] when the server rejects the store.
    #[instrument(skip(self, key, value))]
    pub async fn set(
        &self,
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
        flags: u32,
        expiry: u32,
    ) -> Result<()> {
        let request = Request::Set {
            key: key.into(),
            value: value.into(),
            flags,
            expiry,
        };
        let frame = self.roundtrip(request).await?;
        match frame.decode_response()? {
            Response::Set => Ok(()),
            Response::Error { status, .. } => Err(ProtocolError::ErrorStatus(status)),
            other => Err(ProtocolError::MalformedBody(format!(
                "unexpected body for a Set response: {other:?}"
            ))),
        }
    }

    /// Fetch the value stored under `key`. A miss resolves to `None`.
    #[instrument(skip(self, key))]
    pub async fn get(&self, key: impl Into<Bytes>) -> Result<Option<GetValue>> {
        let request = Request::Get { key: key.into() };
        let frame = self.roundtrip(request).await?;
        match frame.decode_response()? {
            Response::Get { flags, value } => Ok(Some(GetValue { flags, value })),
            Response::Error { status: Status::KeyNotFound, .. } => Ok(None),
            Response::Error { status, .. } => Err(ProtocolError::ErrorStatus(status)),
            other => Err(ProtocolError::MalformedBody(format!(
                "unexpected body for a Get response: {other:?}"
            ))),
        }
    }

    /// Send QuitQ and close the connection. Quiet semantics: the server
    /// does not reply, so nothing is awaited.
    #[instrument(skip(self))]
    pub async fn quit_quiet(self) -> Result<()> {
        let request = Request::QuitQuiet;
        debug_assert!(!request.expects_reply());
        self.metrics.frame_encoded(request.wire_len());

        let mut sink = self.sink.lock().await;
        sink.send(Envelope::new(request, 0)).await?;
        sink.close().await?;
        drop(sink);

        self.shutdown();
        Ok(())
    }

    /// Send one request and await its correlated response frame.
    async fn roundtrip(&self, request: Request) -> Result<Frame> {
        let (opaque, rx) = self.correlator.register()?;
        self.metrics.frame_encoded(request.wire_len());

        {
            let mut sink = self.sink.lock().await;
            if let Err(e) = sink.send(Envelope::new(request, opaque)).await {
                self.correlator.forget(opaque);
                return Err(e);
            }
        }

        let frame = with_timeout_error(
            async { rx.await.map_err(|_| ProtocolError::ConnectionClosed) },
            self.response_timeout,
        )
        .await;

        if frame.is_err() {
            // Timed out or torn down; drop the slot so a late response
            // is counted as a miss instead of resolving a dead waiter.
            self.correlator.forget(opaque);
        }
        frame
    }

    /// Number of requests currently awaiting responses.
    pub fn in_flight(&self) -> usize {
        self.correlator.in_flight()
    }

    /// Counters for this connection.
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    fn shutdown(&self) {
        self.reader.abort();
        self.correlator.fail_all();
        self.metrics.connection_closed();
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.reader.abort();
        self.correlator.fail_all();
    }
}

/// Drain the inbound frame stream, completing pending requests.
///
/// Framing errors arrive interleaved in the stream; connection-fatal ones
/// end the loop and fail every pending request.
async fn read_loop(
    mut stream: SplitStream<Framed<TcpStream, FrameCodec>>,
    correlator: Arc<Correlator>,
    metrics: Arc<Metrics>,
) {
    while let Some(item) = stream.next().await {
        match item {
            Ok(frame) => {
                metrics.frame_decoded(frame.wire_len());
                match correlator.complete(frame) {
                    Ok(true) => metrics.correlation_hit(),
                    Ok(false) => metrics.correlation_miss(),
                    Err(e) => {
                        metrics.protocol_error();
                        error!(error = %e, "Dropping unroutable frame");
                    }
                }
            }
            Err(e) => {
                metrics.protocol_error();
                error!(error = %e, "Stream failed, closing connection");
                break;
            }
        }
    }

    debug!("Read loop finished");
    if correlator.in_flight() > 0 {
        warn!(
            pending = correlator.in_flight(),
            "Connection closed with requests still in flight"
        );
    }
    correlator.fail_all();
}
