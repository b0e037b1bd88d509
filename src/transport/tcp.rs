use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ProtocolConfig;
use crate::core::codec::FrameCodec;
use crate::core::header::Opcode;
use crate::error::{ProtocolError, Result};
use crate::protocol::dispatcher::Dispatcher;

/// Connect to a server, returning the framed transport.
///
/// Callers that want request/response correlation should use
/// [`crate::service::Client`] instead; this is the raw framed stream.
#[instrument(skip(config))]
pub async fn connect(addr: &str, config: &ProtocolConfig) -> Result<Framed<TcpStream, FrameCodec>> {
    let stream = TcpStream::connect(addr).await?;
    let codec = FrameCodec::with_max_frame_size(config.framing.max_frame_size);
    Ok(Framed::new(stream, codec))
}

/// Start a TCP server that routes inbound request frames through the
/// given dispatcher, shutting down gracefully on CTRL+C.
#[instrument(skip(config, dispatcher), fields(addr = %config.server.address))]
pub async fn start_server(config: ProtocolConfig, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("CTRL+C received, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    start_server_with_shutdown(config, dispatcher, shutdown_rx).await
}

/// Start a TCP server with an external shutdown channel.
#[instrument(skip(config, dispatcher, shutdown_rx), fields(addr = %config.server.address))]
pub async fn start_server_with_shutdown(
    config: ProtocolConfig,
    dispatcher: Arc<Dispatcher>,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let listener = TcpListener::bind(&config.server.address).await?;
    info!(addr = %config.server.address, "Listening");

    let max_frame_size = config.framing.max_frame_size;
    let max_connections = config.server.max_connections;
    let active = Arc::new(AtomicU32::new(0));

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                drain_connections(&active, config.server.shutdown_timeout).await;
                return Ok(());
            }

            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                        continue;
                    }
                };

                if active.load(Ordering::Acquire) as usize >= max_connections {
                    warn!(peer = %addr, limit = max_connections, "Connection limit reached, refusing");
                    continue;
                }
                info!(peer = %addr, "Connection accepted");
                active.fetch_add(1, Ordering::AcqRel);

                let dispatcher = Arc::clone(&dispatcher);
                let active = Arc::clone(&active);
                tokio::spawn(async move {
                    let codec = FrameCodec::with_max_frame_size(max_frame_size);
                    let framed = Framed::new(stream, codec);

                    if let Err(e) = serve_connection(framed, dispatcher).await {
                        error!(peer = %addr, error = %e, "Connection failed");
                    }

                    active.fetch_sub(1, Ordering::AcqRel);
                    info!(peer = %addr, "Connection closed");
                });
            }
        }
    }
}

/// Wait for active connections to finish, bounded by the shutdown timeout.
async fn drain_connections(active: &AtomicU32, limit: Duration) {
    info!("Shutting down, draining connections");
    let deadline = tokio::time::Instant::now() + limit;
    let mut tick = tokio::time::interval(Duration::from_millis(250));

    loop {
        if tokio::time::timeout_at(deadline, tick.tick()).await.is_err() {
            warn!("Shutdown timeout reached, forcing exit");
            return;
        }
        let remaining = active.load(Ordering::Acquire);
        if remaining == 0 {
            info!("All connections closed");
            return;
        }
        debug!(connections = remaining, "Waiting for connections to close");
    }
}

/// Per-connection loop: frames in, dispatched replies out.
///
/// Per-frame errors (unsupported opcode, malformed body) are logged and
/// the frame skipped; framing errors are connection-fatal.
pub async fn serve_connection(
    mut framed: Framed<TcpStream, FrameCodec>,
    dispatcher: Arc<Dispatcher>,
) -> Result<()> {
    while let Some(item) = framed.next().await {
        let frame = item?;
        debug!(
            opcode = frame.header.opcode(),
            body_len = frame.body.len(),
            "Frame received"
        );

        let quit = frame.header.opcode() == Opcode::QuitQ as u8;

        match dispatcher.dispatch(&frame) {
            Ok(Some(reply)) => framed.send(reply).await?,
            Ok(None) => {}
            Err(e @ ProtocolError::UnsupportedOpcode(_))
            | Err(e @ ProtocolError::MalformedBody(_)) => {
                warn!(error = %e, "Skipping frame");
            }
            Err(e) => return Err(e),
        }

        if quit {
            debug!("QuitQ received, closing connection");
            break;
        }
    }
    Ok(())
}
