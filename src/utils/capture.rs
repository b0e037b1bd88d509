//! Packet capture and replay.
//!
//! Debug/test utility for persisting raw frame buffers to disk and
//! feeding them back over a connection. Not part of the protocol logic:
//! captured bytes are opaque here, the codec interprets them.
//!
//! Replay supports a configurable chunking strategy so fragmented
//! arrival (down to one byte per write) can be reproduced against a
//! frame assembler without a misbehaving network.

use crate::error::Result;
use bytes::Bytes;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Load a captured packet buffer from a file.
pub async fn load_packet<P: AsRef<Path>>(path: P) -> Result<Bytes> {
    let data = tokio::fs::read(path.as_ref()).await?;
    debug!(path = %path.as_ref().display(), bytes = data.len(), "Loaded packet capture");
    Ok(Bytes::from(data))
}

/// Write a packet buffer to a file, replacing any existing capture.
pub async fn dump_packet<P: AsRef<Path>>(path: P, packet: &[u8]) -> Result<()> {
    tokio::fs::write(path.as_ref(), packet).await?;
    debug!(path = %path.as_ref().display(), bytes = packet.len(), "Dumped packet capture");
    Ok(())
}

/// How a replayed buffer is split across writes.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingStrategy {
    /// Bytes per write; 0 is treated as 1
    pub chunk_size: usize,
    /// Pause between writes
    pub delay: Duration,
}

impl ChunkingStrategy {
    /// Send everything in one write with no delay.
    pub fn whole() -> Self {
        Self {
            chunk_size: usize::MAX,
            delay: Duration::ZERO,
        }
    }

    /// One byte per write with the given pause, reproducing the slowest
    /// possible arrival pattern.
    pub fn byte_at_a_time(delay: Duration) -> Self {
        Self {
            chunk_size: 1,
            delay,
        }
    }
}

/// Write `packet` to `writer` according to the chunking strategy.
pub async fn replay<W: AsyncWrite + Unpin>(
    writer: &mut W,
    packet: &[u8],
    strategy: ChunkingStrategy,
) -> Result<()> {
    let chunk_size = strategy.chunk_size.max(1);
    let mut chunks = packet.chunks(chunk_size).peekable();
    while let Some(chunk) = chunks.next() {
        writer.write_all(chunk).await?;
        if chunks.peek().is_some() && !strategy.delay.is_zero() {
            tokio::time::sleep(strategy.delay).await;
        }
    }
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dump_then_load_roundtrip() {
        let dir = std::env::temp_dir().join("memwire-capture-test");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("set_response.packet");

        let packet = [0x81u8, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        dump_packet(&path, &packet).await.unwrap();
        let loaded = load_packet(&path).await.unwrap();
        assert_eq!(&loaded[..], &packet[..]);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_replay_chunked_preserves_bytes() {
        let packet: Vec<u8> = (0..=50).collect();
        let mut out = Vec::new();
        replay(
            &mut out,
            &packet,
            ChunkingStrategy {
                chunk_size: 7,
                delay: Duration::ZERO,
            },
        )
        .await
        .unwrap();
        assert_eq!(out, packet);
    }
}
