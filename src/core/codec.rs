//! # Frame Codec
//!
//! Turns an arbitrarily chunked byte stream into discrete, validated
//! frames, and encodes outbound commands onto the stream.
//!
//! [`FrameCodec`] plugs into `tokio_util::codec::Framed` for async
//! transports. [`FrameAssembler`] wraps the same state machine behind a
//! synchronous `feed` API for callers that drive their own byte source.
//!
//! ## Reassembly states
//! The receive buffer is the only state. Each `decode` call is in one of
//! three conditions:
//! - fewer than 24 bytes buffered: the frame length is unknown, wait
//! - at least 24 but fewer than `24 + total_body_length`: wait
//! - a full frame buffered: split it off (zero-copy) and yield it,
//!   then repeat — one chunk may complete zero, one, or many frames
//!
//! ## Hardening
//! - The magic byte is validated at frame start; a byte that is neither
//!   the request nor the response magic fails the connection.
//! - A declared body length above the configured maximum fails with
//!   `FrameTooLarge` before any of the oversized body is buffered.
//! - End-of-stream with a non-empty partial frame reports `UnexpectedEof`
//!   rather than silently discarding bytes.

use crate::config::MAX_FRAME_SIZE;
use crate::core::header::{Header, HEADER_SIZE, REQUEST_MAGIC, RESPONSE_MAGIC};
use crate::core::packet::{Frame, Request};
use crate::error::{ProtocolError, Result};
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Offset of the total body length field within the header.
const BODY_LEN_OFFSET: usize = 8;

/// Stream codec for length-prefixed binary protocol frames.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    /// Codec with the default maximum frame size ([`MAX_FRAME_SIZE`]).
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Codec with a caller-chosen maximum body length.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let magic = src[0];
        if magic != REQUEST_MAGIC && magic != RESPONSE_MAGIC {
            return Err(ProtocolError::InvalidMagic(magic));
        }

        let body_len = u32::from_be_bytes([
            src[BODY_LEN_OFFSET],
            src[BODY_LEN_OFFSET + 1],
            src[BODY_LEN_OFFSET + 2],
            src[BODY_LEN_OFFSET + 3],
        ]) as usize;

        if body_len > self.max_frame_size {
            return Err(ProtocolError::FrameTooLarge {
                declared: body_len,
                max: self.max_frame_size,
            });
        }

        let frame_len = HEADER_SIZE + body_len;
        if src.len() < frame_len {
            // Ask the transport for the rest of the frame in one read.
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let header = Header::parse(&src[..HEADER_SIZE])?;
        let mut frame = src.split_to(frame_len);
        frame.advance(HEADER_SIZE);

        Ok(Some(Frame {
            header,
            body: frame.freeze(),
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(ProtocolError::UnexpectedEof {
                buffered: src.len(),
            }),
        }
    }
}

/// A request paired with its correlation token, ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub request: Request,
    pub opaque: u32,
}

impl Envelope {
    pub fn new(request: Request, opaque: u32) -> Self {
        Self { request, opaque }
    }
}

impl Encoder<Envelope> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<()> {
        let bytes = item.request.encode(item.opaque)?;
        dst.reserve(bytes.len());
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        let bytes = item.to_bytes();
        dst.reserve(bytes.len());
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

/// Synchronous reassembly over a caller-driven byte source.
///
/// Owns the receive buffer exclusively; mutated only by appending arrived
/// bytes and trimming off completed frames. One assembler per connection,
/// never shared.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    codec: FrameCodec,
    buf: BytesMut,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            codec: FrameCodec::with_max_frame_size(max_frame_size),
            buf: BytesMut::new(),
        }
    }

    /// Append newly arrived bytes and lazily yield every frame now fully
    /// buffered, in arrival order. Residual partial data stays buffered
    /// for the next call. Framing errors are yielded in-sequence; after an
    /// error the iterator ends and the caller decides whether to continue.
    pub fn feed<'a>(&'a mut self, bytes: &[u8]) -> Frames<'a> {
        self.buf.extend_from_slice(bytes);
        Frames {
            assembler: self,
            failed: false,
        }
    }

    /// Signal end-of-stream. A non-empty residual partial frame is a
    /// truncation, reported rather than silently dropped.
    pub fn finish(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::UnexpectedEof {
                buffered: self.buf.len(),
            })
        }
    }

    /// Bytes received but not yet consumed into complete frames.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

/// Lazy iterator over the frames completed by one `feed` call.
pub struct Frames<'a> {
    assembler: &'a mut FrameAssembler,
    failed: bool,
}

impl Iterator for Frames<'_> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.assembler.codec.decode(&mut self.assembler.buf) {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
