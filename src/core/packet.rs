//! # Frames and Commands
//!
//! One frame is one complete protocol unit: a 24-byte header plus the body
//! it declares. This module owns the exact byte layout of each command kind
//! and the typed views produced when decoding a frame's body.
//!
//! ## Body layout per opcode
//! - **Set request**: extras = 8 bytes (flags u32 BE, expiry u32 BE), then
//!   key, then value
//! - **Get request**: no extras, body is the key
//! - **Get response**: extras = 4 bytes (flags u32 BE), no key, then value
//! - **QuitQ**: header only, no body, no response expected
//!
//! Encoding is pure: each encode call produces an owned byte buffer and
//! performs no I/O.

use crate::core::header::{
    Header, Opcode, RequestHeader, ResponseHeader, Status, HEADER_SIZE,
};
use crate::error::{ProtocolError, Result};
use bytes::{BufMut, Bytes, BytesMut};

/// Byte width of the extras block on a Set request (flags + expiry).
pub const SET_EXTRAS_LEN: u8 = 8;

/// Byte width of the extras block on a Get response (flags).
pub const GET_RESPONSE_EXTRAS_LEN: u8 = 4;

/// A complete protocol unit: header plus body bytes.
///
/// Produced by the frame codec from buffered stream data, or parsed from a
/// captured byte buffer. The body's internal shape is interpreted lazily
/// via [`Frame::decode_request`] / [`Frame::decode_response`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    pub body: Bytes,
}

impl Frame {
    /// Parse a byte region known to contain exactly one complete frame.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = Header::parse(data)?;
        let declared = header.total_body_length() as usize;
        if data.len() != HEADER_SIZE + declared {
            return Err(ProtocolError::MalformedBody(format!(
                "frame of {} bytes does not match declared body length {declared}",
                data.len()
            )));
        }
        Ok(Self {
            header,
            body: Bytes::copy_from_slice(&data[HEADER_SIZE..]),
        })
    }

    /// Total wire length of this frame.
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }

    /// Re-encode this frame to its wire representation.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        match &self.header {
            Header::Request(h) => h.encode(&mut buf),
            Header::Response(h) => h.encode(&mut buf),
        }
        buf.extend_from_slice(&self.body);
        buf.freeze()
    }

    /// The response header, or [`ProtocolError::InvalidMagic`] when this
    /// frame is a request. In a context that expects responses, a request
    /// magic is a protocol violation, not a warning.
    pub fn expect_response(&self) -> Result<&ResponseHeader> {
        match &self.header {
            Header::Response(h) => Ok(h),
            Header::Request(_) => Err(ProtocolError::InvalidMagic(
                crate::core::header::REQUEST_MAGIC,
            )),
        }
    }

    /// Interpret this frame's body as a request.
    pub fn decode_request(&self) -> Result<Request> {
        match &self.header {
            Header::Request(h) => decode_request_body(h, &self.body),
            Header::Response(_) => Err(ProtocolError::InvalidMagic(
                crate::core::header::RESPONSE_MAGIC,
            )),
        }
    }

    /// Interpret this frame's body as a response.
    pub fn decode_response(&self) -> Result<Response> {
        let header = self.expect_response()?;
        decode_body(header, &self.body)
    }
}

/// An outbound command, before it is given a wire representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Store `value` under `key` with client flags and an expiry in seconds.
    Set {
        key: Bytes,
        value: Bytes,
        flags: u32,
        expiry: u32,
    },
    /// Fetch the value stored under `key`.
    Get { key: Bytes },
    /// Close the connection without waiting for an acknowledgement.
    QuitQuiet,
}

impl Request {
    /// The opcode this command encodes to.
    pub fn opcode(&self) -> Opcode {
        match self {
            Request::Set { .. } => Opcode::Set,
            Request::Get { .. } => Opcode::Get,
            Request::QuitQuiet => Opcode::QuitQ,
        }
    }

    /// Whether the server sends a response for this command.
    /// Quiet commands pipeline without acknowledgement.
    pub fn expects_reply(&self) -> bool {
        !self.opcode().is_quiet()
    }

    /// Wire length of this command once encoded.
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE
            + match self {
                Request::Set { key, value, .. } => {
                    SET_EXTRAS_LEN as usize + key.len() + value.len()
                }
                Request::Get { key } => key.len(),
                Request::QuitQuiet => 0,
            }
    }

    /// Encode this command as a header + body byte sequence.
    ///
    /// Fails with [`ProtocolError::EncodingOverflow`] when the key or the
    /// combined body exceed their wire field widths; never truncates.
    pub fn encode(&self, opaque: u32) -> Result<Bytes> {
        match self {
            Request::Set {
                key,
                value,
                flags,
                expiry,
            } => {
                let key_length = checked_key_len(key)?;
                let total = SET_EXTRAS_LEN as u64 + key.len() as u64 + value.len() as u64;
                if total > u32::MAX as u64 {
                    return Err(ProtocolError::EncodingOverflow {
                        field: "total body",
                        len: total as usize,
                        max: u32::MAX as usize,
                    });
                }

                let mut header = RequestHeader::new(Opcode::Set);
                header.key_length = key_length;
                header.extras_length = SET_EXTRAS_LEN;
                header.total_body_length = total as u32;
                header.opaque = opaque;

                let mut buf = BytesMut::with_capacity(HEADER_SIZE + total as usize);
                header.encode(&mut buf);
                buf.put_u32(*flags);
                buf.put_u32(*expiry);
                buf.extend_from_slice(key);
                buf.extend_from_slice(value);
                Ok(buf.freeze())
            }
            Request::Get { key } => {
                let key_length = checked_key_len(key)?;

                let mut header = RequestHeader::new(Opcode::Get);
                header.key_length = key_length;
                header.total_body_length = key_length as u32;
                header.opaque = opaque;

                let mut buf = BytesMut::with_capacity(HEADER_SIZE + key.len());
                header.encode(&mut buf);
                buf.extend_from_slice(key);
                Ok(buf.freeze())
            }
            Request::QuitQuiet => {
                let mut header = RequestHeader::new(Opcode::QuitQ);
                header.opaque = opaque;

                let mut buf = BytesMut::with_capacity(HEADER_SIZE);
                header.encode(&mut buf);
                Ok(buf.freeze())
            }
        }
    }
}

/// Encode a Set command with opaque 0.
pub fn encode_set(
    key: impl Into<Bytes>,
    value: impl Into<Bytes>,
    flags: u32,
    expiry: u32,
) -> Result<Bytes> {
    Request::Set {
        key: key.into(),
        value: value.into(),
        flags,
        expiry,
    }
    .encode(0)
}

/// Encode a Get command with opaque 0.
pub fn encode_get(key: impl Into<Bytes>) -> Result<Bytes> {
    Request::Get { key: key.into() }.encode(0)
}

/// Encode a QuitQ command: header only, all length fields zero.
pub fn encode_quit_quiet() -> Result<Bytes> {
    Request::QuitQuiet.encode(0)
}

/// A decoded response body, shaped by the opcode of the frame it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Get hit: client flags and the stored value.
    Get { flags: u32, value: Bytes },
    /// Set acknowledged, empty body.
    Set,
    /// QuitQ acknowledged (only sent on error paths), empty body.
    QuitQ,
    /// Non-success status; the body carries the server's error text.
    Error { status: Status, message: Bytes },
}

impl Response {
    /// Build a complete response frame, echoing the request's opaque.
    pub fn into_frame(self, opcode: Opcode, opaque: u32) -> Frame {
        let status = match &self {
            Response::Error { status, .. } => *status,
            _ => Status::NoError,
        };
        let mut header = ResponseHeader::new(opcode, status);
        header.opaque = opaque;

        let body = match self {
            Response::Get { flags, value } => {
                header.extras_length = GET_RESPONSE_EXTRAS_LEN;
                let mut body = BytesMut::with_capacity(
                    GET_RESPONSE_EXTRAS_LEN as usize + value.len(),
                );
                body.put_u32(flags);
                body.extend_from_slice(&value);
                body.freeze()
            }
            Response::Set | Response::QuitQ => Bytes::new(),
            Response::Error { message, .. } => message,
        };
        header.total_body_length = body.len() as u32;

        Frame {
            header: Header::Response(header),
            body,
        }
    }
}

/// Interpret a response body according to its header.
///
/// The caller must hand in the exact body region the header declares;
/// any length mismatch is [`ProtocolError::MalformedBody`]. Opcodes this
/// crate does not interpret fail with [`ProtocolError::UnsupportedOpcode`]
/// while leaving the raw frame consumable by the caller.
pub fn decode_body(header: &ResponseHeader, body: &Bytes) -> Result<Response> {
    check_declared_length(header.total_body_length, body)?;
    header.value_length()?;

    let opcode = header
        .known_opcode()
        .ok_or(ProtocolError::UnsupportedOpcode(header.opcode))?;

    if !header.status.is_success() {
        return Ok(Response::Error {
            status: header.status,
            message: body.clone(),
        });
    }

    match opcode {
        Opcode::Get => {
            if header.extras_length != GET_RESPONSE_EXTRAS_LEN || header.key_length != 0 {
                return Err(ProtocolError::MalformedBody(format!(
                    "Get response requires extras {GET_RESPONSE_EXTRAS_LEN} and no key, got extras {} key {}",
                    header.extras_length, header.key_length
                )));
            }
            let flags = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
            let value = body.slice(GET_RESPONSE_EXTRAS_LEN as usize..);
            Ok(Response::Get { flags, value })
        }
        Opcode::Set => {
            if !body.is_empty() {
                return Err(ProtocolError::MalformedBody(format!(
                    "Set response carries an unexpected {}-byte body",
                    body.len()
                )));
            }
            Ok(Response::Set)
        }
        Opcode::QuitQ => {
            if !body.is_empty() {
                return Err(ProtocolError::MalformedBody(format!(
                    "QuitQ response carries an unexpected {}-byte body",
                    body.len()
                )));
            }
            Ok(Response::QuitQ)
        }
    }
}

/// Interpret a request body according to its header (the server-side view
/// of the same wire format).
pub fn decode_request_body(header: &RequestHeader, body: &Bytes) -> Result<Request> {
    check_declared_length(header.total_body_length, body)?;
    let value_length = header.value_length()?;

    let opcode = header
        .known_opcode()
        .ok_or(ProtocolError::UnsupportedOpcode(header.opcode))?;

    match opcode {
        Opcode::Set => {
            if header.extras_length != SET_EXTRAS_LEN {
                return Err(ProtocolError::MalformedBody(format!(
                    "Set request requires extras {SET_EXTRAS_LEN}, got {}",
                    header.extras_length
                )));
            }
            let flags = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
            let expiry = u32::from_be_bytes([body[4], body[5], body[6], body[7]]);
            let key_start = SET_EXTRAS_LEN as usize;
            let key_end = key_start + header.key_length as usize;
            Ok(Request::Set {
                key: body.slice(key_start..key_end),
                value: body.slice(key_end..key_end + value_length),
                flags,
                expiry,
            })
        }
        Opcode::Get => {
            if header.extras_length != 0 || value_length != 0 {
                return Err(ProtocolError::MalformedBody(format!(
                    "Get request carries extras {} or value bytes {value_length}",
                    header.extras_length
                )));
            }
            Ok(Request::Get { key: body.clone() })
        }
        Opcode::QuitQ => {
            if !body.is_empty() {
                return Err(ProtocolError::MalformedBody(format!(
                    "QuitQ request carries an unexpected {}-byte body",
                    body.len()
                )));
            }
            Ok(Request::QuitQuiet)
        }
    }
}

fn checked_key_len(key: &Bytes) -> Result<u16> {
    u16::try_from(key.len()).map_err(|_| ProtocolError::EncodingOverflow {
        field: "key",
        len: key.len(),
        max: u16::MAX as usize,
    })
}

fn check_declared_length(declared: u32, body: &Bytes) -> Result<()> {
    if body.len() != declared as usize {
        return Err(ProtocolError::MalformedBody(format!(
            "body of {} bytes does not match declared length {declared}",
            body.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_set_exact_layout() {
        let bytes = encode_set("hello", "world", 0xdeadbeef, 3600).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 8 + 5 + 5);

        // header
        assert_eq!(bytes[0], 0x80);
        assert_eq!(bytes[1], 0x01);
        assert_eq!(&bytes[2..4], &[0x00, 0x05]); // key length
        assert_eq!(bytes[4], 8); // extras length
        assert_eq!(bytes[5], 0); // data type
        assert_eq!(&bytes[6..8], &[0x00, 0x00]); // reserved
        assert_eq!(&bytes[8..12], &[0x00, 0x00, 0x00, 18]); // total body
        assert_eq!(&bytes[12..16], &[0; 4]); // opaque
        assert_eq!(&bytes[16..24], &[0; 8]); // cas

        // body: flags, expiry, key, value
        assert_eq!(&bytes[24..28], &0xdeadbeef_u32.to_be_bytes());
        assert_eq!(&bytes[28..32], &3600_u32.to_be_bytes());
        assert_eq!(&bytes[32..37], b"hello");
        assert_eq!(&bytes[37..42], b"world");
    }

    #[test]
    fn test_encode_get_exact_layout() {
        let bytes = encode_get("hello").unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 5);
        assert_eq!(bytes[0], 0x80);
        assert_eq!(bytes[1], 0x00);
        assert_eq!(&bytes[2..4], &[0x00, 0x05]);
        assert_eq!(bytes[4], 0);
        assert_eq!(&bytes[8..12], &[0x00, 0x00, 0x00, 0x05]);
        assert_eq!(&bytes[24..29], b"hello");
    }

    #[test]
    fn test_encode_quit_quiet_is_header_only() {
        let bytes = encode_quit_quiet().unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(bytes[0], 0x80);
        assert_eq!(bytes[1], 0x17);
        assert!(bytes[2..24].iter().all(|&b| b == 0));
        assert!(!Request::QuitQuiet.expects_reply());
    }

    #[test]
    fn test_encode_set_rejects_oversized_key() {
        let key = Bytes::from(vec![b'k'; u16::MAX as usize + 1]);
        let err = encode_set(key, "v", 0, 0).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::EncodingOverflow { field: "key", .. }
        ));
    }

    #[test]
    fn test_set_request_roundtrip() {
        let bytes = encode_set("hello", "world", 0xdeadbeef, 3600).unwrap();
        let frame = Frame::parse(&bytes).unwrap();
        let decoded = frame.decode_request().unwrap();
        assert_eq!(
            decoded,
            Request::Set {
                key: Bytes::from_static(b"hello"),
                value: Bytes::from_static(b"world"),
                flags: 0xdeadbeef,
                expiry: 3600,
            }
        );
    }

    #[test]
    fn test_get_response_concrete_vector() {
        // magic=0x81, opcode=Get, extras 4, no key, body [flags, "world"]
        let mut header = ResponseHeader::new(Opcode::Get, Status::NoError);
        header.extras_length = 4;
        header.total_body_length = 9;
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        buf.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        buf.extend_from_slice(b"world");

        let frame = Frame::parse(&buf).unwrap();
        let decoded = frame.decode_response().unwrap();
        assert_eq!(
            decoded,
            Response::Get {
                flags: 0,
                value: Bytes::from_static(b"world"),
            }
        );
    }

    #[test]
    fn test_get_response_with_key_is_malformed() {
        let mut header = ResponseHeader::new(Opcode::Get, Status::NoError);
        header.extras_length = 4;
        header.key_length = 2;
        header.total_body_length = 11;
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        buf.extend_from_slice(&[0, 0, 0, 0]);
        buf.extend_from_slice(b"kkworld");

        let frame = Frame::parse(&buf).unwrap();
        assert!(matches!(
            frame.decode_response(),
            Err(ProtocolError::MalformedBody(_))
        ));
    }

    #[test]
    fn test_unknown_opcode_fails_body_decode_only() {
        let mut header = ResponseHeader::new(Opcode::Set, Status::NoError);
        header.opcode = 0x9E;
        let mut buf = BytesMut::new();
        header.encode(&mut buf);

        // framing still succeeds, the raw frame stays consumable
        let frame = Frame::parse(&buf).unwrap();
        assert_eq!(frame.header.opcode(), 0x9E);
        assert!(matches!(
            frame.decode_response(),
            Err(ProtocolError::UnsupportedOpcode(0x9E))
        ));
    }

    #[test]
    fn test_error_status_keeps_message_body() {
        let mut header = ResponseHeader::new(Opcode::Get, Status::KeyNotFound);
        header.total_body_length = 9;
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        buf.extend_from_slice(b"Not found");

        let frame = Frame::parse(&buf).unwrap();
        assert_eq!(
            frame.decode_response().unwrap(),
            Response::Error {
                status: Status::KeyNotFound,
                message: Bytes::from_static(b"Not found"),
            }
        );
    }
}
