//! Memcached binary protocol headers.
//!
//! The binary protocol uses fixed 24-byte headers for both requests and
//! responses. This module provides types for parsing and encoding these
//! headers. Requests and responses share the same layout except for bytes
//! 6..8, which carry a reserved field on requests and a status code on
//! responses; the two are modeled as distinct types joined by [`Header`].

use crate::error::{ProtocolError, Result};
use bytes::{BufMut, BytesMut};

/// Magic byte for binary request packets.
pub const REQUEST_MAGIC: u8 = 0x80;

/// Magic byte for binary response packets.
pub const RESPONSE_MAGIC: u8 = 0x81;

/// Fixed header size for the binary protocol.
pub const HEADER_SIZE: usize = 24;

/// Binary protocol opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Get = 0x00,
    Set = 0x01,
    QuitQ = 0x17,
}

impl Opcode {
    /// Try to convert a byte to an opcode.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Opcode::Get),
            0x01 => Some(Opcode::Set),
            0x17 => Some(Opcode::QuitQ),
            _ => None,
        }
    }

    /// Returns true if this is a "quiet" opcode (no response on success).
    pub fn is_quiet(&self) -> bool {
        matches!(self, Opcode::QuitQ)
    }
}

/// Response status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    NoError,
    KeyNotFound,
    KeyExists,
    ValueTooLarge,
    InvalidArguments,
    ItemNotStored,
    NonNumericValue,
    AuthError,
    AuthContinue,
    UnknownCommand,
    OutOfMemory,
    Busy,
    TempFailure,
    /// Status code not named by the protocol revision this crate targets.
    Other(u16),
}

impl Status {
    /// Convert a raw wire value to a status. Total: unrecognized codes are
    /// preserved as [`Status::Other`] rather than collapsed.
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0000 => Status::NoError,
            0x0001 => Status::KeyNotFound,
            0x0002 => Status::KeyExists,
            0x0003 => Status::ValueTooLarge,
            0x0004 => Status::InvalidArguments,
            0x0005 => Status::ItemNotStored,
            0x0006 => Status::NonNumericValue,
            0x0008 => Status::AuthError,
            0x0009 => Status::AuthContinue,
            0x0081 => Status::UnknownCommand,
            0x0082 => Status::OutOfMemory,
            0x0085 => Status::Busy,
            0x0086 => Status::TempFailure,
            other => Status::Other(other),
        }
    }

    /// The raw wire value for this status.
    pub fn as_u16(&self) -> u16 {
        match self {
            Status::NoError => 0x0000,
            Status::KeyNotFound => 0x0001,
            Status::KeyExists => 0x0002,
            Status::ValueTooLarge => 0x0003,
            Status::InvalidArguments => 0x0004,
            Status::ItemNotStored => 0x0005,
            Status::NonNumericValue => 0x0006,
            Status::AuthError => 0x0008,
            Status::AuthContinue => 0x0009,
            Status::UnknownCommand => 0x0081,
            Status::OutOfMemory => 0x0082,
            Status::Busy => 0x0085,
            Status::TempFailure => 0x0086,
            Status::Other(v) => *v,
        }
    }

    /// Returns true if this status indicates success.
    pub fn is_success(&self) -> bool {
        *self == Status::NoError
    }

    /// Returns the status as a short description.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NoError => "No error",
            Status::KeyNotFound => "Key not found",
            Status::KeyExists => "Key exists",
            Status::ValueTooLarge => "Value too large",
            Status::InvalidArguments => "Invalid arguments",
            Status::ItemNotStored => "Item not stored",
            Status::NonNumericValue => "Incr/Decr on non-numeric value",
            Status::AuthError => "Authentication error",
            Status::AuthContinue => "Authentication continue",
            Status::UnknownCommand => "Unknown command",
            Status::OutOfMemory => "Out of memory",
            Status::Busy => "Busy",
            Status::TempFailure => "Temporary failure",
            Status::Other(_) => "Unrecognized status",
        }
    }
}

/// Binary protocol request header (24 bytes).
///
/// Format:
/// ```text
/// Byte/     0       |       1       |       2       |       3       |
///    /              |               |               |               |
///   |0 1 2 3 4 5 6 7|0 1 2 3 4 5 6 7|0 1 2 3 4 5 6 7|0 1 2 3 4 5 6 7|
///   +---------------+---------------+---------------+---------------+
///  0| Magic         | Opcode        | Key length                    |
///   +---------------+---------------+---------------+---------------+
///  4| Extras length | Data type     | Reserved / Status             |
///   +---------------+---------------+---------------+---------------+
///  8| Total body length                                             |
///   +---------------+---------------+---------------+---------------+
/// 12| Opaque                                                        |
///   +---------------+---------------+---------------+---------------+
/// 16| CAS                                                           |
///   |                                                               |
///   +---------------+---------------+---------------+---------------+
/// ```
///
/// The opcode is kept as a raw byte so that frames carrying opcodes this
/// crate does not interpret still parse at the header level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    /// Command opcode (raw wire byte)
    pub opcode: u8,
    /// Key length in bytes
    pub key_length: u16,
    /// Length of extras (flags, expiration, etc.)
    pub extras_length: u8,
    /// Data type (reserved, should be 0)
    pub data_type: u8,
    /// Reserved field (always 0 on encode)
    pub reserved: u16,
    /// Total body length = extras_length + key_length + value_length
    pub total_body_length: u32,
    /// Opaque correlation token (echoed back in the response)
    pub opaque: u32,
    /// CAS value for compare-and-swap operations
    pub cas: u64,
}

impl RequestHeader {
    /// Create a new request header for the given opcode, all lengths zero.
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode: opcode as u8,
            key_length: 0,
            extras_length: 0,
            data_type: 0,
            reserved: 0,
            total_body_length: 0,
            opaque: 0,
            cas: 0,
        }
    }

    /// Parse a request header from a byte buffer of at least [`HEADER_SIZE`] bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(ProtocolError::MalformedBody(format!(
                "header needs {HEADER_SIZE} bytes, got {}",
                data.len()
            )));
        }

        if data[0] != REQUEST_MAGIC {
            return Err(ProtocolError::InvalidMagic(data[0]));
        }

        Ok(Self {
            opcode: data[1],
            key_length: u16::from_be_bytes([data[2], data[3]]),
            extras_length: data[4],
            data_type: data[5],
            reserved: u16::from_be_bytes([data[6], data[7]]),
            total_body_length: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
            opaque: u32::from_be_bytes([data[12], data[13], data[14], data[15]]),
            cas: u64::from_be_bytes([
                data[16], data[17], data[18], data[19], data[20], data[21], data[22], data[23],
            ]),
        })
    }

    /// Append the 24-byte wire encoding of this header to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(HEADER_SIZE);
        buf.put_u8(REQUEST_MAGIC);
        buf.put_u8(self.opcode);
        buf.put_u16(self.key_length);
        buf.put_u8(self.extras_length);
        buf.put_u8(self.data_type);
        buf.put_u16(self.reserved);
        buf.put_u32(self.total_body_length);
        buf.put_u32(self.opaque);
        buf.put_u64(self.cas);
    }

    /// The opcode, if it is one this crate interprets.
    pub fn known_opcode(&self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode)
    }

    /// Value length derived from the header length fields.
    ///
    /// Fails when extras + key exceed the declared total body length.
    pub fn value_length(&self) -> Result<usize> {
        value_length(self.total_body_length, self.extras_length, self.key_length)
    }
}

/// Binary protocol response header (24 bytes).
///
/// Same layout as [`RequestHeader`], but with the response magic and a
/// status code in bytes 6..8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    /// Command opcode (echoed from the request, raw wire byte)
    pub opcode: u8,
    /// Key length in bytes
    pub key_length: u16,
    /// Length of extras (flags for Get responses)
    pub extras_length: u8,
    /// Data type (reserved, should be 0)
    pub data_type: u8,
    /// Response status
    pub status: Status,
    /// Total body length = extras_length + key_length + value_length
    pub total_body_length: u32,
    /// Opaque correlation token (echoed from the request)
    pub opaque: u32,
    /// CAS value
    pub cas: u64,
}

impl ResponseHeader {
    /// Create a new response header with the given opcode and status.
    pub fn new(opcode: Opcode, status: Status) -> Self {
        Self {
            opcode: opcode as u8,
            key_length: 0,
            extras_length: 0,
            data_type: 0,
            status,
            total_body_length: 0,
            opaque: 0,
            cas: 0,
        }
    }

    /// Parse a response header from a byte buffer of at least [`HEADER_SIZE`] bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(ProtocolError::MalformedBody(format!(
                "header needs {HEADER_SIZE} bytes, got {}",
                data.len()
            )));
        }

        if data[0] != RESPONSE_MAGIC {
            return Err(ProtocolError::InvalidMagic(data[0]));
        }

        Ok(Self {
            opcode: data[1],
            key_length: u16::from_be_bytes([data[2], data[3]]),
            extras_length: data[4],
            data_type: data[5],
            status: Status::from_u16(u16::from_be_bytes([data[6], data[7]])),
            total_body_length: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
            opaque: u32::from_be_bytes([data[12], data[13], data[14], data[15]]),
            cas: u64::from_be_bytes([
                data[16], data[17], data[18], data[19], data[20], data[21], data[22], data[23],
            ]),
        })
    }

    /// Append the 24-byte wire encoding of this header to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(HEADER_SIZE);
        buf.put_u8(RESPONSE_MAGIC);
        buf.put_u8(self.opcode);
        buf.put_u16(self.key_length);
        buf.put_u8(self.extras_length);
        buf.put_u8(self.data_type);
        buf.put_u16(self.status.as_u16());
        buf.put_u32(self.total_body_length);
        buf.put_u32(self.opaque);
        buf.put_u64(self.cas);
    }

    /// The opcode, if it is one this crate interprets.
    pub fn known_opcode(&self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode)
    }

    /// Value length derived from the header length fields.
    pub fn value_length(&self) -> Result<usize> {
        value_length(self.total_body_length, self.extras_length, self.key_length)
    }
}

/// A parsed header, tagged by direction.
///
/// The magic byte discriminates: `0x80` parses as a request, `0x81` as a
/// response, anything else is [`ProtocolError::InvalidMagic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    Request(RequestHeader),
    Response(ResponseHeader),
}

impl Header {
    /// Parse either header kind from a byte buffer, dispatching on magic.
    pub fn parse(data: &[u8]) -> Result<Self> {
        match data.first() {
            Some(&REQUEST_MAGIC) => Ok(Header::Request(RequestHeader::parse(data)?)),
            Some(&RESPONSE_MAGIC) => Ok(Header::Response(ResponseHeader::parse(data)?)),
            Some(&other) => Err(ProtocolError::InvalidMagic(other)),
            None => Err(ProtocolError::MalformedBody("empty header".into())),
        }
    }

    /// The raw opcode byte.
    pub fn opcode(&self) -> u8 {
        match self {
            Header::Request(h) => h.opcode,
            Header::Response(h) => h.opcode,
        }
    }

    /// Total body length declared by the header.
    pub fn total_body_length(&self) -> u32 {
        match self {
            Header::Request(h) => h.total_body_length,
            Header::Response(h) => h.total_body_length,
        }
    }

    /// Key length declared by the header.
    pub fn key_length(&self) -> u16 {
        match self {
            Header::Request(h) => h.key_length,
            Header::Response(h) => h.key_length,
        }
    }

    /// Extras length declared by the header.
    pub fn extras_length(&self) -> u8 {
        match self {
            Header::Request(h) => h.extras_length,
            Header::Response(h) => h.extras_length,
        }
    }

    /// The opaque correlation token.
    pub fn opaque(&self) -> u32 {
        match self {
            Header::Request(h) => h.opaque,
            Header::Response(h) => h.opaque,
        }
    }
}

fn value_length(total_body_length: u32, extras_length: u8, key_length: u16) -> Result<usize> {
    (total_body_length as usize)
        .checked_sub(extras_length as usize + key_length as usize)
        .ok_or_else(|| {
            ProtocolError::MalformedBody(format!(
                "total body length {total_body_length} smaller than extras {extras_length} + key {key_length}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        for val in 0..=0xFF {
            if let Some(op) = Opcode::from_u8(val) {
                assert_eq!(op as u8, val);
            }
        }
    }

    #[test]
    fn test_status_roundtrip_total() {
        for val in 0..=0x0100u16 {
            assert_eq!(Status::from_u16(val).as_u16(), val);
        }
        assert_eq!(Status::from_u16(0x4242), Status::Other(0x4242));
    }

    #[test]
    fn test_request_header_encode_parse() {
        let mut header = RequestHeader::new(Opcode::Get);
        header.key_length = 5;
        header.total_body_length = 5;
        header.opaque = 0x12345678;

        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), HEADER_SIZE);

        let parsed = RequestHeader::parse(&buf).unwrap();
        assert_eq!(header, parsed);
    }

    #[test]
    fn test_response_header_encode_parse() {
        let mut header = ResponseHeader::new(Opcode::Get, Status::NoError);
        header.key_length = 5;
        header.extras_length = 4;
        header.total_body_length = 13; // 4 extras + 5 key + 4 value
        header.opaque = 0xDEADBEEF;
        header.cas = 0x123456789ABCDEF0;

        let mut buf = BytesMut::new();
        header.encode(&mut buf);

        let parsed = ResponseHeader::parse(&buf).unwrap();
        assert_eq!(header, parsed);
    }

    #[test]
    fn test_header_parse_dispatches_on_magic() {
        let mut buf = BytesMut::new();
        RequestHeader::new(Opcode::Set).encode(&mut buf);
        assert!(matches!(Header::parse(&buf), Ok(Header::Request(_))));

        let mut buf = BytesMut::new();
        ResponseHeader::new(Opcode::Set, Status::NoError).encode(&mut buf);
        assert!(matches!(Header::parse(&buf), Ok(Header::Response(_))));

        let mut bad = buf.to_vec();
        bad[0] = 0x42;
        assert!(matches!(
            Header::parse(&bad),
            Err(ProtocolError::InvalidMagic(0x42))
        ));
    }

    #[test]
    fn test_unknown_opcode_parses_at_header_level() {
        let mut header = RequestHeader::new(Opcode::Get);
        header.opcode = 0x9E;
        let mut buf = BytesMut::new();
        header.encode(&mut buf);

        let parsed = RequestHeader::parse(&buf).unwrap();
        assert_eq!(parsed.opcode, 0x9E);
        assert_eq!(parsed.known_opcode(), None);
    }

    #[test]
    fn test_value_length() {
        let mut header = RequestHeader::new(Opcode::Set);
        header.extras_length = 8;
        header.key_length = 10;
        header.total_body_length = 28; // 8 + 10 + 10 value
        assert_eq!(header.value_length().unwrap(), 10);
    }

    #[test]
    fn test_value_length_underflow_is_malformed() {
        let mut header = ResponseHeader::new(Opcode::Get, Status::NoError);
        header.extras_length = 4;
        header.key_length = 2;
        header.total_body_length = 3;
        assert!(matches!(
            header.value_length(),
            Err(ProtocolError::MalformedBody(_))
        ));
    }
}
