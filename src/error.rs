//! # Error Types
//!
//! Comprehensive error handling for the wire protocol.
//!
//! This module defines all error variants that can occur during protocol
//! operations, from low-level I/O errors to malformed frames on the wire.
//!
//! ## Error Categories
//! - **I/O Errors**: Network and file system failures
//! - **Encoding Errors**: Caller input exceeding field widths
//! - **Framing Errors**: Invalid magic, oversized frames, truncated streams
//! - **Decoding Errors**: Header/body length contract violations
//!
//! All errors implement `std::error::Error` for interoperability.
//!
//! ## Propagation
//! Encoding errors are returned synchronously to the caller of an encode
//! function. Framing and decoding errors surface through the frame stream
//! as `Err` items interleaved with decoded frames, so a caller can choose
//! to abort or continue per frame.

use crate::core::header::Status;
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";

    /// Correlation errors
    pub const ERR_CORRELATOR_LOCK: &str = "Failed to acquire lock on pending-request table";
}

// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{field} of {len} bytes exceeds the {max}-byte limit")]
    EncodingOverflow {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Invalid magic byte: {0:#04x}")]
    InvalidMagic(u8),

    #[error("Malformed body: {0}")]
    MalformedBody(String),

    #[error("Unsupported opcode: {0:#04x}")]
    UnsupportedOpcode(u8),

    #[error("Frame too large: declared {declared} bytes, maximum {max}")]
    FrameTooLarge { declared: usize, max: usize },

    #[error("Connection closed with {buffered} bytes of an incomplete frame buffered")]
    UnexpectedEof { buffered: usize },

    #[error("Server returned error status: {}", .0.as_str())]
    ErrorStatus(Status),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
