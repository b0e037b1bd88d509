//! # Core Protocol Components
//!
//! Low-level header layout, frame types, and the stream codec.
//!
//! This module provides the foundation for the protocol, handling the
//! fixed 24-byte header, per-opcode body shapes, and reassembly of frames
//! from fragmented transport reads.
//!
//! ## Components
//! - **Header**: Request/response header layout with big-endian fields
//! - **Packet**: Frame type plus typed command encode/decode
//! - **Codec**: Tokio codec and synchronous assembler for framing over
//!   byte streams
//!
//! ## Wire Format
//! ```text
//! [Magic(1)] [Opcode(1)] [KeyLen(2)] [ExtrasLen(1)] [DataType(1)]
//! [Status/Reserved(2)] [TotalBodyLen(4)] [Opaque(4)] [CAS(8)] [Body(N)]
//! ```
//!
//! ## Security
//! - Maximum frame size (default 16MB) prevents memory exhaustion
//! - Magic byte validated at every frame start
//! - Length relationships validated before body interpretation

pub mod codec;
pub mod header;
pub mod packet;
