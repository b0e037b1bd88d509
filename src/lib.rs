//! # memwire
//!
//! Binary wire-protocol codec and stream framing for the memcached
//! binary protocol.
//!
//! The crate is two components composed linearly: a pure **codec** that
//! maps typed commands to and from exact byte layouts, and a **frame
//! assembler** that turns arbitrarily chunked transport reads into a
//! lazy sequence of complete frames. Everything above that — opaque
//! correlation, opcode dispatch, the TCP client and server — is built on
//! those two pieces.
//!
//! ## Modules
//! - [`core`]: header layout, frame types, encode/decode, stream codec
//! - [`protocol`]: opcode dispatch and request/response correlation
//! - [`service`]: connection-scoped async client
//! - [`transport`]: TCP listener/connector plumbing
//! - [`config`]: TOML/env configuration with validation
//! - [`utils`]: logging, metrics, timeouts, packet capture/replay
//!
//! ## Example
//! ```no_run
//! use memwire::config::ProtocolConfig;
//! use memwire::service::Client;
//!
//! #[tokio::main]
//! async fn main() -> memwire::error::Result<()> {
//!     let config = ProtocolConfig::default();
//!     let client = Client::connect("127.0.0.1:11211", &config).await?;
//!
//!     client.set("hello", "world", 0xdeadbeef, 3600).await?;
//!     if let Some(hit) = client.get("hello").await? {
//!         println!("flags={:#x} value={:?}", hit.flags, hit.value);
//!     }
//!     client.quit_quiet().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Wire format
//! 24-byte big-endian header — magic(1) opcode(1) keyLength(2)
//! extrasLength(1) dataType(1) statusOrReserved(2) totalBodyLength(4)
//! opaque(4) cas(8) — followed by extras, key, and value segments whose
//! combined length the header declares.

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use crate::core::codec::{FrameAssembler, FrameCodec};
pub use crate::core::header::{Header, Opcode, RequestHeader, ResponseHeader, Status};
pub use crate::core::packet::{
    decode_body, encode_get, encode_quit_quiet, encode_set, Frame, Request, Response,
};
pub use crate::error::{ProtocolError, Result};
