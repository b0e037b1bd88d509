//! # Transport Layer
//!
//! TCP plumbing around the frame codec. The codec itself performs no
//! I/O; this module owns sockets, the accept loop, and graceful
//! shutdown.

pub mod tcp;

pub use tcp::{connect, start_server, start_server_with_shutdown};
