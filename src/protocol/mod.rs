//! # Protocol Layer
//!
//! Frame interpretation above the codec: routing decoded requests to
//! handlers and matching responses to in-flight requests.
//!
//! ## Components
//! - **Dispatcher**: Per-opcode routing of decoded request frames
//! - **Correlation**: Pending-request table keyed by the opaque token

pub mod correlation;
pub mod dispatcher;

pub use correlation::Correlator;
pub use dispatcher::Dispatcher;
