use crate::core::header::Opcode;
use crate::core::packet::{Frame, Request};
use crate::error::{constants, ProtocolError, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type HandlerFn = dyn Fn(&Request, u32) -> Result<Option<Frame>> + Send + Sync + 'static;

/// Routes decoded request frames to per-opcode handlers.
///
/// Handlers receive the decoded command and the request's opaque token and
/// return the response frame to write back, or `None` for quiet commands
/// that suppress their reply.
pub struct Dispatcher {
    handlers: Arc<RwLock<HashMap<u8, Box<HandlerFn>>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn register<F>(&self, opcode: Opcode, handler: F) -> Result<()>
    where
        F: Fn(&Request, u32) -> Result<Option<Frame>> + Send + Sync + 'static,
    {
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| ProtocolError::Custom(constants::ERR_DISPATCHER_WRITE_LOCK.to_string()))?;

        handlers.insert(opcode as u8, Box::new(handler));
        Ok(())
    }

    /// Decode the frame's body and route it to the registered handler.
    ///
    /// A frame whose opcode has no registered handler fails with
    /// `UnsupportedOpcode`; the caller still holds the raw frame and can
    /// skip or log it without dropping the connection.
    pub fn dispatch(&self, frame: &Frame) -> Result<Option<Frame>> {
        let request = frame.decode_request()?;
        let opaque = frame.header.opaque();

        let handlers = self
            .handlers
            .read()
            .map_err(|_| ProtocolError::Custom(constants::ERR_DISPATCHER_READ_LOCK.to_string()))?;

        handlers
            .get(&frame.header.opcode())
            .ok_or(ProtocolError::UnsupportedOpcode(frame.header.opcode()))
            .and_then(|handler| handler(&request, opaque))
    }
}
