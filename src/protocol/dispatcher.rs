use crate::core::frame::Frame;
use crate::error::constants::{ERR_DISPATCHER_READ_LOCK, ERR_DISPATCHER_WRITE_LOCK};
use crate::error::{ProtocolError, Result};
use crate::transport::connection::DisconnectReason;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, error};

type HandlerFn = dyn Fn(&mut Frame) -> Result<()> + Send + Sync + 'static;
type DisconnectFn = dyn Fn(&DisconnectReason) + Send + Sync + 'static;

/// Receiver of drained inbound events.
///
/// `Connection::update` calls this on the consumer thread for every frame
/// that survived the inbound filters, then for the disconnect notice.
pub trait PacketHandler {
    fn on_frame(&mut self, frame: &mut Frame);

    fn on_disconnected(&mut self, _reason: &DisconnectReason) {}
}

impl<F> PacketHandler for F
where
    F: FnMut(&mut Frame),
{
    fn on_frame(&mut self, frame: &mut Frame) {
        self(frame)
    }
}

/// Opcode-keyed handler registry.
#[derive(Clone)]
pub struct Dispatcher {
    handlers: Arc<RwLock<HashMap<u8, Box<HandlerFn>>>>,
    on_disconnect: Arc<RwLock<Option<Box<DisconnectFn>>>>,
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
            on_disconnect: Arc::new(RwLock::new(None)),
        }
    }

    pub fn register<F>(&self, opcode: u8, handler: F) -> Result<()>
    where
        F: Fn(&mut Frame) -> Result<()> + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().map_err(|_| {
            error!("{}", ERR_DISPATCHER_WRITE_LOCK);
            ProtocolError::LockPoisoned
        })?;

        handlers.insert(opcode, Box::new(handler));
        Ok(())
    }

    pub fn unregister(&self, opcode: u8) -> Result<bool> {
        let mut handlers = self.handlers.write().map_err(|_| {
            error!("{}", ERR_DISPATCHER_WRITE_LOCK);
            ProtocolError::LockPoisoned
        })?;

        Ok(handlers.remove(&opcode).is_some())
    }

    pub fn on_disconnect<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&DisconnectReason) + Send + Sync + 'static,
    {
        let mut slot = self.on_disconnect.write().map_err(|_| {
            error!("{}", ERR_DISPATCHER_WRITE_LOCK);
            ProtocolError::LockPoisoned
        })?;

        *slot = Some(Box::new(callback));
        Ok(())
    }

    pub fn dispatch(&self, frame: &mut Frame) -> Result<()> {
        let opcode = frame.opcode();

        let handlers = self.handlers.read().map_err(|_| {
            error!("{}", ERR_DISPATCHER_READ_LOCK);
            ProtocolError::LockPoisoned
        })?;

        handlers
            .get(&opcode)
            .ok_or(ProtocolError::UnexpectedMessage(opcode))
            .and_then(|handler| handler(frame))
    }
}

impl PacketHandler for Dispatcher {
    fn on_frame(&mut self, frame: &mut Frame) {
        if let Err(e) = self.dispatch(frame) {
            debug!(opcode = frame.opcode(), error = %e, "Frame not handled");
        }
    }

    fn on_disconnected(&mut self, reason: &DisconnectReason) {
        if let Ok(slot) = self.on_disconnect.read() {
            if let Some(callback) = slot.as_ref() {
                callback(reason);
            }
        }
    }
}
