//! Command dispatcher: a registry from command key to handler.
//!
//! Handlers are synchronous from the loop's perspective; the dispatcher
//! waits for one handler to return or fail before the server moves to the
//! next frame, which is what preserves response ordering on a single link.
//! A handler needing long-running work off the loop task is its own concern,
//! not the dispatcher's.

use std::collections::HashMap;

use thiserror::Error;
use tether_core::Frame;

/// A collaborator-supplied handler failure.
///
/// Handler internals are opaque to the dispatcher, so failures travel as a
/// message rather than a typed cause.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors surfaced by a dispatch attempt. Both are recoverable: the server
/// logs and keeps its loop alive.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The decoded key has no registered handler.
    #[error("no handler registered for command key 0x{0:02X}")]
    UnknownCommand(u8),

    /// The handler ran and failed.
    #[error("handler failed: {0}")]
    Handler(#[from] HandlerError),
}

/// A registered command handler: receives the decoded payload, produces a
/// response frame, or `None` for fire-and-forget commands.
pub type Handler = Box<dyn Fn(&[u8]) -> Result<Option<Frame>, HandlerError> + Send + Sync>;

/// Mapping from command key to handler.
///
/// The registry is owned exclusively by one [`crate::Server`]; nothing
/// mutates it while the input loop runs.
///
/// # Examples
///
/// ```rust
/// use tether_agent::Dispatcher;
/// use tether_core::Frame;
///
/// let mut dispatcher = Dispatcher::new();
/// dispatcher.register(0x01, |payload| {
///     Ok(Some(Frame::new(0x81, payload.to_vec())))
/// });
/// assert!(dispatcher.contains(0x01));
/// ```
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<u8, Handler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `key`. Registering the same key again
    /// replaces the previous handler.
    pub fn register<F>(&mut self, key: u8, handler: F)
    where
        F: Fn(&[u8]) -> Result<Option<Frame>, HandlerError> + Send + Sync + 'static,
    {
        self.handlers.insert(key, Box::new(handler));
    }

    /// True when a handler is registered for `key`.
    pub fn contains(&self, key: u8) -> bool {
        self.handlers.contains_key(&key)
    }

    /// Invokes the handler for `frame.key` on `frame.payload`.
    ///
    /// # Errors
    ///
    /// [`DispatchError::UnknownCommand`] when the key is unregistered, or
    /// [`DispatchError::Handler`] when the handler itself fails. Neither may
    /// crash the caller's loop.
    pub fn dispatch(&self, frame: &Frame) -> Result<Option<Frame>, DispatchError> {
        let handler = self
            .handlers
            .get(&frame.key)
            .ok_or(DispatchError::UnknownCommand(frame.key))?;
        Ok(handler(&frame.payload)?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
