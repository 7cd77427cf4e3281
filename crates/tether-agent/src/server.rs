//! The server: owns one link and one dispatcher, runs the input loop.
//!
//! State machine: `Constructed → Running → Stopped` (terminal). One link
//! lifetime per server lifetime; a reconnect is a new server.
//!
//! The input loop is a buffered streaming read: TCP may deliver less than
//! one frame per read or several at once, so bytes accumulate in a receive
//! buffer and complete frames are decoded out of its front. Frames on one
//! link are processed strictly in arrival order and responses are written in
//! the same order; there is exactly one in-flight command at a time.
//!
//! `stop()` may be called from any task, any number of times, before or
//! after `run()`. It cancels a token the loop selects against at every
//! blocking read/write, so a parked loop wakes at the next boundary, closes
//! the link, and lands in `Stopped`.

use tether_core::{decode_frame, FrameError, HEADER_SIZE};
use tether_link::{Link, LinkError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatcher::{DispatchError, Dispatcher};

/// Why the input loop ended abnormally.
///
/// Either way the failure is fatal to the connection and never to the
/// process: the server returns to `Stopped` and the host keeps running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The transport failed underneath the loop.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// The byte stream desynchronized from the framing, or the peer hung up
    /// mid-frame. The protocol offers no resynchronization.
    #[error("framing violation: {0}")]
    Framing(#[from] FrameError),
}

/// Server lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Built, link not yet opened.
    Constructed,
    /// Input loop active.
    Running,
    /// Loop exited and link closed. Terminal.
    Stopped,
}

/// Cloneable stop control for a [`Server`], usable from any task.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    shutdown: CancellationToken,
}

impl ServerHandle {
    /// Requests the server stop at its next blocking-read boundary.
    ///
    /// Idempotent: stopping twice, or stopping a server whose `open()`
    /// never succeeded, is a no-op and never an error. Shutdown may be
    /// triggered both by process-exit handling and by explicit operator
    /// action, so double-stop has to be safe.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// True once `stop()` has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// Owns a [`Link`] and a [`Dispatcher`] and runs the
/// read/decode/dispatch/respond cycle for the lifetime of the link.
pub struct Server<L: Link> {
    link: L,
    dispatcher: Dispatcher,
    state: ServerState,
    shutdown: CancellationToken,
}

impl<L: Link> Server<L> {
    /// Creates a server in `Constructed` state around an unopened link.
    pub fn new(link: L, dispatcher: Dispatcher) -> Self {
        Self {
            link,
            dispatcher,
            state: ServerState::Constructed,
            shutdown: CancellationToken::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Returns a handle that can stop this server from another task.
    pub fn shutdown_handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Opens the link and runs the input loop until the peer disconnects,
    /// the stream breaks, or [`ServerHandle::stop`] is called.
    ///
    /// Always leaves the server in `Stopped` with the link closed.
    ///
    /// # Errors
    ///
    /// Returns the [`ServerError`] that ended the session abnormally. A
    /// clean peer disconnect and an operator stop both return `Ok(())`.
    pub async fn run(&mut self) -> Result<(), ServerError> {
        let shutdown = self.shutdown.clone();

        // A stop issued before the link ever opened is not an error.
        let opened = tokio::select! {
            _ = shutdown.cancelled() => None,
            res = self.link.open() => Some(res),
        };
        match opened {
            None => {
                debug!("stop requested before link opened");
                let _ = self.link.close().await;
                self.state = ServerState::Stopped;
                return Ok(());
            }
            Some(Err(e)) => {
                self.state = ServerState::Stopped;
                return Err(e.into());
            }
            Some(Ok(())) => {}
        }

        self.state = ServerState::Running;
        info!("input loop running");

        let result = self.input_loop(&shutdown).await;

        let _ = self.link.close().await;
        self.state = ServerState::Stopped;
        match &result {
            Ok(()) => info!("input loop stopped"),
            Err(e) => warn!("input loop ended abnormally: {e}"),
        }
        result
    }

    async fn input_loop(&mut self, shutdown: &CancellationToken) -> Result<(), ServerError> {
        // Accumulates bytes across reads; read_tmp is the per-read scratch.
        let mut recv_buf: Vec<u8> = Vec::with_capacity(4096);
        let mut read_tmp = vec![0u8; 4096];

        'session: loop {
            let n = tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("stop requested; leaving input loop");
                    break 'session Ok(());
                }
                res = self.link.read(&mut read_tmp) => match res {
                    Ok(0) => {
                        if recv_buf.is_empty() {
                            // EOF at a frame boundary: graceful disconnect.
                            info!("peer disconnected");
                            break 'session Ok(());
                        }
                        // The decode loop drains every complete frame, so
                        // leftover bytes are always a partial frame.
                        let err = decode_frame(&recv_buf).err().unwrap_or(
                            FrameError::Truncated {
                                needed: HEADER_SIZE,
                                available: recv_buf.len(),
                            },
                        );
                        break 'session Err(err.into());
                    }
                    Ok(n) => n,
                    // A close() racing the read counts as a disconnect.
                    Err(LinkError::Closed) => break 'session Ok(()),
                    Err(e) => break 'session Err(e.into()),
                },
            };
            recv_buf.extend_from_slice(&read_tmp[..n]);

            // One read may have delivered several complete frames.
            loop {
                let (frame, consumed) = match decode_frame(&recv_buf) {
                    Ok(decoded) => decoded,
                    // Not a full frame yet; go read more.
                    Err(FrameError::Truncated { .. }) => break,
                    Err(e) => break 'session Err(e.into()),
                };
                recv_buf.drain(..consumed);
                debug!(key = frame.key, len = frame.payload.len(), "frame received");

                let response = match self.dispatcher.dispatch(&frame) {
                    Ok(response) => response,
                    Err(e @ DispatchError::UnknownCommand(_)) => {
                        // Policy: drop the frame, keep the session alive.
                        warn!("{e}");
                        continue;
                    }
                    Err(DispatchError::Handler(e)) => {
                        warn!(key = frame.key, "handler failed: {e}");
                        continue;
                    }
                };

                if let Some(response) = response {
                    let bytes = response.encode();
                    let written = tokio::select! {
                        _ = shutdown.cancelled() => break 'session Ok(()),
                        res = self.link.write_all(&bytes) => res,
                    };
                    match written {
                        Ok(()) => {
                            debug!(key = response.key, "response written");
                        }
                        Err(LinkError::Closed) => break 'session Ok(()),
                        Err(e) => break 'session Err(e.into()),
                    }
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
