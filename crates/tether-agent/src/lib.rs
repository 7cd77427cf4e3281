//! # tether-agent
//!
//! The side of Tether that lives inside the controlled process. A host
//! embeds this crate, registers a handler per command key, and calls
//! [`bootstrap::start`]; from then on an external `tether-client` can send
//! command frames over TCP and receive framed responses.
//!
//! - **`dispatcher`** – maps a decoded frame's key to its registered handler.
//! - **`server`** – owns one link and the dispatcher, runs the
//!   read/decode/dispatch/respond loop, exposes start/stop lifecycle.
//! - **`bootstrap`** – resolves the listening port from a free-form argument
//!   string, wires the server to its link, and starts the loop on its own
//!   task so the embedding caller never blocks.
//!
//! The semantics of individual commands are the host's concern: this crate
//! ships the channel, not the command catalog.

pub mod bootstrap;
pub mod dispatcher;
pub mod server;

pub use bootstrap::{resolve_port, start, AgentConfig, AgentHandle, DEFAULT_PORT};
pub use dispatcher::{DispatchError, Dispatcher, HandlerError};
pub use server::{Server, ServerError, ServerHandle, ServerState};
