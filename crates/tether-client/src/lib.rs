//! # tether-client
//!
//! The controller side of Tether: dials the agent embedded in a target
//! process and exchanges command frames with it. One connection carries one
//! command at a time — the agent serves a single in-flight command per link,
//! so [`ClientConnection::request`] is write-then-read and responses always
//! match requests in order.

pub mod connection;

pub use connection::{ClientConnection, ClientError};
