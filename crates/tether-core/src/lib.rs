//! # tether-core
//!
//! Shared wire protocol for Tether, the remote-control channel that lets an
//! external client send typed commands to a server embedded in a running
//! process.
//!
//! This crate contains only the pure codec: framing, payload building, and
//! payload reading. It has zero dependencies on sockets, async runtimes, or
//! OS APIs; both endpoints (`tether-agent` and `tether-client`) are built on
//! top of it.
//!
//! - **`protocol::frame`** – the [`Frame`] type and the streaming decoder.
//! - **`protocol::builder`** – [`FrameBuilder`], append-then-patch frame
//!   construction.
//! - **`protocol::reader`** – [`PayloadReader`], the field-for-field mirror
//!   of the builder.

pub mod protocol;

// Re-export the most-used items at the crate root so callers can write
// `tether_core::Frame` instead of `tether_core::protocol::frame::Frame`.
pub use protocol::builder::FrameBuilder;
pub use protocol::frame::{decode_frame, Frame, FrameError, HEADER_SIZE};
pub use protocol::reader::PayloadReader;
