//! Protocol module containing the frame type, builder, and reader.

pub mod builder;
pub mod frame;
pub mod reader;

pub use builder::FrameBuilder;
pub use frame::{decode_frame, Frame, FrameError, HEADER_SIZE};
pub use reader::PayloadReader;
