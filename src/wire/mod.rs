//! Wire-level plumbing shared by every listener in the mesh: the
//! newline-delimited JSON framing (§9 Byte-stream framing) and the
//! response/event envelope shapes (§6).

pub mod envelope;
pub mod framing;

pub use envelope::{ErrorFrame, EventFrame, ResponseFrame};
pub use framing::{FrameError, FrameReader, MAX_FRAME_BYTES};
