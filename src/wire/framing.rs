//! Newline-delimited JSON framing shared by every listener (session endpoint,
//! daemon control plane, peer TCP link).
//!
//! No length prefix is used. A per-connection byte accumulator reads in
//! arbitrary-sized chunks and yields one `String` per completed line, holding
//! the trailing partial line across reads. This exact framing is part of the
//! peer wire contract, not just an implementation detail: two daemons only
//! interoperate if both split frames the same way.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Hard cap on a single frame, inclusive. Matches the wire contract everywhere:
/// session endpoint, daemon control plane, and peer TCP link.
pub const MAX_FRAME_BYTES: usize = 8192;

const READ_CHUNK: usize = 4096;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("message exceeds {MAX_FRAME_BYTES} bytes")]
    TooLarge,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads newline-delimited frames off an async byte stream, retaining a
/// trailing partial line between calls.
pub struct FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
        }
    }

    /// Returns the next complete line (newline stripped), `Ok(None)` on clean
    /// EOF with no partial frame pending, or `Err` if the accumulated line
    /// before any newline exceeds [`MAX_FRAME_BYTES`].
    pub async fn next_frame(&mut self) -> Result<Option<String>, FrameError> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                if pos > MAX_FRAME_BYTES {
                    return Err(FrameError::TooLarge);
                }
                let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
                line.pop(); // trailing '\n'
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            if self.buf.len() > MAX_FRAME_BYTES {
                return Err(FrameError::TooLarge);
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                return Ok(None);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

#[cfg(test)]
#[path = "tests/framing_tests.rs"]
mod framing_tests;
