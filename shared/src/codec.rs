//! Line codec for stream transports
//!
//! Requests are terminated by `\n` (an optional preceding `\r` is tolerated).
//! Replies are written as:
//! ```text
//! [ reply text ][ \r\n ]
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Maximum number of bytes buffered while waiting for a line terminator
pub const MAX_LINE_LENGTH: usize = 4096;

/// Terminator appended to every outgoing reply
pub const REPLY_TERMINATOR: &[u8] = b"\r\n";

/// Errors that can occur while framing lines
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("Line too long: {0} bytes without terminator (max: {})", MAX_LINE_LENGTH)]
    LineTooLong(usize),
}

/// Encode a reply line with its terminator
pub fn encode_line(line: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(line.len() + REPLY_TERMINATOR.len());
    encode_line_into(line, &mut buf);
    buf.freeze()
}

/// Encode a reply line directly into a provided buffer
pub fn encode_line_into(line: &str, buf: &mut BytesMut) {
    buf.reserve(line.len() + REPLY_TERMINATOR.len());
    buf.put_slice(line.as_bytes());
    buf.put_slice(REPLY_TERMINATOR);
}

/// Try to take one complete line from the buffer
///
/// Returns:
/// - `Ok(Some(line))` with the terminator removed
/// - `Ok(None)` if more data is needed
/// - `Err(...)` if the buffer exceeds [`MAX_LINE_LENGTH`] without a terminator
pub fn decode(buf: &mut BytesMut) -> Result<Option<String>, CodecError> {
    let Some(newline) = buf.iter().position(|b| *b == b'\n') else {
        if buf.len() > MAX_LINE_LENGTH {
            return Err(CodecError::LineTooLong(buf.len()));
        }
        return Ok(None);
    };

    let line_bytes = buf.split_to(newline);
    buf.advance(1);

    let text = String::from_utf8_lossy(&line_bytes);
    Ok(Some(text.trim_end_matches('\r').to_string()))
}

/// Accumulates stream bytes and yields complete request lines
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(MAX_LINE_LENGTH),
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Call repeatedly until it returns `Ok(None)` to drain all complete lines
    pub fn decode_next(&mut self) -> Result<Option<String>, CodecError> {
        decode(&mut self.buffer)
    }

    /// Bytes held that do not yet form a complete line
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}
