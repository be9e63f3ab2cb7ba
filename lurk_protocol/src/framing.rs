// Frame reassembly over a byte stream.
//
// A TCP stream has no message boundaries: one `read` may return half a frame
// or three frames at once. `FrameReader` keeps whatever it has read in a
// buffer and asks `WireMessage::frame_len` whether the head of the buffer is
// a complete frame before decoding anything. Leftover bytes stay buffered
// for the next call.
//
// Frame sizes are attacker-controlled but bounded by the protocol: the
// largest possible frame is a chat or character frame with a 65535-byte text,
// so the buffer never needs to hold more than one such frame plus one read.
//
// `write_frame` is the symmetric helper for the sending side.

use std::io::{self, Read, Write};

use crate::codec::WireMessage;
use crate::error::{FrameError, Result};

const READ_CHUNK: usize = 8 * 1024;

/// Buffered frame reader over any byte stream.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(READ_CHUNK),
        }
    }

    /// Read one frame.
    ///
    /// Returns:
    /// - `Ok(Some(message))` for a complete frame,
    /// - `Ok(None)` on clean EOF with nothing buffered,
    /// - `Err(FrameError::Io)` with `UnexpectedEof` if the stream ends
    ///   mid-frame.
    pub fn read_frame<M: WireMessage>(&mut self) -> Result<Option<M>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(len) = M::frame_len(&self.buf)? {
                let message = M::decode(&self.buf[..len]);
                self.buf.drain(..len);
                return message.map(Some);
            }

            let n = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(FrameError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("stream closed with {} bytes of a frame", self.buf.len()),
                )));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Bytes read from the stream but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

/// Encode a message and write it as one frame, then flush.
pub fn write_frame<W: Write, M: WireMessage>(writer: &mut W, message: &M) -> Result<()> {
    let bytes = message.encode()?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
