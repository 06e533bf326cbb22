//! `u16_be length | payload` TCP stream reassembly.
//!
//! The buffer accumulates raw socket reads and yields complete inner
//! messages. Zero-length frames are discarded silently. A partial frame
//! left in the buffer is dropped with it when the connection closes.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{CodecError, CodecResult};

/// Reassembly buffer for one TCP stream.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: BytesMut,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes from a socket read.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pop the next complete frame payload, if one is buffered.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        loop {
            if self.buf.len() < 2 {
                return None;
            }
            let length = u16::from_be_bytes([self.buf[0], self.buf[1]]) as usize;
            if self.buf.len() < 2 + length {
                return None;
            }
            self.buf.advance(2);
            let frame = self.buf.split_to(length).freeze();
            if length == 0 {
                continue;
            }
            return Some(frame);
        }
    }

    /// Bytes buffered but not yet framed.
    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }
}

/// Prefix `payload` with its big-endian u16 length.
pub fn encode_frame(payload: &[u8]) -> CodecResult<Bytes> {
    if payload.len() > u16::MAX as usize {
        return Err(CodecError::FrameTooLarge(payload.len()));
    }
    let mut out = BytesMut::with_capacity(2 + payload.len());
    out.put_u16(payload.len() as u16);
    out.extend_from_slice(payload);
    Ok(out.freeze())
}
