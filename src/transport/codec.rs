//! Multipart wire codec
//!
//! Each message on a Unix socket is encoded as:
//!
//! ```text
//! +----------------+----------------+-----------+----------------+-----------+
//! | frame count    | frame 0 length | frame 0   | frame 1 length | frame 1...|
//! | u32 big-endian | u32 big-endian | bytes     | u32 big-endian |           |
//! +----------------+----------------+-----------+----------------+-----------+
//! ```
//!
//! The decoder waits for the whole message before yielding it, so part
//! boundaries and part count always survive the trip.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;

use super::multipart::Multipart;

const HEADER_LEN: usize = 4;

/// Length-prefixed multipart codec
#[derive(Debug, Clone)]
pub struct MultipartCodec {
    max_frames: usize,
    max_frame_size: usize,
}

impl MultipartCodec {
    /// Create a codec with the given limits
    pub fn new(max_frames: usize, max_frame_size: usize) -> Self {
        Self {
            max_frames,
            max_frame_size,
        }
    }

    fn check_count(&self, count: usize) -> Result<(), CodecError> {
        if count == 0 {
            return Err(CodecError::NoFrames);
        }
        if count > self.max_frames {
            return Err(CodecError::TooManyFrames {
                count,
                max: self.max_frames,
            });
        }
        Ok(())
    }

    fn check_size(&self, size: usize) -> Result<(), CodecError> {
        if size > self.max_frame_size {
            return Err(CodecError::FrameTooLarge {
                size,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }
}

impl Default for MultipartCodec {
    fn default() -> Self {
        Self::new(super::config::DEFAULT_MAX_FRAMES, super::config::DEFAULT_MAX_FRAME_SIZE)
    }
}

fn read_len(buf: &[u8], offset: usize) -> usize {
    let mut raw = [0u8; HEADER_LEN];
    raw.copy_from_slice(&buf[offset..offset + HEADER_LEN]);
    u32::from_be_bytes(raw) as usize
}

impl Decoder for MultipartCodec {
    type Item = Multipart;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Multipart>, CodecError> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let count = read_len(src, 0);
        self.check_count(count)?;

        // Walk the length prefixes without consuming until the message is complete
        let mut offset = HEADER_LEN;
        for _ in 0..count {
            if src.len() < offset + HEADER_LEN {
                src.reserve(offset + HEADER_LEN - src.len());
                return Ok(None);
            }
            let size = read_len(src, offset);
            self.check_size(size)?;
            offset += HEADER_LEN;

            if src.len() < offset + size {
                src.reserve(offset + size - src.len());
                return Ok(None);
            }
            offset += size;
        }

        let mut buf = src.split_to(offset).freeze();
        buf.advance(HEADER_LEN);

        let mut frames = Vec::with_capacity(count);
        for _ in 0..count {
            let size = buf.get_u32() as usize;
            frames.push(buf.split_to(size));
        }

        Ok(Some(Multipart::from_frames(frames)))
    }
}

impl Encoder<Multipart> for MultipartCodec {
    type Error = CodecError;

    fn encode(&mut self, msg: Multipart, dst: &mut BytesMut) -> Result<(), CodecError> {
        self.check_count(msg.len())?;
        for frame in msg.frames() {
            self.check_size(frame.len())?;
        }

        dst.reserve(HEADER_LEN * (msg.len() + 1) + msg.byte_len());
        dst.put_u32(msg.len() as u32);
        for frame in msg.frames() {
            dst.put_u32(frame.len() as u32);
            dst.put_slice(frame);
        }

        Ok(())
    }
}
