//! Multi-part messages
//!
//! A [`Multipart`] is the unit the transport moves: one or more ordered byte
//! frames sent and received atomically. Frames are `Bytes`, so cloning a
//! message for several peers only bumps reference counts.

use bytes::Bytes;

/// An ordered list of byte frames carried as one message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Multipart {
    frames: Vec<Bytes>,
}

impl Multipart {
    /// Create an empty message
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Create from a list of frames
    pub fn from_frames(frames: Vec<Bytes>) -> Self {
        Self { frames }
    }

    /// Append a frame
    pub fn push(&mut self, frame: impl Into<Bytes>) {
        self.frames.push(frame.into());
    }

    /// Builder-style [`push`](Self::push)
    pub fn with_frame(mut self, frame: impl Into<Bytes>) -> Self {
        self.push(frame);
        self
    }

    /// First frame, which carries the topic for filtering
    pub fn first(&self) -> Option<&Bytes> {
        self.frames.first()
    }

    /// All frames in order
    pub fn frames(&self) -> &[Bytes] {
        &self.frames
    }

    /// Consume into the frame list
    pub fn into_frames(self) -> Vec<Bytes> {
        self.frames
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the message has no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total payload size across all frames
    pub fn byte_len(&self) -> usize {
        self.frames.iter().map(Bytes::len).sum()
    }

    /// Bytes the first frame is matched against; empty if there is none
    pub(crate) fn topic_bytes(&self) -> &[u8] {
        self.frames.first().map(|f| f.as_ref()).unwrap_or(&[])
    }
}

impl From<Bytes> for Multipart {
    fn from(frame: Bytes) -> Self {
        Self {
            frames: vec![frame],
        }
    }
}

impl From<&'static str> for Multipart {
    fn from(frame: &'static str) -> Self {
        Bytes::from_static(frame.as_bytes()).into()
    }
}

impl From<Vec<Bytes>> for Multipart {
    fn from(frames: Vec<Bytes>) -> Self {
        Self::from_frames(frames)
    }
}

impl IntoIterator for Multipart {
    type Item = Bytes;
    type IntoIter = std::vec::IntoIter<Bytes>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}
