//! Status message framing for the shared bus
//!
//! A bus transaction carries at most 32 bytes, so status text is cut into
//! 30 byte chunks and every chunk gets a two byte header:
//!
//! | Frame                  | Header   |
//! |------------------------|----------|
//! | only frame             | `[6, 8]` |
//! | first of several       | `[6, 7]` |
//! | middle                 | `[7, 7]` |
//! | last of several        | `[7, 8]` |
//!
//! Text of an exact multiple of 30 bytes ends with a full frame; no empty
//! trailing frame is sent. Empty text is one frame with an empty payload.

/// Payload bytes per frame
pub const FRAME_PAYLOAD: usize = 30;

/// Header byte opening a message
pub const START: u8 = 6;
/// Header byte continuing a message
pub const CONTINUE: u8 = 7;
/// Header byte closing a message
pub const STOP: u8 = 8;

/// Default bus address of the receiving end
pub const RECEIVER_ADDRESS: u8 = 0x08;

/// One bus transaction worth of a status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame<'a> {
    pub header: [u8; 2],
    pub payload: &'a [u8],
}

impl Frame<'_> {
    /// Header and payload as one contiguous buffer
    pub fn to_bytes(&self) -> heapless::Vec<u8, { FRAME_PAYLOAD + 2 }> {
        let mut bytes = heapless::Vec::new();
        // Header plus at most FRAME_PAYLOAD bytes always fits
        let _ = bytes.extend_from_slice(&self.header);
        let _ = bytes.extend_from_slice(self.payload);
        bytes
    }
}

/// Iterator over the frames of one message
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    chunks: core::slice::Chunks<'a, u8>,
    index: usize,
    count: usize,
}

/// Splits `text` into frames
pub fn frames(text: &str) -> Frames<'_> {
    let bytes = text.as_bytes();
    Frames {
        chunks: bytes.chunks(FRAME_PAYLOAD),
        index: 0,
        count: frame_count(bytes.len()),
    }
}

/// Number of frames needed for `len` bytes of text
pub const fn frame_count(len: usize) -> usize {
    if len == 0 {
        1
    } else {
        len.div_ceil(FRAME_PAYLOAD)
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = Frame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let payload = self.chunks.next().unwrap_or(&[]);
        let first = self.index == 0;
        let last = self.index + 1 == self.count;
        self.index += 1;

        let header = match (first, last) {
            (true, true) => [START, STOP],
            (true, false) => [START, CONTINUE],
            (false, false) => [CONTINUE, CONTINUE],
            (false, true) => [CONTINUE, STOP],
        };
        Some(Frame { header, payload })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count - self.index;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Frames<'_> {}
