//! # Message
//!
//! A [`Message`] is the application-level unit reassembled from one opening
//! Text or Binary frame and any Continuation frames that follow it, up to and
//! including the frame with FIN set.
//!
//! The message keeps the frames themselves rather than a concatenated buffer,
//! so reassembly costs nothing until the payload is actually read with
//! [`Message::data`] or [`Message::copy_to`].
use bytes::{Bytes, BytesMut};

use crate::{
    frame::{Frame, OpCode},
    queue::Queue,
    Result, WebSocketError,
};

/// Largest message the parser accepts by default, 0x3ffffff bytes (~64 MiB).
pub const MAX_MESSAGE_LENGTH: u64 = 0x3ffffff;

/// A fragmented (or single-frame) data message.
#[derive(Debug, Clone)]
pub struct Message {
    /// Opcode of the opening frame, `Text` or `Binary`.
    pub opcode: OpCode,
    pub rsv1: bool,
    pub rsv2: bool,
    pub rsv3: bool,
    length: u64,
    frames: Queue<Frame>,
}

impl Message {
    /// Opens a message with its first frame.
    ///
    /// The opcode and reserved bits of the message are taken from this frame.
    pub fn new(frame: Frame) -> Self {
        let mut frames = Queue::new();
        let length = frame.len();
        let (opcode, rsv1, rsv2, rsv3) = (frame.opcode, frame.rsv1, frame.rsv2, frame.rsv3);
        frames.push(frame);

        Self {
            opcode,
            rsv1,
            rsv2,
            rsv3,
            length,
            frames,
        }
    }

    /// Appends a frame and adds its payload length to the running total.
    ///
    /// Fails, leaving the message unchanged, if the total would overflow.
    pub fn push_frame(&mut self, frame: Frame) -> Result<()> {
        self.length = self
            .length
            .checked_add(frame.len())
            .ok_or(WebSocketError::FrameAppendFailed)?;
        self.frames.push(frame);
        Ok(())
    }

    /// Total payload length across all frames.
    #[inline]
    pub fn len(&self) -> u64 {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of frames the message was assembled from.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Iterates over the frames in arrival order.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    /// Copies the concatenated payload into the front of `target`.
    ///
    /// Returns the number of bytes written, `0` when `target` is too small.
    pub fn copy_to(&self, target: &mut [u8]) -> usize {
        let Ok(length) = usize::try_from(self.length) else {
            return 0;
        };
        if target.len() < length {
            return 0;
        }

        let mut offset = 0;
        for frame in &self.frames {
            let payload = frame.payload.as_bytes();
            target[offset..offset + payload.len()].copy_from_slice(payload);
            offset += payload.len();
        }
        offset
    }

    /// The concatenated payload, copied out of the frames.
    pub fn data(&self) -> Bytes {
        let mut data = BytesMut::with_capacity(self.length as usize);
        for frame in &self.frames {
            data.extend_from_slice(&frame.payload);
        }
        data.freeze()
    }

    /// Consumes the message and returns the concatenated payload.
    ///
    /// Single-frame messages hand out their payload buffer without copying.
    pub fn into_data(mut self) -> Bytes {
        if self.frames.len() == 1 {
            if let Some(frame) = self.frames.shift() {
                return frame.payload.into_bytes();
            }
        }
        self.data()
    }

    /// Whether the concatenated payload is valid UTF-8.
    pub fn is_utf8(&self) -> bool {
        match self.frames.peek() {
            Some(frame) if self.frames.len() == 1 => frame.is_utf8(),
            _ => crate::is_utf8(&self.data()),
        }
    }

    /// The payload as a string, for valid UTF-8 Text messages.
    pub fn as_text(&self) -> Option<String> {
        if self.opcode != OpCode::Text {
            return None;
        }
        String::from_utf8(self.data().to_vec()).ok()
    }

    /// Deserializes the payload as JSON.
    #[cfg(feature = "json")]
    #[cfg_attr(docsrs, doc(cfg(feature = "json")))]
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.data())?)
    }

    /// Takes the frames out of the message.
    pub fn into_frames(self) -> impl Iterator<Item = Frame> {
        self.frames.into_iter()
    }
}
