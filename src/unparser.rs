//! # Unparser
//!
//! Serializes [`Frame`]s into wire bytes.
//!
//! The header uses the shortest length encoding that fits the payload: the
//! 7 bit field up to 125 bytes, a 16 bit extended length up to 65535 bytes and
//! a 64 bit extended length above that.
//!
//! A masking unparser (the client side of a connection) sets the MASK bit,
//! writes the frame's `masking_key` after the length and XORs the payload as it
//! is copied into the output. The frame handed in is never modified.
//!
//! ```rust
//! use wsdriver::{frame::Frame, unparser::Unparser};
//!
//! let unparser = Unparser::new(true);
//! let frame = Frame::text("Hi").with_masking_key([1, 2, 3, 4]);
//!
//! let bytes = unparser.frame(&frame);
//! assert_eq!(&bytes[..], &[0x81, 0x82, 1, 2, 3, 4, b'H' ^ 1, b'i' ^ 2]);
//! assert_eq!(frame.payload.as_bytes(), b"Hi");
//! ```
use bytes::{Bytes, BytesMut};

use crate::{
    frame::{Frame, MAX_HEAD_SIZE},
    mask::apply_mask,
    options::Role,
};

/// Frame serializer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unparser {
    masking: bool,
}

impl Unparser {
    /// Creates an unparser that masks its output when `masking` is set.
    pub fn new(masking: bool) -> Self {
        Self { masking }
    }

    /// Clients mask every frame they send, servers never do.
    pub fn for_role(role: Role) -> Self {
        Self::new(role == Role::Client)
    }

    /// Whether output frames are masked.
    pub fn masking(&self) -> bool {
        self.masking
    }

    /// Serializes `frame` into a freshly allocated buffer.
    pub fn frame(&self, frame: &Frame) -> Bytes {
        let mut dst = BytesMut::with_capacity(MAX_HEAD_SIZE + frame.payload.len());
        self.frame_into(frame, &mut dst);
        dst.freeze()
    }

    /// Appends the serialized `frame` to `dst`.
    ///
    /// Returns the number of bytes written.
    pub fn frame_into(&self, frame: &Frame, dst: &mut BytesMut) -> usize {
        let mask = self.masking.then_some(frame.masking_key);

        let mut head = [0u8; MAX_HEAD_SIZE];
        let size = frame.fmt_head(&mut head, mask);

        dst.reserve(size + frame.payload.len());
        dst.extend_from_slice(&head[..size]);

        let start = dst.len();
        dst.extend_from_slice(&frame.payload);
        if let Some(mask) = mask {
            apply_mask(&mut dst[start..], mask);
        }

        #[cfg(feature = "logging")]
        log::trace!(
            "serialized {:?} frame: fin={} masked={} length={}",
            frame.opcode,
            frame.fin,
            self.masking,
            frame.payload.len()
        );

        size + frame.payload.len()
    }
}
