//! Reserved-bit validation hook.
//!
//! The RSV1-3 header bits belong to negotiated extensions. Without any
//! extension they must all be zero. The parser asks its [`Extensions`] hook
//! about every header before validating anything else, so an extension such
//! as permessage-deflate can claim RSV1 without this crate knowing how to
//! transform its payloads.
use crate::frame::FrameHeader;

/// Decides whether a frame's reserved bits are acceptable.
pub trait Extensions {
    /// Returns `true` if the RSV bits of `header` are allowed.
    fn valid_frame_rsv(&self, header: &FrameHeader) -> bool;
}

/// No extensions negotiated: every reserved bit must be zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExtensions;

impl Extensions for NoExtensions {
    fn valid_frame_rsv(&self, header: &FrameHeader) -> bool {
        !header.has_rsv()
    }
}

/// Accepts the reserved bits claimed by the negotiated extensions.
///
/// A frame is valid when every bit it sets is one of the claimed bits. For
/// permessage-deflate that is `ReservedBits::rsv1()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReservedBits {
    pub rsv1: bool,
    pub rsv2: bool,
    pub rsv3: bool,
}

impl ReservedBits {
    /// Claims RSV1 only.
    pub fn rsv1() -> Self {
        Self {
            rsv1: true,
            ..Default::default()
        }
    }
}

impl Extensions for ReservedBits {
    fn valid_frame_rsv(&self, header: &FrameHeader) -> bool {
        (self.rsv1 || !header.rsv1) && (self.rsv2 || !header.rsv2) && (self.rsv3 || !header.rsv3)
    }
}

impl<F> Extensions for F
where
    F: Fn(&FrameHeader) -> bool,
{
    fn valid_frame_rsv(&self, header: &FrameHeader) -> bool {
        self(header)
    }
}
