//! # Frame
//!
//! The `frame` module implements WebSocket frames as defined in [RFC 6455 Section 5.2](https://datatracker.ietf.org/doc/html/rfc6455#section-5.2).
//!
//! ### Frame Binary Format
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |         (16 or 64 bits)       |
//! |N|V|V|V|       |S|             |                               |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |        Extended payload length continued, if payload len == 127|
//! +---------------------------------------------------------------+
//! |                               |   Masking-key, if MASK set to 1|
//! +-------------------------------+-------------------------------+
//! |     Masking-key (continued)       |          Payload Data      |
//! +-----------------------------------+ - - - - - - - - - - - - - -+
//! :                     Payload Data continued ...                :
//! +---------------------------------------------------------------+
//! ```
//!
//! Two types live here:
//!
//! - [`FrameHeader`]: the header fields as they come off the wire, before the
//!   opcode has been validated. This is what the parser carries between stages
//!   and what the [`Extensions`](crate::extensions::Extensions) hook inspects.
//! - [`Frame`]: a complete frame with a validated [`OpCode`] and its payload.
//!
//! ### Frame Construction
//!
//! ```rust
//! use wsdriver::{close::CloseCode, frame::Frame};
//!
//! let text = Frame::text("Hello, WebSocket!");
//! let ping = Frame::ping("are you there");
//! let close = Frame::close(CloseCode::Normal, "bye");
//! ```
use crate::{chunk::Chunk, close::CloseCode, WebSocketError};

pub(crate) const FIN: u8 = 0x80;
pub(crate) const RSV1: u8 = 0x40;
pub(crate) const RSV2: u8 = 0x20;
pub(crate) const RSV3: u8 = 0x10;
pub(crate) const OPCODE: u8 = 0x0f;
pub(crate) const MASK: u8 = 0x80;
pub(crate) const LENGTH: u8 = 0x7f;

/// Largest payload a control frame may carry.
pub const MAX_CONTROL_PAYLOAD: u64 = 125;

/// Largest header: 2 bytes, 8 bytes of extended length and a 4 byte masking key.
pub(crate) const MAX_HEAD_SIZE: usize = 14;

/// WebSocket operation code (OpCode) that determines the semantic meaning and handling of a frame.
///
/// # Data Frame OpCodes
/// - `Continuation`: Continues a fragmented message started by another data frame
/// - `Text`: Contains UTF-8 encoded text data
/// - `Binary`: Contains raw binary data
///
/// # Control Frame OpCodes
/// - `Close`: Initiates or confirms connection closure
/// - `Ping`: Tests connection liveness, requiring a `Pong` response
/// - `Pong`: Responds to a `Ping` frame
///
/// The ranges 0x3-0x7 and 0xB-0xF are reserved and rejected by the parser.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl OpCode {
    /// Returns `true` if the `OpCode` represents a control frame (`Close`, `Ping`, or `Pong`).
    ///
    /// Control frames cannot be fragmented and carry at most 125 bytes of payload.
    pub fn is_control(&self) -> bool {
        matches!(*self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }

    /// Returns `true` for the opcodes that make up messages: `Continuation`, `Text` and `Binary`.
    pub fn is_data(&self) -> bool {
        !self.is_control()
    }

    /// Returns `true` for the opcodes that open a new message: `Text` and `Binary`.
    pub fn is_opening(&self) -> bool {
        matches!(*self, OpCode::Text | OpCode::Binary)
    }
}

impl TryFrom<u8> for OpCode {
    type Error = WebSocketError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x0 => Ok(Self::Continuation),
            0x1 => Ok(Self::Text),
            0x2 => Ok(Self::Binary),
            0x8 => Ok(Self::Close),
            0x9 => Ok(Self::Ping),
            0xA => Ok(Self::Pong),
            _ => Err(WebSocketError::InvalidOpCode(value)),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(val: OpCode) -> Self {
        match val {
            OpCode::Continuation => 0x0,
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
            OpCode::Ping => 0x9,
            OpCode::Pong => 0xA,
        }
    }
}

/// Header fields of a frame being parsed.
///
/// `opcode` is the raw 4-bit value. `length` starts as the 7-bit length field
/// and holds the real payload length once any extended length has been read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameHeader {
    pub fin: bool,
    pub rsv1: bool,
    pub rsv2: bool,
    pub rsv3: bool,
    pub opcode: u8,
    pub masked: bool,
    pub masking_key: [u8; 4],
    pub length: u64,
}

impl FrameHeader {
    /// Decodes the two fixed header bytes.
    pub fn parse(head: [u8; 2]) -> Self {
        Self {
            fin: head[0] & FIN == FIN,
            rsv1: head[0] & RSV1 == RSV1,
            rsv2: head[0] & RSV2 == RSV2,
            rsv3: head[0] & RSV3 == RSV3,
            opcode: head[0] & OPCODE,
            masked: head[1] & MASK == MASK,
            masking_key: [0; 4],
            length: u64::from(head[1] & LENGTH),
        }
    }

    /// Whether any reserved bit is set.
    pub fn has_rsv(&self) -> bool {
        self.rsv1 || self.rsv2 || self.rsv3
    }

    /// Whether the raw opcode is Close, Ping or Pong.
    pub fn is_control(&self) -> bool {
        OpCode::try_from(self.opcode).is_ok_and(|opcode| opcode.is_control())
    }
}

/// Represents a WebSocket frame: header flags, masking key and payload.
///
/// Frames produced by the parser always carry an unmasked payload; `masked`
/// and `masking_key` record how the frame arrived. Frames handed to the
/// [`Unparser`](crate::unparser::Unparser) are serialized with `masking_key`
/// when the unparser is configured to mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Indicates if this is the final frame in a message.
    pub fin: bool,
    pub rsv1: bool,
    pub rsv2: bool,
    pub rsv3: bool,
    /// The opcode of the frame, defining its type.
    pub opcode: OpCode,
    /// Whether the frame carries a masking key on the wire.
    pub masked: bool,
    pub masking_key: [u8; 4],
    /// The payload of the frame, containing the actual data.
    pub payload: Chunk,
}

impl Frame {
    /// Creates a new unmasked frame with all reserved bits cleared.
    pub fn new(fin: bool, opcode: OpCode, payload: impl Into<Chunk>) -> Self {
        Self {
            fin,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            masked: false,
            masking_key: [0; 4],
            payload: payload.into(),
        }
    }

    /// Builds a frame from parsed header fields and the payload that followed them.
    pub(crate) fn from_header(header: &FrameHeader, opcode: OpCode, payload: Chunk) -> Self {
        Self {
            fin: header.fin,
            rsv1: header.rsv1,
            rsv2: header.rsv2,
            rsv3: header.rsv3,
            opcode,
            masked: header.masked,
            masking_key: header.masking_key,
            payload,
        }
    }

    /// A final text frame.
    pub fn text(payload: impl Into<Chunk>) -> Self {
        Self::new(true, OpCode::Text, payload)
    }

    /// A final binary frame.
    pub fn binary(payload: impl Into<Chunk>) -> Self {
        Self::new(true, OpCode::Binary, payload)
    }

    /// A continuation frame; `fin` marks the last fragment of the message.
    pub fn continuation(fin: bool, payload: impl Into<Chunk>) -> Self {
        Self::new(fin, OpCode::Continuation, payload)
    }

    pub fn ping(payload: impl Into<Chunk>) -> Self {
        Self::new(true, OpCode::Ping, payload)
    }

    pub fn pong(payload: impl Into<Chunk>) -> Self {
        Self::new(true, OpCode::Pong, payload)
    }

    /// A close frame carrying a status code followed by `reason`.
    pub fn close(code: CloseCode, reason: impl AsRef<[u8]>) -> Self {
        let reason = reason.as_ref();
        let mut payload = Chunk::new(2 + reason.len());
        payload.write_u16(0, code.into());
        payload.as_bytes_mut()[2..].copy_from_slice(reason);

        Self::new(true, OpCode::Close, payload)
    }

    /// A close frame with an arbitrary payload.
    ///
    /// The payload is not checked to be a valid close body.
    pub fn close_raw(payload: impl Into<Chunk>) -> Self {
        Self::new(true, OpCode::Close, payload)
    }

    pub fn with_rsv1(mut self) -> Self {
        self.rsv1 = true;
        self
    }

    pub fn with_rsv2(mut self) -> Self {
        self.rsv2 = true;
        self
    }

    pub fn with_rsv3(mut self) -> Self {
        self.rsv3 = true;
        self
    }

    /// Sets the key used when this frame is serialized by a masking unparser.
    pub fn with_masking_key(mut self, key: [u8; 4]) -> Self {
        self.masking_key = key;
        self
    }

    /// Payload length in bytes.
    #[inline]
    pub fn len(&self) -> u64 {
        self.payload.len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Checks if the frame payload is valid UTF-8.
    #[inline(always)]
    pub fn is_utf8(&self) -> bool {
        crate::is_utf8(&self.payload)
    }

    /// XORs the payload with the masking key when the frame is marked as masked.
    ///
    /// Masking is its own inverse, so this both masks and unmasks.
    pub fn mask(&mut self) {
        if self.masked {
            crate::mask::apply_mask(self.payload.as_bytes_mut(), self.masking_key);
        }
    }

    /// The header fields describing this frame.
    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            fin: self.fin,
            rsv1: self.rsv1,
            rsv2: self.rsv2,
            rsv3: self.rsv3,
            opcode: self.opcode.into(),
            masked: self.masked,
            masking_key: self.masking_key,
            length: self.len(),
        }
    }

    /// Formats the frame header into `head` and returns its size.
    ///
    /// With `mask` set, the MASK bit is raised and the key is written after the
    /// length field.
    ///
    /// # Panics
    /// Panics if `head` is shorter than the header, at most 14 bytes.
    pub(crate) fn fmt_head(&self, head: &mut [u8], mask: Option<[u8; 4]>) -> usize {
        head[0] = if self.fin { FIN } else { 0 }
            | if self.rsv1 { RSV1 } else { 0 }
            | if self.rsv2 { RSV2 } else { 0 }
            | if self.rsv3 { RSV3 } else { 0 }
            | u8::from(self.opcode);

        let len = self.payload.len();
        let size = if len <= 125 {
            head[1] = len as u8;
            2
        } else if len <= 65535 {
            head[1] = 126;
            head[2..4].copy_from_slice(&(len as u16).to_be_bytes());
            4
        } else {
            head[1] = 127;
            head[2..10].copy_from_slice(&(len as u64).to_be_bytes());
            10
        };

        match mask {
            Some(mask) => {
                head[1] |= MASK;
                head[size..size + 4].copy_from_slice(&mask);
                size + 4
            }
            None => size,
        }
    }
}
