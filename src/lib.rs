//! # wsdriver
//! A streaming, I/O free implementation of the WebSocket framing protocol (RFC 6455).
//!
//! The crate turns raw bytes into WebSocket events and frames back into bytes.
//! It never touches a socket: bytes come in through [`Parser::parse`] in pieces of
//! any size, and decoded messages, control frames and protocol errors come out
//! through an [`Observer`]. Outgoing frames are serialized with an [`Unparser`].
//!
//! The handshake, compression and connection lifecycle are left to the caller.
//! Extensions such as permessage-deflate can claim reserved bits through the
//! [`Extensions`] hook.
//!
//! # Features
//! The crate provides several optional features that can be enabled in your `Cargo.toml`:
//!
//! - `logging`: Enables debug logging of frame headers, completed messages and
//!   protocol errors using the `log` crate.
//!
//! - `simd`: Validates UTF-8 with `simdutf8`.
//!
//! - `json`: Enables deserialization of JSON payloads with [`Message::json`].
//!
//! ## Usage Example
//! ```toml
//! [dependencies]
//! wsdriver = { version = "0.1", features = ["logging"] }
//! ```
//!
//! # Parsing
//! ```rust
//! use wsdriver::{CloseCode, Message, Observer, Options, Parser};
//!
//! #[derive(Default)]
//! struct Printer {
//!     texts: Vec<String>,
//! }
//!
//! impl Observer for Printer {
//!     fn on_message(&mut self, message: Message) {
//!         if let Some(text) = message.as_text() {
//!             self.texts.push(text);
//!         }
//!     }
//!
//!     fn on_close(&mut self, code: CloseCode, _reason: &[u8]) {
//!         assert_eq!(code, CloseCode::Normal);
//!     }
//! }
//!
//! let mut parser = Parser::new(Printer::default(), Options::default());
//!
//! // frames may be split anywhere
//! parser.parse(&[0x81, 0x05, b'H', b'e']).unwrap();
//! parser.parse(&[b'l', b'l', b'o', 0x88, 0x02, 0x03, 0xE8]).unwrap();
//!
//! assert_eq!(parser.observer().texts, vec!["Hello".to_string()]);
//! ```
//!
//! # Serializing
//! ```rust
//! use wsdriver::{Frame, Role, Unparser};
//!
//! let unparser = Unparser::for_role(Role::Server);
//! let bytes = unparser.frame(&Frame::text("Hello"));
//! assert_eq!(&bytes[..], &[0x81, 0x05, b'H', b'e', b'l', b'l', b'o']);
//! ```
//!
//! # Framed transports
//! With a tokio transport, [`Codec`](codec::Codec) plugs the parser and the
//! unparser into `tokio_util::codec::Framed`.
//!
//! # Memory Safety
//! - Messages are limited to [`MAX_MESSAGE_LENGTH`](message::MAX_MESSAGE_LENGTH) bytes by default
//! - Unread input is limited to [`MAX_READ_BUFFER`](stream_reader::MAX_READ_BUFFER) bytes by default
//! - Control frames are limited to 125 bytes
//! - Payload allocations are fallible and reported as errors

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod chunk;
pub mod close;
pub mod codec;
pub mod extensions;
pub mod frame;
mod mask;
pub mod message;
pub mod observer;
pub mod options;
pub mod parser;
pub mod queue;
pub mod stream_reader;
pub mod unparser;

use thiserror::Error;

pub use chunk::Chunk;
pub use close::CloseCode;
pub use extensions::{Extensions, NoExtensions, ReservedBits};
pub use frame::{Frame, FrameHeader, OpCode};
pub use message::Message;
pub use observer::{Event, Observer};
pub use options::{Options, Role};
pub use parser::Parser;
pub use unparser::Unparser;

/// A result type for WebSocket operations, using `WebSocketError` as the error type.
pub type Result<T> = std::result::Result<T, WebSocketError>;

/// Represents errors that can occur while parsing WebSocket traffic.
///
/// Every variant maps to the close status code that should be sent to the peer
/// through [`WebSocketError::code`]:
///
/// - Protocol violations (reserved bits, unknown opcodes, broken fragmentation,
///   oversized control frames) map to [`CloseCode::Protocol`].
/// - An unmasked frame on a connection that requires masking maps to
///   [`CloseCode::Unsupported`].
/// - Oversized messages map to [`CloseCode::Size`].
/// - Invalid UTF-8 in a Text message maps to [`CloseCode::Invalid`].
/// - Resource exhaustion maps to [`CloseCode::Error`].
/// - Transport failures map to [`CloseCode::Abnormal`].
#[derive(Error, Debug, Clone)]
pub enum WebSocketError {
    /// A reserved bit was set that no negotiated extension claims.
    #[error("One or more reserved bits are on: reserved1 = {rsv1}, reserved2 = {rsv2}, reserved3 = {rsv3}")]
    ReservedBitsNotZero { rsv1: bool, rsv2: bool, rsv3: bool },

    /// The opcode is one of the reserved values 0x3-0x7 or 0xB-0xF.
    #[error("Unrecognized frame opcode: {0}")]
    InvalidOpCode(u8),

    /// A Close, Ping or Pong frame arrived without FIN set.
    #[error("Received fragmented control frame: opcode = {0}")]
    ControlFrameFragmented(u8),

    /// A Continuation frame arrived with no message in progress.
    #[error("Received unexpected continuation frame")]
    InvalidContinuationFrame,

    /// A Text or Binary frame arrived before the previous message was finished.
    #[error("Received new data frame but previous continuous frame is unfinished")]
    InvalidFragment,

    /// The connection requires masked frames and this one was not.
    #[error("Received unmasked frame but masking is required")]
    UnmaskedFrame,

    /// A control frame declared more than 125 bytes of payload.
    #[error("Received control frame having too long payload: {0}")]
    ControlFrameTooLarge(u64),

    /// The message, summed over its frames, would exceed the configured limit.
    #[error("WebSocket frame length too large")]
    MessageTooLarge,

    /// A Text message is not valid UTF-8.
    #[error("Could not decode a text frame as UTF-8")]
    InvalidUTF8,

    /// Buffering the input would exceed the read buffer limit.
    #[error("Failed to push chunk[{0}] to read buffer")]
    ReadBufferFull(usize),

    /// The payload buffer could not be allocated.
    #[error("Failed to allocate frame payload[{0}]")]
    AllocationFailed(usize),

    #[error("Failed to add frame to message")]
    FrameAppendFailed,

    /// Wraps I/O errors from the transport underneath a framed codec.
    #[error(transparent)]
    IoError(std::sync::Arc<std::io::Error>),

    /// Occurs when deserialization of JSON data fails.
    /// Only available when the `json` feature is enabled.
    #[cfg(feature = "json")]
    #[cfg_attr(docsrs, doc(cfg(feature = "json")))]
    #[error(transparent)]
    Json(std::sync::Arc<serde_json::Error>),
}

impl WebSocketError {
    /// The close status code to report to the peer for this error.
    pub fn code(&self) -> CloseCode {
        match self {
            Self::ReservedBitsNotZero { .. }
            | Self::InvalidOpCode(_)
            | Self::ControlFrameFragmented(_)
            | Self::InvalidContinuationFrame
            | Self::InvalidFragment
            | Self::ControlFrameTooLarge(_) => CloseCode::Protocol,
            Self::UnmaskedFrame => CloseCode::Unsupported,
            Self::MessageTooLarge => CloseCode::Size,
            Self::InvalidUTF8 => CloseCode::Invalid,
            Self::ReadBufferFull(_) | Self::AllocationFailed(_) | Self::FrameAppendFailed => {
                CloseCode::Error
            }
            Self::IoError(_) => CloseCode::Abnormal,
            #[cfg(feature = "json")]
            Self::Json(_) => CloseCode::Invalid,
        }
    }
}

impl From<std::io::Error> for WebSocketError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(std::sync::Arc::new(err))
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for WebSocketError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(std::sync::Arc::new(err))
    }
}

/// Checks whether `buf` is valid UTF-8.
#[inline(always)]
pub(crate) fn is_utf8(buf: &[u8]) -> bool {
    #[cfg(feature = "simd")]
    {
        simdutf8::basic::from_utf8(buf).is_ok()
    }
    #[cfg(not(feature = "simd"))]
    {
        std::str::from_utf8(buf).is_ok()
    }
}
