//! # Codec
//!
//! Adapts the [`Parser`] and the [`Unparser`] to `tokio_util::codec`, so a
//! WebSocket byte stream can be driven through `FramedRead`, `FramedWrite` or
//! `Framed` on top of any `AsyncRead`/`AsyncWrite` transport.
//!
//! Decoding yields one [`Event`] per observer callback. A protocol error ends
//! the stream with `Err`, and every later call returns the same error.
use std::collections::VecDeque;

use bytes::BytesMut;
use tokio_util::codec;

use crate::{
    chunk::Chunk,
    frame::Frame,
    observer::Event,
    options::{Options, Role},
    parser::Parser,
    unparser::Unparser,
    WebSocketError,
};

/// A combined codec that provides both encoding and decoding of WebSocket traffic.
///
/// The decoder hands every byte it is given to the parser and queues the
/// resulting events. The encoder serializes [`Frame`]s, masking them with a
/// random key when configured to mask and the frame does not carry a key.
pub struct Codec {
    parser: Parser<VecDeque<Event>>,
    unparser: Unparser,
}

impl Codec {
    /// Creates a codec with explicit parser options and output masking.
    pub fn new(options: Options, masking: bool) -> Self {
        Self {
            parser: Parser::new(VecDeque::new(), options),
            unparser: Unparser::new(masking),
        }
    }

    /// Creates a codec configured for one side of a connection.
    ///
    /// A server requires masked input and sends unmasked frames; a client
    /// accepts unmasked input and masks what it sends.
    pub fn for_role(role: Role) -> Self {
        Self {
            parser: Parser::new(VecDeque::new(), Options::for_role(role)),
            unparser: Unparser::for_role(role),
        }
    }

    pub fn parser(&self) -> &Parser<VecDeque<Event>> {
        &self.parser
    }

    pub fn unparser(&self) -> &Unparser {
        &self.unparser
    }
}

impl codec::Decoder for Codec {
    type Item = Event;
    type Error = WebSocketError;

    /// Feeds the buffered bytes to the parser and returns the next event.
    ///
    /// # Returns
    /// - `Ok(Some(Event))`: the oldest event not handed out yet.
    /// - `Ok(None)`: more data is needed to complete an event.
    /// - `Err(WebSocketError)`: the parser halted on a protocol error.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() && !self.parser.is_halted() {
            // errors surface through the event queue, in order
            let _ = self.parser.parse_chunk(Chunk::from(src.split()));
        }

        match self.parser.observer_mut().pop_front() {
            Some(Event::Error(err)) => Err(err),
            Some(event) => Ok(Some(event)),
            None => match self.parser.error() {
                Some(err) => Err(err.clone()),
                None => Ok(None),
            },
        }
    }

    /// Same as `decode`, but fails if the stream ends in the middle of a frame or message.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(event) => Ok(Some(event)),
            None if self.parser.buffered() > 0
                || self.parser.in_frame()
                || self.parser.pending_message().is_some() =>
            {
                Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "stream ended inside a websocket message",
                )
                .into())
            }
            None => Ok(None),
        }
    }
}

impl codec::Encoder<Frame> for Codec {
    type Error = WebSocketError;

    /// Serializes `frame` into `dst`.
    fn encode(&mut self, mut frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.unparser.masking() && frame.masking_key == [0; 4] {
            frame.masking_key = rand::random();
        }

        self.unparser.frame_into(&frame, dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{close::CloseCode, frame::OpCode};
    use tokio_util::codec::{Decoder, Encoder};

    #[test]
    fn test_decode_across_calls() {
        let mut codec = Codec::for_role(Role::Client);
        let mut src = BytesMut::from(&[0x81u8, 0x05, b'H', b'e'][..]);

        assert!(codec.decode(&mut src).unwrap().is_none());
        assert!(src.is_empty());

        src.extend_from_slice(b"llo");
        src.extend_from_slice(&[0x89, 0x00]);

        let Some(Event::Message(message)) = codec.decode(&mut src).unwrap() else {
            panic!("expected a message");
        };
        assert_eq!(message.opcode, OpCode::Text);
        assert_eq!(message.as_text().as_deref(), Some("Hello"));

        assert!(matches!(codec.decode(&mut src).unwrap(), Some(Event::Ping(p)) if p.is_empty()));
        assert!(codec.decode(&mut src).unwrap().is_none());
    }

    #[test]
    fn test_decode_error_is_sticky() {
        let mut codec = Codec::for_role(Role::Client);
        let mut src = BytesMut::from(&[0x81u8, 0x01, b'a', 0x80, 0x00][..]);

        assert!(matches!(codec.decode(&mut src), Ok(Some(Event::Message(_)))));
        assert!(matches!(
            codec.decode(&mut src),
            Err(WebSocketError::InvalidContinuationFrame)
        ));

        src.extend_from_slice(&[0x81, 0x00]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(WebSocketError::InvalidContinuationFrame)
        ));
    }

    #[test]
    fn test_server_rejects_unmasked_input() {
        let mut codec = Codec::for_role(Role::Server);
        let mut src = BytesMut::from(&[0x81u8, 0x01, b'a'][..]);

        let err = codec.decode(&mut src).unwrap_err();
        assert_eq!(err.code(), CloseCode::Unsupported);
    }

    #[test]
    fn test_client_masks_with_random_key() {
        let mut codec = Codec::for_role(Role::Client);
        let mut dst = BytesMut::new();

        codec.encode(Frame::binary(vec![0u8; 64]), &mut dst).unwrap();
        assert_eq!(dst[0], 0x82);
        assert_eq!(dst[1], 0x80 | 64);

        let key = [dst[2], dst[3], dst[4], dst[5]];
        let payload: Vec<u8> = dst[6..].iter().enumerate().map(|(i, b)| b ^ key[i % 4]).collect();
        assert_eq!(payload, vec![0u8; 64]);
    }

    #[test]
    fn test_explicit_key_is_kept() {
        let mut codec = Codec::new(Options::default(), true);
        let mut dst = BytesMut::new();

        codec
            .encode(Frame::text("Hi").with_masking_key([1, 2, 3, 4]), &mut dst)
            .unwrap();
        assert_eq!(&dst[..], &[0x81, 0x82, 1, 2, 3, 4, b'H' ^ 1, b'i' ^ 2]);
    }

    #[test]
    fn test_eof_inside_frame() {
        let mut codec = Codec::for_role(Role::Client);
        let mut src = BytesMut::from(&[0x82u8, 0x04, 1, 2][..]);

        assert!(codec.decode(&mut src).unwrap().is_none());
        let err = codec.decode_eof(&mut src).unwrap_err();
        assert!(matches!(err, WebSocketError::IoError(_)));
        assert_eq!(err.code(), CloseCode::Abnormal);
    }

    #[test]
    fn test_eof_between_frames() {
        let mut codec = Codec::for_role(Role::Client);
        let mut src = BytesMut::from(&[0x8Au8, 0x00][..]);

        assert!(matches!(codec.decode_eof(&mut src), Ok(Some(Event::Pong(_)))));
        assert!(codec.decode_eof(&mut src).unwrap().is_none());
    }

    #[test]
    fn test_client_to_server() {
        let mut client = Codec::for_role(Role::Client);
        let mut server = Codec::for_role(Role::Server);
        let mut wire = BytesMut::new();

        client.encode(Frame::new(false, OpCode::Text, "Hel"), &mut wire).unwrap();
        client.encode(Frame::pong("pong"), &mut wire).unwrap();
        client.encode(Frame::continuation(true, "lo"), &mut wire).unwrap();
        client
            .encode(Frame::close(CloseCode::Away, "bye"), &mut wire)
            .unwrap();

        let mut events = Vec::new();
        while let Some(event) = server.decode(&mut wire).unwrap() {
            events.push(event);
        }

        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], Event::Pong(p) if &p[..] == b"pong"));
        assert!(matches!(&events[1], Event::Message(m) if m.as_text().as_deref() == Some("Hello")));
        assert!(matches!(
            &events[2],
            Event::Close { code: CloseCode::Away, reason } if &reason[..] == b"bye"
        ));
    }
}
