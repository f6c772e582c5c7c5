//! # Parser
//!
//! A streaming decoder for the WebSocket wire format.
//!
//! Bytes are fed in with [`Parser::parse`] in pieces of any size, split at any
//! position. The parser buffers what it cannot use yet and resumes exactly
//! where it stopped on the next call, so feeding a stream one byte at a time
//! or all at once produces the same sequence of [`Observer`] callbacks.
//!
//! Each frame goes through up to four stages:
//!
//! 1. the two fixed header bytes, validated against the extension hook, the
//!    opcode table, the fragmentation rules and the masking policy;
//! 2. the 16 or 64 bit extended length, when the 7 bit length is 126 or 127;
//! 3. the masking key, when the MASK bit is set;
//! 4. the payload, unmasked in place and dispatched by opcode.
//!
//! Data frames are collected into a [`Message`] which is handed to
//! [`Observer::on_message`] once its final frame arrives. Control frames go
//! straight to `on_close`, `on_ping` or `on_pong`, even in the middle of a
//! fragmented message.
//!
//! The first protocol error halts the parser for good: it is reported once
//! through [`Observer::on_error`], and every later call to `parse` returns it
//! again without consuming input.
use crate::{
    chunk::Chunk,
    close::CloseCode,
    extensions::{Extensions, NoExtensions},
    frame::{Frame, FrameHeader, OpCode, MAX_CONTROL_PAYLOAD},
    message::Message,
    observer::Observer,
    options::Options,
    stream_reader::StreamReader,
    Result, WebSocketError,
};

/// A frame whose header passed validation.
#[derive(Debug)]
struct Pending {
    header: FrameHeader,
    opcode: OpCode,
}

/// What the parser needs to read next.
#[derive(Debug)]
enum Stage {
    /// The two fixed header bytes.
    Header,
    /// A 2 or 8 byte extended payload length.
    ExtendedLength(Pending, usize),
    MaskingKey(Pending),
    Payload(Pending),
    /// A protocol error occurred, nothing more is read.
    Halted,
}

/// Streaming WebSocket frame and message decoder.
///
/// The parser owns its observer; use [`Parser::observer`] and
/// [`Parser::into_observer`] to get at collected state, or pass `&mut O` to
/// keep ownership outside.
pub struct Parser<O, E = NoExtensions> {
    options: Options,
    reader: StreamReader,
    extensions: E,
    observer: O,
    stage: Stage,
    /// Data message waiting for its final frame.
    message: Option<Message>,
    error: Option<WebSocketError>,
}

impl<O: Observer> Parser<O> {
    /// Creates a parser that accepts no reserved bits.
    pub fn new(observer: O, options: Options) -> Self {
        Self::with_extensions(NoExtensions, observer, options)
    }
}

impl<O: Observer, E: Extensions> Parser<O, E> {
    /// Creates a parser whose reserved-bit validation is delegated to `extensions`.
    pub fn with_extensions(extensions: E, observer: O, options: Options) -> Self {
        Self {
            reader: StreamReader::with_max_capacity(options.max_buffer_capacity),
            options,
            extensions,
            observer,
            stage: Stage::Header,
            message: None,
            error: None,
        }
    }

    /// Feeds `data` to the parser.
    ///
    /// Every event completed by these bytes is delivered to the observer
    /// before this returns. Incomplete frames are kept for the next call.
    ///
    /// # Returns
    /// - `Ok(())` if no protocol error has occurred so far.
    /// - `Err(WebSocketError)` with the error that halted the parser, on this
    ///   call or any earlier one.
    pub fn parse(&mut self, data: &[u8]) -> Result<()> {
        match self.error {
            Some(ref error) => Err(error.clone()),
            None => self.parse_chunk(Chunk::from(data)),
        }
    }

    /// Same as [`Parser::parse`], but takes ownership of the buffer instead of copying it.
    pub fn parse_chunk(&mut self, chunk: Chunk) -> Result<()> {
        if self.error.is_none() {
            let length = chunk.len();
            if self.reader.push(chunk) {
                while self.step() {}
            } else {
                self.fail(WebSocketError::ReadBufferFull(length));
            }
        }

        match self.error {
            Some(ref error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    /// The error that halted the parser, if any.
    pub fn error(&self) -> Option<&WebSocketError> {
        self.error.as_ref()
    }

    /// Whether the parser stopped on a protocol error.
    pub fn is_halted(&self) -> bool {
        matches!(self.stage, Stage::Halted)
    }

    /// Whether a frame header has been consumed but the frame is not complete yet.
    pub fn in_frame(&self) -> bool {
        !matches!(self.stage, Stage::Header | Stage::Halted)
    }

    /// Number of received bytes not consumed yet.
    pub fn buffered(&self) -> usize {
        self.reader.capacity()
    }

    /// The fragmented message currently being reassembled.
    pub fn pending_message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn extensions(&self) -> &E {
        &self.extensions
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    /// Tries to complete the current stage. Returns `false` when out of input or halted.
    fn step(&mut self) -> bool {
        match std::mem::replace(&mut self.stage, Stage::Halted) {
            Stage::Header => {
                let mut head = [0u8; 2];
                if self.reader.read(2, &mut head) == 0 {
                    self.stage = Stage::Header;
                    return false;
                }
                self.parse_head(FrameHeader::parse(head));
            }
            Stage::ExtendedLength(mut pending, width) => {
                let mut buf = [0u8; 8];
                if self.reader.read(width, &mut buf) == 0 {
                    self.stage = Stage::ExtendedLength(pending, width);
                    return false;
                }
                pending.header.length = match width {
                    2 => u64::from(u16::from_be_bytes([buf[0], buf[1]])),
                    _ => u64::from_be_bytes(buf),
                };
                self.parse_extended_length(pending);
            }
            Stage::MaskingKey(mut pending) => {
                if self.reader.read(4, &mut pending.header.masking_key) == 0 {
                    self.stage = Stage::MaskingKey(pending);
                    return false;
                }
                self.stage = Stage::Payload(pending);
            }
            Stage::Payload(pending) => {
                let Ok(length) = usize::try_from(pending.header.length) else {
                    self.fail(WebSocketError::MessageTooLarge);
                    return false;
                };
                if !self.reader.has_capacity(length) {
                    self.stage = Stage::Payload(pending);
                    return false;
                }
                match self.reader.read_chunk(length) {
                    Some(payload) => self.emit_frame(pending, payload),
                    None => self.fail(WebSocketError::AllocationFailed(length)),
                }
            }
            Stage::Halted => {
                return false;
            }
        }

        !self.is_halted()
    }

    fn parse_head(&mut self, header: FrameHeader) {
        #[cfg(feature = "logging")]
        log::trace!(
            "frame header: fin={} rsv=({}, {}, {}) opcode={} masked={} length={}",
            header.fin,
            header.rsv1,
            header.rsv2,
            header.rsv3,
            header.opcode,
            header.masked,
            header.length
        );

        if !self.extensions.valid_frame_rsv(&header) {
            return self.fail(WebSocketError::ReservedBitsNotZero {
                rsv1: header.rsv1,
                rsv2: header.rsv2,
                rsv3: header.rsv3,
            });
        }

        let opcode = match OpCode::try_from(header.opcode) {
            Ok(opcode) => opcode,
            Err(err) => return self.fail(err),
        };

        if opcode.is_control() && !header.fin {
            return self.fail(WebSocketError::ControlFrameFragmented(header.opcode));
        }
        if opcode == OpCode::Continuation && self.message.is_none() {
            return self.fail(WebSocketError::InvalidContinuationFrame);
        }
        if opcode.is_opening() && self.message.is_some() {
            return self.fail(WebSocketError::InvalidFragment);
        }
        if self.options.require_masking && !header.masked {
            return self.fail(WebSocketError::UnmaskedFrame);
        }

        let pending = Pending { header, opcode };
        match header.length {
            126 => self.stage = Stage::ExtendedLength(pending, 2),
            127 => self.stage = Stage::ExtendedLength(pending, 8),
            _ => self.begin_payload(pending),
        }
    }

    fn parse_extended_length(&mut self, pending: Pending) {
        if pending.opcode.is_control() && pending.header.length > MAX_CONTROL_PAYLOAD {
            return self.fail(WebSocketError::ControlFrameTooLarge(pending.header.length));
        }
        self.begin_payload(pending);
    }

    /// Runs the size check on a frame whose length is known, then moves on to
    /// the masking key or the payload.
    fn begin_payload(&mut self, pending: Pending) {
        let open = self.message.as_ref().map_or(0, Message::len);
        if open.saturating_add(pending.header.length) > self.options.max_message_length {
            return self.fail(WebSocketError::MessageTooLarge);
        }

        self.stage = if pending.header.masked {
            Stage::MaskingKey(pending)
        } else {
            Stage::Payload(pending)
        };
    }

    fn emit_frame(&mut self, pending: Pending, payload: Chunk) {
        let Pending { header, opcode } = pending;

        let mut frame = Frame::from_header(&header, opcode, payload);
        frame.mask();

        self.stage = Stage::Header;

        match opcode {
            OpCode::Continuation => match self.message.as_mut() {
                Some(message) => {
                    if let Err(err) = message.push_frame(frame) {
                        return self.fail(err);
                    }
                }
                None => return self.fail(WebSocketError::InvalidContinuationFrame),
            },
            OpCode::Text | OpCode::Binary => {
                self.message = Some(Message::new(frame));
            }
            OpCode::Close => return self.emit_close(&frame),
            OpCode::Ping => return self.observer.on_ping(frame.payload),
            OpCode::Pong => return self.observer.on_pong(frame.payload),
        }

        if header.fin {
            self.emit_message();
        }
    }

    fn emit_close(&mut self, frame: &Frame) {
        let payload = &frame.payload;

        let (code, reason) = match payload.len() {
            0 => (CloseCode::Normal, &[][..]),
            // a single byte cannot hold a status code
            1 => (CloseCode::Protocol, &[][..]),
            _ => (
                CloseCode::from(payload.read_u16(0)),
                payload.tail(2).unwrap_or_default(),
            ),
        };

        let code = if !code.is_allowed() || (self.options.utf8 && !crate::is_utf8(reason)) {
            CloseCode::Protocol
        } else {
            code
        };

        #[cfg(feature = "logging")]
        log::debug!("close frame: code={code} reason_len={}", reason.len());

        self.observer.on_close(code, reason);
    }

    fn emit_message(&mut self) {
        let Some(message) = self.message.take() else {
            return;
        };

        if self.options.utf8 && message.opcode == OpCode::Text && !message.is_utf8() {
            return self.fail(WebSocketError::InvalidUTF8);
        }

        #[cfg(feature = "logging")]
        log::debug!(
            "message: opcode={:?} frames={} length={}",
            message.opcode,
            message.frame_count(),
            message.len()
        );

        self.observer.on_message(message);
    }

    /// Halts the parser with `error`. Only the first error is kept and reported.
    fn fail(&mut self, error: WebSocketError) {
        if self.error.is_some() {
            return;
        }

        #[cfg(feature = "logging")]
        log::debug!("parser halted with code {}: {error}", error.code());

        self.stage = Stage::Halted;
        self.message = None;
        self.reader = StreamReader::with_max_capacity(self.options.max_buffer_capacity);

        let error = self.error.insert(error);
        self.observer.on_error(error);
    }
}

impl<O, E> std::fmt::Debug for Parser<O, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("options", &self.options)
            .field("stage", &self.stage)
            .field("buffered", &self.reader.capacity())
            .field("error", &self.error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{extensions::ReservedBits, observer::Event};

    fn parser() -> Parser<Vec<Event>> {
        Parser::new(Vec::new(), Options::default())
    }

    /// Builds an unmasked frame with a short payload.
    fn frame(b0: u8, payload: &[u8]) -> Vec<u8> {
        assert!(payload.len() <= 125);
        let mut bytes = vec![b0, payload.len() as u8];
        bytes.extend_from_slice(payload);
        bytes
    }

    /// Builds a masked frame with a short payload.
    fn masked_frame(b0: u8, key: [u8; 4], payload: &[u8]) -> Vec<u8> {
        assert!(payload.len() <= 125);
        let mut bytes = vec![b0, 0x80 | payload.len() as u8];
        bytes.extend_from_slice(&key);
        bytes.extend(payload.iter().enumerate().map(|(i, b)| b ^ key[i % 4]));
        bytes
    }

    fn message_text(event: &Event) -> Option<(OpCode, Vec<u8>)> {
        match event {
            Event::Message(message) => Some((message.opcode, message.data().to_vec())),
            _ => None,
        }
    }

    fn error_code(event: &Event) -> Option<CloseCode> {
        match event {
            Event::Error(err) => Some(err.code()),
            _ => None,
        }
    }

    mod message_tests {
        use super::*;

        #[test]
        fn test_single_text_frame() {
            let mut parser = parser();
            parser.parse(&[0x81, 0x05, b'H', b'e', b'l', b'l', b'o']).unwrap();

            let events = parser.observer();
            assert_eq!(events.len(), 1);
            let Event::Message(message) = &events[0] else {
                panic!("expected a message");
            };
            assert_eq!(message.opcode, OpCode::Text);
            assert!(!message.rsv1 && !message.rsv2 && !message.rsv3);
            assert_eq!(&message.data()[..], b"Hello");
            assert_eq!(parser.buffered(), 0);
        }

        #[test]
        fn test_masked_text_frame() {
            let mut parser = Parser::new(Vec::new(), Options::default().with_require_masking());
            let bytes = masked_frame(0x81, [0x37, 0xfa, 0x21, 0x3d], b"Hello");
            assert_eq!(&bytes[..2], &[0x81, 0x85]);

            parser.parse(&bytes).unwrap();
            assert_eq!(
                message_text(&parser.observer()[0]),
                Some((OpCode::Text, b"Hello".to_vec()))
            );
        }

        #[test]
        fn test_empty_binary_frame() {
            let mut parser = parser();
            parser.parse(&[0x82, 0x00]).unwrap();
            assert_eq!(
                message_text(&parser.observer()[0]),
                Some((OpCode::Binary, vec![]))
            );
        }

        #[test]
        fn test_fragmented_message_with_interleaved_ping() {
            let mut bytes = frame(0x01, b"Hel");
            bytes.extend(frame(0x89, b"ping"));
            bytes.extend(frame(0x00, b""));
            bytes.extend(frame(0x80, b"lo"));

            let mut parser = parser();
            parser.parse(&bytes).unwrap();

            let events = parser.into_observer();
            assert_eq!(events.len(), 2);
            assert!(matches!(&events[0], Event::Ping(payload) if &payload[..] == b"ping"));

            let Event::Message(message) = &events[1] else {
                panic!("expected a message");
            };
            assert_eq!(message.opcode, OpCode::Text);
            assert_eq!(message.frame_count(), 3);
            assert_eq!(message.len(), 5);
            assert_eq!(message.as_text().as_deref(), Some("Hello"));
        }

        #[test]
        fn test_pending_message_is_visible() {
            let mut parser = parser();
            parser.parse(&frame(0x02, b"abc")).unwrap();
            assert_eq!(parser.pending_message().map(Message::len), Some(3));
            assert!(parser.observer().is_empty());

            parser.parse(&frame(0x80, b"d")).unwrap();
            assert!(parser.pending_message().is_none());
            assert_eq!(parser.observer().len(), 1);
        }

        #[test]
        fn test_extended_16_bit_length() {
            let payload = vec![b'x'; 300];
            let mut bytes = vec![0x82, 126, 0x01, 0x2C];
            bytes.extend_from_slice(&payload);

            let mut parser = parser();
            parser.parse(&bytes).unwrap();
            assert_eq!(
                message_text(&parser.observer()[0]),
                Some((OpCode::Binary, payload))
            );
        }

        #[test]
        fn test_extended_64_bit_length() {
            let payload = vec![7u8; 70_000];
            let mut bytes = vec![0x82, 127];
            bytes.extend_from_slice(&(payload.len() as u64).to_be_bytes());
            bytes.extend_from_slice(&payload);

            let mut parser = parser();
            parser.parse(&bytes).unwrap();
            assert_eq!(
                message_text(&parser.observer()[0]),
                Some((OpCode::Binary, payload))
            );
        }

        #[test]
        fn test_extended_length_consumes_exact_bytes() {
            // 126 followed by a 2 byte length of 1, then the payload and a second frame
            let mut bytes = vec![0x82, 126, 0x00, 0x01, 0xAB];
            bytes.extend(frame(0x81, b"next"));

            let mut parser = parser();
            parser.parse(&bytes).unwrap();

            let events = parser.observer();
            assert_eq!(events.len(), 2);
            assert_eq!(message_text(&events[0]), Some((OpCode::Binary, vec![0xAB])));
            assert_eq!(message_text(&events[1]), Some((OpCode::Text, b"next".to_vec())));
        }

        #[test]
        fn test_rsv1_with_extension() {
            let mut parser = Parser::with_extensions(
                ReservedBits::rsv1(),
                Vec::new(),
                Options::default(),
            );
            parser.parse(&frame(0xC1, b"deflated")).unwrap();

            let Event::Message(message) = &parser.observer()[0] else {
                panic!("expected a message");
            };
            assert!(message.rsv1);
        }
    }

    mod streaming_tests {
        use super::*;

        fn stream() -> Vec<u8> {
            let mut bytes = masked_frame(0x01, [1, 2, 3, 4], b"fragmented ");
            bytes.extend(frame(0x8A, b"pong"));
            bytes.extend(masked_frame(0x80, [9, 8, 7, 6], b"message"));
            let mut long = vec![0x82, 126, 0x00, 200];
            long.extend(std::iter::repeat(0x5A).take(200));
            bytes.extend(long);
            bytes.extend(frame(0x88, b"\x03\xE8done"));
            bytes
        }

        fn summarize(events: &[Event]) -> Vec<String> {
            events
                .iter()
                .map(|event| match event {
                    Event::Message(message) => {
                        format!("message {:?} {:?}", message.opcode, message.data())
                    }
                    Event::Close { code, reason } => format!("close {code} {reason:?}"),
                    Event::Ping(payload) => format!("ping {payload:?}"),
                    Event::Pong(payload) => format!("pong {payload:?}"),
                    Event::Error(err) => format!("error {err}"),
                })
                .collect()
        }

        #[test]
        fn test_byte_at_a_time_matches_single_call() {
            let bytes = stream();

            let mut whole = parser();
            whole.parse(&bytes).unwrap();

            let mut split = parser();
            for byte in &bytes {
                split.parse(std::slice::from_ref(byte)).unwrap();
            }

            assert_eq!(whole.observer().len(), 4);
            assert_eq!(summarize(whole.observer()), summarize(split.observer()));
        }

        #[test]
        fn test_every_two_way_split_matches_single_call() {
            let bytes = stream();

            let mut whole = parser();
            whole.parse(&bytes).unwrap();
            let expected = summarize(whole.observer());

            for at in 0..=bytes.len() {
                let mut split = parser();
                split.parse(&bytes[..at]).unwrap();
                split.parse(&bytes[at..]).unwrap();
                assert_eq!(summarize(split.observer()), expected, "split at {at}");
            }
        }

        #[test]
        fn test_uneven_chunks() {
            let bytes = stream();
            let mut parser = parser();

            let mut offset = 0;
            for size in [1, 3, 2, 7, 5, 11, 64, 1].iter().cycle() {
                if offset >= bytes.len() {
                    break;
                }
                let end = (offset + size).min(bytes.len());
                parser.parse_chunk(Chunk::from(&bytes[offset..end])).unwrap();
                offset = end;
            }

            assert_eq!(parser.observer().len(), 4);
            assert_eq!(parser.buffered(), 0);
        }

        #[test]
        fn test_partial_frame_is_buffered() {
            let mut parser = parser();
            parser.parse(&[0x81, 0x05, b'H', b'e']).unwrap();
            assert!(parser.observer().is_empty());
            assert!(parser.in_frame());
            assert_eq!(parser.buffered(), 2);

            parser.parse(b"llo").unwrap();
            assert_eq!(parser.observer().len(), 1);
            assert!(!parser.in_frame());
            assert_eq!(parser.buffered(), 0);
        }
    }

    mod control_tests {
        use super::*;

        fn close_event(bytes: &[u8], options: Options) -> (CloseCode, Vec<u8>) {
            let mut parser = Parser::new(Vec::new(), options);
            parser.parse(bytes).unwrap();
            match &parser.observer()[0] {
                Event::Close { code, reason } => (*code, reason.to_vec()),
                other => panic!("expected a close event, got {other:?}"),
            }
        }

        #[test]
        fn test_close_with_code() {
            let (code, reason) = close_event(&[0x88, 0x02, 0x03, 0xE8], Options::default());
            assert_eq!(code, CloseCode::Normal);
            assert!(reason.is_empty());
        }

        #[test]
        fn test_close_with_reason() {
            let (code, reason) = close_event(&frame(0x88, b"\x0F\xA0going"), Options::default());
            assert_eq!(u16::from(code), 4000);
            assert_eq!(reason, b"going");
        }

        #[test]
        fn test_empty_close_is_normal() {
            let (code, reason) = close_event(&[0x88, 0x00], Options::default());
            assert_eq!(code, CloseCode::Normal);
            assert!(reason.is_empty());
        }

        #[test]
        fn test_invalid_close_codes_become_protocol_errors() {
            for code in [0u16, 999, 1004, 1005, 1006, 1015, 2000, 5000] {
                let mut payload = code.to_be_bytes().to_vec();
                payload.extend_from_slice(b"why");
                let (reported, reason) = close_event(&frame(0x88, &payload), Options::default());
                assert_eq!(reported, CloseCode::Protocol, "code {code}");
                assert_eq!(reason, b"why");
            }
        }

        #[test]
        fn test_one_byte_close_is_protocol_error() {
            let (code, reason) = close_event(&[0x88, 0x01, 0x03], Options::default());
            assert_eq!(code, CloseCode::Protocol);
            assert!(reason.is_empty());
        }

        #[test]
        fn test_close_reason_utf8() {
            let bytes = frame(0x88, b"\x03\xE8\xFF\xFE");

            let (code, _) = close_event(&bytes, Options::default());
            assert_eq!(code, CloseCode::Normal);

            let (code, reason) = close_event(&bytes, Options::default().with_utf8());
            assert_eq!(code, CloseCode::Protocol);
            assert_eq!(reason, b"\xFF\xFE");
        }

        #[test]
        fn test_ping_and_pong() {
            let mut bytes = frame(0x89, b"hi");
            bytes.extend(frame(0x8A, b""));

            let mut parser = parser();
            parser.parse(&bytes).unwrap();

            let events = parser.observer();
            assert!(matches!(&events[0], Event::Ping(payload) if &payload[..] == b"hi"));
            assert!(matches!(&events[1], Event::Pong(payload) if payload.is_empty()));
        }

        #[test]
        fn test_close_does_not_halt() {
            let mut bytes = frame(0x88, b"\x03\xE8");
            bytes.extend(frame(0x81, b"after"));

            let mut parser = parser();
            parser.parse(&bytes).unwrap();
            assert_eq!(parser.observer().len(), 2);
            assert!(!parser.is_halted());
        }
    }

    mod error_tests {
        use super::*;

        fn single_error(parser: &mut Parser<Vec<Event>>, bytes: &[u8]) -> WebSocketError {
            let err = parser.parse(bytes).expect_err("parse should fail");
            assert!(parser.is_halted());

            let errors: Vec<_> = parser.observer().iter().filter_map(error_code).collect();
            assert_eq!(errors, vec![err.code()]);
            err
        }

        #[test]
        fn test_unexpected_continuation() {
            let mut parser = parser();
            let err = single_error(&mut parser, &[0x80, 0x00]);
            assert!(matches!(err, WebSocketError::InvalidContinuationFrame));
            assert_eq!(err.code(), CloseCode::Protocol);
        }

        #[test]
        fn test_reserved_bits() {
            let mut parser = parser();
            let err = single_error(&mut parser, &frame(0xC1, b"x"));
            assert!(matches!(
                err,
                WebSocketError::ReservedBitsNotZero {
                    rsv1: true,
                    rsv2: false,
                    rsv3: false
                }
            ));
            assert_eq!(err.code(), CloseCode::Protocol);
        }

        #[test]
        fn test_reserved_bits_checked_before_opcode() {
            let mut parser = parser();
            let err = single_error(&mut parser, &[0xA3, 0x00]);
            assert!(matches!(err, WebSocketError::ReservedBitsNotZero { .. }));
        }

        #[test]
        fn test_unknown_opcodes() {
            for opcode in [3u8, 4, 5, 6, 7, 0xB, 0xC, 0xD, 0xE, 0xF] {
                let mut parser = parser();
                let err = single_error(&mut parser, &[0x80 | opcode, 0x00]);
                assert!(matches!(err, WebSocketError::InvalidOpCode(op) if op == opcode));
            }
        }

        #[test]
        fn test_fragmented_control_frame() {
            let mut parser = parser();
            let err = single_error(&mut parser, &[0x09, 0x00]);
            assert!(matches!(err, WebSocketError::ControlFrameFragmented(9)));
        }

        #[test]
        fn test_new_message_while_fragment_pending() {
            let mut bytes = frame(0x01, b"part");
            bytes.extend(frame(0x82, b"new"));

            let mut parser = parser();
            let err = single_error(&mut parser, &bytes);
            assert!(matches!(err, WebSocketError::InvalidFragment));
            assert!(parser.pending_message().is_none());
        }

        #[test]
        fn test_unmasked_frame_when_masking_required() {
            let mut parser = Parser::new(Vec::new(), Options::default().with_require_masking());
            let err = single_error(&mut parser, &frame(0x81, b"Hello"));
            assert!(matches!(err, WebSocketError::UnmaskedFrame));
            assert_eq!(err.code(), CloseCode::Unsupported);
        }

        #[test]
        fn test_control_frame_too_long() {
            let mut parser = parser();
            let err = single_error(&mut parser, &[0x89, 126, 0x00, 126]);
            assert!(matches!(err, WebSocketError::ControlFrameTooLarge(126)));
        }

        #[test]
        fn test_single_frame_too_large() {
            let mut bytes = vec![0x82, 127];
            bytes.extend_from_slice(&0x4000000u64.to_be_bytes());

            let mut parser = parser();
            let err = single_error(&mut parser, &bytes);
            assert!(matches!(err, WebSocketError::MessageTooLarge));
            assert_eq!(err.code(), CloseCode::Size);
        }

        #[test]
        fn test_huge_64_bit_length_does_not_overflow() {
            let mut bytes = frame(0x01, b"abc");
            bytes.extend_from_slice(&[0x80, 127]);
            bytes.extend_from_slice(&u64::MAX.to_be_bytes());

            let mut parser = parser();
            let err = single_error(&mut parser, &bytes);
            assert!(matches!(err, WebSocketError::MessageTooLarge));
        }

        #[test]
        fn test_combined_fragments_too_large() {
            let options = Options::default().with_max_message_length(8);
            let mut parser = Parser::new(Vec::new(), options);

            parser.parse(&frame(0x01, b"12345")).unwrap();
            let err = single_error(&mut parser, &frame(0x80, b"6789"));
            assert!(matches!(err, WebSocketError::MessageTooLarge));
            assert!(!parser
                .observer()
                .iter()
                .any(|event| matches!(event, Event::Message(_))));
        }

        #[test]
        fn test_limit_is_inclusive() {
            let options = Options::default().with_max_message_length(8);
            let mut parser = Parser::new(Vec::new(), options);

            parser.parse(&frame(0x01, b"12345")).unwrap();
            parser.parse(&frame(0x80, b"678")).unwrap();
            assert_eq!(
                message_text(&parser.observer()[0]),
                Some((OpCode::Text, b"12345678".to_vec()))
            );
        }

        #[test]
        fn test_invalid_utf8_text() {
            let bytes = frame(0x81, &[0xC3, 0x28]);

            let mut lenient = parser();
            lenient.parse(&bytes).unwrap();
            assert!(message_text(&lenient.observer()[0]).is_some());

            let mut strict = Parser::new(Vec::new(), Options::default().with_utf8());
            let err = single_error(&mut strict, &bytes);
            assert!(matches!(err, WebSocketError::InvalidUTF8));
            assert_eq!(err.code(), CloseCode::Invalid);
        }

        #[test]
        fn test_read_buffer_full() {
            let options = Options::default().with_max_buffer_capacity(4);
            let mut parser = Parser::new(Vec::new(), options);

            // the header is consumed, the payload bytes stay buffered
            parser.parse(&[0x82, 0x10]).unwrap();
            assert_eq!(parser.buffered(), 0);
            parser.parse(&[1, 2, 3, 4]).unwrap();
            assert_eq!(parser.buffered(), 4);

            let err = single_error(&mut parser, &[5]);
            assert!(matches!(err, WebSocketError::ReadBufferFull(1)));
            assert_eq!(err.code(), CloseCode::Error);
        }

        #[test]
        fn test_errors_are_sticky() {
            let mut parser = parser();
            let first = single_error(&mut parser, &[0x80, 0x00]);

            // valid input after the error is ignored
            let again = parser.parse(&frame(0x81, b"Hello")).expect_err("still halted");
            assert_eq!(again.to_string(), first.to_string());
            assert_eq!(parser.observer().len(), 1);
            assert_eq!(parser.buffered(), 0);
            assert!(parser.error().is_some());
        }

        #[test]
        fn test_events_before_error_are_delivered() {
            let mut bytes = frame(0x81, b"ok");
            bytes.extend_from_slice(&[0x80, 0x00]);
            bytes.extend(frame(0x81, b"never"));

            let mut parser = parser();
            assert!(parser.parse(&bytes).is_err());

            let events = parser.observer();
            assert_eq!(events.len(), 2);
            assert_eq!(message_text(&events[0]), Some((OpCode::Text, b"ok".to_vec())));
            assert_eq!(error_code(&events[1]), Some(CloseCode::Protocol));
        }
    }
}
