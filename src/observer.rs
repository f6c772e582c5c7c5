//! # Observer
//!
//! The parser reports everything it decodes through an [`Observer`]. Each
//! callback has a default implementation that drops the event, so an observer
//! only implements the events it cares about.
//!
//! Callbacks run synchronously inside [`Parser::parse`](crate::parser::Parser::parse),
//! in the order the events appear on the wire.
//!
//! For callers that prefer owned values over callbacks, `Vec<Event>` and
//! `VecDeque<Event>` are observers that record every callback as an [`Event`].
//!
//! ```rust
//! use wsdriver::{observer::Event, options::Options, parser::Parser};
//!
//! let mut parser = Parser::new(Vec::new(), Options::default());
//! parser.parse(&[0x81, 0x05, b'H', b'e', b'l', b'l', b'o']).unwrap();
//!
//! match &parser.observer()[0] {
//!     Event::Message(message) => assert_eq!(&message.data()[..], b"Hello"),
//!     _ => unreachable!(),
//! }
//! ```
use std::collections::VecDeque;

use bytes::Bytes;

use crate::{chunk::Chunk, close::CloseCode, message::Message, WebSocketError};

/// Receives the events produced by the parser.
pub trait Observer {
    /// The parser hit a protocol error and halted. Called at most once per parser.
    fn on_error(&mut self, _error: &WebSocketError) {}

    /// A complete data message arrived.
    fn on_message(&mut self, _message: Message) {}

    /// A Close frame arrived.
    ///
    /// `code` is already normalized: a missing or invalid status code is reported
    /// as [`CloseCode::Protocol`], an empty Close frame as [`CloseCode::Normal`].
    /// `reason` borrows from the frame payload and is only valid during the call.
    fn on_close(&mut self, _code: CloseCode, _reason: &[u8]) {}

    /// A Ping frame arrived carrying `payload`.
    fn on_ping(&mut self, _payload: Chunk) {}

    /// A Pong frame arrived carrying `payload`.
    fn on_pong(&mut self, _payload: Chunk) {}
}

/// Drops every event.
impl Observer for () {}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn on_error(&mut self, error: &WebSocketError) {
        (**self).on_error(error)
    }

    fn on_message(&mut self, message: Message) {
        (**self).on_message(message)
    }

    fn on_close(&mut self, code: CloseCode, reason: &[u8]) {
        (**self).on_close(code, reason)
    }

    fn on_ping(&mut self, payload: Chunk) {
        (**self).on_ping(payload)
    }

    fn on_pong(&mut self, payload: Chunk) {
        (**self).on_pong(payload)
    }
}

/// An owned record of one observer callback.
#[derive(Debug, Clone)]
pub enum Event {
    Message(Message),
    Close { code: CloseCode, reason: Bytes },
    Ping(Bytes),
    Pong(Bytes),
    Error(WebSocketError),
}

impl Event {
    fn close(code: CloseCode, reason: &[u8]) -> Self {
        Event::Close {
            code,
            reason: Bytes::copy_from_slice(reason),
        }
    }
}

impl Observer for Vec<Event> {
    fn on_error(&mut self, error: &WebSocketError) {
        self.push(Event::Error(error.clone()));
    }

    fn on_message(&mut self, message: Message) {
        self.push(Event::Message(message));
    }

    fn on_close(&mut self, code: CloseCode, reason: &[u8]) {
        self.push(Event::close(code, reason));
    }

    fn on_ping(&mut self, payload: Chunk) {
        self.push(Event::Ping(payload.into_bytes()));
    }

    fn on_pong(&mut self, payload: Chunk) {
        self.push(Event::Pong(payload.into_bytes()));
    }
}

impl Observer for VecDeque<Event> {
    fn on_error(&mut self, error: &WebSocketError) {
        self.push_back(Event::Error(error.clone()));
    }

    fn on_message(&mut self, message: Message) {
        self.push_back(Event::Message(message));
    }

    fn on_close(&mut self, code: CloseCode, reason: &[u8]) {
        self.push_back(Event::close(code, reason));
    }

    fn on_ping(&mut self, payload: Chunk) {
        self.push_back(Event::Ping(payload.into_bytes()));
    }

    fn on_pong(&mut self, payload: Chunk) {
        self.push_back(Event::Pong(payload.into_bytes()));
    }
}
