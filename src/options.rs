//! Parser configuration.
use crate::{message::MAX_MESSAGE_LENGTH, stream_reader::MAX_READ_BUFFER};

/// The role the endpoint is taking.
///
/// Clients mask every frame they send and accept unmasked frames; servers
/// require masked frames and send unmasked ones.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Server => write!(f, "server"),
            Self::Client => write!(f, "client"),
        }
    }
}

/// Configuration for a [`Parser`](crate::parser::Parser).
///
/// ```rust
/// use wsdriver::options::Options;
///
/// let options = Options::default()
///     .with_require_masking()
///     .with_max_message_length(1024 * 1024)
///     .with_utf8();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Reject unmasked frames with [`CloseCode::Unsupported`](crate::close::CloseCode::Unsupported).
    pub require_masking: bool,
    /// Largest accepted message, summed over all of its frames.
    pub max_message_length: u64,
    /// Largest number of unread bytes the parser buffers between calls.
    pub max_buffer_capacity: usize,
    /// Validate Text messages and close reasons as UTF-8.
    pub utf8: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            require_masking: false,
            max_message_length: MAX_MESSAGE_LENGTH,
            max_buffer_capacity: MAX_READ_BUFFER,
            utf8: false,
        }
    }
}

impl Options {
    /// Defaults for the given role: servers require masked frames.
    pub fn for_role(role: Role) -> Self {
        Self {
            require_masking: role == Role::Server,
            ..Default::default()
        }
    }

    pub fn with_require_masking(self) -> Self {
        Self {
            require_masking: true,
            ..self
        }
    }

    pub fn with_max_message_length(self, max_message_length: u64) -> Self {
        Self {
            max_message_length,
            ..self
        }
    }

    pub fn with_max_buffer_capacity(self, max_buffer_capacity: usize) -> Self {
        Self {
            max_buffer_capacity,
            ..self
        }
    }

    /// Enables UTF-8 validation of Text messages and close reasons.
    ///
    /// An invalid Text message halts the parser with an encoding error; an
    /// invalid close reason turns the reported close code into a protocol error.
    pub fn with_utf8(self) -> Self {
        Self { utf8: true, ..self }
    }
}
