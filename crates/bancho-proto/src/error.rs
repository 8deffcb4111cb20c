//! Error types for the Bancho protocol library.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 decoding error.
    #[error("decode error: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// Message exceeded maximum allowed length.
    #[error("message too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Actual message length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// Failed to parse an IRC message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The invalid message string.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

/// Errors encountered when parsing IRC messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Message was empty or contained only whitespace.
    #[error("empty message")]
    EmptyMessage,

    /// The tags section was not followed by a command.
    #[error("unterminated tags section")]
    UnterminatedTags,

    /// The prefix was not followed by a command.
    #[error("unterminated prefix")]
    UnterminatedPrefix,

    /// A message that is not a PRIVMSG was given to the private-message
    /// classifier, or a PRIVMSG was missing its target or content.
    #[error("not a private message: {0}")]
    NotPrivateMessage(String),
}
