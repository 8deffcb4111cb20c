//! Error hierarchy for the Bancho client.

use bancho_proto::ProtocolError;
use thiserror::Error;

/// Convenience type alias for Results using [`BanchoError`].
pub type Result<T, E = BanchoError> = std::result::Result<T, E>;

/// Errors surfaced by the client.
///
/// Notification-interpretation failures never appear here: malformed
/// BanchoBot text is logged at warning level and dropped so a single bad
/// line can never take down the read loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BanchoError {
    /// A send was attempted while the transport was closed.
    #[error("client is not connected")]
    NotConnected,

    /// A non-handshake send was attempted before authentication completed.
    #[error("client is not authenticated")]
    NotAuthenticated,

    /// The server rejected the credentials. Fatal: the session is over.
    #[error("authentication rejected by server")]
    Authentication,

    /// The transport could not be opened.
    #[error("connection failed: {0}")]
    Connection(#[source] std::io::Error),

    /// A wire-level protocol error while reading or writing.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
