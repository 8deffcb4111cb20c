//! Private (chat/whisper) message classification.
//!
//! Bancho delivers both channel chatter and whispers as `PRIVMSG`. This
//! module wraps a parsed [`Message`] into a richer form carrying sender,
//! recipient, content and directionality.

use crate::error::{MessageParseError, ProtocolError};
use crate::message::Message;

/// The reserved identity of the Bancho automation bot. The server
/// guarantees the casing, so the comparison is exact.
pub const BANCHO_BOT: &str = "BanchoBot";

/// Host suffix Bancho attaches to every user prefix.
const HOST_SUFFIX: &str = "!cho@ppy.sh";

/// A classified `PRIVMSG`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivateMessage {
    /// The underlying parsed message.
    pub message: Message,
    /// Nickname of the sender, extracted from the prefix.
    pub sender: String,
    /// The first parameter: a channel name or the local user's name.
    pub recipient: String,
    /// Message body, with the leading-colon escape undone.
    pub content: String,
    /// True when this is a whisper addressed to the local user rather than
    /// channel traffic.
    pub is_direct: bool,
}

impl PrivateMessage {
    /// Classify a parsed `PRIVMSG`.
    ///
    /// `local_username` is the name the session authenticated as; it
    /// decides [`PrivateMessage::is_direct`].
    pub fn from_message(
        message: Message,
        local_username: &str,
    ) -> Result<PrivateMessage, ProtocolError> {
        if message.command != "PRIVMSG" {
            return Err(not_private(&message, "command is not PRIVMSG"));
        }
        if message.params.len() < 2 {
            return Err(not_private(&message, "missing recipient or content"));
        }

        let sender = message
            .source_nickname()
            .ok_or_else(|| not_private(&message, "missing prefix"))?
            .to_owned();
        let recipient = message.params[0].clone();
        let content = unescape_content(&message.params[1]);
        let is_direct =
            !recipient.starts_with('#') && recipient.eq_ignore_ascii_case(local_username);

        Ok(PrivateMessage {
            message,
            sender,
            recipient,
            content,
            is_direct,
        })
    }

    /// Parse a raw line and classify it in one step.
    pub fn parse(raw: &str, local_username: &str) -> Result<PrivateMessage, ProtocolError> {
        Self::from_message(Message::parse(raw)?, local_username)
    }

    /// Synthesize a private message as if `sender` had sent `content` to
    /// `recipient`, for display or test purposes.
    ///
    /// A leading colon in `content` is escaped with a second colon; the
    /// server otherwise swallows it. [`PrivateMessage::content`] reverses
    /// the escape.
    pub fn from_parameters(
        sender: &str,
        recipient: &str,
        content: &str,
        local_username: &str,
    ) -> PrivateMessage {
        let escaped = if content.starts_with(':') {
            format!(":{content}")
        } else {
            content.to_owned()
        };
        let message = Message::parse(&format!(
            ":{sender}{HOST_SUFFIX} PRIVMSG {recipient} :{escaped}"
        ))
        .expect("synthesized PRIVMSG is well formed");
        Self::from_message(message, local_username)
            .expect("synthesized PRIVMSG classifies")
    }

    /// Whether the sender is the Bancho automation bot.
    pub fn is_banchobot(&self) -> bool {
        self.sender == BANCHO_BOT
    }
}

fn unescape_content(raw: &str) -> String {
    match raw.strip_prefix(':') {
        Some(rest) => rest.to_owned(),
        None => raw.to_owned(),
    }
}

fn not_private(message: &Message, detail: &str) -> ProtocolError {
    ProtocolError::InvalidMessage {
        string: message.raw.clone(),
        cause: MessageParseError::NotPrivateMessage(detail.to_owned()),
    }
}
