//! # bancho-proto
//!
//! Parsing and encoding for the osu!Bancho dialect of the IRC message
//! protocol.
//!
//! ## Quick start
//!
//! ```rust
//! use bancho_proto::{Message, PrivateMessage};
//!
//! let msg: Message = ":cho.ppy.sh 001 Stage :Welcome to the osu!Bancho."
//!     .parse()
//!     .unwrap();
//! assert_eq!(msg.command, "001");
//!
//! let pm = PrivateMessage::parse(
//!     ":BanchoBot!cho@ppy.sh PRIVMSG Stage :Good luck!",
//!     "Stage",
//! )
//! .unwrap();
//! assert!(pm.is_banchobot());
//! assert!(pm.is_direct);
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;
pub mod privmsg;
pub mod slash;

pub use self::error::{MessageParseError, ProtocolError};
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
pub use self::message::{Message, Tag};
pub use self::privmsg::{PrivateMessage, BANCHO_BOT};
pub use self::slash::SlashCommand;
