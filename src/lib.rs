//! # bancho-client
//!
//! A client library for osu!Bancho's IRC-derived chat and multiplayer
//! protocol: connection handshake and session state, channel registry,
//! rate-limited sends, and a multiplayer lobby model that reconstructs
//! structured state from BanchoBot's free-text notifications.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use bancho_client::{BanchoClient, BanchoClientConfig, Event, IrcCredentials};
//!
//! # async fn example() -> bancho_client::Result<()> {
//! let config = BanchoClientConfig::new(IrcCredentials::new("Stage", "irc-token"));
//! let client = BanchoClient::new(config);
//! let mut events = client.subscribe();
//!
//! client.connect().await?;
//! let driver = {
//!     let client = client.clone();
//!     tokio::spawn(async move { client.run().await })
//! };
//!
//! while let Ok(event) = events.recv().await {
//!     if let Event::Authenticated = event {
//!         client.join("#osu").await?;
//!         break;
//!     }
//! }
//! # driver.abort();
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod banchobot;
pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod multiplayer;
pub mod ratelimit;
pub mod transport;

pub use self::channel::{Channel, ChannelKind, ChannelRegistry};
pub use self::client::{BanchoClient, LobbyHandle};
pub use self::config::{BanchoClientConfig, IrcCredentials, RateLimit};
pub use self::error::{BanchoError, Result};
pub use self::events::{Event, LobbyEvent};
pub use self::multiplayer::{
    BeatmapShell, GameMode, LobbyFormat, Mods, MultiplayerLobby, MultiplayerPlayer, PlayerState,
    TeamColor, WinCondition,
};

pub use bancho_proto::{Message, PrivateMessage, SlashCommand, BANCHO_BOT};
