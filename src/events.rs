//! Typed events published on the client's broadcast bus.
//!
//! Dispatch order matches wire order: every event is raised from the
//! single read loop (or synchronously from the command method that
//! caused it), never from a background task.

use bancho_proto::{Message, PrivateMessage};

use crate::multiplayer::{BeatmapShell, GameMode, LobbyFormat, Mods, TeamColor, WinCondition};

/// Client-level events.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Event {
    /// Transport opened and handshake sent.
    Connected,
    /// Transport closed.
    Disconnected,
    /// Reply 001: credentials accepted.
    Authenticated,
    /// Reply 464: credentials rejected. The session is over.
    AuthenticationFailed,
    /// Any inbound message that survived the ignore filter.
    Message(Message),
    /// Inbound PRIVMSG.
    PrivateMessage(PrivateMessage),
    /// Inbound PRIVMSG addressed to us rather than a channel.
    DirectMessage(PrivateMessage),
    /// Outbound line, with the password redacted.
    Sent(String),
    /// Inbound PING (answered automatically).
    PingReceived,
    /// A channel was added to the registry.
    ChannelJoined(String),
    /// A channel was removed from the registry.
    ChannelParted(String),
    /// Reply 403: the named channel could not be joined.
    ChannelJoinFailure(String),
    /// A query conversation was opened with the named user.
    UserQueried(String),
    /// BanchoBot confirmed a tournament lobby creation.
    LobbyCreated {
        /// The lobby's channel name, `#mp_<id>`.
        channel: String,
        /// Numeric lobby id.
        id: u64,
        /// Display name.
        name: String,
    },
    /// An event scoped to one multiplayer lobby.
    Lobby {
        /// The lobby's channel name.
        channel: String,
        /// What happened.
        event: LobbyEvent,
    },
}

/// Events raised by a multiplayer lobby.
///
/// Every mutation of externally observable lobby state also raises
/// [`LobbyEvent::StateChanged`] after its specific event.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum LobbyEvent {
    /// A settings dump finished replaying.
    SettingsUpdated,
    /// The room was renamed.
    NameChanged(String),
    /// The team mode changed.
    FormatChanged {
        /// Previous format.
        previous: LobbyFormat,
        /// New format.
        current: LobbyFormat,
    },
    /// The win condition changed.
    WinConditionChanged {
        /// Previous win condition.
        previous: WinCondition,
        /// New win condition.
        current: WinCondition,
    },
    /// The game mode changed.
    GameModeChanged {
        /// Previous mode.
        previous: GameMode,
        /// New mode.
        current: GameMode,
    },
    /// The host opened the song selection screen.
    HostChangingMap,
    /// The beatmap changed.
    BeatmapChanged(BeatmapShell),
    /// A player joined.
    PlayerJoined(String),
    /// A player left.
    PlayerDisconnected(String),
    /// A player was banned.
    PlayerBanned(String),
    /// A player was kicked by us.
    PlayerKicked(String),
    /// A player moved slots.
    SlotMove {
        /// Player name.
        player: String,
        /// Previous slot.
        previous: u32,
        /// New slot.
        current: u32,
    },
    /// A player changed teams.
    TeamChanged {
        /// Player name.
        player: String,
        /// Previous team.
        previous: TeamColor,
        /// New team.
        current: TeamColor,
    },
    /// The host changed. `None` after an optimistic `clear_host`.
    HostChanged(Option<String>),
    /// The host was cleared by the bot.
    HostCleared,
    /// The room mods changed.
    ModsChanged(Mods),
    /// The match started.
    MatchStarted,
    /// The match finished.
    MatchFinished,
    /// The match was aborted.
    MatchAborted,
    /// Every player reported ready.
    AllPlayersReady,
    /// A player finished the current map.
    PlayerFinished {
        /// Player name.
        name: String,
        /// Final score.
        score: i64,
        /// Pass or fail.
        passed: bool,
    },
    /// The slot count changed.
    SizeChanged(u32),
    /// A lobby countdown timer was started.
    LobbyTimerStarted(u32),
    /// A match start timer was started.
    MatchStartTimerStarted(u32),
    /// A running timer was aborted.
    TimerAborted,
    /// The lobby was locked.
    Locked,
    /// The lobby was unlocked.
    Unlocked,
    /// The lobby was closed. Terminal.
    Closed,
    /// Generic notification accompanying every observable mutation.
    StateChanged,
}
