//! Multiplayer lobby model: players, mods, formats, and the free-text
//! notification catalog.

mod lobby;
mod mods;
mod player;
mod settings;

pub use self::lobby::MultiplayerLobby;
pub use self::mods::Mods;
pub use self::player::{MultiplayerPlayer, PlayerState, ScoreReport, TeamColor};
pub use self::settings::{
    parse_settings_response, BeatmapShell, GameMode, LobbyFormat, MatchSettings, WinCondition,
};
