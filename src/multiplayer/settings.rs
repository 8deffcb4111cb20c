//! Lobby format enums and the small free-text sub-parsers the lobby
//! model leans on: the "Changed match settings to" response and the
//! three beatmap notification shapes.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

/// Team mode of a lobby.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LobbyFormat {
    /// Free-for-all.
    #[default]
    HeadToHead,
    /// Tag co-op.
    TagCoop,
    /// Red vs blue.
    TeamVs,
    /// Tag team vs.
    TagTeamVs,
}

impl LobbyFormat {
    /// Whether this format carries team assignments.
    pub fn is_team_based(self) -> bool {
        matches!(self, LobbyFormat::TeamVs | LobbyFormat::TagTeamVs)
    }

    /// Numeric argument `!mp set` expects.
    pub fn code(self) -> u8 {
        match self {
            LobbyFormat::HeadToHead => 0,
            LobbyFormat::TagCoop => 1,
            LobbyFormat::TeamVs => 2,
            LobbyFormat::TagTeamVs => 3,
        }
    }
}

impl FromStr for LobbyFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "HeadToHead" => Ok(LobbyFormat::HeadToHead),
            "TagCoop" => Ok(LobbyFormat::TagCoop),
            "TeamVs" => Ok(LobbyFormat::TeamVs),
            "TagTeamVs" => Ok(LobbyFormat::TagTeamVs),
            _ => Err(()),
        }
    }
}

impl fmt::Display for LobbyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LobbyFormat::HeadToHead => "HeadToHead",
            LobbyFormat::TagCoop => "TagCoop",
            LobbyFormat::TeamVs => "TeamVs",
            LobbyFormat::TagTeamVs => "TagTeamVs",
        })
    }
}

/// Scoring rule of a lobby.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WinCondition {
    /// Classic score.
    #[default]
    Score,
    /// ScoreV2.
    ScoreV2,
    /// Accuracy.
    Accuracy,
    /// Max combo.
    Combo,
}

impl WinCondition {
    /// Numeric argument `!mp set` expects.
    pub fn code(self) -> u8 {
        match self {
            WinCondition::Score => 0,
            WinCondition::Accuracy => 1,
            WinCondition::Combo => 2,
            WinCondition::ScoreV2 => 3,
        }
    }
}

impl FromStr for WinCondition {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "Score" => Ok(WinCondition::Score),
            "ScoreV2" => Ok(WinCondition::ScoreV2),
            "Accuracy" => Ok(WinCondition::Accuracy),
            "Combo" => Ok(WinCondition::Combo),
            _ => Err(()),
        }
    }
}

impl fmt::Display for WinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WinCondition::Score => "Score",
            WinCondition::ScoreV2 => "ScoreV2",
            WinCondition::Accuracy => "Accuracy",
            WinCondition::Combo => "Combo",
        })
    }
}

/// Game mode of a lobby, spelled the way the bot prints it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GameMode {
    /// osu!standard.
    #[default]
    Standard,
    /// osu!taiko.
    Taiko,
    /// osu!catch.
    Catch,
    /// osu!mania.
    Mania,
}

impl GameMode {
    /// Numeric argument `!mp map` expects.
    pub fn code(self) -> u8 {
        match self {
            GameMode::Standard => 0,
            GameMode::Taiko => 1,
            GameMode::Catch => 2,
            GameMode::Mania => 3,
        }
    }
}

impl FromStr for GameMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "Osu" => Ok(GameMode::Standard),
            "Taiko" => Ok(GameMode::Taiko),
            "CatchTheBeat" => Ok(GameMode::Catch),
            "OsuMania" => Ok(GameMode::Mania),
            _ => Err(()),
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GameMode::Standard => "Osu",
            GameMode::Taiko => "Taiko",
            GameMode::Catch => "CatchTheBeat",
            GameMode::Mania => "OsuMania",
        })
    }
}

/// What a "Changed match settings to" response carried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchSettings {
    /// Slot count, present only in the three-token shape.
    pub size: Option<u32>,
    /// Team mode, always present.
    pub format: LobbyFormat,
    /// Win condition, present in the two- and three-token shapes.
    pub win_condition: Option<WinCondition>,
}

const SETTINGS_PREFIX: &str = "Changed match settings to ";

/// Parse the one-line response to a settings change.
///
/// The tail is 1 to 3 comma-separated tokens whose arity fixes the
/// meaning: format; format, win condition; "N slots", format, win
/// condition. Anything else is logged and yields `None`; this path must
/// never take down the read loop.
pub fn parse_settings_response(content: &str) -> Option<MatchSettings> {
    let tail = content.strip_prefix(SETTINGS_PREFIX)?;
    let tokens: Vec<&str> = tail.split(", ").collect();
    let parsed = match tokens.as_slice() {
        [format] => format.parse().ok().map(|format| MatchSettings {
            size: None,
            format,
            win_condition: None,
        }),
        [format, win] => match (format.parse(), win.parse()) {
            (Ok(format), Ok(win)) => Some(MatchSettings {
                size: None,
                format,
                win_condition: Some(win),
            }),
            _ => None,
        },
        [slots, format, win] => {
            let size = slots.strip_suffix(" slots").and_then(|n| n.parse().ok());
            match (size, format.parse(), win.parse()) {
                (Some(size), Ok(format), Ok(win)) => Some(MatchSettings {
                    size: Some(size),
                    format,
                    win_condition: Some(win),
                }),
                _ => None,
            }
        }
        _ => None,
    };
    if parsed.is_none() {
        warn!(content, "unrecognized settings response");
    }
    parsed
}

/// The beatmap as far as chat notifications describe it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeatmapShell {
    /// Beatmap id, taken from the URL digits.
    pub id: Option<u32>,
    /// Artist.
    pub artist: String,
    /// Title.
    pub title: String,
    /// Difficulty name. Absent in the URL-first notification shapes.
    pub difficulty: Option<String>,
}

fn id_from_url(url: &str) -> Option<u32> {
    url.rsplit('/').next()?.parse().ok()
}

fn split_artist_title(text: &str) -> (String, String) {
    match text.split_once(" - ") {
        Some((artist, title)) => (artist.trim().to_owned(), title.trim().to_owned()),
        None => (String::new(), text.trim().to_owned()),
    }
}

impl BeatmapShell {
    /// Parse `Artist - Title [Difficulty] (url)`, the tail of a
    /// host-initiated map change.
    pub fn from_full(tail: &str) -> Option<BeatmapShell> {
        let (body, url) = tail.rsplit_once(" (")?;
        let url = url.strip_suffix(')')?;
        let (body, difficulty) = match body.rsplit_once(" [") {
            Some((body, diff)) => (body, diff.strip_suffix(']').map(str::to_owned)),
            None => (body, None),
        };
        let (artist, title) = split_artist_title(body);
        Some(BeatmapShell {
            id: id_from_url(url),
            artist,
            title,
            difficulty,
        })
    }

    /// Parse `<url> Artist - Title`, the tail of a command-initiated map
    /// change or a settings dump. No difficulty is reported.
    pub fn from_url_first(tail: &str) -> Option<BeatmapShell> {
        let (url, body) = tail.split_once(' ')?;
        let (artist, title) = split_artist_title(body);
        Some(BeatmapShell {
            id: id_from_url(url),
            artist,
            title,
            difficulty: None,
        })
    }
}
