//! Per-lobby player state.

use chrono::{DateTime, Utc};

use super::mods::Mods;

/// Team assignment inside a team-based lobby.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TeamColor {
    /// Red team.
    Red,
    /// Blue team.
    Blue,
    /// No team (non-team formats, or not yet reported).
    #[default]
    None,
}

impl TeamColor {
    /// Parse the lowercase team word used in join notifications.
    pub fn from_word(word: &str) -> Option<TeamColor> {
        match word {
            "red" => Some(TeamColor::Red),
            "blue" => Some(TeamColor::Blue),
            _ => None,
        }
    }
}

/// Readiness as reported by slot reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayerState {
    /// Present but not ready.
    #[default]
    NotReady,
    /// Ready to start.
    Ready,
    /// Missing the current beatmap.
    NoMap,
    /// The slot report carried a state token we do not recognize.
    Undefined,
}

impl PlayerState {
    /// Parse the state token that precedes the profile URL in a slot
    /// report.
    pub fn from_token(token: &str) -> PlayerState {
        match token {
            "Not Ready" => PlayerState::NotReady,
            "Ready" => PlayerState::Ready,
            "No Map" => PlayerState::NoMap,
            _ => PlayerState::Undefined,
        }
    }
}

/// One score report for a finished map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreReport {
    /// Final score.
    pub score: i64,
    /// Whether the player passed the map.
    pub passed: bool,
    /// When the report was observed.
    pub timestamp: DateTime<Utc>,
}

/// A player in a multiplayer lobby.
///
/// Owned exclusively by one lobby; the back-reference is the lobby's
/// numeric id, never a second owner.
#[derive(Clone, Debug)]
pub struct MultiplayerPlayer {
    /// Numeric user id, known only after a slot report.
    pub id: Option<u32>,
    /// Username. Immutable after construction.
    name: String,
    /// Team assignment.
    pub team: TeamColor,
    /// Slot number (1-16).
    pub slot: u32,
    /// Personal mods (meaningful under Freemod, otherwise mirrors the
    /// room mods).
    pub mods: Mods,
    /// Readiness.
    pub state: PlayerState,
    /// Most recent score.
    pub score: Option<i64>,
    /// Most recent pass/fail flag.
    pub passed: Option<bool>,
    /// Every observed score, oldest first.
    pub score_history: Vec<ScoreReport>,
    /// Id of the owning lobby (non-owning association).
    pub lobby_id: u64,
}

impl MultiplayerPlayer {
    /// Create a player in the given slot.
    pub fn new(lobby_id: u64, name: impl Into<String>, slot: u32, team: TeamColor) -> Self {
        Self {
            id: None,
            name: name.into(),
            team,
            slot,
            mods: Mods::NONE,
            state: PlayerState::default(),
            score: None,
            passed: None,
            score_history: Vec::new(),
            lobby_id,
        }
    }

    /// The player's username.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive name comparison; player identity is the name.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// The form of the name usable as a command target: `#<id>` once the
    /// numeric id is known, otherwise the name with spaces underscored.
    pub fn targetable_name(&self) -> String {
        match self.id {
            Some(id) => format!("#{id}"),
            None => self.name.replace(' ', "_"),
        }
    }

    /// Record a finished-playing report.
    pub fn record_score(&mut self, score: i64, passed: bool) {
        self.score = Some(score);
        self.passed = Some(passed);
        self.score_history.push(ScoreReport {
            score,
            passed,
            timestamp: Utc::now(),
        });
    }
}

impl PartialEq for MultiplayerPlayer {
    fn eq(&self, other: &Self) -> bool {
        self.is_named(&other.name)
    }
}

impl Eq for MultiplayerPlayer {}
