//! Multiplayer lobby state, reconstructed from BanchoBot's free-text
//! notifications.
//!
//! The bot gives lobbies no structured feed: every state transition has
//! to be recovered from human-readable chat lines. [`MultiplayerLobby::apply`]
//! matches each line against an ordered catalog of literal
//! prefix/substring/suffix anchors (first match wins, never regex) and
//! mutates the lobby accordingly.

use bancho_proto::PrivateMessage;
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::events::LobbyEvent;

use super::mods::Mods;
use super::player::{MultiplayerPlayer, PlayerState, TeamColor};
use super::settings::{parse_settings_response, BeatmapShell, GameMode, LobbyFormat, WinCondition};

const PROFILE_URL: &str = "https://osu.ppy.sh/u/";

/// One `#mp_` channel's reconstructed state.
///
/// Fields are mutated from the read-loop dispatch path (and from the
/// optimistic command methods). This is a single-writer-at-a-time
/// contract, not a thread-safe collection; callers holding the registry
/// lock are the synchronization point.
#[derive(Clone, Debug)]
pub struct MultiplayerLobby {
    /// Numeric lobby id.
    pub id: u64,
    /// Display name.
    pub name: String,
    channel: String,
    /// Match history URL from the settings dump.
    pub history_url: Option<String>,
    /// Team mode.
    pub format: LobbyFormat,
    /// Win condition.
    pub win_condition: WinCondition,
    /// Game mode.
    pub game_mode: GameMode,
    /// Room-level mods.
    pub mods: Mods,
    /// Current host's name.
    pub host: Option<String>,
    /// Referee roster, in the order referees were added. Maintained from
    /// our own `!mp addref`/`!mp removeref` commands; the bot never
    /// announces roster changes.
    pub referees: Vec<String>,
    /// Slot count.
    pub size: u32,
    /// Players currently in the lobby.
    pub players: Vec<MultiplayerPlayer>,
    /// Whether a match is running.
    pub match_in_progress: bool,
    /// Whether the host is on the song selection screen.
    pub host_is_changing_map: bool,
    /// Whether the lobby is locked.
    pub is_locked: bool,
    /// Whether the lobby has been closed. Terminal.
    pub is_closed: bool,
    /// Current beatmap as far as notifications described it.
    pub beatmap: Option<BeatmapShell>,
    /// Player count from the last settings dump.
    pub player_count: u32,
    /// When the lobby countdown timer ends, if one is running.
    pub lobby_timer_end: Option<DateTime<Utc>>,
    /// When the match start timer ends, if one is running.
    pub match_start_timer_end: Option<DateTime<Utc>>,
    /// Channel history, appended only when enabled in the config.
    pub message_history: Vec<PrivateMessage>,
    remaining_slot_reports: u32,
}

impl MultiplayerLobby {
    /// Create a lobby for `#mp_<id>`.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            channel: format!("#mp_{id}"),
            history_url: None,
            format: LobbyFormat::default(),
            win_condition: WinCondition::default(),
            game_mode: GameMode::default(),
            mods: Mods::NONE,
            host: None,
            referees: Vec::new(),
            size: 16,
            players: Vec::new(),
            match_in_progress: false,
            host_is_changing_map: false,
            is_locked: false,
            is_closed: false,
            beatmap: None,
            player_count: 0,
            lobby_timer_end: None,
            match_start_timer_end: None,
            message_history: Vec::new(),
            remaining_slot_reports: 0,
        }
    }

    /// The lobby's channel name, `#mp_<id>`.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Time left on the lobby countdown, clamped to zero. `None` when no
    /// timer is running.
    pub fn lobby_timer_remaining(&self) -> Option<Duration> {
        self.lobby_timer_end.map(remaining)
    }

    /// Time left on the match start timer, clamped to zero. `None` when
    /// no timer is running.
    pub fn match_timer_remaining(&self) -> Option<Duration> {
        self.match_start_timer_end.map(remaining)
    }

    /// Look up a player by name, case-insensitively.
    pub fn player(&self, name: &str) -> Option<&MultiplayerPlayer> {
        self.players.iter().find(|p| p.is_named(name))
    }

    fn player_mut(&mut self, name: &str) -> Option<&mut MultiplayerPlayer> {
        self.players.iter_mut().find(|p| p.is_named(name))
    }

    /// Find a player by name or create one in the given slot. Returns the
    /// index and whether the player is new.
    fn find_or_create(&mut self, name: &str, slot: u32, team: TeamColor) -> (usize, bool) {
        if let Some(i) = self.players.iter().position(|p| p.is_named(name)) {
            return (i, false);
        }
        self.players
            .push(MultiplayerPlayer::new(self.id, name, slot, team));
        (self.players.len() - 1, true)
    }

    fn remove_player(&mut self, name: &str) {
        self.players.retain(|p| !p.is_named(name));
    }

    /// Feed one BanchoBot line addressed to this lobby's channel.
    ///
    /// Returns the typed events the line produced, in order, with a
    /// trailing [`LobbyEvent::StateChanged`] whenever anything observable
    /// mutated. Unrecognized lines yield nothing; a malformed payload
    /// inside a recognized shape is logged and dropped, never fatal.
    pub fn apply(&mut self, content: &str) -> Vec<LobbyEvent> {
        let mut events = Vec::new();
        let mut mutated = false;

        if let Some(tail) = content.strip_prefix("Room name: ") {
            if let Some((name, history)) = tail.split_once(", History: ") {
                if self.name != name {
                    self.name = name.to_owned();
                    events.push(LobbyEvent::NameChanged(name.to_owned()));
                }
                if self.history_url.as_deref() != Some(history) {
                    self.history_url = Some(history.to_owned());
                    mutated = true;
                }
            } else {
                warn!(content, "malformed room name line");
            }
        } else if let Some(tail) = content.strip_prefix("Team mode: ") {
            if let Some((format, win)) = tail.split_once(", Win condition: ") {
                match (format.parse(), win.parse()) {
                    (Ok(format), Ok(win)) => {
                        self.change_format(format, &mut events);
                        self.change_win_condition(win, &mut events);
                    }
                    _ => warn!(content, "unknown team mode or win condition"),
                }
            } else {
                warn!(content, "malformed team mode line");
            }
        } else if content.starts_with("Changed match settings to ") {
            if let Some(settings) = parse_settings_response(content) {
                if let Some(size) = settings.size {
                    if self.size != size {
                        self.size = size;
                        events.push(LobbyEvent::SizeChanged(size));
                    }
                }
                self.change_format(settings.format, &mut events);
                if let Some(win) = settings.win_condition {
                    self.change_win_condition(win, &mut events);
                }
            }
        } else if content == "Host is changing map..." {
            self.host_is_changing_map = true;
            events.push(LobbyEvent::HostChangingMap);
        } else if let Some(tail) = content.strip_prefix("Beatmap changed to: ") {
            self.change_beatmap(BeatmapShell::from_full(tail), content, &mut events);
        } else if let Some(tail) = content.strip_prefix("Changed beatmap to ") {
            self.change_beatmap(BeatmapShell::from_url_first(tail), content, &mut events);
        } else if let Some(tail) = content.strip_prefix("Beatmap: ") {
            self.change_beatmap(BeatmapShell::from_url_first(tail), content, &mut events);
        } else if content.contains(" joined in slot ") {
            self.apply_join(content, &mut events);
        } else if content == "The match has started!" || content == "Started the match" {
            self.match_in_progress = true;
            self.lobby_timer_end = None;
            self.match_start_timer_end = None;
            for p in &mut self.players {
                p.state = PlayerState::NotReady;
            }
            events.push(LobbyEvent::MatchStarted);
        } else if content == "The match has finished!" {
            self.match_in_progress = false;
            self.lobby_timer_end = None;
            self.match_start_timer_end = None;
            events.push(LobbyEvent::MatchFinished);
        } else if content.contains(" moved to slot ") {
            self.apply_slot_move(content, &mut events);
        } else if let Some(tail) = content.strip_prefix("Players: ") {
            match tail.trim().parse::<u32>() {
                Ok(0) => {
                    self.player_count = 0;
                    self.remaining_slot_reports = 0;
                    events.push(LobbyEvent::SettingsUpdated);
                }
                Ok(n) => {
                    self.player_count = n;
                    self.remaining_slot_reports = n;
                    mutated = true;
                }
                Err(_) => warn!(content, "non-numeric player count"),
            }
        } else if content.starts_with("Slot ") && content.contains(PROFILE_URL) {
            self.apply_slot_report(content, &mut events);
        } else if let Some(name) = content.strip_prefix("Changed match host to ") {
            self.change_host(name, &mut events);
        } else if let Some(name) = content.strip_suffix(" became the host.") {
            self.change_host(name, &mut events);
        } else if content == "Cleared match host" {
            if self.host.is_some() {
                self.host = None;
                events.push(LobbyEvent::HostCleared);
            }
        } else if content == "Disabled all mods, disabled FreeMod" {
            self.change_mods(Mods::NONE, &mut events);
        } else if content == "Disabled all mods, enabled FreeMod" {
            self.change_mods(Mods::FREEMOD, &mut events);
        } else if let Some(tail) = content.strip_prefix("Active mods: ") {
            self.change_mods(Mods::parse_list(tail), &mut events);
        } else if let Some(tail) = content.strip_prefix("Enabled ") {
            let (list, freemod) = if let Some(list) = tail.strip_suffix(", enabled FreeMod") {
                (list, Mods::FREEMOD)
            } else if let Some(list) = tail.strip_suffix(", disabled FreeMod") {
                (list, Mods::NONE)
            } else {
                (tail, Mods::NONE)
            };
            self.change_mods(Mods::parse_list(list) | freemod, &mut events);
        } else if content.contains(" finished playing (Score: ") {
            self.apply_score(content, &mut events);
        } else if let Some(name) = content.strip_suffix(" left the game.") {
            if self.player(name).is_some() {
                self.remove_player(name);
                events.push(LobbyEvent::PlayerDisconnected(name.to_owned()));
            }
        } else if content == "All players are ready!" {
            for p in &mut self.players {
                p.state = PlayerState::Ready;
            }
            events.push(LobbyEvent::AllPlayersReady);
        } else if content == "Aborted the match" {
            self.match_in_progress = false;
            events.push(LobbyEvent::MatchAborted);
        } else if let Some(tail) = content.strip_prefix("Banned ") {
            if let Some(name) = tail.strip_suffix(" from the match") {
                self.remove_player(name);
                events.push(LobbyEvent::PlayerBanned(name.to_owned()));
            }
        } else if let Some(tail) = content.strip_prefix("Changed match to size ") {
            match tail.trim().parse::<u32>() {
                Ok(size) => {
                    if self.size != size {
                        self.size = size;
                        events.push(LobbyEvent::SizeChanged(size));
                    }
                }
                Err(_) => warn!(content, "non-numeric lobby size"),
            }
        } else if let Some(token) = content.strip_prefix("Changed match mode to ") {
            match token.parse::<GameMode>() {
                Ok(mode) => {
                    if self.game_mode != mode {
                        events.push(LobbyEvent::GameModeChanged {
                            previous: self.game_mode,
                            current: mode,
                        });
                        self.game_mode = mode;
                    }
                }
                Err(()) => warn!(content, "unknown game mode"),
            }
        } else if let Some((name, team)) = parse_team_change(content) {
            self.apply_team_change(name, team, &mut events);
        }

        if mutated || !events.is_empty() {
            events.push(LobbyEvent::StateChanged);
        }
        events
    }

    fn change_format(&mut self, format: LobbyFormat, events: &mut Vec<LobbyEvent>) {
        if self.format == format {
            return;
        }
        let previous = self.format;
        self.format = format;
        // Team assignments are meaningless outside team formats. The
        // reverse transition cannot reconstruct lost assignments, so it
        // only warns.
        if previous.is_team_based() && !format.is_team_based() {
            for p in &mut self.players {
                p.team = TeamColor::None;
            }
        } else if !previous.is_team_based() && format.is_team_based() {
            warn!(lobby = self.id, "format became team-based, team assignments unknown");
        }
        events.push(LobbyEvent::FormatChanged {
            previous,
            current: format,
        });
    }

    fn change_win_condition(&mut self, win: WinCondition, events: &mut Vec<LobbyEvent>) {
        if self.win_condition != win {
            events.push(LobbyEvent::WinConditionChanged {
                previous: self.win_condition,
                current: win,
            });
            self.win_condition = win;
        }
    }

    fn change_beatmap(
        &mut self,
        shell: Option<BeatmapShell>,
        content: &str,
        events: &mut Vec<LobbyEvent>,
    ) {
        match shell {
            Some(shell) => {
                self.host_is_changing_map = false;
                self.beatmap = Some(shell.clone());
                events.push(LobbyEvent::BeatmapChanged(shell));
            }
            None => warn!(content, "malformed beatmap line"),
        }
    }

    fn change_host(&mut self, name: &str, events: &mut Vec<LobbyEvent>) {
        if self
            .host
            .as_deref()
            .is_some_and(|h| h.eq_ignore_ascii_case(name))
        {
            return;
        }
        self.host = Some(name.to_owned());
        events.push(LobbyEvent::HostChanged(Some(name.to_owned())));
    }

    fn change_mods(&mut self, mods: Mods, events: &mut Vec<LobbyEvent>) {
        if self.mods != mods {
            self.mods = mods;
            events.push(LobbyEvent::ModsChanged(mods));
        }
        for p in &mut self.players {
            p.mods = mods;
        }
    }

    fn apply_join(&mut self, content: &str, events: &mut Vec<LobbyEvent>) {
        // "<name> joined in slot N." / "<name> joined in slot N for team red."
        let Some((name, tail)) = content.split_once(" joined in slot ") else {
            return;
        };
        let tail = tail.trim_end_matches('.');
        let (slot, team) = match tail.split_once(" for team ") {
            Some((slot, team)) => (slot, TeamColor::from_word(team).unwrap_or_default()),
            None => (tail, TeamColor::None),
        };
        let Ok(slot) = slot.parse::<u32>() else {
            warn!(content, "non-numeric join slot");
            return;
        };
        let (i, created) = self.find_or_create(name, slot, team);
        self.players[i].slot = slot;
        self.players[i].team = team;
        if created {
            events.push(LobbyEvent::PlayerJoined(name.to_owned()));
        }
    }

    fn apply_slot_move(&mut self, content: &str, events: &mut Vec<LobbyEvent>) {
        let Some((name, slot)) = content.split_once(" moved to slot ") else {
            return;
        };
        let Ok(slot) = slot.trim_end_matches('.').parse::<u32>() else {
            warn!(content, "non-numeric move slot");
            return;
        };
        let (i, _) = self.find_or_create(name, slot, TeamColor::None);
        let previous = self.players[i].slot;
        self.players[i].slot = slot;
        events.push(LobbyEvent::SlotMove {
            player: name.to_owned(),
            previous,
            current: slot,
        });
    }

    fn apply_score(&mut self, content: &str, events: &mut Vec<LobbyEvent>) {
        // "<name> finished playing (Score: N, PASSED|FAILED)."
        let Some((name, tail)) = content.split_once(" finished playing (Score: ") else {
            return;
        };
        let Some((score, verdict)) = tail.split_once(", ") else {
            warn!(content, "malformed score report");
            return;
        };
        let Ok(score) = score.parse::<i64>() else {
            warn!(content, "non-numeric score");
            return;
        };
        let passed = match verdict.trim_end_matches(&[')', '.'][..]) {
            "PASSED" => true,
            "FAILED" => false,
            _ => {
                warn!(content, "unknown score verdict");
                return;
            }
        };
        if let Some(p) = self.player_mut(name) {
            p.record_score(score, passed);
            events.push(LobbyEvent::PlayerFinished {
                name: name.to_owned(),
                score,
                passed,
            });
        }
    }

    fn apply_team_change(&mut self, name: &str, team: TeamColor, events: &mut Vec<LobbyEvent>) {
        let Some(p) = self.player_mut(name) else {
            return;
        };
        let previous = p.team;
        if previous == team {
            return;
        }
        p.team = team;
        events.push(LobbyEvent::TeamChanged {
            player: name.to_owned(),
            previous,
            current: team,
        });
    }

    /// Slot report line from a settings dump, e.g.
    /// `Slot 1  Not Ready https://osu.ppy.sh/u/8191845 Stage            [Host / Team Blue / Hidden]`.
    fn apply_slot_report(&mut self, content: &str, events: &mut Vec<LobbyEvent>) {
        let Some(report) = SlotReport::parse(content) else {
            warn!(content, "malformed slot report");
            return;
        };
        let (i, created) = self.find_or_create(report.name, report.slot, TeamColor::None);
        if created {
            events.push(LobbyEvent::PlayerJoined(report.name.to_owned()));
        }
        self.players[i].id = Some(report.id);
        self.players[i].slot = report.slot;
        self.players[i].state = report.state;

        if let Some(bracket) = report.bracket {
            if bracket.contains("Host") {
                self.change_host(report.name, events);
            }
            let team = if bracket.contains("Team Blue") {
                Some(TeamColor::Blue)
            } else if bracket.contains("Team Red") {
                Some(TeamColor::Red)
            } else {
                None
            };
            if let Some(team) = team {
                self.apply_team_change(report.name, team, events);
            }
            if self.mods.contains(Mods::FREEMOD) {
                self.players[i].mods = scan_bracket_mods(bracket);
            } else {
                self.players[i].mods = self.mods;
            }
        } else if !self.mods.contains(Mods::FREEMOD) {
            self.players[i].mods = self.mods;
        }

        if self.remaining_slot_reports > 0 {
            self.remaining_slot_reports -= 1;
            if self.remaining_slot_reports == 0 {
                events.push(LobbyEvent::SettingsUpdated);
            }
        }
    }
}

/// Rebuild a personal mod set from the bracketed tail of a slot report.
/// Only meaningful under Freemod. The bot spells Autopilot with its
/// legacy "Relax2" name there; normalize before scanning so the "Relax"
/// substring does not misfire.
fn scan_bracket_mods(bracket: &str) -> Mods {
    let bracket = bracket.replace("Relax2", "Autopilot");
    let mut mods = Mods::NONE;
    for (m, long, _) in Mods::NAMED {
        if bracket.contains(long) {
            mods |= *m;
        }
    }
    mods.suppress_nightcore_double_time()
}

fn remaining(end: DateTime<Utc>) -> Duration {
    (end - Utc::now()).max(Duration::zero())
}

fn parse_team_change(content: &str) -> Option<(&str, TeamColor)> {
    // "<name> changed to Red" / "Moved <name> to team Red"
    if let Some(tail) = content.strip_prefix("Moved ") {
        if let Some((name, team)) = tail.rsplit_once(" to team ") {
            let team = match team {
                "Red" => TeamColor::Red,
                "Blue" => TeamColor::Blue,
                _ => return None,
            };
            return Some((name, team));
        }
    }
    if let Some(name) = content.strip_suffix(" changed to Red") {
        return Some((name, TeamColor::Red));
    }
    if let Some(name) = content.strip_suffix(" changed to Blue") {
        return Some((name, TeamColor::Blue));
    }
    None
}

struct SlotReport<'a> {
    slot: u32,
    state: PlayerState,
    id: u32,
    name: &'a str,
    bracket: Option<&'a str>,
}

impl<'a> SlotReport<'a> {
    fn parse(content: &'a str) -> Option<SlotReport<'a>> {
        // Slot digits sit inside the first 8 characters.
        let head = content.get(..8)?;
        let slot: u32 = head
            .chars()
            .filter(char::is_ascii_digit)
            .collect::<String>()
            .parse()
            .ok()?;

        let url_idx = content.find(PROFILE_URL)?;
        let state = PlayerState::from_token(content.get(8..url_idx)?.trim());

        let after_url = &content[url_idx + PROFILE_URL.len()..];
        let digits_end = after_url
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after_url.len());
        let id: u32 = after_url[..digits_end].parse().ok()?;

        // The name is a fixed-width 16-character field after the URL,
        // padded or truncated. Trim, never assume exact width.
        let rest = after_url[digits_end..].strip_prefix(' ')?;
        let (name_field, tail) = match rest.char_indices().nth(16) {
            Some((i, _)) => rest.split_at(i),
            None => (rest, ""),
        };
        let name = name_field.trim_end();
        if name.is_empty() {
            return None;
        }
        let bracket = tail
            .trim_start()
            .strip_prefix('[')
            .and_then(|b| b.strip_suffix(']'));

        Some(SlotReport {
            slot,
            state,
            id,
            name,
            bracket,
        })
    }
}
