//! Channel registry: the single source of truth for joined channels and
//! open query conversations.

use std::collections::HashMap;

use bancho_proto::PrivateMessage;
use chrono::{DateTime, Utc};

use crate::multiplayer::MultiplayerLobby;

/// A plain chat channel or query conversation.
///
/// Query conversations (direct-message threads with one user) are
/// channels whose name lacks the `#` sigil.
#[derive(Clone, Debug)]
pub struct Channel {
    name: String,
    /// When the channel was joined locally.
    pub created_at: DateTime<Utc>,
    /// Message history, appended only when enabled in the config.
    pub message_history: Vec<PrivateMessage>,
}

impl Channel {
    /// Create a channel with the given display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            message_history: Vec::new(),
        }
    }

    /// The channel's display name, as first seen.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is a query conversation rather than a channel.
    pub fn is_query(&self) -> bool {
        !self.name.starts_with('#')
    }
}

/// What a registry slot holds.
#[derive(Clone, Debug)]
pub enum ChannelKind {
    /// A plain channel or query conversation.
    Plain(Channel),
    /// A multiplayer lobby, with its reconstructed state.
    Lobby(MultiplayerLobby),
}

impl ChannelKind {
    /// The display name of either kind.
    pub fn name(&self) -> &str {
        match self {
            ChannelKind::Plain(c) => c.name(),
            ChannelKind::Lobby(l) => l.channel(),
        }
    }
}

/// Extract the lobby id from a `#mp_<digits>` channel name.
pub fn lobby_channel_id(name: &str) -> Option<u64> {
    let digits = name.strip_prefix("#mp_")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Normalized map of channel name to channel state.
///
/// Names are compared with spaces folded to underscores and case
/// ignored, so `#osu mApPiNg` and `#osu_mapping` are one channel.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: HashMap<String, ChannelKind>,
}

fn normalize(name: &str) -> String {
    name.replace(' ', "_").to_ascii_lowercase()
}

impl ChannelRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel by name. `#mp_<digits>` names become lobby entries.
    /// Idempotent: re-adding an existing name (under any spelling) is a
    /// no-op. Returns whether the entry is new.
    pub fn add(&mut self, name: &str) -> bool {
        let key = normalize(name);
        if self.channels.contains_key(&key) {
            return false;
        }
        let kind = match lobby_channel_id(name) {
            Some(id) => ChannelKind::Lobby(MultiplayerLobby::new(id, name)),
            None => ChannelKind::Plain(Channel::new(name)),
        };
        self.channels.insert(key, kind);
        true
    }

    /// Insert a fully built lobby, keyed by its channel name. Idempotent.
    /// Returns whether the entry is new.
    pub fn add_lobby(&mut self, lobby: MultiplayerLobby) -> bool {
        let key = normalize(lobby.channel());
        if self.channels.contains_key(&key) {
            return false;
        }
        self.channels.insert(key, ChannelKind::Lobby(lobby));
        true
    }

    /// Whether the name is present, under any spelling.
    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(&normalize(name))
    }

    /// Look up a channel.
    pub fn get(&self, name: &str) -> Option<&ChannelKind> {
        self.channels.get(&normalize(name))
    }

    /// Look up a channel mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ChannelKind> {
        self.channels.get_mut(&normalize(name))
    }

    /// Look up a lobby mutably, if the name is a lobby entry.
    pub fn lobby_mut(&mut self, name: &str) -> Option<&mut MultiplayerLobby> {
        match self.get_mut(name) {
            Some(ChannelKind::Lobby(l)) => Some(l),
            _ => None,
        }
    }

    /// Remove a channel, returning its state.
    pub fn remove(&mut self, name: &str) -> Option<ChannelKind> {
        self.channels.remove(&normalize(name))
    }

    /// Iterate over all entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &ChannelKind> {
        self.channels.values()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
