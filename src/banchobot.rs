//! Interpreter for BanchoBot's direct free-text notifications.
//!
//! Lobby-scoped notifications are handled by the lobby model; this
//! module covers the bot's direct messages, currently the tournament
//! lobby creation confirmation that seeds a new registry entry.

use tracing::warn;

const CREATION_PREFIX: &str = "Created the tournament match ";

/// A confirmed tournament lobby creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TournamentMatch {
    /// Numeric lobby id, from the match URL.
    pub id: u64,
    /// Display name, everything after the URL.
    pub name: String,
}

impl TournamentMatch {
    /// The lobby's channel name.
    pub fn channel(&self) -> String {
        format!("#mp_{}", self.id)
    }
}

/// Recognize `Created the tournament match <url> <name...>`.
///
/// A malformed URL tail is logged and yields `None`; bot text never
/// takes down the read loop.
pub fn parse_tournament_creation(content: &str) -> Option<TournamentMatch> {
    let tail = content.strip_prefix(CREATION_PREFIX)?;
    let Some((url, name)) = tail.split_once(' ') else {
        warn!(content, "creation notification without a name");
        return None;
    };
    let Some(id) = url.rsplit('/').next().and_then(|d| d.parse().ok()) else {
        warn!(content, "creation notification with a malformed match id");
        return None;
    };
    Some(TournamentMatch {
        id,
        name: name.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_with_spaced_name() {
        let m = parse_tournament_creation(
            "Created the tournament match https://osu.ppy.sh/mp/104889872 test with spaces 9nd 4umber5",
        )
        .unwrap();
        assert_eq!(m.id, 104889872);
        assert_eq!(m.name, "test with spaces 9nd 4umber5");
        assert_eq!(m.channel(), "#mp_104889872");
    }

    #[test]
    fn test_malformed_id_is_dropped() {
        assert_eq!(
            parse_tournament_creation("Created the tournament match https://osu.ppy.sh/mp/abc x"),
            None
        );
    }

    #[test]
    fn test_unrelated_text_is_ignored() {
        assert_eq!(parse_tournament_creation("Good luck!"), None);
        assert_eq!(
            parse_tournament_creation("Created the tournament match "),
            None
        );
    }
}
