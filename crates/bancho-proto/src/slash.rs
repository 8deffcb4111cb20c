//! Parsing of local `/command` prompts.
//!
//! These are typed by a user into a host application, not received from
//! the wire. Bancho recognizes a small command set whose parameter
//! conventions differ from the generic splitting rules.

/// Commands Bancho itself understands, matched case-insensitively.
const BANCHO_COMMANDS: &[&str] = &["join", "part", "me", "ignore", "unignore", "away", "query"];

/// Commands whose remaining words collapse into a single parameter.
const JOINED_ARG_COMMANDS: &[&str] = &["me", "away"];

/// Commands that take only the first following word as their parameter.
const SINGLE_ARG_COMMANDS: &[&str] = &["join", "part", "ignore", "unignore", "query"];

/// A parsed slash command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommand {
    /// The command name, without the slash.
    pub command: String,
    /// Parameters following the recognized command's convention, or `None`
    /// when no words followed the command.
    pub params: Option<Vec<String>>,
}

impl SlashCommand {
    /// Parse a prompt. Returns `None` when the prompt is not a slash
    /// command at all (empty, no leading `/`, or just `/`).
    pub fn parse(prompt: &str) -> Option<SlashCommand> {
        if prompt.trim().is_empty() || !prompt.starts_with('/') || prompt.len() == 1 {
            return None;
        }

        let mut words = prompt[1..].split_whitespace();
        let command = words.next()?.to_owned();
        let rest: Vec<&str> = words.collect();

        let params = if rest.is_empty() {
            None
        } else {
            let lower = command.to_ascii_lowercase();
            if JOINED_ARG_COMMANDS.contains(&lower.as_str()) {
                Some(vec![rest.join(" ")])
            } else if SINGLE_ARG_COMMANDS.contains(&lower.as_str()) {
                Some(vec![rest[0].to_owned()])
            } else {
                Some(rest.into_iter().map(str::to_owned).collect())
            }
        };

        Some(SlashCommand { command, params })
    }

    /// Whether Bancho recognizes this command (as opposed to a custom
    /// client-side command).
    pub fn is_bancho_command(&self) -> bool {
        let lower = self.command.to_ascii_lowercase();
        BANCHO_COMMANDS.contains(&lower.as_str())
    }
}
