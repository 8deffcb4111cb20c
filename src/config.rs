//! Client configuration.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Default IRC host for Bancho.
pub const DEFAULT_HOST: &str = "irc.ppy.sh";

/// Default IRC port for Bancho.
pub const DEFAULT_PORT: u16 = 6667;

/// Server commands dropped by default before any processing. These are
/// noisy membership/mode notifications most clients have no use for.
///
/// PING is deliberately absent: the keepalive answer is mandatory and is
/// handled before the ignore filter either way.
pub const DEFAULT_IGNORED_COMMANDS: &[&str] = &["QUIT", "PART", "JOIN", "MODE"];

/// Account credentials. The password is the IRC token from the account
/// settings page, not the account password.
#[derive(Clone, Deserialize)]
pub struct IrcCredentials {
    /// Account username.
    pub username: String,
    /// IRC password token.
    pub password: String,
}

impl IrcCredentials {
    /// Create credentials from a username and IRC password token.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// The password never appears in Debug output or logs.
impl fmt::Debug for IrcCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IrcCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sliding-window rate limit: at most `threshold` outgoing messages per
/// `window`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct RateLimit {
    /// Maximum messages per window.
    pub threshold: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl RateLimit {
    /// Tier for regular accounts.
    pub const NORMAL: RateLimit = RateLimit {
        threshold: 10,
        window_secs: 60,
    };

    /// Tier for registered bot accounts.
    pub const BOT: RateLimit = RateLimit {
        threshold: 300,
        window_secs: 60,
    };

    /// Window length as a [`Duration`].
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Configuration for a [`BanchoClient`](crate::BanchoClient).
#[derive(Clone, Debug, Deserialize)]
pub struct BanchoClientConfig {
    /// Account credentials.
    pub credentials: IrcCredentials,
    /// Server host. Either `irc.ppy.sh` or `cho.ppy.sh`.
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Whether each channel retains its message history in memory.
    #[serde(default)]
    pub save_message_history: bool,
    /// Inbound commands dropped before any processing.
    #[serde(default = "default_ignored_commands")]
    pub ignored_commands: Vec<String>,
    /// Whether this account has the bot flag, selecting the generous
    /// rate-limit tier.
    #[serde(default)]
    pub bot_account: bool,
    /// Explicit rate limit, overriding the tier selected by
    /// `bot_account`.
    #[serde(default)]
    pub rate_limit: Option<RateLimit>,
}

impl BanchoClientConfig {
    /// Configuration with defaults for everything except credentials.
    pub fn new(credentials: IrcCredentials) -> Self {
        Self {
            credentials,
            host: default_host(),
            port: default_port(),
            save_message_history: false,
            ignored_commands: default_ignored_commands(),
            bot_account: false,
            rate_limit: None,
        }
    }

    /// The effective rate limit for this configuration.
    pub fn effective_rate_limit(&self) -> RateLimit {
        self.rate_limit.unwrap_or(if self.bot_account {
            RateLimit::BOT
        } else {
            RateLimit::NORMAL
        })
    }

    /// Whether `command` is configured to be dropped.
    pub fn is_ignored(&self, command: &str) -> bool {
        self.ignored_commands.iter().any(|c| c == command)
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_ignored_commands() -> Vec<String> {
    DEFAULT_IGNORED_COMMANDS
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BanchoClientConfig {
        BanchoClientConfig::new(IrcCredentials::new("Stage", "hunter2"))
    }

    #[test]
    fn test_defaults() {
        let cfg = config();
        assert_eq!(cfg.host, "irc.ppy.sh");
        assert_eq!(cfg.port, 6667);
        assert!(!cfg.save_message_history);
        assert!(cfg.is_ignored("QUIT"));
        assert!(cfg.is_ignored("MODE"));
        assert!(!cfg.is_ignored("PING"));
        assert!(!cfg.is_ignored("PRIVMSG"));
    }

    #[test]
    fn test_rate_limit_tiers() {
        let mut cfg = config();
        assert_eq!(cfg.effective_rate_limit(), RateLimit::NORMAL);

        cfg.bot_account = true;
        assert_eq!(cfg.effective_rate_limit(), RateLimit::BOT);

        cfg.rate_limit = Some(RateLimit {
            threshold: 2,
            window_secs: 60,
        });
        assert_eq!(cfg.effective_rate_limit().threshold, 2);
    }

    #[test]
    fn test_password_redacted_in_debug() {
        let cfg = config();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let cfg: BanchoClientConfig = toml::from_str(
            r#"
            bot_account = true
            save_message_history = true

            [credentials]
            username = "Stage"
            password = "token"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.credentials.username, "Stage");
        assert!(cfg.bot_account);
        assert!(cfg.save_message_history);
        assert_eq!(cfg.host, "irc.ppy.sh");
    }
}
