//! IRC message parsing and serialization.
//!
//! Bancho speaks a lenient RFC 2812 dialect. Parsing is a single
//! left-to-right scan with no backtracking: optional `@`-tags, optional
//! `:`-prefix, command token, middle parameters, optional `:`-trailing
//! parameter. Runs of spaces between tokens are treated as one separator,
//! matching the server's lenient framing.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::{MessageParseError, ProtocolError};

/// A single message tag (protocol extension, usually absent on Bancho).
///
/// A tag without an explicit value carries the value `"true"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag(pub String, pub String);

impl Tag {
    /// Create a new tag with a key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Tag(key.into(), value.into())
    }
}

/// An owned, parsed IRC message.
///
/// # Example
///
/// ```
/// use bancho_proto::Message;
///
/// let msg: Message = ":cho.ppy.sh 001 Stage :Welcome to the osu!Bancho."
///     .parse()
///     .unwrap();
/// assert_eq!(msg.command, "001");
/// assert_eq!(msg.prefix.as_deref(), Some("cho.ppy.sh"));
/// assert_eq!(msg.params, vec!["Stage", "Welcome to the osu!Bancho."]);
/// ```
#[derive(Clone, Debug)]
pub struct Message {
    /// The raw line as received, without line terminators.
    pub raw: String,
    /// Message tags, if the line carried a tags section.
    pub tags: Option<Vec<Tag>>,
    /// Message prefix (server name or `nick!user@host`), without the colon.
    pub prefix: Option<String>,
    /// The command token (verb or numeric reply code).
    pub command: String,
    /// Ordered parameters. A trailing parameter, if present, is the last
    /// element and may contain spaces.
    pub params: Vec<String>,
    /// When this message object was created.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Parse a raw protocol line.
    pub fn parse(raw: &str) -> Result<Message, ProtocolError> {
        let line = raw.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(invalid(raw, MessageParseError::EmptyMessage));
        }

        let bytes = line.as_bytes();
        let mut pos = 0usize;
        let mut tags = None;

        // Tags section: @key=value;key2 ... terminated by a space.
        if bytes[0] == b'@' {
            let Some(space) = line.find(' ') else {
                return Err(invalid(raw, MessageParseError::UnterminatedTags));
            };
            let mut parsed = Vec::new();
            for tag in line[1..space].split(';').filter(|t| !t.is_empty()) {
                let mut iter = tag.splitn(2, '=');
                let key = iter.next().unwrap_or_default();
                let value = iter.next().unwrap_or("true");
                parsed.push(Tag(key.to_owned(), value.to_owned()));
            }
            tags = Some(parsed);
            pos = skip_spaces(line, space + 1);
        }

        // Prefix: :server.name or :nick!user@host, terminated by a space.
        let mut prefix = None;
        if pos < bytes.len() && bytes[pos] == b':' {
            let Some(space) = line[pos..].find(' ').map(|i| pos + i) else {
                return Err(invalid(raw, MessageParseError::UnterminatedPrefix));
            };
            prefix = Some(line[pos + 1..space].to_owned());
            pos = skip_spaces(line, space + 1);
        }

        // Command token. A command-only line is valid.
        let command;
        match line[pos..].find(' ').map(|i| pos + i) {
            None => {
                if pos >= line.len() {
                    return Err(invalid(raw, MessageParseError::EmptyMessage));
                }
                return Ok(Message {
                    raw: line.to_owned(),
                    tags,
                    prefix,
                    command: line[pos..].to_owned(),
                    params: Vec::new(),
                    timestamp: Utc::now(),
                });
            }
            Some(space) => {
                command = line[pos..space].to_owned();
                pos = skip_spaces(line, space + 1);
            }
        }

        // Parameters: middles until a ':'-led trailing parameter.
        let mut params = Vec::new();
        while pos < line.len() {
            if bytes[pos] == b':' {
                params.push(line[pos + 1..].to_owned());
                break;
            }
            match line[pos..].find(' ').map(|i| pos + i) {
                Some(space) => {
                    params.push(line[pos..space].to_owned());
                    pos = skip_spaces(line, space + 1);
                }
                None => {
                    params.push(line[pos..].to_owned());
                    break;
                }
            }
        }

        Ok(Message {
            raw: line.to_owned(),
            tags,
            prefix,
            command,
            params,
            timestamp: Utc::now(),
        })
    }

    /// Construct a message from components. The raw form is the canonical
    /// serialization of those components.
    pub fn from_parts(
        prefix: Option<&str>,
        command: &str,
        params: Vec<String>,
    ) -> Message {
        let mut msg = Message {
            raw: String::new(),
            tags: None,
            prefix: prefix.map(str::to_owned),
            command: command.to_owned(),
            params,
            timestamp: Utc::now(),
        };
        msg.raw = msg.to_line();
        msg
    }

    /// Serialize to the canonical wire form.
    ///
    /// The last parameter is wrapped in a leading colon only when it is
    /// empty or contains a space. This need not byte-equal a lenient
    /// original line, but parses back to an equivalent message.
    pub fn to_line(&self) -> String {
        let mut out = String::with_capacity(self.raw.len().max(32));

        if let Some(tags) = &self.tags {
            if !tags.is_empty() {
                out.push('@');
                for (i, Tag(key, value)) in tags.iter().enumerate() {
                    if i > 0 {
                        out.push(';');
                    }
                    out.push_str(key);
                    if value != "true" {
                        out.push('=');
                        out.push_str(value);
                    }
                }
                out.push(' ');
            }
        }

        if let Some(prefix) = &self.prefix {
            out.push(':');
            out.push_str(prefix);
            out.push(' ');
        }

        out.push_str(&self.command);

        if let Some((last, middles)) = self.params.split_last() {
            for param in middles {
                out.push(' ');
                out.push_str(param);
            }
            out.push(' ');
            if last.is_empty() || last.contains(' ') {
                out.push(':');
            }
            out.push_str(last);
        }

        out
    }

    /// Look up a tag value by key.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .as_ref()?
            .iter()
            .find(|Tag(k, _)| k == key)
            .map(|Tag(_, v)| v.as_str())
    }

    /// Whether the prefix is a `nick!user@host` hostmask.
    pub fn is_hostmask_prefix(&self) -> bool {
        self.prefix
            .as_deref()
            .is_some_and(|p| p.contains('!') && p.contains('@'))
    }

    /// Whether the prefix names a server rather than a user.
    pub fn is_server_prefix(&self) -> bool {
        !self.is_hostmask_prefix()
            && self.prefix.as_deref().is_some_and(|p| p.contains('.'))
    }

    /// The nickname portion of a hostmask prefix, or the whole prefix when
    /// no host separator is present.
    pub fn source_nickname(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split('!').next().unwrap_or(prefix))
    }
}

/// Structural equality: raw bytes and timestamps are ignored so that a
/// reparsed canonical form compares equal to the original.
impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.tags == other.tags
            && self.prefix == other.prefix
            && self.command == other.command
            && self.params == other.params
    }
}

impl Eq for Message {}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        Message::parse(s)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

fn skip_spaces(line: &str, mut pos: usize) -> usize {
    let bytes = line.as_bytes();
    while pos < bytes.len() && bytes[pos] == b' ' {
        pos += 1;
    }
    pos
}

fn invalid(raw: &str, cause: MessageParseError) -> ProtocolError {
    ProtocolError::InvalidMessage {
        string: raw.to_owned(),
        cause,
    }
}
