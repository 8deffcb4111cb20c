//! The Bancho client: connection handshake, the read loop, outbound
//! sends, and lobby command handles.

use std::sync::Arc;

use bancho_proto::{Message, PrivateMessage};
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tracing::{debug, warn};

use crate::banchobot;
use crate::channel::{ChannelKind, ChannelRegistry};
use crate::config::BanchoClientConfig;
use crate::error::{BanchoError, Result};
use crate::events::{Event, LobbyEvent};
use crate::multiplayer::{GameMode, LobbyFormat, Mods, MultiplayerLobby, WinCondition};
use crate::ratelimit::SlidingWindowLimiter;
use crate::transport::{Connector, LineReader, LineWriter, TcpConnector};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Reply codes Bancho uses during the session handshake.
const RPL_WELCOME: &str = "001";
const ERR_NOSUCHCHANNEL: &str = "403";
const ERR_PASSWDMISMATCH: &str = "464";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Disconnected,
    Connected,
    Authenticated,
}

struct SessionState {
    phase: Phase,
    registry: ChannelRegistry,
}

struct ClientInner {
    config: BanchoClientConfig,
    connector: Box<dyn Connector>,
    reader: AsyncMutex<Option<Box<dyn LineReader>>>,
    writer: AsyncMutex<Option<Box<dyn LineWriter>>>,
    limiter: AsyncMutex<SlidingWindowLimiter>,
    state: parking_lot::Mutex<SessionState>,
    events: broadcast::Sender<Event>,
}

/// Handle to a Bancho session. Cheap to clone; all clones share one
/// connection, registry, and event bus.
#[derive(Clone)]
pub struct BanchoClient {
    inner: Arc<ClientInner>,
}

impl BanchoClient {
    /// Create a client using the default TCP connector.
    pub fn new(config: BanchoClientConfig) -> Self {
        Self::with_connector(config, Box::new(TcpConnector))
    }

    /// Create a client with a custom transport, for tests or proxies.
    pub fn with_connector(config: BanchoClientConfig, connector: Box<dyn Connector>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let limiter = SlidingWindowLimiter::new(config.effective_rate_limit());
        Self {
            inner: Arc::new(ClientInner {
                config,
                connector,
                reader: AsyncMutex::new(None),
                writer: AsyncMutex::new(None),
                limiter: AsyncMutex::new(limiter),
                state: parking_lot::Mutex::new(SessionState {
                    phase: Phase::Disconnected,
                    registry: ChannelRegistry::new(),
                }),
                events,
            }),
        }
    }

    /// Subscribe to the event bus.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &BanchoClientConfig {
        &self.inner.config
    }

    /// The IRC spelling of the local username (spaces underscored).
    pub fn username(&self) -> String {
        self.inner.config.credentials.username.replace(' ', "_")
    }

    /// Whether the server accepted our credentials.
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.lock().phase == Phase::Authenticated
    }

    /// Whether the named channel is in the registry.
    pub fn contains_channel(&self, name: &str) -> bool {
        self.inner.state.lock().registry.contains(name)
    }

    /// Snapshot of a channel's retained message history.
    pub fn channel_history(&self, name: &str) -> Option<Vec<PrivateMessage>> {
        match self.inner.state.lock().registry.get(name) {
            Some(ChannelKind::Plain(c)) => Some(c.message_history.clone()),
            Some(ChannelKind::Lobby(l)) => Some(l.message_history.clone()),
            None => None,
        }
    }

    /// Snapshot of a lobby's current state, if the name is a joined
    /// lobby channel.
    pub fn lobby_snapshot(&self, channel: &str) -> Option<MultiplayerLobby> {
        match self.inner.state.lock().registry.get(channel) {
            Some(ChannelKind::Lobby(l)) => Some(l.clone()),
            _ => None,
        }
    }

    /// Handle for issuing `!mp` commands against a joined lobby.
    pub fn lobby(&self, channel: &str) -> Option<LobbyHandle> {
        self.lobby_snapshot(channel).map(|l| LobbyHandle {
            client: self.clone(),
            channel: l.channel().to_owned(),
        })
    }

    fn emit(&self, event: Event) {
        let _ = self.inner.events.send(event);
    }

    fn emit_lobby(&self, channel: &str, events: Vec<LobbyEvent>) {
        for event in events {
            self.emit(Event::Lobby {
                channel: channel.to_owned(),
                event,
            });
        }
    }

    /// Open the transport and perform the PASS/NICK/USER handshake.
    ///
    /// A no-op when already connected. Authentication happens
    /// asynchronously: the server's verdict arrives in [`run`](Self::run).
    pub async fn connect(&self) -> Result<()> {
        {
            let writer = self.inner.writer.lock().await;
            if writer.is_some() {
                return Ok(());
            }
        }
        let (reader, writer) = self
            .inner
            .connector
            .connect(&self.inner.config.host, self.inner.config.port)
            .await?;
        *self.inner.reader.lock().await = Some(reader);
        *self.inner.writer.lock().await = Some(writer);
        self.inner.state.lock().phase = Phase::Connected;
        self.emit(Event::Connected);

        let username = self.username();
        let password = self.inner.config.credentials.password.clone();
        self.send_unchecked(&format!("PASS {password}")).await?;
        self.send_unchecked(&format!("NICK {username}")).await?;
        self.send_unchecked(&format!("USER {username}")).await?;
        Ok(())
    }

    /// Drive the read loop until EOF or a fatal error.
    ///
    /// Returns `Ok(())` when the transport closes and
    /// `Err(BanchoError::Authentication)` when the server rejects the
    /// credentials.
    pub async fn run(&self) -> Result<()> {
        let mut reader = self
            .inner
            .reader
            .lock()
            .await
            .take()
            .ok_or(BanchoError::NotConnected)?;

        loop {
            let line = match reader.read_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.finish_disconnect().await;
                    return Ok(());
                }
                Err(e) => {
                    self.finish_disconnect().await;
                    return Err(e);
                }
            };
            debug!(line = %line, "inbound");
            let message = match Message::parse(&line) {
                Ok(m) => m,
                Err(e) => {
                    warn!(line = %line, error = %e, "dropping unparseable line");
                    continue;
                }
            };
            if !self.handle(message).await? {
                self.finish_disconnect().await;
                return Err(BanchoError::Authentication);
            }
        }
    }

    /// Dispatch one inbound message. Returns `false` on fatal
    /// authentication failure.
    async fn handle(&self, message: Message) -> Result<bool> {
        // The keepalive answer comes before the ignore filter so that
        // ignoring PING cannot kill the session.
        if message.command == "PING" {
            self.emit(Event::PingReceived);
            let pong = Message::from_parts(None, "PONG", message.params.clone());
            self.send_unchecked(&pong.to_line()).await?;
        }
        if self.inner.config.is_ignored(&message.command) {
            return Ok(true);
        }
        self.emit(Event::Message(message.clone()));

        match message.command.as_str() {
            RPL_WELCOME => {
                self.inner.state.lock().phase = Phase::Authenticated;
                self.emit(Event::Authenticated);
            }
            ERR_PASSWDMISMATCH => {
                self.emit(Event::AuthenticationFailed);
                return Ok(false);
            }
            ERR_NOSUCHCHANNEL => self.handle_join_failure(&message),
            "PRIVMSG" => self.handle_privmsg(message),
            _ => {}
        }
        Ok(true)
    }

    /// Reply 403: evict the named channel. Failed whispers to offline
    /// users arrive under the same code with a plain username; those are
    /// not registry channels and are skipped.
    fn handle_join_failure(&self, message: &Message) {
        let Some(name) = message
            .params
            .iter()
            .find(|p| p.starts_with('#'))
            .cloned()
        else {
            return;
        };
        self.inner.state.lock().registry.remove(&name);
        self.emit(Event::ChannelJoinFailure(name));
    }

    fn handle_privmsg(&self, message: Message) {
        let username = self.username();
        let pm = match PrivateMessage::from_message(message, &username) {
            Ok(pm) => pm,
            Err(e) => {
                warn!(error = %e, "dropping malformed PRIVMSG");
                return;
            }
        };
        self.emit(Event::PrivateMessage(pm.clone()));
        if pm.is_direct {
            self.emit(Event::DirectMessage(pm.clone()));
        }

        // A first whisper from an unknown sender opens a query
        // conversation.
        let mut queried = false;
        {
            let mut state = self.inner.state.lock();
            if pm.is_direct && !state.registry.contains(&pm.sender) {
                state.registry.add(&pm.sender);
                queried = true;
            }
            if self.inner.config.save_message_history {
                let key = if pm.is_direct { &pm.sender } else { &pm.recipient };
                match state.registry.get_mut(key) {
                    Some(ChannelKind::Plain(c)) => c.message_history.push(pm.clone()),
                    Some(ChannelKind::Lobby(l)) => l.message_history.push(pm.clone()),
                    None => {}
                }
            }
        }
        if queried {
            self.emit(Event::UserQueried(pm.sender.clone()));
        }

        if !pm.is_banchobot() {
            return;
        }
        if pm.is_direct {
            self.handle_banchobot_direct(&pm);
        } else {
            let events = {
                let mut state = self.inner.state.lock();
                state
                    .registry
                    .lobby_mut(&pm.recipient)
                    .map(|lobby| lobby.apply(&pm.content))
            };
            if let Some(events) = events {
                self.emit_lobby(&pm.recipient, events);
            }
        }
    }

    fn handle_banchobot_direct(&self, pm: &PrivateMessage) {
        let Some(created) = banchobot::parse_tournament_creation(&pm.content) else {
            return;
        };
        let channel = created.channel();
        let lobby = MultiplayerLobby::new(created.id, created.name.clone());
        let added = self.inner.state.lock().registry.add_lobby(lobby);
        if added {
            self.emit(Event::LobbyCreated {
                channel: channel.clone(),
                id: created.id,
                name: created.name,
            });
            self.emit(Event::ChannelJoined(channel));
        }
    }

    async fn finish_disconnect(&self) {
        *self.inner.writer.lock().await = None;
        let was_connected = {
            let mut state = self.inner.state.lock();
            let was = state.phase != Phase::Disconnected;
            state.phase = Phase::Disconnected;
            was
        };
        if was_connected {
            self.emit(Event::Disconnected);
        }
    }

    /// Announce QUIT and close the transport. The server closes its end
    /// in response, which unblocks a running read loop.
    pub async fn disconnect(&self) {
        let _ = self.send_unchecked("QUIT").await;
        self.finish_disconnect().await;
    }

    /// Send a raw protocol line. Requires an authenticated session.
    pub async fn send_raw(&self, line: &str) -> Result<()> {
        match self.inner.state.lock().phase {
            Phase::Disconnected => return Err(BanchoError::NotConnected),
            Phase::Connected => return Err(BanchoError::NotAuthenticated),
            Phase::Authenticated => {}
        }
        self.send_unchecked(line).await
    }

    /// Rate-limited write without the authentication gate. Handshake and
    /// keepalive traffic comes through here.
    async fn send_unchecked(&self, line: &str) -> Result<()> {
        self.inner.limiter.lock().await.acquire().await;
        {
            let mut writer = self.inner.writer.lock().await;
            let writer = writer.as_mut().ok_or(BanchoError::NotConnected)?;
            writer.write_line(line).await?;
        }
        let redacted = line.replace(&self.inner.config.credentials.password, "<redacted>");
        self.emit(Event::Sent(redacted));
        Ok(())
    }

    /// Send a chat message to a channel or user.
    pub async fn send_private(&self, target: &str, content: &str) -> Result<()> {
        // A leading colon would be swallowed server-side; double it and
        // let the receiving parser undo the escape.
        let escaped = if content.starts_with(':') {
            format!(":{content}")
        } else {
            content.to_owned()
        };
        self.send_raw(&format!("PRIVMSG {target} :{escaped}")).await
    }

    /// Join a channel. Idempotent against the registry; `#mp_<digits>`
    /// names become lobby entries.
    pub async fn join(&self, channel: &str) -> Result<()> {
        let wire_name = channel.replace(' ', "_");
        self.send_raw(&format!("JOIN {wire_name}")).await?;
        let added = self.inner.state.lock().registry.add(channel);
        if added {
            self.emit(Event::ChannelJoined(wire_name));
        }
        Ok(())
    }

    /// Part a channel and drop it from the registry.
    pub async fn part(&self, channel: &str) -> Result<()> {
        let wire_name = channel.replace(' ', "_");
        self.send_raw(&format!("PART {wire_name}")).await?;
        let removed = self.inner.state.lock().registry.remove(channel);
        if removed.is_some() {
            self.emit(Event::ChannelParted(wire_name));
        }
        Ok(())
    }

    /// Open a query conversation with a user. No protocol traffic is
    /// involved; queries are a client-side construct.
    pub fn query(&self, user: &str) {
        let added = self.inner.state.lock().registry.add(user);
        if added {
            self.emit(Event::UserQueried(user.to_owned()));
        }
    }

    /// Ask BanchoBot to create a tournament lobby. The lobby enters the
    /// registry when the bot's confirmation arrives on the read loop.
    pub async fn make_tournament_lobby(&self, name: &str, private: bool) -> Result<()> {
        self.query(bancho_proto::BANCHO_BOT);
        let command = if private { "!mp makeprivate" } else { "!mp make" };
        self.send_private(bancho_proto::BANCHO_BOT, &format!("{command} {name}"))
            .await
    }
}

impl std::fmt::Debug for BanchoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BanchoClient")
            .field("host", &self.inner.config.host)
            .field("username", &self.inner.config.credentials.username)
            .finish_non_exhaustive()
    }
}

/// Issues `!mp` commands against one joined lobby.
///
/// Each method sends the fixed command template and optimistically
/// applies the part of the outcome that is deterministic from the
/// command alone, without waiting for the bot's confirmation.
#[derive(Clone, Debug)]
pub struct LobbyHandle {
    client: BanchoClient,
    channel: String,
}

impl LobbyHandle {
    /// The lobby's channel name.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Snapshot of the lobby's current state.
    pub fn snapshot(&self) -> Option<MultiplayerLobby> {
        self.client.lobby_snapshot(&self.channel)
    }

    async fn command(&self, text: &str) -> Result<()> {
        self.client.send_private(&self.channel, text).await
    }

    fn mutate(&self, f: impl FnOnce(&mut MultiplayerLobby) -> Option<LobbyEvent>) {
        let event = {
            let mut state = self.client.inner.state.lock();
            state.registry.lobby_mut(&self.channel).and_then(f)
        };
        if let Some(event) = event {
            self.client
                .emit_lobby(&self.channel, vec![event, LobbyEvent::StateChanged]);
        }
    }

    /// `!mp set`: change format, win condition, and size in one command.
    /// Unspecified fields keep their current values.
    pub async fn update_settings(
        &self,
        format: Option<LobbyFormat>,
        win_condition: Option<WinCondition>,
        size: Option<u32>,
    ) -> Result<()> {
        let current = self.snapshot().ok_or(BanchoError::NotConnected)?;
        let format = format.unwrap_or(current.format);
        let win = win_condition.unwrap_or(current.win_condition);
        let size = size.unwrap_or(current.size);
        self.command(&format!("!mp set {} {} {size}", format.code(), win.code()))
            .await
    }

    /// `!mp settings`: request the full settings dump. The reply replays
    /// through the notification catalog.
    pub async fn display_settings(&self) -> Result<()> {
        self.command("!mp settings").await
    }

    /// `!mp abort`: abort the running match.
    pub async fn abort(&self) -> Result<()> {
        self.command("!mp abort").await
    }

    /// `!mp aborttimer`: cancel any running countdown.
    pub async fn abort_timer(&self) -> Result<()> {
        self.command("!mp aborttimer").await?;
        self.mutate(|l| {
            l.lobby_timer_end = None;
            l.match_start_timer_end = None;
            Some(LobbyEvent::TimerAborted)
        });
        Ok(())
    }

    /// `!mp size N`.
    pub async fn set_size(&self, size: u32) -> Result<()> {
        self.command(&format!("!mp size {size}")).await?;
        self.mutate(|l| {
            if l.size == size {
                return None;
            }
            l.size = size;
            Some(LobbyEvent::SizeChanged(size))
        });
        Ok(())
    }

    /// `!mp move <name> <slot>`.
    pub async fn move_player(&self, name: &str, slot: u32) -> Result<()> {
        self.command(&format!("!mp move {} {slot}", underscored(name)))
            .await
    }

    /// `!mp name <name>`.
    pub async fn rename(&self, name: &str) -> Result<()> {
        self.command(&format!("!mp name {name}")).await?;
        let name = name.to_owned();
        self.mutate(move |l| {
            if l.name == name {
                return None;
            }
            l.name = name.clone();
            Some(LobbyEvent::NameChanged(name))
        });
        Ok(())
    }

    /// `!mp invite <name>`.
    pub async fn invite(&self, name: &str) -> Result<()> {
        self.command(&format!("!mp invite {}", underscored(name))).await
    }

    /// `!mp lock`: freeze slots and teams.
    pub async fn lock(&self) -> Result<()> {
        self.command("!mp lock").await?;
        self.mutate(|l| {
            if l.is_locked {
                return None;
            }
            l.is_locked = true;
            Some(LobbyEvent::Locked)
        });
        Ok(())
    }

    /// `!mp unlock`.
    pub async fn unlock(&self) -> Result<()> {
        self.command("!mp unlock").await?;
        self.mutate(|l| {
            if !l.is_locked {
                return None;
            }
            l.is_locked = false;
            Some(LobbyEvent::Unlocked)
        });
        Ok(())
    }

    /// `!mp close`: close the lobby. Terminal; the entry leaves the
    /// registry immediately.
    pub async fn close(&self) -> Result<()> {
        self.command("!mp close").await?;
        let removed = {
            let mut state = self.client.inner.state.lock();
            if let Some(l) = state.registry.lobby_mut(&self.channel) {
                l.is_closed = true;
            }
            state.registry.remove(&self.channel).is_some()
        };
        if removed {
            self.client
                .emit_lobby(&self.channel, vec![LobbyEvent::Closed, LobbyEvent::StateChanged]);
            self.client.emit(Event::ChannelParted(self.channel.clone()));
        }
        Ok(())
    }

    /// `!mp clearhost`.
    pub async fn clear_host(&self) -> Result<()> {
        self.command("!mp clearhost").await?;
        self.mutate(|l| {
            if l.host.is_none() {
                return None;
            }
            l.host = None;
            Some(LobbyEvent::HostChanged(None))
        });
        Ok(())
    }

    /// `!mp host <name>`.
    pub async fn set_host(&self, name: &str) -> Result<()> {
        self.command(&format!("!mp host {}", underscored(name))).await
    }

    /// `!mp mods <list>`: set the room mods, spelled long form.
    pub async fn set_mods(&self, mods: Mods) -> Result<()> {
        let mut args = Vec::new();
        for (m, long, _) in Mods::NAMED {
            if mods.contains(*m) {
                args.push(*long);
            }
        }
        if args.is_empty() {
            self.command("!mp mods None").await
        } else {
            self.command(&format!("!mp mods {}", args.join(" "))).await
        }
    }

    /// `!mp timer N`: start the lobby countdown.
    pub async fn set_timer(&self, seconds: u32) -> Result<()> {
        self.command(&format!("!mp timer {seconds}")).await?;
        self.mutate(move |l| {
            l.lobby_timer_end =
                Some(chrono::Utc::now() + chrono::Duration::seconds(i64::from(seconds)));
            Some(LobbyEvent::LobbyTimerStarted(seconds))
        });
        Ok(())
    }

    /// `!mp start N`: start the match after a countdown.
    pub async fn set_start_timer(&self, seconds: u32) -> Result<()> {
        self.command(&format!("!mp start {seconds}")).await?;
        self.mutate(move |l| {
            l.match_start_timer_end =
                Some(chrono::Utc::now() + chrono::Duration::seconds(i64::from(seconds)));
            Some(LobbyEvent::MatchStartTimerStarted(seconds))
        });
        Ok(())
    }

    /// `!mp start`: start the match immediately.
    pub async fn start(&self) -> Result<()> {
        self.command("!mp start").await
    }

    /// `!mp kick <name>`: kick a player, removing them locally.
    pub async fn kick(&self, name: &str) -> Result<()> {
        self.command(&format!("!mp kick {}", underscored(name))).await?;
        let name = name.to_owned();
        self.mutate(move |l| {
            if l.player(&name).is_none() {
                return None;
            }
            l.players.retain(|p| !p.is_named(&name));
            Some(LobbyEvent::PlayerKicked(name))
        });
        Ok(())
    }

    /// `!mp ban <name>`.
    pub async fn ban(&self, name: &str) -> Result<()> {
        self.command(&format!("!mp ban {}", underscored(name))).await
    }

    /// `!mp addref <names>`: grant referee status, appending the names to
    /// the local roster. The bot never announces roster changes, so the
    /// roster is maintained from our own commands only.
    pub async fn add_referees(&self, names: &[&str]) -> Result<()> {
        let wire: Vec<String> = names.iter().map(|n| underscored(n)).collect();
        self.command(&format!("!mp addref {}", wire.join(" "))).await?;
        let changed = {
            let mut state = self.client.inner.state.lock();
            match state.registry.lobby_mut(&self.channel) {
                Some(l) => {
                    let mut changed = false;
                    for name in names {
                        if !l.referees.iter().any(|r| r.eq_ignore_ascii_case(name)) {
                            l.referees.push((*name).to_owned());
                            changed = true;
                        }
                    }
                    changed
                }
                None => false,
            }
        };
        if changed {
            self.client
                .emit_lobby(&self.channel, vec![LobbyEvent::StateChanged]);
        }
        Ok(())
    }

    /// `!mp removeref <names>`: revoke referee status, dropping the names
    /// from the local roster.
    pub async fn remove_referees(&self, names: &[&str]) -> Result<()> {
        let wire: Vec<String> = names.iter().map(|n| underscored(n)).collect();
        self.command(&format!("!mp removeref {}", wire.join(" "))).await?;
        let changed = {
            let mut state = self.client.inner.state.lock();
            match state.registry.lobby_mut(&self.channel) {
                Some(l) => {
                    let before = l.referees.len();
                    l.referees
                        .retain(|r| !names.iter().any(|n| r.eq_ignore_ascii_case(n)));
                    l.referees.len() != before
                }
                None => false,
            }
        };
        if changed {
            self.client
                .emit_lobby(&self.channel, vec![LobbyEvent::StateChanged]);
        }
        Ok(())
    }

    /// `!mp map <id> [mode]`.
    pub async fn set_map(&self, beatmap_id: u32, mode: Option<GameMode>) -> Result<()> {
        match mode {
            Some(mode) => {
                self.command(&format!("!mp map {beatmap_id} {}", mode.code()))
                    .await
            }
            None => self.command(&format!("!mp map {beatmap_id}")).await,
        }
    }

    /// `!mp help`.
    pub async fn send_help(&self) -> Result<()> {
        self.command("!mp help").await
    }
}

fn underscored(name: &str) -> String {
    name.replace(' ', "_")
}
