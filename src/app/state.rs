use crate::app::action::Action;
use crate::app::event::ServerId;
use crate::config::{AppConfig, ServerConfig};
use crate::group::host::{ChannelKey, ChatEvent, EventKind, Host, HostPrefs};
use crate::group::{is_channel_shaped, GroupRegistry};
use chrono::Local;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tracing::warn;

/// How long a status bar notice stays up.
const STATUS_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BufferKey {
    ServerStatus(ServerId),
    Channel(ServerId, String),
    Query(ServerId, String),
    Group(String),
}

impl BufferKey {
    pub fn server_id(&self) -> Option<ServerId> {
        match self {
            BufferKey::ServerStatus(id) | BufferKey::Channel(id, _) | BufferKey::Query(id, _) => Some(*id),
            BufferKey::Group(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub timestamp: String,
    pub sender: String,
    pub text: String,
    pub kind: MessageKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MessageKind {
    Normal,
    Action,
    Notice,
    System,
    Error,
    Join,
    Part,
    Quit,
    /// Pre-rendered line carrying mIRC codes. Text before the first tab is
    /// the nick column.
    Formatted,
}

#[derive(Debug, Default)]
pub struct Buffer {
    pub messages: Vec<Message>,
    pub scroll_offset: usize,
    pub unread_count: usize,
    pub has_mention: bool,
}

impl Buffer {
    pub fn add_message(&mut self, msg: Message, max_scrollback: usize) {
        self.messages.push(msg);
        if self.messages.len() > max_scrollback {
            self.messages.remove(0);
            if self.scroll_offset > 0 {
                self.scroll_offset = self.scroll_offset.saturating_sub(1);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug)]
pub struct ServerState {
    pub id: ServerId,
    /// Configured server name, which is also the network name groups use.
    pub name: String,
    pub host: String,
    pub nickname: String,
    pub status: ConnectionStatus,
    pub channels: Vec<String>,
    pub users: HashMap<String, Vec<ChannelUser>>,
    pub topics: HashMap<String, String>,
}

impl ServerState {
    pub fn from_config(id: ServerId, cfg: &ServerConfig) -> Self {
        Self {
            id,
            name: cfg.name.clone(),
            host: cfg.host.clone(),
            nickname: cfg.nickname.clone(),
            status: ConnectionStatus::Connecting,
            channels: Vec::new(),
            users: HashMap::new(),
            topics: HashMap::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn joined(&self, channel: &str) -> Option<&str> {
        self.channels
            .iter()
            .find(|c| c.eq_ignore_ascii_case(channel))
            .map(String::as_str)
    }

    pub fn is_own_nick(&self, nick: &str) -> bool {
        self.nickname.eq_ignore_ascii_case(nick)
    }

    /// Drop everything that only lives as long as the connection.
    pub fn reset_session(&mut self) {
        self.channels.clear();
        self.users.clear();
        self.topics.clear();
    }
}

#[derive(Debug, Clone)]
pub struct ChannelUser {
    pub nick: String,
    pub prefix: String, // "@", "+", etc.
}

#[derive(Debug, Default)]
pub struct InputState {
    pub text: String,
    pub cursor: usize,
    pub history: Vec<String>,
    pub history_index: Option<usize>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the line and put the cursor at its end.
    pub fn set_text(&mut self, text: String) {
        self.text = text;
        self.cursor = self.text.len();
    }

    pub fn insert_char(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn delete_back(&mut self) {
        if self.cursor > 0 {
            let prev = self.text[..self.cursor]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.text.drain(prev..self.cursor);
            self.cursor = prev;
        }
    }

    pub fn delete_forward(&mut self) {
        if self.cursor < self.text.len() {
            let next = self.text[self.cursor..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| self.cursor + i)
                .unwrap_or(self.text.len());
            self.text.drain(self.cursor..next);
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor = self.text[..self.cursor]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.text.len() {
            self.cursor = self.text[self.cursor..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| self.cursor + i)
                .unwrap_or(self.text.len());
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.len();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn remember(&mut self, text: &str) {
        self.history_index = None;
        if !text.is_empty() && self.history.last().map(String::as_str) != Some(text) {
            self.history.push(text.to_string());
        }
    }

    pub fn take_text(&mut self) -> String {
        let text = std::mem::take(&mut self.text);
        self.cursor = 0;
        self.remember(&text);
        text
    }

    pub fn history_up(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let idx = match self.history_index {
            Some(i) if i > 0 => i - 1,
            Some(_) => return,
            None => self.history.len() - 1,
        };
        self.history_index = Some(idx);
        self.set_text(self.history[idx].clone());
    }

    pub fn history_down(&mut self) {
        match self.history_index {
            Some(i) if i + 1 < self.history.len() => {
                let idx = i + 1;
                self.history_index = Some(idx);
                self.set_text(self.history[idx].clone());
            }
            Some(_) => {
                self.history_index = None;
                self.clear();
            }
            None => {}
        }
    }

    pub fn delete_word_back(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let mut pos = self.cursor;
        while pos > 0 && self.text.as_bytes().get(pos - 1) == Some(&b' ') {
            pos -= 1;
        }
        while pos > 0 && self.text.as_bytes().get(pos - 1) != Some(&b' ') {
            pos -= 1;
        }
        self.text.drain(pos..self.cursor);
        self.cursor = pos;
    }
}

/// Everything the client knows about servers, buffers and compose lines.
///
/// This is the [`Host`] the group core runs against.
pub struct ClientState {
    pub config: AppConfig,
    pub prefs: HostPrefs,
    pub servers: Vec<ServerState>,
    pub buffers: BTreeMap<BufferKey, Buffer>,
    pub inputs: HashMap<BufferKey, InputState>,
    pub active_buffer: Option<BufferKey>,
    pub next_server_id: ServerId,
    /// Actions queued by host callbacks, drained by the handler.
    pub pending_actions: Vec<Action>,
    /// Our own outgoing messages, to be rendered into groups.
    pub pending_echo: Vec<ChatEvent>,
    /// Messages added since the last drain, for transcripts.
    pub new_messages: Vec<(BufferKey, Message)>,
    pub should_quit: bool,
    pub quit_message: Option<String>,
    pub dirty: bool,
    pub status_message: Option<(String, Instant)>,
    pub timestamp_format: String,
    scratch_input: InputState,
}

impl ClientState {
    pub fn new(config: AppConfig) -> Self {
        let timestamp_format = config.ui.timestamp_format.clone();
        let prefs = HostPrefs {
            indent_nicks: config.ui.indent_nicks,
            strip_nick_colors: config.ui.strip_nick_colors,
            completion_suffix: config.ui.completion_suffix.clone(),
        };
        Self {
            config,
            prefs,
            servers: Vec::new(),
            buffers: BTreeMap::new(),
            inputs: HashMap::new(),
            active_buffer: None,
            next_server_id: 0,
            pending_actions: Vec::new(),
            pending_echo: Vec::new(),
            new_messages: Vec::new(),
            should_quit: false,
            quit_message: None,
            dirty: true,
            status_message: None,
            timestamp_format,
            scratch_input: InputState::new(),
        }
    }

    pub fn allocate_server_id(&mut self) -> ServerId {
        let id = self.next_server_id;
        self.next_server_id += 1;
        id
    }

    pub fn add_server(&mut self, server: ServerState) {
        let key = BufferKey::ServerStatus(server.id);
        self.buffers.entry(key.clone()).or_default();
        if self.active_buffer.is_none() {
            self.active_buffer = Some(key);
        }
        self.servers.push(server);
        self.dirty = true;
    }

    pub fn get_server(&self, id: ServerId) -> Option<&ServerState> {
        self.servers.iter().find(|s| s.id == id)
    }

    pub fn get_server_mut(&mut self, id: ServerId) -> Option<&mut ServerState> {
        self.servers.iter_mut().find(|s| s.id == id)
    }

    pub fn server_by_name(&self, name: &str) -> Option<&ServerState> {
        self.servers.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    fn server_for_network(&self, network: &str) -> Option<&ServerState> {
        self.servers.iter().find(|s| s.name == network)
    }

    pub fn ensure_buffer(&mut self, key: BufferKey) -> &mut Buffer {
        self.buffers.entry(key).or_default()
    }

    pub fn add_message_to_buffer(&mut self, key: &BufferKey, msg: Message) {
        let max = self.config.ui.max_scrollback;
        let is_active = self.active_buffer.as_ref() == Some(key);
        self.new_messages.push((key.clone(), msg.clone()));
        let buf = self.buffers.entry(key.clone()).or_default();
        buf.add_message(msg, max);
        if !is_active {
            buf.unread_count += 1;
        }
        self.dirty = true;
    }

    fn now_stamp(&self) -> String {
        Local::now().format(&self.timestamp_format).to_string()
    }

    pub fn system_message(&mut self, key: &BufferKey, text: String) {
        let msg = Message {
            timestamp: self.now_stamp(),
            sender: "***".to_string(),
            text,
            kind: MessageKind::System,
        };
        self.add_message_to_buffer(key, msg);
    }

    pub fn error_message(&mut self, key: &BufferKey, text: String) {
        let msg = Message {
            timestamp: self.now_stamp(),
            sender: "!!!".to_string(),
            text,
            kind: MessageKind::Error,
        };
        self.add_message_to_buffer(key, msg);
    }

    /// Report to the active buffer, or the status bar when there is none.
    pub fn notify(&mut self, text: String, error: bool) {
        match self.active_buffer.clone() {
            Some(key) if error => self.error_message(&key, text),
            Some(key) => self.system_message(&key, text),
            None => self.set_status(text),
        }
    }

    pub fn set_status(&mut self, text: String) {
        self.status_message = Some((text, Instant::now()));
        self.dirty = true;
    }

    pub fn expire_status(&mut self, now: Instant) {
        if let Some((_, at)) = &self.status_message {
            if now.duration_since(*at) >= STATUS_TTL {
                self.status_message = None;
                self.dirty = true;
            }
        }
    }

    pub fn set_active_buffer(&mut self, key: BufferKey) {
        if let Some(buf) = self.buffers.get_mut(&key) {
            buf.unread_count = 0;
            buf.has_mention = false;
        }
        self.active_buffer = Some(key);
        self.dirty = true;
    }

    pub fn active_server_id(&self) -> Option<ServerId> {
        self.active_buffer.as_ref().and_then(BufferKey::server_id)
    }

    pub fn active_group(&self) -> Option<&str> {
        match &self.active_buffer {
            Some(BufferKey::Group(name)) => Some(name),
            _ => None,
        }
    }

    pub fn input(&self) -> &InputState {
        self.active_buffer
            .as_ref()
            .and_then(|k| self.inputs.get(k))
            .unwrap_or(&self.scratch_input)
    }

    /// Compose line of the active buffer.
    pub fn input_mut(&mut self) -> &mut InputState {
        match self.active_buffer.clone() {
            Some(key) => self.inputs.entry(key).or_default(),
            None => &mut self.scratch_input,
        }
    }

    /// Buffers in display order: each server followed by its channels and
    /// queries, then groups.
    pub fn buffer_order(&self) -> Vec<BufferKey> {
        let mut keys = Vec::with_capacity(self.buffers.len());
        for srv in &self.servers {
            keys.extend(
                self.buffers
                    .keys()
                    .filter(|k| k.server_id() == Some(srv.id))
                    .cloned(),
            );
        }
        keys.extend(
            self.buffers
                .keys()
                .filter(|k| matches!(k, BufferKey::Group(_)))
                .cloned(),
        );
        keys
    }

    pub fn select_next_buffer(&mut self) {
        self.step_buffer(1);
    }

    pub fn select_prev_buffer(&mut self) {
        self.step_buffer(-1);
    }

    fn step_buffer(&mut self, step: isize) {
        let keys = self.buffer_order();
        if keys.is_empty() {
            return;
        }
        let current = self
            .active_buffer
            .as_ref()
            .and_then(|k| keys.iter().position(|x| x == k))
            .unwrap_or(0) as isize;
        let next = (current + step).rem_euclid(keys.len() as isize) as usize;
        self.set_active_buffer(keys[next].clone());
    }

    pub fn status_line(&self) -> String {
        if let Some((msg, _)) = &self.status_message {
            return msg.clone();
        }
        let connected = self.servers.iter().filter(|s| s.is_connected()).count();
        let groups = self
            .buffers
            .keys()
            .filter(|k| matches!(k, BufferKey::Group(_)))
            .count();
        format!("Servers: {}/{} | Groups: {}", connected, self.servers.len(), groups)
    }

    /// Mode prefix (`@`, `+`, ...) of a nick in a channel.
    pub fn mode_prefix(&self, server_id: ServerId, channel: &str, nick: &str) -> String {
        self.get_server(server_id)
            .and_then(|srv| srv.users.get(channel))
            .and_then(|users| users.iter().find(|u| u.nick.eq_ignore_ascii_case(nick)))
            .map(|u| u.prefix.clone())
            .unwrap_or_default()
    }

    /// Queue an outgoing message or action, show it in its own buffer and
    /// queue the echo for groups.
    pub fn send_text(&mut self, server_id: ServerId, target: &str, text: &str, action: bool) {
        let Some(srv) = self.get_server(server_id) else {
            return;
        };
        let nick = srv.nickname.clone();
        let network = srv.name.clone();
        let key = if is_channel_shaped(target) {
            BufferKey::Channel(server_id, target.to_string())
        } else {
            BufferKey::Query(server_id, target.to_string())
        };

        let msg = Message {
            timestamp: self.now_stamp(),
            sender: nick.clone(),
            text: text.to_string(),
            kind: if action { MessageKind::Action } else { MessageKind::Normal },
        };
        self.add_message_to_buffer(&key, msg);

        let (action, kind) = if action {
            (
                Action::SendAction { server_id, target: target.to_string(), text: text.to_string() },
                EventKind::OwnAction,
            )
        } else {
            (
                Action::SendMessage { server_id, target: target.to_string(), text: text.to_string() },
                EventKind::OwnMessage,
            )
        };
        self.pending_actions.push(action);

        let mode = self.mode_prefix(server_id, target, &nick);
        self.pending_echo.push(ChatEvent::new(
            ChannelKey::new(network, target),
            kind,
            vec![nick, text.to_string(), mode, String::new()],
        ));
    }

    /// Fall back to another buffer when the active one goes away.
    fn leave_buffer(&mut self, key: &BufferKey) {
        if self.active_buffer.as_ref() != Some(key) {
            return;
        }
        let fallback = key
            .server_id()
            .map(BufferKey::ServerStatus)
            .filter(|k| self.buffers.contains_key(k))
            .or_else(|| self.buffer_order().into_iter().next());
        match fallback {
            Some(k) => self.set_active_buffer(k),
            None => self.active_buffer = None,
        }
    }

    pub fn close_buffer(&mut self, key: &BufferKey) {
        self.buffers.remove(key);
        self.inputs.remove(key);
        self.leave_buffer(key);
        self.dirty = true;
    }
}

/// Build a raw IRC line for a command the client has no verb for. The
/// channel becomes the first argument unless the arguments already name one.
pub fn raw_with_channel(verb: &str, rest: &str, channel: &str) -> String {
    let verb = verb.to_ascii_uppercase();
    let names_channel = rest.split_whitespace().next().is_some_and(is_channel_shaped);
    let line = if names_channel || !is_channel_shaped(channel) {
        format!("{} {}", verb, rest)
    } else {
        format!("{} {} {}", verb, channel, rest)
    };
    line.trim_end().to_string()
}

impl Host for ClientState {
    fn context_exists(&self, key: &ChannelKey) -> bool {
        let Some(srv) = self.server_for_network(&key.network) else {
            return false;
        };
        srv.is_connected()
            && (srv.joined(&key.channel).is_some()
                || self.buffers.keys().any(|k| {
                    matches!(k, BufferKey::Query(id, nick) if *id == srv.id && nick.eq_ignore_ascii_case(&key.channel))
                }))
    }

    fn live_channels(&self) -> Vec<ChannelKey> {
        let mut live = Vec::new();
        for srv in self.servers.iter().filter(|s| s.is_connected()) {
            live.extend(srv.channels.iter().map(|c| ChannelKey::new(srv.name.clone(), c.clone())));
            live.extend(self.buffers.keys().filter_map(|k| match k {
                BufferKey::Query(id, nick) if *id == srv.id => Some(ChannelKey::new(srv.name.clone(), nick.clone())),
                _ => None,
            }));
        }
        live
    }

    fn roster(&self, key: &ChannelKey) -> Vec<String> {
        self.server_for_network(&key.network)
            .and_then(|srv| srv.users.get(&key.channel))
            .map(|users| users.iter().map(|u| u.nick.clone()).collect())
            .unwrap_or_default()
    }

    fn prefs(&self) -> &HostPrefs {
        &self.prefs
    }

    fn compose(&self, group: &str) -> String {
        self.inputs
            .get(&BufferKey::Group(group.to_string()))
            .map(|i| i.text.clone())
            .unwrap_or_default()
    }

    fn create_context(&mut self, group: &str) {
        let key = BufferKey::Group(group.to_string());
        self.inputs.entry(key.clone()).or_default();
        self.ensure_buffer(key);
        self.dirty = true;
    }

    fn focus_context(&mut self, group: &str) {
        let key = BufferKey::Group(group.to_string());
        if self.buffers.contains_key(&key) {
            self.set_active_buffer(key);
        }
    }

    fn close_context(&mut self, group: &str) {
        self.close_buffer(&BufferKey::Group(group.to_string()));
    }

    fn append_line(&mut self, group: &str, line: String) {
        let msg = Message {
            timestamp: self.now_stamp(),
            sender: String::new(),
            text: line,
            kind: MessageKind::Formatted,
        };
        self.add_message_to_buffer(&BufferKey::Group(group.to_string()), msg);
    }

    fn set_compose(&mut self, group: &str, text: String) {
        self.inputs
            .entry(BufferKey::Group(group.to_string()))
            .or_default()
            .set_text(text);
        self.dirty = true;
    }

    fn send_message(&mut self, key: &ChannelKey, text: &str) {
        match self.server_for_network(&key.network).map(|s| s.id) {
            Some(server_id) => self.send_text(server_id, &key.channel, text, false),
            None => warn!(channel = %key, "send to unknown network"),
        }
    }

    fn send_command(&mut self, key: &ChannelKey, command: &str) {
        let Some(server_id) = self.server_for_network(&key.network).map(|s| s.id) else {
            warn!(channel = %key, "command for unknown network");
            return;
        };
        let (verb, rest) = match command.split_once(' ') {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (command, ""),
        };
        let channel = key.channel.clone();
        let action = match verb.to_ascii_lowercase().as_str() {
            "me" => {
                self.send_text(server_id, &channel, rest, true);
                return;
            }
            "topic" if rest.is_empty() => Action::SendRaw { server_id, command: format!("TOPIC {}", channel) },
            "topic" => Action::SetTopic { server_id, channel, text: rest.to_string() },
            "part" | "leave" => Action::PartChannel {
                server_id,
                channel,
                reason: (!rest.is_empty()).then(|| rest.to_string()),
            },
            "mode" => Action::SendMode { server_id, target: channel, modes: rest.to_string() },
            "notice" => Action::SendNotice { server_id, target: channel, text: rest.to_string() },
            "raw" | "quote" => Action::SendRaw { server_id, command: rest.to_string() },
            _ => Action::SendRaw { server_id, command: raw_with_channel(verb, rest, &channel) },
        };
        self.pending_actions.push(action);
    }
}

/// The client plus the groups living in it.
///
/// Kept as two fields so a group call can borrow the client as its host.
pub struct AppState {
    pub client: ClientState,
    pub groups: GroupRegistry,
}

impl AppState {
    pub fn new(config: AppConfig, groups: GroupRegistry) -> Self {
        Self {
            client: ClientState::new(config),
            groups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_client() -> ClientState {
        let mut client = ClientState::new(AppConfig::default());
        let id = client.allocate_server_id();
        let cfg = ServerConfig::new("libera", "irc.libera.chat", 6697);
        let mut srv = ServerState::from_config(id, &cfg);
        srv.status = ConnectionStatus::Connected;
        srv.channels.push("#rust".to_string());
        srv.users.insert(
            "#rust".to_string(),
            vec![
                ChannelUser { nick: "crabmux".into(), prefix: "@".into() },
                ChannelUser { nick: "alice".into(), prefix: String::new() },
            ],
        );
        client.add_server(srv);
        client
    }

    #[test]
    fn test_context_exists_needs_connection() {
        let mut client = connected_client();
        let key = ChannelKey::new("libera", "#rust");
        assert!(client.context_exists(&key));
        assert!(client.context_exists(&ChannelKey::new("libera", "#RUST")));
        assert!(!client.context_exists(&ChannelKey::new("libera", "#nix")));
        assert!(!client.context_exists(&ChannelKey::new("oftc", "#rust")));

        client.ensure_buffer(BufferKey::Query(0, "bob".into()));
        assert!(client.context_exists(&ChannelKey::new("libera", "bob")));
        assert_eq!(client.live_channels().len(), 2);

        client.get_server_mut(0).unwrap().status = ConnectionStatus::Disconnected;
        assert!(!client.context_exists(&key));
        assert!(client.live_channels().is_empty());
    }

    #[test]
    fn test_send_message_queues_action_and_echo() {
        let mut client = connected_client();
        client.send_message(&ChannelKey::new("libera", "#rust"), "hello");

        assert_eq!(
            client.pending_actions,
            vec![Action::SendMessage { server_id: 0, target: "#rust".into(), text: "hello".into() }]
        );
        let echo = &client.pending_echo[0];
        assert_eq!(echo.kind, EventKind::OwnMessage);
        assert_eq!(echo.words, vec!["crabmux", "hello", "@", ""]);
        let buf = &client.buffers[&BufferKey::Channel(0, "#rust".into())];
        assert_eq!(buf.messages[0].text, "hello");
    }

    #[test]
    fn test_send_command_verbs() {
        let mut client = connected_client();
        let key = ChannelKey::new("libera", "#rust");

        client.send_command(&key, "me waves");
        client.send_command(&key, "topic new topic");
        client.send_command(&key, "topic");
        client.send_command(&key, "part bye");
        client.send_command(&key, "mode +m");
        client.send_command(&key, "raw PRIVMSG x :y");
        client.send_command(&key, "kick bob spam");

        assert_eq!(
            client.pending_actions,
            vec![
                Action::SendAction { server_id: 0, target: "#rust".into(), text: "waves".into() },
                Action::SetTopic { server_id: 0, channel: "#rust".into(), text: "new topic".into() },
                Action::SendRaw { server_id: 0, command: "TOPIC #rust".into() },
                Action::PartChannel { server_id: 0, channel: "#rust".into(), reason: Some("bye".into()) },
                Action::SendMode { server_id: 0, target: "#rust".into(), modes: "+m".into() },
                Action::SendRaw { server_id: 0, command: "PRIVMSG x :y".into() },
                Action::SendRaw { server_id: 0, command: "KICK #rust bob spam".into() },
            ]
        );
        assert_eq!(client.pending_echo[0].kind, EventKind::OwnAction);
    }

    #[test]
    fn test_raw_with_channel() {
        assert_eq!(raw_with_channel("names", "", "#c"), "NAMES #c");
        assert_eq!(raw_with_channel("invite", "#other bob", "#c"), "INVITE #other bob");
        assert_eq!(raw_with_channel("whois", "bob", "bob"), "WHOIS bob");
    }

    #[test]
    fn test_group_context_compose_and_close() {
        let mut client = connected_client();
        client.create_context("work");
        client.focus_context("work");
        assert_eq!(client.active_group(), Some("work"));

        client.set_compose("work", "#rust hi".into());
        assert_eq!(client.compose("work"), "#rust hi");
        assert_eq!(client.input().cursor, "#rust hi".len());

        client.append_line("work", "\x0319[#rust]\x0f <alice>\thi".into());
        assert_eq!(client.buffers[&BufferKey::Group("work".into())].messages.len(), 1);

        client.close_context("work");
        assert!(!client.buffers.contains_key(&BufferKey::Group("work".into())));
        assert_eq!(client.active_buffer, Some(BufferKey::ServerStatus(0)));
    }

    #[test]
    fn test_buffer_order_puts_groups_last() {
        let mut client = connected_client();
        client.create_context("a");
        client.ensure_buffer(BufferKey::Channel(0, "#rust".into()));
        client.ensure_buffer(BufferKey::Query(0, "bob".into()));
        assert_eq!(
            client.buffer_order(),
            vec![
                BufferKey::ServerStatus(0),
                BufferKey::Channel(0, "#rust".into()),
                BufferKey::Query(0, "bob".into()),
                BufferKey::Group("a".into()),
            ]
        );
        client.select_prev_buffer();
        assert_eq!(client.active_buffer, Some(BufferKey::Group("a".into())));
        client.select_next_buffer();
        assert_eq!(client.active_buffer, Some(BufferKey::ServerStatus(0)));
    }

    #[test]
    fn test_input_history() {
        let mut input = InputState::new();
        input.set_text("one".into());
        assert_eq!(input.take_text(), "one");
        input.remember("two");
        input.remember("two");
        assert_eq!(input.history, vec!["one", "two"]);
        input.history_up();
        assert_eq!(input.text, "two");
        input.history_up();
        assert_eq!(input.text, "one");
        input.history_down();
        input.history_down();
        assert!(input.text.is_empty());
    }
}
