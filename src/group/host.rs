//! Capability interface between the group core and the chat client hosting it.
//!
//! The group core never touches sockets, terminals or buffers directly. It
//! asks the [`Host`] whether channel contexts exist, reads and rewrites the
//! compose line of a group's buffer, and hands outgoing text back to it.

use std::fmt;

/// A channel (or query target) on one network.
///
/// Ordering is network first, then channel, which is the order ref
/// assignment walks the membership in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey {
    pub network: String,
    pub channel: String,
}

impl ChannelKey {
    pub fn new(network: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            channel: channel.into(),
        }
    }

    /// Same network, and channel names equal ignoring ASCII case.
    pub fn matches(&self, other: &ChannelKey) -> bool {
        self.network == other.network && self.channel.eq_ignore_ascii_case(&other.channel)
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.channel, self.network)
    }
}

/// Display events a group re-renders into its shared buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    ChannelMessage,
    ChannelHighlight,
    ChannelAction,
    ChannelActionHighlight,
    OwnMessage,
    OwnAction,
    PrivateMessage,
    PrivateAction,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::ChannelMessage,
        EventKind::ChannelHighlight,
        EventKind::ChannelAction,
        EventKind::ChannelActionHighlight,
        EventKind::OwnMessage,
        EventKind::OwnAction,
        EventKind::PrivateMessage,
        EventKind::PrivateAction,
    ];

    /// Name of the event in a `pevents.conf` template file.
    pub fn pevent_name(self) -> &'static str {
        match self {
            EventKind::ChannelMessage => "Channel Message",
            EventKind::ChannelHighlight => "Channel Msg Hilight",
            EventKind::ChannelAction => "Channel Action",
            EventKind::ChannelActionHighlight => "Channel Action Hilight",
            EventKind::OwnMessage => "Your Message",
            EventKind::OwnAction => "Your Action",
            EventKind::PrivateMessage => "Private Message",
            EventKind::PrivateAction => "Private Action",
        }
    }

    pub fn from_pevent_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.pevent_name() == name)
    }

    pub fn is_own(self) -> bool {
        matches!(self, EventKind::OwnMessage | EventKind::OwnAction)
    }
}

/// An already-tokenized chat event delivered by the host.
///
/// `words[0]` is the sender nick, the rest are the positional fields of the
/// event (message text, mode char, identification marker, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEvent {
    pub source: ChannelKey,
    pub kind: EventKind,
    pub words: Vec<String>,
}

impl ChatEvent {
    pub fn new(source: ChannelKey, kind: EventKind, words: Vec<String>) -> Self {
        Self {
            source,
            kind,
            words,
        }
    }
}

/// Display preferences the host exposes to the group core.
#[derive(Debug, Clone, PartialEq)]
pub struct HostPrefs {
    /// Host aligns text after the first tab into a column.
    pub indent_nicks: bool,
    /// Nicks arrive wrapped in a colour code that should be dropped.
    pub strip_nick_colors: bool,
    /// Appended to a nick completed as the first word of a message.
    pub completion_suffix: String,
}

impl Default for HostPrefs {
    fn default() -> Self {
        Self {
            indent_nicks: true,
            strip_nick_colors: false,
            completion_suffix: ": ".to_string(),
        }
    }
}

/// What a chat client must provide for groups to live inside it.
pub trait Host {
    /// Every live context: joined channels and open queries on connected
    /// networks.
    fn live_channels(&self) -> Vec<ChannelKey>;
    /// Whether a live context exists for `key`.
    fn context_exists(&self, key: &ChannelKey) -> bool {
        self.live_channels().iter().any(|live| live.matches(key))
    }
    /// Nicks currently present in a channel.
    fn roster(&self, key: &ChannelKey) -> Vec<String>;
    fn prefs(&self) -> &HostPrefs;
    /// Current compose line of a group's buffer.
    fn compose(&self, group: &str) -> String;

    fn create_context(&mut self, group: &str);
    fn focus_context(&mut self, group: &str);
    fn close_context(&mut self, group: &str);
    fn append_line(&mut self, group: &str, line: String);
    /// Replace a group's compose line and move the cursor to its end.
    fn set_compose(&mut self, group: &str, text: String);
    fn send_message(&mut self, key: &ChannelKey, text: &str);
    /// Run a client command (without the leading `/`) in a channel context.
    fn send_command(&mut self, key: &ChannelKey, command: &str);
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::{BTreeSet, HashMap};

    /// In-memory host recording everything the group core asks of it.
    #[derive(Debug, Default)]
    pub struct MockHost {
        pub live: BTreeSet<ChannelKey>,
        pub rosters: HashMap<ChannelKey, Vec<String>>,
        pub prefs: HostPrefs,
        pub contexts: BTreeSet<String>,
        pub focused: Option<String>,
        pub lines: HashMap<String, Vec<String>>,
        pub composes: HashMap<String, String>,
        pub compose_writes: usize,
        pub sent: Vec<(ChannelKey, String)>,
        pub commands: Vec<(ChannelKey, String)>,
    }

    impl MockHost {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_live(keys: &[(&str, &str)]) -> Self {
            let mut host = Self::new();
            for (network, channel) in keys {
                host.live.insert(ChannelKey::new(*network, *channel));
            }
            host
        }

        pub fn lines(&self, group: &str) -> &[String] {
            self.lines.get(group).map(Vec::as_slice).unwrap_or(&[])
        }

        pub fn typed(&mut self, group: &str, text: &str) {
            self.composes.insert(group.to_string(), text.to_string());
        }
    }

    impl Host for MockHost {
        fn live_channels(&self) -> Vec<ChannelKey> {
            self.live.iter().cloned().collect()
        }

        fn roster(&self, key: &ChannelKey) -> Vec<String> {
            self.rosters.get(key).cloned().unwrap_or_default()
        }

        fn prefs(&self) -> &HostPrefs {
            &self.prefs
        }

        fn compose(&self, group: &str) -> String {
            self.composes.get(group).cloned().unwrap_or_default()
        }

        fn create_context(&mut self, group: &str) {
            self.contexts.insert(group.to_string());
        }

        fn focus_context(&mut self, group: &str) {
            self.focused = Some(group.to_string());
        }

        fn close_context(&mut self, group: &str) {
            self.contexts.remove(group);
            self.lines.remove(group);
            self.composes.remove(group);
        }

        fn append_line(&mut self, group: &str, line: String) {
            self.lines.entry(group.to_string()).or_default().push(line);
        }

        fn set_compose(&mut self, group: &str, text: String) {
            self.compose_writes += 1;
            self.composes.insert(group.to_string(), text);
        }

        fn send_message(&mut self, key: &ChannelKey, text: &str) {
            self.sent.push((key.clone(), text.to_string()));
        }

        fn send_command(&mut self, key: &ChannelKey, command: &str) {
            self.commands.push((key.clone(), command.to_string()));
        }
    }
}
