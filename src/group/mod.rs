//! Channel groups: several channels, possibly on several networks, sharing
//! one scrollback buffer and one compose line.
//!
//! A [`Group`] owns its membership, the refs the user types to address a
//! member, recency data, completion state and options. Everything it shows
//! or sends goes through the [`Host`] it is handed on each call.

pub mod autotarget;
pub mod complete;
pub mod host;
pub mod options;
pub mod recency;
pub mod refs;
pub mod registry;
pub mod template;

use crate::group::autotarget::AutoTarget;
use crate::group::complete::{Completer, Direction};
use crate::group::host::{ChannelKey, ChatEvent, Host};
use crate::group::options::{AfterSend, GroupOptions, OptionError, OptionValue};
use crate::group::recency::Recency;
use crate::group::refs::ChannelRefs;
use crate::group::template::{strip_color_prefix, TemplateSet, SLOT_COUNT};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::debug;

pub use registry::{GroupDef, GroupError, GroupRegistry};

/// First characters that make a word look like a channel name.
pub const CHANNEL_PREFIXES: [char; 4] = ['#', '&', '+', '!'];

/// Marker shown in place of the channel while a conversation stays put.
const HIDDEN_MARKER: char = '·';

/// A key press as far as a group cares about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Complete(Direction),
    /// A modifier pressed on its own. Ignored entirely.
    Modifier,
    Other,
}

/// What submitting a compose line did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submit {
    /// The line was readdressed to the current channel and left for review.
    Retargeted,
    Sent(ChannelKey),
    Command(ChannelKey),
    /// Target resolved but nothing followed it.
    Empty(ChannelKey),
    /// Target did not resolve; an error line was shown.
    Unresolved,
}

pub fn is_channel_shaped(word: &str) -> bool {
    word.starts_with(CHANNEL_PREFIXES)
}

fn error_line(text: &str) -> String {
    format!("\x0304!!!\x0f\t{}", text)
}

#[derive(Debug)]
pub struct Group {
    name: String,
    members: BTreeSet<ChannelKey>,
    refs: ChannelRefs,
    recency: Recency,
    completer: Completer,
    auto_target: AutoTarget,
    options: GroupOptions,
    current: Option<ChannelKey>,
    previous: Option<ChannelKey>,
}

impl Group {
    pub fn new(name: impl Into<String>, options: GroupOptions, now: Instant) -> Self {
        Self {
            name: name.into(),
            members: BTreeSet::new(),
            refs: ChannelRefs::default(),
            recency: Recency::new(),
            completer: Completer::default(),
            auto_target: AutoTarget::new(now),
            options,
            current: None,
            previous: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn members(&self) -> impl Iterator<Item = &ChannelKey> {
        self.members.iter()
    }

    pub fn refs(&self) -> &ChannelRefs {
        &self.refs
    }

    pub fn options(&self) -> &GroupOptions {
        &self.options
    }

    pub fn current(&self) -> Option<&ChannelKey> {
        self.current.as_ref()
    }

    /// Ref of the channel the conversation is currently in, if it is live.
    pub fn current_ref(&self) -> Option<&str> {
        self.current.as_ref().and_then(|k| self.refs.ref_for(k))
    }

    pub fn set_option(&mut self, name: &str, raw: &str) -> Result<(), OptionError> {
        self.options.set(name, raw)
    }

    pub fn set_option_value(&mut self, name: &str, value: OptionValue) -> Result<(), OptionError> {
        self.options.set_value(name, value)
    }

    pub fn add_channel(&mut self, host: &dyn Host, key: ChannelKey) -> bool {
        if !self.members.insert(key) {
            return false;
        }
        self.membership_changed(host);
        true
    }

    pub fn remove_channel(&mut self, host: &dyn Host, key: &ChannelKey) -> bool {
        if !self.members.remove(key) {
            return false;
        }
        if self.current.as_ref() == Some(key) {
            self.current = None;
        }
        if self.previous.as_ref() == Some(key) {
            self.previous = None;
        }
        self.membership_changed(host);
        true
    }

    fn live_refs(&self, host: &dyn Host) -> ChannelRefs {
        let live = host.live_channels();
        ChannelRefs::build(&self.members, |k| live.iter().any(|l| l.matches(k)))
    }

    fn membership_changed(&mut self, host: &dyn Host) {
        self.refs = self.live_refs(host);
        self.recency.clear();
        self.completer.clear();
    }

    /// Re-derive refs after channels were joined or left. Recency entries
    /// survive for refs that still point at the same channel.
    pub fn refresh_contexts(&mut self, host: &dyn Host) -> bool {
        let refs = self.live_refs(host);
        if refs == self.refs {
            return false;
        }
        let old = &self.refs;
        self.recency
            .retain_channels(|r| refs.resolve(r).is_some() && refs.resolve(r) == old.resolve(r));
        self.refs = refs;
        self.completer.clear();
        debug!(group = %self.name, refs = self.refs.len(), "refs rebuilt");
        true
    }

    /// Text standing in for the source channel at the start of a line.
    pub fn channel_display(&self, key: &ChannelKey) -> String {
        let color = self.options.channel_color(&key.channel);
        if self.options.hide_inline_channel() && self.current.as_ref() == Some(key) {
            return format!("\x03{:02}{}\x0f ", color, HIDDEN_MARKER);
        }
        let label = self.refs.ref_for(key).unwrap_or(&key.channel);
        format!("\x03{:02}[{}]\x0f ", color, label)
    }

    pub fn on_chat_message(
        &mut self,
        host: &mut dyn Host,
        templates: &TemplateSet,
        event: &ChatEvent,
        now: Instant,
    ) {
        let raw_nick = event.words.first().map(String::as_str).unwrap_or_default();
        let nick = if host.prefs().strip_nick_colors {
            strip_color_prefix(raw_nick)
        } else {
            raw_nick.to_string()
        };

        let mut args = Vec::with_capacity(SLOT_COUNT);
        args.push(self.channel_display(&event.source));
        args.push(nick.clone());
        args.extend(event.words.iter().skip(1).cloned());
        host.append_line(&self.name, templates.render(event.kind, &args));

        if let Some(active) = self.refs.ref_for(&event.source).map(str::to_owned) {
            self.recency.touch_channel(&active, now);
            if !event.kind.is_own() && !nick.is_empty() {
                self.recency.touch_nick(&active, &nick, now);
            }
            self.retarget(host, &active, now);
        }

        self.previous = self.current.replace(event.source.clone());
    }

    fn retarget(&mut self, host: &mut dyn Host, active: &str, now: Instant) {
        let compose = host.compose(&self.name);
        let policy = self.options.auto_target_policy();
        let Some(next) = self
            .auto_target
            .decide(&policy, &compose, active, &self.refs, now)
        else {
            return;
        };
        debug!(group = %self.name, target = active, action = %policy.action, "auto-target");
        host.set_compose(&self.name, next);
        self.completer.clear();
    }

    /// Returns whether the key was consumed.
    pub fn on_key(&mut self, host: &mut dyn Host, key: KeyInput, now: Instant) -> bool {
        match key {
            KeyInput::Modifier => false,
            KeyInput::Complete(direction) => {
                self.auto_target.touch(now);
                self.complete(host, direction);
                true
            }
            KeyInput::Other => {
                self.auto_target.touch(now);
                self.completer.clear();
                false
            }
        }
    }

    pub fn complete(&mut self, host: &mut dyn Host, direction: Direction) -> bool {
        let compose = host.compose(&self.name);
        let next = self
            .completer
            .complete(direction, &compose, &self.refs, &self.recency, &*host);
        match next {
            Some(line) => {
                host.set_compose(&self.name, line);
                true
            }
            None => false,
        }
    }

    /// Handle a submitted compose line.
    pub fn on_command(&mut self, host: &mut dyn Host, line: &str, now: Instant) -> Submit {
        self.completer.clear();
        self.auto_target.touch(now);

        let trimmed = line.trim_start();
        let (token, rest) = match trimmed.split_once(' ') {
            Some((token, rest)) => (token, rest.trim_start()),
            None => (trimmed, ""),
        };

        if !self.refs.contains(token) && !is_channel_shaped(token) {
            return match self.current_ref().map(str::to_owned) {
                Some(current) => {
                    host.set_compose(&self.name, format!("{} {}", current, line));
                    Submit::Retargeted
                }
                None => {
                    host.append_line(&self.name, error_line("no channel to send to; start the line with one"));
                    host.set_compose(&self.name, line.to_string());
                    Submit::Unresolved
                }
            };
        }

        let key = match self.refs.resolve(token) {
            Some(key) if host.context_exists(key) => key.clone(),
            _ => {
                host.append_line(&self.name, error_line(&format!("not in a channel called {}", token)));
                host.set_compose(&self.name, line.to_string());
                return Submit::Unresolved;
            }
        };

        let outcome = if let Some(text) = rest.strip_prefix("//") {
            host.send_message(&key, &format!("/{}", text));
            Submit::Sent(key)
        } else if let Some(command) = rest.strip_prefix('/') {
            host.send_command(&key, command);
            Submit::Command(key)
        } else if rest.is_empty() {
            Submit::Empty(key)
        } else {
            host.send_message(&key, rest);
            Submit::Sent(key)
        };

        let next = match self.options.after_send() {
            AfterSend::Line if !rest.is_empty() => line.to_string(),
            _ => format!("{} ", token),
        };
        host.set_compose(&self.name, next);
        outcome
    }

    pub fn definition(&self) -> GroupDef {
        let mut channels: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for key in &self.members {
            channels
                .entry(key.network.clone())
                .or_default()
                .push(key.channel.clone());
        }
        GroupDef {
            name: self.name.clone(),
            channels,
            options: self.options.to_map(),
        }
    }
}
