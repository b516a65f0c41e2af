//! Every group of the running client, and the index routing channel events
//! to them.

use crate::group::host::{ChannelKey, ChatEvent, Host};
use crate::group::options::{GroupOptions, OptionError, OptionValue};
use crate::group::template::TemplateSet;
use crate::group::{Group, KeyInput, Submit};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A group as persisted in `groups.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDef {
    pub name: String,
    /// Network name to channel names.
    #[serde(default)]
    pub channels: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
}

#[derive(Debug, Error, PartialEq)]
pub enum GroupError {
    #[error("group '{0}' already exists")]
    Exists(String),
    #[error("no group named '{0}'")]
    NotFound(String),
    #[error("invalid group name '{0}'")]
    InvalidName(String),
    #[error("{channel} is not in group '{group}'")]
    NotMember { group: String, channel: ChannelKey },
    #[error(transparent)]
    Option(#[from] OptionError),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Groups the event was rendered into.
    pub delivered: usize,
    /// Catch-all group that adopted the source channel.
    pub adopted: Option<String>,
}

pub struct GroupRegistry {
    groups: Vec<Group>,
    routes: HashMap<ChannelKey, Vec<String>>,
    templates: TemplateSet,
}

fn validate_name(name: &str) -> Result<(), GroupError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(GroupError::InvalidName(name.to_string()));
    }
    Ok(())
}

impl GroupRegistry {
    pub fn new(templates: TemplateSet) -> Self {
        Self {
            groups: Vec::new(),
            routes: HashMap::new(),
            templates,
        }
    }

    /// Add persisted groups and open a buffer for each.
    pub fn load(&mut self, host: &mut dyn Host, defs: Vec<GroupDef>, now: Instant) {
        for def in defs {
            if validate_name(&def.name).is_err() || self.contains(&def.name) {
                warn!(name = %def.name, "skipping invalid or duplicate group definition");
                continue;
            }
            let (options, errors) = GroupOptions::from_map(&def.options);
            for e in errors {
                warn!(group = %def.name, "{}; using the default", e);
            }

            let mut group = Group::new(def.name, options, now);
            for (network, channels) in def.channels {
                for channel in channels {
                    group.add_channel(&*host, ChannelKey::new(network.clone(), channel));
                }
            }
            host.create_context(group.name());
            info!(group = %group.name(), members = group.members().count(), "loaded group");
            self.groups.push(group);
        }
        self.reindex();
    }

    /// Close every group buffer and forget all groups.
    pub fn unload(&mut self, host: &mut dyn Host) {
        for group in self.groups.drain(..) {
            host.close_context(group.name());
        }
        self.routes.clear();
    }

    pub fn definitions(&self) -> Vec<GroupDef> {
        self.groups.iter().map(Group::definition).collect()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name().to_string()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name() == name)
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut Group, GroupError> {
        self.groups
            .iter_mut()
            .find(|g| g.name() == name)
            .ok_or_else(|| GroupError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Names of the groups a channel belongs to.
    pub fn groups_for(&self, key: &ChannelKey) -> &[String] {
        self.routes.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn catch_all(&self) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.options().catch_all())
            .map(Group::name)
    }

    pub fn create(&mut self, host: &mut dyn Host, name: &str, now: Instant) -> Result<(), GroupError> {
        validate_name(name)?;
        if self.contains(name) {
            return Err(GroupError::Exists(name.to_string()));
        }
        self.groups.push(Group::new(name, GroupOptions::default(), now));
        host.create_context(name);
        info!(group = name, "created group");
        Ok(())
    }

    pub fn remove(&mut self, host: &mut dyn Host, name: &str) -> Result<(), GroupError> {
        let idx = self
            .groups
            .iter()
            .position(|g| g.name() == name)
            .ok_or_else(|| GroupError::NotFound(name.to_string()))?;
        self.groups.remove(idx);
        host.close_context(name);
        self.reindex();
        info!(group = name, "removed group");
        Ok(())
    }

    /// Rename a group. Its buffer is reopened under the new name.
    pub fn rename(&mut self, host: &mut dyn Host, old: &str, new: &str) -> Result<(), GroupError> {
        validate_name(new)?;
        if old == new {
            return self.get_mut(old).map(|_| ());
        }
        if self.contains(new) {
            return Err(GroupError::Exists(new.to_string()));
        }
        self.get_mut(old)?.set_name(new.to_string());
        host.close_context(old);
        host.create_context(new);
        self.reindex();
        info!(from = old, to = new, "renamed group");
        Ok(())
    }

    /// Returns false when the channel was already a member.
    pub fn add_channel(&mut self, host: &dyn Host, name: &str, key: ChannelKey) -> Result<bool, GroupError> {
        let added = self.get_mut(name)?.add_channel(host, key);
        if added {
            self.reindex();
        }
        Ok(added)
    }

    pub fn remove_channel(&mut self, host: &dyn Host, name: &str, key: &ChannelKey) -> Result<(), GroupError> {
        if !self.get_mut(name)?.remove_channel(host, key) {
            return Err(GroupError::NotMember {
                group: name.to_string(),
                channel: key.clone(),
            });
        }
        self.reindex();
        Ok(())
    }

    /// Set an option from user text. Only one group can be the catch-all.
    pub fn set_option(&mut self, name: &str, option: &str, raw: &str) -> Result<(), GroupError> {
        let group = self.get_mut(name)?;
        group.set_option(option, raw)?;
        if group.options().catch_all() {
            for other in self.groups.iter_mut().filter(|g| g.name() != name) {
                other.set_option_value("catch_all", OptionValue::Bool(false))?;
            }
        }
        Ok(())
    }

    pub fn open(&self, host: &mut dyn Host, name: &str) -> Result<(), GroupError> {
        if !self.contains(name) {
            return Err(GroupError::NotFound(name.to_string()));
        }
        host.focus_context(name);
        Ok(())
    }

    /// Render an inbound event into every group subscribed to its channel.
    pub fn dispatch(&mut self, host: &mut dyn Host, event: &ChatEvent, now: Instant) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        if self.groups_for(&event.source).is_empty() {
            if let Some(group) = self.groups.iter_mut().find(|g| g.options().catch_all()) {
                group.add_channel(&*host, event.source.clone());
                info!(group = %group.name(), channel = %event.source, "catch-all adopted channel");
                outcome.adopted = Some(group.name().to_string());
                self.reindex();
            }
        }

        let Some(names) = self.routes.get(&event.source) else {
            debug!(channel = %event.source, "no group for event");
            return outcome;
        };
        for name in names {
            if let Some(group) = self.groups.iter_mut().find(|g| g.name() == name) {
                group.on_chat_message(host, &self.templates, event, now);
                outcome.delivered += 1;
            }
        }
        outcome
    }

    pub fn on_key(&mut self, host: &mut dyn Host, name: &str, key: KeyInput, now: Instant) -> Result<bool, GroupError> {
        Ok(self.get_mut(name)?.on_key(host, key, now))
    }

    pub fn submit(&mut self, host: &mut dyn Host, name: &str, line: &str, now: Instant) -> Result<Submit, GroupError> {
        Ok(self.get_mut(name)?.on_command(host, line, now))
    }

    /// Rebuild refs of every group after the set of live channels changed.
    pub fn refresh_contexts(&mut self, host: &dyn Host) {
        for group in &mut self.groups {
            group.refresh_contexts(host);
        }
    }

    fn reindex(&mut self) {
        self.routes.clear();
        for group in &self.groups {
            for key in group.members() {
                self.routes
                    .entry(key.clone())
                    .or_default()
                    .push(group.name().to_string());
            }
        }
        debug!(channels = self.routes.len(), "reindexed group routes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::host::mock::MockHost;
    use crate::group::host::EventKind;
    use crate::group::template::BUNDLED_PEVENTS;

    fn registry() -> GroupRegistry {
        GroupRegistry::new(TemplateSet::from_source(BUNDLED_PEVENTS, true))
    }

    fn event(network: &str, channel: &str, text: &str) -> ChatEvent {
        ChatEvent::new(
            ChannelKey::new(network, channel),
            EventKind::ChannelMessage,
            vec!["someone".to_string(), text.to_string()],
        )
    }

    #[test]
    fn test_create_rejects_duplicates_and_bad_names() {
        let mut host = MockHost::new();
        let mut reg = registry();
        let now = Instant::now();

        reg.create(&mut host, "work", now).unwrap();
        assert!(host.contexts.contains("work"));
        assert_eq!(reg.create(&mut host, "work", now), Err(GroupError::Exists("work".into())));
        assert_eq!(reg.create(&mut host, "", now), Err(GroupError::InvalidName("".into())));
        assert_eq!(
            reg.create(&mut host, "two words", now),
            Err(GroupError::InvalidName("two words".into()))
        );
        assert_eq!(reg.names(), vec!["work"]);
    }

    #[test]
    fn test_dispatch_broadcasts_to_every_subscriber() {
        let mut host = MockHost::with_live(&[("n", "#shared"), ("n", "#solo")]);
        let mut reg = registry();
        let now = Instant::now();
        reg.create(&mut host, "a", now).unwrap();
        reg.create(&mut host, "b", now).unwrap();
        reg.add_channel(&host, "a", ChannelKey::new("n", "#shared")).unwrap();
        reg.add_channel(&host, "b", ChannelKey::new("n", "#shared")).unwrap();
        reg.add_channel(&host, "b", ChannelKey::new("n", "#solo")).unwrap();

        let outcome = reg.dispatch(&mut host, &event("n", "#shared", "hello both"), now);
        assert_eq!(outcome.delivered, 2);
        assert_eq!(host.lines("a").len(), 1);
        assert_eq!(host.lines("b").len(), 1);

        reg.dispatch(&mut host, &event("n", "#solo", "just b"), now);
        assert_eq!(host.lines("a").len(), 1);
        assert_eq!(host.lines("b").len(), 2);

        let outcome = reg.dispatch(&mut host, &event("n", "#other", "nobody"), now);
        assert_eq!(outcome, DispatchOutcome::default());
    }

    #[test]
    fn test_catch_all_adopts_unclaimed_channels() {
        let mut host = MockHost::with_live(&[("n", "#new")]);
        let mut reg = registry();
        let now = Instant::now();
        reg.create(&mut host, "everything", now).unwrap();
        reg.set_option("everything", "catch_all", "true").unwrap();

        let outcome = reg.dispatch(&mut host, &event("n", "#new", "first"), now);
        assert_eq!(outcome.adopted.as_deref(), Some("everything"));
        assert_eq!(outcome.delivered, 1);
        assert_eq!(reg.groups_for(&ChannelKey::new("n", "#new")), ["everything".to_string()]);
        assert_eq!(reg.definitions()[0].channels["n"], vec!["#new"]);

        let outcome = reg.dispatch(&mut host, &event("n", "#new", "second"), now);
        assert_eq!(outcome.adopted, None);
    }

    #[test]
    fn test_only_one_catch_all() {
        let mut host = MockHost::new();
        let mut reg = registry();
        let now = Instant::now();
        reg.create(&mut host, "a", now).unwrap();
        reg.create(&mut host, "b", now).unwrap();

        reg.set_option("a", "catch_all", "true").unwrap();
        reg.set_option("b", "catch_all", "true").unwrap();
        assert_eq!(reg.catch_all(), Some("b"));
        assert!(!reg.get("a").unwrap().options().catch_all());
    }

    #[test]
    fn test_set_option_errors() {
        let mut host = MockHost::new();
        let mut reg = registry();
        reg.create(&mut host, "a", Instant::now()).unwrap();

        assert_eq!(
            reg.set_option("a", "nope", "1"),
            Err(GroupError::Option(OptionError::Unknown("nope".into())))
        );
        assert!(matches!(
            reg.set_option("a", "auto_target", "sometimes"),
            Err(GroupError::Option(OptionError::Mismatch { .. }))
        ));
        assert_eq!(reg.set_option("zzz", "auto_target", "on"), Err(GroupError::NotFound("zzz".into())));
    }

    #[test]
    fn test_rename_moves_buffer_and_routes() {
        let mut host = MockHost::new();
        let mut reg = registry();
        let now = Instant::now();
        let key = ChannelKey::new("n", "#c");
        reg.create(&mut host, "old", now).unwrap();
        reg.create(&mut host, "taken", now).unwrap();
        reg.add_channel(&host, "old", key.clone()).unwrap();

        assert_eq!(reg.rename(&mut host, "old", "taken"), Err(GroupError::Exists("taken".into())));
        reg.rename(&mut host, "old", "new").unwrap();
        assert!(!host.contexts.contains("old"));
        assert!(host.contexts.contains("new"));
        assert_eq!(reg.groups_for(&key), ["new".to_string()]);
    }

    #[test]
    fn test_remove_unroutes_and_closes() {
        let mut host = MockHost::new();
        let mut reg = registry();
        let now = Instant::now();
        let key = ChannelKey::new("n", "#c");
        reg.create(&mut host, "g", now).unwrap();
        reg.add_channel(&host, "g", key.clone()).unwrap();

        reg.remove(&mut host, "g").unwrap();
        assert!(host.contexts.is_empty());
        assert!(reg.groups_for(&key).is_empty());
        assert_eq!(reg.remove(&mut host, "g"), Err(GroupError::NotFound("g".into())));
    }

    #[test]
    fn test_channel_membership_errors() {
        let mut host = MockHost::new();
        let mut reg = registry();
        let key = ChannelKey::new("n", "#c");
        reg.create(&mut host, "g", Instant::now()).unwrap();

        assert_eq!(reg.add_channel(&host, "g", key.clone()), Ok(true));
        assert_eq!(reg.add_channel(&host, "g", key.clone()), Ok(false));
        reg.remove_channel(&host, "g", &key).unwrap();
        assert!(matches!(
            reg.remove_channel(&host, "g", &key),
            Err(GroupError::NotMember { .. })
        ));
    }

    #[test]
    fn test_load_and_definitions_round_trip() {
        let text = r##"
            [[group]]
            name = "work"
            [group.channels]
            libera = ["#rust", "#nix"]
            [group.options]
            auto_target_action = "clear"
            auto_target = "definitely"

            [[group]]
            name = "work"

            [[group]]
            name = "fun"
        "##;

        #[derive(Deserialize)]
        struct File {
            group: Vec<GroupDef>,
        }
        let file: File = toml::from_str(text).unwrap();

        let mut host = MockHost::with_live(&[("libera", "#rust")]);
        let mut reg = registry();
        reg.load(&mut host, file.group, Instant::now());

        assert_eq!(reg.names(), vec!["work", "fun"]);
        assert_eq!(host.contexts.len(), 2);
        let work = reg.get("work").unwrap();
        assert!(work.options().auto_target_policy().enabled);
        assert_eq!(work.refs().len(), 1);
        assert_eq!(reg.groups_for(&ChannelKey::new("libera", "#nix")), ["work".to_string()]);

        let defs = reg.definitions();
        assert_eq!(defs[0].channels["libera"], vec!["#nix", "#rust"]);
        assert_eq!(defs[0].options["auto_target_action"], OptionValue::Str("clear".into()));
    }

    #[test]
    fn test_submit_and_keys_route_to_named_group() {
        let mut host = MockHost::with_live(&[("n", "#c")]);
        let mut reg = registry();
        let now = Instant::now();
        reg.create(&mut host, "g", now).unwrap();
        reg.add_channel(&host, "g", ChannelKey::new("n", "#c")).unwrap();

        let outcome = reg.submit(&mut host, "g", "#c hi", now).unwrap();
        assert_eq!(outcome, Submit::Sent(ChannelKey::new("n", "#c")));
        assert_eq!(reg.on_key(&mut host, "g", KeyInput::Modifier, now), Ok(false));
        assert!(reg.submit(&mut host, "missing", "x", now).is_err());
    }

    #[test]
    fn test_unload_closes_everything() {
        let mut host = MockHost::new();
        let mut reg = registry();
        let now = Instant::now();
        reg.create(&mut host, "a", now).unwrap();
        reg.create(&mut host, "b", now).unwrap();
        reg.unload(&mut host);
        assert!(reg.is_empty());
        assert!(host.contexts.is_empty());
    }
}
