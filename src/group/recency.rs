//! Per-group record of when each channel ref and each nick was last seen.

use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Stamp {
    at: Instant,
    seq: u64,
}

#[derive(Debug, Default)]
pub struct Recency {
    seq: u64,
    channels: HashMap<String, Stamp>,
    nicks: HashMap<String, HashMap<String, Stamp>>,
}

impl Recency {
    pub fn new() -> Self {
        Self::default()
    }

    fn stamp(&mut self, now: Instant) -> Stamp {
        self.seq += 1;
        Stamp { at: now, seq: self.seq }
    }

    pub fn touch_channel(&mut self, channel_ref: &str, now: Instant) {
        let stamp = self.stamp(now);
        self.channels.insert(channel_ref.to_string(), stamp);
    }

    pub fn touch_nick(&mut self, channel_ref: &str, nick: &str, now: Instant) {
        let stamp = self.stamp(now);
        self.nicks
            .entry(channel_ref.to_string())
            .or_default()
            .insert(nick.to_string(), stamp);
    }

    /// Refs starting with `prefix`, most recently touched first.
    #[cfg(test)]
    pub fn list_channels(&self, prefix: &str) -> Vec<String> {
        self.list_channels_by(|r| r.starts_with(prefix))
    }

    pub fn list_channels_by<F: Fn(&str) -> bool>(&self, matches: F) -> Vec<String> {
        most_recent_first(self.channels.iter().filter(|(r, _)| matches(r)))
    }

    /// Nicks seen in a channel whose name starts with `prefix`, ignoring
    /// case, most recently touched first.
    pub fn list_nicks(&self, channel_ref: &str, prefix: &str) -> Vec<String> {
        let Some(nicks) = self.nicks.get(channel_ref) else {
            return Vec::new();
        };
        let prefix = prefix.to_lowercase();
        most_recent_first(
            nicks
                .iter()
                .filter(|(nick, _)| nick.to_lowercase().starts_with(&prefix)),
        )
    }

    #[cfg(test)]
    pub fn last_seen(&self, channel_ref: &str) -> Option<Instant> {
        self.channels.get(channel_ref).map(|s| s.at)
    }

    pub fn clear(&mut self) {
        self.channels.clear();
        self.nicks.clear();
    }

    /// Drop every entry keyed by a ref that no longer passes `keep`.
    pub fn retain_channels<F: Fn(&str) -> bool>(&mut self, keep: F) {
        self.channels.retain(|r, _| keep(r));
        self.nicks.retain(|r, _| keep(r));
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.nicks.is_empty()
    }
}

fn most_recent_first<'a, I>(entries: I) -> Vec<String>
where
    I: Iterator<Item = (&'a String, &'a Stamp)>,
{
    let mut entries: Vec<_> = entries.collect();
    entries.sort_by(|a, b| b.1.cmp(a.1));
    entries.into_iter().map(|(k, _)| k.clone()).collect()
}
