//! Channel reference registry.
//!
//! Every live member channel of a group gets a short ref the user can type.
//! The first channel with a given name keeps the bare name; later ones on
//! other networks get `:` plus the shortest unused prefix of their network
//! name (`#dev`, `#dev:o`, `#dev:oft`).

use crate::group::host::ChannelKey;
use std::collections::{BTreeMap, HashMap};

pub const SUFFIX_SEPARATOR: char = ':';

/// Longest network prefix tried before falling back to `channel@network`.
pub const MAX_SUFFIX_LEN: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelRefs {
    by_ref: BTreeMap<String, ChannelKey>,
    by_key: HashMap<ChannelKey, String>,
}

impl ChannelRefs {
    /// Assign refs to the members for which `is_live` holds.
    ///
    /// Members are visited in (network, channel) order so the same
    /// membership and live set always yield the same refs.
    pub fn build<'a, I, F>(members: I, is_live: F) -> Self
    where
        I: IntoIterator<Item = &'a ChannelKey>,
        F: Fn(&ChannelKey) -> bool,
    {
        let mut members: Vec<&ChannelKey> = members.into_iter().collect();
        members.sort();
        members.dedup();

        let mut refs = Self::default();
        for key in members {
            if !is_live(key) {
                continue;
            }
            let r = refs.unique_ref(key);
            refs.by_ref.insert(r.clone(), key.clone());
            refs.by_key.insert(key.clone(), r);
        }
        refs
    }

    fn unique_ref(&self, key: &ChannelKey) -> String {
        if !self.by_ref.contains_key(&key.channel) {
            return key.channel.clone();
        }

        let network: Vec<char> = key.network.chars().collect();
        for len in 1..=network.len().min(MAX_SUFFIX_LEN) {
            let suffix: String = network[..len].iter().collect();
            let candidate = format!("{}{}{}", key.channel, SUFFIX_SEPARATOR, suffix);
            if !self.by_ref.contains_key(&candidate) {
                return candidate;
            }
        }

        // Keys are unique, so `channel@network` only collides with a channel
        // literally named that way on another network.
        let qualified = key.to_string();
        let mut candidate = qualified.clone();
        let mut n = 2;
        while self.by_ref.contains_key(&candidate) {
            candidate = format!("{}~{}", qualified, n);
            n += 1;
        }
        candidate
    }

    pub fn resolve(&self, r: &str) -> Option<&ChannelKey> {
        self.by_ref.get(r)
    }

    pub fn ref_for(&self, key: &ChannelKey) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }

    pub fn contains(&self, r: &str) -> bool {
        self.by_ref.contains_key(r)
    }

    /// All refs in lexicographic order.
    pub fn refs(&self) -> impl Iterator<Item = &str> {
        self.by_ref.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChannelKey)> {
        self.by_ref.iter().map(|(r, k)| (r.as_str(), k))
    }

    pub fn len(&self) -> usize {
        self.by_ref.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ref.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(pairs: &[(&str, &str)]) -> Vec<ChannelKey> {
        pairs.iter().map(|(n, c)| ChannelKey::new(*n, *c)).collect()
    }

    #[test]
    fn test_same_channel_on_two_networks() {
        let members = keys(&[("NetA", "#dev"), ("NetB", "#dev")]);
        let refs = ChannelRefs::build(&members, |_| true);

        assert_eq!(refs.ref_for(&members[0]), Some("#dev"));
        assert_eq!(refs.ref_for(&members[1]), Some("#dev:N"));
        assert_eq!(refs.resolve("#dev"), Some(&members[0]));
        assert_eq!(refs.resolve("#dev:N"), Some(&members[1]));
    }

    #[test]
    fn test_suffix_grows_until_unique() {
        let members = keys(&[("libera", "#rust"), ("liberty", "#rust"), ("libre", "#rust")]);
        let refs = ChannelRefs::build(&members, |_| true);

        assert_eq!(refs.ref_for(&members[0]), Some("#rust"));
        assert_eq!(refs.ref_for(&members[1]), Some("#rust:l"));
        assert_eq!(refs.ref_for(&members[2]), Some("#rust:li"));
    }

    #[test]
    fn test_long_common_prefix_falls_back_to_qualified_name() {
        let members = keys(&[
            ("averylongnetwork-a", "#x"),
            ("averylongnetwork-b", "#x"),
            ("averylongnetwork-c", "#x"),
        ]);
        let refs = ChannelRefs::build(&members, |_| true);

        assert_eq!(refs.ref_for(&members[1]), Some("#x:a"));
        let third = refs.ref_for(&members[2]).map(str::to_owned);
        assert_eq!(third.as_deref(), Some("#x:av"));

        let many: Vec<ChannelKey> = (0..12)
            .map(|i| ChannelKey::new(format!("aaaaaaaaa{i:02}"), "#x"))
            .collect();
        let refs = ChannelRefs::build(&many, |_| true);
        assert_eq!(refs.len(), many.len());
        assert_eq!(refs.ref_for(&many[8]), Some("#x:aaaaaaaa"));
        assert_eq!(refs.ref_for(&many[9]), Some("#x@aaaaaaaaa09"));
        for key in &many {
            assert_eq!(refs.resolve(refs.ref_for(key).unwrap()), Some(key));
        }
    }

    #[test]
    fn test_refs_are_unique_and_round_trip() {
        let members = keys(&[
            ("oftc", "#dev"),
            ("libera", "#dev"),
            ("liberachat", "#dev"),
            ("efnet", "#dev"),
            ("efnet", "#ops"),
            ("libera", "#ops"),
        ]);
        let refs = ChannelRefs::build(&members, |_| true);

        assert_eq!(refs.len(), members.len());
        for key in &members {
            let r = refs.ref_for(key).unwrap();
            assert_eq!(refs.resolve(r), Some(key));
        }
    }

    #[test]
    fn test_rebuild_is_order_independent() {
        let a = keys(&[("NetB", "#dev"), ("NetA", "#dev"), ("NetA", "#ops")]);
        let mut b = a.clone();
        b.reverse();
        assert_eq!(
            ChannelRefs::build(&a, |_| true),
            ChannelRefs::build(&b, |_| true)
        );
    }

    #[test]
    fn test_dead_channels_get_no_ref() {
        let members = keys(&[("NetA", "#dev"), ("NetB", "#dev")]);
        let refs = ChannelRefs::build(&members, |k| k.network == "NetB");

        assert_eq!(refs.len(), 1);
        assert_eq!(refs.ref_for(&members[1]), Some("#dev"));
        assert_eq!(refs.ref_for(&members[0]), None);
    }
}
