//! Tab completion over channel refs and nicks.
//!
//! The first Tab builds a ranked candidate list from the compose line; later
//! Tabs rotate it. A rotation never lands back on the value shown before it
//! while there is anything else to show.

use crate::group::host::Host;
use crate::group::recency::Recency;
use crate::group::refs::ChannelRefs;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

pub const CHANNEL_MARKER: char = '#';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Channel,
    Nick,
}

/// A rotatable candidate list and what to splice the head into.
#[derive(Debug, Clone)]
pub struct Candidates {
    items: VecDeque<String>,
    kind: CandidateKind,
    first: bool,
    current: String,
    before: String,
    after: String,
}

impl Candidates {
    pub fn new(items: Vec<String>, kind: CandidateKind, current: &str) -> Self {
        Self {
            items: items.into(),
            kind,
            first: true,
            current: current.to_string(),
            before: String::new(),
            after: String::new(),
        }
    }

    /// Text kept around the completed word.
    pub fn with_context(mut self, before: &str, after: &str) -> Self {
        self.before = before.to_string();
        self.after = after.to_string();
        self
    }

    pub fn kind(&self) -> CandidateKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn head(&self) -> Option<&str> {
        self.items.front().map(String::as_str)
    }

    fn rotate(&mut self, direction: Direction) {
        match direction {
            Direction::Forward => self.items.rotate_left(1),
            Direction::Reverse => self.items.rotate_right(1),
        }
    }

    /// Move to the next candidate and return it.
    ///
    /// The first call presents the head (or the tail, in reverse). Every
    /// call keeps rotating, at most once per candidate, while the head still
    /// equals the value that was showing before it.
    pub fn advance(&mut self, direction: Direction) -> Option<&str> {
        if self.is_empty() {
            return None;
        }
        if !self.first || direction == Direction::Reverse {
            self.rotate(direction);
        }
        self.first = false;

        let mut budget = self.items.len();
        while self.items.len() > 1 && budget > 0 && self.head() == Some(self.current.as_str()) {
            self.rotate(direction);
            budget -= 1;
        }

        self.current = self.items.front().cloned().unwrap_or_default();
        self.head()
    }

    /// The compose line with the current head spliced in.
    pub fn apply(&self) -> String {
        let head = self.head().unwrap_or_default();
        match self.kind {
            CandidateKind::Channel if self.after.is_empty() => format!("{} ", head),
            CandidateKind::Channel => format!("{}{}", head, self.after),
            CandidateKind::Nick => format!("{}{}{}", self.before, head, self.after),
        }
    }
}

/// Completion state of one group's compose line.
#[derive(Debug, Default)]
pub enum Completer {
    #[default]
    Idle,
    Built(Candidates),
}

impl Completer {
    pub fn clear(&mut self) {
        *self = Completer::Idle;
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        matches!(self, Completer::Built(_))
    }

    /// Handle one completion key press. Returns the new compose line, or
    /// `None` when there is nothing to complete.
    pub fn complete(
        &mut self,
        direction: Direction,
        compose: &str,
        refs: &ChannelRefs,
        recency: &Recency,
        host: &dyn Host,
    ) -> Option<String> {
        if let Completer::Idle = self {
            let candidates = build(compose, refs, recency, host)?;
            debug!(
                kind = ?candidates.kind(),
                count = candidates.len(),
                "built completion list"
            );
            *self = Completer::Built(candidates);
        }

        let Completer::Built(candidates) = self else {
            return None;
        };
        candidates.advance(direction)?;
        Some(candidates.apply())
    }
}

fn build(compose: &str, refs: &ChannelRefs, recency: &Recency, host: &dyn Host) -> Option<Candidates> {
    let tokens: Vec<&str> = compose.split_whitespace().collect();

    if tokens.len() <= 1 {
        let token = tokens.first().copied().unwrap_or("");
        let items = channel_list(token, refs, recency);
        if items.is_empty() {
            return None;
        }
        let after = compose
            .trim_start()
            .get(token.len()..)
            .unwrap_or_default();
        return Some(Candidates::new(items, CandidateKind::Channel, token).with_context("", after));
    }

    let key = refs.resolve(tokens[0])?;
    let partial_start = compose.rfind(' ').map(|i| i + 1).unwrap_or(0);
    let partial = &compose[partial_start..];
    let before = &compose[..partial_start];

    let items = nick_list(tokens[0], partial, recency, host.roster(key));
    if items.is_empty() {
        return None;
    }

    let first_word = before.split_whitespace().count() == 1;
    let suffix = if first_word {
        host.prefs().completion_suffix.as_str()
    } else {
        " "
    };
    Some(Candidates::new(items, CandidateKind::Nick, partial).with_context(before, suffix))
}

/// Recently active matching refs, then the remaining matching refs
/// alphabetically.
pub fn channel_list(token: &str, refs: &ChannelRefs, recency: &Recency) -> Vec<String> {
    let matches: Box<dyn Fn(&str) -> bool> = if refs.contains(token) {
        Box::new(|_: &str| true)
    } else if !token.is_empty() && !token.starts_with(CHANNEL_MARKER) {
        let marked = format!("{}{}", CHANNEL_MARKER, token);
        let token = token.to_string();
        Box::new(move |r: &str| r.starts_with(&marked) || r.starts_with(&token))
    } else {
        let token = token.to_string();
        Box::new(move |r: &str| r.starts_with(&token))
    };

    let mut items: Vec<String> = recency
        .list_channels_by(|r| refs.contains(r) && matches(r));
    let seen: HashSet<String> = items.iter().cloned().collect();
    items.extend(
        refs.refs()
            .filter(|r| matches(r) && !seen.contains(*r))
            .map(str::to_owned),
    );
    items
}

/// Recently active nicks of one channel matching `partial`, then the rest
/// of the channel roster alphabetically.
pub fn nick_list(channel_ref: &str, partial: &str, recency: &Recency, roster: Vec<String>) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    let mut items = recency.list_nicks(channel_ref, partial);
    let seen: HashSet<String> = items.iter().map(|n| n.to_lowercase()).collect();

    let mut rest: Vec<String> = roster
        .into_iter()
        .filter(|n| {
            let lower = n.to_lowercase();
            lower.starts_with(&partial_lower) && !seen.contains(&lower)
        })
        .collect();
    rest.sort_by_key(|n| n.to_lowercase());
    rest.dedup();
    items.extend(rest);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::host::mock::MockHost;
    use crate::group::host::ChannelKey;
    use std::time::{Duration, Instant};

    fn refs_for(pairs: &[(&str, &str)]) -> ChannelRefs {
        let keys: Vec<ChannelKey> = pairs.iter().map(|(n, c)| ChannelKey::new(*n, *c)).collect();
        ChannelRefs::build(&keys, |_| true)
    }

    #[test]
    fn test_two_candidates_never_stall() {
        let mut c = Candidates::new(vec!["alice".into(), "bob".into()], CandidateKind::Nick, "alice");
        assert_eq!(c.advance(Direction::Forward), Some("bob"));
        assert_eq!(c.advance(Direction::Forward), Some("alice"));
        assert_eq!(c.advance(Direction::Forward), Some("bob"));
    }

    #[test]
    fn test_rotation_visits_every_candidate() {
        let names: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        for direction in [Direction::Forward, Direction::Reverse] {
            let mut c = Candidates::new(names.clone(), CandidateKind::Channel, "");
            let mut seen = Vec::new();
            let mut last: Option<String> = None;
            for _ in 0..names.len() {
                let head = c.advance(direction).unwrap().to_string();
                assert_ne!(Some(&head), last.as_ref());
                seen.push(head.clone());
                last = Some(head);
            }
            seen.sort();
            assert_eq!(seen, names);
        }
    }

    #[test]
    fn test_reverse_first_activation_shows_tail() {
        let mut c = Candidates::new(vec!["a".into(), "b".into(), "c".into()], CandidateKind::Channel, "");
        assert_eq!(c.advance(Direction::Reverse), Some("c"));
        assert_eq!(c.advance(Direction::Reverse), Some("b"));
        assert_eq!(c.advance(Direction::Forward), Some("c"));
    }

    #[test]
    fn test_single_candidate_repeats() {
        let mut c = Candidates::new(vec!["#only".into()], CandidateKind::Channel, "#only");
        assert_eq!(c.advance(Direction::Forward), Some("#only"));
        assert_eq!(c.advance(Direction::Forward), Some("#only"));
    }

    #[test]
    fn test_empty_list_yields_nothing() {
        let mut c = Candidates::new(Vec::new(), CandidateKind::Nick, "x");
        assert_eq!(c.advance(Direction::Forward), None);
    }

    #[test]
    fn test_channel_list_ranks_recent_first() {
        let refs = refs_for(&[("n", "#alpha"), ("n", "#beta"), ("n", "#gamma"), ("n", "#delta")]);
        let mut recency = Recency::new();
        let t0 = Instant::now();
        recency.touch_channel("#gamma", t0);
        recency.touch_channel("#beta", t0 + Duration::from_secs(1));

        assert_eq!(
            channel_list("", &refs, &recency),
            vec!["#beta", "#gamma", "#alpha", "#delta"]
        );
        assert_eq!(channel_list("#g", &refs, &recency), vec!["#gamma"]);
        assert_eq!(channel_list("de", &refs, &recency), vec!["#delta"]);
        assert_eq!(channel_list("#alpha", &refs, &recency).len(), 4);
    }

    #[test]
    fn test_channel_list_skips_stale_recent_refs() {
        let refs = refs_for(&[("n", "#alpha")]);
        let mut recency = Recency::new();
        recency.touch_channel("#gone", Instant::now());
        assert_eq!(channel_list("", &refs, &recency), vec!["#alpha"]);
    }

    #[test]
    fn test_nick_list_recent_then_roster() {
        let mut recency = Recency::new();
        recency.touch_nick("#dev", "bob", Instant::now());
        let roster = vec!["Carol".to_string(), "bob".to_string(), "alice".to_string(), "ben".to_string()];

        assert_eq!(
            nick_list("#dev", "", &recency, roster.clone()),
            vec!["bob", "alice", "ben", "Carol"]
        );
        assert_eq!(nick_list("#dev", "B", &recency, roster), vec!["bob", "ben"]);
    }

    #[test]
    fn test_complete_channel_token() {
        let host = MockHost::new();
        let refs = refs_for(&[("n", "#dev"), ("n", "#design"), ("n", "#ops")]);
        let recency = Recency::new();
        let mut completer = Completer::default();

        let first = completer.complete(Direction::Forward, "#de", &refs, &recency, &host);
        assert_eq!(first.as_deref(), Some("#design "));
        let second = completer.complete(Direction::Forward, "#design ", &refs, &recency, &host);
        assert_eq!(second.as_deref(), Some("#dev "));
        let third = completer.complete(Direction::Forward, "#dev ", &refs, &recency, &host);
        assert_eq!(third.as_deref(), Some("#design "));
    }

    #[test]
    fn test_complete_exact_ref_moves_on() {
        let host = MockHost::new();
        let refs = refs_for(&[("n", "#a"), ("n", "#b")]);
        let recency = Recency::new();
        let mut completer = Completer::default();

        let next = completer.complete(Direction::Forward, "#a hello", &refs, &recency, &host);
        // "#a hello" has two tokens, which completes nicks of #a (none here).
        assert_eq!(next, None);

        let next = completer.complete(Direction::Forward, "#a ", &refs, &recency, &host);
        assert_eq!(next.as_deref(), Some("#b "));
    }

    #[test]
    fn test_complete_nick_with_suffix() {
        let mut host = MockHost::new();
        let key = ChannelKey::new("n", "#dev");
        host.rosters.insert(key.clone(), vec!["alice".into(), "albert".into()]);
        let refs = ChannelRefs::build([&key], |_| true);
        let recency = Recency::new();
        let mut completer = Completer::default();

        let line = completer.complete(Direction::Forward, "#dev al", &refs, &recency, &host);
        assert_eq!(line.as_deref(), Some("#dev albert: "));
        let line = completer.complete(Direction::Forward, "#dev albert: ", &refs, &recency, &host);
        assert_eq!(line.as_deref(), Some("#dev alice: "));

        completer.clear();
        let line = completer.complete(Direction::Forward, "#dev hi ali", &refs, &recency, &host);
        assert_eq!(line.as_deref(), Some("#dev hi alice "));
    }

    #[test]
    fn test_complete_unknown_target_is_silent() {
        let host = MockHost::new();
        let refs = refs_for(&[("n", "#dev")]);
        let mut completer = Completer::default();
        let line = completer.complete(Direction::Forward, "#nope al", &refs, &Recency::new(), &host);
        assert_eq!(line, None);
        assert!(!completer.is_active());
    }
}
