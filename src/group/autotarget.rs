//! Auto-targeting: keep an idle compose line pointed at the channel the
//! conversation moved to.

use crate::group::refs::ChannelRefs;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetAction {
    /// Empty the compose line.
    Clear,
    /// Rewrite the compose line to `<ref> `.
    Update,
}

impl TargetAction {
    pub const NAMES: &'static [&'static str] = &["clear", "update"];

    pub fn as_str(self) -> &'static str {
        match self {
            TargetAction::Clear => "clear",
            TargetAction::Update => "update",
        }
    }
}

impl fmt::Display for TargetAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clear" => Ok(TargetAction::Clear),
            "update" => Ok(TargetAction::Update),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutoTargetPolicy {
    pub enabled: bool,
    pub action: TargetAction,
    /// Quiet time after which even a typed-in target is replaced.
    pub busy_delay: Duration,
    /// Quiet time after which an empty compose line is retargeted.
    pub idle_delay: Duration,
}

impl Default for AutoTargetPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            action: TargetAction::Update,
            busy_delay: Duration::from_secs(10),
            idle_delay: Duration::from_secs(2),
        }
    }
}

/// Time of the user's last key press in a group.
#[derive(Debug, Clone)]
pub struct AutoTarget {
    last_action: Instant,
}

impl AutoTarget {
    pub fn new(now: Instant) -> Self {
        Self { last_action: now }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_action = now;
    }

    /// Decide whether activity on `active_ref` should rewrite the compose
    /// line. Returns the new line, or `None` to leave it alone.
    pub fn decide(
        &self,
        policy: &AutoTargetPolicy,
        compose: &str,
        active_ref: &str,
        refs: &ChannelRefs,
        now: Instant,
    ) -> Option<String> {
        if !policy.enabled {
            return None;
        }

        let line = compose.trim();
        let elapsed = now.saturating_duration_since(self.last_action);
        let quiet = elapsed > policy.busy_delay || (line.is_empty() && elapsed > policy.idle_delay);
        if !quiet {
            return None;
        }

        let stale_target = line != active_ref && refs.contains(line);
        if !line.is_empty() && !stale_target {
            return None;
        }

        let next = match policy.action {
            TargetAction::Clear => String::new(),
            TargetAction::Update => format!("{} ", active_ref),
        };
        (next != compose).then_some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::host::ChannelKey;

    fn refs() -> ChannelRefs {
        let keys = [ChannelKey::new("n", "#general"), ChannelKey::new("n", "#random")];
        ChannelRefs::build(&keys, |_| true)
    }

    fn policy(action: TargetAction) -> AutoTargetPolicy {
        AutoTargetPolicy {
            enabled: true,
            action,
            busy_delay: Duration::from_secs(10),
            idle_delay: Duration::from_secs(3),
        }
    }

    #[test]
    fn test_idle_empty_line_is_updated() {
        let t0 = Instant::now();
        let at = AutoTarget::new(t0);
        let now = t0 + Duration::from_secs(20);
        let next = at.decide(&policy(TargetAction::Update), "", "#general", &refs(), now);
        assert_eq!(next.as_deref(), Some("#general "));
    }

    #[test]
    fn test_short_idle_only_applies_to_empty_line() {
        let t0 = Instant::now();
        let at = AutoTarget::new(t0);
        let now = t0 + Duration::from_secs(5);
        let p = policy(TargetAction::Update);

        assert_eq!(at.decide(&p, "", "#general", &refs(), now).as_deref(), Some("#general "));
        assert_eq!(at.decide(&p, "#random ", "#general", &refs(), now), None);
    }

    #[test]
    fn test_stale_ref_replaced_after_busy_delay() {
        let t0 = Instant::now();
        let at = AutoTarget::new(t0);
        let now = t0 + Duration::from_secs(11);
        let next = at.decide(&policy(TargetAction::Update), "#random ", "#general", &refs(), now);
        assert_eq!(next.as_deref(), Some("#general "));
    }

    #[test]
    fn test_manual_addressing_left_alone() {
        let t0 = Instant::now();
        let at = AutoTarget::new(t0);
        let now = t0 + Duration::from_secs(60);
        let p = policy(TargetAction::Update);

        assert_eq!(at.decide(&p, "#elsewhere ", "#general", &refs(), now), None);
        assert_eq!(at.decide(&p, "#random half a thought", "#general", &refs(), now), None);
    }

    #[test]
    fn test_recent_activity_blocks_retarget() {
        let t0 = Instant::now();
        let mut at = AutoTarget::new(t0);
        at.touch(t0 + Duration::from_secs(30));
        let now = t0 + Duration::from_secs(31);
        assert_eq!(at.decide(&policy(TargetAction::Update), "", "#general", &refs(), now), None);
    }

    #[test]
    fn test_clear_action_and_disabled_policy() {
        let t0 = Instant::now();
        let at = AutoTarget::new(t0);
        let now = t0 + Duration::from_secs(30);

        let next = at.decide(&policy(TargetAction::Clear), "#random ", "#general", &refs(), now);
        assert_eq!(next.as_deref(), Some(""));

        let mut off = policy(TargetAction::Clear);
        off.enabled = false;
        assert_eq!(at.decide(&off, "#random ", "#general", &refs(), now), None);
    }

    #[test]
    fn test_decision_is_idempotent() {
        let t0 = Instant::now();
        let at = AutoTarget::new(t0);
        let now = t0 + Duration::from_secs(30);

        let update = policy(TargetAction::Update);
        assert_eq!(at.decide(&update, "#general ", "#general", &refs(), now), None);
        let clear = policy(TargetAction::Clear);
        assert_eq!(at.decide(&clear, "", "#general", &refs(), now), None);
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!("Update".parse::<TargetAction>(), Ok(TargetAction::Update));
        assert_eq!("clear".parse::<TargetAction>(), Ok(TargetAction::Clear));
        assert!("nope".parse::<TargetAction>().is_err());
    }
}
