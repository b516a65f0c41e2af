//! Typed per-group options.
//!
//! Options travel through `groups.toml` and `/group set` as loosely typed
//! values; every one of them is checked against [`SCHEMA`] before a group
//! sees it.

use crate::group::autotarget::{AutoTargetPolicy, TargetAction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<OptionValue>),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Int(i) => write!(f, "{}", i),
            OptionValue::Float(x) => write!(f, "{}", x),
            OptionValue::Str(s) => write!(f, "{}", s),
            OptionValue::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    /// Non-negative seconds.
    Seconds,
    /// One of a fixed set of words.
    Choice(&'static [&'static str]),
    /// Non-empty list of mIRC colour numbers.
    ColorList,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::Bool => f.write_str("a boolean"),
            OptionKind::Seconds => f.write_str("a number of seconds"),
            OptionKind::Choice(names) => write!(f, "one of {}", names.join(", ")),
            OptionKind::ColorList => f.write_str("a list of colour numbers (0-98)"),
        }
    }
}

pub struct OptionSpec {
    pub name: &'static str,
    pub kind: OptionKind,
    pub default: fn() -> OptionValue,
    pub help: &'static str,
}

/// Upper bound for delay options: one day.
const MAX_DELAY_SECS: f64 = 86_400.0;

const AFTER_SEND_NAMES: &[&str] = &["target", "line"];

/// Every option a group understands.
pub const SCHEMA: &[OptionSpec] = &[
    OptionSpec {
        name: "hide_inline_channel",
        kind: OptionKind::Bool,
        default: || OptionValue::Bool(true),
        help: "shorten the channel marker while a conversation stays in one channel",
    },
    OptionSpec {
        name: "channel_colors",
        kind: OptionKind::ColorList,
        default: || {
            OptionValue::List(
                [19, 20, 22, 24, 25, 26, 27, 28, 29]
                    .into_iter()
                    .map(OptionValue::Int)
                    .collect(),
            )
        },
        help: "palette channel markers are coloured from",
    },
    OptionSpec {
        name: "auto_target",
        kind: OptionKind::Bool,
        default: || OptionValue::Bool(true),
        help: "retarget the compose line when the conversation moves",
    },
    OptionSpec {
        name: "auto_target_action",
        kind: OptionKind::Choice(TargetAction::NAMES),
        default: || OptionValue::Str("update".to_string()),
        help: "clear the compose line, or update it to the new channel",
    },
    OptionSpec {
        name: "auto_target_busy_delay",
        kind: OptionKind::Seconds,
        default: || OptionValue::Float(10.0),
        help: "seconds without a key press before a typed target is replaced",
    },
    OptionSpec {
        name: "auto_target_idle_delay",
        kind: OptionKind::Seconds,
        default: || OptionValue::Float(2.0),
        help: "seconds without a key press before an empty line is targeted",
    },
    OptionSpec {
        name: "after_send",
        kind: OptionKind::Choice(AFTER_SEND_NAMES),
        default: || OptionValue::Str("target".to_string()),
        help: "after sending, keep just the target or the whole line",
    },
    OptionSpec {
        name: "catch_all",
        kind: OptionKind::Bool,
        default: || OptionValue::Bool(false),
        help: "adopt every channel no other group claims",
    },
];

pub fn spec(name: &str) -> Option<&'static OptionSpec> {
    SCHEMA.iter().find(|s| s.name == name)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("unknown option '{0}'")]
    Unknown(String),
    #[error("option '{name}' expects {expected}, got '{got}'")]
    Mismatch {
        name: String,
        expected: String,
        got: String,
    },
}

/// What the compose line holds after a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterSend {
    /// `<ref> `, ready for the next line to the same channel.
    Target,
    /// The line just sent.
    Line,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupOptions {
    values: BTreeMap<String, OptionValue>,
}

impl Default for GroupOptions {
    fn default() -> Self {
        let values = SCHEMA
            .iter()
            .map(|s| (s.name.to_string(), (s.default)()))
            .collect();
        Self { values }
    }
}

impl GroupOptions {
    /// Build from persisted values. Invalid entries keep their defaults and
    /// are reported back.
    pub fn from_map(map: &BTreeMap<String, OptionValue>) -> (Self, Vec<OptionError>) {
        let mut options = Self::default();
        let mut errors = Vec::new();
        for (name, value) in map {
            if let Err(e) = options.set_value(name, value.clone()) {
                errors.push(e);
            }
        }
        (options, errors)
    }

    pub fn to_map(&self) -> BTreeMap<String, OptionValue> {
        self.values.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn set_value(&mut self, name: &str, value: OptionValue) -> Result<(), OptionError> {
        let spec = spec(name).ok_or_else(|| OptionError::Unknown(name.to_string()))?;
        let value = validate(spec, value)?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Set an option from user-typed text.
    pub fn set(&mut self, name: &str, raw: &str) -> Result<(), OptionError> {
        let spec = spec(name).ok_or_else(|| OptionError::Unknown(name.to_string()))?;
        let value = parse_raw(spec, raw.trim())?;
        self.set_value(name, value)
    }

    fn bool(&self, name: &str) -> bool {
        match self.values.get(name) {
            Some(OptionValue::Bool(b)) => *b,
            _ => false,
        }
    }

    fn seconds(&self, name: &str) -> Duration {
        match self.values.get(name) {
            Some(OptionValue::Float(x)) => Duration::try_from_secs_f64(*x).unwrap_or(Duration::ZERO),
            _ => Duration::ZERO,
        }
    }

    fn word(&self, name: &str) -> &str {
        match self.values.get(name) {
            Some(OptionValue::Str(s)) => s.as_str(),
            _ => "",
        }
    }

    pub fn hide_inline_channel(&self) -> bool {
        self.bool("hide_inline_channel")
    }

    pub fn catch_all(&self) -> bool {
        self.bool("catch_all")
    }

    pub fn channel_colors(&self) -> Vec<u8> {
        match self.values.get("channel_colors") {
            Some(OptionValue::List(items)) => items
                .iter()
                .filter_map(|v| match v {
                    OptionValue::Int(i) => u8::try_from(*i).ok(),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Colour for a channel marker: the channel name's length picks a
    /// palette entry, the same way nick colours are picked.
    pub fn channel_color(&self, channel: &str) -> u8 {
        let palette = self.channel_colors();
        if palette.is_empty() {
            return 0;
        }
        palette[channel.chars().count() % palette.len()]
    }

    pub fn auto_target_policy(&self) -> AutoTargetPolicy {
        AutoTargetPolicy {
            enabled: self.bool("auto_target"),
            action: self
                .word("auto_target_action")
                .parse()
                .unwrap_or(TargetAction::Update),
            busy_delay: self.seconds("auto_target_busy_delay"),
            idle_delay: self.seconds("auto_target_idle_delay"),
        }
    }

    pub fn after_send(&self) -> AfterSend {
        match self.word("after_send") {
            "line" => AfterSend::Line,
            _ => AfterSend::Target,
        }
    }
}

fn mismatch(spec: &OptionSpec, got: impl fmt::Display) -> OptionError {
    OptionError::Mismatch {
        name: spec.name.to_string(),
        expected: spec.kind.to_string(),
        got: got.to_string(),
    }
}

fn validate(spec: &OptionSpec, value: OptionValue) -> Result<OptionValue, OptionError> {
    match (spec.kind, &value) {
        (OptionKind::Bool, OptionValue::Bool(_)) => Ok(value),
        (OptionKind::Seconds, OptionValue::Int(i)) if (0..=MAX_DELAY_SECS as i64).contains(i) => {
            Ok(OptionValue::Float(*i as f64))
        }
        (OptionKind::Seconds, OptionValue::Float(x)) if (0.0..=MAX_DELAY_SECS).contains(x) => Ok(value),
        (OptionKind::Choice(names), OptionValue::Str(s)) => {
            let lower = s.to_ascii_lowercase();
            if names.contains(&lower.as_str()) {
                Ok(OptionValue::Str(lower))
            } else {
                Err(mismatch(spec, s))
            }
        }
        (OptionKind::ColorList, OptionValue::List(items))
            if !items.is_empty()
                && items
                    .iter()
                    .all(|v| matches!(v, OptionValue::Int(i) if (0..=98).contains(i))) =>
        {
            Ok(value)
        }
        _ => Err(mismatch(spec, &value)),
    }
}

fn parse_raw(spec: &OptionSpec, raw: &str) -> Result<OptionValue, OptionError> {
    match spec.kind {
        OptionKind::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Ok(OptionValue::Bool(true)),
            "false" | "off" | "no" | "0" => Ok(OptionValue::Bool(false)),
            _ => Err(mismatch(spec, raw)),
        },
        OptionKind::Seconds => raw
            .parse::<f64>()
            .map(OptionValue::Float)
            .map_err(|_| mismatch(spec, raw)),
        OptionKind::Choice(_) => Ok(OptionValue::Str(raw.to_string())),
        OptionKind::ColorList => raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<i64>().map(OptionValue::Int))
            .collect::<Result<Vec<_>, _>>()
            .map(OptionValue::List)
            .map_err(|_| mismatch(spec, raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let o = GroupOptions::default();
        assert!(o.hide_inline_channel());
        assert!(!o.catch_all());
        assert_eq!(o.after_send(), AfterSend::Target);
        let p = o.auto_target_policy();
        assert!(p.enabled);
        assert_eq!(p.action, TargetAction::Update);
        assert_eq!(p.busy_delay, Duration::from_secs(10));
        assert_eq!(o.channel_colors().len(), 9);
    }

    #[test]
    fn test_instances_do_not_share_state() {
        let mut a = GroupOptions::default();
        let b = GroupOptions::default();
        a.set("catch_all", "on").unwrap();
        assert!(a.catch_all());
        assert!(!b.catch_all());
    }

    #[test]
    fn test_set_from_text() {
        let mut o = GroupOptions::default();
        o.set("auto_target_action", "CLEAR").unwrap();
        o.set("auto_target_busy_delay", "2.5").unwrap();
        o.set("channel_colors", "4, 7 9").unwrap();
        o.set("after_send", "line").unwrap();

        assert_eq!(o.auto_target_policy().action, TargetAction::Clear);
        assert_eq!(o.auto_target_policy().busy_delay, Duration::from_millis(2500));
        assert_eq!(o.channel_colors(), vec![4, 7, 9]);
        assert_eq!(o.after_send(), AfterSend::Line);
    }

    #[test]
    fn test_unknown_and_mismatched_options() {
        let mut o = GroupOptions::default();
        assert_eq!(o.set("colour", "1"), Err(OptionError::Unknown("colour".into())));
        assert!(matches!(o.set("auto_target", "maybe"), Err(OptionError::Mismatch { .. })));
        assert!(matches!(o.set("auto_target_action", "delete"), Err(OptionError::Mismatch { .. })));
        assert!(matches!(o.set("auto_target_idle_delay", "-1"), Err(OptionError::Mismatch { .. })));
        assert!(matches!(o.set("channel_colors", "red"), Err(OptionError::Mismatch { .. })));
        assert!(matches!(o.set("channel_colors", ""), Err(OptionError::Mismatch { .. })));
        assert_eq!(o, GroupOptions::default());
    }

    #[test]
    fn test_from_map_keeps_defaults_for_bad_entries() {
        let mut map = BTreeMap::new();
        map.insert("auto_target".to_string(), OptionValue::Str("yes".into()));
        map.insert("auto_target_idle_delay".to_string(), OptionValue::Int(5));
        map.insert("bogus".to_string(), OptionValue::Bool(true));

        let (o, errors) = GroupOptions::from_map(&map);
        assert_eq!(errors.len(), 2);
        assert!(o.auto_target_policy().enabled);
        assert_eq!(o.auto_target_policy().idle_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_huge_delays_are_rejected() {
        let mut o = GroupOptions::default();
        assert!(matches!(o.set("auto_target_busy_delay", "1e30"), Err(OptionError::Mismatch { .. })));
        assert!(matches!(o.set("auto_target_idle_delay", "inf"), Err(OptionError::Mismatch { .. })));
        o.set("auto_target_idle_delay", "86400").unwrap();
        assert_eq!(o.auto_target_policy().idle_delay, Duration::from_secs(86_400));

        let mut map = BTreeMap::new();
        map.insert("auto_target_busy_delay".to_string(), OptionValue::Float(1e30));
        map.insert("auto_target_idle_delay".to_string(), OptionValue::Int(i64::MAX));
        let (o, errors) = GroupOptions::from_map(&map);
        assert_eq!(errors.len(), 2);
        assert_eq!(o.auto_target_policy().busy_delay, Duration::from_secs(10));
        assert_eq!(o.auto_target_policy().idle_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_channel_color_uses_name_length() {
        let mut o = GroupOptions::default();
        o.set("channel_colors", "10,11,12").unwrap();
        assert_eq!(o.channel_color("#a"), 12);
        assert_eq!(o.channel_color("#ab"), 10);
        assert_eq!(o.channel_color("#abc"), 11);
    }

    #[test]
    fn test_toml_round_trip() {
        let o = GroupOptions::default();
        let text = toml::to_string(&o.to_map()).unwrap();
        let map: BTreeMap<String, OptionValue> = toml::from_str(&text).unwrap();
        let (back, errors) = GroupOptions::from_map(&map);
        assert!(errors.is_empty());
        assert_eq!(back, o);
    }
}
