//! Display template compiler.
//!
//! Reads `pevents.conf`-style event text (`event_name=` / `event_text=` line
//! pairs), decodes the `%B`/`%C`/`$t`/`$1`.. escape codes, and compiles each
//! recognised event into a [`Template`] with positional slots. Slot 0 is the
//! channel marker a group prepends to every line; slots 1-5 are the event's
//! own fields.

use crate::group::host::EventKind;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Templates shipped with the binary, used when no path is configured.
pub const BUNDLED_PEVENTS: &str = include_str!("../../assets/pevents.conf");

/// Number of arguments a template is rendered against: channel marker, nick
/// and four further fields.
pub const SLOT_COUNT: usize = 6;

const ESCAPES: &[(&str, &str)] = &[
    ("%B", "\x02"),
    ("%C", "\x03"),
    ("%R", "\x16"),
    ("%O", "\x0f"),
    ("%U", "\x1f"),
    ("%H", "\x08"),
    ("$t", "\t"),
];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("cannot read event templates from {path}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(usize),
}

/// A compiled event template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Compile raw event text. `indent` places the channel slot after the
    /// first tab instead of at the very start.
    pub fn compile(raw: &str, indent: bool) -> Self {
        let mut text = raw.to_string();
        for (code, replacement) in ESCAPES {
            text = text.replace(code, replacement);
        }
        // A tab column must not inherit the colour reset of the column
        // before it.
        let text = text.replace("\x0f\t", "\t\x0f").replace("\x03\t", "\t\x03");

        let mut segments = parse_segments(&text);
        insert_channel_slot(&mut segments, indent);
        Self { segments }
    }

    /// Render against positional arguments. Missing arguments render empty.
    pub fn render<S: AsRef<str>>(&self, args: &[S]) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(i) => {
                    if let Some(arg) = args.get(*i) {
                        out.push_str(arg.as_ref());
                    }
                }
            }
        }
        out
    }

    #[cfg(test)]
    pub fn slot_uses(&self, slot: usize) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Slot(i) if *i == slot))
            .count()
    }
}

fn parse_segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' {
            if let Some(slot) = chars.peek().and_then(|d| d.to_digit(10)) {
                if (1..SLOT_COUNT as u32).contains(&slot) {
                    chars.next();
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Slot(slot as usize));
                    continue;
                }
            }
        }
        literal.push(c);
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

fn insert_channel_slot(segments: &mut Vec<Segment>, indent: bool) {
    if indent {
        let tab = segments.iter().enumerate().find_map(|(i, s)| match s {
            Segment::Literal(text) => text.find('\t').map(|pos| (i, pos)),
            Segment::Slot(_) => None,
        });
        if let Some((i, pos)) = tab {
            if let Segment::Literal(text) = &mut segments[i] {
                let tail = text.split_off(pos + 1);
                if !tail.is_empty() {
                    segments.insert(i + 1, Segment::Literal(tail));
                }
                segments.insert(i + 1, Segment::Slot(0));
                return;
            }
        }
    }
    segments.insert(0, Segment::Slot(0));
}

/// Minimal layout for events missing from the template source.
fn fallback_text(kind: EventKind) -> &'static str {
    match kind {
        EventKind::ChannelMessage | EventKind::OwnMessage | EventKind::PrivateMessage => {
            "%B$1%O$t$2"
        }
        EventKind::ChannelHighlight => "%C08%B$1%O$t$2",
        EventKind::ChannelAction | EventKind::OwnAction | EventKind::PrivateAction => {
            "%C13*%O$t$1 $2"
        }
        EventKind::ChannelActionHighlight => "%C08*%O$t%B$1%O $2",
    }
}

/// Pull the raw text of every recognised event out of `pevents.conf` content.
pub fn parse_pevents(source: &str) -> HashMap<EventKind, String> {
    let mut raw = HashMap::new();
    let mut pending: Option<EventKind> = None;

    for line in source.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "event_name" => pending = EventKind::from_pevent_name(value),
            "event_text" => {
                if let Some(kind) = pending.take() {
                    raw.insert(kind, value.to_string());
                }
            }
            _ => {}
        }
    }
    raw
}

/// One compiled template per event kind.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    templates: HashMap<EventKind, Template>,
}

impl TemplateSet {
    pub fn from_source(source: &str, indent: bool) -> Self {
        let raw = parse_pevents(source);
        let templates = EventKind::ALL
            .into_iter()
            .map(|kind| {
                let text = raw.get(&kind).map(String::as_str).unwrap_or(fallback_text(kind));
                (kind, Template::compile(text, indent))
            })
            .collect();
        Self { templates }
    }

    /// Load from a file, or the bundled templates when `path` is `None`.
    pub fn load(path: Option<&Path>, indent: bool) -> Result<Self, TemplateError> {
        match path {
            Some(path) => {
                let source =
                    std::fs::read_to_string(path).map_err(|source| TemplateError::Unreadable {
                        path: path.display().to_string(),
                        source,
                    })?;
                Ok(Self::from_source(&source, indent))
            }
            None => Ok(Self::from_source(BUNDLED_PEVENTS, indent)),
        }
    }

    pub fn get(&self, kind: EventKind) -> &Template {
        &self.templates[&kind]
    }

    pub fn render<S: AsRef<str>>(&self, kind: EventKind, args: &[S]) -> String {
        self.get(kind).render(args)
    }
}

/// Drop a leading mIRC colour code (and a trailing reset) from a nick.
pub fn strip_color_prefix(nick: &str) -> String {
    let Some(rest) = nick.strip_prefix('\x03') else {
        return nick.to_string();
    };
    let rest = skip_digits(rest, 2);
    let rest = match rest.strip_prefix(',') {
        Some(bg) if bg.starts_with(|c: char| c.is_ascii_digit()) => skip_digits(bg, 2),
        _ => rest,
    };
    rest.trim_end_matches(['\x03', '\x0f']).to_string()
}

fn skip_digits(s: &str, max: usize) -> &str {
    let n = s
        .char_indices()
        .take(max)
        .take_while(|(_, c)| c.is_ascii_digit())
        .count();
    &s[n..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_and_slots() {
        let t = Template::compile("%B$1%B said $2", false);
        assert_eq!(t.render(&["[#a] ", "bob", "hi"]), "[#a] \x02bob\x02 said hi");
    }

    #[test]
    fn test_reset_before_tab_is_swapped() {
        let t = Template::compile("%C18$1%O$t$2", false);
        assert_eq!(t.render(&["", "nick", "text"]), "\x0318nick\t\x0ftext");
    }

    #[test]
    fn test_channel_slot_after_tab_when_indented() {
        let t = Template::compile("$1$t$2", true);
        assert_eq!(t.render(&["<c>", "nick", "text"]), "nick\t<c>text");

        let t = Template::compile("$1$t$2", false);
        assert_eq!(t.render(&["<c>", "nick", "text"]), "<c>nick\ttext");
    }

    #[test]
    fn test_indent_without_tab_prefixes() {
        let t = Template::compile("* $1 $2", true);
        assert_eq!(t.render(&["<c>", "nick", "waves"]), "<c>* nick waves");
    }

    #[test]
    fn test_short_args_render_empty() {
        let t = Template::compile("$1 $2 $3 $4 $5", true);
        assert_eq!(t.render(&["c"]), "c    ");
        let empty: [&str; 0] = [];
        assert_eq!(t.render(&empty), "    ");
    }

    #[test]
    fn test_channel_slot_placed_exactly_once() {
        for raw in ["", "$t", "$1$t$2$t$3", "%C18%H<%H$4$1%H>%H%O$t$2", "$5$9$$"] {
            for indent in [true, false] {
                let t = Template::compile(raw, indent);
                assert_eq!(t.slot_uses(0), 1, "{raw:?} indent={indent}");
            }
        }
    }

    #[test]
    fn test_unknown_dollar_codes_stay_literal() {
        let t = Template::compile("$9 $a $", false);
        assert_eq!(t.render(&["", "x"]), "$9 $a $");
    }

    #[test]
    fn test_parse_pevents() {
        let source = "\
event_name=Channel Message
event_text=$1$t$2

event_name=Part
event_text=$1 left
event_name=Your Action
event_text=* $1 $2
";
        let raw = parse_pevents(source);
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[&EventKind::ChannelMessage], "$1$t$2");
        assert_eq!(raw[&EventKind::OwnAction], "* $1 $2");
    }

    #[test]
    fn test_template_set_fills_missing_events() {
        let set = TemplateSet::from_source("event_name=Channel Message\nevent_text=<$1> $2\n", false);
        assert_eq!(set.render(EventKind::ChannelMessage, &["", "a", "b"]), "<a> b");
        let action = set.render(EventKind::ChannelAction, &["", "a", "waves"]);
        assert!(action.contains("a waves"));
    }

    #[test]
    fn test_bundled_templates_cover_all_events() {
        let raw = parse_pevents(BUNDLED_PEVENTS);
        for kind in EventKind::ALL {
            assert!(raw.contains_key(&kind), "missing {}", kind.pevent_name());
        }
    }

    #[test]
    fn test_missing_template_file_is_an_error() {
        let result = TemplateSet::load(Some(Path::new("/nonexistent/crabmux/pevents.conf")), true);
        assert!(matches!(result, Err(TemplateError::Unreadable { .. })));
    }

    #[test]
    fn test_strip_color_prefix() {
        assert_eq!(strip_color_prefix("\x0312alice\x03"), "alice");
        assert_eq!(strip_color_prefix("\x034,12bob"), "bob");
        assert_eq!(strip_color_prefix("carol"), "carol");
        assert_eq!(strip_color_prefix("\x03dave"), "dave");
    }
}
