//! User slash-command parser.
//!
//! Parses `/command arg1 arg2 ...` input lines into typed [`ParsedCommand`]
//! values that the event handler can act on.

/// A parsed user command. Each variant corresponds to a `/command`.
#[derive(Debug, PartialEq)]
pub enum ParsedCommand {
    ServerConnect { name: String },
    ServerList,
    ServerDisconnect,
    Join { channel: String },
    Part { channel: Option<String>, reason: Option<String> },
    Nick { nick: String },
    Msg { target: String, text: String },
    Me { text: String },
    Quit { message: Option<String> },
    Help,
    Mode { target: String, modes: String },
    Topic { text: String },
    Notice { target: String, text: String },
    Raw { command: String },
    Group(GroupCommand),
}

/// `/group` subcommands.
#[derive(Debug, PartialEq)]
pub enum GroupCommand {
    Create { name: String },
    Remove { name: String },
    Rename { old: String, new: String },
    /// Without a network and channel, the active channel buffer is used.
    Add { group: String, target: Option<(String, String)> },
    Del { group: String, target: Option<(String, String)> },
    Set { group: String, option: String, value: String },
    /// List the options of a group.
    Options { group: String },
    Open { name: String },
    List,
    Usage,
}

pub const COMMANDS: &[&str] = &[
    "server", "join", "part", "nick", "msg", "query", "me", "quit", "exit", "help", "mode", "topic",
    "notice", "raw", "quote", "group",
];

pub const GROUP_SUBCMDS: &[&str] = &["create", "remove", "rename", "add", "del", "set", "open", "list"];

pub const GROUP_USAGE: &[&str] = &[
    "/group create <name>",
    "/group remove <name>",
    "/group rename <old> <new>",
    "/group add <group> [<network> <channel>]",
    "/group del <group> [<network> <channel>]",
    "/group set <group> [<option> <value>]",
    "/group open <name>",
    "/group list",
];

/// Parse a slash-command string into a [`ParsedCommand`].
///
/// Returns `None` if the input does not start with `/` or is not a recognized
/// command. Commands are case-insensitive.
pub fn parse_command(input: &str) -> Option<ParsedCommand> {
    let input = input.trim();
    let body = input.strip_prefix('/')?;

    let parts: Vec<&str> = body.splitn(3, ' ').collect();
    let cmd = parts.first()?.to_lowercase();
    let arg = |i: usize| parts.get(i).map(|s| s.trim()).filter(|s| !s.is_empty());

    match cmd.as_str() {
        "server" => {
            let subcmd = arg(1).map(str::to_lowercase).unwrap_or_default();
            match subcmd.as_str() {
                "connect" => Some(ParsedCommand::ServerConnect { name: arg(2)?.to_string() }),
                "list" | "ls" => Some(ParsedCommand::ServerList),
                "disconnect" | "dc" => Some(ParsedCommand::ServerDisconnect),
                _ => None,
            }
        }
        "join" | "j" => {
            let channel = arg(1)?.to_string();
            let channel = if !channel.starts_with('#') && !channel.starts_with('&') {
                format!("#{}", channel)
            } else {
                channel
            };
            Some(ParsedCommand::Join { channel })
        }
        "part" | "leave" => {
            let (channel, reason) = match (arg(1), arg(2)) {
                (Some(a), rest) if a.starts_with('#') || a.starts_with('&') => {
                    (Some(a.to_string()), rest.map(str::to_string))
                }
                (Some(a), Some(rest)) => (None, Some(format!("{} {}", a, rest))),
                (Some(a), None) => (None, Some(a.to_string())),
                (None, _) => (None, None),
            };
            Some(ParsedCommand::Part { channel, reason })
        }
        "nick" => Some(ParsedCommand::Nick { nick: arg(1)?.to_string() }),
        "msg" | "query" => Some(ParsedCommand::Msg {
            target: arg(1)?.to_string(),
            text: parts.get(2).unwrap_or(&"").to_string(),
        }),
        "me" => Some(ParsedCommand::Me { text: rest_after(body, 1) }),
        "quit" | "exit" => {
            let message = Some(rest_after(body, 1)).filter(|m| !m.is_empty());
            Some(ParsedCommand::Quit { message })
        }
        "help" => Some(ParsedCommand::Help),
        "mode" => Some(ParsedCommand::Mode {
            target: arg(1)?.to_string(),
            modes: arg(2).unwrap_or_default().to_string(),
        }),
        "topic" => Some(ParsedCommand::Topic { text: rest_after(body, 1) }),
        "notice" => Some(ParsedCommand::Notice {
            target: arg(1)?.to_string(),
            text: arg(2)?.to_string(),
        }),
        "raw" | "quote" => Some(ParsedCommand::Raw { command: arg(1).map(|_| rest_after(body, 1))? }),
        "group" => Some(ParsedCommand::Group(parse_group(&rest_after(body, 1)))),
        _ => None,
    }
}

/// Everything after the first `n` space-separated words.
fn rest_after(body: &str, n: usize) -> String {
    body.splitn(n + 1, ' ').nth(n).unwrap_or_default().trim().to_string()
}

fn parse_group(args: &str) -> GroupCommand {
    let words: Vec<&str> = args.split_whitespace().collect();
    let sub = words.first().map(|s| s.to_lowercase()).unwrap_or_default();
    let word = |i: usize| words.get(i).map(|s| s.to_string());
    let target = || match (word(2), word(3)) {
        (Some(network), Some(channel)) => Some((network, channel)),
        _ => None,
    };

    let parsed = match sub.as_str() {
        "create" | "new" => word(1).map(|name| GroupCommand::Create { name }),
        "remove" | "rm" | "delete" => word(1).map(|name| GroupCommand::Remove { name }),
        "rename" => word(1).zip(word(2)).map(|(old, new)| GroupCommand::Rename { old, new }),
        "add" => word(1).map(|group| GroupCommand::Add { group, target: target() }),
        "del" => word(1).map(|group| GroupCommand::Del { group, target: target() }),
        "set" => match (word(1), word(2)) {
            (Some(group), Some(option)) => {
                let value = rest_after(args.trim(), 3);
                if value.is_empty() {
                    None
                } else {
                    Some(GroupCommand::Set { group, option, value })
                }
            }
            (Some(group), None) => Some(GroupCommand::Options { group }),
            _ => None,
        },
        "open" => word(1).map(|name| GroupCommand::Open { name }),
        "list" | "ls" => Some(GroupCommand::List),
        _ => None,
    };
    parsed.unwrap_or(GroupCommand::Usage)
}
