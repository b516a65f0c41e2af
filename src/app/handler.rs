use crate::app::action::Action;
use crate::app::event::{AppEvent, ServerId};
use crate::app::state::*;
use crate::group::complete::Direction;
use crate::group::host::{ChannelKey, ChatEvent, EventKind};
use crate::group::options;
use crate::group::{is_channel_shaped, GroupError, KeyInput};
use crate::irc::commands::{self, GroupCommand, ParsedCommand};
use chrono::Local;
use crossterm::event::{Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Instant;
use tracing::{debug, info};

pub fn handle_event(app: &mut AppState, event: AppEvent) -> Vec<Action> {
    let mut actions = match event {
        AppEvent::Terminal(cevent) => {
            app.client.dirty = true;
            handle_terminal(app, cevent)
        }
        AppEvent::IrcMessage { server_id, message } => {
            handle_irc_message(app, server_id, message);
            vec![]
        }
        AppEvent::IrcConnected { server_id } => {
            if let Some(srv) = app.client.get_server_mut(server_id) {
                srv.status = ConnectionStatus::Connected;
                info!(server = %srv.name, "connected");
            }
            let key = BufferKey::ServerStatus(server_id);
            app.client.system_message(&key, "Connected to server.".to_string());
            refresh_groups(app);
            vec![]
        }
        AppEvent::IrcDisconnected { server_id, reason } => {
            mark_disconnected(app, server_id);
            let key = BufferKey::ServerStatus(server_id);
            app.client.system_message(&key, format!("Disconnected: {}", reason));
            vec![]
        }
        AppEvent::IrcError { server_id, error } => {
            let key = BufferKey::ServerStatus(server_id);
            app.client.error_message(&key, error);
            vec![]
        }
        AppEvent::Tick => {
            app.client.expire_status(Instant::now());
            vec![]
        }
    };

    flush_echo(app);
    actions.append(&mut app.client.pending_actions);
    actions
}

/// Forget a server's channels and let groups notice they are gone.
pub fn mark_disconnected(app: &mut AppState, server_id: ServerId) {
    if let Some(srv) = app.client.get_server_mut(server_id) {
        srv.status = ConnectionStatus::Disconnected;
        srv.reset_session();
        info!(server = %srv.name, "disconnected");
    }
    refresh_groups(app);
}

/// Rebuild group refs after the set of live channels changed.
pub fn refresh_groups(app: &mut AppState) {
    app.groups.refresh_contexts(&app.client);
    app.client.dirty = true;
}

/// Render a chat event into the groups subscribed to its channel.
fn dispatch_chat(app: &mut AppState, event: &ChatEvent, now: Instant) {
    let outcome = app.groups.dispatch(&mut app.client, event, now);
    if outcome.adopted.is_some() {
        app.client.pending_actions.push(Action::SaveGroups);
    }
}

/// Our own outgoing messages go through groups like everyone else's.
fn flush_echo(app: &mut AppState) {
    let echoes = std::mem::take(&mut app.client.pending_echo);
    if echoes.is_empty() {
        return;
    }
    let now = Instant::now();
    for event in &echoes {
        dispatch_chat(app, event, now);
    }
}

fn handle_terminal(app: &mut AppState, event: CEvent) -> Vec<Action> {
    match event {
        CEvent::Key(key) if key.kind != KeyEventKind::Release => handle_key(app, key),
        CEvent::Resize(_, _) => {
            app.client.dirty = true;
            vec![]
        }
        _ => vec![],
    }
}

fn handle_key(app: &mut AppState, key: KeyEvent) -> Vec<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    if ctrl && key.code == KeyCode::Char('c') {
        return vec![Action::Quit { message: None }];
    }

    match key.code {
        KeyCode::Left if alt => {
            app.client.select_prev_buffer();
            return vec![];
        }
        KeyCode::Right if alt => {
            app.client.select_next_buffer();
            return vec![];
        }
        KeyCode::Char('p') if ctrl => {
            app.client.select_prev_buffer();
            return vec![];
        }
        KeyCode::Char('n') if ctrl => {
            app.client.select_next_buffer();
            return vec![];
        }
        KeyCode::PageUp => {
            scroll_up(&mut app.client);
            return vec![];
        }
        KeyCode::PageDown => {
            scroll_down(&mut app.client);
            return vec![];
        }
        _ => {}
    }

    match app.client.active_group().map(str::to_owned) {
        Some(group) => handle_group_key(app, &group, key),
        None if matches!(key.code, KeyCode::Modifier(_)) => vec![],
        None => handle_input_key(app, key),
    }
}

fn handle_group_key(app: &mut AppState, group: &str, key: KeyEvent) -> Vec<Action> {
    let now = Instant::now();
    let input = match key.code {
        KeyCode::Tab => KeyInput::Complete(Direction::Forward),
        KeyCode::BackTab => KeyInput::Complete(Direction::Reverse),
        KeyCode::Modifier(_) => KeyInput::Modifier,
        _ => KeyInput::Other,
    };

    match app.groups.on_key(&mut app.client, group, input, now) {
        Ok(true) => return vec![],
        Ok(false) if input == KeyInput::Modifier => return vec![],
        Ok(false) => {}
        Err(e) => {
            app.client.notify(e.to_string(), true);
            return vec![];
        }
    }

    if key.code == KeyCode::Enter {
        return submit_group_line(app, group, now);
    }
    edit_input(app.client.input_mut(), key);
    vec![]
}

fn submit_group_line(app: &mut AppState, group: &str, now: Instant) -> Vec<Action> {
    let line = app.client.input().text.clone();
    if line.trim().is_empty() {
        return vec![];
    }
    if line.starts_with('/') && !line.starts_with("//") {
        let text = app.client.input_mut().take_text();
        return handle_command(app, &text);
    }

    app.client.input_mut().remember(&line);
    match app.groups.submit(&mut app.client, group, &line, now) {
        Ok(outcome) => debug!(group, ?outcome, "group submit"),
        Err(e) => app.client.notify(e.to_string(), true),
    }
    vec![]
}

/// Line editing shared by every buffer. Returns whether the key was used.
fn edit_input(input: &mut InputState, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Backspace if key.modifiers.contains(KeyModifiers::ALT) => input.delete_word_back(),
        KeyCode::Backspace => input.delete_back(),
        KeyCode::Delete => input.delete_forward(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        KeyCode::Up => input.history_up(),
        KeyCode::Down => input.history_down(),
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => match c {
            'a' => input.move_home(),
            'e' => input.move_end(),
            'w' => input.delete_word_back(),
            'u' => input.clear(),
            _ => return false,
        },
        KeyCode::Char(c) => input.insert_char(c),
        _ => return false,
    }
    true
}

fn handle_input_key(app: &mut AppState, key: KeyEvent) -> Vec<Action> {
    match key.code {
        KeyCode::Enter => {
            let text = app.client.input_mut().take_text();
            if text.is_empty() {
                return vec![];
            }
            if text.starts_with('/') && !text.starts_with("//") {
                return handle_command(app, &text);
            }
            let text = text.strip_prefix('/').unwrap_or(&text).to_string();
            send_to_active(app, &text, false);
            vec![]
        }
        KeyCode::Tab | KeyCode::BackTab => {
            if app.client.input().text.starts_with('/') {
                try_command_completion(app);
            } else {
                try_nick_completion(&mut app.client);
            }
            vec![]
        }
        _ => {
            edit_input(app.client.input_mut(), key);
            vec![]
        }
    }
}

fn send_to_active(app: &mut AppState, text: &str, action: bool) {
    match app.client.active_buffer.clone() {
        Some(BufferKey::Channel(server_id, target)) | Some(BufferKey::Query(server_id, target)) => {
            app.client.send_text(server_id, &target, text, action);
        }
        Some(BufferKey::Group(_)) => {
            app.client
                .notify("Start the line with a channel, e.g. #chan /me waves".to_string(), true);
        }
        Some(key @ BufferKey::ServerStatus(_)) => {
            app.client.system_message(
                &key,
                "Cannot send messages to server status buffer. Use /msg or join a channel.".to_string(),
            );
        }
        None => app.client.set_status("No active buffer".to_string()),
    }
}

fn scroll_up(client: &mut ClientState) {
    if let Some(ref key) = client.active_buffer {
        if let Some(buf) = client.buffers.get_mut(key) {
            let max_scroll = buf.messages.len().saturating_sub(1);
            buf.scroll_offset = (buf.scroll_offset + 5).min(max_scroll);
            client.dirty = true;
        }
    }
}

fn scroll_down(client: &mut ClientState) {
    if let Some(ref key) = client.active_buffer {
        if let Some(buf) = client.buffers.get_mut(key) {
            buf.scroll_offset = buf.scroll_offset.saturating_sub(5);
            client.dirty = true;
        }
    }
}

fn try_nick_completion(client: &mut ClientState) {
    let Some(BufferKey::Channel(server_id, channel)) = client.active_buffer.clone() else {
        return;
    };
    let suffix = client.prefs.completion_suffix.clone();
    let input = client.input();
    let word_start = input.text[..input.cursor].rfind(' ').map(|i| i + 1).unwrap_or(0);
    let partial = input.text[word_start..input.cursor].to_lowercase();
    if partial.is_empty() {
        return;
    }

    let nick = client
        .get_server(server_id)
        .and_then(|srv| srv.users.get(&channel))
        .and_then(|users| {
            users
                .iter()
                .find(|u| u.nick.to_lowercase().starts_with(&partial))
                .map(|u| u.nick.clone())
        });
    let Some(nick) = nick else {
        return;
    };

    let completion = if word_start == 0 {
        format!("{}{}", nick, suffix)
    } else {
        format!("{} ", nick)
    };
    let input = client.input_mut();
    let new_text = format!(
        "{}{}{}",
        &input.text[..word_start],
        completion,
        &input.text[input.cursor..]
    );
    input.text = new_text;
    input.cursor = word_start + completion.len();
}

fn try_command_completion(app: &mut AppState) {
    let text = app.client.input().text.clone();
    let parts: Vec<&str> = text[1..].splitn(3, ' ').collect();
    let cmd = parts.first().unwrap_or(&"").to_lowercase();

    let completed = if parts.len() == 1 {
        commands::COMMANDS
            .iter()
            .find(|c| c.starts_with(cmd.as_str()))
            .map(|c| format!("/{} ", c))
    } else if cmd == "group" && parts.len() == 2 {
        let sub = parts[1].to_lowercase();
        commands::GROUP_SUBCMDS
            .iter()
            .find(|s| s.starts_with(sub.as_str()))
            .map(|s| format!("/group {} ", s))
    } else if cmd == "group" {
        let sub = parts[1];
        let partial = parts.get(2).unwrap_or(&"");
        (!partial.contains(' '))
            .then(|| app.groups.names().into_iter().find(|n| n.starts_with(partial)))
            .flatten()
            .map(|name| format!("/group {} {} ", sub, name))
    } else if cmd == "server" && parts.len() == 3 {
        let partial = parts[2].to_lowercase();
        app.client
            .config
            .servers
            .iter()
            .find(|s| s.name.to_lowercase().starts_with(&partial))
            .map(|s| format!("/server {} {}", parts[1], s.name))
    } else {
        None
    };

    if let Some(line) = completed {
        app.client.input_mut().set_text(line);
    }
}

/// Target of a channel-scoped command: explicit, or the active channel.
fn resolve_channel(client: &ClientState, explicit: Option<String>) -> Option<String> {
    explicit.or_else(|| match &client.active_buffer {
        Some(BufferKey::Channel(_, c)) => Some(c.clone()),
        _ => None,
    })
}

fn handle_command(app: &mut AppState, text: &str) -> Vec<Action> {
    let server_id = app.client.active_server_id();
    let Some(parsed) = commands::parse_command(text) else {
        let name = text.split_whitespace().next().unwrap_or(text);
        app.client.notify(format!("Unknown command: {}", name), true);
        return vec![];
    };

    if let ParsedCommand::Group(cmd) = parsed {
        handle_group_command(app, cmd);
        return vec![];
    }

    let client = &mut app.client;
    match parsed {
        ParsedCommand::ServerConnect { name } => match client.config.server(&name) {
            Some(cfg) => vec![Action::ConnectServer { name: cfg.name.clone() }],
            None => {
                let names: Vec<_> = client.config.servers.iter().map(|s| s.name.clone()).collect();
                client.notify(format!("Unknown server '{}'. Available: {}", name, names.join(", ")), true);
                vec![]
            }
        },
        ParsedCommand::ServerList => {
            let lines: Vec<String> = client
                .config
                .servers
                .iter()
                .map(|cfg| {
                    let status = match client.server_by_name(&cfg.name).map(|s| &s.status) {
                        Some(ConnectionStatus::Connected) => "connected",
                        Some(ConnectionStatus::Connecting) => "connecting",
                        _ => "disconnected",
                    };
                    format!("  {} ({}:{}) [{}]", cfg.name, cfg.host, cfg.port, status)
                })
                .collect();
            for line in lines {
                client.notify(line, false);
            }
            vec![]
        }
        ParsedCommand::ServerDisconnect => match server_id {
            Some(sid) => vec![Action::DisconnectServer { server_id: sid }],
            None => no_server(client),
        },
        ParsedCommand::Join { channel } => match server_id {
            Some(sid) => vec![Action::JoinChannel { server_id: sid, channel }],
            None => no_server(client),
        },
        ParsedCommand::Part { channel, reason } => match (server_id, resolve_channel(client, channel)) {
            (Some(sid), Some(ch)) => vec![Action::PartChannel { server_id: sid, channel: ch, reason }],
            (Some(_), None) => {
                client.set_status("Not in a channel".to_string());
                vec![]
            }
            (None, _) => no_server(client),
        },
        ParsedCommand::Nick { nick } => match server_id {
            Some(sid) => vec![Action::ChangeNick { server_id: sid, nick }],
            None => no_server(client),
        },
        ParsedCommand::Msg { target, text } => {
            let Some(sid) = server_id else {
                return no_server(client);
            };
            let key = if is_channel_shaped(&target) {
                BufferKey::Channel(sid, target.clone())
            } else {
                BufferKey::Query(sid, target.clone())
            };
            client.ensure_buffer(key.clone());
            client.set_active_buffer(key);
            if !text.is_empty() {
                client.send_text(sid, &target, &text, false);
            }
            refresh_groups(app);
            vec![]
        }
        ParsedCommand::Me { text } => {
            send_to_active(app, &text, true);
            vec![]
        }
        ParsedCommand::Quit { message } => vec![Action::Quit { message }],
        ParsedCommand::Mode { target, modes } => match server_id {
            Some(sid) => vec![Action::SendMode { server_id: sid, target, modes }],
            None => no_server(client),
        },
        ParsedCommand::Topic { text } => match (server_id, resolve_channel(client, None)) {
            (Some(sid), Some(channel)) if text.is_empty() => {
                vec![Action::SendRaw { server_id: sid, command: format!("TOPIC {}", channel) }]
            }
            (Some(sid), Some(channel)) => vec![Action::SetTopic { server_id: sid, channel, text }],
            (Some(_), None) => {
                client.set_status("Not in a channel".to_string());
                vec![]
            }
            (None, _) => no_server(client),
        },
        ParsedCommand::Notice { target, text } => match server_id {
            Some(sid) => vec![Action::SendNotice { server_id: sid, target, text }],
            None => no_server(client),
        },
        ParsedCommand::Raw { command } => match server_id {
            Some(sid) => vec![Action::SendRaw { server_id: sid, command }],
            None => no_server(client),
        },
        ParsedCommand::Help => {
            for line in HELP {
                client.notify(line.to_string(), false);
            }
            vec![]
        }
        ParsedCommand::Group(_) => vec![],
    }
}

fn no_server(client: &mut ClientState) -> Vec<Action> {
    client.set_status("No active server".to_string());
    vec![]
}

const HELP: &[&str] = &[
    "Available commands:",
    "",
    "  /server connect <name>            Connect to a configured server",
    "  /server list                      List configured servers",
    "  /server disconnect                Disconnect current server",
    "  /join #channel                    Join channel",
    "  /part [#channel] [reason]         Leave channel",
    "  /msg <target> <text>              Private message",
    "  /me <action>                      Action message",
    "  /topic [text]                     Show or set channel topic",
    "  /mode <target> <modes>            Set mode",
    "  /notice <target> <text>           Send notice",
    "  /nick <name>                      Change nickname",
    "  /raw <command>                    Send raw IRC command",
    "  /quit [message]                   Exit",
    "",
    "Groups:",
    "  /group create <name>              New group with its own buffer",
    "  /group add <group> [net #chan]    Add a channel (default: the active one)",
    "  /group del <group> [net #chan]    Remove a channel",
    "  /group set <group> [opt value]    Show or change options",
    "  /group rename <old> <new>",
    "  /group remove <name>",
    "  /group open <name>",
    "  /group list",
    "",
    "In a group buffer, start a line with a channel ref: #chan hello",
    "Tab / Shift-Tab complete refs and nicks. #chan /me waves runs a command",
    "there, #chan //text sends text starting with a slash.",
    "",
    "Keys: Alt-Left/Right or Ctrl-P/N switch buffers, PageUp/PageDown",
    "scroll, Up/Down history, Ctrl-C quits.",
];

fn handle_group_command(app: &mut AppState, cmd: GroupCommand) {
    match run_group_command(app, cmd, Instant::now()) {
        Ok((lines, changed)) => {
            for line in lines {
                app.client.notify(line, false);
            }
            if changed {
                app.client.pending_actions.push(Action::SaveGroups);
            }
        }
        Err(e) => app.client.notify(e.to_string(), true),
    }
}

/// Run a `/group` command. Returns lines to show and whether the group
/// definitions changed.
fn run_group_command(app: &mut AppState, cmd: GroupCommand, now: Instant) -> anyhow::Result<(Vec<String>, bool)> {
    let groups = &mut app.groups;
    let client = &mut app.client;
    let reply = match cmd {
        GroupCommand::Create { name } => {
            groups.create(&mut *client, &name, now)?;
            groups.open(&mut *client, &name)?;
            (vec![format!("Created group {}", name)], true)
        }
        GroupCommand::Remove { name } => {
            groups.remove(&mut *client, &name)?;
            (vec![format!("Removed group {}", name)], true)
        }
        GroupCommand::Rename { old, new } => {
            groups.rename(&mut *client, &old, &new)?;
            groups.open(&mut *client, &new)?;
            (vec![format!("Renamed group {} to {}", old, new)], true)
        }
        GroupCommand::Add { group, target } => {
            let key = member_key(client, target)?;
            if groups.add_channel(&*client, &group, key.clone())? {
                (vec![format!("Added {} to {}", key, group)], true)
            } else {
                (vec![format!("{} is already in {}", key, group)], false)
            }
        }
        GroupCommand::Del { group, target } => {
            let key = member_key(client, target)?;
            groups.remove_channel(&*client, &group, &key)?;
            (vec![format!("Removed {} from {}", key, group)], true)
        }
        GroupCommand::Set { group, option, value } => {
            groups.set_option(&group, &option, &value)?;
            let shown = groups
                .get(&group)
                .and_then(|g| g.options().get(&option))
                .map(|v| v.to_string())
                .unwrap_or(value);
            (vec![format!("{}: {} = {}", group, option, shown)], true)
        }
        GroupCommand::Options { group } => {
            let g = groups
                .get(&group)
                .ok_or_else(|| GroupError::NotFound(group.clone()))?;
            let mut lines = vec![format!("Options of {}:", group)];
            for (name, value) in g.options().iter() {
                let help = options::spec(name).map(|s| s.help).unwrap_or_default();
                lines.push(format!("  {} = {}  ({})", name, value, help));
            }
            (lines, false)
        }
        GroupCommand::Open { name } => {
            groups.open(&mut *client, &name)?;
            (vec![], false)
        }
        GroupCommand::List => {
            if groups.is_empty() {
                (vec!["No groups. Create one with /group create <name>".to_string()], false)
            } else {
                let mut lines = vec!["Groups:".to_string()];
                for g in groups.groups() {
                    let members: Vec<String> = g
                        .members()
                        .map(|key| match g.refs().ref_for(key) {
                            Some(r) => r.to_string(),
                            None => format!("({})", key),
                        })
                        .collect();
                    let marker = if g.options().catch_all() { " [catch-all]" } else { "" };
                    lines.push(format!("  {}{}: {}", g.name(), marker, members.join(", ")));
                }
                (lines, false)
            }
        }
        GroupCommand::Usage => (
            commands::GROUP_USAGE.iter().map(|s| format!("Usage: {}", s)).collect(),
            false,
        ),
    };
    Ok(reply)
}

/// Channel named by a `/group add|del` command, or the active channel or
/// query. Names are matched against known servers and joined channels so
/// the stored key has the spelling events arrive with.
fn member_key(client: &ClientState, target: Option<(String, String)>) -> anyhow::Result<ChannelKey> {
    match target {
        Some((network, channel)) => {
            let srv = client.server_by_name(&network);
            let network = srv
                .map(|s| s.name.clone())
                .or_else(|| client.config.server(&network).map(|c| c.name.clone()))
                .unwrap_or(network);
            let channel = srv
                .and_then(|s| s.joined(&channel))
                .map(str::to_owned)
                .unwrap_or(channel);
            Ok(ChannelKey::new(network, channel))
        }
        None => {
            let (server_id, channel) = match &client.active_buffer {
                Some(BufferKey::Channel(id, c)) | Some(BufferKey::Query(id, c)) => (*id, c.clone()),
                _ => anyhow::bail!("Name a network and channel, or run this from a channel buffer"),
            };
            let network = client
                .get_server(server_id)
                .map(|s| s.name.clone())
                .ok_or_else(|| anyhow::anyhow!("Unknown server"))?;
            Ok(ChannelKey::new(network, channel))
        }
    }
}

fn timestamp(client: &ClientState) -> String {
    Local::now().format(&client.timestamp_format).to_string()
}

/// The message's mentions our nick (case-insensitive).
fn mentions(text: &str, nick: &str) -> bool {
    !nick.is_empty() && text.to_lowercase().contains(&nick.to_lowercase())
}

pub fn handle_irc_message(app: &mut AppState, server_id: ServerId, message: irc::client::prelude::Message) {
    use irc::client::prelude::{Command, Prefix};

    let nick_from = match &message.prefix {
        Some(Prefix::Nickname(nick, _, _)) => nick.clone(),
        Some(Prefix::ServerName(name)) => name.clone(),
        None => String::new(),
    };

    match &message.command {
        Command::PRIVMSG(target, text) => {
            let (body, is_action) = match text.strip_prefix('\x01').and_then(|t| t.strip_suffix('\x01')) {
                Some(ctcp) => match ctcp.strip_prefix("ACTION ") {
                    Some(action) => (action.to_string(), true),
                    None => {
                        let key = BufferKey::ServerStatus(server_id);
                        app.client.system_message(&key, format!("CTCP {} from {}", ctcp, nick_from));
                        return;
                    }
                },
                None => (text.clone(), false),
            };
            handle_chat(app, server_id, target, &nick_from, body, is_action);
        }

        Command::JOIN(channel, _, _) => {
            let key = BufferKey::Channel(server_id, channel.clone());
            app.client.ensure_buffer(key.clone());

            let mut own = false;
            if let Some(srv) = app.client.get_server_mut(server_id) {
                if srv.is_own_nick(&nick_from) {
                    own = true;
                    if srv.joined(channel).is_none() {
                        srv.channels.push(channel.clone());
                    }
                } else {
                    let users = srv.users.entry(channel.clone()).or_default();
                    if !users.iter().any(|u| u.nick == nick_from) {
                        users.push(ChannelUser {
                            nick: nick_from.clone(),
                            prefix: String::new(),
                        });
                    }
                }
            }
            if own {
                if app.client.active_group().is_none() {
                    app.client.set_active_buffer(key.clone());
                }
                refresh_groups(app);
            }

            let msg = Message {
                timestamp: timestamp(&app.client),
                sender: nick_from.clone(),
                text: format!("has joined {}", channel),
                kind: MessageKind::Join,
            };
            app.client.add_message_to_buffer(&key, msg);
        }

        Command::PART(channel, reason) => {
            let key = BufferKey::Channel(server_id, channel.clone());
            let reason_text = reason.as_deref().unwrap_or("");
            let msg = Message {
                timestamp: timestamp(&app.client),
                sender: nick_from.clone(),
                text: format!("has left {} {}", channel, reason_text),
                kind: MessageKind::Part,
            };
            app.client.add_message_to_buffer(&key, msg);

            let mut own = false;
            if let Some(srv) = app.client.get_server_mut(server_id) {
                if srv.is_own_nick(&nick_from) {
                    own = true;
                    srv.channels.retain(|c| !c.eq_ignore_ascii_case(channel));
                    srv.users.remove(channel);
                } else if let Some(users) = srv.users.get_mut(channel) {
                    users.retain(|u| !u.nick.eq_ignore_ascii_case(&nick_from));
                }
            }
            if own {
                if app.client.active_buffer.as_ref() == Some(&key) {
                    app.client.set_active_buffer(BufferKey::ServerStatus(server_id));
                }
                refresh_groups(app);
            }
        }

        Command::QUIT(reason) => {
            let reason_text = reason.as_deref().unwrap_or("");
            let mut seen_in = Vec::new();
            if let Some(srv) = app.client.get_server_mut(server_id) {
                for (ch, users) in srv.users.iter_mut() {
                    let before = users.len();
                    users.retain(|u| !u.nick.eq_ignore_ascii_case(&nick_from));
                    if users.len() != before {
                        seen_in.push(ch.clone());
                    }
                }
            }
            for ch in seen_in {
                let msg = Message {
                    timestamp: timestamp(&app.client),
                    sender: nick_from.clone(),
                    text: format!("has quit ({})", reason_text),
                    kind: MessageKind::Quit,
                };
                app.client.add_message_to_buffer(&BufferKey::Channel(server_id, ch), msg);
            }
        }

        Command::NICK(new_nick) => {
            if let Some(srv) = app.client.get_server_mut(server_id) {
                if srv.is_own_nick(&nick_from) {
                    srv.nickname = new_nick.clone();
                }
                for users in srv.users.values_mut() {
                    for u in users.iter_mut() {
                        if u.nick.eq_ignore_ascii_case(&nick_from) {
                            u.nick = new_nick.clone();
                        }
                    }
                }
            }
            let key = BufferKey::ServerStatus(server_id);
            app.client
                .system_message(&key, format!("{} is now known as {}", nick_from, new_nick));
        }

        Command::NOTICE(target, text) => {
            let key = if is_channel_shaped(target) {
                BufferKey::Channel(server_id, target.clone())
            } else {
                BufferKey::ServerStatus(server_id)
            };
            let msg = Message {
                timestamp: timestamp(&app.client),
                sender: nick_from,
                text: text.trim_matches('\x01').to_string(),
                kind: MessageKind::Notice,
            };
            app.client.add_message_to_buffer(&key, msg);
        }

        Command::TOPIC(channel, Some(topic)) => {
            if let Some(srv) = app.client.get_server_mut(server_id) {
                srv.topics.insert(channel.clone(), topic.clone());
            }
            let key = BufferKey::Channel(server_id, channel.clone());
            app.client
                .system_message(&key, format!("{} set topic: {}", nick_from, topic));
        }

        Command::Response(resp, args) => {
            handle_numeric(app, server_id, *resp, args);
        }

        Command::KICK(channel, user, reason) => {
            let key = BufferKey::Channel(server_id, channel.clone());
            let reason_text = reason.as_deref().unwrap_or("");
            let msg = Message {
                timestamp: timestamp(&app.client),
                sender: nick_from,
                text: format!("kicked {} ({})", user, reason_text),
                kind: MessageKind::System,
            };
            app.client.add_message_to_buffer(&key, msg);

            let mut own = false;
            if let Some(srv) = app.client.get_server_mut(server_id) {
                if srv.is_own_nick(user) {
                    own = true;
                    srv.channels.retain(|c| !c.eq_ignore_ascii_case(channel));
                    srv.users.remove(channel);
                } else if let Some(users) = srv.users.get_mut(channel) {
                    users.retain(|u| !u.nick.eq_ignore_ascii_case(user));
                }
            }
            if own {
                refresh_groups(app);
            }
        }

        Command::ChannelMODE(target, modes) => {
            let mode_text: String = modes.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(" ");
            let key = BufferKey::Channel(server_id, target.clone());
            app.client
                .system_message(&key, format!("{} sets mode {} on {}", nick_from, mode_text, target));
            update_channel_modes(&mut app.client, server_id, target, modes);
        }

        Command::UserMODE(target, modes) => {
            let mode_text: String = modes.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(" ");
            let key = BufferKey::ServerStatus(server_id);
            app.client
                .system_message(&key, format!("{} sets mode {} on {}", nick_from, mode_text, target));
        }

        Command::PING(..) | Command::PONG(..) => {}

        _ => {
            let key = BufferKey::ServerStatus(server_id);
            let msg = Message {
                timestamp: timestamp(&app.client),
                sender: String::new(),
                text: message.to_string().trim_end().to_string(),
                kind: MessageKind::System,
            };
            app.client.add_message_to_buffer(&key, msg);
        }
    }
}

/// Show an incoming message in its buffer and hand it to the groups.
fn handle_chat(app: &mut AppState, server_id: ServerId, target: &str, nick: &str, body: String, is_action: bool) {
    let Some(srv) = app.client.get_server(server_id) else {
        return;
    };
    let network = srv.name.clone();
    let mention = mentions(&body, &srv.nickname);
    let in_channel = is_channel_shaped(target);
    let (key, source) = if in_channel {
        (BufferKey::Channel(server_id, target.to_string()), target.to_string())
    } else {
        (BufferKey::Query(server_id, nick.to_string()), nick.to_string())
    };
    let new_query = !in_channel && !app.client.buffers.contains_key(&key);

    let msg = Message {
        timestamp: timestamp(&app.client),
        sender: nick.to_string(),
        text: body.clone(),
        kind: if is_action { MessageKind::Action } else { MessageKind::Normal },
    };
    app.client.add_message_to_buffer(&key, msg);
    if mention || !in_channel {
        if let Some(buf) = app.client.buffers.get_mut(&key) {
            buf.has_mention |= app.client.active_buffer.as_ref() != Some(&key);
        }
    }
    if new_query {
        refresh_groups(app);
    }

    let kind = match (in_channel, is_action, mention) {
        (true, false, false) => EventKind::ChannelMessage,
        (true, false, true) => EventKind::ChannelHighlight,
        (true, true, false) => EventKind::ChannelAction,
        (true, true, true) => EventKind::ChannelActionHighlight,
        (false, false, _) => EventKind::PrivateMessage,
        (false, true, _) => EventKind::PrivateAction,
    };
    let mode = app.client.mode_prefix(server_id, target, nick);
    let event = ChatEvent::new(
        ChannelKey::new(network, source),
        kind,
        vec![nick.to_string(), body, mode, String::new()],
    );
    dispatch_chat(app, &event, Instant::now());
}

fn update_channel_modes(
    client: &mut ClientState,
    server_id: ServerId,
    channel: &str,
    modes: &[irc::client::prelude::Mode<irc::proto::ChannelMode>],
) {
    use irc::proto::ChannelMode;

    let Some(users) = client
        .get_server_mut(server_id)
        .and_then(|srv| srv.users.get_mut(channel))
    else {
        return;
    };

    for mode in modes {
        let (adding, mode_type, arg) = match mode {
            irc::client::prelude::Mode::Plus(m, a) => (true, m, a),
            irc::client::prelude::Mode::Minus(m, a) => (false, m, a),
            irc::client::prelude::Mode::NoPrefix(_) => continue,
        };

        let prefix = match mode_type {
            ChannelMode::Oper => Some("@"),
            ChannelMode::Voice => Some("+"),
            ChannelMode::Halfop => Some("%"),
            ChannelMode::Founder => Some("~"),
            ChannelMode::Admin => Some("&"),
            _ => None,
        };

        if let (Some(prefix_str), Some(nick)) = (prefix, arg) {
            if let Some(user) = users.iter_mut().find(|u| u.nick.eq_ignore_ascii_case(nick)) {
                if adding {
                    user.prefix = prefix_str.to_string();
                } else if user.prefix == prefix_str {
                    user.prefix = String::new();
                }
            }
        }
    }
}

fn handle_numeric(app: &mut AppState, server_id: ServerId, resp: irc::client::prelude::Response, args: &[String]) {
    use irc::client::prelude::Response;
    let key = BufferKey::ServerStatus(server_id);
    let client = &mut app.client;

    match resp {
        Response::RPL_TOPIC => {
            if let [_, channel, topic, ..] = args {
                if let Some(srv) = client.get_server_mut(server_id) {
                    srv.topics.insert(channel.clone(), topic.clone());
                }
            }
        }
        Response::RPL_NAMREPLY => {
            if let [_, _, channel, names, ..] = args {
                if let Some(srv) = client.get_server_mut(server_id) {
                    let users = srv.users.entry(channel.clone()).or_default();
                    for name in names.split_whitespace() {
                        let (prefix, nick) = match name.find(|c: char| !"@+%~&".contains(c)) {
                            Some(i) => (name[..i].chars().take(1).collect::<String>(), name[i..].to_string()),
                            None => continue,
                        };
                        match users.iter_mut().find(|u| u.nick.eq_ignore_ascii_case(&nick)) {
                            Some(u) => u.prefix = prefix,
                            None => users.push(ChannelUser { nick, prefix }),
                        }
                    }
                }
            }
        }
        Response::RPL_ENDOFNAMES => {}
        Response::ERR_NICKNAMEINUSE => {
            client.system_message(&key, "Nickname already in use, trying alternative...".to_string());
            if let Some(srv) = client.get_server_mut(server_id) {
                let nick = format!("{}_", srv.nickname);
                srv.nickname = nick.clone();
                client.pending_actions.push(Action::ChangeNick { server_id, nick });
            }
        }
        _ => {
            if let Some(text) = args.last() {
                client.system_message(&key, text.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, ServerConfig};
    use crate::group::template::{TemplateSet, BUNDLED_PEVENTS};
    use crate::group::GroupRegistry;
    use irc::client::prelude::{Command, Prefix};

    fn app() -> AppState {
        let groups = GroupRegistry::new(TemplateSet::from_source(BUNDLED_PEVENTS, true));
        let mut app = AppState::new(AppConfig::default(), groups);
        let id = app.client.allocate_server_id();
        let cfg = ServerConfig::new("libera", "irc.libera.chat", 6697);
        app.client.add_server(ServerState::from_config(id, &cfg));
        handle_event(&mut app, AppEvent::IrcConnected { server_id: id });
        app
    }

    fn irc(from: &str, command: Command) -> AppEvent {
        AppEvent::IrcMessage {
            server_id: 0,
            message: irc::client::prelude::Message {
                tags: None,
                prefix: Some(Prefix::Nickname(from.to_string(), "u".into(), "h".into())),
                command,
            },
        }
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Terminal(CEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn type_line(app: &mut AppState, text: &str) -> Vec<Action> {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c)));
        }
        handle_event(app, key(KeyCode::Enter))
    }

    fn group_lines(app: &AppState, name: &str) -> Vec<String> {
        app.client.buffers[&BufferKey::Group(name.into())]
            .messages
            .iter()
            .filter(|m| m.kind == MessageKind::Formatted)
            .map(|m| m.text.clone())
            .collect()
    }

    #[test]
    fn test_group_commands_create_and_persist() {
        let mut app = app();
        let actions = type_line(&mut app, "/group create work");
        assert_eq!(actions, vec![Action::SaveGroups]);
        assert_eq!(app.client.active_group(), Some("work"));

        let actions = type_line(&mut app, "/group add work Libera #rust");
        assert_eq!(actions, vec![Action::SaveGroups]);
        assert_eq!(
            app.groups.groups_for(&ChannelKey::new("libera", "#rust")),
            ["work".to_string()]
        );

        let actions = type_line(&mut app, "/group create work");
        assert!(actions.is_empty());
        let last = app.client.buffers[&BufferKey::Group("work".into())].messages.last().cloned();
        assert_eq!(last.map(|m| m.kind), Some(MessageKind::Error));
    }

    #[test]
    fn test_group_options_listing_and_bad_delay() {
        let mut app = app();
        type_line(&mut app, "/group create work");

        let actions = type_line(&mut app, "/group set work auto_target_busy_delay 1e30");
        assert!(actions.is_empty());
        let buf = &app.client.buffers[&BufferKey::Group("work".into())];
        assert_eq!(buf.messages.last().map(|m| m.kind), Some(MessageKind::Error));

        type_line(&mut app, "/group set work");
        let buf = &app.client.buffers[&BufferKey::Group("work".into())];
        let listing = buf.messages.iter().find(|m| m.text.contains("auto_target_busy_delay = "));
        assert!(listing.is_some_and(|m| m.text.contains("seconds without a key press")));
        assert!(listing.is_some_and(|m| m.text.contains("= 10")));
    }

    #[test]
    fn test_join_makes_channel_live_and_messages_reach_group() {
        let mut app = app();
        type_line(&mut app, "/group create work");
        type_line(&mut app, "/group add work libera #rust");
        assert!(app.groups.get("work").unwrap().refs().is_empty());

        handle_event(&mut app, irc("crabmux", Command::JOIN("#rust".into(), None, None)));
        assert_eq!(app.groups.get("work").unwrap().refs().len(), 1);
        assert_eq!(app.client.active_group(), Some("work"));

        handle_event(&mut app, irc("alice", Command::PRIVMSG("#rust".into(), "hi crabmux".into())));
        let lines = group_lines(&app, "work");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("alice"));
        assert!(lines[0].contains("hi crabmux"));
        assert_eq!(app.client.buffers[&BufferKey::Channel(0, "#rust".into())].messages.len(), 2);
    }

    #[test]
    fn test_group_submit_sends_and_echoes() {
        let mut app = app();
        handle_event(&mut app, irc("crabmux", Command::JOIN("#rust".into(), None, None)));
        type_line(&mut app, "/group create work");
        type_line(&mut app, "/group add work libera #rust");

        let actions = type_line(&mut app, "#rust hello there");
        assert_eq!(
            actions,
            vec![Action::SendMessage { server_id: 0, target: "#rust".into(), text: "hello there".into() }]
        );
        assert_eq!(app.client.input().text, "#rust ");
        let lines = group_lines(&app, "work");
        assert!(lines.last().is_some_and(|l| l.contains("hello there")));
    }

    #[test]
    fn test_group_submit_to_unjoined_channel_reports() {
        let mut app = app();
        type_line(&mut app, "/group create work");
        type_line(&mut app, "/group add work libera #rust");

        let actions = type_line(&mut app, "#rust hello");
        assert!(actions.is_empty());
        assert_eq!(app.client.input().text, "#rust hello");
        assert_eq!(group_lines(&app, "work").len(), 1);
    }

    #[test]
    fn test_tab_completes_ref_in_group() {
        let mut app = app();
        handle_event(&mut app, irc("crabmux", Command::JOIN("#rust".into(), None, None)));
        type_line(&mut app, "/group create work");
        type_line(&mut app, "/group add work libera #rust");

        handle_event(&mut app, key(KeyCode::Char('#')));
        handle_event(&mut app, key(KeyCode::Tab));
        assert!(app.client.input().text.starts_with("#rust"));
    }

    #[test]
    fn test_catch_all_adoption_saves() {
        let mut app = app();
        type_line(&mut app, "/group create all");
        type_line(&mut app, "/group set all catch_all true");

        let actions = handle_event(&mut app, irc("bob", Command::PRIVMSG("crabmux".into(), "psst".into())));
        assert_eq!(actions, vec![Action::SaveGroups]);
        assert_eq!(app.groups.groups_for(&ChannelKey::new("libera", "bob")), ["all".to_string()]);
        assert!(app.client.buffers.contains_key(&BufferKey::Query(0, "bob".into())));
    }

    #[test]
    fn test_part_and_disconnect_drop_live_refs() {
        let mut app = app();
        handle_event(&mut app, irc("crabmux", Command::JOIN("#rust".into(), None, None)));
        handle_event(&mut app, irc("crabmux", Command::JOIN("#nix".into(), None, None)));
        type_line(&mut app, "/group create work");
        type_line(&mut app, "/group add work libera #rust");
        type_line(&mut app, "/group add work libera #nix");
        assert_eq!(app.groups.get("work").unwrap().refs().len(), 2);

        handle_event(&mut app, irc("crabmux", Command::PART("#nix".into(), None)));
        assert_eq!(app.groups.get("work").unwrap().refs().len(), 1);

        handle_event(&mut app, AppEvent::IrcDisconnected { server_id: 0, reason: "bye".into() });
        assert!(app.groups.get("work").unwrap().refs().is_empty());
    }

    #[test]
    fn test_mentions() {
        assert!(mentions("hey CrabMux, look", "crabmux"));
        assert!(!mentions("hello", "crabmux"));
        assert!(!mentions("hello", ""));
    }
}
