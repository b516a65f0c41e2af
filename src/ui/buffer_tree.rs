use crate::app::state::*;
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem};

fn unread_badge(unread: usize) -> Span<'static> {
    Span::styled(
        format!(" {}", unread),
        Style::default()
            .fg(Theme::BG_DARK)
            .bg(Theme::ACCENT_AMBER)
            .add_modifier(Modifier::BOLD),
    )
}

/// One leaf of the tree: a channel, query or group buffer.
fn leaf<'a>(state: &ClientState, key: &BufferKey, prefix: &'a str, label: String) -> ListItem<'a> {
    let buf = state.buffers.get(key);
    let is_active = state.active_buffer.as_ref() == Some(key);
    let has_mention = buf.map(|b| b.has_mention).unwrap_or(false);
    let unread = buf.map(|b| b.unread_count).unwrap_or(0);

    let style = if is_active {
        Theme::channel_active().bg(Theme::BG_ELEVATED)
    } else if has_mention {
        Theme::channel_mention()
    } else if unread > 0 {
        Theme::channel_unread()
    } else {
        Theme::channel_normal()
    };

    let mut spans = vec![
        Span::styled(prefix, Style::default().fg(Theme::BORDER_DIM)),
        Span::styled(label, style),
    ];
    if unread > 0 && !is_active {
        spans.push(unread_badge(unread));
    }
    ListItem::new(Line::from(spans))
}

fn tree_prefix(index: usize, count: usize) -> &'static str {
    if index + 1 == count {
        " └─"
    } else {
        " ├─"
    }
}

pub fn render(frame: &mut Frame, area: Rect, state: &ClientState) {
    let block = Block::default()
        .title(" Buffers ")
        .title_style(Theme::title())
        .borders(Borders::ALL)
        .border_type(Theme::border_type())
        .border_style(Theme::border())
        .style(Theme::panel_bg());

    let mut items: Vec<ListItem> = Vec::new();

    for srv in &state.servers {
        let (indicator, style) = match srv.status {
            ConnectionStatus::Connected => ("◆", Theme::server_connected()),
            ConnectionStatus::Connecting => ("◇", Theme::server_connecting()),
            ConnectionStatus::Disconnected => ("◈", Theme::server_disconnected()),
        };

        let is_active = state.active_buffer == Some(BufferKey::ServerStatus(srv.id));
        let name_style = if is_active {
            style.add_modifier(Modifier::BOLD).bg(Theme::BG_ELEVATED)
        } else {
            style
        };

        items.push(ListItem::new(Line::from(vec![
            Span::styled(format!(" {} ", indicator), style),
            Span::styled(srv.name.clone(), name_style),
        ])));

        let children: Vec<(BufferKey, String)> = state
            .buffers
            .keys()
            .filter_map(|k| match k {
                BufferKey::Channel(sid, ch) if *sid == srv.id => Some((k.clone(), ch.clone())),
                BufferKey::Query(sid, nick) if *sid == srv.id => Some((k.clone(), nick.clone())),
                _ => None,
            })
            .collect();

        let count = children.len();
        for (i, (key, label)) in children.into_iter().enumerate() {
            items.push(leaf(state, &key, tree_prefix(i, count), label));
        }
    }

    let groups: Vec<(BufferKey, String)> = state
        .buffers
        .keys()
        .filter_map(|k| match k {
            BufferKey::Group(name) => Some((k.clone(), name.clone())),
            _ => None,
        })
        .collect();

    if !groups.is_empty() {
        items.push(ListItem::new(Line::from(vec![
            Span::styled(
                " ❖ ",
                Style::default()
                    .fg(Theme::ACCENT_LAVENDER)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("Groups", Style::default().fg(Theme::TEXT_SECONDARY)),
        ])));
        let count = groups.len();
        for (i, (key, name)) in groups.into_iter().enumerate() {
            items.push(leaf(state, &key, tree_prefix(i, count), name));
        }
    }

    if items.is_empty() {
        items.push(ListItem::new(Span::styled(
            " No servers",
            Style::default().fg(Theme::TEXT_MUTED),
        )));
    }

    let list = List::new(items).block(block);
    frame.render_widget(list, area);
}
