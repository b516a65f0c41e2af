use crate::app::state::*;
use crate::group::Group;
use crate::ui::mirc_colors;
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem};

fn channel_users(srv: &ServerState, channel: &str) -> Vec<ListItem<'static>> {
    let Some(users) = srv.users.get(channel) else {
        return Vec::new();
    };

    // ops first, then voiced, then everyone else
    let rank = |u: &ChannelUser| match u.prefix.as_str() {
        "~" => 0,
        "&" => 1,
        "@" => 2,
        "%" => 3,
        "+" => 4,
        _ => 5,
    };
    let mut sorted: Vec<_> = users.iter().collect();
    sorted.sort_by(|a, b| {
        rank(a)
            .cmp(&rank(b))
            .then_with(|| a.nick.to_lowercase().cmp(&b.nick.to_lowercase()))
    });

    let mut items = Vec::with_capacity(sorted.len());
    let mut last_tier: Option<u8> = None;

    for user in sorted {
        let tier = match user.prefix.as_str() {
            "~" | "&" | "@" => 0u8,
            "+" | "%" => 1,
            _ => 2,
        };

        if last_tier.is_some_and(|prev| prev != tier) {
            items.push(ListItem::new(Span::styled(
                " ╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌",
                Style::default().fg(Theme::BORDER_DIM),
            )));
        }
        last_tier = Some(tier);

        let (icon, style) = match tier {
            0 => (" ★ ", Theme::user_op()),
            1 => (" ○ ", Theme::user_voice()),
            _ => ("   ", Theme::user_normal()),
        };

        items.push(ListItem::new(Line::from(vec![
            Span::styled(icon, style),
            Span::styled(user.nick.clone(), style),
        ])));
    }
    items
}

/// Group members: live channels under their ref in the channel colour,
/// members that are not joined right now dimmed.
fn group_members(group: &Group) -> Vec<ListItem<'static>> {
    let mut items = Vec::new();

    for (r, key) in group.refs().iter() {
        let color = mirc_colors::palette(group.options().channel_color(&key.channel))
            .unwrap_or(Theme::TEXT_PRIMARY);
        let marker = if group.current() == Some(key) { " ▸ " } else { "   " };
        items.push(ListItem::new(Line::from(vec![
            Span::styled(marker, Style::default().fg(Theme::ACCENT_TEAL)),
            Span::styled(
                format!("[{}]", r),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" {}", key.network),
                Style::default().fg(Theme::TEXT_MUTED),
            ),
        ])));
    }

    for key in group.members() {
        if group.refs().ref_for(key).is_none() {
            items.push(ListItem::new(Span::styled(
                format!("   {}/{}", key.network, key.channel),
                Style::default().fg(Theme::TEXT_MUTED),
            )));
        }
    }
    items
}

pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let client = &state.client;
    let (title, mut items) = match &client.active_buffer {
        Some(BufferKey::Channel(server_id, channel)) => {
            let srv = client.get_server(*server_id);
            let count = srv
                .and_then(|s| s.users.get(channel))
                .map_or(0, Vec::len);
            let items = srv.map(|s| channel_users(s, channel)).unwrap_or_default();
            (format!(" Users ({}) ", count), items)
        }
        Some(BufferKey::Group(name)) => {
            let items = state.groups.get(name).map(group_members).unwrap_or_default();
            (" Channels ".to_string(), items)
        }
        _ => (" Users ".to_string(), Vec::new()),
    };

    let block = Block::default()
        .title(title)
        .title_style(Theme::title())
        .borders(Borders::ALL)
        .border_type(Theme::border_type())
        .border_style(Theme::border())
        .style(Theme::panel_bg());

    if items.is_empty() {
        items.push(ListItem::new(Span::styled(
            " —",
            Style::default().fg(Theme::TEXT_MUTED),
        )));
    }

    let list = List::new(items).block(block);
    frame.render_widget(list, area);
}
