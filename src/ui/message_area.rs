use crate::app::state::*;
use crate::logging::strip_formatting;
use crate::ui::mirc_colors;
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::{
    Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
};
use unicode_width::UnicodeWidthStr;

/// Width the nick column of formatted lines is right-aligned to.
const NICK_COLUMN: usize = 14;

fn section(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default()
            .fg(Theme::TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD),
    ))
}

fn entry(key: String, text: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("  {:<24}", key),
            Style::default().fg(Theme::ACCENT_TEAL),
        ),
        Span::styled(text, Style::default().fg(Theme::TEXT_SECONDARY)),
    ])
}

fn is_welcome_screen(state: &ClientState, key: &BufferKey) -> bool {
    let BufferKey::ServerStatus(id) = key else {
        return false;
    };
    state
        .get_server(*id)
        .is_some_and(|srv| srv.name == "welcome" && srv.host.is_empty())
}

/// Start page shown until a server is connected: configured servers, saved
/// groups and the first commands to try.
fn render_welcome(frame: &mut Frame, area: Rect, state: &ClientState) {
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                "crabmux",
                Style::default()
                    .fg(Theme::ACCENT_TEAL)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "  many channels, one buffer",
                Style::default().fg(Theme::TEXT_MUTED),
            ),
        ]),
        Line::from(""),
        section("Servers"),
    ];

    if state.config.servers.is_empty() {
        lines.push(entry("(none)".into(), "add [[servers]] to config.toml".into()));
    }
    for srv in &state.config.servers {
        let auto = if srv.auto_connect { ", auto" } else { "" };
        lines.push(entry(srv.name.clone(), format!("{}:{}{}", srv.host, srv.port, auto)));
    }

    lines.push(Line::from(""));
    lines.push(section("Groups"));
    let groups: Vec<&str> = state
        .buffers
        .keys()
        .filter_map(|k| match k {
            BufferKey::Group(name) => Some(name.as_str()),
            _ => None,
        })
        .collect();
    if groups.is_empty() {
        lines.push(entry("(none)".into(), "/group create <name>".into()));
    } else {
        lines.push(entry(groups.join(", "), "/group open <name>".into()));
    }

    lines.push(Line::from(""));
    lines.push(section("Getting started"));
    lines.push(entry("/server connect <name>".into(), "connect".into()));
    lines.push(entry("/group add <group>".into(), "add the channel you are in".into()));
    lines.push(entry("#chan text".into(), "send from a group buffer".into()));
    lines.push(entry("/help".into(), "everything else".into()));

    let width = lines.iter().map(Line::width).max().unwrap_or(0) as u16;
    let height = lines.len() as u16;
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 4;
    let rect = Rect::new(
        x,
        y,
        width.min(area.width),
        height.min(area.bottom().saturating_sub(y)),
    );
    frame.render_widget(Paragraph::new(lines), rect);
}

pub fn render(frame: &mut Frame, area: Rect, state: &ClientState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(Theme::border_type_focused())
        .border_style(Theme::border_focused())
        .style(Theme::panel_bg_focused());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(ref buf_key) = state.active_buffer else {
        let empty = Paragraph::new("No active buffer. Use /server connect <name> to connect.")
            .style(Style::default().fg(Theme::TEXT_MUTED));
        frame.render_widget(empty, inner);
        return;
    };

    if is_welcome_screen(state, buf_key) {
        render_welcome(frame, inner, state);
        return;
    }

    let Some(buf) = state.buffers.get(buf_key) else {
        return;
    };

    let available_height = inner.height as usize;
    let total = buf.messages.len();

    let end = total.saturating_sub(buf.scroll_offset);
    let start = end.saturating_sub(available_height);

    let our_nick = state
        .active_server_id()
        .and_then(|id| state.get_server(id).map(|s| s.nickname.clone()));

    let parse_colors = state.config.ui.parse_mirc_colors;

    let lines: Vec<Line> = buf
        .messages
        .iter()
        .skip(start)
        .take(end - start)
        .map(|msg| format_message(msg, our_nick.as_deref(), parse_colors))
        .collect();

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, inner);

    if total > available_height {
        let mut scrollbar_state =
            ScrollbarState::new(total.saturating_sub(available_height)).position(start);

        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_symbol("┃")
            .track_symbol(Some("│"))
            .thumb_style(Theme::scrollbar_thumb())
            .track_style(Theme::scrollbar_track());

        frame.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
    }
}

fn styled(text: &str, style: Style, parse_colors: bool) -> Vec<Span<'static>> {
    if parse_colors {
        mirc_colors::parse_mirc_formatted(text, style)
    } else {
        mirc_colors::plain(text, style)
    }
}

/// A template-rendered group line: the part before the first tab is the
/// nick column, right-aligned; the rest is the body.
fn format_group_line(text: &str, parse_colors: bool) -> Vec<Span<'static>> {
    let Some((column, body)) = text.split_once('\t') else {
        return styled(text, Theme::message_text(), parse_colors);
    };
    let visible = strip_formatting(column);
    let pad = NICK_COLUMN.saturating_sub(visible.width());

    let mut spans = vec![Span::raw(" ".repeat(pad))];
    spans.extend(styled(column, Theme::message_text(), parse_colors));
    spans.push(Span::styled(" │ ", Style::default().fg(Theme::BORDER_DIM)));
    spans.extend(styled(body, Theme::message_text(), parse_colors));
    spans
}

fn format_message<'a>(msg: &Message, our_nick: Option<&str>, parse_colors: bool) -> Line<'a> {
    let ts = Span::styled(format!("[{}] ", msg.timestamp), Theme::timestamp());

    match msg.kind {
        MessageKind::Normal => {
            let is_self = our_nick
                .map(|n| n.eq_ignore_ascii_case(&msg.sender))
                .unwrap_or(false);
            let nick_style = if is_self {
                Theme::nick_self()
            } else {
                Theme::nick_color(&msg.sender)
            };

            let mut spans = vec![ts, Span::styled(format!("<{}> ", msg.sender), nick_style)];
            spans.extend(styled(&msg.text, Theme::message_text(), parse_colors));
            Line::from(spans)
        }
        MessageKind::Formatted => {
            let mut spans = vec![ts];
            spans.extend(format_group_line(&msg.text, parse_colors));
            Line::from(spans)
        }
        MessageKind::Action => Line::from(vec![
            ts,
            Span::styled(
                format!("* {} {}", msg.sender, strip_formatting(&msg.text)),
                Theme::action_message(),
            ),
        ]),
        MessageKind::System => Line::from(vec![
            ts,
            Span::styled("• ", Style::default().fg(Theme::ACCENT_AMBER)),
            Span::styled(msg.text.clone(), Theme::system_message()),
        ]),
        MessageKind::Error => Line::from(vec![
            ts,
            Span::styled("✘ ", Style::default().fg(Theme::ACCENT_ROSE)),
            Span::styled(msg.text.clone(), Theme::error_message()),
        ]),
        MessageKind::Join => Line::from(vec![
            ts,
            Span::styled(
                format!("→ {} {}", msg.sender, msg.text),
                Theme::join_message(),
            ),
        ]),
        MessageKind::Part | MessageKind::Quit => Line::from(vec![
            ts,
            Span::styled(
                format!("← {} {}", msg.sender, msg.text),
                Theme::part_message(),
            ),
        ]),
        MessageKind::Notice => Line::from(vec![
            ts,
            Span::styled(format!("-{}- ", msg.sender), Theme::notice_message()),
            Span::styled(strip_formatting(&msg.text), Theme::notice_message()),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(spans: &[Span]) -> String {
        spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_group_line_aligns_nick_column() {
        let spans = format_group_line("\x0304alice\x0f\t\x0319[#a]\x0f hello", true);
        let text = text_of(&spans);
        assert_eq!(text, format!("{}alice │ [#a] hello", " ".repeat(NICK_COLUMN - 5)));
    }

    #[test]
    fn test_group_line_without_tab() {
        let spans = format_group_line("[#a] <bob> hi", true);
        assert_eq!(text_of(&spans), "[#a] <bob> hi");
    }

    #[test]
    fn test_plain_rendering_strips_codes() {
        let spans = format_group_line("bob\t\x0319[#a]\x0f\x08x\x08 hi", false);
        assert!(text_of(&spans).ends_with("[#a]x hi"));
    }
}
