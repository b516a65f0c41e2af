use crate::app::state::*;
use crate::ui::mirc_colors;
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

fn head(icon: &str, label: String, color: Color) -> Vec<Span<'static>> {
    let style = Style::default()
        .fg(color)
        .bg(Theme::BG_ELEVATED)
        .add_modifier(Modifier::BOLD);
    vec![
        Span::styled(format!(" {} ", icon), style),
        Span::styled(label, style),
    ]
}

fn separator() -> Span<'static> {
    Span::styled(" │ ", Style::default().fg(Theme::BORDER_DIM).bg(Theme::BG_ELEVATED))
}

fn detail(text: String, muted: bool) -> Span<'static> {
    let fg = if muted { Theme::TEXT_MUTED } else { Theme::TEXT_PRIMARY };
    Span::styled(
        text,
        Style::default()
            .fg(fg)
            .bg(Theme::BG_ELEVATED)
            .add_modifier(Modifier::ITALIC),
    )
}

/// Channel topic, or for a group the channel plain lines are sent to.
pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let client = &state.client;

    let spans = match &client.active_buffer {
        Some(BufferKey::Channel(server_id, channel)) => {
            let topic = client
                .get_server(*server_id)
                .and_then(|srv| srv.topics.get(channel))
                .map(|t| crate::logging::strip_formatting(t))
                .unwrap_or_default();
            let mut spans = head("#", channel.clone(), Theme::ACCENT_TEAL);
            spans.push(separator());
            if topic.is_empty() {
                spans.push(detail("No topic set".to_string(), true));
            } else {
                spans.push(detail(topic, false));
            }
            spans
        }
        Some(BufferKey::Query(_, target)) => head("→", target.clone(), Theme::ACCENT_LAVENDER),
        Some(BufferKey::Group(name)) => {
            let mut spans = head("❖", name.clone(), Theme::ACCENT_LAVENDER);
            spans.push(separator());
            let group = state.groups.get(name);
            match group.and_then(|g| g.current().map(|key| (g, key))) {
                Some((g, key)) => {
                    let color = mirc_colors::palette(g.options().channel_color(&key.channel))
                        .unwrap_or(Theme::TEXT_PRIMARY);
                    let r = g.refs().ref_for(key).unwrap_or(&key.channel).to_string();
                    spans.push(Span::styled(
                        format!("[{}]", r),
                        Style::default()
                            .fg(color)
                            .bg(Theme::BG_ELEVATED)
                            .add_modifier(Modifier::BOLD),
                    ));
                    spans.push(detail(format!(" {} on {}", key.channel, key.network), false));
                }
                None => spans.push(detail("No target: prefix a line with a channel ref".to_string(), true)),
            }
            spans
        }
        Some(BufferKey::ServerStatus(server_id)) => {
            let name = client
                .get_server(*server_id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| "Unknown".to_string());
            head("◆", name, Theme::ACCENT_GREEN)
        }
        None => {
            let mut spans = head("❖", "crabmux".to_string(), Theme::ACCENT_TEAL);
            spans.push(separator());
            spans.push(detail("/help for commands".to_string(), false));
            spans
        }
    };

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Theme::BG_ELEVATED));
    frame.render_widget(paragraph, area);
}
