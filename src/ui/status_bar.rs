use crate::app::state::*;
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthStr;

pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let client = &state.client;
    let mut parts: Vec<Span> = Vec::new();

    if let Some(srv) = client.active_server_id().and_then(|id| client.get_server(id)) {
        parts.push(Span::styled(
            format!(" [{}] ", srv.nickname),
            Style::default().fg(Theme::ACCENT_GREEN).bg(Theme::BG_ELEVATED),
        ));
    }

    parts.push(Span::styled(
        format!(" {} ", client.status_line()),
        Theme::status_bar(),
    ));

    // Right-hand side: which buffer kind the keys go to.
    let mode = match &client.active_buffer {
        Some(BufferKey::Group(name)) => match state.groups.catch_all() {
            Some(catch_all) if catch_all == name.as_str() => "GROUP*",
            _ => "GROUP",
        },
        Some(BufferKey::Channel(..)) => "CHANNEL",
        Some(BufferKey::Query(..)) => "QUERY",
        Some(BufferKey::ServerStatus(_)) | None => "SERVER",
    };

    let used: usize = parts.iter().map(|s| s.content.width()).sum();
    let remaining = (area.width as usize).saturating_sub(used + mode.len() + 4);
    parts.push(Span::styled(" ".repeat(remaining), Theme::status_bar()));
    parts.push(Span::styled(
        format!(" [{}] ", mode),
        Style::default().fg(Theme::ACCENT_TEAL).bg(Theme::BG_ELEVATED),
    ));

    frame.render_widget(Paragraph::new(Line::from(parts)), area);
}
