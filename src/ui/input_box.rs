use crate::app::state::*;
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::block::Padding;
use ratatui::widgets::{Block, Borders, Paragraph};
use unicode_width::UnicodeWidthStr;

pub fn render(frame: &mut Frame, area: Rect, state: &ClientState) {
    let title = match &state.active_buffer {
        Some(BufferKey::Group(name)) => format!(" {} ", name),
        _ => " Input ".to_string(),
    };

    let block = Block::default()
        .title(title)
        .title_style(Theme::title())
        .borders(Borders::ALL)
        .border_type(Theme::border_type_focused())
        .border_style(Theme::border_focused())
        .padding(Padding::horizontal(1))
        .style(Theme::panel_bg_focused());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let input = state.input();

    let line = Line::from(vec![
        Span::styled("❯ ", Style::default().fg(Theme::ACCENT_TEAL)),
        Span::styled(input.text.clone(), Theme::input_text()),
    ]);
    frame.render_widget(Paragraph::new(line), inner);

    // Cursor is a byte offset; the terminal wants display columns.
    let before = input.text.get(..input.cursor).unwrap_or(&input.text);
    let prompt_offset = 2u16;
    let cursor_x = inner.x + prompt_offset + before.width() as u16;
    frame.set_cursor_position((cursor_x.min(inner.right().saturating_sub(1)), inner.y));
}
