use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub struct AppLayout {
    pub buffer_tree: Rect,
    pub user_list: Rect,
    pub topic_bar: Rect,
    pub message_area: Rect,
    pub input_box: Rect,
    pub status_bar: Rect,
}

pub fn compute_layout(area: Rect) -> AppLayout {
    // content | status bar
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(1)])
        .split(area);

    let content = main_chunks[0];
    let status_bar = main_chunks[1];

    // buffer tree | conversation | member panel
    let h_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .spacing(1)
        .constraints([
            Constraint::Length(22),
            Constraint::Min(30),
            Constraint::Length(24),
        ])
        .split(content);

    let buffer_tree = h_chunks[0];
    let user_list = h_chunks[2];

    let center = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Topic bar
            Constraint::Min(5),    // Messages
            Constraint::Length(3), // Input box
        ])
        .split(h_chunks[1]);

    AppLayout {
        buffer_tree,
        user_list,
        topic_bar: center[0],
        message_area: center[1],
        input_box: center[2],
        status_bar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_fills_width() {
        let area = Rect::new(0, 0, 120, 40);
        let layout = compute_layout(area);
        assert_eq!(layout.status_bar.height, 1);
        assert_eq!(layout.status_bar.width, 120);
        assert!(layout.buffer_tree.right() <= layout.message_area.x);
        assert!(layout.message_area.right() <= layout.user_list.x);
        assert_eq!(layout.input_box.height, 3);
        assert_eq!(layout.message_area.x, layout.input_box.x);
    }
}
