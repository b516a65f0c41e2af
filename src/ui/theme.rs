use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::BorderType;

pub struct Theme;

impl Theme {
    pub const BG_DARK: Color = Color::Rgb(22, 24, 30);
    pub const BG_ELEVATED: Color = Color::Rgb(40, 44, 54);
    pub const BORDER_DIM: Color = Color::Rgb(70, 76, 90);
    pub const TEXT_PRIMARY: Color = Color::Rgb(220, 222, 228);
    pub const TEXT_SECONDARY: Color = Color::Rgb(150, 156, 170);
    pub const TEXT_MUTED: Color = Color::Rgb(95, 100, 115);
    pub const ACCENT_TEAL: Color = Color::Rgb(80, 200, 210);
    pub const ACCENT_AMBER: Color = Color::Rgb(230, 180, 80);
    pub const ACCENT_ROSE: Color = Color::Rgb(225, 110, 130);
    pub const ACCENT_GREEN: Color = Color::Rgb(90, 210, 130);
    pub const ACCENT_LAVENDER: Color = Color::Rgb(175, 140, 220);

    const NICK_COLORS: [Color; 8] = [
        Color::Rgb(80, 200, 210),
        Color::Rgb(100, 170, 230),
        Color::Rgb(175, 140, 220),
        Color::Rgb(220, 150, 180),
        Color::Rgb(230, 180, 80),
        Color::Rgb(90, 210, 130),
        Color::Rgb(210, 130, 100),
        Color::Rgb(160, 200, 90),
    ];

    pub fn border() -> Style {
        Style::default().fg(Self::BORDER_DIM)
    }

    pub fn border_focused() -> Style {
        Style::default().fg(Self::ACCENT_TEAL)
    }

    pub fn border_type() -> BorderType {
        BorderType::Plain
    }

    pub fn border_type_focused() -> BorderType {
        BorderType::Rounded
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn timestamp() -> Style {
        Style::default().fg(Self::TEXT_MUTED)
    }

    pub fn nick_self() -> Style {
        Style::default()
            .fg(Self::ACCENT_GREEN)
            .add_modifier(Modifier::BOLD)
    }

    /// Stable per-nick colour.
    pub fn nick_color(nick: &str) -> Style {
        let hash = nick
            .to_lowercase()
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        Style::default().fg(Self::NICK_COLORS[hash as usize % Self::NICK_COLORS.len()])
    }

    pub fn message_text() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    pub fn system_message() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    pub fn error_message() -> Style {
        Style::default().fg(Self::ACCENT_ROSE)
    }

    pub fn action_message() -> Style {
        Style::default().fg(Self::ACCENT_LAVENDER)
    }

    pub fn notice_message() -> Style {
        Style::default().fg(Self::ACCENT_AMBER)
    }

    pub fn join_message() -> Style {
        Style::default().fg(Self::ACCENT_GREEN)
    }

    pub fn part_message() -> Style {
        Style::default().fg(Self::ACCENT_ROSE)
    }

    pub fn server_connected() -> Style {
        Style::default().fg(Self::ACCENT_GREEN)
    }

    pub fn server_disconnected() -> Style {
        Style::default().fg(Self::ACCENT_ROSE)
    }

    pub fn server_connecting() -> Style {
        Style::default().fg(Self::ACCENT_AMBER)
    }

    pub fn channel_normal() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    pub fn channel_active() -> Style {
        Style::default()
            .fg(Self::ACCENT_TEAL)
            .add_modifier(Modifier::BOLD)
    }

    pub fn channel_unread() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    pub fn channel_mention() -> Style {
        Style::default()
            .fg(Self::ACCENT_ROSE)
            .add_modifier(Modifier::BOLD)
    }

    pub fn user_op() -> Style {
        Style::default().fg(Self::ACCENT_GREEN)
    }

    pub fn user_voice() -> Style {
        Style::default().fg(Self::ACCENT_AMBER)
    }

    pub fn user_normal() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    pub fn input_text() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    pub fn status_bar() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY).bg(Self::BG_ELEVATED)
    }

    pub fn panel_bg() -> Style {
        Style::default().bg(Self::BG_DARK)
    }

    pub fn panel_bg_focused() -> Style {
        Style::default().bg(Self::BG_DARK)
    }

    pub fn scrollbar_thumb() -> Style {
        Style::default().fg(Self::ACCENT_TEAL)
    }

    pub fn scrollbar_track() -> Style {
        Style::default().fg(Self::BORDER_DIM)
    }
}
