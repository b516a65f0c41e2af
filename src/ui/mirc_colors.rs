use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};

/// mIRC extended palette, codes 0-98. Code 99 means "default colour".
const MIRC_PALETTE: [u32; 99] = [
    0xffffff, 0x000000, 0x00007f, 0x009300, 0xff0000, 0x7f0000, 0x9c009c, 0xfc7f00, // 0-7
    0xffff00, 0x00fc00, 0x009393, 0x00ffff, 0x0000fc, 0xff00ff, 0x7f7f7f, 0xd2d2d2, // 8-15
    0x470000, 0x472100, 0x474700, 0x324700, 0x004700, 0x00472c, 0x004747, 0x002747, // 16-23
    0x000047, 0x2e0047, 0x470047, 0x47002a, 0x740000, 0x743a00, 0x747400, 0x517400, // 24-31
    0x007400, 0x007449, 0x007474, 0x004074, 0x000074, 0x4b0074, 0x740074, 0x740045, // 32-39
    0xb50000, 0xb56300, 0xb5b500, 0x7db500, 0x00b500, 0x00b571, 0x00b5b5, 0x0063b5, // 40-47
    0x0000b5, 0x7500b5, 0xb500b5, 0xb5006b, 0xff0000, 0xff8c00, 0xffff00, 0xb2ff00, // 48-55
    0x00ff00, 0x00ffa0, 0x00ffff, 0x008cff, 0x0000ff, 0xa500ff, 0xff00ff, 0xff0098, // 56-63
    0xff5959, 0xffb459, 0xffff71, 0xcfff60, 0x6fff6f, 0x65ffc9, 0x6dffff, 0x59b4ff, // 64-71
    0x5959ff, 0xc459ff, 0xff66ff, 0xff59bc, 0xff9c9c, 0xffd39c, 0xffff9c, 0xe2ff9c, // 72-79
    0x9cff9c, 0x9cffdb, 0x9cffff, 0x9cd3ff, 0x9c9cff, 0xdc9cff, 0xff9cff, 0xff94d3, // 80-87
    0x000000, 0x131313, 0x282828, 0x363636, 0x4d4d4d, 0x656565, 0x818181, 0x9f9f9f, // 88-95
    0xbcbcbc, 0xe2e2e2, 0xffffff, // 96-98
];

/// Terminal colour for an mIRC colour code, `None` for 99 and out of range.
pub fn palette(code: u8) -> Option<Color> {
    MIRC_PALETTE.get(code as usize).map(|rgb| {
        Color::Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, *rgb as u8)
    })
}

/// Read up to two digits at the start of `chars`.
fn take_color_code(chars: &[char]) -> Option<(u8, usize)> {
    let digits = chars
        .iter()
        .take(2)
        .take_while(|c| c.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    let code: String = chars[..digits].iter().collect();
    code.parse().ok().map(|n| (n, digits))
}

fn toggle(style: Style, modifier: Modifier) -> Style {
    if style.add_modifier.contains(modifier) {
        style.remove_modifier(modifier)
    } else {
        style.add_modifier(modifier)
    }
}

/// Parse mIRC-formatted text into styled spans.
///
/// Text between `\x08` toggles is hidden. Tabs render as a single space.
pub fn parse_mirc_formatted(text: &str, base_style: Style) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut current_style = base_style;
    let mut current_text = String::new();
    let mut hidden = false;
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    macro_rules! flush {
        () => {
            if !current_text.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut current_text), current_style));
            }
        };
    }

    while i < chars.len() {
        match chars[i] {
            '\x02' => {
                flush!();
                current_style = toggle(current_style, Modifier::BOLD);
                i += 1;
            }
            '\x1d' => {
                flush!();
                current_style = toggle(current_style, Modifier::ITALIC);
                i += 1;
            }
            '\x1f' => {
                flush!();
                current_style = toggle(current_style, Modifier::UNDERLINED);
                i += 1;
            }
            '\x08' => {
                flush!();
                hidden = !hidden;
                i += 1;
            }
            '\x03' => {
                flush!();
                i += 1;
                match take_color_code(&chars[i..]) {
                    Some((fg, used)) => {
                        i += used;
                        current_style = match palette(fg) {
                            Some(color) => current_style.fg(color),
                            None => Style { fg: base_style.fg, ..current_style },
                        };
                        // A comma only starts a background when digits follow.
                        if chars.get(i) == Some(&',') {
                            if let Some((bg, used)) = take_color_code(&chars[i + 1..]) {
                                i += 1 + used;
                                current_style = match palette(bg) {
                                    Some(color) => current_style.bg(color),
                                    None => Style { bg: base_style.bg, ..current_style },
                                };
                            }
                        }
                    }
                    None => {
                        current_style = Style {
                            fg: base_style.fg,
                            bg: base_style.bg,
                            ..current_style
                        };
                    }
                }
            }
            '\x0f' => {
                flush!();
                current_style = base_style;
                hidden = false;
                i += 1;
            }
            '\x16' => {
                flush!();
                let old_fg = current_style.fg;
                let old_bg = current_style.bg;
                if let Some(bg) = old_bg {
                    current_style = current_style.fg(bg);
                }
                if let Some(fg) = old_fg {
                    current_style = current_style.bg(fg);
                }
                i += 1;
            }
            c => {
                if !hidden {
                    current_text.push(if c == '\t' { ' ' } else { c });
                }
                i += 1;
            }
        }
    }

    flush!();

    if spans.is_empty() {
        spans.push(Span::styled(String::new(), base_style));
    }

    spans
}

/// Styled spans without formatting, for when colour parsing is off.
pub fn plain(text: &str, base_style: Style) -> Vec<Span<'static>> {
    vec![Span::styled(
        crate::logging::strip_formatting(text),
        base_style,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(spans: &[Span]) -> String {
        spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_extended_palette() {
        assert_eq!(palette(4), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(palette(52), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(palette(98), Some(Color::Rgb(255, 255, 255)));
        assert_eq!(palette(99), None);
    }

    #[test]
    fn test_color_and_reset() {
        let spans = parse_mirc_formatted("\x0319[#rust]\x0f hi", Style::default());
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].content, "[#rust]");
        assert_eq!(spans[0].style.fg, palette(19));
        assert_eq!(spans[1].content, " hi");
        assert_eq!(spans[1].style.fg, None);
    }

    #[test]
    fn test_comma_without_digits_is_text() {
        let spans = parse_mirc_formatted("\x034,hello", Style::default());
        assert_eq!(text_of(&spans), ",hello");
    }

    #[test]
    fn test_hidden_text_is_dropped() {
        let spans = parse_mirc_formatted("a\x08secret\x08b\tc", Style::default());
        assert_eq!(text_of(&spans), "ab c");
    }

    #[test]
    fn test_multibyte_text_survives() {
        let spans = parse_mirc_formatted("\x02héllo·wörld\x02", Style::default());
        assert_eq!(text_of(&spans), "héllo·wörld");
        assert!(spans[0].style.add_modifier.contains(Modifier::BOLD));
    }
}
