use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::theme::Theme;

/// One entry in the visibility bar: digit hotkey, panel label, current state.
pub struct ToggleChip {
    pub index: usize,
    pub label: String,
    pub visible: bool,
}

/// Hotkey label for the nth panel (1-based). Panels beyond ten have no
/// digit and render a dot.
pub fn digit_label(index: usize) -> String {
    match index {
        1..=9 => index.to_string(),
        10 => "0".to_string(),
        _ => "·".to_string(),
    }
}

/// Digit key -> 1-based panel index, mirroring digit_label.
pub fn index_for_digit(c: char) -> Option<usize> {
    match c {
        '1'..='9' => Some(c as usize - '0' as usize),
        '0' => Some(10),
        _ => None,
    }
}

pub fn draw_toggle_bar(f: &mut Frame, area: Rect, chips: &[ToggleChip], theme: &Theme) {
    let mut spans: Vec<Span> = Vec::with_capacity(chips.len() * 2 + 1);
    spans.push(Span::styled("Panels: ", theme.text_muted()));
    for (i, chip) in chips.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        let mark = if chip.visible { "●" } else { "○" };
        let text = format!("[{}] {} {}", digit_label(chip.index), chip.label, mark);
        let style = if chip.visible {
            theme.text_active_bold()
        } else {
            theme.text_muted()
        };
        spans.push(Span::styled(text, style));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_labels_cover_ten_panels() {
        assert_eq!(digit_label(1), "1");
        assert_eq!(digit_label(9), "9");
        assert_eq!(digit_label(10), "0");
        assert_eq!(digit_label(11), "·");
    }

    #[test]
    fn digits_round_trip_to_indices() {
        assert_eq!(index_for_digit('1'), Some(1));
        assert_eq!(index_for_digit('9'), Some(9));
        assert_eq!(index_for_digit('0'), Some(10));
        assert_eq!(index_for_digit('x'), None);
        for i in 1..=10 {
            let c = digit_label(i).chars().next().unwrap();
            assert_eq!(index_for_digit(c), Some(i));
        }
    }
}
