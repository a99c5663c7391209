use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::ui::{AppState, View};

/// Top bar: title, view tabs, backend URL. The bottom border picks up the
/// accent color while a request is in flight.
pub fn draw_header(f: &mut Frame, area: Rect, state: &AppState) {
    let border = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(if state.status_text.is_some() {
            state.theme.border_focused()
        } else {
            state.theme.border_unfocused()
        });
    let inner = border.inner(area);

    let tab = |label: &str, active: bool| {
        if active {
            Span::styled(
                format!("[{label}]"),
                state.theme.text_active_bold(),
            )
        } else {
            Span::styled(format!(" {label} "), state.theme.text_muted())
        }
    };
    let left = Line::from(vec![
        Span::styled(
            format!(" {} ", state.header_title),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        tab("Board", matches!(state.view, View::Board)),
        Span::raw(" "),
        tab("Search", matches!(state.view, View::Search)),
    ]);
    f.render_widget(Paragraph::new(left), inner);

    let right = Line::from(Span::styled(
        format!("{} ", state.base_url),
        state.theme.text_muted(),
    ));
    f.render_widget(
        Paragraph::new(right).alignment(Alignment::Right),
        inner,
    );

    f.render_widget(border, area);
}
