use crossterm::event::KeyCode;
use ratatui::prelude::*;
use tui_textarea::TextArea;

use crate::app::Effect;
use crate::theme::Theme;
use crate::widgets::chrome::panel_block;
use crate::widgets::textarea_key;

const FIELD_QUERY: usize = 0;
const FIELD_IMAGE: usize = 1;

/// Query + optional image path. Up/Down move between fields, Enter submits.
pub struct SearchFormWidget {
    query: TextArea<'static>,
    image: TextArea<'static>,
    field: usize,
    theme: Theme,
}

impl SearchFormWidget {
    pub fn new(theme: Theme) -> Self {
        let mut query = TextArea::default();
        query.set_placeholder_text("Type a query and press Enter");
        let mut image = TextArea::default();
        image.set_placeholder_text("Path to an image file (optional)");
        Self {
            query,
            image,
            field: FIELD_QUERY,
            theme,
        }
    }

    pub fn query_text(&self) -> String {
        self.query.lines().join("\n").trim().to_string()
    }

    pub fn image_path(&self) -> Option<String> {
        let p = self.image.lines().join("\n").trim().to_string();
        if p.is_empty() {
            None
        } else {
            Some(p)
        }
    }

    fn active_area(&mut self) -> &mut TextArea<'static> {
        if self.field == FIELD_IMAGE {
            &mut self.image
        } else {
            &mut self.query
        }
    }
}

impl crate::widgets::Widget for SearchFormWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, _tick: u64) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Length(3)])
            .split(area);
        for (idx, (ta, title, rect)) in [
            (&mut self.query, "Query", chunks[0]),
            (&mut self.image, "Image path", chunks[1]),
        ]
        .into_iter()
        .enumerate()
        {
            let active = focused && idx == self.field;
            ta.set_block(panel_block(title, active, &self.theme));
            ta.set_cursor_style(if active {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            });
            ta.set_cursor_line_style(Style::default());
            f.render_widget(&*ta, rect);
        }
    }

    fn on_key(&mut self, key: KeyCode) -> Vec<Effect> {
        match key {
            KeyCode::Up => {
                self.field = FIELD_QUERY;
            }
            KeyCode::Down => {
                self.field = FIELD_IMAGE;
            }
            KeyCode::Enter => {
                return vec![Effect::SubmitSearch {
                    query: self.query_text(),
                    image_path: self.image_path(),
                }];
            }
            other => {
                if let Some(ev) = textarea_key(other) {
                    let _ = self.active_area().input(ev);
                }
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::Widget;

    fn type_str(w: &mut SearchFormWidget, s: &str) {
        for c in s.chars() {
            w.on_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn typed_query_is_captured() {
        let mut w = SearchFormWidget::new(Theme::default());
        type_str(&mut w, "hello cache");
        assert_eq!(w.query_text(), "hello cache");
        assert_eq!(w.image_path(), None);
    }

    #[test]
    fn enter_submits_query_and_image() {
        let mut w = SearchFormWidget::new(Theme::default());
        type_str(&mut w, "sunset");
        w.on_key(KeyCode::Down);
        type_str(&mut w, "/tmp/pic.jpg");
        let fx = w.on_key(KeyCode::Enter);
        match fx.as_slice() {
            [Effect::SubmitSearch { query, image_path }] => {
                assert_eq!(query, "sunset");
                assert_eq!(image_path.as_deref(), Some("/tmp/pic.jpg"));
            }
            other => panic!("unexpected effects: {other:?}"),
        }
    }

    #[test]
    fn field_switch_routes_typing() {
        let mut w = SearchFormWidget::new(Theme::default());
        w.on_key(KeyCode::Down);
        type_str(&mut w, "a.png");
        w.on_key(KeyCode::Up);
        type_str(&mut w, "q");
        assert_eq!(w.query_text(), "q");
        assert_eq!(w.image_path(), Some("a.png".to_string()));
    }

    #[test]
    fn whitespace_only_image_path_is_none() {
        let mut w = SearchFormWidget::new(Theme::default());
        w.on_key(KeyCode::Down);
        type_str(&mut w, "   ");
        assert_eq!(w.image_path(), None);
    }

    #[test]
    fn backspace_edits_the_query() {
        let mut w = SearchFormWidget::new(Theme::default());
        type_str(&mut w, "cachr");
        w.on_key(KeyCode::Backspace);
        type_str(&mut w, "e");
        assert_eq!(w.query_text(), "cache");
    }

    #[test]
    fn non_editing_keys_do_not_type() {
        let mut w = SearchFormWidget::new(Theme::default());
        w.on_key(KeyCode::F(5));
        w.on_key(KeyCode::PageDown);
        assert_eq!(w.query_text(), "");
    }
}
