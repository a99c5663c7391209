use crossterm::event::KeyCode;
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::services::loader::{entry_label, KeySizeMap};
use crate::theme::Theme;
use crate::widgets::chrome::panel_block;
use crate::widgets::spinner_glyph;

pub const PLACEHOLDER: &str = "-- Select a key --";
pub const NO_KEYS: &str = "No keys found";
pub const LOAD_ERROR: &str = "Error loading keys";

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorRow {
    pub label: String,
    pub key: Option<String>,
    pub disabled: bool,
}

fn placeholder_row() -> SelectorRow {
    SelectorRow {
        label: PLACEHOLDER.to_string(),
        key: None,
        disabled: true,
    }
}

fn sentinel_row(label: &str) -> SelectorRow {
    SelectorRow {
        label: label.to_string(),
        key: None,
        disabled: true,
    }
}

/// Key picker for one source. Row 0 is always the placeholder; entries (or a
/// single sentinel) follow. Sentinels and the placeholder never take the
/// cursor once real entries exist.
pub struct SelectorWidget {
    pub source_id: String,
    pub title: String,
    pub data_type: String,
    pub loading: bool,
    rows: Vec<SelectorRow>,
    cursor: usize,
    offset: usize,
    last_viewport_h: u16,
    error: bool,
    theme: Theme,
}

impl SelectorWidget {
    pub fn new(
        source_id: impl Into<String>,
        title: impl Into<String>,
        data_type: impl Into<String>,
        theme: Theme,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            title: title.into(),
            data_type: data_type.into(),
            loading: false,
            rows: vec![placeholder_row()],
            cursor: 0,
            offset: 0,
            last_viewport_h: 0,
            error: false,
            theme,
        }
    }

    /// Rebuild from a keys outcome; cursor returns to the placeholder.
    pub fn set_keys(&mut self, map: &KeySizeMap) {
        let mut rows = vec![placeholder_row()];
        if map.is_empty() {
            rows.push(sentinel_row(NO_KEYS));
        } else {
            for (key, size) in map.iter() {
                rows.push(SelectorRow {
                    label: entry_label(key, size),
                    key: Some(key.to_string()),
                    disabled: false,
                });
            }
        }
        self.rows = rows;
        self.cursor = 0;
        self.offset = 0;
        self.loading = false;
        self.error = false;
    }

    pub fn set_error(&mut self) {
        self.rows = vec![placeholder_row(), sentinel_row(LOAD_ERROR)];
        self.cursor = 0;
        self.offset = 0;
        self.loading = false;
        self.error = true;
    }

    pub fn rows(&self) -> &[SelectorRow] {
        &self.rows
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    pub fn selected_key(&self) -> Option<&str> {
        self.rows.get(self.cursor).and_then(|r| r.key.as_deref())
    }

    fn first_enabled(&self) -> Option<usize> {
        self.rows.iter().position(|r| !r.disabled)
    }

    fn next_enabled(&self, from: usize) -> Option<usize> {
        self.rows
            .iter()
            .enumerate()
            .skip(from + 1)
            .find(|(_, r)| !r.disabled)
            .map(|(i, _)| i)
    }

    fn prev_enabled(&self, from: usize) -> Option<usize> {
        self.rows
            .iter()
            .enumerate()
            .take(from)
            .rev()
            .find(|(_, r)| !r.disabled)
            .map(|(i, _)| i)
    }

    fn keep_cursor_visible(&mut self) {
        let ih = self.last_viewport_h as usize;
        if ih == 0 {
            self.offset = 0;
            return;
        }
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset.saturating_add(ih) {
            self.offset = self.cursor.saturating_sub(ih.saturating_sub(1));
        }
    }
}

impl crate::widgets::Widget for SelectorWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64) {
        let inner_h = area.height.saturating_sub(2);
        self.last_viewport_h = inner_h;
        if self.cursor >= self.rows.len() {
            self.cursor = self.rows.len().saturating_sub(1);
        }
        self.keep_cursor_visible();
        let ih = inner_h as usize;
        let total = self.rows.len();
        let max_start = total.saturating_sub(ih);
        let start = self.offset.min(max_start);
        let end = (start + ih).min(total);
        let items: Vec<ListItem> = self
            .rows
            .iter()
            .enumerate()
            .skip(start)
            .take(end - start)
            .map(|(i, row)| {
                let sel_mark = if self.cursor == i { "> " } else { "  " };
                let item = ListItem::new(format!("{sel_mark}{}", row.label));
                if self.cursor == i && !row.disabled {
                    item.style(self.theme.list_cursor_style())
                } else if self.error && row.disabled && row.label == LOAD_ERROR {
                    item.style(self.theme.text_error())
                } else if row.disabled {
                    item.style(self.theme.text_muted())
                } else {
                    item
                }
            })
            .collect();
        let title = if self.loading {
            format!("{} {}", self.title, spinner_glyph(tick))
        } else {
            self.title.clone()
        };
        let block = panel_block(&title, focused, &self.theme);
        let list = List::new(items).block(block);
        f.render_widget(list, area);
    }

    fn on_key(&mut self, key: KeyCode) -> Vec<crate::app::Effect> {
        match key {
            KeyCode::Up => {
                if let Some(i) = self.prev_enabled(self.cursor) {
                    self.cursor = i;
                }
                self.keep_cursor_visible();
            }
            KeyCode::Down => {
                if let Some(i) = self.next_enabled(self.cursor) {
                    self.cursor = i;
                }
                self.keep_cursor_visible();
            }
            KeyCode::PageUp => {
                for _ in 0..self.last_viewport_h.max(1) {
                    match self.prev_enabled(self.cursor) {
                        Some(i) => self.cursor = i,
                        None => break,
                    }
                }
                self.keep_cursor_visible();
            }
            KeyCode::PageDown => {
                for _ in 0..self.last_viewport_h.max(1) {
                    match self.next_enabled(self.cursor) {
                        Some(i) => self.cursor = i,
                        None => break,
                    }
                }
                self.keep_cursor_visible();
            }
            KeyCode::Home => {
                if let Some(i) = self.first_enabled() {
                    self.cursor = i;
                }
                self.keep_cursor_visible();
            }
            KeyCode::End => {
                if let Some(i) = self.rows.iter().rposition(|r| !r.disabled) {
                    self.cursor = i;
                }
                self.keep_cursor_visible();
            }
            KeyCode::Enter => {
                if let Some(key) = self.selected_key() {
                    return vec![crate::app::Effect::FetchValue {
                        source_id: self.source_id.clone(),
                        key: key.to_string(),
                        data_type: self.data_type.clone(),
                    }];
                }
            }
            _ => {}
        }
        Vec::new()
    }
}
