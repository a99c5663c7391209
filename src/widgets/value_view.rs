use crossterm::event::KeyCode;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use serde_json::Value as JsonValue;

use crate::theme::Theme;
use crate::widgets::chrome::panel_block;
use crate::widgets::spinner_glyph;

pub const NO_DATA: &str = "No data found for this key.";
pub const EMPTY_LIST: &str = "Empty list.";
pub const EMPTY_MAP: &str = "Empty map.";
pub const FETCH_ERROR: &str = "Error loading data.";

fn muted(text: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(
        text.into(),
        Style::default().fg(Color::DarkGray),
    ))
}

fn scalar_span(v: &JsonValue) -> Span<'static> {
    match v {
        JsonValue::Null => Span::styled("null", Style::default().fg(Color::DarkGray)),
        JsonValue::Bool(b) => Span::styled(b.to_string(), Style::default().fg(Color::Magenta)),
        JsonValue::Number(n) => Span::styled(n.to_string(), Style::default().fg(Color::Yellow)),
        JsonValue::String(s) => Span::styled(s.clone(), Style::default().fg(Color::Green)),
        JsonValue::Array(arr) => Span::styled(
            format!("[{} items]", arr.len()),
            Style::default().fg(Color::DarkGray),
        ),
        JsonValue::Object(map) => Span::styled(
            format!("{{{} keys}}", map.len()),
            Style::default().fg(Color::DarkGray),
        ),
    }
}

fn push_value(v: &JsonValue, indent: usize, lines: &mut Vec<Line<'static>>) {
    let indent_sp = " ".repeat(indent);
    match v {
        JsonValue::Array(arr) => {
            for item in arr {
                match item {
                    JsonValue::Object(obj) => {
                        lines.push(Line::from(vec![
                            Span::raw(indent_sp.clone()),
                            Span::raw("• "),
                        ]));
                        for (k, val) in obj {
                            push_field(k, val, indent + 2, lines);
                        }
                    }
                    JsonValue::Array(_) => {
                        lines.push(Line::from(vec![
                            Span::raw(indent_sp.clone()),
                            Span::raw("• "),
                        ]));
                        push_value(item, indent + 2, lines);
                    }
                    scalar => {
                        lines.push(Line::from(vec![
                            Span::raw(indent_sp.clone()),
                            Span::raw("• "),
                            scalar_span(scalar),
                        ]));
                    }
                }
            }
        }
        JsonValue::Object(map) => {
            for (k, val) in map {
                push_field(k, val, indent, lines);
            }
        }
        scalar => {
            lines.push(Line::from(vec![
                Span::raw(indent_sp),
                scalar_span(scalar),
            ]));
        }
    }
}

fn push_field(key: &str, v: &JsonValue, indent: usize, lines: &mut Vec<Line<'static>>) {
    let indent_sp = " ".repeat(indent);
    let key_span = Span::styled(format!("{key}: "), Style::default().fg(Color::Cyan));
    match v {
        JsonValue::Object(obj) if !obj.is_empty() => {
            lines.push(Line::from(vec![Span::raw(indent_sp), key_span]));
            push_value(v, indent + 2, lines);
        }
        JsonValue::Array(arr) if !arr.is_empty() => {
            lines.push(Line::from(vec![Span::raw(indent_sp), key_span]));
            push_value(v, indent + 2, lines);
        }
        other => {
            lines.push(Line::from(vec![
                Span::raw(indent_sp),
                key_span,
                scalar_span(other),
            ]));
        }
    }
}

/// Total rendering of a value response. Every JSON shape maps to lines;
/// nothing panics, nothing falls through blank.
pub fn value_lines(v: &JsonValue) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match v {
        JsonValue::Null => lines.push(muted(NO_DATA)),
        JsonValue::Array(arr) if arr.is_empty() => lines.push(muted(EMPTY_LIST)),
        JsonValue::Object(map) if map.is_empty() => lines.push(muted(EMPTY_MAP)),
        JsonValue::Object(map) => {
            // Backend error envelope: {"error": "..."}
            if let Some(err) = map.get("error") {
                let text = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
                lines.push(Line::from(Span::styled(
                    format!("Error: {text}"),
                    Style::default().fg(Color::Red),
                )));
            } else {
                push_value(v, 0, &mut lines);
            }
        }
        other => push_value(other, 0, &mut lines),
    }
    lines
}

/// Rendered value for one source. Holds the last response (or error) and
/// scroll state; rebuilt lines each frame.
pub struct ValueViewWidget {
    pub title: String,
    pub loading: bool,
    value: Option<JsonValue>,
    error: Option<String>,
    mode_raw: bool,
    wrap: bool,
    scroll_y: u16,
    last_viewport_h: u16,
    theme: Theme,
}

impl ValueViewWidget {
    pub fn new(title: impl Into<String>, theme: Theme) -> Self {
        Self {
            title: title.into(),
            loading: false,
            value: None,
            error: None,
            mode_raw: false,
            wrap: false,
            scroll_y: 0,
            last_viewport_h: 0,
            theme,
        }
    }

    pub fn set_value(&mut self, v: JsonValue) {
        self.value = Some(v);
        self.error = None;
        self.loading = false;
        self.scroll_y = 0;
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.error = Some(msg.into());
        self.loading = false;
        self.scroll_y = 0;
    }

    /// Pretty JSON (or the error) for clipboard copy.
    pub fn raw_text(&self) -> Option<String> {
        if let Some(e) = &self.error {
            return Some(format!("{FETCH_ERROR} {e}"));
        }
        self.value
            .as_ref()
            .map(|v| serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()))
    }

    fn body_lines(&self) -> Vec<Line<'static>> {
        if let Some(e) = &self.error {
            return vec![
                Line::from(Span::styled(
                    FETCH_ERROR.to_string(),
                    Style::default().fg(Color::Red),
                )),
                muted(e.clone()),
            ];
        }
        match &self.value {
            None => vec![muted("Select a key and press Enter.")],
            Some(v) if self.mode_raw => {
                let pretty =
                    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string());
                pretty.lines().map(|l| Line::from(l.to_string())).collect()
            }
            Some(v) => value_lines(v),
        }
    }
}

impl crate::widgets::Widget for ValueViewWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64) {
        let lines = self.body_lines();
        self.last_viewport_h = area.height.saturating_sub(2);
        let total = lines.len() as u16;
        let max_scroll = total.saturating_sub(self.last_viewport_h);
        if self.scroll_y > max_scroll {
            self.scroll_y = max_scroll;
        }
        let title = if self.loading {
            format!("{} {}", self.title, spinner_glyph(tick))
        } else {
            self.title.clone()
        };
        let block = panel_block(&title, focused, &self.theme);
        let p = Paragraph::new(lines)
            .block(block)
            .wrap(ratatui::widgets::Wrap { trim: !self.wrap })
            .scroll((self.scroll_y, 0));
        f.render_widget(p, area);
    }

    fn on_key(&mut self, key: KeyCode) -> Vec<crate::app::Effect> {
        match key {
            KeyCode::Up => {
                if self.scroll_y > 0 {
                    self.scroll_y -= 1;
                }
            }
            KeyCode::Down => self.scroll_y = self.scroll_y.saturating_add(1),
            KeyCode::PageUp => {
                self.scroll_y = self.scroll_y.saturating_sub(self.last_viewport_h);
            }
            KeyCode::PageDown => {
                self.scroll_y = self.scroll_y.saturating_add(self.last_viewport_h);
            }
            KeyCode::Home => self.scroll_y = 0,
            KeyCode::Char('w') | KeyCode::Char('W') => self.wrap = !self.wrap,
            KeyCode::Char('j') | KeyCode::Char('J') => {
                self.mode_raw = !self.mode_raw;
                self.scroll_y = 0;
            }
            _ => {}
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line_text(l: &Line) -> String {
        l.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn texts(v: &JsonValue) -> Vec<String> {
        value_lines(v).iter().map(line_text).collect()
    }

    #[test]
    fn null_renders_no_data_message() {
        assert_eq!(texts(&JsonValue::Null), vec![NO_DATA]);
    }

    #[test]
    fn empty_containers_render_messages() {
        assert_eq!(texts(&json!([])), vec![EMPTY_LIST]);
        assert_eq!(texts(&json!({})), vec![EMPTY_MAP]);
    }

    #[test]
    fn error_envelope_renders_error_line() {
        let out = texts(&json!({"error": "Unsupported data type"}));
        assert_eq!(out, vec!["Error: Unsupported data type"]);
    }

    #[test]
    fn scalar_array_renders_bullets() {
        let out = texts(&json!(["alpha", 2, true]));
        assert_eq!(out, vec!["• alpha", "• 2", "• true"]);
    }

    #[test]
    fn map_renders_field_lines() {
        let out = texts(&json!({"width": 2048, "depth": "7"}));
        assert_eq!(out, vec!["depth: 7", "width: 2048"]);
    }

    #[test]
    fn nested_values_indent() {
        let out = texts(&json!({"info": {"count": 3}}));
        assert_eq!(out, vec!["info: ", "  count: 3"]);
    }

    #[test]
    fn scalar_renders_single_line() {
        assert_eq!(texts(&json!(42)), vec!["42"]);
        assert_eq!(texts(&json!("ready")), vec!["ready"]);
    }

    #[test]
    fn object_array_renders_field_blocks() {
        let out = texts(&json!([{"item": "a", "count": 1}]));
        assert_eq!(out, vec!["• ", "  count: 1", "  item: a"]);
    }

    #[test]
    fn widget_reports_error_state() {
        let mut w = ValueViewWidget::new("CMS", Theme::default());
        w.set_error("GET /api/data: HTTP 500");
        let raw = w.raw_text().unwrap();
        assert!(raw.contains(FETCH_ERROR));
        assert!(raw.contains("HTTP 500"));
    }
}
