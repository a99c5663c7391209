use crossterm::event::KeyCode;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use std::collections::HashSet;

use crate::model::Destination;
use crate::services::search::{fmt_score, scalar_text, split_utterances, SearchResponse};
use crate::theme::Theme;
use crate::widgets::chrome::panel_block;
use crate::widgets::spinner_glyph;

pub const IDLE_HINT: &str = "Run a search to populate this pane.";
pub const SEARCHING: &str = "Searching...";
pub const FAILED: &str = "Search failed.";
pub const NO_IMAGES: &str = "No matching images found.";

enum ResultState {
    Idle,
    Loading,
    Failed(String),
    Loaded(SearchResponse),
}

/// One dispatch destination's response pane. Question and summary matches
/// expand in place to show their source utterances.
pub struct ResultsWidget {
    pub panel_id: String,
    pub title: String,
    destination: Destination,
    state: ResultState,
    expanded: HashSet<usize>,
    cursor: usize,
    scroll_y: u16,
    last_viewport_h: u16,
    theme: Theme,
}

impl ResultsWidget {
    pub fn new(
        panel_id: impl Into<String>,
        title: impl Into<String>,
        destination: Destination,
        theme: Theme,
    ) -> Self {
        Self {
            panel_id: panel_id.into(),
            title: title.into(),
            destination,
            state: ResultState::Idle,
            expanded: HashSet::new(),
            cursor: 0,
            scroll_y: 0,
            last_viewport_h: 0,
            theme,
        }
    }

    pub fn set_loading(&mut self) {
        self.state = ResultState::Loading;
        self.expanded.clear();
        self.cursor = 0;
        self.scroll_y = 0;
    }

    pub fn set_outcome(&mut self, outcome: Result<SearchResponse, String>) {
        self.state = match outcome {
            Ok(resp) => ResultState::Loaded(resp),
            Err(e) => ResultState::Failed(e),
        };
        self.expanded.clear();
        self.cursor = 0;
        self.scroll_y = 0;
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, ResultState::Loading)
    }

    /// Pretty JSON of the loaded response (or the failure text) for copy.
    pub fn raw_text(&self) -> Option<String> {
        match &self.state {
            ResultState::Loaded(resp) => Some(
                serde_json::to_string_pretty(resp)
                    .unwrap_or_else(|e| format!("serialization failed: {e}")),
            ),
            ResultState::Failed(e) => Some(format!("{FAILED} {e}")),
            _ => None,
        }
    }

    fn match_rows(&self) -> usize {
        match &self.state {
            ResultState::Loaded(resp) => match self.destination {
                Destination::Utterances => resp.matched_texts.len(),
                Destination::Questions => resp.matched_questions.len(),
                Destination::Summaries => resp.matched_summaries.len(),
                Destination::ImagesByDescription | Destination::ImagesByImage => {
                    resp.matched_photographs.len()
                }
            },
            _ => 0,
        }
    }

    fn expandable(&self) -> bool {
        matches!(
            self.destination,
            Destination::Questions | Destination::Summaries
        )
    }

    fn header_line(label: &str, n: usize) -> Line<'static> {
        Line::from(Span::styled(
            format!("{label} ({n})"),
            Style::default().add_modifier(Modifier::BOLD),
        ))
    }

    fn timing_footer(resp: &SearchResponse) -> Option<Line<'static>> {
        let mut parts = Vec::new();
        for (label, v) in [
            ("embedding", &resp.embedding_time),
            ("search", &resp.search_time),
            ("rag", &resp.rag_time),
            ("cache", &resp.cache_search_time),
        ] {
            if let Some(v) = v {
                parts.push(format!("{label} {}", scalar_text(v)));
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(Line::from(Span::styled(
                parts.join(" | "),
                Style::default().fg(Color::DarkGray),
            )))
        }
    }

    /// Build the pane body. The second value maps each match row to the
    /// line index it starts at, for scroll-follow.
    fn body_lines(&self, focused: bool) -> (Vec<Line<'static>>, Vec<usize>) {
        let muted = Style::default().fg(Color::DarkGray);
        let mut lines: Vec<Line<'static>> = Vec::new();
        let mut row_starts = Vec::new();
        match &self.state {
            ResultState::Idle => lines.push(Line::from(Span::styled(IDLE_HINT, muted))),
            ResultState::Loading => lines.push(Line::from(Span::styled(SEARCHING, muted))),
            ResultState::Failed(e) => {
                lines.push(Line::from(Span::styled(
                    FAILED,
                    Style::default().fg(Color::Red),
                )));
                lines.push(Line::from(Span::styled(e.clone(), muted)));
            }
            ResultState::Loaded(resp) => {
                if let Some(q) = &resp.query {
                    lines.push(Line::from(vec![
                        Span::styled("Q: ", Style::default().fg(Color::Cyan)),
                        Span::raw(q.clone()),
                    ]));
                }
                if let Some(a) = &resp.rag_answer {
                    lines.push(Line::from(vec![
                        Span::styled("A: ", self.theme.text_success()),
                        Span::styled(a.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    ]));
                }
                if let Some(cq) = &resp.cached_query {
                    let score = resp
                        .cached_score
                        .as_ref()
                        .map(|s| format!(" ({})", fmt_score(s)))
                        .unwrap_or_default();
                    lines.push(Line::from(Span::styled(
                        format!("cache hit: {cq}{score}"),
                        Style::default().fg(Color::Magenta),
                    )));
                }
                self.push_matches(resp, focused, &mut lines, &mut row_starts);
                if let Some(footer) = Self::timing_footer(resp) {
                    lines.push(footer);
                }
            }
        }
        (lines, row_starts)
    }

    fn cursor_style(&self, focused: bool, row: usize) -> Style {
        if focused && row == self.cursor {
            self.theme.list_cursor_style()
        } else {
            Style::default()
        }
    }

    fn push_matches(
        &self,
        resp: &SearchResponse,
        focused: bool,
        lines: &mut Vec<Line<'static>>,
        row_starts: &mut Vec<usize>,
    ) {
        match self.destination {
            Destination::Utterances => {
                if !resp.matched_texts.is_empty() {
                    lines.push(Self::header_line("Matched Texts", resp.matched_texts.len()));
                    for (i, m) in resp.matched_texts.iter().enumerate() {
                        row_starts.push(lines.len());
                        let score = m.score.as_ref().map(fmt_score).unwrap_or_default();
                        let text = m.utterance.clone().unwrap_or_default();
                        lines.push(Line::from(vec![
                            Span::styled(format!("{score:>5}  "), Style::default().fg(Color::Yellow)),
                            Span::styled(text, self.cursor_style(focused, i)),
                        ]));
                    }
                }
            }
            Destination::Questions => {
                if !resp.matched_questions.is_empty() {
                    lines.push(Self::header_line(
                        "Matched Questions",
                        resp.matched_questions.len(),
                    ));
                    for (i, m) in resp.matched_questions.iter().enumerate() {
                        row_starts.push(lines.len());
                        self.push_expandable(
                            i,
                            m.question.as_deref().unwrap_or_default(),
                            m.score.as_ref(),
                            m.utterances.as_deref(),
                            focused,
                            lines,
                        );
                    }
                }
            }
            Destination::Summaries => {
                if !resp.matched_summaries.is_empty() {
                    lines.push(Self::header_line(
                        "Matched Summaries",
                        resp.matched_summaries.len(),
                    ));
                    for (i, m) in resp.matched_summaries.iter().enumerate() {
                        row_starts.push(lines.len());
                        self.push_expandable(
                            i,
                            m.summary.as_deref().unwrap_or_default(),
                            m.score.as_ref(),
                            m.utterances.as_deref(),
                            focused,
                            lines,
                        );
                    }
                }
            }
            Destination::ImagesByDescription | Destination::ImagesByImage => {
                lines.push(Self::header_line(
                    "Matched Images",
                    resp.matched_photographs.len(),
                ));
                if resp.matched_photographs.is_empty() {
                    lines.push(Line::from(Span::styled(
                        NO_IMAGES,
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                for (i, m) in resp.matched_photographs.iter().enumerate() {
                    row_starts.push(lines.len());
                    let score = m.score.as_ref().map(fmt_score).unwrap_or_default();
                    let path = m.image_path.clone().unwrap_or_default();
                    lines.push(Line::from(vec![
                        Span::styled(format!("{score:>5}  "), Style::default().fg(Color::Yellow)),
                        Span::styled(path, self.cursor_style(focused, i)),
                    ]));
                    if let Some(desc) = &m.description {
                        lines.push(Line::from(Span::styled(
                            format!("       {desc}"),
                            Style::default().fg(Color::DarkGray),
                        )));
                    }
                }
            }
        }
    }

    fn push_expandable(
        &self,
        row: usize,
        text: &str,
        score: Option<&serde_json::Value>,
        utterances: Option<&str>,
        focused: bool,
        lines: &mut Vec<Line<'static>>,
    ) {
        let open = self.expanded.contains(&row);
        let chevron = if open { "▾ " } else { "▸ " };
        let score = score.map(fmt_score).unwrap_or_default();
        lines.push(Line::from(vec![
            Span::raw(chevron),
            Span::styled(text.to_string(), self.cursor_style(focused, row)),
            Span::styled(format!(" ({score})"), Style::default().fg(Color::Yellow)),
        ]));
        if open {
            let items = utterances.map(split_utterances).unwrap_or_default();
            if items.is_empty() {
                lines.push(Line::from(Span::styled(
                    "    (no utterances)",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            for u in items {
                lines.push(Line::from(Span::styled(
                    format!("    {u}"),
                    Style::default().fg(Color::Gray),
                )));
            }
        }
    }

    fn keep_cursor_visible(&mut self, row_starts: &[usize], total: u16) {
        let viewport = self.last_viewport_h.max(1);
        let max_scroll = total.saturating_sub(viewport);
        if let Some(&start) = row_starts.get(self.cursor) {
            let start = start as u16;
            if start < self.scroll_y {
                self.scroll_y = start;
            } else if start >= self.scroll_y + viewport {
                self.scroll_y = start + 1 - viewport;
            }
        }
        if self.scroll_y > max_scroll {
            self.scroll_y = max_scroll;
        }
    }

    #[cfg(test)]
    fn body_text(&self) -> Vec<String> {
        self.body_lines(false)
            .0
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }
}

impl crate::widgets::Widget for ResultsWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64) {
        let (lines, row_starts) = self.body_lines(focused);
        self.last_viewport_h = area.height.saturating_sub(2);
        let total = lines.len() as u16;
        self.keep_cursor_visible(&row_starts, total);
        let title = match &self.state {
            ResultState::Loading => format!("{} {}", self.title, spinner_glyph(tick)),
            ResultState::Loaded(_) => format!("{} ({})", self.title, self.match_rows()),
            _ => self.title.clone(),
        };
        let p = Paragraph::new(lines)
            .block(panel_block(&title, focused, &self.theme))
            .wrap(ratatui::widgets::Wrap { trim: false })
            .scroll((self.scroll_y, 0));
        f.render_widget(p, area);
    }

    fn on_key(&mut self, key: KeyCode) -> Vec<crate::app::Effect> {
        let rows = self.match_rows();
        match key {
            KeyCode::Up => {
                self.cursor = self.cursor.saturating_sub(1);
                if rows == 0 && self.scroll_y > 0 {
                    self.scroll_y -= 1;
                }
            }
            KeyCode::Down => {
                if rows > 0 {
                    self.cursor = (self.cursor + 1).min(rows - 1);
                } else {
                    self.scroll_y = self.scroll_y.saturating_add(1);
                }
            }
            KeyCode::PageUp => {
                self.scroll_y = self.scroll_y.saturating_sub(self.last_viewport_h);
            }
            KeyCode::PageDown => {
                self.scroll_y = self.scroll_y.saturating_add(self.last_viewport_h);
            }
            KeyCode::Home => {
                self.cursor = 0;
                self.scroll_y = 0;
            }
            KeyCode::End => {
                if rows > 0 {
                    self.cursor = rows - 1;
                }
            }
            KeyCode::Enter | KeyCode::Right => {
                if self.expandable() && rows > 0 && !self.expanded.remove(&self.cursor) {
                    self.expanded.insert(self.cursor);
                }
            }
            KeyCode::Left => {
                if self.expandable() {
                    self.expanded.remove(&self.cursor);
                }
            }
            _ => {}
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::Widget;
    use serde_json::json;

    fn question_response() -> SearchResponse {
        serde_json::from_value(json!({
            "embeddingTime": "12 ms",
            "searchTime": "40 ms",
            "query": "what wires together",
            "ragAnswer": "Cells that fire together wire together.",
            "cachedQuery": "what fires together",
            "cachedScore": 0.97,
            "matchedQuestions": [
                {"question": "What wires together?", "score": 0.9172,
                 "utterances": "line one\nline two"},
                {"question": "Second?", "score": "0.5", "utterances": ""}
            ]
        }))
        .unwrap()
    }

    fn widget(dest: Destination) -> ResultsWidget {
        ResultsWidget::new("p", "Pane", dest, Theme::default())
    }

    #[test]
    fn idle_and_loading_and_failed_bodies() {
        let mut w = widget(Destination::Utterances);
        assert_eq!(w.body_text(), vec![IDLE_HINT]);
        w.set_loading();
        assert_eq!(w.body_text(), vec![SEARCHING]);
        w.set_outcome(Err("HTTP 502".to_string()));
        assert_eq!(w.body_text(), vec![FAILED.to_string(), "HTTP 502".to_string()]);
    }

    #[test]
    fn question_pane_renders_echo_rag_cache_and_footer() {
        let mut w = widget(Destination::Questions);
        w.set_outcome(Ok(question_response()));
        let body = w.body_text();
        assert_eq!(body[0], "Q: what wires together");
        assert_eq!(body[1], "A: Cells that fire together wire together.");
        assert_eq!(body[2], "cache hit: what fires together (0.97)");
        assert_eq!(body[3], "Matched Questions (2)");
        assert_eq!(body[4], "▸ What wires together? (0.92)");
        assert_eq!(body[5], "▸ Second? (0.50)");
        assert_eq!(body.last().unwrap(), "embedding 12 ms | search 40 ms");
    }

    #[test]
    fn expanding_a_match_reveals_utterances() {
        let mut w = widget(Destination::Questions);
        w.set_outcome(Ok(question_response()));
        w.on_key(KeyCode::Enter);
        let body = w.body_text();
        assert_eq!(body[4], "▾ What wires together? (0.92)");
        assert_eq!(body[5], "    line one");
        assert_eq!(body[6], "    line two");
        // Second press folds it back.
        w.on_key(KeyCode::Enter);
        assert_eq!(w.body_text()[4], "▸ What wires together? (0.92)");
    }

    #[test]
    fn expand_on_empty_utterances_shows_placeholder() {
        let mut w = widget(Destination::Questions);
        w.set_outcome(Ok(question_response()));
        w.on_key(KeyCode::Down);
        w.on_key(KeyCode::Right);
        let body = w.body_text();
        assert_eq!(body[5], "▾ Second? (0.50)");
        assert_eq!(body[6], "    (no utterances)");
    }

    #[test]
    fn text_pane_renders_score_prefixed_rows() {
        let mut w = widget(Destination::Utterances);
        w.set_outcome(Ok(serde_json::from_value(json!({
            "matchedTexts": [{"utterance": "hello world", "score": 0.9235}]
        }))
        .unwrap()));
        let body = w.body_text();
        assert_eq!(body[0], "Matched Texts (1)");
        assert_eq!(body[1], " 0.92  hello world");
    }

    #[test]
    fn empty_image_response_names_the_absence() {
        let mut w = widget(Destination::ImagesByImage);
        w.set_outcome(Ok(SearchResponse::default()));
        let body = w.body_text();
        assert_eq!(body[0], "Matched Images (0)");
        assert_eq!(body[1], NO_IMAGES);
    }

    #[test]
    fn image_rows_carry_path_and_description() {
        let mut w = widget(Destination::ImagesByDescription);
        w.set_outcome(Ok(serde_json::from_value(json!({
            "query": "sunset",
            "matchedPhotographs": [
                {"imagePath": "/img/1.jpg", "score": 0.81, "description": "a red sky"}
            ]
        }))
        .unwrap()));
        let body = w.body_text();
        assert_eq!(body[0], "Q: sunset");
        assert_eq!(body[1], "Matched Images (1)");
        assert_eq!(body[2], " 0.81  /img/1.jpg");
        assert_eq!(body[3], "       a red sky");
    }

    #[test]
    fn cursor_clamps_to_match_rows() {
        let mut w = widget(Destination::Questions);
        w.set_outcome(Ok(question_response()));
        w.on_key(KeyCode::Down);
        w.on_key(KeyCode::Down);
        w.on_key(KeyCode::Down);
        assert_eq!(w.cursor, 1);
        w.on_key(KeyCode::Up);
        w.on_key(KeyCode::Up);
        w.on_key(KeyCode::Up);
        assert_eq!(w.cursor, 0);
    }
}
