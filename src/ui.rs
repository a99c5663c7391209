use crate::app::{update, AppMsg, Effect};
use crate::model::{DashboardConfig, PanelKind};
use crate::services::http::Backend;
use crate::services::loader::{spawn_bloom_check, spawn_fetch_keys, spawn_fetch_value, KeySizeMap};
use crate::services::search::{self, SearchBatch, SearchJob};
use crate::services::store::PanelStateStore;
use crate::sketch_core::registry::PanelRegistry;
use crate::sketch_core::visibility::VisibilityController;
use crate::theme::{Theme, ThemeMode};
use crate::widgets::chrome::panel_block;
use crate::widgets::header::draw_header;
use crate::widgets::results::ResultsWidget;
use crate::widgets::search_form::SearchFormWidget;
use crate::widgets::selector::SelectorWidget;
use crate::widgets::spinner_glyph;
use crate::widgets::status_bar::draw_footer;
use crate::widgets::textarea_key;
use crate::widgets::toggle_bar::{draw_toggle_bar, index_for_digit, ToggleChip};
use crate::widgets::value_view::ValueViewWidget;
use crate::widgets::Widget;
use anyhow::{Context, Result};
use base64::Engine;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use tui_textarea::TextArea;

// Everything a worker thread can hand back to the event loop.
pub enum LoadOutcome {
    Keys(KeySizeMap),
    Value(JsonValue),
    BloomChecked { item: String, exists: bool },
    Search(SearchBatch),
}

pub struct LoadMsg {
    pub key: String,
    pub outcome: Result<LoadOutcome, String>,
    pub kind: LoadKind,
}

#[derive(Clone, Copy)]
pub enum LoadKind {
    Keys,
    Value,
    Bloom,
    Search,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at_tick: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Board,
    Search,
}

/// One focusable region on the board, in left-to-right, top-to-bottom order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardSlot {
    Selector(String),
    Value(String),
    BloomInput,
}

const MAX_LOG_LINES: usize = 200;
const DEBUG_H: u16 = 4;

pub struct AppState {
    pub registry: PanelRegistry,
    pub visibility: VisibilityController,
    /// Key pickers, by source id.
    pub selectors: HashMap<String, SelectorWidget>,
    /// Value panes, by source id.
    pub values: HashMap<String, ValueViewWidget>,
    /// Result panes, by search panel id.
    pub results: HashMap<String, ResultsWidget>,
    pub search_form: SearchFormWidget,
    pub bloom_input: TextArea<'static>,
    pub bloom_verdict: Option<String>,
    pub loading: HashSet<String>,
    pub status_text: Option<String>,
    pub toast: Option<Toast>,
    pub view: View,
    pub board_focus: usize,
    /// 0 is the form; 1.. are the visible result panes.
    pub search_focus: usize,
    pub show_help: bool,
    pub show_debug: bool,
    pub header_title: String,
    pub base_url: String,
    pub theme: Theme,
    pub tick: u64,
    pub tx: Option<Sender<LoadMsg>>,
    pub rx: Option<Receiver<LoadMsg>>,
    pub backend: Option<Backend>,
    pub debug_log: VecDeque<String>,
}

impl AppState {
    pub fn new(cfg: DashboardConfig, store: PanelStateStore) -> Self {
        let mode = match cfg.theme.as_deref() {
            Some("light") | Some("paper") => ThemeMode::Light,
            _ => ThemeMode::Dark,
        };
        let theme = Theme::from_mode(mode);
        let registry = PanelRegistry::from_config(&cfg);
        let visibility = VisibilityController::new(store);
        let mut selectors = HashMap::new();
        let mut values = HashMap::new();
        for p in registry.sketch_panels() {
            for s in p.sources() {
                selectors.insert(
                    s.id.clone(),
                    SelectorWidget::new(
                        s.id.clone(),
                        s.title.clone(),
                        s.data_type.clone(),
                        theme.clone(),
                    ),
                );
                values.insert(s.id.clone(), ValueViewWidget::new("Data", theme.clone()));
            }
        }
        let mut results = HashMap::new();
        for p in registry.search_panels() {
            if let Some(dest) = p.destination() {
                results.insert(
                    p.id.clone(),
                    ResultsWidget::new(p.id.clone(), p.label.clone(), dest, theme.clone()),
                );
            }
        }
        let mut bloom_input = TextArea::default();
        bloom_input.set_placeholder_text("Item to check");
        Self {
            registry,
            visibility,
            selectors,
            values,
            results,
            search_form: SearchFormWidget::new(theme.clone()),
            bloom_input,
            bloom_verdict: None,
            loading: HashSet::new(),
            status_text: None,
            toast: None,
            view: View::Board,
            board_focus: 0,
            search_focus: 0,
            show_help: false,
            show_debug: false,
            header_title: cfg.header.clone().unwrap_or_else(|| "SKETCH TUI".to_string()),
            base_url: cfg.base_url.clone(),
            theme,
            tick: 0,
            tx: None,
            rx: None,
            backend: None,
            debug_log: VecDeque::new(),
        }
    }

    pub fn dbg(&mut self, s: impl Into<String>) {
        if self.debug_log.len() >= MAX_LOG_LINES {
            self.debug_log.pop_front();
        }
        self.debug_log.push_back(s.into());
    }

    /// Seed every panel's visibility state and schedule the first key
    /// refresh for the sketch panels that came up visible.
    pub fn initial_effects(&mut self) -> Vec<Effect> {
        let specs: Vec<(String, Option<bool>, bool)> = self
            .registry
            .panels()
            .iter()
            .map(|p| {
                // At startup the render probe is the default layout.
                let probe = if p.has_region() {
                    Some(p.default_visible)
                } else {
                    None
                };
                (p.id.clone(), probe, matches!(p.kind, PanelKind::Sketch { .. }))
            })
            .collect();
        let mut effects = Vec::new();
        for (id, probe, is_sketch) in specs {
            let visible = self.visibility.init_panel(&id, probe);
            if let Some(e) = self.visibility.take_error() {
                self.dbg(format!("state store: {e}"));
            }
            if visible && is_sketch {
                effects.push(Effect::RefreshPanel { panel_id: id });
            }
        }
        effects
    }

    /// Focusable board regions for the currently visible sketch panels.
    pub fn board_slots(&self) -> Vec<BoardSlot> {
        let mut slots = Vec::new();
        for p in self.registry.sketch_panels() {
            if !self.visibility.is_visible(&p.id) {
                continue;
            }
            for s in p.sources() {
                slots.push(BoardSlot::Selector(s.id.clone()));
                slots.push(BoardSlot::Value(s.id.clone()));
            }
            if matches!(
                p.kind,
                PanelKind::Sketch {
                    bloom_check: true,
                    ..
                }
            ) {
                slots.push(BoardSlot::BloomInput);
            }
        }
        slots
    }

    pub fn visible_search_panels(&self) -> Vec<String> {
        self.registry
            .search_panels()
            .filter(|p| self.visibility.is_visible(&p.id))
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn cycle_focus(&mut self, dir: isize) {
        match self.view {
            View::Board => {
                let n = self.board_slots().len();
                if n == 0 {
                    return;
                }
                let cur = self.board_focus.min(n - 1) as isize;
                self.board_focus = (cur + dir).rem_euclid(n as isize) as usize;
            }
            View::Search => {
                let n = 1 + self.visible_search_panels().len();
                let cur = self.search_focus.min(n - 1) as isize;
                self.search_focus = (cur + dir).rem_euclid(n as isize) as usize;
            }
        }
    }

    /// Whether the focused region is a text box that should capture
    /// printable keys.
    pub fn text_input_focused(&self) -> bool {
        match self.view {
            View::Search => self.search_focus == 0,
            View::Board => matches!(
                self.board_slots().get(self.board_focus),
                Some(BoardSlot::BloomInput)
            ),
        }
    }

    /// Move focus out of a text box; false when there is nowhere to go.
    fn blur_input(&mut self) -> bool {
        match self.view {
            View::Search => {
                if self.visible_search_panels().is_empty() {
                    false
                } else {
                    self.search_focus = 1;
                    true
                }
            }
            View::Board => {
                let slots = self.board_slots();
                match slots
                    .iter()
                    .position(|s| !matches!(s, BoardSlot::BloomInput))
                {
                    Some(i) => {
                        self.board_focus = i;
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Short name of the focused region for the footer.
    pub fn focus_label(&self) -> Option<String> {
        match self.view {
            View::Board => {
                let slots = self.board_slots();
                let i = self.board_focus.min(slots.len().saturating_sub(1));
                match slots.get(i)? {
                    BoardSlot::Selector(sid) => self.selectors.get(sid).map(|s| s.title.clone()),
                    BoardSlot::Value(sid) => self.values.get(sid).map(|v| v.title.clone()),
                    BoardSlot::BloomInput => Some("membership check".to_string()),
                }
            }
            View::Search => {
                if self.search_focus == 0 {
                    return Some("query form".to_string());
                }
                let ids = self.visible_search_panels();
                let id = ids.get(self.search_focus - 1)?;
                self.results.get(id).map(|r| r.title.clone())
            }
        }
    }

    /// Keep focus indices inside the current slot counts; toggling a panel
    /// off can orphan them.
    fn clamp_focus(&mut self) {
        let n = self.board_slots().len();
        if n > 0 && self.board_focus >= n {
            self.board_focus = n - 1;
        }
        let m = 1 + self.visible_search_panels().len();
        if self.search_focus >= m {
            self.search_focus = m - 1;
        }
    }

    fn expire_toast(&mut self) {
        if let Some(t) = &self.toast {
            if self.tick >= t.expires_at_tick {
                self.toast = None;
            }
        }
    }
}

pub(crate) fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    for eff in effects {
        match eff {
            Effect::RefreshPanel { panel_id } => {
                let follow: Vec<Effect> = state
                    .registry
                    .get(&panel_id)
                    .map(|p| {
                        p.sources()
                            .iter()
                            .map(|s| Effect::FetchKeys {
                                source_id: s.id.clone(),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                run_effects(state, follow);
            }
            Effect::FetchKeys { source_id } => {
                let Some((_, src)) = state.registry.source(&source_id) else {
                    state.dbg(format!("fetch keys: unknown source {source_id}"));
                    continue;
                };
                let pattern = src.pattern.clone();
                if state.loading.contains(&source_id) {
                    continue;
                }
                state.dbg(format!("fetch keys {source_id} ({pattern})"));
                state.loading.insert(source_id.clone());
                if let Some(sel) = state.selectors.get_mut(&source_id) {
                    sel.loading = true;
                }
                if let (Some(tx), Some(backend)) = (&state.tx, &state.backend) {
                    spawn_fetch_keys(backend.clone(), source_id, pattern, tx.clone());
                }
            }
            Effect::FetchValue {
                source_id,
                key,
                data_type,
            } => {
                state.dbg(format!("fetch value {source_id}: {key}"));
                state.loading.insert(source_id.clone());
                if let Some(view) = state.values.get_mut(&source_id) {
                    view.loading = true;
                    view.title = key.clone();
                }
                if let (Some(tx), Some(backend)) = (&state.tx, &state.backend) {
                    spawn_fetch_value(backend.clone(), source_id, key, data_type, tx.clone());
                }
            }
            Effect::BloomCheck {
                panel_id,
                key,
                item,
            } => {
                state.dbg(format!("bloom check {key}: {item}"));
                state.loading.insert(panel_id.clone());
                state.bloom_verdict = None;
                if let (Some(tx), Some(backend)) = (&state.tx, &state.backend) {
                    spawn_bloom_check(backend.clone(), panel_id, key, item, tx.clone());
                }
            }
            Effect::SubmitSearch { query, image_path } => {
                submit_search(state, query, image_path);
            }
            Effect::ShowToast {
                text,
                level,
                seconds,
            } => {
                let ticks = seconds.saturating_mul(5);
                state.toast = Some(Toast {
                    text,
                    level,
                    expires_at_tick: state.tick.saturating_add(ticks),
                });
            }
        }
    }
}

fn submit_search(state: &mut AppState, query: String, image_path: Option<String>) {
    if query.is_empty() {
        run_effects(
            state,
            vec![Effect::ShowToast {
                text: "Type a query first.".to_string(),
                level: ToastLevel::Info,
                seconds: 2,
            }],
        );
        return;
    }
    let image_base64 = match image_path {
        None => None,
        Some(p) => match fs::read(&p) {
            Ok(bytes) => Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
            Err(e) => {
                state.dbg(format!("image read {p}: {e}"));
                run_effects(
                    state,
                    vec![Effect::ShowToast {
                        text: format!("Cannot read image {p}: {e}"),
                        level: ToastLevel::Error,
                        seconds: 3,
                    }],
                );
                return;
            }
        },
    };
    let job = SearchJob {
        query,
        image_base64,
        enable_rag: state.visibility.is_visible(search::FLAG_RAG),
        enable_cache: state.visibility.is_visible(search::FLAG_CACHE),
    };
    let plan = search::plan(&state.registry, &state.visibility, &job);
    if plan.is_empty() {
        run_effects(
            state,
            vec![Effect::ShowToast {
                text: "No search destinations are visible.".to_string(),
                level: ToastLevel::Info,
                seconds: 2,
            }],
        );
        return;
    }
    state.dbg(format!("dispatch {} destination(s)", plan.len()));
    for req in &plan {
        if let Some(pane) = state.results.get_mut(&req.panel_id) {
            pane.set_loading();
        }
    }
    state.status_text = Some("Searching...".to_string());
    state.loading.insert("search".to_string());
    if let (Some(tx), Some(backend)) = (&state.tx, &state.backend) {
        search::spawn_search(backend.clone(), plan, tx.clone());
    }
}

pub fn run() -> Result<()> {
    let cfg = load_config()?;
    let backend = Backend::from_config(&cfg)?;
    let mut state = AppState::new(cfg, PanelStateStore::open());
    state.base_url = backend.base_url().to_string();
    state.backend = Some(backend);
    let (tx, rx) = mpsc::channel::<LoadMsg>();
    state.tx = Some(tx);
    state.rx = Some(rx);

    let headless = env_flag("SKETCH_TUI_HEADLESS");
    let headless_ticks: u64 = std::env::var("SKETCH_TUI_TICKS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10);
    let summary_wanted = env_flag("SKETCH_TUI_SMOKE_SUMMARY");
    if headless {
        let backend = ratatui::backend::TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend)?;
        let tick_rate = Duration::from_millis(200);
        let mut booted = false;
        for _ in 0..headless_ticks {
            if !booted {
                let effs = state.initial_effects();
                run_effects(&mut state, effs);
                booted = true;
            }
            terminal.draw(|f| ui(f, &mut state))?;
            drain_loader(&mut state);
            state.tick = state.tick.wrapping_add(1);
            std::thread::sleep(tick_rate);
        }
        if summary_wanted {
            println!("{}", smoke_summary(&state));
        }
        return Ok(());
    }

    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("entering alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();
    let mut booted = false;
    let res = loop {
        if !booted {
            let effs = state.initial_effects();
            run_effects(&mut state, effs);
            booted = true;
        }
        terminal.draw(|f| ui(f, &mut state))?;
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if handle_key(&mut state, key.code) {
                    break Ok(());
                }
            }
        }
        drain_loader(&mut state);
        if last_tick.elapsed() >= tick_rate {
            state.tick = state.tick.wrapping_add(1);
            last_tick = Instant::now();
        }
    };
    disable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    res
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

fn smoke_summary(state: &AppState) -> String {
    let populated = state
        .selectors
        .values()
        .filter(|s| s.rows().iter().any(|r| r.key.is_some()))
        .count();
    let errors = state.selectors.values().filter(|s| s.has_error()).count();
    let visible = state
        .registry
        .panels()
        .iter()
        .filter(|p| state.visibility.is_visible(&p.id))
        .count();
    let view = match state.view {
        View::Board => "board",
        View::Search => "search",
    };
    serde_json::json!({
        "ok": errors == 0,
        "view": view,
        "visible_panels": visible,
        "populated_selectors": populated,
        "pending": state.loading.len(),
    })
    .to_string()
}

/// Pump worker results into the reducer. Duplicates the reducer's
/// `loading` bookkeeping for kinds the reducer doesn't track (search).
fn drain_loader(state: &mut AppState) {
    let mut drained: Vec<LoadMsg> = Vec::new();
    if let Some(rx) = &state.rx {
        while let Ok(msg) = rx.try_recv() {
            drained.push(msg);
        }
    }
    for msg in drained {
        state.loading.remove(&msg.key);
        let key = msg.key;
        let outcome = msg.outcome;
        let effects = match msg.kind {
            LoadKind::Keys => update(
                state,
                AppMsg::LoadedKeys {
                    source_id: key,
                    outcome,
                },
            ),
            LoadKind::Value => update(
                state,
                AppMsg::LoadedValue {
                    source_id: key,
                    outcome,
                },
            ),
            LoadKind::Bloom => update(
                state,
                AppMsg::LoadedBloom {
                    panel_id: key,
                    outcome,
                },
            ),
            LoadKind::Search => update(state, AppMsg::SearchDone { outcome }),
        };
        run_effects(state, effects);
    }
}

/// Returns true when the app should quit.
pub(crate) fn handle_key(state: &mut AppState, code: KeyCode) -> bool {
    if state.show_help {
        state.show_help = false;
        return false;
    }
    let typing = state.text_input_focused();
    match code {
        KeyCode::F(1) => state.view = View::Board,
        KeyCode::F(2) => state.view = View::Search,
        KeyCode::F(12) => state.show_debug = !state.show_debug,
        KeyCode::Tab => state.cycle_focus(1),
        KeyCode::BackTab => state.cycle_focus(-1),
        KeyCode::Esc => {
            if !typing || !state.blur_input() {
                return true;
            }
        }
        KeyCode::Char('q') if !typing => return true,
        KeyCode::Char('?') if !typing => state.show_help = true,
        KeyCode::Char('y') if !typing => copy_focused(state),
        KeyCode::Char('r') if !typing => refresh_visible(state),
        KeyCode::Char(c) if !typing && index_for_digit(c).is_some() => {
            if let Some(n) = index_for_digit(c) {
                if let Some(p) = state.registry.panels().get(n - 1) {
                    let panel_id = p.id.clone();
                    let effs = update(state, AppMsg::TogglePanel { panel_id });
                    run_effects(state, effs);
                }
            }
        }
        other => forward_key(state, other),
    }
    false
}

/// Route a key to whichever widget holds focus and execute its effects.
fn forward_key(state: &mut AppState, code: KeyCode) {
    let effs: Vec<Effect> = match state.view {
        View::Search => {
            if state.search_focus == 0 {
                state.search_form.on_key(code)
            } else {
                let ids = state.visible_search_panels();
                match ids.get(state.search_focus - 1) {
                    Some(id) => state
                        .results
                        .get_mut(id)
                        .map(|p| p.on_key(code))
                        .unwrap_or_default(),
                    None => Vec::new(),
                }
            }
        }
        View::Board => {
            let slots = state.board_slots();
            let i = state.board_focus.min(slots.len().saturating_sub(1));
            match slots.get(i) {
                Some(BoardSlot::Selector(sid)) => state
                    .selectors
                    .get_mut(sid)
                    .map(|w| w.on_key(code))
                    .unwrap_or_default(),
                Some(BoardSlot::Value(sid)) => state
                    .values
                    .get_mut(sid)
                    .map(|w| w.on_key(code))
                    .unwrap_or_default(),
                Some(BoardSlot::BloomInput) => bloom_input_key(state, code),
                None => Vec::new(),
            }
        }
    };
    run_effects(state, effs);
}

/// Membership check input. Enter runs the check against the selected
/// filter key; everything else types.
fn bloom_input_key(state: &mut AppState, code: KeyCode) -> Vec<Effect> {
    match code {
        KeyCode::Enter => {
            let Some(panel) = state.registry.bloom_check_panel() else {
                return Vec::new();
            };
            let panel_id = panel.id.clone();
            let filter_source = panel.sources().first().map(|s| s.id.clone());
            let key = filter_source
                .and_then(|sid| state.selectors.get(&sid))
                .and_then(|s| s.selected_key().map(str::to_string));
            let Some(key) = key else {
                state.bloom_verdict = Some("Select a bloom filter key first.".to_string());
                return Vec::new();
            };
            let item = state.bloom_input.lines().join("\n").trim().to_string();
            if item.is_empty() {
                state.bloom_verdict = Some("Type an item to check.".to_string());
                return Vec::new();
            }
            vec![Effect::BloomCheck {
                panel_id,
                key,
                item,
            }]
        }
        other => {
            if let Some(ev) = textarea_key(other) {
                let _ = state.bloom_input.input(ev);
            }
            Vec::new()
        }
    }
}

fn copy_focused(state: &mut AppState) {
    let text: Option<String> = match state.view {
        View::Board => {
            let slots = state.board_slots();
            match slots.get(state.board_focus) {
                Some(BoardSlot::Value(sid)) => {
                    state.values.get(sid).and_then(|v| v.raw_text())
                }
                _ => None,
            }
        }
        View::Search => {
            if state.search_focus == 0 {
                None
            } else {
                let ids = state.visible_search_panels();
                ids.get(state.search_focus - 1)
                    .and_then(|id| state.results.get(id))
                    .and_then(|p| p.raw_text())
            }
        }
    };
    let Some(text) = text else {
        run_effects(
            state,
            vec![Effect::ShowToast {
                text: "Nothing to copy here.".to_string(),
                level: ToastLevel::Info,
                seconds: 2,
            }],
        );
        return;
    };
    match arboard::Clipboard::new() {
        Ok(mut clipboard) => {
            let _ = clipboard.set_text(&text);
            run_effects(
                state,
                vec![Effect::ShowToast {
                    text: "Copied to clipboard".to_string(),
                    level: ToastLevel::Success,
                    seconds: 2,
                }],
            );
        }
        Err(e) => {
            state.dbg(format!("clipboard: {e}"));
            run_effects(
                state,
                vec![Effect::ShowToast {
                    text: "Clipboard unavailable".to_string(),
                    level: ToastLevel::Error,
                    seconds: 2,
                }],
            );
        }
    }
}

fn refresh_visible(state: &mut AppState) {
    let effs: Vec<Effect> = state
        .registry
        .sketch_panels()
        .filter(|p| state.visibility.is_visible(&p.id))
        .map(|p| Effect::RefreshPanel {
            panel_id: p.id.clone(),
        })
        .collect();
    run_effects(state, effs);
}

fn config_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("SKETCH_TUI_CONFIG_DIR") {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir).join("sketch-tui.yaml"));
        }
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let local = cwd.join("sketch-tui.yaml");
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir().map(|d| d.join("sketch-tui").join("sketch-tui.yaml"))
}

pub(crate) fn read_config_file(path: &Path) -> Result<DashboardConfig> {
    let s = fs::read_to_string(path).with_context(|| format!("reading config: {path:?}"))?;
    let cfg: DashboardConfig =
        serde_yaml::from_str(&s).with_context(|| format!("parsing config: {path:?}"))?;
    if let Err(e) = crate::model::validate_dashboard_config(&cfg) {
        anyhow::bail!("invalid config {path:?}: {e}");
    }
    Ok(cfg)
}

/// A missing config file means defaults; a present but broken one is a
/// startup error.
fn load_config() -> Result<DashboardConfig> {
    match config_path() {
        Some(p) if p.exists() => read_config_file(&p),
        _ => Ok(DashboardConfig::default()),
    }
}

fn ui(f: &mut Frame, state: &mut AppState) {
    state.expire_toast();
    state.clamp_focus();

    let screen = f.area();
    f.render_widget(Block::default().style(state.theme.base_style()), screen);

    let mut constraints = vec![
        Constraint::Length(3),
        Constraint::Length(2),
        Constraint::Min(0),
    ];
    if state.show_debug {
        constraints.push(Constraint::Length(DEBUG_H));
    }
    constraints.push(Constraint::Length(1));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(screen);

    draw_header(f, chunks[0], state);
    let chips = toggle_chips(state);
    draw_toggle_bar(f, chunks[1], &chips, &state.theme);
    match state.view {
        View::Board => draw_board(f, chunks[2], state),
        View::Search => draw_search(f, chunks[2], state),
    }
    let mut idx = 3;
    if state.show_debug {
        draw_debug(f, chunks[idx], state);
        idx += 1;
    }
    let help_text = match state.view {
        View::Board => "tab focus  enter fetch  1-9/0 toggle  r refresh  y copy  F2 search  ? help  q quit",
        View::Search => "tab focus  enter submit/expand  1-9/0 toggle  y copy  F1 board  ? help  q quit",
    };
    draw_footer(f, chunks[idx], state, help_text);
    if state.show_help {
        draw_help(f, screen, state);
    }
}

fn toggle_chips(state: &AppState) -> Vec<ToggleChip> {
    state
        .registry
        .panels()
        .iter()
        .enumerate()
        .map(|(i, p)| ToggleChip {
            index: i + 1,
            label: p.label.clone(),
            visible: state.visibility.is_visible(&p.id),
        })
        .collect()
}

fn draw_board(f: &mut Frame, area: Rect, state: &mut AppState) {
    // (panel id, source ids, has bloom input) per visible column.
    let plans: Vec<(String, Vec<String>, bool)> = state
        .registry
        .sketch_panels()
        .filter(|p| state.visibility.is_visible(&p.id))
        .map(|p| {
            (
                p.id.clone(),
                p.sources().iter().map(|s| s.id.clone()).collect(),
                matches!(
                    p.kind,
                    PanelKind::Sketch {
                        bloom_check: true,
                        ..
                    }
                ),
            )
        })
        .collect();
    if plans.is_empty() {
        let p = Paragraph::new("All board panels are hidden. Press a digit to bring one back.")
            .style(state.theme.text_muted())
            .block(panel_block("Board", false, &state.theme));
        f.render_widget(p, area);
        return;
    }
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Ratio(1, plans.len() as u32);
            plans.len()
        ])
        .split(area);
    let focus = {
        let n = state.board_slots().len();
        state.board_focus.min(n.saturating_sub(1))
    };
    let mut slot_idx = 0usize;
    for (ci, (panel_id, source_ids, bloom)) in plans.iter().enumerate() {
        let mut constraints: Vec<Constraint> = Vec::new();
        let denom = (source_ids.len().max(1) * 5) as u32;
        for _ in source_ids {
            constraints.push(Constraint::Ratio(2, denom));
            constraints.push(Constraint::Ratio(3, denom));
        }
        if *bloom {
            constraints.push(Constraint::Length(3));
            constraints.push(Constraint::Length(1));
        }
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(cols[ci]);
        let mut ri = 0usize;
        for sid in source_ids {
            if let Some(w) = state.selectors.get_mut(sid) {
                w.render(f, rows[ri], slot_idx == focus, state.tick);
            }
            ri += 1;
            slot_idx += 1;
            if let Some(w) = state.values.get_mut(sid) {
                w.render(f, rows[ri], slot_idx == focus, state.tick);
            }
            ri += 1;
            slot_idx += 1;
        }
        if *bloom {
            let focused = slot_idx == focus;
            state
                .bloom_input
                .set_block(panel_block("Membership check", focused, &state.theme));
            state.bloom_input.set_cursor_style(if focused {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            });
            state.bloom_input.set_cursor_line_style(Style::default());
            f.render_widget(&state.bloom_input, rows[ri]);
            ri += 1;
            slot_idx += 1;
            f.render_widget(Paragraph::new(verdict_line(state, panel_id)), rows[ri]);
        }
    }
}

fn verdict_line(state: &AppState, panel_id: &str) -> Line<'static> {
    match &state.bloom_verdict {
        Some(v) if v.contains("might exist") => {
            Line::from(Span::styled(v.clone(), Style::default().fg(Color::Yellow)))
        }
        Some(v) if v.contains("definitely not") => {
            Line::from(Span::styled(v.clone(), state.theme.text_success()))
        }
        Some(v) => Line::from(Span::styled(v.clone(), state.theme.text_muted())),
        None if state.loading.contains(panel_id) => Line::from(Span::raw(format!(
            " {} checking...",
            spinner_glyph(state.tick)
        ))),
        None => Line::from(Span::styled(
            "Enter an item to test membership.".to_string(),
            state.theme.text_muted(),
        )),
    }
}

fn draw_search(f: &mut Frame, area: Rect, state: &mut AppState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(26), Constraint::Percentage(74)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(0)])
        .split(cols[0]);
    let form_focused = state.search_focus == 0;
    state.search_form.render(f, left[0], form_focused, state.tick);
    draw_flag_summary(f, left[1], state);

    let panes = state.visible_search_panels();
    if panes.is_empty() {
        let p = Paragraph::new("All result panes are hidden. Press a digit to bring one back.")
            .style(state.theme.text_muted())
            .block(panel_block("Results", false, &state.theme));
        f.render_widget(p, cols[1]);
        return;
    }
    let pane_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, panes.len() as u32); panes.len()])
        .split(cols[1]);
    for (i, id) in panes.iter().enumerate() {
        let focused = state.search_focus == i + 1;
        if let Some(w) = state.results.get_mut(id) {
            w.render(f, pane_cols[i], focused, state.tick);
        }
    }
}

/// Dispatch switches echoed next to the form, since they change what a
/// submit sends.
fn draw_flag_summary(f: &mut Frame, area: Rect, state: &AppState) {
    let mut lines: Vec<Line> = Vec::new();
    for p in state.registry.panels().iter().filter(|p| !p.has_region()) {
        let on = state.visibility.is_visible(&p.id);
        let (mark, style) = if on {
            ("●", state.theme.text_success())
        } else {
            ("○", state.theme.text_muted())
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{mark} "), style),
            Span::raw(p.label.clone()),
            Span::styled(
                if on { "  on" } else { "  off" }.to_string(),
                state.theme.text_muted(),
            ),
        ]));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "No flags defined.".to_string(),
            state.theme.text_muted(),
        )));
    }
    let p = Paragraph::new(lines).block(panel_block("Flags", false, &state.theme));
    f.render_widget(p, area);
}

fn draw_debug(f: &mut Frame, area: Rect, state: &AppState) {
    let b = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            "Debug",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        ));
    let h = area.height as usize;
    let start = state.debug_log.len().saturating_sub(h);
    let lines: Vec<Line> = state
        .debug_log
        .iter()
        .skip(start)
        .map(|s| Line::raw(s.clone()))
        .collect();
    let p = Paragraph::new(lines)
        .style(Style::default().fg(Color::Gray))
        .block(b)
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

fn draw_help(f: &mut Frame, screen: Rect, state: &AppState) {
    let rect = centered_rect(54, 62, screen);
    f.render_widget(Clear, rect);
    let rows = [
        ("F1 / F2", "board / search view"),
        ("Tab / Shift-Tab", "cycle widget focus"),
        ("1-9, 0", "toggle panel visibility"),
        ("Enter", "fetch value / run check / submit / expand"),
        ("Up / Down", "move cursor, switch form field"),
        ("y", "copy focused pane as JSON"),
        ("r", "re-fetch visible key sets"),
        ("j / w", "raw JSON / wrap in a value pane"),
        ("F12", "debug pane"),
        ("q / Esc", "quit (Esc leaves a text box first)"),
    ];
    let mut lines: Vec<Line> = vec![Line::default()];
    for (k, d) in rows {
        lines.push(Line::from(vec![
            Span::styled(format!("  {k:<16}"), state.theme.text_active_bold()),
            Span::raw(d.to_string()),
        ]));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "  press any key to close",
        state.theme.text_muted(),
    )));
    let p = Paragraph::new(lines)
        .style(state.theme.base_style())
        .block(panel_block("Keys", true, &state.theme));
    f.render_widget(p, rect);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let h = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(v[1]);
    h[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::loader::normalize_key_map;
    use serde_json::json;

    fn fresh_state(dir: &tempfile::TempDir) -> AppState {
        let store = PanelStateStore::at_path(dir.path().join("state.json"));
        let mut st = AppState::new(DashboardConfig::default(), store);
        let effs = st.initial_effects();
        run_effects(&mut st, effs);
        st
    }

    #[test]
    fn board_slots_follow_panel_visibility() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = fresh_state(&dir);
        // Three columns of two sources each, plus the membership input.
        assert_eq!(st.board_slots().len(), 13);
        let effs = update(
            &mut st,
            AppMsg::TogglePanel {
                panel_id: "countmin-column".to_string(),
            },
        );
        run_effects(&mut st, effs);
        assert_eq!(st.board_slots().len(), 9);
    }

    #[test]
    fn focus_cycles_and_wraps() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = fresh_state(&dir);
        let n = st.board_slots().len();
        st.cycle_focus(-1);
        assert_eq!(st.board_focus, n - 1);
        st.cycle_focus(1);
        assert_eq!(st.board_focus, 0);
        st.view = View::Search;
        st.cycle_focus(1);
        assert_eq!(st.search_focus, 1);
        st.cycle_focus(-1);
        st.cycle_focus(-1);
        // Form plus three visible result panes wraps at four.
        assert_eq!(st.search_focus, 3);
    }

    #[test]
    fn toggle_chips_number_every_panel() {
        let dir = tempfile::tempdir().unwrap();
        let st = fresh_state(&dir);
        let chips = toggle_chips(&st);
        assert_eq!(chips.len(), st.registry.panels().len());
        assert_eq!(chips[0].index, 1);
        let rag = chips.iter().find(|c| c.label == "RAG").unwrap();
        assert!(!rag.visible);
    }

    #[test]
    fn digits_toggle_panels() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = fresh_state(&dir);
        assert!(st.visibility.is_visible("countmin-column"));
        assert!(!handle_key(&mut st, KeyCode::Char('2')));
        assert!(!st.visibility.is_visible("countmin-column"));
        // '0' reaches the tenth panel.
        assert!(!st.visibility.is_visible("semantic-cache"));
        handle_key(&mut st, KeyCode::Char('0'));
        assert!(st.visibility.is_visible("semantic-cache"));
    }

    #[test]
    fn esc_blurs_a_text_box_before_quitting() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = fresh_state(&dir);
        st.view = View::Search;
        st.search_focus = 0;
        assert!(!handle_key(&mut st, KeyCode::Esc));
        assert_eq!(st.search_focus, 1);
        assert!(handle_key(&mut st, KeyCode::Esc));
    }

    #[test]
    fn toast_expires_on_tick() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = fresh_state(&dir);
        run_effects(
            &mut st,
            vec![Effect::ShowToast {
                text: "hello".to_string(),
                level: ToastLevel::Info,
                seconds: 1,
            }],
        );
        assert!(st.toast.is_some());
        st.tick = 4;
        st.expire_toast();
        assert!(st.toast.is_some());
        st.tick = 5;
        st.expire_toast();
        assert!(st.toast.is_none());
    }

    #[test]
    fn bloom_input_requires_key_then_checks() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = fresh_state(&dir);
        let effs = bloom_input_key(&mut st, KeyCode::Enter);
        assert!(effs.is_empty());
        assert_eq!(
            st.bloom_verdict.as_deref(),
            Some("Select a bloom filter key first.")
        );

        let keys = normalize_key_map(&json!({"users-bf": 256}));
        let effs = update(
            &mut st,
            AppMsg::LoadedKeys {
                source_id: "bloom-filter".to_string(),
                outcome: Ok(LoadOutcome::Keys(keys)),
            },
        );
        run_effects(&mut st, effs);
        st.selectors
            .get_mut("bloom-filter")
            .unwrap()
            .on_key(KeyCode::Down);
        for c in "alice".chars() {
            bloom_input_key(&mut st, KeyCode::Char(c));
        }
        let effs = bloom_input_key(&mut st, KeyCode::Enter);
        match effs.as_slice() {
            [Effect::BloomCheck {
                panel_id,
                key,
                item,
            }] => {
                assert_eq!(panel_id, "bloom-column");
                assert_eq!(key, "users-bf");
                assert_eq!(item, "alice");
            }
            other => panic!("expected a bloom check, got {other:?}"),
        }
    }

    #[test]
    fn config_file_errors_name_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("sketch-tui.yaml");
        std::fs::write(&good, "base_url: http://example.test\ntheme: light\n").unwrap();
        let cfg = read_config_file(&good).unwrap();
        assert_eq!(cfg.base_url, "http://example.test");
        assert_eq!(cfg.theme.as_deref(), Some("light"));

        let broken = dir.path().join("broken.yaml");
        std::fs::write(&broken, "base_url: [unclosed\n").unwrap();
        let err = format!("{:#}", read_config_file(&broken).unwrap_err());
        assert!(err.contains("parsing config"));

        let dup = dir.path().join("dup.yaml");
        let doc = "panels:\n  - id: dup\n    label: One\n    kind: flag\n  - id: dup\n    label: Two\n    kind: flag\n";
        std::fs::write(&dup, doc).unwrap();
        let err = format!("{:#}", read_config_file(&dup).unwrap_err());
        assert!(err.contains("invalid config"));
        assert!(err.contains("duplicate panel id"));
    }

    #[test]
    fn smoke_summary_reports_panel_counts() {
        let dir = tempfile::tempdir().unwrap();
        let st = fresh_state(&dir);
        let v: serde_json::Value = serde_json::from_str(&smoke_summary(&st)).unwrap();
        assert_eq!(v["ok"], true);
        assert_eq!(v["view"], "board");
        assert_eq!(v["visible_panels"], 6);
        // One keys fetch per source is still pending without a live server.
        assert_eq!(v["pending"], 6);
    }

    #[test]
    fn renders_the_default_board() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = fresh_state(&dir);
        let backend = ratatui::backend::TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| ui(f, &mut st)).unwrap();
        let text = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect::<String>();
        assert!(text.contains("Panels:"));
        assert!(text.contains("Bloom filters"));
        assert!(text.contains("Membership check"));
    }
}
