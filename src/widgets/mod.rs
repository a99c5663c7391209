pub mod chrome;
pub mod header;
pub mod results;
pub mod search_form;
pub mod selector;
pub mod status_bar;
pub mod toggle_bar;
pub mod value_view;

use crate::app::Effect;
use crossterm::event::KeyCode;
use ratatui::crossterm::event as rt_event;
use ratatui::prelude::*;

pub trait Widget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64);
    fn on_key(&mut self, key: KeyCode) -> Vec<Effect> {
        let _ = key;
        Vec::new()
    }
}

pub(crate) const SPINNER: [&str; 6] = ["⠋", "⠙", "⠸", "⠴", "⠦", "⠇"];

pub(crate) fn spinner_glyph(tick: u64) -> &'static str {
    SPINNER[tick as usize % SPINNER.len()]
}

/// Bridge a terminal key into the crossterm flavor `TextArea::input`
/// accepts (tui-textarea follows ratatui's re-export, not our direct
/// dependency). Non-editing keys do not cross.
pub(crate) fn textarea_key(code: KeyCode) -> Option<rt_event::KeyEvent> {
    let code = match code {
        KeyCode::Char(c) => rt_event::KeyCode::Char(c),
        KeyCode::Backspace => rt_event::KeyCode::Backspace,
        KeyCode::Delete => rt_event::KeyCode::Delete,
        KeyCode::Left => rt_event::KeyCode::Left,
        KeyCode::Right => rt_event::KeyCode::Right,
        KeyCode::Home => rt_event::KeyCode::Home,
        KeyCode::End => rt_event::KeyCode::End,
        _ => return None,
    };
    Some(rt_event::KeyEvent::new(code, rt_event::KeyModifiers::NONE))
}
