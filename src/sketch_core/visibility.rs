use std::collections::HashMap;

use crate::services::store::PanelStateStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisState {
    /// Not yet observed this run and nothing persisted.
    Unknown,
    Visible,
    Hidden,
}

impl VisState {
    pub fn from_visible(v: bool) -> Self {
        if v {
            VisState::Visible
        } else {
            VisState::Hidden
        }
    }

    pub fn is_visible(self) -> bool {
        matches!(self, VisState::Visible)
    }
}

/// Per-panel visibility state machine. All transitions write through to the
/// store, so a panel observed once never starts Unknown again.
///
/// The render probe is supplied by the caller: `Some(bool)` answers whether
/// the panel's region is currently shown, `None` means the panel renders
/// nothing anywhere (flag panels).
pub struct VisibilityController {
    states: HashMap<String, VisState>,
    store: PanelStateStore,
    last_error: Option<String>,
}

impl VisibilityController {
    pub fn new(store: PanelStateStore) -> Self {
        Self {
            states: HashMap::new(),
            store,
            last_error: None,
        }
    }

    /// First observation of a panel. Persisted state wins; otherwise the
    /// probe's answer is adopted and persisted; a probe-less panel starts
    /// hidden. Returns the adopted visible bit.
    pub fn init_panel(&mut self, id: &str, rendered: Option<bool>) -> bool {
        let adopted = match self.store.load(id) {
            Some(v) => VisState::from_visible(v),
            None => {
                let inferred = rendered.unwrap_or(false);
                self.persist(id, inferred);
                VisState::from_visible(inferred)
            }
        };
        self.states.insert(id.to_string(), adopted);
        adopted.is_visible()
    }

    /// Negate the panel's current effective rendering. When a region exists
    /// the probe's answer is authoritative (the screen may disagree with the
    /// recorded state); without a region the in-memory bit is negated, with
    /// Unknown counting as not-active.
    pub fn toggle(&mut self, id: &str, rendered: Option<bool>) -> bool {
        let current = match rendered {
            Some(r) => r,
            None => self.is_visible(id),
        };
        let next = !current;
        self.states
            .insert(id.to_string(), VisState::from_visible(next));
        self.persist(id, next);
        next
    }

    pub fn is_visible(&self, id: &str) -> bool {
        matches!(self.states.get(id), Some(VisState::Visible))
    }

    pub fn state(&self, id: &str) -> VisState {
        self.states.get(id).copied().unwrap_or(VisState::Unknown)
    }

    /// Persistence failure from the most recent transition, if any. Writes
    /// are best-effort; interactions never fail on them.
    pub fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    fn persist(&mut self, id: &str, visible: bool) {
        if let Err(e) = self.store.save(id, visible) {
            self.last_error = Some(e);
        }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &PanelStateStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(dir: &tempfile::TempDir) -> PanelStateStore {
        PanelStateStore::at_path(dir.path().join("panel-state.json"))
    }

    #[test]
    fn init_adopts_probe_and_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let mut vis = VisibilityController::new(temp_store(&dir));
        assert_eq!(vis.state("bloom-column"), VisState::Unknown);

        let visible = vis.init_panel("bloom-column", Some(true));
        assert!(visible);
        assert_eq!(vis.state("bloom-column"), VisState::Visible);
        assert_eq!(vis.store().load("bloom-column"), Some(true));
        assert!(vis.take_error().is_none());
    }

    #[test]
    fn init_prefers_persisted_state_over_probe() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = temp_store(&dir);
        store.save("topk-column", false).unwrap();

        let mut vis = VisibilityController::new(temp_store(&dir));
        let visible = vis.init_panel("topk-column", Some(true));
        assert!(!visible);
        assert_eq!(vis.state("topk-column"), VisState::Hidden);
    }

    #[test]
    fn regionless_panel_starts_hidden_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut vis = VisibilityController::new(temp_store(&dir));
        let visible = vis.init_panel("rag", None);
        assert!(!visible);
        assert_eq!(vis.store().load("rag"), Some(false));
    }

    #[test]
    fn toggle_twice_restores_original_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut vis = VisibilityController::new(temp_store(&dir));
        vis.init_panel("countmin-column", Some(true));

        let after_first = vis.toggle("countmin-column", Some(vis.is_visible("countmin-column")));
        assert!(!after_first);
        assert_eq!(vis.store().load("countmin-column"), Some(false));

        let after_second = vis.toggle("countmin-column", Some(vis.is_visible("countmin-column")));
        assert!(after_second);
        assert_eq!(vis.store().load("countmin-column"), Some(true));
    }

    #[test]
    fn regionless_toggle_from_unknown_activates() {
        let dir = tempfile::tempdir().unwrap();
        let mut vis = VisibilityController::new(temp_store(&dir));
        // No init: Unknown negates to active.
        let on = vis.toggle("semantic-cache", None);
        assert!(on);
        assert_eq!(vis.store().load("semantic-cache"), Some(true));
    }

    #[test]
    fn probe_answer_overrides_recorded_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut vis = VisibilityController::new(temp_store(&dir));
        vis.init_panel("bloom-column", Some(false));
        assert_eq!(vis.state("bloom-column"), VisState::Hidden);

        // Screen says the region is showing; toggle flips from that answer.
        let visible = vis.toggle("bloom-column", Some(true));
        assert!(!visible);
        assert_eq!(vis.state("bloom-column"), VisState::Hidden);
    }

    #[test]
    fn never_unknown_after_init() {
        let dir = tempfile::tempdir().unwrap();
        let mut vis = VisibilityController::new(temp_store(&dir));
        for (id, rendered) in [
            ("a", Some(true)),
            ("b", Some(false)),
            ("c", None),
        ] {
            vis.init_panel(id, rendered);
            assert_ne!(vis.state(id), VisState::Unknown);
        }
    }
}
