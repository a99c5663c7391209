use crate::model::PanelKind;
use crate::ui::{AppState, LoadOutcome};

pub enum AppMsg {
    TogglePanel {
        panel_id: String,
    },
    LoadedKeys {
        source_id: String,
        outcome: Result<LoadOutcome, String>,
    },
    LoadedValue {
        source_id: String,
        outcome: Result<LoadOutcome, String>,
    },
    LoadedBloom {
        panel_id: String,
        outcome: Result<LoadOutcome, String>,
    },
    SearchDone {
        outcome: Result<LoadOutcome, String>,
    },
}

#[derive(Debug)]
pub enum Effect {
    /// Re-fetch every key set belonging to one sketch panel.
    RefreshPanel {
        panel_id: String,
    },
    FetchKeys {
        source_id: String,
    },
    FetchValue {
        source_id: String,
        key: String,
        data_type: String,
    },
    BloomCheck {
        panel_id: String,
        key: String,
        item: String,
    },
    SubmitSearch {
        query: String,
        image_path: Option<String>,
    },
    ShowToast {
        text: String,
        level: crate::ui::ToastLevel,
        seconds: u64,
    },
}

/// Membership verdict wording. A bloom filter can only ever promise the
/// negative case.
pub fn bloom_verdict(item: &str, exists: bool) -> String {
    if exists {
        format!("\"{item}\" might exist (false positives possible)")
    } else {
        format!("\"{item}\" is definitely not present")
    }
}

pub fn update(state: &mut AppState, msg: AppMsg) -> Vec<Effect> {
    use AppMsg::*;
    let mut effects: Vec<Effect> = Vec::new();
    match msg {
        TogglePanel { panel_id } => {
            let (has_region, is_sketch) = match state.registry.get(&panel_id) {
                Some(p) => (p.has_region(), matches!(p.kind, PanelKind::Sketch { .. })),
                None => {
                    state.dbg(format!("toggle: unknown panel {panel_id}"));
                    return effects;
                }
            };
            // Region panels toggle off what the screen actually shows;
            // flag panels only flip their recorded bit.
            let probe = if has_region {
                Some(state.visibility.is_visible(&panel_id))
            } else {
                None
            };
            let now_visible = state.visibility.toggle(&panel_id, probe);
            if let Some(e) = state.visibility.take_error() {
                state.dbg(format!("state store: {e}"));
            }
            state.dbg(format!(
                "panel {panel_id} -> {}",
                if now_visible { "visible" } else { "hidden" }
            ));
            if now_visible && is_sketch {
                effects.push(Effect::RefreshPanel { panel_id });
            }
        }
        LoadedKeys { source_id, outcome } => {
            state.loading.remove(&source_id);
            match outcome {
                Ok(LoadOutcome::Keys(map)) => {
                    state.dbg(format!("{source_id}: {} keys", map.len()));
                    if let Some(sel) = state.selectors.get_mut(&source_id) {
                        sel.set_keys(&map);
                    }
                }
                Ok(_) => state.dbg(format!("{source_id}: unexpected keys payload")),
                Err(e) => {
                    state.dbg(format!("{source_id}: {e}"));
                    if let Some(sel) = state.selectors.get_mut(&source_id) {
                        sel.set_error();
                    }
                }
            }
        }
        LoadedValue { source_id, outcome } => {
            state.loading.remove(&source_id);
            match outcome {
                Ok(LoadOutcome::Value(v)) => {
                    if let Some(view) = state.values.get_mut(&source_id) {
                        view.set_value(v);
                    }
                }
                Ok(_) => state.dbg(format!("{source_id}: unexpected value payload")),
                Err(e) => {
                    state.dbg(format!("{source_id}: {e}"));
                    if let Some(view) = state.values.get_mut(&source_id) {
                        view.set_error(e);
                    }
                }
            }
        }
        LoadedBloom { panel_id, outcome } => {
            state.loading.remove(&panel_id);
            match outcome {
                Ok(LoadOutcome::BloomChecked { item, exists }) => {
                    state.bloom_verdict = Some(bloom_verdict(&item, exists));
                }
                Ok(_) => state.dbg(format!("{panel_id}: unexpected check payload")),
                Err(e) => {
                    state.dbg(format!("{panel_id}: {e}"));
                    state.bloom_verdict = None;
                    effects.push(Effect::ShowToast {
                        text: format!("Membership check failed: {e}"),
                        level: crate::ui::ToastLevel::Error,
                        seconds: 3,
                    });
                }
            }
        }
        SearchDone { outcome } => {
            state.status_text = None;
            match outcome {
                Ok(LoadOutcome::Search(batch)) => {
                    let failures = batch.results.iter().filter(|(_, r)| r.is_err()).count();
                    state.dbg(format!(
                        "search done: {} panes, {failures} failed",
                        batch.results.len()
                    ));
                    for (panel_id, res) in batch.results {
                        if let Some(pane) = state.results.get_mut(&panel_id) {
                            pane.set_outcome(res);
                        }
                    }
                    if failures > 0 {
                        effects.push(Effect::ShowToast {
                            text: format!("{failures} search destination(s) failed"),
                            level: crate::ui::ToastLevel::Error,
                            seconds: 3,
                        });
                    }
                }
                Ok(_) => state.dbg("search: unexpected payload".to_string()),
                Err(e) => {
                    state.dbg(format!("search: {e}"));
                    for pane in state.results.values_mut() {
                        if pane.is_loading() {
                            pane.set_outcome(Err(e.clone()));
                        }
                    }
                }
            }
        }
    }
    effects
}
