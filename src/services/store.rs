use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const VISIBLE: &str = "visible";
const HIDDEN: &str = "hidden";

/// Panel visibility state file: a flat JSON object mapping panel id to the
/// literal string `"visible"` or `"hidden"`. Nothing else is ever stored.
pub struct PanelStateStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl PanelStateStore {
    /// Resolve the state file location and load whatever is there. A
    /// missing, unreadable, or malformed file yields an empty store.
    pub fn open() -> Self {
        let path = match std::env::var("SKETCH_TUI_STATE_FILE") {
            Ok(p) if !p.is_empty() => PathBuf::from(p),
            _ => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("sketch-tui")
                .join("panel-state.json"),
        };
        Self::at_path(path)
    }

    pub fn at_path(path: PathBuf) -> Self {
        let entries = std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str::<BTreeMap<String, String>>(&s).ok())
            .unwrap_or_default();
        Self { path, entries }
    }

    /// `Some(true)` for `"visible"`, `Some(false)` for `"hidden"`, `None`
    /// for an absent key or any unrecognized value.
    pub fn load(&self, panel_id: &str) -> Option<bool> {
        match self.entries.get(panel_id).map(|s| s.as_str()) {
            Some(VISIBLE) => Some(true),
            Some(HIDDEN) => Some(false),
            _ => None,
        }
    }

    /// Write-through update. Creates parent directories on first use.
    pub fn save(&mut self, panel_id: &str, visible: bool) -> Result<(), String> {
        let word = if visible { VISIBLE } else { HIDDEN };
        self.entries.insert(panel_id.to_string(), word.to_string());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("create {}: {e}", parent.display()))?;
        }
        let body = serde_json::to_string_pretty(&self.entries).map_err(|e| e.to_string())?;
        std::fs::write(&self.path, body).map_err(|e| format!("write {}: {e}", self.path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_reload_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel-state.json");
        let mut store = PanelStateStore::at_path(path.clone());
        store.save("bloom-column", true).unwrap();
        store.save("rag", false).unwrap();

        let reloaded = PanelStateStore::at_path(path);
        assert_eq!(reloaded.load("bloom-column"), Some(true));
        assert_eq!(reloaded.load("rag"), Some(false));
        assert_eq!(reloaded.load("topk-column"), None);
    }

    #[test]
    fn file_holds_only_the_two_literals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel-state.json");
        let mut store = PanelStateStore::at_path(path.clone());
        store.save("a", true).unwrap();
        store.save("b", false).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let parsed: BTreeMap<String, String> = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.get("a").map(String::as_str), Some("visible"));
        assert_eq!(parsed.get("b").map(String::as_str), Some("hidden"));
    }

    #[test]
    fn unrecognized_value_reads_as_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel-state.json");
        std::fs::write(&path, r#"{"bloom-column": "maybe"}"#).unwrap();
        let store = PanelStateStore::at_path(path);
        assert_eq!(store.load("bloom-column"), None);
    }

    #[test]
    fn malformed_file_yields_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel-state.json");
        std::fs::write(&path, "not json at all").unwrap();
        let store = PanelStateStore::at_path(path);
        assert_eq!(store.load("anything"), None);
    }
}
