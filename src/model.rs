use serde::Deserialize;

/// One key source inside a sketch panel: a prefix pattern the backend
/// resolves to a key set, plus the data type used when fetching values.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourceSpec {
    pub id: String,
    pub title: String,
    pub pattern: String,
    pub data_type: String,
}

/// Search destinations the dispatcher knows how to contact.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Destination {
    Utterances,
    Questions,
    Summaries,
    ImagesByDescription,
    ImagesByImage,
}

impl Destination {
    pub fn path(&self) -> &'static str {
        match self {
            Destination::Utterances => "/utterance/search",
            Destination::Questions => "/question/search/",
            Destination::Summaries => "/summary/search",
            Destination::ImagesByDescription => "/image/search/by-description",
            Destination::ImagesByImage => "/image/search/by-image",
        }
    }

    /// Only the question and summary services understand the RAG and
    /// semantic-cache switches.
    pub fn wants_flags(&self) -> bool {
        matches!(self, Destination::Questions | Destination::Summaries)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelKind {
    /// Board column with one selector + value view per source.
    Sketch {
        #[serde(default)]
        sources: Vec<SourceSpec>,
        #[serde(default)]
        bloom_check: bool,
    },
    /// Search-view column fed by one dispatch destination.
    Search { destination: Destination },
    /// Toggle-only switch with no rendered region.
    Flag,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PanelSpec {
    pub id: String,
    pub label: String,
    #[serde(default = "default_true")]
    pub default_visible: bool,
    #[serde(flatten)]
    pub kind: PanelKind,
}

impl PanelSpec {
    pub fn sources(&self) -> &[SourceSpec] {
        match &self.kind {
            PanelKind::Sketch { sources, .. } => sources,
            _ => &[],
        }
    }

    pub fn destination(&self) -> Option<Destination> {
        match &self.kind {
            PanelKind::Search { destination } => Some(*destination),
            _ => None,
        }
    }

    /// Flag panels have no region on any view; toggling them only flips
    /// the persisted bit.
    pub fn has_region(&self) -> bool {
        !matches!(self.kind, PanelKind::Flag)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    // No timeout unless set: a hung request keeps its spinner.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// "dark" (default) or "light".
    #[serde(default)]
    pub theme: Option<String>,
    // Empty means: use the built-in panel set.
    #[serde(default)]
    pub panels: Vec<PanelSpec>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            header: Some("SKETCH TUI".to_string()),
            base_url: default_base_url(),
            request_timeout_secs: None,
            theme: None,
            panels: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

pub(crate) fn validate_dashboard_config(cfg: &DashboardConfig) -> Result<(), String> {
    use std::collections::HashSet;
    let mut panel_ids = HashSet::new();
    let mut source_ids = HashSet::new();
    for (i, p) in cfg.panels.iter().enumerate() {
        if p.id.is_empty() {
            return Err(format!("panel at index {i} has an empty id"));
        }
        if !panel_ids.insert(&p.id) {
            return Err(format!("duplicate panel id: '{}' at index {}", p.id, i));
        }
        for s in p.sources() {
            if !source_ids.insert(&s.id) {
                return Err(format!("panel '{}' has duplicate source id '{}'", p.id, s.id));
            }
            if s.pattern.is_empty() {
                return Err(format!("source '{}' has an empty key pattern", s.id));
            }
            if s.data_type.is_empty() {
                return Err(format!("source '{}' has an empty data type", s.id));
            }
        }
    }
    Ok(())
}
