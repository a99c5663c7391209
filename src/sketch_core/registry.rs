use crate::model::{DashboardConfig, Destination, PanelKind, PanelSpec, SourceSpec};

/// Immutable panel catalog built once at startup. Everything that deals in
/// panels (toggle bar, board layout, search dispatch, visibility) consults
/// this instead of hard-coding ids.
pub struct PanelRegistry {
    panels: Vec<PanelSpec>,
}

impl PanelRegistry {
    pub fn from_config(cfg: &DashboardConfig) -> Self {
        let panels = if cfg.panels.is_empty() {
            default_panels()
        } else {
            cfg.panels.clone()
        };
        Self { panels }
    }

    pub fn panels(&self) -> &[PanelSpec] {
        &self.panels
    }

    pub fn get(&self, id: &str) -> Option<&PanelSpec> {
        self.panels.iter().find(|p| p.id == id)
    }

    /// Locate a source and its owning panel by source id.
    pub fn source(&self, source_id: &str) -> Option<(&PanelSpec, &SourceSpec)> {
        for p in &self.panels {
            if let Some(s) = p.sources().iter().find(|s| s.id == source_id) {
                return Some((p, s));
            }
        }
        None
    }

    pub fn sketch_panels(&self) -> impl Iterator<Item = &PanelSpec> {
        self.panels
            .iter()
            .filter(|p| matches!(p.kind, PanelKind::Sketch { .. }))
    }

    /// Search panels in declaration order; dispatch plans and result columns
    /// both follow this order.
    pub fn search_panels(&self) -> impl Iterator<Item = &PanelSpec> {
        self.panels
            .iter()
            .filter(|p| matches!(p.kind, PanelKind::Search { .. }))
    }

    pub fn bloom_check_panel(&self) -> Option<&PanelSpec> {
        self.panels.iter().find(|p| {
            matches!(
                p.kind,
                PanelKind::Sketch {
                    bloom_check: true,
                    ..
                }
            )
        })
    }
}

fn source(id: &str, title: &str, pattern: &str, data_type: &str) -> SourceSpec {
    SourceSpec {
        id: id.to_string(),
        title: title.to_string(),
        pattern: pattern.to_string(),
        data_type: data_type.to_string(),
    }
}

fn sketch(id: &str, label: &str, bloom_check: bool, sources: Vec<SourceSpec>) -> PanelSpec {
    PanelSpec {
        id: id.to_string(),
        label: label.to_string(),
        default_visible: true,
        kind: PanelKind::Sketch {
            sources,
            bloom_check,
        },
    }
}

fn search(id: &str, label: &str, default_visible: bool, destination: Destination) -> PanelSpec {
    PanelSpec {
        id: id.to_string(),
        label: label.to_string(),
        default_visible,
        kind: PanelKind::Search { destination },
    }
}

fn flag(id: &str, label: &str) -> PanelSpec {
    PanelSpec {
        id: id.to_string(),
        label: label.to_string(),
        default_visible: false,
        kind: PanelKind::Flag,
    }
}

/// Built-in panel set matching the backend's stock deployment. A config file
/// with a non-empty `panels` list replaces all of this.
pub(crate) fn default_panels() -> Vec<PanelSpec> {
    vec![
        sketch(
            "bloom-column",
            "Bloom",
            true,
            vec![
                source("bloom-filter", "Bloom filters", "*bf", "bf"),
                source("bloom-set", "Backing sets", "*-set", "set"),
            ],
        ),
        sketch(
            "countmin-column",
            "Count-Min",
            false,
            vec![
                source("countmin-cms", "Count-Min sketches", "words-bucket-cms:", "cms"),
                source("countmin-zset", "Exact counts", "words-bucket-zset:", "zset"),
            ],
        ),
        sketch(
            "topk-column",
            "Top-K",
            false,
            vec![
                source("topk-sketch", "Top-K sketches", "spiking-topk:", "topk"),
                source("topk-zset", "Exact counts", "spiking-zset:", "zset"),
            ],
        ),
        search(
            "texts-response-column",
            "Texts",
            true,
            Destination::Utterances,
        ),
        search(
            "questions-response-column",
            "Questions",
            true,
            Destination::Questions,
        ),
        search(
            "summaries-response-column",
            "Summaries",
            true,
            Destination::Summaries,
        ),
        search(
            "images-text-response-column",
            "Image Desc",
            false,
            Destination::ImagesByDescription,
        ),
        search(
            "images-response-column",
            "Image Sim",
            false,
            Destination::ImagesByImage,
        ),
        flag("rag", "RAG"),
        flag("semantic-cache", "Semantic Cache"),
    ]
}
