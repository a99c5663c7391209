use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::mpsc::Sender;
use std::thread;

use crate::model::Destination;
use crate::services::http::Backend;
use crate::sketch_core::registry::PanelRegistry;
use crate::sketch_core::visibility::VisibilityController;

/// Panel ids of the two dispatch switches. Part of the backend contract,
/// like the destination paths.
pub const FLAG_RAG: &str = "rag";
pub const FLAG_CACHE: &str = "semantic-cache";

/// One submitted search: the query text plus whatever the form attached.
#[derive(Debug, Clone)]
pub struct SearchJob {
    pub query: String,
    pub image_base64: Option<String>,
    pub enable_rag: bool,
    pub enable_cache: bool,
}

/// A request the dispatcher decided to send. `body` is final wire JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRequest {
    pub panel_id: String,
    pub destination: Destination,
    pub body: JsonValue,
}

/// Decide which destinations to contact for this job. Pure: walks the
/// search panels in registry order and keeps the Visible ones. Every kept
/// destination gets the same `{query, imageBase64?}` body; flag bits ride
/// along only for destinations that understand them.
pub fn plan(
    registry: &PanelRegistry,
    visibility: &VisibilityController,
    job: &SearchJob,
) -> Vec<PlannedRequest> {
    let mut out = Vec::new();
    for p in registry.search_panels() {
        if !visibility.is_visible(&p.id) {
            continue;
        }
        let Some(dest) = p.destination() else {
            continue;
        };
        let mut body = json!({ "query": job.query });
        if let Some(b64) = &job.image_base64 {
            body["imageBase64"] = json!(b64);
        }
        if dest.wants_flags() {
            body["enableRag"] = json!(job.enable_rag);
            body["enableSemanticCache"] = json!(job.enable_cache);
        }
        out.push(PlannedRequest {
            panel_id: p.id.clone(),
            destination: dest,
            body,
        });
    }
    out
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TextMatch {
    pub utterance: Option<String>,
    pub score: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionMatch {
    pub question: Option<String>,
    pub score: Option<JsonValue>,
    // Newline-joined source utterances backing this question.
    pub utterances: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryMatch {
    pub summary: Option<String>,
    pub score: Option<JsonValue>,
    pub utterances: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PhotoMatch {
    pub image_path: Option<String>,
    pub score: Option<JsonValue>,
    pub description: Option<String>,
}

/// Superset of every destination's response body; absent fields default.
/// Timing fields and scores stay opaque JSON (the backend is inconsistent
/// about strings vs numbers).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResponse {
    pub embedding_time: Option<JsonValue>,
    pub search_time: Option<JsonValue>,
    pub rag_time: Option<JsonValue>,
    pub cache_search_time: Option<JsonValue>,
    pub query: Option<String>,
    pub rag_answer: Option<String>,
    pub cached_query: Option<String>,
    pub cached_score: Option<JsonValue>,
    pub matched_texts: Vec<TextMatch>,
    pub matched_questions: Vec<QuestionMatch>,
    pub matched_summaries: Vec<SummaryMatch>,
    pub matched_photographs: Vec<PhotoMatch>,
}

/// Joined outcome of one dispatch: entry N corresponds to plan entry N, so
/// a failed destination disturbs nothing but its own panel.
#[derive(Debug)]
pub struct SearchBatch {
    pub results: Vec<(String, Result<SearchResponse, String>)>,
}

/// Two-decimal score display; unparseable values pass through raw.
pub fn fmt_score(v: &JsonValue) -> String {
    match v {
        JsonValue::Number(n) => n
            .as_f64()
            .map(|f| format!("{f:.2}"))
            .unwrap_or_else(|| n.to_string()),
        JsonValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map(|f| format!("{f:.2}"))
            .unwrap_or_else(|_| s.clone()),
        other => other.to_string(),
    }
}

/// Plain text for opaque scalar fields (timings, cached scores).
pub fn scalar_text(v: &JsonValue) -> String {
    match v {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The backend joins source utterances with newlines; blank segments are
/// noise from trailing separators.
pub fn split_utterances(raw: &str) -> Vec<String> {
    raw.split('\n')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

pub fn spawn_search(backend: Backend, plan: Vec<PlannedRequest>, tx: Sender<crate::ui::LoadMsg>) {
    thread::spawn(move || {
        let mut handles = Vec::with_capacity(plan.len());
        for req in &plan {
            let backend = backend.clone();
            let path = req.destination.path();
            let body = req.body.clone();
            handles.push(thread::spawn(move || -> Result<SearchResponse, String> {
                let v = backend.post_json(path, &body)?;
                serde_json::from_value::<SearchResponse>(v)
                    .map_err(|e| format!("{path}: unexpected response shape: {e}"))
            }));
        }
        // Positional join: outcome N belongs to plan entry N.
        let mut results = Vec::with_capacity(plan.len());
        for (req, handle) in plan.into_iter().zip(handles) {
            let outcome = match handle.join() {
                Ok(res) => res,
                Err(_) => Err("search worker panicked".to_string()),
            };
            results.push((req.panel_id, outcome));
        }
        let _ = tx.send(crate::ui::LoadMsg {
            key: "search".to_string(),
            outcome: Ok(crate::ui::LoadOutcome::Search(SearchBatch { results })),
            kind: crate::ui::LoadKind::Search,
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DashboardConfig;
    use crate::services::store::PanelStateStore;

    fn visibility(dir: &tempfile::TempDir) -> VisibilityController {
        VisibilityController::new(PanelStateStore::at_path(dir.path().join("state.json")))
    }

    fn job(query: &str) -> SearchJob {
        SearchJob {
            query: query.to_string(),
            image_base64: None,
            enable_rag: false,
            enable_cache: false,
        }
    }

    #[test]
    fn plan_contacts_only_visible_destinations() {
        let reg = PanelRegistry::from_config(&DashboardConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let mut vis = visibility(&dir);
        for p in reg.panels() {
            vis.init_panel(&p.id, Some(false));
        }
        vis.toggle("questions-response-column", Some(false));

        let plan = plan(&reg, &vis, &job("spikes"));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].panel_id, "questions-response-column");
        assert_eq!(plan[0].destination.path(), "/question/search/");
    }

    #[test]
    fn plan_carries_flags_only_where_understood() {
        let reg = PanelRegistry::from_config(&DashboardConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let mut vis = visibility(&dir);
        for p in reg.panels() {
            vis.init_panel(&p.id, Some(true));
        }
        let mut j = job("spikes");
        j.enable_rag = true;
        j.enable_cache = true;

        let plan = plan(&reg, &vis, &j);
        for req in &plan {
            let has_flags = req.body.get("enableRag").is_some();
            assert_eq!(has_flags, req.destination.wants_flags());
            if has_flags {
                assert_eq!(req.body["enableRag"], serde_json::json!(true));
                assert_eq!(req.body["enableSemanticCache"], serde_json::json!(true));
            }
        }
    }

    #[test]
    fn plan_posts_every_visible_destination_without_image() {
        let reg = PanelRegistry::from_config(&DashboardConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let mut vis = visibility(&dir);
        for p in reg.panels() {
            vis.init_panel(&p.id, Some(true));
        }

        let plan = plan(&reg, &vis, &job("spikes"));
        let paths: Vec<&str> = plan.iter().map(|r| r.destination.path()).collect();
        assert_eq!(
            paths,
            vec![
                "/utterance/search",
                "/question/search/",
                "/summary/search",
                "/image/search/by-description",
                "/image/search/by-image",
            ]
        );
        assert!(plan.iter().all(|r| r.body.get("imageBase64").is_none()));
    }

    #[test]
    fn image_rides_in_every_destination_body() {
        let reg = PanelRegistry::from_config(&DashboardConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let mut vis = visibility(&dir);
        for p in reg.panels() {
            vis.init_panel(&p.id, Some(true));
        }
        let mut j = job("spikes");
        j.image_base64 = Some("aGVsbG8=".to_string());

        let plan = plan(&reg, &vis, &j);
        assert_eq!(plan.len(), 5);
        for req in &plan {
            assert_eq!(req.body["query"], serde_json::json!("spikes"));
            assert_eq!(req.body["imageBase64"], serde_json::json!("aGVsbG8="));
        }
    }

    #[test]
    fn plan_with_nothing_visible_is_empty() {
        let reg = PanelRegistry::from_config(&DashboardConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let mut vis = visibility(&dir);
        for p in reg.panels() {
            vis.init_panel(&p.id, Some(false));
        }
        assert!(plan(&reg, &vis, &job("spikes")).is_empty());
    }

    #[test]
    fn response_parses_question_payload() {
        let raw = serde_json::json!({
            "embeddingTime": "12 ms",
            "searchTime": "48 ms",
            "ragTime": "610 ms",
            "query": "what fires together",
            "ragAnswer": "Neurons that fire together wire together.",
            "matchedQuestions": [
                {"question": "What wires together?", "score": 0.9172,
                 "utterances": "first line\nsecond line\n"}
            ]
        });
        let resp: SearchResponse = serde_json::from_value(raw).expect("parse");
        assert_eq!(resp.query.as_deref(), Some("what fires together"));
        assert_eq!(resp.matched_questions.len(), 1);
        let q = &resp.matched_questions[0];
        assert_eq!(fmt_score(q.score.as_ref().unwrap()), "0.92");
        assert_eq!(
            split_utterances(q.utterances.as_deref().unwrap()),
            vec!["first line", "second line"]
        );
        assert!(resp.matched_texts.is_empty());
    }

    #[test]
    fn fmt_score_handles_strings_and_garbage() {
        assert_eq!(fmt_score(&serde_json::json!("0.875")), "0.88");
        assert_eq!(fmt_score(&serde_json::json!(1)), "1.00");
        assert_eq!(fmt_score(&serde_json::json!("n/a")), "n/a");
    }
}
