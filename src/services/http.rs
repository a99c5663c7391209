use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::model::DashboardConfig;

/// Blocking HTTP client for the dashboard backend. Built once at startup and
/// shared (cloned) into worker threads.
#[derive(Clone)]
pub struct Backend {
    base_url: String,
    client: reqwest::blocking::Client,
}

fn expand_env_placeholders(input: &str) -> String {
    // Expand ${VAR} from environment; unknown vars collapse to "".
    let re = Regex::new(r"\$\{([A-Z0-9_]+)\}").unwrap();
    let env_map: HashMap<String, String> = env::vars().collect();
    re.replace_all(input, |caps: &regex::Captures| {
        env_map.get(&caps[1]).cloned().unwrap_or_default()
    })
    .to_string()
}

fn resolve_base_url(cfg: &DashboardConfig) -> String {
    let raw = env::var("SKETCH_TUI_BASE_URL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| cfg.base_url.clone());
    expand_env_placeholders(&raw)
        .trim_end_matches('/')
        .to_string()
}

impl Backend {
    pub fn from_config(cfg: &DashboardConfig) -> Result<Self> {
        let builder = reqwest::blocking::Client::builder();
        // No timeout unless configured: a hung request keeps its spinner
        // rather than surfacing a synthetic error.
        let builder = match cfg.request_timeout_secs {
            Some(secs) => builder.timeout(Duration::from_secs(secs)),
            None => builder.timeout(None),
        };
        let client = builder.build().context("building HTTP client")?;
        Ok(Self {
            base_url: resolve_base_url(cfg),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<JsonValue, String> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|e| format!("GET {path}: {e}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("GET {path}: HTTP {}", status.as_u16()));
        }
        resp.json::<JsonValue>()
            .map_err(|e| format!("GET {path}: invalid JSON: {e}"))
    }

    /// POST with the partial-page request header the backend keys on to
    /// return JSON instead of a rendered page.
    pub fn post_json(&self, path: &str, body: &JsonValue) -> Result<JsonValue, String> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .header("HX-Request", "true")
            .json(body)
            .send()
            .map_err(|e| format!("POST {path}: {e}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("POST {path}: HTTP {}", status.as_u16()));
        }
        resp.json::<JsonValue>()
            .map_err(|e| format!("POST {path}: invalid JSON: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_expands_env_and_trims_slash() {
        std::env::set_var("SKETCH_TUI_TEST_HOST", "example.test");
        let cfg = DashboardConfig {
            base_url: "http://${SKETCH_TUI_TEST_HOST}:8080/".to_string(),
            ..Default::default()
        };
        std::env::remove_var("SKETCH_TUI_BASE_URL");
        assert_eq!(resolve_base_url(&cfg), "http://example.test:8080");
        std::env::remove_var("SKETCH_TUI_TEST_HOST");
    }

    #[test]
    fn unknown_placeholder_collapses_to_empty() {
        assert_eq!(
            expand_env_placeholders("x${SKETCH_TUI_NO_SUCH_VAR_12345}y"),
            "xy"
        );
    }
}
