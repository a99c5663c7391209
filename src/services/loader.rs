use serde_json::Value as JsonValue;
use std::sync::mpsc::Sender;
use std::thread;

use crate::services::http::Backend;

/// Insertion-ordered key -> size mapping produced from a keys response.
/// Sizes are opaque display values; the backend usually sends formatted
/// strings like `"1.23 MB"` but numbers pass through untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeySizeMap {
    entries: Vec<(String, JsonValue)>,
}

impl KeySizeMap {
    /// Last write wins; the key keeps its original position.
    pub fn insert(&mut self, key: String, size: JsonValue) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = size;
        } else {
            self.entries.push((key, size));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Fold whatever shape the keys endpoint returned into a `KeySizeMap`.
/// Array elements that are objects merge their entries; any other element
/// lands under a synthetic `item<index>` key (its array position) with the
/// element itself as the size. Total over every JSON value; never panics,
/// never errors.
pub fn normalize_key_map(v: &JsonValue) -> KeySizeMap {
    let mut map = KeySizeMap::default();
    match v {
        JsonValue::Object(obj) => {
            for (k, size) in obj {
                map.insert(k.clone(), size.clone());
            }
        }
        JsonValue::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                match item {
                    JsonValue::Object(obj) => {
                        for (k, size) in obj {
                            map.insert(k.clone(), size.clone());
                        }
                    }
                    other => map.insert(format!("item{i}"), other.clone()),
                }
            }
        }
        _ => {}
    }
    map
}

/// Selector label for one map entry: `key (size)`, or the bare key when no
/// size came back.
pub fn entry_label(key: &str, size: &JsonValue) -> String {
    match size {
        JsonValue::Null => key.to_string(),
        JsonValue::String(s) => format!("{key} ({s})"),
        other => format!("{key} ({other})"),
    }
}

pub fn spawn_fetch_keys(
    backend: Backend,
    source_id: String,
    pattern: String,
    tx: Sender<crate::ui::LoadMsg>,
) {
    thread::spawn(move || {
        let outcome = (|| -> Result<crate::ui::LoadOutcome, String> {
            let v = backend.get_json("/api/keys", &[("prefix", pattern.as_str())])?;
            Ok(crate::ui::LoadOutcome::Keys(normalize_key_map(&v)))
        })();
        let _ = tx.send(crate::ui::LoadMsg {
            key: source_id,
            outcome,
            kind: crate::ui::LoadKind::Keys,
        });
    });
}

pub fn spawn_fetch_value(
    backend: Backend,
    source_id: String,
    key: String,
    data_type: String,
    tx: Sender<crate::ui::LoadMsg>,
) {
    thread::spawn(move || {
        let outcome = (|| -> Result<crate::ui::LoadOutcome, String> {
            let v = backend.get_json(
                "/api/data",
                &[("key", key.as_str()), ("type", data_type.as_str())],
            )?;
            Ok(crate::ui::LoadOutcome::Value(v))
        })();
        let _ = tx.send(crate::ui::LoadMsg {
            key: source_id,
            outcome,
            kind: crate::ui::LoadKind::Value,
        });
    });
}

pub fn spawn_bloom_check(
    backend: Backend,
    panel_id: String,
    key: String,
    item: String,
    tx: Sender<crate::ui::LoadMsg>,
) {
    thread::spawn(move || {
        let outcome = (|| -> Result<crate::ui::LoadOutcome, String> {
            let v = backend.get_json(
                "/api/bloom/check",
                &[("key", key.as_str()), ("item", item.as_str())],
            )?;
            let exists = v
                .get("exists")
                .and_then(|b| b.as_bool())
                .ok_or_else(|| format!("malformed check response: {v}"))?;
            Ok(crate::ui::LoadOutcome::BloomChecked {
                item: item.clone(),
                exists,
            })
        })();
        let _ = tx.send(crate::ui::LoadMsg {
            key: panel_id,
            outcome,
            kind: crate::ui::LoadKind::Bloom,
        });
    });
}

#[cfg(test)]
mod loader_tests;
