use super::*;
use serde_json::json;

fn keys(map: &KeySizeMap) -> Vec<&str> {
    map.iter().map(|(k, _)| k).collect()
}

#[test]
fn normalize_object_keeps_entries() {
    let v = json!({"a": "1.23 MB", "b": "456 B"});
    let map = normalize_key_map(&v);
    assert_eq!(keys(&map), vec!["a", "b"]);
    assert_eq!(map.get("a").unwrap(), &json!("1.23 MB"));
}

#[test]
fn normalize_scalar_array_gets_item_index_keys() {
    let v = json!(["alpha", 42]);
    let map = normalize_key_map(&v);
    assert_eq!(keys(&map), vec!["item0", "item1"]);
    assert_eq!(map.get("item0").unwrap(), &json!("alpha"));
    assert_eq!(map.get("item1").unwrap(), &json!(42));
}

#[test]
fn normalize_array_of_objects_merges_last_write_wins() {
    let v = json!([
        {"a": "1 KB", "b": "2 KB"},
        {"b": "3 KB", "c": "4 KB"}
    ]);
    let map = normalize_key_map(&v);
    assert_eq!(keys(&map), vec!["a", "b", "c"]);
    assert_eq!(map.get("b").unwrap(), &json!("3 KB"));
}

#[test]
fn normalize_mixed_array_merges_objects_and_indexes_the_rest() {
    let v = json!(["k1", {"k2": "9 B"}, 42, null, true]);
    let map = normalize_key_map(&v);
    // Indexes are array positions, so the merged object leaves a gap.
    assert_eq!(keys(&map), vec!["item0", "k2", "item2", "item3", "item4"]);
    assert_eq!(map.get("item0").unwrap(), &json!("k1"));
    assert_eq!(map.get("item2").unwrap(), &json!(42));
    assert_eq!(map.get("item3").unwrap(), &JsonValue::Null);
    assert_eq!(map.get("item4").unwrap(), &json!(true));
}

#[test]
fn normalize_is_total_over_scalars_and_null() {
    for v in [json!(null), json!(3.5), json!("text"), json!(true), json!([])] {
        assert!(normalize_key_map(&v).is_empty());
    }
}

#[test]
fn insert_overwrites_in_place() {
    let mut map = KeySizeMap::default();
    map.insert("a".into(), json!("1 B"));
    map.insert("b".into(), json!("2 B"));
    map.insert("a".into(), json!("3 B"));
    assert_eq!(keys(&map), vec!["a", "b"]);
    assert_eq!(map.get("a").unwrap(), &json!("3 B"));
}

#[test]
fn entry_label_formats_key_and_size() {
    assert_eq!(entry_label("a", &json!("1.23 MB")), "a (1.23 MB)");
    assert_eq!(entry_label("a", &json!(1)), "a (1)");
    assert_eq!(entry_label("a", &JsonValue::Null), "a");
}
