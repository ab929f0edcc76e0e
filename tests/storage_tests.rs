use doc_admin::storage::JsonIndex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Entry {
    label: String,
    flag: bool,
}

fn entry(label: &str) -> Entry {
    Entry {
        label: label.to_string(),
        flag: false,
    }
}

fn test_index() -> (tempfile::TempDir, JsonIndex<Entry>) {
    let dir = tempfile::tempdir().unwrap();
    let index = JsonIndex::open(dir.path().join("data").join("index.json")).unwrap();
    (dir, index)
}

#[test]
fn test_missing_file_is_empty_index() {
    let (_dir, index) = test_index();

    assert!(!index.exists());
    assert!(index.load().unwrap().is_empty());
    assert!(index.get("anything").unwrap().is_none());
}

#[test]
fn test_insert_and_get() {
    let (_dir, index) = test_index();
    index.insert("a", entry("first")).unwrap();

    assert!(index.exists());
    assert_eq!(index.get("a").unwrap(), Some(entry("first")));
    assert!(index.contains("a").unwrap());
    assert!(!index.contains("b").unwrap());
}

#[test]
fn test_insert_new_refuses_existing_key() {
    let (_dir, index) = test_index();

    assert!(index.insert_new("a", entry("first")).unwrap());
    assert!(!index.insert_new("a", entry("second")).unwrap());
    assert_eq!(index.get("a").unwrap(), Some(entry("first")));
}

#[test]
fn test_update_mutates_only_target() {
    let (_dir, index) = test_index();
    index.insert("a", entry("first")).unwrap();
    index.insert("b", entry("second")).unwrap();

    let updated = index.update("a", |e| e.flag = true).unwrap().unwrap();
    assert!(updated.flag);
    assert_eq!(updated.label, "first");
    assert!(!index.get("b").unwrap().unwrap().flag);

    assert!(index.update("missing", |e| e.flag = true).unwrap().is_none());
}

#[test]
fn test_remove() {
    let (_dir, index) = test_index();
    index.insert("a", entry("first")).unwrap();

    assert_eq!(index.remove("a").unwrap(), Some(entry("first")));
    assert_eq!(index.remove("a").unwrap(), None);
    assert!(index.load().unwrap().is_empty());
}

#[test]
fn test_file_is_plain_json_object() {
    let (_dir, index) = test_index();
    index.insert("id-1", entry("first")).unwrap();

    let raw = std::fs::read_to_string(index.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        value,
        serde_json::json!({ "id-1": { "label": "first", "flag": false } })
    );
}

#[test]
fn test_reopened_index_sees_previous_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");

    JsonIndex::<Entry>::open(&path)
        .unwrap()
        .insert("a", entry("first"))
        .unwrap();

    let reopened = JsonIndex::<Entry>::open(&path).unwrap();
    assert_eq!(reopened.get("a").unwrap(), Some(entry("first")));
}

#[test]
fn test_corrupt_index_is_an_error() {
    let (_dir, index) = test_index();
    std::fs::write(index.path(), b"{ not json").unwrap();

    assert!(index.load().is_err());
}

#[test]
fn test_concurrent_writers_in_one_process_do_not_lose_updates() {
    let (_dir, index) = test_index();
    let index = std::sync::Arc::new(index);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let index = std::sync::Arc::clone(&index);
            std::thread::spawn(move || {
                for i in 0..10 {
                    index.insert(&format!("{t}-{i}"), entry("x")).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(index.load().unwrap().len(), 80);
}
