use std::sync::Arc;

use bytes::Bytes;
use doc_admin::object_store::{LocalStore, ObjectStore};
use doc_admin::registry::{FileRegistry, NewFile, RegistryError};
use doc_admin::storage::JsonIndex;

struct Fixture {
    dir: tempfile::TempDir,
    store: Arc<LocalStore>,
    registry: FileRegistry,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(LocalStore::new(dir.path().join("files")).unwrap());
    let index = JsonIndex::open(dir.path().join("files_index.json")).unwrap();
    let registry = FileRegistry::new(index, store.clone());
    Fixture {
        dir,
        store,
        registry,
    }
}

fn upload(name: &str, data: &'static [u8], uploader: &str) -> NewFile {
    NewFile {
        data: Bytes::from_static(data),
        original_filename: name.to_string(),
        mime_type: mime_guess::from_path(name).first().map(|m| m.to_string()),
        uploader: uploader.to_string(),
        in_vector_db: false,
    }
}

#[tokio::test]
async fn test_register_report_scenario() {
    let f = fixture();

    let (id, record) = f
        .registry
        .register(upload("report.pdf", b"%PDF-", "alice"))
        .await
        .unwrap();

    assert_eq!(record.file_size_bytes, 5);
    assert!(!record.in_vector_db);
    assert_eq!(record.uploader, "alice");
    assert_eq!(record.original_filename, "report.pdf");
    assert_eq!(record.stored_filename, format!("{id}.pdf"));
    assert_eq!(record.file_type, "application/pdf");
    assert!(std::path::Path::new(&record.path).is_absolute());
    assert!(f.store.exists(&record.stored_filename).await.unwrap());

    let flagged = f.registry.set_vector_flag(&id, true).unwrap();
    assert!(flagged.in_vector_db);
    assert!(f.registry.get(&id).unwrap().in_vector_db);
    assert_eq!(flagged.file_size_bytes, 5);

    f.registry.delete(&id).await.unwrap();
    assert!(!f.store.exists(&record.stored_filename).await.unwrap());
    assert!(f.registry.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_bytes_round_trip() {
    let f = fixture();
    let payload: &'static [u8] = b"\x00\x01binary\xffpayload\n";

    let (id, _) = f
        .registry
        .register(upload("blob.bin", payload, "bob"))
        .await
        .unwrap();

    let (data, name) = f.registry.fetch_bytes(&id).await.unwrap();
    assert_eq!(&data[..], payload);
    assert_eq!(name, "blob.bin");
}

#[tokio::test]
async fn test_list_empty_before_first_upload() {
    let f = fixture();
    assert!(f.registry.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_same_original_name_gets_distinct_records() {
    let f = fixture();

    let (a, ra) = f
        .registry
        .register(upload("notes.txt", b"one", "alice"))
        .await
        .unwrap();
    let (b, rb) = f
        .registry
        .register(upload("notes.txt", b"two", "alice"))
        .await
        .unwrap();

    assert_ne!(a, b);
    assert_ne!(ra.stored_filename, rb.stored_filename);
    assert_eq!(f.registry.list().unwrap().len(), 2);
    assert_eq!(&f.registry.fetch_bytes(&b).await.unwrap().0[..], b"two");
}

#[tokio::test]
async fn test_delete_then_get_is_not_found() {
    let f = fixture();
    let (id, _) = f
        .registry
        .register(upload("a.txt", b"a", "alice"))
        .await
        .unwrap();

    f.registry.delete(&id).await.unwrap();

    assert!(matches!(f.registry.get(&id), Err(RegistryError::NotFound(_))));
    assert!(matches!(
        f.registry.delete(&id).await,
        Err(RegistryError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_tolerates_missing_bytes() {
    let f = fixture();
    let (id, record) = f
        .registry
        .register(upload("a.txt", b"a", "alice"))
        .await
        .unwrap();

    f.store.delete(&record.stored_filename).await.unwrap();

    f.registry.delete(&id).await.unwrap();
    assert!(f.registry.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_bytes_missing_data_is_not_found() {
    let f = fixture();
    let (id, record) = f
        .registry
        .register(upload("a.txt", b"a", "alice"))
        .await
        .unwrap();

    f.store.delete(&record.stored_filename).await.unwrap();

    assert!(matches!(
        f.registry.fetch_bytes(&id).await,
        Err(RegistryError::NotFound(_))
    ));
    assert!(matches!(
        f.registry.fetch_bytes("unknown").await,
        Err(RegistryError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_set_vector_flag_unknown_id() {
    let f = fixture();
    assert!(matches!(
        f.registry.set_vector_flag("unknown", true),
        Err(RegistryError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_registry_reopened_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let store = Arc::new(LocalStore::new(dir.path().join("files")).unwrap());
        let registry = FileRegistry::new(
            JsonIndex::open(dir.path().join("files_index.json")).unwrap(),
            store,
        );
        registry
            .register(upload("kept.md", b"# kept", "alice"))
            .await
            .unwrap()
            .0
    };

    let store = Arc::new(LocalStore::new(dir.path().join("files")).unwrap());
    let registry = FileRegistry::new(
        JsonIndex::open(dir.path().join("files_index.json")).unwrap(),
        store,
    );
    let (data, name) = registry.fetch_bytes(&id).await.unwrap();
    assert_eq!(&data[..], b"# kept");
    assert_eq!(name, "kept.md");
}

#[tokio::test]
async fn test_index_failure_keeps_stored_bytes() {
    let f = fixture();
    let index_path = f.dir.path().join("files_index.json");
    std::fs::create_dir(&index_path).unwrap();

    let result = f
        .registry
        .register(upload("orphan.txt", b"orphan", "alice"))
        .await;
    assert!(matches!(result, Err(RegistryError::Storage(_))));

    let stored: Vec<String> = std::fs::read_dir(f.store.base_path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].ends_with(".txt"));
    assert_eq!(&f.store.get(&stored[0]).await.unwrap()[..], b"orphan");
}

#[tokio::test]
async fn test_unusual_extension_is_still_fetchable() {
    let f = fixture();

    let (id, record) = f
        .registry
        .register(upload("scan.p\\df", b"%PDF-", "alice"))
        .await
        .unwrap();
    assert_eq!(record.stored_filename, format!("{id}.pdf"));

    let (data, name) = f.registry.fetch_bytes(&id).await.unwrap();
    assert_eq!(&data[..], b"%PDF-");
    assert_eq!(name, "scan.p\\df");
}
