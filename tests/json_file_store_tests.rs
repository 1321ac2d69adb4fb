//! The file-backed store persists across instances and serves a full session.

use mo_progress::store::Fields;
use mo_progress::{
    EngineConfig, Filter, JsonFileStore, ProcessStatus, ProgressEngine, RateLimitedStore, RecordStore, SlotIndex,
    StoreError,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

mod fixtures;

use fixtures::{seeded_store, ORDER_ID};

fn data_file(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("data.json")
}

fn payload(value: serde_json::Value) -> Fields {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn records_survive_a_new_store_instance() {
    let temp_dir = TempDir::new().unwrap();
    let data = data_file(&temp_dir);

    let store = JsonFileStore::new(&data);
    let created = store
        .create("Parts_Table", payload(json!({"MO_Name": "MO-1", "Process1": "Cut"})))
        .await
        .unwrap();
    assert_eq!(created.id.len(), 15);
    store
        .update(
            "Parts_Table",
            &created.id,
            payload(json!({"Process1_Status": "Done"})),
        )
        .await
        .unwrap();

    let reopened = JsonFileStore::new(&data);
    let record = reopened.get_one("Parts_Table", &created.id).await.unwrap();
    assert_eq!(record.str_field("Process1"), Some("Cut"));
    assert_eq!(record.str_field("Process1_Status"), Some("Done"));

    let listed = reopened
        .get_list("Parts_Table", &Filter::eq("MO_Name", "MO-1"))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn missing_records_are_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let data = data_file(&temp_dir);
    let store = JsonFileStore::new(&data);

    let err = store.get_one("MO_Table", "nope").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
    let err = store
        .update("MO_Table", "nope", payload(json!({"Notes": ""})))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn corrupt_data_file_is_a_serialization_error() {
    let temp_dir = TempDir::new().unwrap();
    let data = data_file(&temp_dir);
    std::fs::write(&data, "{ not json").unwrap();

    let store = JsonFileStore::new(&data);
    let err = store.get_list("MO_Table", &Filter::all()).await.unwrap_err();
    assert!(matches!(err, StoreError::Serialization(_)));
}

#[tokio::test]
async fn session_saves_through_rate_limited_file_store() {
    let temp_dir = TempDir::new().unwrap();
    let data = data_file(&temp_dir);
    std::fs::write(&data, serde_json::to_string(&seeded_store().snapshot()).unwrap()).unwrap();

    let file_store: Arc<dyn RecordStore> = Arc::new(JsonFileStore::new(&data));
    let store = Arc::new(RateLimitedStore::new(file_store, 100, 100));
    let engine = ProgressEngine::new(store, EngineConfig::default());

    let actor = engine.load_actor("pe1").await.unwrap();
    let mut session = engine.open_order(ORDER_ID, actor).await.unwrap();
    session
        .stage("A", SlotIndex::new(2).unwrap(), ProcessStatus::Done)
        .await
        .unwrap();
    let report = session.save().await.unwrap();
    assert!(report.is_complete());

    let reopened = JsonFileStore::new(&data);
    let part = reopened.get_one("Parts_Table", "A").await.unwrap();
    assert_eq!(part.str_field("Process2_Status"), Some("Done"));
}
