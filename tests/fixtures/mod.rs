//! Shared fixtures: a seeded plant with one order and a store wrapper that
//! records calls and injects failures.
#![allow(dead_code)]

use async_trait::async_trait;
use mo_progress::store::Fields;
use mo_progress::{Filter, InMemoryRecordStore, Record, RecordStore, StoreError};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub const ORDER_ID: &str = "mo1";
pub const ORDER_NAME: &str = "MO-17";

pub fn fields(value: Value) -> Fields {
    value.as_object().cloned().unwrap_or_default()
}

/// Users, a project, order `mo1` and its two parts:
/// part A runs Cut and Paint (both not started), part B runs Cut (done).
pub fn seeded_store() -> InMemoryRecordStore {
    let store = InMemoryRecordStore::new();

    store.seed("users", fields(json!({"id": "pe1", "Full_Name": "Nour Haddad", "Role": "Production Engineer"})));
    store.seed("users", fields(json!({"id": "pm1", "Full_Name": "Hana Saleh", "Role": "Project Manager"})));
    store.seed("users", fields(json!({"id": "de1", "Account_Name": "rana", "Role": "Design Engineer"})));
    store.seed("users", fields(json!({"id": "s1", "Full_Name": "Omar Aziz", "Role": "Supervisor"})));
    store.seed("users", fields(json!({"id": "s2", "Full_Name": "Lina Fares", "Role": ["Supervisor"]})));

    store.seed(
        "Projects",
        fields(json!({"id": "prj1", "Project_Code": "PRJ-4", "Project_Manager": "pm1"})),
    );

    store.seed(
        "MO_Table",
        fields(json!({
            "id": ORDER_ID,
            "MO_Name": ORDER_NAME,
            "Type": "Sheet metal",
            "Project_Name": "PRJ-4",
            "Process1": "Cut",
            "Process2": "Paint",
            "Files": ["panel.dxf", "bracket.step"],
            "Files_Status": "",
            "Project_Manager": "pm1",
            "Design_Eng": "de1",
            "Production_Eng": "pe1",
        })),
    );

    store.seed(
        "Parts_Table",
        fields(json!({
            "id": "A",
            "MO_Name": ORDER_NAME,
            "Process1": "Cut",
            "Process1_Status": "Not Started",
            "Process2": "Paint",
            "Process2_Status": "Not Started",
            "Process3": "",
        })),
    );
    store.seed(
        "Parts_Table",
        fields(json!({
            "id": "B",
            "MO_Name": ORDER_NAME,
            "Process1": "Cut",
            "Process1_Status": "Done",
        })),
    );

    store
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    GetList { collection: String },
    GetOne { collection: String, id: String },
    Create { collection: String, payload: Fields },
    Update { collection: String, id: String, patch: Fields },
}

/// Wraps an in-memory store, recording every call and failing the ones it
/// is told to fail.
#[derive(Clone)]
pub struct RecordingStore {
    pub inner: Arc<InMemoryRecordStore>,
    pub calls: Arc<Mutex<Vec<StoreCall>>>,
    failing_update_ids: Arc<Mutex<HashSet<String>>>,
    failing_recipients: Arc<Mutex<HashSet<String>>>,
    failing_lists: Arc<Mutex<HashSet<String>>>,
}

impl RecordingStore {
    pub fn new(inner: InMemoryRecordStore) -> Self {
        Self {
            inner: Arc::new(inner),
            calls: Arc::new(Mutex::new(Vec::new())),
            failing_update_ids: Arc::new(Mutex::new(HashSet::new())),
            failing_recipients: Arc::new(Mutex::new(HashSet::new())),
            failing_lists: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn seeded() -> Self {
        Self::new(seeded_store())
    }

    pub fn fail_updates_for(&self, record_id: &str) {
        self.failing_update_ids.lock().unwrap().insert(record_id.to_string());
    }

    pub fn heal_updates(&self) {
        self.failing_update_ids.lock().unwrap().clear();
    }

    pub fn fail_notifications_for(&self, recipient: &str) {
        self.failing_recipients.lock().unwrap().insert(recipient.to_string());
    }

    pub fn fail_lists_of(&self, collection: &str) {
        self.failing_lists.lock().unwrap().insert(collection.to_string());
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn updates_to(&self, collection: &str) -> Vec<(String, Fields)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Update { collection: c, id, patch } if c == collection => Some((id, patch)),
                _ => None,
            })
            .collect()
    }

    pub fn stored(&self, collection: &str, id: &str) -> Record {
        self.inner.snapshot().get(collection, id).unwrap()
    }

    pub fn notifications(&self) -> Vec<Record> {
        self.inner.snapshot().list("Notifications", &Filter::all())
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RecordStore for RecordingStore {
    async fn get_list(&self, collection: &str, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        self.record(StoreCall::GetList {
            collection: collection.to_string(),
        });
        if self.failing_lists.lock().unwrap().contains(collection) {
            return Err(StoreError::Unavailable {
                message: format!("{collection} lookup timed out"),
            });
        }
        self.inner.get_list(collection, filter).await
    }

    async fn get_one(&self, collection: &str, id: &str) -> Result<Record, StoreError> {
        self.record(StoreCall::GetOne {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self.inner.get_one(collection, id).await
    }

    async fn create(&self, collection: &str, payload: Fields) -> Result<Record, StoreError> {
        self.record(StoreCall::Create {
            collection: collection.to_string(),
            payload: payload.clone(),
        });
        let recipient = payload.get("Recipient").and_then(Value::as_str).unwrap_or_default();
        if self.failing_recipients.lock().unwrap().contains(recipient) {
            return Err(StoreError::Rejected {
                collection: collection.to_string(),
                message: format!("cannot notify {recipient}"),
            });
        }
        self.inner.create(collection, payload).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<Record, StoreError> {
        self.record(StoreCall::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            patch: patch.clone(),
        });
        if self.failing_update_ids.lock().unwrap().contains(id) {
            return Err(StoreError::Unavailable {
                message: format!("update of {id} dropped"),
            });
        }
        self.inner.update(collection, id, patch).await
    }
}
