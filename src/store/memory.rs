use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{Fields, Filter, Record, RecordStore, StoreError};

/// Tables keyed by collection name, then record id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collections(BTreeMap<String, BTreeMap<String, Record>>);

impl Collections {
    pub fn list(&self, collection: &str, filter: &Filter) -> Vec<Record> {
        self.0
            .get(collection)
            .map(|table| {
                table
                    .values()
                    .filter(|record| filter.matches(record))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get(&self, collection: &str, id: &str) -> Result<Record, StoreError> {
        self.0
            .get(collection)
            .and_then(|table| table.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
    }

    pub fn insert(&mut self, collection: &str, mut payload: Fields) -> Record {
        let id = match payload.remove("id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id,
            _ => new_record_id(),
        };
        let record = Record::new(id.clone(), payload);
        self.0
            .entry(collection.to_string())
            .or_default()
            .insert(id, record.clone());
        record
    }

    pub fn patch(&mut self, collection: &str, id: &str, patch: &Fields) -> Result<Record, StoreError> {
        let record = self
            .0
            .get_mut(collection)
            .and_then(|table| table.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        record.merge(patch);
        Ok(record.clone())
    }

    pub fn len(&self, collection: &str) -> usize {
        self.0.get(collection).map(BTreeMap::len).unwrap_or(0)
    }
}

/// 15 lowercase alphanumerics, the shape the hosted store uses for ids.
fn new_record_id() -> String {
    Uuid::new_v4().simple().to_string()[..15].to_string()
}

/// Record store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<Collections>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record directly, bypassing the async API. Returns the stored id.
    pub fn seed(&self, collection: &str, payload: Fields) -> String {
        match self.tables.write() {
            Ok(mut tables) => tables.insert(collection, payload).id,
            Err(poisoned) => poisoned.into_inner().insert(collection, payload).id,
        }
    }

    pub fn snapshot(&self) -> Collections {
        match self.tables.read() {
            Ok(tables) => tables.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn poisoned() -> StoreError {
        StoreError::Unavailable {
            message: "in-memory store lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_list(&self, collection: &str, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables.list(collection, filter))
    }

    async fn get_one(&self, collection: &str, id: &str) -> Result<Record, StoreError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        tables.get(collection, id)
    }

    async fn create(&self, collection: &str, payload: Fields) -> Result<Record, StoreError> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let record = tables.insert(collection, payload);
        debug!(collection, id = %record.id, "Created record");
        Ok(record)
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<Record, StoreError> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        tables.patch(collection, id, &patch)
    }
}
