//! File-sent ledger
//!
//! Each order keeps a list of `{file, sent, sentBy, sentDate}` entries in its
//! `Files_Status` field, stored as encoded text. The list is keyed by file
//! name and only ever ratchets forward: a file can be re-marked as sent but
//! never un-sent.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::EngineError;
use crate::model::{Actor, Order, Role};
use crate::store::{Fields, RecordStore, StoreError};

/// Order record field holding the encoded ledger.
pub const LEDGER_FIELD: &str = "Files_Status";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    pub file: String,
    pub sent: bool,
    pub sent_by: String,
    #[serde(serialize_with = "serialize_sent_date")]
    pub sent_date: Option<DateTime<Utc>>,
}

fn serialize_sent_date<S: Serializer>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
    match date {
        Some(date) => serializer.serialize_str(&date.to_rfc3339()),
        None => serializer.serialize_str(""),
    }
}

/// Decode a persisted ledger. Anything unreadable yields an empty ledger.
pub fn parse_ledger(raw: Option<&Value>) -> Vec<FileStatus> {
    let items = match raw {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Vec::new();
            }
            if !text.starts_with('[') && !text.starts_with('{') {
                warn!(value = text, "Files_Status is not encoded JSON, treating as empty");
                return Vec::new();
            }
            match serde_json::from_str::<Value>(text) {
                Ok(Value::Array(items)) => items,
                Ok(_) => {
                    warn!("Files_Status does not hold a list, treating as empty");
                    return Vec::new();
                }
                Err(e) => {
                    warn!(error = %e, "Files_Status could not be decoded, treating as empty");
                    return Vec::new();
                }
            }
        }
        Some(other) => {
            warn!(kind = value_kind(other), "Unexpected Files_Status value, treating as empty");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(parse_entry)
        .filter(|entry| seen.insert(entry.file.clone()))
        .collect()
}

fn parse_entry(value: &Value) -> Option<FileStatus> {
    let entry = value.as_object()?;
    let file = entry
        .get("file")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())?
        .to_string();

    Some(FileStatus {
        file,
        sent: entry.get("sent").map(is_truthy).unwrap_or(false),
        sent_by: entry
            .get("sentBy")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        sent_date: entry
            .get("sentDate")
            .and_then(Value::as_str)
            .and_then(|date| DateTime::parse_from_rfc3339(date).ok())
            .map(|date| date.with_timezone(&Utc)),
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn encode_ledger(entries: &[FileStatus]) -> Result<String, serde_json::Error> {
    serde_json::to_string(entries)
}

/// Mark `file` as sent, updating its entry in place or appending a new one.
pub fn upsert_sent(entries: &mut Vec<FileStatus>, file: &str, sent_by: &str, at: DateTime<Utc>) {
    match entries.iter_mut().find(|entry| entry.file == file) {
        Some(entry) => {
            entry.sent = true;
            entry.sent_by = sent_by.to_string();
            entry.sent_date = Some(at);
        }
        None => entries.push(FileStatus {
            file: file.to_string(),
            sent: true,
            sent_by: sent_by.to_string(),
            sent_date: Some(at),
        }),
    }
}

/// Every file name the order knows about: attached files first, then any
/// ledger-only entries.
pub fn known_files(order: &Order) -> Vec<String> {
    let mut seen = HashSet::new();
    order
        .files
        .iter()
        .chain(order.files_status.iter().map(|entry| &entry.file))
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

pub fn status_of<'a>(order: &'a Order, file: &str) -> Option<&'a FileStatus> {
    order.files_status.iter().find(|entry| entry.file == file)
}

/// Persists ledger changes for one order collection.
pub struct FileLedger {
    store: Arc<dyn RecordStore>,
    orders_collection: String,
}

impl FileLedger {
    pub fn new(store: Arc<dyn RecordStore>, orders_collection: impl Into<String>) -> Self {
        Self {
            store,
            orders_collection: orders_collection.into(),
        }
    }

    /// Mark a single file as sent. The in-memory order changes only after
    /// the store accepted the new ledger.
    pub async fn mark_sent(
        &self,
        order: &mut Order,
        file_name: &str,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        actor.require(Role::ProductionEngineer)?;
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(EngineError::EmptyFileName);
        }

        let mut entries = order.files_status.clone();
        upsert_sent(&mut entries, file_name, &actor.display_name, at);
        self.persist(&order.id, &entries).await?;
        order.files_status = entries;

        info!(
            order_id = %order.id,
            file = file_name,
            sent_by = %actor.display_name,
            "File marked as sent"
        );
        Ok(())
    }

    /// Mark every known file as sent with a single store update.
    pub async fn mark_all_sent(&self, order: &mut Order, actor: &Actor, at: DateTime<Utc>) -> Result<usize, EngineError> {
        actor.require(Role::ProductionEngineer)?;
        let files = known_files(order);
        if files.is_empty() {
            return Err(EngineError::NoFiles);
        }

        let mut entries = order.files_status.clone();
        for file in &files {
            upsert_sent(&mut entries, file, &actor.display_name, at);
        }
        self.persist(&order.id, &entries).await?;
        order.files_status = entries;

        info!(
            order_id = %order.id,
            files = files.len(),
            sent_by = %actor.display_name,
            "All files marked as sent"
        );
        Ok(files.len())
    }

    async fn persist(&self, order_id: &str, entries: &[FileStatus]) -> Result<(), EngineError> {
        let encoded = encode_ledger(entries).map_err(StoreError::from)?;
        let mut patch = Fields::new();
        patch.insert(LEDGER_FIELD.to_string(), json!(encoded));
        self.store
            .update(&self.orders_collection, order_id, patch)
            .await?;
        Ok(())
    }
}
