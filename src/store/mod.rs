//! Record store abstraction
//!
//! The engine talks to its backing data store only through four primitives:
//! list with a filter, fetch one, create, and partial update. Transport,
//! authentication and query syntax belong to the implementation.

pub mod file;
pub mod memory;
pub mod rate_limited;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

pub use file::JsonFileStore;
pub use memory::{Collections, InMemoryRecordStore};
pub use rate_limited::RateLimitedStore;

/// Field map of a record, excluding its id.
pub type Fields = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record {id} not found in {collection}")]
    NotFound { collection: String, id: String },
    #[error("{collection} rejected the request: {message}")]
    Rejected { collection: String, message: String },
    #[error("Record store unavailable: {message}")]
    Unavailable { message: String },
    #[error("Record store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Record store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A stored record: an id plus arbitrary fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// String value of a field, `None` when missing, not a string, or blank.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Overlay `patch` onto the record. Keys not in the patch are untouched.
    pub fn merge(&mut self, patch: &Fields) {
        for (key, value) in patch {
            if key == "id" {
                continue;
            }
            self.fields.insert(key.clone(), value.clone());
        }
    }
}

/// Conjunction of equality clauses.
///
/// A clause matches when the field equals the value, or when the field is a
/// list containing the value (users may carry several roles).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|(field, expected)| {
            if field == "id" {
                return expected.as_str() == Some(record.id.as_str());
            }
            match record.field(field) {
                Some(Value::Array(items)) => items.contains(expected),
                Some(actual) => actual == expected,
                None => false,
            }
        })
    }
}

/// Generic record CRUD collaborator.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records of `collection` matching `filter`
    async fn get_list(&self, collection: &str, filter: &Filter) -> Result<Vec<Record>, StoreError>;

    /// A single record by id
    async fn get_one(&self, collection: &str, id: &str) -> Result<Record, StoreError>;

    /// Create a record; the store assigns the id unless the payload has one
    async fn create(&self, collection: &str, payload: Fields) -> Result<Record, StoreError>;

    /// Apply a partial update and return the full updated record
    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<Record, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(roles: Value) -> Record {
        let mut fields = Fields::new();
        fields.insert("Role".to_string(), roles);
        fields.insert("Full_Name".to_string(), json!("  "));
        Record::new("u1", fields)
    }

    #[test]
    fn filter_matches_scalar_and_list_fields() {
        let filter = Filter::eq("Role", "Supervisor");
        assert!(filter.matches(&user(json!("Supervisor"))));
        assert!(filter.matches(&user(json!(["Admin", "Supervisor"]))));
        assert!(!filter.matches(&user(json!("Project Manager"))));
        assert!(Filter::all().matches(&user(json!(null))));
        assert!(Filter::eq("id", "u1").matches(&user(json!(null))));
    }

    #[test]
    fn blank_strings_read_as_missing() {
        let record = user(json!("Supervisor"));
        assert_eq!(record.str_field("Role"), Some("Supervisor"));
        assert_eq!(record.str_field("Full_Name"), None);
        assert_eq!(record.str_field("Missing"), None);
    }

    #[test]
    fn merge_never_rewrites_the_id() {
        let mut record = user(json!("Supervisor"));
        let mut patch = Fields::new();
        patch.insert("id".to_string(), json!("other"));
        patch.insert("Role".to_string(), json!("Admin"));
        record.merge(&patch);

        assert_eq!(record.id, "u1");
        assert_eq!(record.str_field("Role"), Some("Admin"));
    }
}
