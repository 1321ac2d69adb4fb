//! Order notes, stored as an encoded list in the order's `Notes` field.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::errors::EngineError;
use crate::model::Actor;

pub const NOTES_FIELD: &str = "Notes";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub content: String,
    pub created: Option<DateTime<Utc>>,
    pub user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited: Option<DateTime<Utc>>,
}

impl Note {
    /// Build a new note, refusing blank content.
    pub fn compose(content: &str, author: &Actor, at: DateTime<Utc>) -> Result<Self, EngineError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(EngineError::EmptyNote);
        }
        Ok(Self {
            content: content.to_string(),
            created: Some(at),
            user_name: author.display_name.clone(),
            edited: None,
        })
    }

    /// Notes are matched to their author by display name.
    pub fn is_authored_by(&self, actor: &Actor) -> bool {
        self.user_name == actor.display_name
    }

    /// Replace the content and stamp the edit time, refusing blank content.
    pub fn revise(&mut self, content: &str, at: DateTime<Utc>) -> Result<(), EngineError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(EngineError::EmptyNote);
        }
        self.content = content.to_string();
        self.edited = Some(at);
        Ok(())
    }
}

/// Decode the persisted note list; unreadable data yields no notes.
pub fn parse_notes(raw: Option<&Value>) -> Vec<Note> {
    let items = match raw {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(text)) if text.trim().is_empty() => return Vec::new(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => items,
            Ok(_) | Err(_) => {
                warn!("Notes field could not be decoded, treating as empty");
                return Vec::new();
            }
        },
        Some(_) => {
            warn!("Unexpected Notes value, treating as empty");
            return Vec::new();
        }
    };

    items.iter().filter_map(parse_note).collect()
}

fn parse_note(value: &Value) -> Option<Note> {
    let note = value.as_object()?;
    let content = note
        .get("content")
        .and_then(Value::as_str)
        .filter(|content| !content.trim().is_empty())?;

    let timestamp = |key: &str| {
        note.get(key)
            .and_then(Value::as_str)
            .and_then(|date| DateTime::parse_from_rfc3339(date).ok())
            .map(|date| date.with_timezone(&Utc))
    };

    Some(Note {
        content: content.to_string(),
        created: timestamp("created"),
        user_name: note
            .get("user_name")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string(),
        edited: timestamp("edited"),
    })
}

pub fn encode_notes(notes: &[Note]) -> Result<String, serde_json::Error> {
    serde_json::to_string(notes)
}
