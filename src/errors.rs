use thiserror::Error;

use crate::model::Role;
use crate::process::SlotIndex;
use crate::store::StoreError;

/// Errors surfaced by engine operations.
///
/// Validation variants are raised before any state is touched. Store failures
/// that affect only part of a batch are reported through the batch result
/// instead (see `FlushReport` and `FanoutReport`).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Nothing to save: there are no pending process status changes")]
    NothingToFlush,
    #[error("{actor} does not hold the {required} role")]
    Unauthorized { actor: String, required: Role },
    #[error("Process slot {0} is out of range (expected 1-5)")]
    InvalidSlot(usize),
    #[error("Part {0} does not belong to this order")]
    UnknownPart(String),
    #[error("Process slot {slot} is not used by part {part_id}")]
    UnusedSlot { part_id: String, slot: SlotIndex },
    #[error("Unknown process status: {0:?}")]
    UnknownStatus(String),
    #[error("Note content cannot be empty")]
    EmptyNote,
    #[error("Order has no note at position {0}")]
    UnknownNote(usize),
    #[error("{actor} is not the author of this note")]
    NotNoteAuthor { actor: String },
    #[error("Order has no files to mark as sent")]
    NoFiles,
    #[error("File name cannot be empty")]
    EmptyFileName,
    #[error("Malformed {collection} record {id}: {reason}")]
    MalformedRecord {
        collection: String,
        id: String,
        reason: String,
    },
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),
}
