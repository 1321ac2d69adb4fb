use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::buffer::EditBuffer;
use crate::errors::EngineError;
use crate::model::Part;
use crate::process::{ProcessStatus, SlotIndex};
use crate::store::{Fields, RecordStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedPart {
    pub part_id: String,
    pub changes: Vec<(SlotIndex, ProcessStatus)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPart {
    pub part_id: String,
    pub slots: Vec<SlotIndex>,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Every part was saved and the buffer is clean.
    Complete,
    /// Some parts were saved; the rest are still staged.
    Partial,
    /// Nothing was saved.
    Failed,
}

/// What a flush did, part by part.
#[must_use = "a flush can partially fail; inspect the report"]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub applied: Vec<AppliedPart>,
    pub failed: Vec<FailedPart>,
}

impl FlushReport {
    /// Number of slot changes written to the store.
    pub fn applied_count(&self) -> usize {
        self.applied.iter().map(|part| part.changes.len()).sum()
    }

    pub fn outcome(&self) -> FlushOutcome {
        match (self.applied.is_empty(), self.failed.is_empty()) {
            (_, true) => FlushOutcome::Complete,
            (false, false) => FlushOutcome::Partial,
            (true, false) => FlushOutcome::Failed,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.outcome() == FlushOutcome::Complete
    }

    pub fn failed_part_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|part| part.part_id.as_str()).collect()
    }
}

/// Writes staged edits to the parts collection, one update per part.
pub struct CommitCoordinator {
    store: Arc<dyn RecordStore>,
    parts_collection: String,
}

impl CommitCoordinator {
    pub fn new(store: Arc<dyn RecordStore>, parts_collection: impl Into<String>) -> Self {
        Self {
            store,
            parts_collection: parts_collection.into(),
        }
    }

    /// Persist every staged edit.
    ///
    /// All part updates are put in flight together. A part whose update
    /// succeeds has its buffer entries cleared and its in-memory statuses
    /// replaced; a part whose update fails keeps its entries for a retry.
    /// The flush is not atomic across parts.
    pub async fn flush(&self, buffer: &mut EditBuffer, parts: &mut [Part]) -> Result<FlushReport, EngineError> {
        if buffer.is_empty() {
            return Err(EngineError::NothingToFlush);
        }

        let groups = buffer.grouped_by_part();
        debug!(parts = groups.len(), edits = buffer.len(), "Flushing staged edits");

        let in_flight: Vec<_> = groups
            .into_iter()
            .map(|(part_id, changes)| {
                let store = Arc::clone(&self.store);
                let collection = self.parts_collection.clone();
                let patch = build_patch(&changes);
                let id = part_id.clone();
                let handle = tokio::spawn(async move { store.update(&collection, &id, patch).await });
                (part_id, changes, handle)
            })
            .collect();

        let mut report = FlushReport::default();
        for (part_id, changes, handle) in in_flight {
            let outcome = match handle.await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(join_error) => Err(format!("update task did not finish: {join_error}")),
            };

            match outcome {
                Ok(_) => {
                    match parts.iter_mut().find(|part| part.id == part_id) {
                        Some(part) => {
                            for (slot, status) in &changes {
                                part.set_status(*slot, *status);
                            }
                        }
                        None => debug!(part_id = %part_id, "Saved part is not loaded locally"),
                    }
                    buffer.discard_part(&part_id);
                    info!(part_id = %part_id, slots = changes.len(), "Part statuses saved");
                    report.applied.push(AppliedPart { part_id, changes });
                }
                Err(reason) => {
                    warn!(
                        part_id = %part_id,
                        error = %reason,
                        "Part update failed, edits kept for retry"
                    );
                    report.failed.push(FailedPart {
                        part_id,
                        slots: changes.iter().map(|(slot, _)| *slot).collect(),
                        reason,
                    });
                }
            }
        }

        Ok(report)
    }
}

/// Partial update carrying only the changed status fields.
pub fn build_patch(changes: &[(SlotIndex, ProcessStatus)]) -> Fields {
    changes
        .iter()
        .map(|(slot, status)| (slot.status_field(), json!(status.as_str())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MockRecordStore, Record, StoreError};
    use mockall::predicate::*;

    fn slot(n: usize) -> SlotIndex {
        SlotIndex::new(n).unwrap()
    }

    fn parts() -> Vec<Part> {
        vec![
            Part::new("A", "MO-1")
                .with_process(slot(1), "Cut", ProcessStatus::NotStarted)
                .with_process(slot(2), "Paint", ProcessStatus::NotStarted),
            Part::new("B", "MO-1").with_process(slot(1), "Cut", ProcessStatus::NotStarted),
        ]
    }

    #[test]
    fn patch_contains_only_changed_slots() {
        let patch = build_patch(&[(slot(2), ProcessStatus::Done), (slot(4), ProcessStatus::InProgress)]);

        assert_eq!(patch.len(), 2);
        assert_eq!(patch["Process2_Status"], json!("Done"));
        assert_eq!(patch["Process4_Status"], json!("In Progress"));
    }

    #[tokio::test]
    async fn empty_buffer_is_refused() {
        let mut store = MockRecordStore::new();
        store.expect_update().never();
        let coordinator = CommitCoordinator::new(Arc::new(store), "Parts_Table");

        let mut buffer = EditBuffer::new();
        let mut parts = parts();
        let err = coordinator.flush(&mut buffer, &mut parts).await.unwrap_err();
        assert!(matches!(err, EngineError::NothingToFlush));
    }

    #[tokio::test]
    async fn one_update_per_part() {
        let mut store = MockRecordStore::new();
        store
            .expect_update()
            .with(eq("Parts_Table"), eq("A"), always())
            .times(1)
            .returning(|_, id, patch| {
                assert_eq!(patch.len(), 2);
                Ok(Record::new(id, patch))
            });
        store
            .expect_update()
            .with(eq("Parts_Table"), eq("B"), always())
            .times(1)
            .returning(|_, id, patch| Ok(Record::new(id, patch)));
        let coordinator = CommitCoordinator::new(Arc::new(store), "Parts_Table");

        let mut buffer = EditBuffer::new();
        buffer.record("A", slot(1), ProcessStatus::Done);
        buffer.record("A", slot(2), ProcessStatus::InProgress);
        buffer.record("B", slot(1), ProcessStatus::Rejected);
        let mut parts = parts();

        let report = coordinator.flush(&mut buffer, &mut parts).await.unwrap();

        assert_eq!(report.outcome(), FlushOutcome::Complete);
        assert_eq!(report.applied_count(), 3);
        assert!(!buffer.is_dirty());
        assert_eq!(parts[0].slots[0].status, ProcessStatus::Done);
        assert_eq!(parts[0].slots[1].status, ProcessStatus::InProgress);
        assert_eq!(parts[1].slots[0].status, ProcessStatus::Rejected);
    }

    #[tokio::test]
    async fn failed_part_stays_staged() {
        let mut store = MockRecordStore::new();
        store
            .expect_update()
            .with(eq("Parts_Table"), eq("A"), always())
            .returning(|_, id, patch| Ok(Record::new(id, patch)));
        store
            .expect_update()
            .with(eq("Parts_Table"), eq("B"), always())
            .returning(|_, _, _| {
                Err(StoreError::Unavailable {
                    message: "connection reset".to_string(),
                })
            });
        let coordinator = CommitCoordinator::new(Arc::new(store), "Parts_Table");

        let mut buffer = EditBuffer::new();
        buffer.record("A", slot(1), ProcessStatus::Done);
        buffer.record("B", slot(1), ProcessStatus::Done);
        let mut parts = parts();

        let report = coordinator.flush(&mut buffer, &mut parts).await.unwrap();

        assert_eq!(report.outcome(), FlushOutcome::Partial);
        assert_eq!(report.failed_part_ids(), vec!["B"]);
        assert!(report.failed[0].reason.contains("connection reset"));
        assert!(buffer.is_dirty());
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.get("B", slot(1)), Some(ProcessStatus::Done));
        assert_eq!(parts[0].slots[0].status, ProcessStatus::Done);
        assert_eq!(parts[1].slots[0].status, ProcessStatus::NotStarted);
    }

    #[tokio::test]
    async fn everything_failing_reports_failed() {
        let mut store = MockRecordStore::new();
        store.expect_update().returning(|collection, _, _| {
            Err(StoreError::Rejected {
                collection: collection.to_string(),
                message: "forbidden".to_string(),
            })
        });
        let coordinator = CommitCoordinator::new(Arc::new(store), "Parts_Table");

        let mut buffer = EditBuffer::new();
        buffer.record("A", slot(2), ProcessStatus::Done);
        let mut parts = parts();

        let report = coordinator.flush(&mut buffer, &mut parts).await.unwrap();
        assert_eq!(report.outcome(), FlushOutcome::Failed);
        assert_eq!(report.applied_count(), 0);
        assert_eq!(buffer.len(), 1);
    }
}
