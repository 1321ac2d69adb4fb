use std::collections::BTreeMap;

use super::aggregator::StatusOverlay;
use crate::process::{ProcessStatus, SlotIndex};

/// Identifies one process slot of one part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditKey {
    pub part_id: String,
    pub slot: SlotIndex,
}

impl EditKey {
    pub fn new(part_id: impl Into<String>, slot: SlotIndex) -> Self {
        Self {
            part_id: part_id.into(),
            slot,
        }
    }
}

/// Staging area for process status changes that have not been saved yet.
///
/// Recording a key that is already staged replaces its value; there is no
/// history. Entries iterate in (part, slot) order.
#[derive(Debug, Clone, Default)]
pub struct EditBuffer {
    entries: BTreeMap<EditKey, ProcessStatus>,
    dirty: bool,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, part_id: &str, slot: SlotIndex, status: ProcessStatus) {
        self.entries.insert(EditKey::new(part_id, slot), status);
        self.dirty = true;
    }

    pub fn get(&self, part_id: &str, slot: SlotIndex) -> Option<ProcessStatus> {
        self.entries.get(&EditKey::new(part_id, slot)).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, SlotIndex, ProcessStatus)> + '_ {
        self.entries
            .iter()
            .map(|(key, status)| (key.part_id.as_str(), key.slot, *status))
    }

    /// Pending changes grouped per part, slots in ascending order.
    pub fn grouped_by_part(&self) -> BTreeMap<String, Vec<(SlotIndex, ProcessStatus)>> {
        let mut groups: BTreeMap<String, Vec<(SlotIndex, ProcessStatus)>> = BTreeMap::new();
        for (part_id, slot, status) in self.entries() {
            groups.entry(part_id.to_string()).or_default().push((slot, status));
        }
        groups
    }

    /// Drop the staged entries of one part. The buffer stays dirty while
    /// anything else is still staged.
    pub fn discard_part(&mut self, part_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.part_id != part_id);
        self.dirty = !self.entries.is_empty();
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StatusOverlay for EditBuffer {
    fn pending_status(&self, part_id: &str, slot: SlotIndex) -> Option<ProcessStatus> {
        self.get(part_id, slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(n: usize) -> SlotIndex {
        SlotIndex::new(n).unwrap()
    }

    #[test]
    fn record_overwrites_same_key() {
        let mut buffer = EditBuffer::new();
        assert!(!buffer.is_dirty());

        buffer.record("p", slot(1), ProcessStatus::InProgress);
        buffer.record("p", slot(1), ProcessStatus::Done);

        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.get("p", slot(1)), Some(ProcessStatus::Done));
        assert!(buffer.is_dirty());
    }

    #[test]
    fn keys_are_structured_not_textual() {
        // ids containing separators must not collide
        let mut buffer = EditBuffer::new();
        buffer.record("a-b", slot(1), ProcessStatus::Done);
        buffer.record("a", slot(1), ProcessStatus::Rejected);

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.get("a-b", slot(1)), Some(ProcessStatus::Done));
        assert_eq!(buffer.get("a", slot(1)), Some(ProcessStatus::Rejected));
        assert_eq!(buffer.get("a", slot(2)), None);
    }

    #[test]
    fn grouping_and_partial_discard() {
        let mut buffer = EditBuffer::new();
        buffer.record("B", slot(2), ProcessStatus::Done);
        buffer.record("A", slot(3), ProcessStatus::Cancelled);
        buffer.record("A", slot(1), ProcessStatus::Done);

        let groups = buffer.grouped_by_part();
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups["A"],
            vec![(slot(1), ProcessStatus::Done), (slot(3), ProcessStatus::Cancelled)]
        );

        assert_eq!(buffer.discard_part("A"), 2);
        assert!(buffer.is_dirty());
        assert_eq!(buffer.discard_part("B"), 1);
        assert!(!buffer.is_dirty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn clear_resets_dirty_flag() {
        let mut buffer = EditBuffer::new();
        buffer.record("p", slot(5), ProcessStatus::InProgress);
        buffer.clear();

        assert!(!buffer.is_dirty());
        assert_eq!(buffer.entries().count(), 0);
    }
}
