//! Process state model
//!
//! Every part carries five positional process slots. Each slot has a name
//! (empty when the slot is unused) and one of five statuses. Three of the
//! statuses are terminal and count as "processed" for completion purposes,
//! regardless of whether the outcome was good or bad.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::EngineError;

/// Number of process slots on every part.
pub const SLOT_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ProcessStatus {
    #[default]
    NotStarted,
    InProgress,
    Done,
    Rejected,
    Cancelled,
}

impl ProcessStatus {
    pub const ALL: [ProcessStatus; 5] = [
        ProcessStatus::NotStarted,
        ProcessStatus::InProgress,
        ProcessStatus::Done,
        ProcessStatus::Rejected,
        ProcessStatus::Cancelled,
    ];

    /// Done, Rejected and Cancelled end a process; nothing follows them.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProcessStatus::Done | ProcessStatus::Rejected | ProcessStatus::Cancelled
        )
    }

    /// Whether a slot in this status counts toward the completion percentage.
    pub fn counts_as_processed(self) -> bool {
        self.is_terminal()
    }

    /// Persisted spelling of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessStatus::NotStarted => "Not Started",
            ProcessStatus::InProgress => "In Progress",
            ProcessStatus::Done => "Done",
            ProcessStatus::Rejected => "Rejected",
            ProcessStatus::Cancelled => "Cancelled",
        }
    }
}

pub fn default_status() -> ProcessStatus {
    ProcessStatus::NotStarted
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            // "None" and the empty string are what older records carry for untouched slots
            "" | "none" | "notstarted" => Ok(ProcessStatus::NotStarted),
            "inprogress" => Ok(ProcessStatus::InProgress),
            "done" => Ok(ProcessStatus::Done),
            "rejected" => Ok(ProcessStatus::Rejected),
            "cancelled" | "canceled" => Ok(ProcessStatus::Cancelled),
            _ => Err(EngineError::UnknownStatus(s.to_string())),
        }
    }
}

/// One of the five process positions, numbered 1 through 5 as in the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotIndex(u8);

impl SlotIndex {
    pub fn new(number: usize) -> Result<Self, EngineError> {
        if (1..=SLOT_COUNT).contains(&number) {
            Ok(Self(number as u8))
        } else {
            Err(EngineError::InvalidSlot(number))
        }
    }

    pub fn all() -> impl Iterator<Item = SlotIndex> {
        (1..=SLOT_COUNT as u8).map(SlotIndex)
    }

    /// 1-based slot number.
    pub fn number(self) -> usize {
        self.0 as usize
    }

    /// 0-based array position.
    pub fn position(self) -> usize {
        self.0 as usize - 1
    }

    /// Record field holding the process name, e.g. `Process2`.
    pub fn name_field(self) -> String {
        format!("Process{}", self.0)
    }

    /// Record field holding the process status, e.g. `Process2_Status`.
    pub fn status_field(self) -> String {
        format!("Process{}_Status", self.0)
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
