use serde::Serialize;
use std::fmt;

use crate::model::Part;
use crate::process::{ProcessStatus, SlotIndex};

/// Source of not-yet-saved statuses layered over the stored ones.
pub trait StatusOverlay {
    fn pending_status(&self, part_id: &str, slot: SlotIndex) -> Option<ProcessStatus>;
}

/// Overlay with nothing pending; gives the committed view.
pub struct NoOverlay;

impl StatusOverlay for NoOverlay {
    fn pending_status(&self, _part_id: &str, _slot: SlotIndex) -> Option<ProcessStatus> {
        None
    }
}

/// Status of an order derived from its percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OrderStatus {
    NotStarted,
    Active,
    Completed,
}

impl OrderStatus {
    pub fn from_percentage(percentage: u8) -> Self {
        match percentage {
            0 => OrderStatus::NotStarted,
            p if p >= 100 => OrderStatus::Completed,
            _ => OrderStatus::Active,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderStatus::NotStarted => "Not Started",
            OrderStatus::Active => "Active",
            OrderStatus::Completed => "Completed",
        })
    }
}

/// Finer-grained label shown on an order's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressBand {
    Pending,
    Started,
    InProgress,
    Completed,
}

impl ProgressBand {
    pub fn from_percentage(percentage: u8) -> Self {
        match percentage {
            p if p >= 100 => ProgressBand::Completed,
            p if p >= 50 => ProgressBand::InProgress,
            0 => ProgressBand::Pending,
            _ => ProgressBand::Started,
        }
    }
}

impl fmt::Display for ProgressBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProgressBand::Pending => "Pending",
            ProgressBand::Started => "Started",
            ProgressBand::InProgress => "In Progress",
            ProgressBand::Completed => "Completed",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompletionSummary {
    pub total_slots: u32,
    pub processed_slots: u32,
    pub in_progress_slots: u32,
    pub not_started_slots: u32,
    pub percentage: u8,
}

impl CompletionSummary {
    pub fn status(&self) -> OrderStatus {
        OrderStatus::from_percentage(self.percentage)
    }

    pub fn band(&self) -> ProgressBand {
        ProgressBand::from_percentage(self.percentage)
    }

    pub fn is_complete(&self) -> bool {
        self.status() == OrderStatus::Completed
    }
}

/// `round(100 * processed / total)`, with 0 for an empty order. Halves round up.
pub fn completion_percentage(processed: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let processed = u64::from(processed.min(total));
    let total = u64::from(total);
    // integer round-half-up of 100 * processed / total
    ((200 * processed + total) / (2 * total)) as u8
}

/// Aggregate every used slot of every part, resolving each slot's effective
/// status as pending edit, then stored status.
pub fn summarize(parts: &[Part], overlay: &dyn StatusOverlay) -> CompletionSummary {
    let mut summary = CompletionSummary::default();

    for part in parts {
        for (slot, process) in part.used_slots() {
            let status = overlay
                .pending_status(&part.id, slot)
                .unwrap_or(process.status);

            summary.total_slots += 1;
            match status {
                s if s.counts_as_processed() => summary.processed_slots += 1,
                ProcessStatus::InProgress => summary.in_progress_slots += 1,
                _ => summary.not_started_slots += 1,
            }
        }
    }

    summary.percentage = completion_percentage(summary.processed_slots, summary.total_slots);
    summary
}

/// Dashboard-level counts over many orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortfolioSummary {
    pub total: usize,
    pub not_started: usize,
    pub active: usize,
    pub completed: usize,
}

impl PortfolioSummary {
    pub fn from_percentages(percentages: impl IntoIterator<Item = u8>) -> Self {
        percentages
            .into_iter()
            .fold(PortfolioSummary::default(), |mut acc, percentage| {
                acc.total += 1;
                match OrderStatus::from_percentage(percentage) {
                    OrderStatus::NotStarted => acc.not_started += 1,
                    OrderStatus::Active => acc.active += 1,
                    OrderStatus::Completed => acc.completed += 1,
                }
                acc
            })
    }
}
