//! Completion tracking for one order: aggregation, staging and saving of
//! process status edits.

pub mod aggregator;
pub mod buffer;
pub mod commit;

pub use aggregator::{
    completion_percentage, summarize, CompletionSummary, NoOverlay, OrderStatus, PortfolioSummary,
    ProgressBand, StatusOverlay,
};
pub use buffer::{EditBuffer, EditKey};
pub use commit::{AppliedPart, CommitCoordinator, FailedPart, FlushOutcome, FlushReport};
