// mo-progress library - manufacturing order progress and notification engine
// This exposes the core components for the CLI, tests and embedding

pub mod config;
pub mod errors;
pub mod ledger;
pub mod model;
pub mod notes;
pub mod notify;
pub mod process;
pub mod progress;
pub mod session;
pub mod store;
pub mod telemetry;

// Re-export key types for easy access
pub use config::{config, init_config, EngineConfig};
pub use errors::EngineError;
pub use ledger::{FileLedger, FileStatus};
pub use model::{Actor, Order, Part, ProcessSlot, Role};
pub use notes::Note;
pub use notify::{CompletionNotifier, FanoutReport, Notification, NotificationKind};
pub use process::{ProcessStatus, SlotIndex, SLOT_COUNT};
pub use progress::{
    summarize, CommitCoordinator, CompletionSummary, EditBuffer, FlushOutcome, FlushReport, OrderStatus,
    PortfolioSummary, ProgressBand,
};
pub use session::{OrderProgress, OrderSession, Portfolio, ProgressEngine, StageOutcome};
pub use store::{Filter, InMemoryRecordStore, JsonFileStore, RateLimitedStore, Record, RecordStore, StoreError};
pub use telemetry::{create_order_span, generate_correlation_id, init_telemetry};
