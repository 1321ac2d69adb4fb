//! Completion detection and stakeholder notifications.

pub mod notifier;
pub mod recipients;
pub mod tracker;

pub use notifier::{CompletionNotifier, FanoutReport, Notification, NotificationKind, Priority};
pub use recipients::{RecipientResolver, RecipientSet};
pub use tracker::{CompletionEvent, CompletionTracker};
