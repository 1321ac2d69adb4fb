use chrono::{DateTime, Utc};
use serde::Serialize;
use statig::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, Instrument};

use super::recipients::{RecipientResolver, RecipientSet};
use super::tracker::{CompletionEvent, CompletionTracker};
use crate::config::{CollectionsConfig, NotificationConfig};
use crate::model::{Actor, Order};
use crate::store::{Fields, RecordStore, StoreError};
use crate::telemetry::{create_order_span, generate_correlation_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationKind {
    #[serde(rename = "MO_Status_Completed")]
    OrderCompleted,
    #[serde(rename = "Note_Added")]
    NoteAdded,
}

impl NotificationKind {
    pub fn title(self) -> &'static str {
        match self {
            NotificationKind::OrderCompleted => "MO Completed",
            NotificationKind::NoteAdded => "Note Added to MO",
        }
    }

    pub fn priority(self) -> Priority {
        match self {
            NotificationKind::OrderCompleted => Priority::Warning,
            NotificationKind::NoteAdded => Priority::Info,
        }
    }

    pub fn action_required(self) -> bool {
        matches!(self, NotificationKind::OrderCompleted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Info,
    Warning,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Info => "info",
            Priority::Warning => "warning",
        })
    }
}

/// One notification record, addressed to a single recipient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Type")]
    pub kind: NotificationKind,
    #[serde(rename = "Entity_Type")]
    pub entity_type: String,
    #[serde(rename = "Entity_ID")]
    pub entity_id: String,
    #[serde(rename = "Project_ID")]
    pub project_id: Option<String>,
    #[serde(rename = "Created_By")]
    pub created_by: String,
    #[serde(rename = "Created_At")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "Recipient")]
    pub recipient: String,
    #[serde(rename = "Priority")]
    pub priority: Priority,
    #[serde(rename = "Action_Required")]
    pub action_required: bool,
    #[serde(rename = "Action_Taken")]
    pub action_taken: bool,
    #[serde(rename = "Link_To_Action")]
    pub link_to_action: String,
}

impl Notification {
    pub fn for_order(
        kind: NotificationKind,
        order: &Order,
        actor: &Actor,
        recipient: &str,
        link_path: &str,
        at: DateTime<Utc>,
    ) -> Self {
        let (message, link) = match kind {
            NotificationKind::OrderCompleted => (
                format!(
                    "MO-Card #{} has been marked as Completed by {}.",
                    order.name, actor.display_name
                ),
                format!("{link_path}?id={}", order.id),
            ),
            NotificationKind::NoteAdded => (
                format!("A note was added to MO-Card #{} by {}.", order.name, actor.display_name),
                format!("{link_path}?id={}#notes", order.id),
            ),
        };

        Self {
            title: kind.title().to_string(),
            message,
            kind,
            entity_type: "MO-Card".to_string(),
            entity_id: order.id.clone(),
            project_id: order.project_code.clone(),
            created_by: actor.id.clone(),
            created_at: at,
            recipient: recipient.to_string(),
            priority: kind.priority(),
            action_required: kind.action_required(),
            action_taken: false,
            link_to_action: link,
        }
    }

    pub fn to_fields(&self) -> Result<Fields, StoreError> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(fields) => Ok(fields),
            _ => Ok(Fields::new()),
        }
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl FanoutReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

/// Detects completion transitions per order and fans notifications out to
/// stakeholders.
///
/// One notifier is shared by every order view of a client session; its
/// trackers carry the "already notified" memory for that session.
pub struct CompletionNotifier {
    store: Arc<dyn RecordStore>,
    collections: CollectionsConfig,
    settings: NotificationConfig,
    trackers: Mutex<HashMap<String, StateMachine<CompletionTracker>>>,
}

impl CompletionNotifier {
    pub fn new(store: Arc<dyn RecordStore>, collections: CollectionsConfig, settings: NotificationConfig) -> Self {
        Self {
            store,
            collections,
            settings,
            trackers: Mutex::new(HashMap::new()),
        }
    }

    /// Seed the tracker with the committed percentage of a freshly opened
    /// order. An order opened at 100 counts as already notified.
    pub async fn prime(&self, order_id: &str, percentage: u8) {
        self.handle(order_id, CompletionEvent::Baseline { percentage }).await;
    }

    /// Feed a recomputed percentage. Returns the fan-out report when this
    /// observation is the order's first arrival at completion.
    pub async fn observe(&self, order: &Order, percentage: u8, actor: &Actor) -> Option<FanoutReport> {
        if !self.handle(&order.id, CompletionEvent::Observed { percentage }).await {
            return None;
        }
        Some(self.notify_completed(order, actor).await)
    }

    pub async fn is_notified(&self, order_id: &str) -> bool {
        let trackers = self.trackers.lock().await;
        trackers
            .get(order_id)
            .map(|sm| sm.inner().is_notified())
            .unwrap_or(false)
    }

    /// Returns true when the event armed a fan-out.
    async fn handle(&self, order_id: &str, event: CompletionEvent) -> bool {
        let mut trackers = self.trackers.lock().await;
        let sm = trackers
            .entry(order_id.to_string())
            .or_insert_with(|| CompletionTracker::new(order_id).state_machine());
        let before = sm.inner().armed_count();
        sm.handle(&event);
        sm.inner().armed_count() > before
    }

    async fn notify_completed(&self, order: &Order, actor: &Actor) -> FanoutReport {
        let correlation_id = generate_correlation_id();
        let span = create_order_span("completion_fanout", &order.id, Some(&actor.id), Some(&correlation_id));

        async {
            let resolver = RecipientResolver::new(self.store.as_ref(), &self.collections);
            let recipients = resolver.completion_recipients(order, &actor.id).await;
            self.fan_out(NotificationKind::OrderCompleted, order, actor, &recipients)
                .await
        }
        .instrument(span)
        .await
    }

    /// Notify the order's stakeholders that `actor` added a note.
    pub async fn notify_note_added(&self, order: &Order, actor: &Actor) -> FanoutReport {
        let correlation_id = generate_correlation_id();
        let span = create_order_span("note_fanout", &order.id, Some(&actor.id), Some(&correlation_id));

        async {
            let resolver = RecipientResolver::new(self.store.as_ref(), &self.collections);
            let recipients = resolver.note_recipients(order, &actor.id).await;
            self.fan_out(NotificationKind::NoteAdded, order, actor, &recipients).await
        }
        .instrument(span)
        .await
    }

    /// Create one record per recipient, in order. A failed create is logged
    /// and the loop moves on.
    async fn fan_out(
        &self,
        kind: NotificationKind,
        order: &Order,
        actor: &Actor,
        recipients: &RecipientSet,
    ) -> FanoutReport {
        let mut report = FanoutReport::default();
        let now = Utc::now();

        for recipient in recipients.iter() {
            let notification =
                Notification::for_order(kind, order, actor, recipient, &self.settings.order_link_path, now);

            let created = match notification.to_fields() {
                Ok(fields) => self.store.create(&self.collections.notifications, fields).await,
                Err(e) => Err(e),
            };

            match created {
                Ok(record) => {
                    info!(
                        recipient = recipient,
                        notification_id = %record.id,
                        kind = ?kind,
                        "Notification created"
                    );
                    report.delivered.push(recipient.to_string());
                }
                Err(e) => {
                    error!(recipient = recipient, kind = ?kind, error = %e, "Failed to create notification");
                    report.failed.push((recipient.to_string(), e.to_string()));
                }
            }
        }

        info!(
            order_id = %order.id,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "Fan-out finished"
        );
        report
    }
}
