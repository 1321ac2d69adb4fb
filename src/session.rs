//! Session objects.
//!
//! A [`ProgressEngine`] lives for one client session and owns what must be
//! shared across order views, chiefly the completion trackers. Each open
//! order gets its own [`OrderSession`] holding the loaded records, the edit
//! buffer and the acting user.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

use crate::config::{CollectionsConfig, EngineConfig};
use crate::errors::EngineError;
use crate::ledger::FileLedger;
use crate::model::{Actor, Order, Part, Role, PART_ORDER_FIELD};
use crate::notes::{encode_notes, Note, NOTES_FIELD};
use crate::notify::{CompletionNotifier, FanoutReport};
use crate::process::{ProcessStatus, SlotIndex};
use crate::progress::{
    summarize, CommitCoordinator, CompletionSummary, EditBuffer, FlushReport, NoOverlay, PortfolioSummary,
};
use crate::store::{Fields, Filter, RecordStore, StoreError};
use crate::telemetry::{create_order_span, generate_correlation_id};

pub struct ProgressEngine {
    store: Arc<dyn RecordStore>,
    config: EngineConfig,
    notifier: Arc<CompletionNotifier>,
}

impl ProgressEngine {
    pub fn new(store: Arc<dyn RecordStore>, config: EngineConfig) -> Self {
        let notifier = Arc::new(CompletionNotifier::new(
            Arc::clone(&store),
            config.collections.clone(),
            config.notifications.clone(),
        ));
        Self {
            store,
            config,
            notifier,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn notifier(&self) -> &CompletionNotifier {
        &self.notifier
    }

    pub async fn load_actor(&self, user_id: &str) -> Result<Actor, EngineError> {
        let record = self.store.get_one(&self.config.collections.users, user_id).await?;
        Ok(Actor::from_record(&record))
    }

    /// Load an order with its parts and start an editing session for `actor`.
    pub async fn open_order(&self, order_id: &str, actor: Actor) -> Result<OrderSession, EngineError> {
        let collections = &self.config.collections;
        let record = self.store.get_one(&collections.orders, order_id).await?;
        let mut order = Order::from_record(&record);
        if order.name.is_empty() {
            return Err(EngineError::MalformedRecord {
                collection: collections.orders.clone(),
                id: order.id,
                reason: "order has no MO_Name".to_string(),
            });
        }

        let parts: Vec<Part> = self
            .store
            .get_list(&collections.parts, &Filter::eq(PART_ORDER_FIELD, order.name.as_str()))
            .await?
            .iter()
            .map(Part::from_record)
            .collect();

        let committed = summarize(&parts, &NoOverlay);
        order.completion_percentage = committed.percentage;
        self.notifier.prime(&order.id, committed.percentage).await;

        info!(
            order_id = %order.id,
            order_name = %order.name,
            parts = parts.len(),
            percentage = committed.percentage,
            actor = %actor.display_name,
            "Order opened"
        );

        Ok(OrderSession {
            committer: CommitCoordinator::new(Arc::clone(&self.store), collections.parts.clone()),
            ledger: FileLedger::new(Arc::clone(&self.store), collections.orders.clone()),
            store: Arc::clone(&self.store),
            collections: collections.clone(),
            notifier: Arc::clone(&self.notifier),
            order,
            parts,
            buffer: EditBuffer::new(),
            actor,
        })
    }

    /// Committed progress of every order.
    pub async fn portfolio(&self) -> Result<Portfolio, EngineError> {
        let collections = &self.config.collections;
        let orders = self.store.get_list(&collections.orders, &Filter::all()).await?;
        let parts = self.store.get_list(&collections.parts, &Filter::all()).await?;

        let mut parts_by_order: HashMap<String, Vec<Part>> = HashMap::new();
        for part in parts.iter().map(Part::from_record) {
            parts_by_order.entry(part.order_ref.clone()).or_default().push(part);
        }

        let orders: Vec<OrderProgress> = orders
            .iter()
            .map(Order::from_record)
            .map(|order| {
                let summary = parts_by_order
                    .get(&order.name)
                    .map(|parts| summarize(parts, &NoOverlay))
                    .unwrap_or_default();
                OrderProgress {
                    order_id: order.id,
                    name: order.name,
                    summary,
                }
            })
            .collect();

        let totals = PortfolioSummary::from_percentages(orders.iter().map(|order| order.summary.percentage));
        Ok(Portfolio { orders, totals })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderProgress {
    pub order_id: String,
    pub name: String,
    pub summary: CompletionSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    pub orders: Vec<OrderProgress>,
    pub totals: PortfolioSummary,
}

/// Result of staging one or more edits.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub staged: usize,
    /// Progress including everything staged so far.
    pub summary: CompletionSummary,
    /// Set when this change took the order to completion for the first time.
    pub completion_fanout: Option<FanoutReport>,
}

/// One open order view.
pub struct OrderSession {
    store: Arc<dyn RecordStore>,
    collections: CollectionsConfig,
    notifier: Arc<CompletionNotifier>,
    committer: CommitCoordinator,
    ledger: FileLedger,
    order: Order,
    parts: Vec<Part>,
    buffer: EditBuffer,
    actor: Actor,
}

impl OrderSession {
    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.buffer.is_dirty()
    }

    /// Progress with staged edits applied.
    pub fn summary(&self) -> CompletionSummary {
        summarize(&self.parts, &self.buffer)
    }

    /// Progress as stored.
    pub fn committed_summary(&self) -> CompletionSummary {
        summarize(&self.parts, &NoOverlay)
    }

    /// Distinct process names used by the order's parts, sorted.
    pub fn process_names(&self) -> Vec<String> {
        self.parts
            .iter()
            .flat_map(|part| part.used_slots().map(|(_, process)| process.name.trim().to_string()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Stage a status change for one slot of one part.
    pub async fn stage(
        &mut self,
        part_id: &str,
        slot: SlotIndex,
        status: ProcessStatus,
    ) -> Result<StageOutcome, EngineError> {
        self.actor.require(Role::ProductionEngineer)?;
        let part = self
            .parts
            .iter()
            .find(|part| part.id == part_id)
            .ok_or_else(|| EngineError::UnknownPart(part_id.to_string()))?;
        if !part.slot(slot).is_used() {
            return Err(EngineError::UnusedSlot {
                part_id: part_id.to_string(),
                slot,
            });
        }

        self.buffer.record(part_id, slot, status);
        debug!(order_id = %self.order.id, part_id, slot = slot.number(), status = %status, "Edit staged");
        Ok(self.recompute(1).await)
    }

    /// Stage Done for every used slot of every part.
    pub async fn mark_all_done(&mut self) -> Result<StageOutcome, EngineError> {
        self.stage_matching(|_| true).await
    }

    /// Stage Done for every slot running the named process.
    pub async fn mark_process_done(&mut self, process_name: &str) -> Result<StageOutcome, EngineError> {
        let wanted = process_name.trim();
        self.stage_matching(|name| name.trim() == wanted).await
    }

    async fn stage_matching(&mut self, matches: impl Fn(&str) -> bool) -> Result<StageOutcome, EngineError> {
        self.actor.require(Role::ProductionEngineer)?;

        let targets: Vec<(String, SlotIndex)> = self
            .parts
            .iter()
            .flat_map(|part| {
                part.used_slots()
                    .filter(|(_, process)| matches(&process.name))
                    .map(|(slot, _)| (part.id.clone(), slot))
                    .collect::<Vec<_>>()
            })
            .collect();

        for (part_id, slot) in &targets {
            self.buffer.record(part_id, *slot, ProcessStatus::Done);
        }
        info!(order_id = %self.order.id, staged = targets.len(), "Bulk edit staged");
        Ok(self.recompute(targets.len()).await)
    }

    /// Drop every staged edit.
    pub async fn discard(&mut self) -> CompletionSummary {
        let dropped = self.buffer.len();
        self.buffer.clear();
        debug!(order_id = %self.order.id, dropped, "Staged edits discarded");
        self.recompute(0).await.summary
    }

    async fn recompute(&mut self, staged: usize) -> StageOutcome {
        let summary = self.summary();
        self.order.completion_percentage = summary.percentage;
        let completion_fanout = self
            .notifier
            .observe(&self.order, summary.percentage, &self.actor)
            .await;
        StageOutcome {
            staged,
            summary,
            completion_fanout,
        }
    }

    /// Persist staged edits, one update per part.
    pub async fn save(&mut self) -> Result<FlushReport, EngineError> {
        self.actor.require(Role::ProductionEngineer)?;
        let correlation_id = generate_correlation_id();
        let span = create_order_span("flush", &self.order.id, Some(&self.actor.id), Some(&correlation_id));

        let report = self
            .committer
            .flush(&mut self.buffer, &mut self.parts)
            .instrument(span)
            .await?;

        if !report.is_complete() {
            warn!(
                order_id = %self.order.id,
                failed = ?report.failed_part_ids(),
                "Save finished with failures"
            );
        }
        Ok(report)
    }

    pub async fn mark_file_sent(&mut self, file_name: &str) -> Result<(), EngineError> {
        self.ledger
            .mark_sent(&mut self.order, file_name, &self.actor, Utc::now())
            .await
    }

    pub async fn mark_all_files_sent(&mut self) -> Result<usize, EngineError> {
        self.ledger.mark_all_sent(&mut self.order, &self.actor, Utc::now()).await
    }

    /// Append a note, persist the note list, then tell the stakeholders.
    pub async fn add_note(&mut self, content: &str) -> Result<(Note, FanoutReport), EngineError> {
        let note = Note::compose(content, &self.actor, Utc::now())?;

        let mut notes = self.order.notes.clone();
        notes.push(note.clone());
        self.persist_notes(notes).await?;
        info!(order_id = %self.order.id, author = %self.actor.display_name, "Note added");

        let fanout = self.notifier.notify_note_added(&self.order, &self.actor).await;
        Ok((note, fanout))
    }

    /// Rewrite one of the actor's own notes.
    pub async fn edit_note(&mut self, index: usize, content: &str) -> Result<Note, EngineError> {
        self.authored_note(index)?;
        let mut notes = self.order.notes.clone();
        notes[index].revise(content, Utc::now())?;
        let edited = notes[index].clone();

        self.persist_notes(notes).await?;
        info!(order_id = %self.order.id, index, author = %self.actor.display_name, "Note edited");
        Ok(edited)
    }

    /// Remove one of the actor's own notes.
    pub async fn delete_note(&mut self, index: usize) -> Result<Note, EngineError> {
        self.authored_note(index)?;
        let mut notes = self.order.notes.clone();
        let removed = notes.remove(index);

        self.persist_notes(notes).await?;
        info!(order_id = %self.order.id, index, author = %self.actor.display_name, "Note deleted");
        Ok(removed)
    }

    fn authored_note(&self, index: usize) -> Result<&Note, EngineError> {
        let note = self.order.notes.get(index).ok_or(EngineError::UnknownNote(index))?;
        if !note.is_authored_by(&self.actor) {
            return Err(EngineError::NotNoteAuthor {
                actor: self.actor.display_name.clone(),
            });
        }
        Ok(note)
    }

    /// Write the whole note list in one update; local notes change only on success.
    async fn persist_notes(&mut self, notes: Vec<Note>) -> Result<(), EngineError> {
        let encoded = encode_notes(&notes).map_err(StoreError::from)?;
        let mut patch = Fields::new();
        patch.insert(NOTES_FIELD.to_string(), json!(encoded));
        self.store
            .update(&self.collections.orders, &self.order.id, patch)
            .await?;
        self.order.notes = notes;
        Ok(())
    }
}
