use statig::prelude::*;

use crate::progress::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionEvent {
    /// Percentage seen when the order was opened. Never fires a fan-out.
    Baseline { percentage: u8 },
    /// Percentage after a recomputation.
    Observed { percentage: u8 },
}

impl CompletionEvent {
    fn percentage(&self) -> u8 {
        match self {
            CompletionEvent::Baseline { percentage } | CompletionEvent::Observed { percentage } => *percentage,
        }
    }
}

/// Per-order completion watcher.
///
/// Moves between pending, active and completed as percentages are observed.
/// Entering completed arms one fan-out, and only the first time in the
/// tracker's lifetime: staying at 100, or dropping and coming back, does not
/// arm again.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    order_id: String,
    last_status: Option<OrderStatus>,
    last_percentage: Option<u8>,
    notified: bool,
    armed: u32,
}

impl CompletionTracker {
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            ..Default::default()
        }
    }

    fn route(&mut self, event: &CompletionEvent) -> Outcome<State> {
        let percentage = event.percentage();
        let status = OrderStatus::from_percentage(percentage);
        self.last_percentage = Some(percentage);
        self.last_status = Some(status);

        match status {
            OrderStatus::NotStarted => Transition(State::pending()),
            OrderStatus::Active => Transition(State::active()),
            OrderStatus::Completed => {
                match event {
                    CompletionEvent::Baseline { .. } => {
                        tracing::debug!(order_id = %self.order_id, "Order opened already complete");
                        self.notified = true;
                    }
                    CompletionEvent::Observed { .. } if !self.notified => {
                        tracing::info!(order_id = %self.order_id, "Order reached completion");
                        self.notified = true;
                        self.armed += 1;
                    }
                    CompletionEvent::Observed { .. } => {
                        tracing::debug!(order_id = %self.order_id, "Order complete again, already notified");
                    }
                }
                Transition(State::completed())
            }
        }
    }
}

#[state_machine(initial = "State::pending()")]
impl CompletionTracker {
    #[state]
    fn pending(&mut self, event: &CompletionEvent) -> Outcome<State> {
        self.route(event)
    }

    #[state]
    fn active(&mut self, event: &CompletionEvent) -> Outcome<State> {
        self.route(event)
    }

    #[state]
    fn completed(&mut self, event: &CompletionEvent) -> Outcome<State> {
        match event {
            CompletionEvent::Observed { percentage } | CompletionEvent::Baseline { percentage }
                if *percentage >= 100 =>
            {
                self.last_percentage = Some(*percentage);
                Handled
            }
            _ => self.route(event),
        }
    }
}

impl CompletionTracker {
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn last_status(&self) -> Option<OrderStatus> {
        self.last_status
    }

    pub fn last_percentage(&self) -> Option<u8> {
        self.last_percentage
    }

    pub fn is_notified(&self) -> bool {
        self.notified
    }

    /// How many fan-outs this tracker has armed; at most one.
    pub fn armed_count(&self) -> u32 {
        self.armed
    }
}
