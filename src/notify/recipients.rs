use serde_json::Value;
use tracing::{debug, warn};

use crate::config::CollectionsConfig;
use crate::model::{Order, Role};
use crate::store::{Filter, RecordStore};

/// Ordered set of user ids that receive one notification each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientSet {
    ids: Vec<String>,
}

impl RecipientSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` unless it is blank or already present.
    pub fn insert(&mut self, id: &str) -> bool {
        let id = id.trim();
        if id.is_empty() || self.contains(id) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    pub fn extend<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.insert(id);
        }
    }

    /// Drop the acting user; nobody is notified of their own action.
    pub fn without(mut self, actor_id: &str) -> Self {
        self.ids.retain(|id| id != actor_id);
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|existing| existing == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Looks up the stakeholders of an order. Lookup failures are logged and
/// yield fewer recipients, never an error.
pub struct RecipientResolver<'a> {
    store: &'a dyn RecordStore,
    collections: &'a CollectionsConfig,
}

impl<'a> RecipientResolver<'a> {
    pub fn new(store: &'a dyn RecordStore, collections: &'a CollectionsConfig) -> Self {
        Self { store, collections }
    }

    /// Project manager plus every supervisor, minus the actor.
    pub async fn completion_recipients(&self, order: &Order, actor_id: &str) -> RecipientSet {
        let mut recipients = RecipientSet::new();
        if let Some(manager) = self.project_manager(order).await {
            recipients.insert(&manager);
        }
        let supervisors = self.supervisors().await;
        recipients.extend(supervisors.iter().map(String::as_str));
        recipients.without(actor_id)
    }

    /// The three stakeholders named on the order, minus the actor.
    pub async fn note_recipients(&self, order: &Order, actor_id: &str) -> RecipientSet {
        let mut recipients = RecipientSet::new();
        if let Some(manager) = self.project_manager(order).await {
            recipients.insert(&manager);
        }
        recipients.extend(order.design_engineer.as_deref());
        recipients.extend(order.production_engineer.as_deref());
        recipients.without(actor_id)
    }

    /// The manager recorded on the order, else the one on its project.
    pub async fn project_manager(&self, order: &Order) -> Option<String> {
        if let Some(manager) = &order.project_manager {
            return Some(manager.clone());
        }
        let project_code = order.project_code.as_deref()?;

        let filter = Filter::eq("Project_Code", project_code);
        match self.store.get_list(&self.collections.projects, &filter).await {
            Ok(projects) => {
                let manager = projects.first().and_then(|project| match project.field("Project_Manager") {
                    Some(Value::String(id)) if !id.trim().is_empty() => Some(id.clone()),
                    Some(Value::Array(ids)) => ids.iter().filter_map(Value::as_str).next().map(str::to_string),
                    _ => None,
                });
                if manager.is_none() {
                    debug!(order_id = %order.id, project = project_code, "Project has no manager");
                }
                manager
            }
            Err(e) => {
                warn!(
                    order_id = %order.id,
                    project = project_code,
                    error = %e,
                    "Project lookup failed, continuing without project manager"
                );
                None
            }
        }
    }

    pub async fn supervisors(&self) -> Vec<String> {
        let filter = Filter::eq("Role", Role::Supervisor.as_str());
        match self.store.get_list(&self.collections.users, &filter).await {
            Ok(users) => users.into_iter().map(|user| user.id).collect(),
            Err(e) => {
                warn!(error = %e, "Supervisor lookup failed, continuing without supervisors");
                Vec::new()
            }
        }
    }
}
