//! Domain records: orders, parts, and the people acting on them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::errors::EngineError;
use crate::ledger::{parse_ledger, FileStatus};
use crate::notes::{parse_notes, Note};
use crate::process::{ProcessStatus, SlotIndex, SLOT_COUNT};
use crate::store::Record;

/// Field on a part record naming the order it belongs to.
pub const PART_ORDER_FIELD: &str = "MO_Name";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Design Engineer")]
    DesignEngineer,
    #[serde(rename = "Production Engineer")]
    ProductionEngineer,
    #[serde(rename = "Project Manager")]
    ProjectManager,
    Supervisor,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::DesignEngineer => "Design Engineer",
            Role::ProductionEngineer => "Production Engineer",
            Role::ProjectManager => "Project Manager",
            Role::Supervisor => "Supervisor",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match compact.as_str() {
            "designengineer" => Ok(Role::DesignEngineer),
            "productionengineer" => Ok(Role::ProductionEngineer),
            "projectmanager" => Ok(Role::ProjectManager),
            "supervisor" => Ok(Role::Supervisor),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// The user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Reject the call unless the actor holds `role`.
    pub fn require(&self, role: Role) -> Result<(), EngineError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(EngineError::Unauthorized {
                actor: self.display_name.clone(),
                required: role,
            })
        }
    }

    pub fn from_record(record: &Record) -> Self {
        let display_name = record
            .str_field("Full_Name")
            .or_else(|| record.str_field("Account_Name"))
            .unwrap_or("Unknown")
            .to_string();

        let roles = match record.field("Role") {
            Some(Value::String(role)) => vec![role.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
        .into_iter()
        .filter_map(|role| match role.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                warn!(user_id = %record.id, "Ignoring {}", e);
                None
            }
        })
        .collect();

        Self {
            id: record.id.clone(),
            display_name,
            roles,
        }
    }
}

/// One positional (name, status) pair on a part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSlot {
    pub name: String,
    pub status: ProcessStatus,
}

impl ProcessSlot {
    pub fn new(name: impl Into<String>, status: ProcessStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }

    /// A blank or whitespace-only name means the part does not use this slot.
    pub fn is_used(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub id: String,
    pub order_ref: String,
    pub code: Option<String>,
    pub slots: [ProcessSlot; SLOT_COUNT],
}

impl Part {
    pub fn new(id: impl Into<String>, order_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            order_ref: order_ref.into(),
            code: None,
            slots: Default::default(),
        }
    }

    /// Builder-style helper to fill a slot.
    pub fn with_process(mut self, slot: SlotIndex, name: &str, status: ProcessStatus) -> Self {
        self.slots[slot.position()] = ProcessSlot::new(name, status);
        self
    }

    pub fn slot(&self, slot: SlotIndex) -> &ProcessSlot {
        &self.slots[slot.position()]
    }

    pub fn set_status(&mut self, slot: SlotIndex, status: ProcessStatus) {
        self.slots[slot.position()].status = status;
    }

    pub fn used_slots(&self) -> impl Iterator<Item = (SlotIndex, &ProcessSlot)> {
        SlotIndex::all()
            .map(move |slot| (slot, self.slot(slot)))
            .filter(|(_, process)| process.is_used())
    }

    pub fn from_record(record: &Record) -> Self {
        let mut part = Part::new(
            record.id.clone(),
            record.str_field(PART_ORDER_FIELD).unwrap_or_default(),
        );
        part.code = record.str_field("Code").map(str::to_string);

        for slot in SlotIndex::all() {
            let name = record.str_field(&slot.name_field()).unwrap_or_default();
            let raw_status = record
                .field(&slot.status_field())
                .and_then(Value::as_str)
                .unwrap_or_default();
            let status = raw_status.parse().unwrap_or_else(|_| {
                warn!(
                    part_id = %record.id,
                    slot = slot.number(),
                    status = raw_status,
                    "Unrecognized process status, treating as not started"
                );
                ProcessStatus::default()
            });
            part.slots[slot.position()] = ProcessSlot::new(name, status);
        }

        part
    }
}

/// A manufacturing order as seen by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: String,
    pub name: String,
    pub kind: Option<String>,
    pub project_code: Option<String>,
    /// Process names declared on the order; `None` marks an unused slot.
    pub processes: [Option<String>; SLOT_COUNT],
    /// Derived; recomputed from parts, never read back as authoritative.
    pub completion_percentage: u8,
    pub files: Vec<String>,
    pub files_status: Vec<FileStatus>,
    pub notes: Vec<Note>,
    pub project_manager: Option<String>,
    pub design_engineer: Option<String>,
    pub production_engineer: Option<String>,
}

impl Order {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: None,
            project_code: None,
            processes: Default::default(),
            completion_percentage: 0,
            files: Vec::new(),
            files_status: Vec::new(),
            notes: Vec::new(),
            project_manager: None,
            design_engineer: None,
            production_engineer: None,
        }
    }

    pub fn from_record(record: &Record) -> Self {
        let mut order = Order::new(record.id.clone(), record.str_field("MO_Name").unwrap_or_default());
        order.kind = record.str_field("Type").map(str::to_string);
        order.project_code = record.str_field("Project_Name").map(str::to_string);

        for slot in SlotIndex::all() {
            order.processes[slot.position()] = record.str_field(&slot.name_field()).map(str::to_string);
        }

        order.files = match record.field("Files") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter(|name| !name.trim().is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::String(single)) if !single.trim().is_empty() => vec![single.clone()],
            _ => Vec::new(),
        };

        order.files_status = parse_ledger(record.field("Files_Status"));
        order.notes = parse_notes(record.field("Notes"));
        order.project_manager = relation_id(record, "Project_Manager");
        order.design_engineer = relation_id(record, "Design_Eng");
        order.production_engineer = relation_id(record, "Production_Eng");
        order
    }
}

/// Single-relation fields may come back as a bare id or a one-element list.
fn relation_id(record: &Record, field: &str) -> Option<String> {
    match record.field(field)? {
        Value::String(id) if !id.trim().is_empty() => Some(id.clone()),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .find(|id| !id.trim().is_empty())
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, value: Value) -> Record {
        Record::new(id, value.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn part_from_record_reads_all_slots() {
        let part = Part::from_record(&record(
            "p1",
            json!({
                "MO_Name": "MO-17",
                "Code": "BR-01",
                "Process1": "Cut",
                "Process1_Status": "Done",
                "Process2": "Paint",
                "Process2_Status": "None",
                "Process3": "   ",
                "Process4_Status": "Glowing",
            }),
        ));

        assert_eq!(part.order_ref, "MO-17");
        assert_eq!(part.code.as_deref(), Some("BR-01"));
        assert_eq!(part.slots[0], ProcessSlot::new("Cut", ProcessStatus::Done));
        assert_eq!(part.slots[1].status, ProcessStatus::NotStarted);
        assert!(!part.slots[2].is_used());
        assert_eq!(part.slots[3].status, ProcessStatus::NotStarted);
        assert_eq!(part.used_slots().count(), 2);
    }

    #[test]
    fn order_from_record_tolerates_messy_fields() {
        let order = Order::from_record(&record(
            "mo1",
            json!({
                "MO_Name": "MO-17",
                "Project_Name": "PRJ-4",
                "Files": ["a.dxf", "", "b.step"],
                "Files_Status": "not json at all",
                "Notes": null,
                "Project_Manager": ["pm1"],
                "Design_Eng": "de1",
                "Production_Eng": "",
                "Process1": "Cut",
            }),
        ));

        assert_eq!(order.name, "MO-17");
        assert_eq!(order.files, vec!["a.dxf".to_string(), "b.step".to_string()]);
        assert!(order.files_status.is_empty());
        assert!(order.notes.is_empty());
        assert_eq!(order.project_manager.as_deref(), Some("pm1"));
        assert_eq!(order.design_engineer.as_deref(), Some("de1"));
        assert_eq!(order.production_engineer, None);
        assert_eq!(order.processes[0].as_deref(), Some("Cut"));
        assert_eq!(order.processes[1], None);
    }

    #[test]
    fn actor_roles_from_string_or_list() {
        let single = Actor::from_record(&record(
            "u1",
            json!({"Account_Name": "sam", "Role": "Production Engineer"}),
        ));
        assert_eq!(single.display_name, "sam");
        assert!(single.has_role(Role::ProductionEngineer));

        let several = Actor::from_record(&record(
            "u2",
            json!({"Full_Name": "Lee", "Role": ["Supervisor", "Wizard", "Project Manager"]}),
        ));
        assert_eq!(several.roles, vec![Role::Supervisor, Role::ProjectManager]);
        assert!(matches!(
            several.require(Role::ProductionEngineer),
            Err(EngineError::Unauthorized { required: Role::ProductionEngineer, .. })
        ));
    }
}
