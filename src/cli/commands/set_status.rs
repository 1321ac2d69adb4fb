use anyhow::{anyhow, Context, Result};
use mo_progress::{FlushOutcome, ProcessStatus, ProgressEngine, SlotIndex};
use regex::Regex;
use std::sync::OnceLock;

use super::{print_fanout, progress_line, Command};

/// One `<part>:<slot>=<status>` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditArg {
    pub part_id: String,
    pub slot: SlotIndex,
    pub status: ProcessStatus,
}

static EDIT_PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

pub fn parse_edit(raw: &str) -> Result<EditArg> {
    let pattern = EDIT_PATTERN
        .get_or_init(|| Regex::new(r"^\s*([^:\s]+)\s*:\s*(\d+)\s*=\s*(.+?)\s*$"))
        .as_ref()
        .map_err(|e| anyhow!("invalid edit pattern: {e}"))?;

    let captures = pattern
        .captures(raw)
        .ok_or_else(|| anyhow!("expected <part>:<slot>=<status>, got {raw:?}"))?;
    let slot_number: usize = captures[2].parse().with_context(|| format!("bad slot in {raw:?}"))?;

    Ok(EditArg {
        part_id: captures[1].to_string(),
        slot: SlotIndex::new(slot_number)?,
        status: captures[3].parse()?,
    })
}

pub struct SetStatusCommand {
    pub order_id: String,
    pub actor_id: String,
    pub edits: Vec<String>,
}

impl SetStatusCommand {
    pub fn new(order_id: String, actor_id: String, edits: Vec<String>) -> Self {
        Self {
            order_id,
            actor_id,
            edits,
        }
    }
}

impl Command for SetStatusCommand {
    async fn execute(&self, engine: &ProgressEngine) -> Result<()> {
        // Validate every argument before touching the store.
        let edits = self
            .edits
            .iter()
            .map(|raw| parse_edit(raw))
            .collect::<Result<Vec<_>>>()?;

        let actor = engine.load_actor(&self.actor_id).await?;
        let mut session = engine.open_order(&self.order_id, actor).await?;
        println!("📦 {}: {}", session.order().name, progress_line(&session.summary()));

        for edit in &edits {
            let outcome = session.stage(&edit.part_id, edit.slot, edit.status).await?;
            println!(
                "  ✏️  {} slot {} -> {} | {}",
                edit.part_id,
                edit.slot,
                edit.status,
                progress_line(&outcome.summary)
            );
            if let Some(report) = &outcome.completion_fanout {
                print_fanout("Order completed", report);
            }
        }

        let report = session.save().await?;
        match report.outcome() {
            FlushOutcome::Complete => println!("✅ Saved {} change(s)", report.applied_count()),
            FlushOutcome::Partial | FlushOutcome::Failed => {
                println!("⚠️  Saved {} change(s); these parts failed:", report.applied_count());
                for failed in &report.failed {
                    println!("   ❌ {}: {}", failed.part_id, failed.reason);
                }
                return Err(anyhow!("{} part(s) were not saved", report.failed.len()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_part_slot_and_status() {
        let edit = parse_edit("r1x:2=In Progress").unwrap();
        assert_eq!(edit.part_id, "r1x");
        assert_eq!(edit.slot.number(), 2);
        assert_eq!(edit.status, ProcessStatus::InProgress);
    }

    #[test]
    fn rejects_bad_edits() {
        assert!(parse_edit("r1x=Done").is_err());
        assert!(parse_edit("r1x:7=Done").is_err());
        assert!(parse_edit("r1x:1=Sparkling").is_err());
    }
}
