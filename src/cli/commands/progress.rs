use anyhow::Result;
use mo_progress::{Actor, ProgressEngine};

use super::{progress_line, Command};

pub struct ProgressCommand {
    pub order_id: String,
}

impl ProgressCommand {
    pub fn new(order_id: String) -> Self {
        Self { order_id }
    }
}

impl Command for ProgressCommand {
    async fn execute(&self, engine: &ProgressEngine) -> Result<()> {
        // Read-only view; no acting user is needed.
        let viewer = Actor::new("", "viewer", Vec::new());
        let session = engine.open_order(&self.order_id, viewer).await?;
        let order = session.order();

        println!("📦 {} ({})", order.name, order.id);
        println!("   {}", progress_line(&session.summary()));
        println!();

        for part in session.parts() {
            let label = part.code.as_deref().unwrap_or(&part.id);
            let slots: Vec<String> = part
                .used_slots()
                .map(|(slot, process)| format!("{slot}:{}={}", process.name.trim(), process.status))
                .collect();
            if slots.is_empty() {
                println!("  {label}: no processes");
            } else {
                println!("  {label}: {}", slots.join(", "));
            }
        }

        if !order.files.is_empty() || !order.files_status.is_empty() {
            println!();
            println!("📁 Files:");
            for file in mo_progress::ledger::known_files(order) {
                match mo_progress::ledger::status_of(order, &file) {
                    Some(entry) if entry.sent => println!("  ✅ {file} (sent by {})", entry.sent_by),
                    _ => println!("  ⏳ {file}"),
                }
            }
        }
        Ok(())
    }
}
