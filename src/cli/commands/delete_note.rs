use anyhow::{bail, Result};
use mo_progress::ProgressEngine;

use super::Command;

pub struct DeleteNoteCommand {
    pub order_id: String,
    pub actor_id: String,
    pub position: usize,
}

impl DeleteNoteCommand {
    pub fn new(order_id: String, actor_id: String, position: usize) -> Self {
        Self {
            order_id,
            actor_id,
            position,
        }
    }
}

impl Command for DeleteNoteCommand {
    async fn execute(&self, engine: &ProgressEngine) -> Result<()> {
        let Some(index) = self.position.checked_sub(1) else {
            bail!("Note positions start at 1");
        };
        let actor = engine.load_actor(&self.actor_id).await?;
        let mut session = engine.open_order(&self.order_id, actor).await?;

        let removed = session.delete_note(index).await?;
        println!(
            "🗑️  Deleted note {} from {} ({} notes left): {}",
            self.position,
            session.order().name,
            session.order().notes.len(),
            removed.content
        );
        Ok(())
    }
}
