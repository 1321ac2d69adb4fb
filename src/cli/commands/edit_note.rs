use anyhow::{bail, Result};
use mo_progress::ProgressEngine;

use super::Command;

pub struct EditNoteCommand {
    pub order_id: String,
    pub actor_id: String,
    pub position: usize,
    pub text: String,
}

impl EditNoteCommand {
    pub fn new(order_id: String, actor_id: String, position: usize, text: String) -> Self {
        Self {
            order_id,
            actor_id,
            position,
            text,
        }
    }
}

impl Command for EditNoteCommand {
    async fn execute(&self, engine: &ProgressEngine) -> Result<()> {
        let Some(index) = self.position.checked_sub(1) else {
            bail!("Note positions start at 1");
        };
        let actor = engine.load_actor(&self.actor_id).await?;
        let mut session = engine.open_order(&self.order_id, actor).await?;

        let note = session.edit_note(index, &self.text).await?;
        println!("✏️  Note {} on {} updated: {}", self.position, session.order().name, note.content);
        Ok(())
    }
}
