use anyhow::Result;
use mo_progress::ProgressEngine;

use super::{print_fanout, Command};

pub struct AddNoteCommand {
    pub order_id: String,
    pub actor_id: String,
    pub text: String,
}

impl AddNoteCommand {
    pub fn new(order_id: String, actor_id: String, text: String) -> Self {
        Self {
            order_id,
            actor_id,
            text,
        }
    }
}

impl Command for AddNoteCommand {
    async fn execute(&self, engine: &ProgressEngine) -> Result<()> {
        let actor = engine.load_actor(&self.actor_id).await?;
        let mut session = engine.open_order(&self.order_id, actor).await?;

        let (note, report) = session.add_note(&self.text).await?;
        println!("📝 Note added to {} by {}", session.order().name, note.user_name);
        print_fanout("Stakeholders", &report);
        Ok(())
    }
}
